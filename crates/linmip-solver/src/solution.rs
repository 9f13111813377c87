use std::collections::HashMap;
use std::fmt;

use crate::expression::Variable;
use crate::model::Model;

/// Terminal state of a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// An iteration or node budget ran out before optimality was proven.
    /// The best integral solution found so far is kept, if there is one.
    ResourceLimitReached,
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolutionStatus::Optimal => "Optimal",
            SolutionStatus::Infeasible => "Infeasible",
            SolutionStatus::Unbounded => "Unbounded",
            SolutionStatus::ResourceLimitReached => "ResourceLimitReached",
        };
        f.write_str(name)
    }
}

/// Dual information of an optimal LP, in the user's objective sense
#[derive(Debug, Clone, PartialEq)]
pub struct Sensitivity {
    /// Shadow price per constraint: objective change per unit increase of the RHS
    pub duals: Vec<f64>,
    /// Distance of each constraint's activity from its RHS
    pub slacks: Vec<f64>,
    /// Reduced cost per variable
    pub reduced_costs: Vec<f64>,
    /// Whether each variable is in the final basis
    pub basic: Vec<bool>,
}

/// A constraint the LP could not satisfy, taken from the Phase 1 optimum
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintViolation {
    /// Constraint label, or `<variable>.upper` for a bound
    pub constraint: String,
    /// Required value (from constraint RHS)
    pub required: f64,
    /// Activity at the Phase 1 point
    pub actual: f64,
    /// How much the constraint is violated by
    pub violation_amount: f64,
    /// Human-readable description of what's wrong
    pub description: String,
}

/// Work counters for one solve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveStats {
    pub simplex_iterations: usize,
    pub nodes_explored: usize,
    pub nodes_pruned: usize,
    pub incumbent_updates: usize,
}

/// The result of solving a model.
///
/// Holds the variable names and constraint labels of the model it was
/// computed from, so it stays meaningful after the model changes.
#[derive(Debug, Clone)]
pub struct Solution {
    status: SolutionStatus,
    objective_value: Option<f64>,
    values: Vec<f64>,
    model_id: u64,
    is_mip: bool,
    variable_names: Vec<String>,
    constraint_labels: Vec<String>,
    name_index: HashMap<String, usize>,
    label_index: HashMap<String, usize>,
    sensitivity: Option<Sensitivity>,
    relaxation: Option<Sensitivity>,
    violations: Vec<ConstraintViolation>,
    stats: SolveStats,
}

impl Solution {
    pub(crate) fn new(model: &Model, status: SolutionStatus) -> Self {
        let variable_names: Vec<String> = model.variables().iter().map(|v| v.name.clone()).collect();
        let constraint_labels: Vec<String> = model.constraints().iter().map(|c| c.label.clone()).collect();
        let name_index = variable_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        let label_index = constraint_labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();

        Self {
            status,
            objective_value: None,
            values: Vec::new(),
            model_id: model.id(),
            is_mip: model.has_integer_variables(),
            variable_names,
            constraint_labels,
            name_index,
            label_index,
            sensitivity: None,
            relaxation: None,
            violations: Vec::new(),
            stats: SolveStats::default(),
        }
    }

    pub(crate) fn with_point(mut self, values: Vec<f64>, objective_value: f64) -> Self {
        self.values = values;
        self.objective_value = Some(objective_value);
        self
    }

    pub(crate) fn with_sensitivity(mut self, sensitivity: Option<Sensitivity>) -> Self {
        if self.is_mip {
            self.relaxation = sensitivity;
        } else {
            self.sensitivity = sensitivity;
        }
        self
    }

    pub(crate) fn with_violations(mut self, violations: Vec<ConstraintViolation>) -> Self {
        self.violations = violations;
        self
    }

    pub(crate) fn with_stats(mut self, stats: SolveStats) -> Self {
        self.stats = stats;
        self
    }

    /// Report a relaxation of a MIP as the plain LP it is.
    pub(crate) fn as_relaxation(mut self) -> Self {
        self.is_mip = false;
        self
    }

    pub fn status(&self) -> SolutionStatus {
        self.status
    }

    /// True when the solution carries variable values: always for Optimal,
    /// and for ResourceLimitReached when an incumbent was found.
    pub fn has_solution(&self) -> bool {
        self.objective_value.is_some()
    }

    /// Objective value in the model's own sense, constant included
    pub fn objective_value(&self) -> Option<f64> {
        self.objective_value
    }

    /// True when the model had integer or binary variables
    pub fn is_mip(&self) -> bool {
        self.is_mip
    }

    /// Values in variable declaration order
    pub fn values(&self) -> Option<&[f64]> {
        self.has_solution().then_some(self.values.as_slice())
    }

    pub fn value_of(&self, var: Variable) -> Option<f64> {
        if var.model != self.model_id {
            return None;
        }
        self.values().and_then(|v| v.get(var.index).copied())
    }

    pub fn value_by_name(&self, name: &str) -> Option<f64> {
        let &index = self.name_index.get(name)?;
        self.values().and_then(|v| v.get(index).copied())
    }

    /// Shadow price of a constraint. Pure LPs only.
    pub fn dual_of(&self, label: &str) -> Option<f64> {
        let &index = self.label_index.get(label)?;
        self.sensitivity.as_ref().map(|s| s.duals[index])
    }

    pub fn slack_of(&self, label: &str) -> Option<f64> {
        let &index = self.label_index.get(label)?;
        self.sensitivity.as_ref().map(|s| s.slacks[index])
    }

    pub fn reduced_cost_of(&self, var: Variable) -> Option<f64> {
        if var.model != self.model_id {
            return None;
        }
        self.sensitivity
            .as_ref()
            .and_then(|s| s.reduced_costs.get(var.index).copied())
    }

    pub fn is_basic(&self, var: Variable) -> Option<bool> {
        if var.model != self.model_id {
            return None;
        }
        self.sensitivity.as_ref().and_then(|s| s.basic.get(var.index).copied())
    }

    /// LP dual information; `None` for MIP solutions.
    pub fn sensitivity(&self) -> Option<&Sensitivity> {
        self.sensitivity.as_ref()
    }

    /// For MIP solutions: dual information of the LP that produced the
    /// incumbent. That is the node relaxation with its branching bounds, or,
    /// when its integer values had to be rounded, the same LP with the integer
    /// variables fixed at the rounded values.
    /// These numbers describe that relaxation, not the integer program.
    pub fn relaxation(&self) -> Option<&Sensitivity> {
        self.relaxation.as_ref()
    }

    /// Labels of constraints with zero slack at the optimum. Pure LPs only.
    pub fn binding_constraints(&self, tolerance: f64) -> Vec<&str> {
        let Some(sensitivity) = &self.sensitivity else {
            return Vec::new();
        };
        self.constraint_labels
            .iter()
            .zip(&sensitivity.slacks)
            .filter(|(_, slack)| slack.abs() <= tolerance)
            .map(|(label, _)| label.as_str())
            .collect()
    }

    /// Constraints left unsatisfied at the Phase 1 optimum of an infeasible LP
    pub fn violations(&self) -> &[ConstraintViolation] {
        &self.violations
    }

    pub fn stats(&self) -> SolveStats {
        self.stats
    }

    pub fn variable_names(&self) -> &[String] {
        &self.variable_names
    }

    pub fn constraint_labels(&self) -> &[String] {
        &self.constraint_labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConstraintOp;

    fn lp_model() -> (Model, Variable) {
        let mut model = Model::new("lp");
        let x = model.add_continuous("x").unwrap();
        model.add_constraint(x, ConstraintOp::Le, 4.0, "cap").unwrap();
        model.maximize(x).unwrap();
        (model, x)
    }

    #[test]
    fn test_lookups_require_a_point() {
        let (model, x) = lp_model();
        let solution = Solution::new(&model, SolutionStatus::Infeasible);

        assert!(!solution.has_solution());
        assert_eq!(solution.value_of(x), None);
        assert_eq!(solution.objective_value(), None);
        assert_eq!(solution.dual_of("cap"), None);
    }

    #[test]
    fn test_lookups_by_handle_label_and_name() {
        let (model, x) = lp_model();
        let sensitivity = Sensitivity {
            duals: vec![1.0],
            slacks: vec![0.0],
            reduced_costs: vec![0.0],
            basic: vec![true],
        };
        let solution = Solution::new(&model, SolutionStatus::Optimal)
            .with_point(vec![4.0], 4.0)
            .with_sensitivity(Some(sensitivity));

        assert_eq!(solution.value_of(x), Some(4.0));
        assert_eq!(solution.value_by_name("x"), Some(4.0));
        assert_eq!(solution.dual_of("cap"), Some(1.0));
        assert_eq!(solution.slack_of("missing"), None);
        assert_eq!(solution.is_basic(x), Some(true));
        assert_eq!(solution.binding_constraints(1e-9), vec!["cap"]);

        let mut other = Model::new("other");
        let y = other.add_continuous("x").unwrap();
        assert_eq!(solution.value_of(y), None);
    }
}
