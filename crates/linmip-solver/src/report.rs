//! Human and machine readable summaries of a [`Solution`].

use std::fmt;

use crate::solution::{ConstraintViolation, Solution, SolutionStatus, SolveStats};

/// Slack magnitude below which a constraint is reported as binding
pub const BINDING_TOLERANCE: f64 = 1e-7;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VariableLine {
    pub name: String,
    pub value: f64,
    /// Absent for MIP solutions
    pub reduced_cost: Option<f64>,
    pub basic: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConstraintLine {
    pub label: String,
    pub dual: Option<f64>,
    pub slack: Option<f64>,
    pub binding: bool,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ViolationLine {
    pub constraint: String,
    pub required: f64,
    pub actual: f64,
    pub amount: f64,
    pub description: String,
}

impl From<&ConstraintViolation> for ViolationLine {
    fn from(v: &ConstraintViolation) -> Self {
        Self {
            constraint: v.constraint.clone(),
            required: v.required,
            actual: v.actual,
            amount: v.violation_amount,
            description: v.description.clone(),
        }
    }
}

/// Flat view of a solution: status, objective, per-variable values and
/// per-constraint duals and slacks.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Report {
    pub status: SolutionStatus,
    pub objective: Option<f64>,
    pub variables: Vec<VariableLine>,
    pub constraints: Vec<ConstraintLine>,
    pub violations: Vec<ViolationLine>,
    pub stats: SolveStats,
}

impl Report {
    pub fn from_solution(solution: &Solution) -> Self {
        let variables = match solution.values() {
            Some(values) => {
                let sensitivity = solution.sensitivity();
                solution
                    .variable_names()
                    .iter()
                    .zip(values)
                    .enumerate()
                    .map(|(i, (name, &value))| VariableLine {
                        name: name.clone(),
                        value,
                        reduced_cost: sensitivity.map(|s| s.reduced_costs[i]),
                        basic: sensitivity.map(|s| s.basic[i]),
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        let constraints = match solution.sensitivity() {
            Some(s) => solution
                .constraint_labels()
                .iter()
                .enumerate()
                .map(|(i, label)| ConstraintLine {
                    label: label.clone(),
                    dual: Some(s.duals[i]),
                    slack: Some(s.slacks[i]),
                    binding: s.slacks[i].abs() <= BINDING_TOLERANCE,
                })
                .collect(),
            None => Vec::new(),
        };

        Self {
            status: solution.status(),
            objective: solution.objective_value(),
            variables,
            constraints,
            violations: solution.violations().iter().map(ViolationLine::from).collect(),
            stats: solution.stats(),
        }
    }

    pub fn binding(&self) -> impl Iterator<Item = &ConstraintLine> {
        self.constraints.iter().filter(|c| c.binding)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status: {}", self.status)?;
        if let Some(objective) = self.objective {
            writeln!(f, "Objective: {:.6}", objective)?;
        }

        if !self.variables.is_empty() {
            writeln!(f)?;
            writeln!(f, "Variables:")?;
            for v in &self.variables {
                write!(f, "  {:24} {:>14.6}", v.name, v.value)?;
                if let Some(rc) = v.reduced_cost {
                    write!(f, "  reduced cost {:>12.6}", rc)?;
                }
                if v.basic == Some(true) {
                    write!(f, "  basic")?;
                }
                writeln!(f)?;
            }
        }

        if !self.constraints.is_empty() {
            writeln!(f)?;
            writeln!(f, "Constraints:")?;
            for c in &self.constraints {
                write!(f, "  {:24}", c.label)?;
                if let Some(dual) = c.dual {
                    write!(f, " dual {:>12.6}", dual)?;
                }
                if let Some(slack) = c.slack {
                    write!(f, "  slack {:>12.6}", slack)?;
                }
                if c.binding {
                    write!(f, "  binding")?;
                }
                writeln!(f)?;
            }
        }

        if !self.violations.is_empty() {
            writeln!(f)?;
            writeln!(f, "Violations:")?;
            for v in &self.violations {
                writeln!(f, "  - {}", v.description)?;
            }
        }

        write!(
            f,
            "\n{} simplex iterations, {} nodes explored, {} pruned",
            self.stats.simplex_iterations, self.stats.nodes_explored, self.stats.nodes_pruned
        )
    }
}
