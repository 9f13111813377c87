use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ModelError;
use crate::expression::{LinearExpr, Variable};

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Value domain of a decision variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Domain {
    Continuous,
    Integer,
    /// Integer restricted to [0, 1]
    Binary,
}

impl Domain {
    pub fn is_integer(&self) -> bool {
        matches!(self, Domain::Integer | Domain::Binary)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintOp::Le => write!(f, "<="),
            ConstraintOp::Ge => write!(f, ">="),
            ConstraintOp::Eq => write!(f, "="),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sense {
    Minimize,
    Maximize,
}

impl Sense {
    /// Multiplier that turns this sense into minimization.
    pub(crate) fn sign(&self) -> f64 {
        match self {
            Sense::Minimize => 1.0,
            Sense::Maximize => -1.0,
        }
    }
}

/// Declaration of a variable inside a model
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    pub domain: Domain,
    /// Lower bound, may be `f64::NEG_INFINITY`
    pub lower: f64,
    /// Upper bound, may be `f64::INFINITY`
    pub upper: f64,
}

/// A linear constraint `expr op rhs`.
///
/// The constant of the expression the client passed has already been moved
/// into `rhs`, so `expr.constant()` is always 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Label for diagnostics and dual lookup
    pub label: String,
    pub expr: LinearExpr,
    pub op: ConstraintOp,
    pub rhs: f64,
}

impl Constraint {
    /// Left-hand side value at the given variable values.
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.expr.evaluate(values)
    }

    /// Distance between the activity and the right-hand side, positive when
    /// the constraint holds with room to spare.
    pub fn slack(&self, values: &[f64]) -> f64 {
        let lhs = self.activity(values);
        match self.op {
            ConstraintOp::Le => self.rhs - lhs,
            ConstraintOp::Ge => lhs - self.rhs,
            ConstraintOp::Eq => (lhs - self.rhs).abs(),
        }
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.activity(values);
        match self.op {
            ConstraintOp::Le => lhs <= self.rhs + tolerance,
            ConstraintOp::Ge => lhs >= self.rhs - tolerance,
            ConstraintOp::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub expr: LinearExpr,
    pub sense: Sense,
}

/// Position of a constraint in its model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(pub usize);

/// Lower and upper bound of one variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

/// A linear or mixed-integer optimization model.
///
/// Built up with `add_variable`, `add_constraint` and `set_objective`, then
/// handed to a [`Solver`](crate::Solver). Every builder call validates its
/// input, so a model that was built without errors always reaches the solver
/// in a well-formed state (apart from a missing objective).
#[derive(Debug, Clone)]
pub struct Model {
    id: u64,
    name: String,
    variables: Vec<VariableDef>,
    variable_index: HashMap<String, usize>,
    constraints: Vec<Constraint>,
    constraint_index: HashMap<String, usize>,
    objective: Option<Objective>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            variables: Vec::new(),
            variable_index: HashMap::new(),
            constraints: Vec::new(),
            constraint_index: HashMap::new(),
            objective: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Declare a variable. Binary variables have their bounds intersected with [0, 1].
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        domain: Domain,
        lower: f64,
        upper: f64,
    ) -> Result<Variable, ModelError> {
        let name = name.into();
        if self.variable_index.contains_key(&name) {
            return Err(ModelError::DuplicateVariable(name));
        }
        let (lower, upper) = check_bounds(&name, domain, lower, upper)?;

        let index = self.variables.len();
        self.variable_index.insert(name.clone(), index);
        self.variables.push(VariableDef { name, domain, lower, upper });

        Ok(Variable { model: self.id, index })
    }

    /// Continuous variable in [0, +inf)
    pub fn add_continuous(&mut self, name: impl Into<String>) -> Result<Variable, ModelError> {
        self.add_variable(name, Domain::Continuous, 0.0, f64::INFINITY)
    }

    /// Integer variable in [0, +inf)
    pub fn add_integer(&mut self, name: impl Into<String>) -> Result<Variable, ModelError> {
        self.add_variable(name, Domain::Integer, 0.0, f64::INFINITY)
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> Result<Variable, ModelError> {
        self.add_variable(name, Domain::Binary, 0.0, 1.0)
    }

    /// Replace the bounds of an existing variable.
    pub fn set_bounds(&mut self, var: Variable, lower: f64, upper: f64) -> Result<(), ModelError> {
        self.check_handle(var)?;
        let def = &self.variables[var.index];
        let (lower, upper) = check_bounds(&def.name, def.domain, lower, upper)?;
        let def = &mut self.variables[var.index];
        def.lower = lower;
        def.upper = upper;
        Ok(())
    }

    /// Add `expr op rhs`. An empty label is replaced by `_C<n>`.
    pub fn add_constraint(
        &mut self,
        expr: impl Into<LinearExpr>,
        op: ConstraintOp,
        rhs: f64,
        label: impl Into<String>,
    ) -> Result<ConstraintId, ModelError> {
        let mut label = label.into();
        if label.is_empty() {
            label = format!("_C{}", self.constraints.len() + 1);
        }
        if self.constraint_index.contains_key(&label) {
            return Err(ModelError::DuplicateConstraint(label));
        }

        let expr = expr.into();
        self.check_expr(&expr, &label)?;
        let constant = expr.constant();
        let rhs = rhs - constant;
        if !rhs.is_finite() {
            return Err(ModelError::NonFiniteRhs(label));
        }
        let expr = expr.with_constant(-constant);

        let id = ConstraintId(self.constraints.len());
        self.constraint_index.insert(label.clone(), id.0);
        self.constraints.push(Constraint { label, expr, op, rhs });
        Ok(id)
    }

    pub fn set_objective(&mut self, expr: impl Into<LinearExpr>, sense: Sense) -> Result<(), ModelError> {
        let expr = expr.into();
        if expr.is_empty() {
            return Err(ModelError::EmptyObjective);
        }
        self.check_expr(&expr, "objective")?;
        if !expr.constant().is_finite() {
            return Err(ModelError::NonFiniteRhs("objective".to_string()));
        }
        self.objective = Some(Objective { expr, sense });
        Ok(())
    }

    pub fn minimize(&mut self, expr: impl Into<LinearExpr>) -> Result<(), ModelError> {
        self.set_objective(expr, Sense::Minimize)
    }

    pub fn maximize(&mut self, expr: impl Into<LinearExpr>) -> Result<(), ModelError> {
        self.set_objective(expr, Sense::Maximize)
    }

    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    pub fn variable(&self, var: Variable) -> Option<&VariableDef> {
        if var.model != self.id {
            return None;
        }
        self.variables.get(var.index)
    }

    pub fn variable_by_name(&self, name: &str) -> Option<Variable> {
        self.variable_index
            .get(name)
            .map(|&index| Variable { model: self.id, index })
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint(&self, label: &str) -> Option<&Constraint> {
        self.constraint_index.get(label).map(|&i| &self.constraints[i])
    }

    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn has_integer_variables(&self) -> bool {
        self.variables.iter().any(|v| v.domain.is_integer())
    }

    /// True when `values` satisfies every constraint and bound within `tolerance`.
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        values.len() == self.variables.len()
            && self
                .variables
                .iter()
                .zip(values)
                .all(|(v, &x)| x >= v.lower - tolerance && x <= v.upper + tolerance)
            && self.constraints.iter().all(|c| c.is_satisfied(values, tolerance))
    }

    pub(crate) fn require_objective(&self) -> Result<&Objective, ModelError> {
        self.objective
            .as_ref()
            .ok_or_else(|| ModelError::MissingObjective(self.name.clone()))
    }

    pub(crate) fn bounds(&self) -> Vec<Bounds> {
        self.variables
            .iter()
            .map(|v| Bounds { lower: v.lower, upper: v.upper })
            .collect()
    }

    fn check_handle(&self, var: Variable) -> Result<(), ModelError> {
        if var.model != self.id || var.index >= self.variables.len() {
            return Err(ModelError::ForeignVariable);
        }
        Ok(())
    }

    fn check_expr(&self, expr: &LinearExpr, context: &str) -> Result<(), ModelError> {
        for (var, coef) in expr.terms() {
            self.check_handle(var)?;
            if !coef.is_finite() {
                return Err(ModelError::NonFiniteCoefficient {
                    variable: self.variables[var.index].name.clone(),
                    context: context.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn check_bounds(name: &str, domain: Domain, lower: f64, upper: f64) -> Result<(f64, f64), ModelError> {
    let invalid = || ModelError::InvalidBounds {
        name: name.to_string(),
        lower,
        upper,
    };
    if lower.is_nan() || upper.is_nan() || lower == f64::INFINITY || upper == f64::NEG_INFINITY {
        return Err(invalid());
    }

    let (lower, upper) = match domain {
        Domain::Binary => (lower.max(0.0), upper.min(1.0)),
        _ => (lower, upper),
    };
    if lower > upper {
        return Err(invalid());
    }
    if domain.is_integer() && lower.ceil() > upper.floor() {
        return Err(ModelError::EmptyIntegerDomain {
            name: name.to_string(),
            lower,
            upper,
        });
    }
    Ok((lower, upper))
}
