//! Linear and mixed-integer programming.
//!
//! Build a [`Model`] from variables, linear expressions and constraints, then
//! hand it to a [`Solver`]. LPs are solved with a two-phase simplex method;
//! models with integer or binary variables use branch-and-bound on top of it.

mod branch;
mod error;
mod expression;
mod model;
mod report;
mod settings;
mod simplex;
mod solution;
mod solver;
mod standard_form;

pub use error::ModelError;
pub use expression::{LinearExpr, Variable};
pub use model::{Constraint, ConstraintId, ConstraintOp, Domain, Model, Objective, Sense, VariableDef};
pub use report::{ConstraintLine, Report, VariableLine, ViolationLine, BINDING_TOLERANCE};
pub use settings::SolverSettings;
pub use solution::{ConstraintViolation, Sensitivity, Solution, SolutionStatus, SolveStats};
pub use solver::{solve, Solver};
