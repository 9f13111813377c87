use thiserror::Error;

/// Reasons a model is rejected while it is being built.
///
/// Infeasible and unbounded models are not errors; they come back as a
/// [`SolutionStatus`](crate::SolutionStatus).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Duplicate variable name: {0}")]
    DuplicateVariable(String),
    #[error("Duplicate constraint label: {0}")]
    DuplicateConstraint(String),
    #[error("Invalid bounds for variable {name}: [{lower}, {upper}]")]
    InvalidBounds { name: String, lower: f64, upper: f64 },
    #[error("Integer variable {name} has no integer value in [{lower}, {upper}]")]
    EmptyIntegerDomain { name: String, lower: f64, upper: f64 },
    #[error("Non-finite coefficient for variable {variable} in {context}")]
    NonFiniteCoefficient { variable: String, context: String },
    #[error("Non-finite right-hand side in constraint {0}")]
    NonFiniteRhs(String),
    #[error("Variable handle does not belong to this model")]
    ForeignVariable,
    #[error("Objective has no variable terms")]
    EmptyObjective,
    #[error("Model {0} has no objective")]
    MissingObjective(String),
}
