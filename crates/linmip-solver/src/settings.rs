/// Tolerances and limits shared by the simplex core and branch-and-bound.
///
/// With the `serde` feature every field is optional when deserializing; a
/// missing field keeps its default.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverSettings {
    /// Magnitudes below this count as zero in pivoting and optimality tests
    pub tolerance: f64,
    /// Largest Phase 1 residual still accepted as feasible
    pub feasibility_tolerance: f64,
    /// Distance from an integer still accepted as integral
    pub integrality_tolerance: f64,
    /// Pivot budget for one LP solve (both phases)
    pub max_iterations: usize,
    /// Consecutive degenerate pivots before switching to Bland's rule
    pub degenerate_pivot_limit: usize,
    /// Branch-and-bound node budget
    pub node_limit: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            feasibility_tolerance: 1e-7,
            integrality_tolerance: 1e-6,
            max_iterations: 10_000,
            degenerate_pivot_limit: 50,
            node_limit: 100_000,
        }
    }
}

impl SolverSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = limit;
        self
    }

    pub fn with_integrality_tolerance(mut self, tol: f64) -> Self {
        self.integrality_tolerance = tol;
        self
    }
}
