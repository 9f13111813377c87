use tracing::debug;

use crate::branch::BranchAndBound;
use crate::error::ModelError;
use crate::model::Model;
use crate::settings::SolverSettings;
use crate::simplex::{LpOutcome, LpStatus, Simplex};
use crate::solution::{Solution, SolutionStatus, SolveStats};

/// Entry point for solving models.
///
/// Pure LPs go straight to the simplex core; models with integer or binary
/// variables are solved by branch-and-bound over their LP relaxations.
#[derive(Debug, Clone, Default)]
pub struct Solver {
    settings: SolverSettings,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Solve `model`. Errors only when the model has no objective; every
    /// other outcome, including infeasibility, is reported through the
    /// solution's status.
    pub fn solve(&self, model: &Model) -> Result<Solution, ModelError> {
        let objective = model.require_objective()?;
        debug!(
            model = model.name(),
            variables = model.num_variables(),
            constraints = model.num_constraints(),
            mip = model.has_integer_variables(),
            "Solving"
        );

        let solution = if model.has_integer_variables() {
            let outcome = BranchAndBound::new(&self.settings).solve(model, objective);
            let mut solution = Solution::new(model, outcome.status).with_stats(outcome.stats);
            if let Some(value) = outcome.objective {
                solution = solution
                    .with_point(outcome.values, value)
                    .with_sensitivity(outcome.relaxation);
            }
            solution
        } else {
            let outcome = Simplex::new(&self.settings).solve(model, objective, &model.bounds());
            lp_solution(Solution::new(model, lp_status(outcome.status)), outcome)
        };

        debug!(status = %solution.status(), objective = ?solution.objective_value(), "Solved");
        Ok(solution)
    }

    /// Solve the LP relaxation of `model`, ignoring integrality. The result
    /// is reported as a pure LP, with duals and reduced costs.
    pub fn solve_relaxation(&self, model: &Model) -> Result<Solution, ModelError> {
        let objective = model.require_objective()?;
        let outcome = Simplex::new(&self.settings).solve(model, objective, &model.bounds());
        let solution = Solution::new(model, lp_status(outcome.status)).as_relaxation();
        Ok(lp_solution(solution, outcome))
    }
}

/// Solve `model` with default settings.
pub fn solve(model: &Model) -> Result<Solution, ModelError> {
    Solver::new().solve(model)
}

fn lp_status(status: LpStatus) -> SolutionStatus {
    match status {
        LpStatus::Optimal => SolutionStatus::Optimal,
        LpStatus::Infeasible => SolutionStatus::Infeasible,
        LpStatus::Unbounded => SolutionStatus::Unbounded,
        LpStatus::IterationLimit => SolutionStatus::ResourceLimitReached,
    }
}

fn lp_solution(solution: Solution, outcome: LpOutcome) -> Solution {
    let stats = SolveStats {
        simplex_iterations: outcome.iterations,
        ..SolveStats::default()
    };
    let solution = solution.with_stats(stats).with_violations(outcome.violations);
    match outcome.objective {
        Some(value) => solution
            .with_point(outcome.values, value)
            .with_sensitivity(outcome.sensitivity),
        None => solution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintOp, Domain, Sense};

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-6, "got {} (expected {})", actual, expected);
    }

    #[test]
    fn test_missing_objective() {
        let mut model = Model::new("no objective");
        let x = model.add_continuous("x").unwrap();
        model.add_constraint(x, ConstraintOp::Le, 1.0, "cap").unwrap();

        let err = solve(&model).unwrap_err();
        assert_eq!(err, ModelError::MissingObjective("no objective".to_string()));
    }

    #[test]
    fn test_minimization_with_ge() {
        // min 2x + 3y s.t. x + y >= 4, x - y <= 2
        let mut model = Model::new("diet");
        let x = model.add_continuous("x").unwrap();
        let y = model.add_continuous("y").unwrap();
        model.minimize(2.0 * x + 3.0 * y).unwrap();
        model.add_constraint(x + y, ConstraintOp::Ge, 4.0, "need").unwrap();
        model.add_constraint(x - y, ConstraintOp::Le, 2.0, "gap").unwrap();

        let solution = solve(&model).unwrap();

        assert_eq!(solution.status(), SolutionStatus::Optimal);
        assert_close(solution.objective_value().unwrap(), 9.0);
        assert_close(solution.value_of(x).unwrap(), 3.0);
        assert_close(solution.value_of(y).unwrap(), 1.0);
        assert_close(solution.dual_of("need").unwrap(), 2.5);
        assert_close(solution.dual_of("gap").unwrap(), -0.5);
        assert!(!solution.is_mip());
        assert!(solution.stats().simplex_iterations > 0);
        assert!(model.is_feasible(solution.values().unwrap(), 1e-7));
    }

    #[test]
    fn test_infeasible_reports_violation() {
        let mut model = Model::new("clash");
        let x = model.add_continuous("x").unwrap();
        model.minimize(x).unwrap();
        model.add_constraint(x, ConstraintOp::Ge, 5.0, "at_least").unwrap();
        model.add_constraint(x, ConstraintOp::Le, 2.0, "at_most").unwrap();

        let solution = solve(&model).unwrap();

        assert_eq!(solution.status(), SolutionStatus::Infeasible);
        assert!(!solution.has_solution());
        assert_eq!(solution.values(), None);
        assert!(!solution.violations().is_empty());
    }

    #[test]
    fn test_bounded_cost_minimization() {
        // min 2x + 3y s.t. x + y >= 4 with x, y <= 3: cheapest is (3, 1)
        let mut model = Model::new("bounded");
        let x = model.add_variable("x", Domain::Continuous, 0.0, 3.0).unwrap();
        let y = model.add_variable("y", Domain::Continuous, 0.0, 3.0).unwrap();
        model.minimize(2.0 * x + 3.0 * y).unwrap();
        model.add_constraint(x + y, ConstraintOp::Ge, 4.0, "need").unwrap();

        let solution = solve(&model).unwrap();

        assert_eq!(solution.status(), SolutionStatus::Optimal);
        assert_close(solution.objective_value().unwrap(), 9.0);
        assert_close(solution.value_of(x).unwrap(), 3.0);
        assert_close(solution.value_of(y).unwrap(), 1.0);
        assert_close(solution.dual_of("need").unwrap(), 3.0);
        // x sits at its upper bound: raising it would save 1 per unit
        assert_close(solution.reduced_cost_of(x).unwrap(), -1.0);
        assert_eq!(solution.is_basic(y), Some(true));
    }

    #[test]
    fn test_maximize_unconstrained_variable() {
        let mut model = Model::new("ray");
        let x = model.add_continuous("x").unwrap();
        model.maximize(x).unwrap();

        assert_eq!(solve(&model).unwrap().status(), SolutionStatus::Unbounded);
    }

    #[test]
    fn test_unbounded() {
        let mut model = Model::new("open");
        let x = model.add_continuous("x").unwrap();
        let y = model.add_continuous("y").unwrap();
        model.maximize(x + y).unwrap();
        model.add_constraint(x - y, ConstraintOp::Le, 1.0, "tilt").unwrap();

        let solution = solve(&model).unwrap();
        assert_eq!(solution.status(), SolutionStatus::Unbounded);
        assert_eq!(solution.objective_value(), None);
    }

    #[test]
    fn test_repeated_solves_agree() {
        let mut model = Model::new("repeat");
        let x = model.add_continuous("x").unwrap();
        let y = model.add_continuous("y").unwrap();
        model.maximize(3.0 * x + 2.0 * y).unwrap();
        model.add_constraint(x + y, ConstraintOp::Le, 4.0, "a").unwrap();
        model.add_constraint(x + 3.0 * y, ConstraintOp::Le, 6.0, "b").unwrap();
        model.add_constraint(x, ConstraintOp::Le, 3.0, "c").unwrap();

        let solver = Solver::new();
        let first = solver.solve(&model).unwrap();
        let second = solver.solve(&model).unwrap();

        assert_eq!(first.status(), second.status());
        assert_eq!(first.objective_value(), second.objective_value());
        assert_eq!(first.values(), second.values());
        assert_eq!(first.sensitivity(), second.sensitivity());
    }

    #[test]
    fn test_binary_knapsack_matches_enumeration() {
        let weights = [12.0, 2.0, 1.0, 4.0, 1.0, 7.0];
        let profits = [4.0, 2.0, 1.0, 10.0, 2.0, 6.0];
        let capacity = 15.0;

        let mut model = Model::new("knapsack");
        let items: Vec<_> = (0..weights.len())
            .map(|i| model.add_binary(format!("item{}", i)).unwrap())
            .collect();
        model
            .maximize(items.iter().zip(&profits).map(|(&v, &p)| p * v).sum::<crate::LinearExpr>())
            .unwrap();
        model
            .add_constraint(
                items.iter().zip(&weights).map(|(&v, &w)| w * v).sum::<crate::LinearExpr>(),
                ConstraintOp::Le,
                capacity,
                "weight",
            )
            .unwrap();

        let mut best = 0.0_f64;
        for mask in 0..(1u32 << weights.len()) {
            let chosen = |i: usize| mask & (1 << i) != 0;
            let weight: f64 = (0..weights.len()).filter(|&i| chosen(i)).map(|i| weights[i]).sum();
            if weight <= capacity {
                let profit: f64 = (0..weights.len()).filter(|&i| chosen(i)).map(|i| profits[i]).sum();
                best = best.max(profit);
            }
        }

        let solution = solve(&model).unwrap();

        assert_eq!(solution.status(), SolutionStatus::Optimal);
        assert_close(solution.objective_value().unwrap(), best);
        for &item in &items {
            let value = solution.value_of(item).unwrap();
            assert!(value == 0.0 || value == 1.0, "item not integral: {}", value);
        }
        assert!(model.is_feasible(solution.values().unwrap(), 1e-7));
        assert!(solution.is_mip());
        assert_eq!(solution.dual_of("weight"), None);
        assert!(solution.relaxation().is_some());
        assert!(solution.stats().nodes_explored >= 1);
    }

    #[test]
    fn test_child_relaxation_never_better_than_parent() {
        let mut model = Model::new("bounding");
        let x = model.add_integer("x").unwrap();
        let y = model.add_integer("y").unwrap();
        model.maximize(5.0 * x + 4.0 * y).unwrap();
        model.add_constraint(6.0 * x + 4.0 * y, ConstraintOp::Le, 24.0, "a").unwrap();
        model.add_constraint(x + 2.0 * y, ConstraintOp::Le, 6.0, "b").unwrap();

        let solver = Solver::new();
        let parent = solver.solve_relaxation(&model).unwrap();
        assert!(!parent.is_mip());
        assert!(parent.dual_of("a").is_some());
        let parent_value = parent.objective_value().unwrap();
        let fractional = parent.value_of(y).unwrap();

        let mut down = model.clone();
        down.set_bounds(y, 0.0, fractional.floor()).unwrap();
        let mut up = model.clone();
        up.set_bounds(y, fractional.ceil(), f64::INFINITY).unwrap();

        for child in [down, up] {
            let relaxed = solver.solve_relaxation(&child).unwrap();
            if let Some(value) = relaxed.objective_value() {
                assert!(value <= parent_value + 1e-9, "child {} beats parent {}", value, parent_value);
            }
        }

        let integral = solver.solve(&model).unwrap();
        assert!(integral.objective_value().unwrap() <= parent_value + 1e-9);
    }

    #[test]
    fn test_integer_variables_with_negative_bounds() {
        // min n + m with n in [-3.5, 2], m free, n + m >= -4.5, m - n <= 1
        let mut model = Model::new("signed");
        let n = model.add_variable("n", Domain::Integer, -3.5, 2.0).unwrap();
        let m = model
            .add_variable("m", Domain::Integer, f64::NEG_INFINITY, f64::INFINITY)
            .unwrap();
        model.set_objective(n + m, Sense::Minimize).unwrap();
        model.add_constraint(n + m, ConstraintOp::Ge, -4.5, "floor").unwrap();
        model.add_constraint(m - n, ConstraintOp::Le, 1.0, "spread").unwrap();

        let solution = solve(&model).unwrap();

        assert_eq!(solution.status(), SolutionStatus::Optimal);
        assert_close(solution.objective_value().unwrap(), -4.0);
        let values = solution.values().unwrap();
        assert!(values.iter().all(|v| v.fract() == 0.0), "values {:?}", values);
        assert!(values[0] >= -3.0);
        assert!(model.is_feasible(values, 1e-7));
    }

    #[test]
    fn test_fixed_charge_with_tiny_relaxed_switch_is_feasible() {
        // min 2000 open - 5 ship with ship <= 3300 open and ship <= 0.002: the
        // relaxation sets open near 6e-7, which rounds to a closed plant
        let mut model = Model::new("fixed charge");
        let open = model.add_binary("open").unwrap();
        let ship = model.add_continuous("ship").unwrap();
        model.minimize(2000.0 * open - 5.0 * ship).unwrap();
        model.add_constraint(ship - 3300.0 * open, ConstraintOp::Le, 0.0, "capacity").unwrap();
        model.add_constraint(ship, ConstraintOp::Le, 0.002, "demand").unwrap();

        let solution = solve(&model).unwrap();

        assert_eq!(solution.status(), SolutionStatus::Optimal);
        let values = solution.values().unwrap();
        assert!(model.is_feasible(values, 1e-6), "infeasible point {:?}", values);
        assert_eq!(solution.value_of(open), Some(0.0));
        assert_close(solution.value_of(ship).unwrap(), 0.0);
        assert_close(solution.objective_value().unwrap(), 0.0);
    }

    #[test]
    fn test_node_limit_reports_resource_limit() {
        let mut model = Model::new("budget");
        let x = model.add_integer("x").unwrap();
        let y = model.add_integer("y").unwrap();
        model.maximize(x + y).unwrap();
        model.add_constraint(2.0 * x + 2.0 * y, ConstraintOp::Le, 7.0, "cap").unwrap();

        let solver = Solver::with_settings(SolverSettings::default().with_node_limit(1));
        let solution = solver.solve(&model).unwrap();

        assert_eq!(solution.status(), SolutionStatus::ResourceLimitReached);
        assert_eq!(solution.stats().nodes_explored, 1);
    }

    #[test]
    fn test_iteration_limit_reports_resource_limit() {
        let mut model = Model::new("iterations");
        let x = model.add_continuous("x").unwrap();
        let y = model.add_continuous("y").unwrap();
        model.maximize(x + y).unwrap();
        model.add_constraint(x + 2.0 * y, ConstraintOp::Le, 4.0, "a").unwrap();
        model.add_constraint(3.0 * x + y, ConstraintOp::Le, 6.0, "b").unwrap();

        let solver = Solver::with_settings(SolverSettings::default().with_max_iterations(1));
        let solution = solver.solve(&model).unwrap();

        assert_eq!(solution.status(), SolutionStatus::ResourceLimitReached);
        assert!(!solution.has_solution());
    }
}
