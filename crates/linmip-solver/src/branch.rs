use tracing::debug;

use crate::model::{Bounds, Model, Objective};
use crate::settings::SolverSettings;
use crate::simplex::{LpOutcome, LpStatus, Simplex};
use crate::solution::{Sensitivity, SolutionStatus, SolveStats};

/// Result of a branch-and-bound search
#[derive(Debug, Clone)]
pub(crate) struct MipOutcome {
    pub status: SolutionStatus,
    /// Best integral point, empty when none was found
    pub values: Vec<f64>,
    pub objective: Option<f64>,
    /// Sensitivity of the LP that produced the incumbent
    pub relaxation: Option<Sensitivity>,
    pub stats: SolveStats,
}

/// One pending subproblem: the model with tightened integer bounds
#[derive(Debug, Clone)]
struct Node {
    bounds: Vec<Bounds>,
    /// Parent relaxation objective, minimization sense
    parent_bound: f64,
    depth: usize,
}

struct Incumbent {
    values: Vec<f64>,
    objective: f64,
    /// `objective` in minimization sense
    bound: f64,
    relaxation: Option<Sensitivity>,
}

/// Depth-first branch-and-bound over LP relaxations
pub(crate) struct BranchAndBound<'a> {
    settings: &'a SolverSettings,
}

impl<'a> BranchAndBound<'a> {
    pub fn new(settings: &'a SolverSettings) -> Self {
        Self { settings }
    }

    pub fn solve(&self, model: &Model, objective: &Objective) -> MipOutcome {
        let sense = objective.sense.sign();
        let integer: Vec<bool> = model.variables().iter().map(|v| v.domain.is_integer()).collect();
        let simplex = Simplex::new(self.settings);

        let root = Node {
            bounds: root_bounds(model, &integer),
            parent_bound: f64::NEG_INFINITY,
            depth: 0,
        };
        let mut stack = vec![root];
        let mut incumbent: Option<Incumbent> = None;
        let mut stats = SolveStats::default();
        let mut limit_hit = false;

        while let Some(node) = stack.pop() {
            if self.is_pruned(node.parent_bound, incumbent.as_ref()) {
                stats.nodes_pruned += 1;
                continue;
            }
            if stats.nodes_explored >= self.settings.node_limit {
                debug!(nodes = stats.nodes_explored, open = stack.len() + 1, "Node limit reached");
                limit_hit = true;
                break;
            }

            stats.nodes_explored += 1;
            let mut lp = simplex.solve(model, objective, &node.bounds);
            stats.simplex_iterations += lp.iterations;

            let relaxed_objective = match (lp.status, lp.objective) {
                (LpStatus::Optimal, Some(value)) => value,
                (LpStatus::Unbounded, _) => {
                    debug!(depth = node.depth, "Unbounded relaxation");
                    return MipOutcome {
                        status: SolutionStatus::Unbounded,
                        values: Vec::new(),
                        objective: None,
                        relaxation: None,
                        stats,
                    };
                }
                (LpStatus::IterationLimit, _) => {
                    limit_hit = true;
                    continue;
                }
                _ => continue,
            };

            let bound = sense * relaxed_objective;
            debug_assert!(
                bound >= node.parent_bound - self.settings.feasibility_tolerance * (1.0 + bound.abs()),
                "child relaxation better than its parent"
            );
            if self.is_pruned(bound, incumbent.as_ref()) {
                stats.nodes_pruned += 1;
                continue;
            }

            let integer_values = lp
                .values
                .iter_mut()
                .zip(&node.bounds)
                .zip(&integer)
                .filter(|(_, is_int)| **is_int);
            for ((value, b), _) in integer_values {
                *value = value.max(b.lower).min(b.upper);
            }

            let tolerance = self.settings.integrality_tolerance;
            let (j, lp_values) = match self.branching_variable(&lp.values, &integer, tolerance) {
                Some(j) => (j, lp.values),
                None => match self.round(model, objective, &node.bounds, &integer, lp, &mut stats) {
                    Rounding::Branch { variable, values } => (variable, values),
                    Rounding::Integral { mut values, relaxation } => {
                        for (value, _) in values.iter_mut().zip(&integer).filter(|(_, is_int)| **is_int) {
                            *value = value.round();
                        }
                        let objective_value = objective.expr.evaluate(&values);
                        if self.is_pruned(sense * objective_value, incumbent.as_ref()) {
                            stats.nodes_pruned += 1;
                            continue;
                        }
                        debug!(
                            objective = objective_value,
                            depth = node.depth,
                            nodes = stats.nodes_explored,
                            "New incumbent"
                        );
                        stats.incumbent_updates += 1;
                        incumbent = Some(Incumbent {
                            bound: sense * objective_value,
                            objective: objective_value,
                            values,
                            relaxation,
                        });
                        continue;
                    }
                },
            };

            let value = lp_values[j];
            let down = value.floor();
            let up = value.ceil();

            let mut down_bounds = node.bounds.clone();
            down_bounds[j].upper = down;
            let mut up_bounds = node.bounds;
            up_bounds[j].lower = up;

            let down_node = Node {
                bounds: down_bounds,
                parent_bound: bound,
                depth: node.depth + 1,
            };
            let up_node = Node {
                bounds: up_bounds,
                parent_bound: bound,
                depth: node.depth + 1,
            };

            // The child on the side of the nearer integer is popped first
            if value - down <= up - value {
                stack.push(up_node);
                stack.push(down_node);
            } else {
                stack.push(down_node);
                stack.push(up_node);
            }
        }

        let status = match (&incumbent, limit_hit) {
            (_, true) => SolutionStatus::ResourceLimitReached,
            (Some(_), false) => SolutionStatus::Optimal,
            (None, false) => SolutionStatus::Infeasible,
        };
        debug!(
            %status,
            nodes = stats.nodes_explored,
            pruned = stats.nodes_pruned,
            "Branch-and-bound finished"
        );

        match incumbent {
            Some(best) => MipOutcome {
                status,
                values: best.values,
                objective: Some(best.objective),
                relaxation: best.relaxation,
                stats,
            },
            None => MipOutcome {
                status,
                values: Vec::new(),
                objective: None,
                relaxation: None,
                stats,
            },
        }
    }

    /// A node whose bound is no better than the incumbent cannot improve it.
    fn is_pruned(&self, bound: f64, incumbent: Option<&Incumbent>) -> bool {
        incumbent.is_some_and(|best| {
            bound >= best.bound - self.settings.tolerance * best.bound.abs().max(1.0)
        })
    }

    /// Integer variable whose value is closest to a half-integer, among
    /// those more than `threshold` away from an integer; ties go to the
    /// smallest index.
    fn branching_variable(&self, values: &[f64], integer: &[bool], threshold: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (j, (&value, &is_int)) in values.iter().zip(integer).enumerate() {
            if !is_int {
                continue;
            }
            let fraction = value - value.floor();
            let distance = fraction.min(1.0 - fraction);
            if distance <= threshold {
                continue;
            }
            if best.is_none_or(|(_, d)| distance > d) {
                best = Some((j, distance));
            }
        }
        best.map(|(j, _)| j)
    }

    /// Turn an LP point whose integer variables are all within tolerance of
    /// an integer into an exactly integral point.
    ///
    /// The continuous variables are re-optimized with the integer variables
    /// fixed at their rounded values. When that LP fails or loses objective,
    /// the rounding was not harmless and the node is branched on instead.
    fn round(
        &self,
        model: &Model,
        objective: &Objective,
        bounds: &[Bounds],
        integer: &[bool],
        lp: LpOutcome,
        stats: &mut SolveStats,
    ) -> Rounding {
        let Some(variable) = self.branching_variable(&lp.values, integer, 0.0) else {
            return Rounding::Integral {
                values: lp.values,
                relaxation: lp.sensitivity,
            };
        };

        let mut fixed = bounds.to_vec();
        let integer_values = fixed.iter_mut().zip(&lp.values).zip(integer).filter(|(_, is_int)| **is_int);
        for ((b, &value), _) in integer_values {
            let value = value.round();
            *b = Bounds {
                lower: value,
                upper: value,
            };
        }
        let resolved = Simplex::new(self.settings).solve(model, objective, &fixed);
        stats.simplex_iterations += resolved.iterations;

        let sense = objective.sense.sign();
        let relaxed = lp.objective.map_or(f64::NEG_INFINITY, |value| sense * value);
        let slack = self.settings.tolerance * relaxed.abs().max(1.0);
        match (resolved.status, resolved.objective) {
            (LpStatus::Optimal, Some(value)) if sense * value <= relaxed + slack => Rounding::Integral {
                values: resolved.values,
                relaxation: resolved.sensitivity,
            },
            _ => {
                debug!(variable, value = lp.values[variable], "Rounding changes the relaxation; branching");
                Rounding::Branch {
                    variable,
                    values: lp.values,
                }
            }
        }
    }
}

enum Rounding {
    /// Integer variables hold exact integers
    Integral {
        values: Vec<f64>,
        relaxation: Option<Sensitivity>,
    },
    /// Branch on `variable` of the node's LP point `values`
    Branch { variable: usize, values: Vec<f64> },
}

/// Model bounds with integer bounds rounded inward
fn root_bounds(model: &Model, integer: &[bool]) -> Vec<Bounds> {
    model
        .bounds()
        .into_iter()
        .zip(integer)
        .map(|(b, &is_int)| {
            if is_int {
                Bounds {
                    lower: b.lower.ceil(),
                    upper: b.upper.floor(),
                }
            } else {
                b
            }
        })
        .collect()
}
