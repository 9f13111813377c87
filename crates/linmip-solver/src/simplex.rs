use tracing::{debug, trace};

use crate::model::{Bounds, ConstraintOp, Model, Objective};
use crate::settings::SolverSettings;
use crate::solution::{ConstraintViolation, Sensitivity};
use crate::standard_form::{ColumnMap, RowOrigin, StandardForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LpStatus {
    Optimal,
    Infeasible,
    Unbounded,
    IterationLimit,
}

/// Result of one LP solve, in terms of the original variables
#[derive(Debug, Clone)]
pub(crate) struct LpOutcome {
    pub status: LpStatus,
    /// Variable values, empty unless Optimal
    pub values: Vec<f64>,
    /// Objective in the model's sense, constant included
    pub objective: Option<f64>,
    pub sensitivity: Option<Sensitivity>,
    pub violations: Vec<ConstraintViolation>,
    pub iterations: usize,
}

impl LpOutcome {
    fn terminal(status: LpStatus, iterations: usize) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: None,
            sensitivity: None,
            violations: Vec::new(),
            iterations,
        }
    }
}

/// Two-phase primal simplex over a dense tableau
pub(crate) struct Simplex<'a> {
    settings: &'a SolverSettings,
}

impl<'a> Simplex<'a> {
    pub fn new(settings: &'a SolverSettings) -> Self {
        Self { settings }
    }

    /// Solve the LP relaxation of `model` with `bounds` in place of the
    /// model's own variable bounds. Integrality is ignored.
    pub fn solve(&self, model: &Model, objective: &Objective, bounds: &[Bounds]) -> LpOutcome {
        let form = StandardForm::build(model, objective, bounds);
        let mut tableau = Tableau::new(&form);
        let mut state = PivotState::default();

        debug!(
            rows = tableau.n_rows(),
            structural = tableau.n_structural,
            artificial = tableau.n_artificial,
            "Solving LP"
        );

        if tableau.n_artificial > 0 {
            if self.phase1(&mut tableau, &mut state) == PhaseResult::IterationLimit {
                return LpOutcome::terminal(LpStatus::IterationLimit, state.iterations);
            }

            let residual = -tableau.objective_cell();
            debug!(residual, iterations = state.iterations, "Phase 1 finished");
            if residual > self.settings.feasibility_tolerance * tableau.rhs_scale {
                let mut outcome = LpOutcome::terminal(LpStatus::Infeasible, state.iterations);
                outcome.violations = self.violations(&tableau, &form, model, bounds);
                return outcome;
            }
            self.drive_out_artificials(&mut tableau);
        }

        self.install_objective(&mut tableau, &form);
        let limit = tableau.n_structural + tableau.n_slack;
        match self.run(&mut tableau, limit, &mut state) {
            PhaseResult::Optimal => {}
            PhaseResult::Unbounded => return LpOutcome::terminal(LpStatus::Unbounded, state.iterations),
            PhaseResult::IterationLimit => {
                return LpOutcome::terminal(LpStatus::IterationLimit, state.iterations);
            }
        }
        debug!(iterations = state.iterations, "Phase 2 finished");

        self.extract(&tableau, &form, model, objective, state.iterations)
    }

    /// Minimize the sum of artificials from the slack/artificial basis.
    fn phase1(&self, tableau: &mut Tableau, state: &mut PivotState) -> PhaseResult {
        let obj = tableau.obj_row();
        let art_start = tableau.n_structural + tableau.n_slack;
        let rhs_col = tableau.rhs_col();

        tableau.data[obj].fill(0.0);
        for j in art_start..rhs_col {
            tableau.data[obj][j] = 1.0;
        }

        // Price out the basic artificials
        for i in 0..tableau.n_rows() {
            if tableau.is_artificial(tableau.basic_vars[i]) {
                for j in 0..=rhs_col {
                    tableau.data[obj][j] -= tableau.data[i][j];
                }
            }
        }
        tableau.cost_scale = 1.0;

        self.run(tableau, rhs_col, state)
    }

    /// Pivot artificials that stayed basic at zero level out of the basis.
    /// A row with no usable column is redundant and stays as it is.
    fn drive_out_artificials(&self, tableau: &mut Tableau) {
        let limit = tableau.n_structural + tableau.n_slack;
        let rhs_col = tableau.rhs_col();

        for i in 0..tableau.n_rows() {
            if !tableau.is_artificial(tableau.basic_vars[i]) {
                continue;
            }
            let row = &tableau.data[i];
            let col = (0..limit)
                .filter(|&j| row[j].abs() > self.settings.tolerance)
                .max_by(|&a, &b| row[a].abs().total_cmp(&row[b].abs()));

            match col {
                Some(col) => {
                    tableau.data[i][rhs_col] = 0.0;
                    tableau.pivot(i, col);
                }
                None => debug!(row = i, "Redundant row left with artificial basic"),
            }
        }
    }

    /// Load the phase 2 costs into the objective row and price out the basis.
    fn install_objective(&self, tableau: &mut Tableau, form: &StandardForm) {
        let obj = tableau.obj_row();
        let rhs_col = tableau.rhs_col();

        tableau.data[obj].fill(0.0);
        tableau.data[obj][..form.n_structural].copy_from_slice(&form.costs);

        for i in 0..tableau.n_rows() {
            let basic = tableau.basic_vars[i];
            if basic >= form.n_structural {
                continue;
            }
            let cb = form.costs[basic];
            if cb != 0.0 {
                for j in 0..=rhs_col {
                    tableau.data[obj][j] -= cb * tableau.data[i][j];
                }
            }
        }

        tableau.cost_scale = form.costs.iter().fold(1.0_f64, |m, c| m.max(c.abs()));
    }

    /// Pivot until no column below `limit` has a negative reduced cost.
    fn run(&self, tableau: &mut Tableau, limit: usize, state: &mut PivotState) -> PhaseResult {
        let threshold = self.settings.tolerance * tableau.cost_scale;
        let rhs_col = tableau.rhs_col();

        loop {
            let bland = state.degenerate_run >= self.settings.degenerate_pivot_limit;
            let Some(col) = self.entering_column(tableau, limit, bland, threshold) else {
                return PhaseResult::Optimal;
            };
            let Some(row) = self.leaving_row(tableau, col, bland) else {
                return PhaseResult::Unbounded;
            };
            if state.iterations >= self.settings.max_iterations {
                debug!(iterations = state.iterations, "Iteration limit reached");
                return PhaseResult::IterationLimit;
            }

            let degenerate = tableau.data[row][rhs_col] <= self.settings.tolerance;
            trace!(row, col, bland, degenerate, "Pivot");
            tableau.pivot(row, col);

            state.iterations += 1;
            state.degenerate_run = if degenerate { state.degenerate_run + 1 } else { 0 };
        }
    }

    /// Most negative reduced cost (Dantzig), or the first negative one under
    /// Bland's rule. Ties go to the smallest column index.
    fn entering_column(&self, tableau: &Tableau, limit: usize, bland: bool, threshold: f64) -> Option<usize> {
        let obj = &tableau.data[tableau.obj_row()];
        if bland {
            return (0..limit).find(|&j| obj[j] < -threshold);
        }

        let mut min_val = -threshold;
        let mut min_col = None;
        for (j, &r) in obj.iter().enumerate().take(limit) {
            if r < min_val {
                min_val = r;
                min_col = Some(j);
            }
        }
        min_col
    }

    /// Minimum ratio test. Ties go to the smallest row index, or under
    /// Bland's rule to the row whose basic variable has the smallest index.
    fn leaving_row(&self, tableau: &Tableau, col: usize, bland: bool) -> Option<usize> {
        let tol = self.settings.tolerance;
        let rhs_col = tableau.rhs_col();

        let mut best: Option<(usize, f64)> = None;
        for i in 0..tableau.n_rows() {
            let val = tableau.data[i][col];
            if val <= tol {
                continue;
            }
            let ratio = tableau.data[i][rhs_col].max(0.0) / val;

            best = match best {
                None => Some((i, ratio)),
                Some((row, min_ratio)) => {
                    let slack = tol * min_ratio.max(1.0);
                    if ratio < min_ratio - slack {
                        Some((i, ratio))
                    } else if bland
                        && ratio <= min_ratio + slack
                        && tableau.basic_vars[i] < tableau.basic_vars[row]
                    {
                        Some((i, ratio))
                    } else {
                        Some((row, min_ratio))
                    }
                }
            };
        }
        best.map(|(row, _)| row)
    }

    fn extract(
        &self,
        tableau: &Tableau,
        form: &StandardForm,
        model: &Model,
        objective: &Objective,
        iterations: usize,
    ) -> LpOutcome {
        let tol = self.settings.tolerance;
        let sense = objective.sense.sign();
        let obj = tableau.obj_row();
        let clean = |v: f64| if v.abs() < tol { 0.0 } else { v };

        let cols = tableau.structural_values();
        let values: Vec<f64> = form.unmap(&cols).into_iter().map(clean).collect();
        let objective_value = objective.expr.evaluate(&values);

        // Minimization duals of the original rows
        let row_duals: Vec<f64> = form
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| -row.factor * tableau.data[obj][tableau.identity_cols[i]])
            .collect();

        let mut duals = vec![0.0; model.num_constraints()];
        let mut reduced_costs = vec![0.0; model.num_variables()];
        for (var, coef) in objective.expr.terms() {
            reduced_costs[var.index] = sense * coef;
        }
        for (row, &y) in form.rows.iter().zip(&row_duals) {
            if let RowOrigin::Constraint(k) = row.origin {
                duals[k] = clean(sense * y);
                for (var, a) in model.constraints()[k].expr.terms() {
                    reduced_costs[var.index] -= y * a;
                }
            }
        }
        let reduced_costs = reduced_costs.into_iter().map(|d| clean(sense * d)).collect();

        let in_basis = tableau.basis_mask();
        let basic = form
            .columns
            .iter()
            .zip(&form.upper_rows)
            .map(|(map, upper_row)| match *map {
                ColumnMap::Split { pos, neg } => in_basis[pos] || in_basis[neg],
                ColumnMap::Mirrored { col, .. } => in_basis[col],
                ColumnMap::Shifted { col, .. } => {
                    // Basic but pinned at its upper bound counts as nonbasic
                    in_basis[col] && upper_row.is_none_or(|r| in_basis[tableau.identity_cols[r]])
                }
            })
            .collect();

        let slacks = model
            .constraints()
            .iter()
            .map(|c| clean(c.slack(&values)))
            .collect();

        LpOutcome {
            status: LpStatus::Optimal,
            values,
            objective: Some(objective_value),
            sensitivity: Some(Sensitivity {
                duals,
                slacks,
                reduced_costs,
                basic,
            }),
            violations: Vec::new(),
            iterations,
        }
    }

    /// Rows whose artificial is still positive at the Phase 1 optimum
    fn violations(
        &self,
        tableau: &Tableau,
        form: &StandardForm,
        model: &Model,
        bounds: &[Bounds],
    ) -> Vec<ConstraintViolation> {
        let values = form.unmap(&tableau.structural_values());
        let rhs_col = tableau.rhs_col();
        let mut violations = Vec::new();

        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            let residual = tableau.data[i][rhs_col];
            if !tableau.is_artificial(basic) || residual <= self.settings.feasibility_tolerance {
                continue;
            }
            let row = &form.rows[i];
            let violation = match row.origin {
                RowOrigin::Constraint(k) => {
                    let c = &model.constraints()[k];
                    let actual = c.activity(&values);
                    let description = match c.op {
                        ConstraintOp::Le => format!("{} exceeds maximum of {:.2}", c.label, c.rhs),
                        ConstraintOp::Ge => format!("{} is below minimum of {:.2}", c.label, c.rhs),
                        ConstraintOp::Eq => format!("{} requires exactly {:.2}", c.label, c.rhs),
                    };
                    ConstraintViolation {
                        constraint: c.label.clone(),
                        required: c.rhs,
                        actual,
                        violation_amount: residual / row.factor.abs(),
                        description,
                    }
                }
                RowOrigin::UpperBound(j) => {
                    let name = &model.variables()[j].name;
                    ConstraintViolation {
                        constraint: format!("{}.upper", name),
                        required: bounds[j].upper,
                        actual: values[j],
                        violation_amount: residual / row.factor.abs(),
                        description: format!("{} exceeds its upper bound of {:.2}", name, bounds[j].upper),
                    }
                }
            };
            violations.push(violation);
        }

        violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));
        violations
    }
}

#[derive(Debug, Default)]
struct PivotState {
    iterations: usize,
    degenerate_run: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseResult {
    Optimal,
    Unbounded,
    IterationLimit,
}

/// Columns: structural | slack and surplus | artificial | RHS.
/// Rows: one per standardized row, then the objective row.
struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_structural: usize,
    n_slack: usize,
    n_artificial: usize,
    /// Per row: the column holding +1 in that row only (slack or artificial)
    identity_cols: Vec<usize>,
    /// Largest |cost| in the current objective row, at least 1
    cost_scale: f64,
    /// Largest initial RHS, at least 1
    rhs_scale: f64,
}

impl Tableau {
    fn new(form: &StandardForm) -> Self {
        let n_rows = form.rows.len();
        let n_structural = form.n_structural;
        let mut n_slack = 0;
        let mut n_artificial = 0;
        for row in &form.rows {
            match row.op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1;
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let total_cols = n_structural + n_slack + n_artificial + 1;
        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; n_rows + 1],
            basic_vars: vec![0; n_rows],
            n_structural,
            n_slack,
            n_artificial,
            identity_cols: vec![0; n_rows],
            cost_scale: 1.0,
            rhs_scale: form.rows.iter().fold(1.0_f64, |m, r| m.max(r.rhs)),
        };

        let mut slack_idx = n_structural;
        let mut artificial_idx = n_structural + n_slack;
        for (i, row) in form.rows.iter().enumerate() {
            for &(j, a) in &row.coefficients {
                tableau.data[i][j] += a;
            }
            tableau.data[i][total_cols - 1] = row.rhs;

            match row.op {
                ConstraintOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    tableau.identity_cols[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    tableau.identity_cols[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    tableau.identity_cols[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        tableau
    }

    fn n_rows(&self) -> usize {
        self.basic_vars.len()
    }

    fn obj_row(&self) -> usize {
        self.basic_vars.len()
    }

    fn rhs_col(&self) -> usize {
        self.data[0].len() - 1
    }

    /// Value cell of the objective row: minus the current objective.
    fn objective_cell(&self) -> f64 {
        self.data[self.obj_row()][self.rhs_col()]
    }

    fn is_artificial(&self, col: usize) -> bool {
        col >= self.n_structural + self.n_slack && col < self.rhs_col()
    }

    fn basis_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.rhs_col()];
        for &b in &self.basic_vars {
            mask[b] = true;
        }
        mask
    }

    fn structural_values(&self) -> Vec<f64> {
        let rhs_col = self.rhs_col();
        let mut values = vec![0.0; self.n_structural];
        for (i, &basic) in self.basic_vars.iter().enumerate() {
            if basic < self.n_structural {
                values[basic] = self.data[i][rhs_col].max(0.0);
            }
        }
        values
    }

    fn pivot(&mut self, row: usize, col: usize) {
        // Update basic variable
        self.basic_vars[row] = col;

        // Scale pivot row
        let pivot_val = self.data[row][col];
        for v in self.data[row].iter_mut() {
            *v /= pivot_val;
        }
        self.data[row][col] = 1.0;

        // Eliminate column in other rows
        let pivot_row = self.data[row].clone();
        for (i, r) in self.data.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = r[col];
            if factor == 0.0 {
                continue;
            }
            for (v, &p) in r.iter_mut().zip(&pivot_row) {
                *v -= factor * p;
                if v.abs() < ROUNDING_EPS {
                    *v = 0.0;
                }
            }
            r[col] = 0.0;
        }
    }
}

/// Entries this small after elimination are rounding noise
const ROUNDING_EPS: f64 = 1e-12;
