//! Conversion of a model into the nonnegative, nonnegative-RHS form the
//! tableau works on.

use crate::model::{Bounds, ConstraintOp, Model, Objective};

/// How an original variable is expressed through structural columns
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ColumnMap {
    /// x = offset + col
    Shifted { col: usize, offset: f64 },
    /// x = offset - col
    Mirrored { col: usize, offset: f64 },
    /// x = pos - neg
    Split { pos: usize, neg: usize },
}

impl ColumnMap {
    pub fn value(&self, cols: &[f64]) -> f64 {
        match *self {
            ColumnMap::Shifted { col, offset } => offset + cols[col],
            ColumnMap::Mirrored { col, offset } => offset - cols[col],
            ColumnMap::Split { pos, neg } => cols[pos] - cols[neg],
        }
    }
}

/// Where a standardized row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowOrigin {
    /// Index into the model's constraints
    Constraint(usize),
    /// Finite upper bound of the variable with this index
    UpperBound(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct Row {
    /// Sparse structural coefficients
    pub coefficients: Vec<(usize, f64)>,
    pub op: ConstraintOp,
    /// Always >= 0
    pub rhs: f64,
    /// Factor the original row was multiplied by (sign flip and scaling)
    pub factor: f64,
    pub origin: RowOrigin,
}

#[derive(Debug, Clone)]
pub(crate) struct StandardForm {
    pub n_structural: usize,
    /// One entry per original variable
    pub columns: Vec<ColumnMap>,
    /// Minimization costs per structural column
    pub costs: Vec<f64>,
    pub rows: Vec<Row>,
    /// Row holding each variable's upper bound, if it needed one
    pub upper_rows: Vec<Option<usize>>,
}

impl StandardForm {
    /// Standardize `model` under `bounds`, which replace the model's own
    /// variable bounds (branch-and-bound passes tightened copies).
    pub fn build(model: &Model, objective: &Objective, bounds: &[Bounds]) -> Self {
        let mut n_structural = 0;
        let mut columns = Vec::with_capacity(bounds.len());
        let mut next_col = || {
            n_structural += 1;
            n_structural - 1
        };

        for b in bounds {
            let map = if b.lower.is_finite() {
                ColumnMap::Shifted { col: next_col(), offset: b.lower }
            } else if b.upper.is_finite() {
                ColumnMap::Mirrored { col: next_col(), offset: b.upper }
            } else {
                let pos = next_col();
                ColumnMap::Split { pos, neg: next_col() }
            };
            columns.push(map);
        }

        let sign = objective.sense.sign();
        let mut costs = vec![0.0; n_structural];
        for (var, coef) in objective.expr.terms() {
            let c = sign * coef;
            match columns[var.index] {
                ColumnMap::Shifted { col, .. } => costs[col] += c,
                ColumnMap::Mirrored { col, .. } => costs[col] -= c,
                ColumnMap::Split { pos, neg } => {
                    costs[pos] += c;
                    costs[neg] -= c;
                }
            }
        }

        let mut rows = Vec::with_capacity(model.num_constraints());
        for (i, constraint) in model.constraints().iter().enumerate() {
            let mut coefficients = Vec::with_capacity(constraint.expr.len());
            let mut rhs = constraint.rhs;
            for (var, a) in constraint.expr.terms() {
                match columns[var.index] {
                    ColumnMap::Shifted { col, offset } => {
                        coefficients.push((col, a));
                        rhs -= a * offset;
                    }
                    ColumnMap::Mirrored { col, offset } => {
                        coefficients.push((col, -a));
                        rhs -= a * offset;
                    }
                    ColumnMap::Split { pos, neg } => {
                        coefficients.push((pos, a));
                        coefficients.push((neg, -a));
                    }
                }
            }
            rows.push(normalize(coefficients, constraint.op, rhs, RowOrigin::Constraint(i)));
        }

        let mut upper_rows = vec![None; bounds.len()];
        for (j, b) in bounds.iter().enumerate() {
            if let ColumnMap::Shifted { col, offset } = columns[j] {
                if b.upper.is_finite() {
                    upper_rows[j] = Some(rows.len());
                    rows.push(normalize(
                        vec![(col, 1.0)],
                        ConstraintOp::Le,
                        b.upper - offset,
                        RowOrigin::UpperBound(j),
                    ));
                }
            }
        }

        Self {
            n_structural,
            columns,
            costs,
            rows,
            upper_rows,
        }
    }

    /// Original variable values from structural column values.
    pub fn unmap(&self, cols: &[f64]) -> Vec<f64> {
        self.columns.iter().map(|map| map.value(cols)).collect()
    }
}

/// Make the right-hand side nonnegative, turn `>= 0` rows into `<= 0` rows
/// so they start with a slack in the basis instead of an artificial, and
/// scale the row so its largest coefficient has magnitude 1.
fn normalize(mut coefficients: Vec<(usize, f64)>, op: ConstraintOp, rhs: f64, origin: RowOrigin) -> Row {
    let mut sign = 1.0;
    let mut op = op;

    if rhs < 0.0 {
        sign = -1.0;
        op = flip(op);
    }
    if op == ConstraintOp::Ge && rhs == 0.0 {
        sign = -sign;
        op = ConstraintOp::Le;
    }

    let largest = coefficients.iter().fold(0.0_f64, |m, &(_, a)| m.max(a.abs()));
    let scale = if largest > 0.0 { largest } else { 1.0 };
    let factor = sign / scale;
    for (_, a) in coefficients.iter_mut() {
        *a *= factor;
    }

    Row {
        coefficients,
        op,
        rhs: (rhs * factor).abs(),
        factor,
        origin,
    }
}

fn flip(op: ConstraintOp) -> ConstraintOp {
    match op {
        ConstraintOp::Le => ConstraintOp::Ge,
        ConstraintOp::Ge => ConstraintOp::Le,
        ConstraintOp::Eq => ConstraintOp::Eq,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Domain, Sense};

    #[test]
    fn test_shift_mirror_and_split() {
        let mut model = Model::new("std");
        let x = model.add_variable("x", Domain::Continuous, 2.0, 5.0).unwrap();
        let y = model
            .add_variable("y", Domain::Continuous, f64::NEG_INFINITY, 4.0)
            .unwrap();
        let z = model
            .add_variable("z", Domain::Continuous, f64::NEG_INFINITY, f64::INFINITY)
            .unwrap();
        model.add_constraint(x + y + z, ConstraintOp::Le, 10.0, "sum").unwrap();
        model.set_objective(x - y + 2.0 * z, Sense::Maximize).unwrap();

        let objective = model.objective().unwrap().clone();
        let form = StandardForm::build(&model, &objective, &model.bounds());

        assert_eq!(form.n_structural, 4);
        assert_eq!(form.columns[0], ColumnMap::Shifted { col: 0, offset: 2.0 });
        assert_eq!(form.columns[1], ColumnMap::Mirrored { col: 1, offset: 4.0 });
        assert_eq!(form.columns[2], ColumnMap::Split { pos: 2, neg: 3 });
        // maximize is negated into minimization
        assert_eq!(form.costs, vec![-1.0, -1.0, -2.0, 2.0]);

        // x' - y' + z+ - z- <= 10 - 2 - 4
        let sum = &form.rows[0];
        assert_eq!(sum.rhs, 4.0);
        assert_eq!(sum.coefficients, vec![(0, 1.0), (1, -1.0), (2, 1.0), (3, -1.0)]);

        // x' <= 3
        assert_eq!(form.upper_rows, vec![Some(1), None, None]);
        assert_eq!(form.rows[1].rhs, 3.0);
        assert_eq!(form.rows[1].origin, RowOrigin::UpperBound(0));

        assert_eq!(form.unmap(&[1.0, 1.0, 0.0, 2.0]), vec![3.0, 3.0, -2.0]);
    }

    #[test]
    fn test_rows_scaled_to_unit_coefficient() {
        let mut model = Model::new("scale");
        let x = model.add_continuous("x").unwrap();
        let y = model.add_continuous("y").unwrap();
        model.add_constraint(4.0 * x - 8.0 * y, ConstraintOp::Le, 16.0, "wide").unwrap();
        model.minimize(x).unwrap();

        let objective = model.objective().unwrap().clone();
        let form = StandardForm::build(&model, &objective, &model.bounds());

        assert_eq!(form.rows[0].factor, 0.125);
        assert_eq!(form.rows[0].coefficients, vec![(0, 0.5), (1, -1.0)]);
        assert_eq!(form.rows[0].rhs, 2.0);
    }

    #[test]
    fn test_negative_rhs_flips_row() {
        let mut model = Model::new("flip");
        let x = model.add_continuous("x").unwrap();
        model.add_constraint(-1.0 * x, ConstraintOp::Le, -3.0, "neg").unwrap();
        model.add_constraint(x, ConstraintOp::Ge, 0.0, "zero").unwrap();
        model.minimize(x).unwrap();

        let objective = model.objective().unwrap().clone();
        let form = StandardForm::build(&model, &objective, &model.bounds());

        assert_eq!(form.rows[0].op, ConstraintOp::Ge);
        assert_eq!(form.rows[0].rhs, 3.0);
        assert_eq!(form.rows[0].factor, -1.0);
        assert_eq!(form.rows[0].coefficients, vec![(0, 1.0)]);

        assert_eq!(form.rows[1].op, ConstraintOp::Le);
        assert_eq!(form.rows[1].factor, -1.0);
        assert_eq!(form.rows[1].coefficients, vec![(0, -1.0)]);
    }
}
