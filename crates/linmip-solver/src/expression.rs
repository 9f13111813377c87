use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Handle to a variable owned by a [`Model`](crate::Model).
///
/// Handles are cheap to copy. They remember which model created them, so a
/// handle from one model is rejected by every other model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    pub(crate) model: u64,
    pub(crate) index: usize,
}

impl Variable {
    /// Position of the variable in its model, in declaration order.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// A linear expression `sum(coef * var) + constant`.
///
/// Terms are kept ordered by variable declaration order. Arithmetic consumes
/// its operands and returns a new expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: BTreeMap<Variable, f64>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an expression from `(variable, coefficient)` pairs.
    /// Repeated variables have their coefficients summed.
    pub fn from_terms(terms: impl IntoIterator<Item = (Variable, f64)>) -> Self {
        let mut expr = Self::new();
        for (var, coef) in terms {
            expr.add_term(var, coef);
        }
        expr
    }

    pub fn with_term(mut self, var: Variable, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn with_constant(mut self, constant: f64) -> Self {
        self.constant += constant;
        self
    }

    /// Coefficient of `var`, or 0 if it does not appear.
    pub fn coefficient(&self, var: Variable) -> f64 {
        self.terms.get(&var).copied().unwrap_or(0.0)
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn terms(&self) -> impl Iterator<Item = (Variable, f64)> + '_ {
        self.terms.iter().map(|(&var, &coef)| (var, coef))
    }

    /// Number of variables with a nonzero coefficient.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True when the expression has no variable terms (it may still carry a constant).
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate against values indexed by variable position.
    /// Variables past the end of `values` count as 0.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coef)| coef * values.get(var.index).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }

    fn add_term(&mut self, var: Variable, coef: f64) {
        let entry = self.terms.entry(var).or_insert(0.0);
        *entry += coef;
        if *entry == 0.0 {
            self.terms.remove(&var);
        }
    }

    fn scale(mut self, factor: f64) -> Self {
        if factor == 0.0 {
            return Self::new();
        }
        for coef in self.terms.values_mut() {
            *coef *= factor;
        }
        self.constant *= factor;
        self
    }
}

impl From<Variable> for LinearExpr {
    fn from(var: Variable) -> Self {
        Self::new().with_term(var, 1.0)
    }
}

impl From<f64> for LinearExpr {
    fn from(constant: f64) -> Self {
        Self::new().with_constant(constant)
    }
}

impl<T: Into<LinearExpr>> AddAssign<T> for LinearExpr {
    fn add_assign(&mut self, rhs: T) {
        let rhs = rhs.into();
        for (var, coef) in rhs.terms {
            self.add_term(var, coef);
        }
        self.constant += rhs.constant;
    }
}

impl<T: Into<LinearExpr>> SubAssign<T> for LinearExpr {
    fn sub_assign(&mut self, rhs: T) {
        *self += -rhs.into();
    }
}

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: T) -> LinearExpr {
        self += rhs;
        self
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: T) -> LinearExpr {
        self -= rhs;
        self
    }
}

impl<T: Into<LinearExpr>> Add<T> for Variable {
    type Output = LinearExpr;

    fn add(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) + rhs
    }
}

impl<T: Into<LinearExpr>> Sub<T> for Variable {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Add<Variable> for f64 {
    type Output = LinearExpr;

    fn add(self, rhs: Variable) -> LinearExpr {
        LinearExpr::from(rhs) + self
    }
}

impl Add<LinearExpr> for f64 {
    type Output = LinearExpr;

    fn add(self, rhs: LinearExpr) -> LinearExpr {
        rhs + self
    }
}

impl Sub<Variable> for f64 {
    type Output = LinearExpr;

    fn sub(self, rhs: Variable) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Sub<LinearExpr> for f64 {
    type Output = LinearExpr;

    fn sub(self, rhs: LinearExpr) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        self.scale(rhs)
    }
}

impl Mul<LinearExpr> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: LinearExpr) -> LinearExpr {
        rhs.scale(self)
    }
}

impl Mul<f64> for Variable {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        LinearExpr::new().with_term(self, rhs)
    }
}

impl Mul<Variable> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: Variable) -> LinearExpr {
        LinearExpr::new().with_term(rhs, self)
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self.scale(-1.0)
    }
}

impl Neg for Variable {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        LinearExpr::new().with_term(self, -1.0)
    }
}

impl<T: Into<LinearExpr>> Sum<T> for LinearExpr {
    fn sum<I: Iterator<Item = T>>(iter: I) -> Self {
        iter.fold(LinearExpr::new(), |acc, item| acc + item)
    }
}
