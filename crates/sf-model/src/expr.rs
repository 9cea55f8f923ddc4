//! Expression trees for algebraic constraints.

use std::collections::BTreeSet;
use std::ops::{Add, Div, Mul, Neg, Sub};

use sf_core::VarId;

/// Algebraic expression over model variables.
///
/// Expressions are evaluated against the model's flat value vector, indexed
/// by variable slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    Var(VarId),
    Sum(Vec<Expr>),
    Product(Box<Expr>, Box<Expr>),
    Quotient(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
}

impl Expr {
    /// Sum of an arbitrary number of terms. An empty sum is zero.
    pub fn sum<I>(terms: I) -> Expr
    where
        I: IntoIterator,
        I::Item: Into<Expr>,
    {
        let mut flat = Vec::new();
        for term in terms {
            match term.into() {
                Expr::Sum(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::Const(0.0),
            1 => flat.pop().unwrap_or(Expr::Const(0.0)),
            _ => Expr::Sum(flat),
        }
    }

    pub fn eval(&self, values: &[f64]) -> f64 {
        match self {
            Expr::Const(c) => *c,
            Expr::Var(v) => values[v.slot()],
            Expr::Sum(terms) => terms.iter().map(|t| t.eval(values)).sum(),
            Expr::Product(a, b) => a.eval(values) * b.eval(values),
            Expr::Quotient(a, b) => a.eval(values) / b.eval(values),
            Expr::Neg(a) => -a.eval(values),
        }
    }

    /// Collect every variable referenced by this expression.
    pub fn collect_vars(&self, out: &mut BTreeSet<VarId>) {
        match self {
            Expr::Const(_) => {}
            Expr::Var(v) => {
                out.insert(*v);
            }
            Expr::Sum(terms) => terms.iter().for_each(|t| t.collect_vars(out)),
            Expr::Product(a, b) | Expr::Quotient(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Expr::Neg(a) => a.collect_vars(out),
        }
    }

    pub fn vars(&self) -> BTreeSet<VarId> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }
}

impl From<f64> for Expr {
    fn from(c: f64) -> Self {
        Expr::Const(c)
    }
}

impl From<VarId> for Expr {
    fn from(v: VarId) -> Self {
        Expr::Var(v)
    }
}

impl From<&Expr> for Expr {
    fn from(e: &Expr) -> Self {
        e.clone()
    }
}

impl<R: Into<Expr>> Add<R> for Expr {
    type Output = Expr;
    fn add(self, rhs: R) -> Expr {
        Expr::sum([self, rhs.into()])
    }
}

impl<R: Into<Expr>> Sub<R> for Expr {
    type Output = Expr;
    fn sub(self, rhs: R) -> Expr {
        Expr::sum([self, -rhs.into()])
    }
}

impl<R: Into<Expr>> Mul<R> for Expr {
    type Output = Expr;
    fn mul(self, rhs: R) -> Expr {
        Expr::Product(Box::new(self), Box::new(rhs.into()))
    }
}

impl<R: Into<Expr>> Div<R> for Expr {
    type Output = Expr;
    fn div(self, rhs: R) -> Expr {
        Expr::Quotient(Box::new(self), Box::new(rhs.into()))
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        match self {
            Expr::Const(c) => Expr::Const(-c),
            Expr::Neg(inner) => *inner,
            other => Expr::Neg(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: u32) -> Expr {
        Expr::Var(VarId::from_index(i))
    }

    #[test]
    fn eval_bilinear() {
        let values = [2.0, 3.0, 5.0];
        // x0 * x1 - 1.5 * x2
        let e = v(0) * v(1) - Expr::from(1.5) * v(2);
        assert!((e.eval(&values) - (6.0 - 7.5)).abs() < 1e-12);
    }

    #[test]
    fn sums_flatten() {
        let e = v(0) + v(1) + v(2);
        match e {
            Expr::Sum(terms) => assert_eq!(terms.len(), 3),
            other => panic!("expected flat sum, got {other:?}"),
        }
        assert_eq!(Expr::sum(Vec::<Expr>::new()), Expr::Const(0.0));
    }

    #[test]
    fn double_negation_cancels() {
        assert_eq!(-(-v(4)), v(4));
        assert_eq!(-Expr::from(2.0), Expr::Const(-2.0));
    }

    #[test]
    fn collects_referenced_vars() {
        let e = (v(3) - v(1)) / v(3) + 4.0;
        let vars: Vec<u32> = e.vars().into_iter().map(|id| id.index()).collect();
        assert_eq!(vars, vec![1, 3]);
    }
}
