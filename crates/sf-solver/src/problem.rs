//! Square residual system extracted from a model scope.

use nalgebra::{DMatrix, DVector};
use sf_core::VarId;
use sf_model::{Constraint, Model, Scope};

use crate::error::{SolverError, SolverResult};
use crate::jacobian::incidence_fd_jacobian;

/// Free variables and active constraints of one scope, packed for Newton.
///
/// The unknown vector `x` holds the free variables in id order; residual row
/// `i` is `lhs - rhs` of the i-th active constraint in creation order.
pub struct ResidualSystem<'m> {
    model: &'m Model,
    vars: Vec<VarId>,
    cons: Vec<&'m Constraint>,
    /// Rows touching each column.
    columns: Vec<Vec<usize>>,
    /// Full value vector; free slots are overwritten from `x` before each evaluation.
    values: Vec<f64>,
}

impl<'m> ResidualSystem<'m> {
    /// Extract the system for `scope`. Fails unless it is square.
    pub fn new(model: &'m Model, scope: Scope) -> SolverResult<Self> {
        let vars = model.free_variables(scope);
        let cons = model
            .active_constraints(scope)
            .into_iter()
            .map(|id| model.constraint(id))
            .collect::<Result<Vec<_>, _>>()?;

        if vars.len() != cons.len() {
            let dof = vars.len() as i64 - cons.len() as i64;
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "system is not square: {} free variables, {} constraints (DoF = {dof})",
                    vars.len(),
                    cons.len()
                ),
            });
        }

        let mut columns = vec![Vec::new(); vars.len()];
        for (i, con) in cons.iter().enumerate() {
            for v in con.vars() {
                if let Ok(j) = vars.binary_search(v) {
                    columns[j].push(i);
                }
            }
        }

        Ok(Self {
            model,
            vars,
            cons,
            columns,
            values: model.values().to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn vars(&self) -> &[VarId] {
        &self.vars
    }

    /// Current values of the unknowns.
    pub fn x0(&self) -> DVector<f64> {
        DVector::from_iterator(self.vars.len(), self.vars.iter().map(|v| self.values[v.slot()]))
    }

    /// Lower and upper bounds of the unknowns, infinite where unset.
    pub fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        self.vars
            .iter()
            .map(|&v| match self.model.var(v) {
                Ok(var) => (
                    var.lower.unwrap_or(f64::NEG_INFINITY),
                    var.upper.unwrap_or(f64::INFINITY),
                ),
                Err(_) => (f64::NEG_INFINITY, f64::INFINITY),
            })
            .unzip()
    }

    fn scatter(&mut self, x: &DVector<f64>) {
        for (v, xi) in self.vars.iter().zip(x.iter()) {
            self.values[v.slot()] = *xi;
        }
    }

    pub fn residuals(&mut self, x: &DVector<f64>) -> DVector<f64> {
        self.scatter(x);
        let values = &self.values;
        DVector::from_iterator(self.cons.len(), self.cons.iter().map(|c| c.residual(values)))
    }

    /// Forward-difference Jacobian at `x`, where `f_x` are the residuals at `x`.
    pub fn jacobian(&mut self, x: &DVector<f64>, f_x: &DVector<f64>, epsilon: f64) -> DMatrix<f64> {
        self.scatter(x);
        let Self {
            vars,
            cons,
            columns,
            values,
            ..
        } = self;
        incidence_fd_jacobian(
            x,
            f_x,
            columns,
            |i, j, v| {
                let slot = vars[j].slot();
                values[slot] = v;
                let r = cons[i].residual(values);
                values[slot] = x[j];
                r
            },
            epsilon,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_model::Expr;

    #[test]
    fn non_square_rejected() {
        let mut m = Model::new("fs");
        let x = m.add_var(m.root(), "x", (), 1.0).unwrap();
        let y = m.add_var(m.root(), "y", (), 1.0).unwrap();
        m.add_constraint(m.root(), "eq", (), Expr::Var(x) + y, 2.0)
            .unwrap();
        let err = ResidualSystem::new(&m, Scope::All).err().unwrap();
        assert!(err.to_string().contains("DoF = 1"));
    }

    #[test]
    fn residuals_and_jacobian() {
        let mut m = Model::new("fs");
        let x = m.add_var(m.root(), "x", (), 2.0).unwrap();
        let y = m.add_var(m.root(), "y", (), 3.0).unwrap();
        m.add_constraint(m.root(), "prod", (), Expr::Var(x) * y, 6.0)
            .unwrap();
        m.add_constraint(m.root(), "lin", (), Expr::Var(y), 1.0)
            .unwrap();
        let mut sys = ResidualSystem::new(&m, Scope::All).unwrap();
        let x0 = sys.x0();
        let r = sys.residuals(&x0);
        assert_eq!(r.as_slice(), &[0.0, 2.0]);

        let jac = sys.jacobian(&x0, &r, 1e-7);
        assert!((jac[(0, 0)] - 3.0).abs() < 1e-5);
        assert!((jac[(0, 1)] - 2.0).abs() < 1e-5);
        assert_eq!(jac[(1, 0)], 0.0);
        assert!((jac[(1, 1)] - 1.0).abs() < 1e-6);
    }
}
