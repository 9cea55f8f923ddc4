//! Float comparison and input checks.
//!
//! Every parameter that reaches the model passes through one of the
//! `ensure_*` helpers so bad configuration fails at build time.

use crate::CoreError;

pub type Real = f64;

/// Absolute plus relative comparison tolerance.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    pub fn accepts(&self, a: Real, b: Real) -> bool {
        nearly_equal(a, b, *self)
    }
}

/// `|a - b|` within `abs`, or within `rel` of the larger magnitude.
pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if !v.is_finite() {
        return Err(CoreError::NonFinite { what, value: v });
    }
    Ok(v)
}

/// Flows, concentrations, coefficients, volumes.
pub fn ensure_non_negative(v: Real, what: &'static str) -> Result<Real, CoreError> {
    match ensure_finite(v, what)? {
        v if v < 0.0 => Err(CoreError::Negative { what, value: v }),
        v => Ok(v),
    }
}

/// Yields and split fractions.
pub fn ensure_fraction(v: Real, what: &'static str) -> Result<Real, CoreError> {
    match ensure_finite(v, what)? {
        v if (0.0..=1.0).contains(&v) => Ok(v),
        v => Err(CoreError::NotAFraction { what, value: v }),
    }
}
