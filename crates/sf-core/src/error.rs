use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Rejections of numeric inputs, shared by every sepflow crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Negative value for {what}: {value}")]
    Negative { what: &'static str, value: f64 },

    /// Yields and split fractions live in `[0, 1]`.
    #[error("{what} must lie within [0, 1], got {value}")]
    NotAFraction { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
