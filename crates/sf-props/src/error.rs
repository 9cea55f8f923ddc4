//! Property layer errors.

use sf_core::CoreError;

use crate::catalog::ComponentKind;
use sf_model::ModelError;
use thiserror::Error;

/// Result type for property operations.
pub type PropsResult<T> = Result<T, PropsError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropsError {
    /// A component set with no members.
    #[error("Empty component set")]
    EmptyComponents,

    /// Blank or whitespace-only component name.
    #[error("Invalid component name '{name}'")]
    InvalidComponent { name: String },

    /// Component requested from a state block that does not carry it.
    #[error("Component '{name}' is not carried by {package}")]
    UnknownComponent { name: String, package: String },

    /// Id missing from the component catalog, or cataloged under another kind.
    #[error("Component '{name}' is not cataloged as {expected:?} (found {found:?})")]
    NotCataloged {
        name: String,
        expected: ComponentKind,
        found: Option<ComponentKind>,
    },

    /// State argument that is not finite or negative.
    #[error("Invalid state argument for {what}: {source}")]
    InvalidStateArg {
        what: String,
        #[source]
        source: CoreError,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PropsError::UnknownComponent {
            name: "Nd".into(),
            package: "cascade".into(),
        };
        assert!(err.to_string().contains("Nd"));
        assert!(err.to_string().contains("cascade"));
    }
}
