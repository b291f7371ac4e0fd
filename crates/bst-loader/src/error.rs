//! Error types for bst-loader

use bst_config::CompositeError;
use bst_yaml::{AccessError, Provenance};
use thiserror::Error;

use crate::variants::VariantError;

/// Why a load failed.
///
/// Every reason has a stable code which collaborators may match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadErrorReason {
    /// A dependency or include file could not be found
    MissingFile,
    /// A file is not valid YAML, or its top level is not a mapping
    InvalidYaml,
    /// A document is well formed but holds an invalid declaration
    InvalidData,
    /// A typesafe composition changed a type, or an include overrode a key
    IllegalComposite,
    /// No consistent variant could be chosen for an element
    VariantDisagreement,
    /// The dependency graph (or include graph) contains a cycle
    CircularDependency,
    /// Two files, or two embedded elements, share an element name
    ConflictingName,
}

impl LoadErrorReason {
    pub fn code(&self) -> &'static str {
        match self {
            LoadErrorReason::MissingFile => "missing-file",
            LoadErrorReason::InvalidYaml => "invalid-yaml",
            LoadErrorReason::InvalidData => "invalid-data",
            LoadErrorReason::IllegalComposite => "illegal-composite",
            LoadErrorReason::VariantDisagreement => "variant-disagreement",
            LoadErrorReason::CircularDependency => "circular-dependency",
            LoadErrorReason::ConflictingName => "conflicting-name",
        }
    }
}

impl std::fmt::Display for LoadErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// The underlying failure a [`LoadError`] was raised for.
#[derive(Error, Debug)]
pub enum LoadErrorCause {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] bst_yaml::Error),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Composite(#[from] CompositeError),

    #[error(transparent)]
    Variant(#[from] VariantError),
}

/// An error which aborted loading.
///
/// The message is already rendered for the user, prefixed with the
/// provenance of the declaration at fault wherever one is implicated.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct LoadError {
    reason: LoadErrorReason,
    message: String,
    #[source]
    cause: Option<LoadErrorCause>,
}

impl LoadError {
    pub fn new(reason: LoadErrorReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the failure this error was raised for.
    pub fn with_cause(mut self, cause: impl Into<LoadErrorCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn reason(&self) -> LoadErrorReason {
        self.reason
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&LoadErrorCause> {
        self.cause.as_ref()
    }

    pub(crate) fn invalid_data(message: impl Into<String>) -> Self {
        Self::new(LoadErrorReason::InvalidData, message)
    }

    /// Report a failed composition of the layer declared at `provenance`.
    ///
    /// `subject` names the layer, e.g. `Variant 'x'` or `Arch x86_64`.
    pub(crate) fn composite(provenance: &Provenance, subject: &str, err: CompositeError) -> Self {
        let message = match &err {
            CompositeError::Type {
                path,
                expected,
                actual,
            } => format!(
                "{}: {} specifies type '{}' for path '{}', expected '{}'",
                provenance, subject, actual, path, expected
            ),
            CompositeError::Override { path, .. } => format!(
                "{}: {} tries to override existing key '{}'",
                provenance, subject, path
            ),
        };
        Self::new(LoadErrorReason::IllegalComposite, message).with_cause(err)
    }
}

impl From<AccessError> for LoadError {
    fn from(err: AccessError) -> Self {
        LoadError::invalid_data(err.to_string()).with_cause(err)
    }
}

impl From<VariantError> for LoadError {
    fn from(err: VariantError) -> Self {
        let reason = match err {
            VariantError::Disagreement { .. } => LoadErrorReason::VariantDisagreement,
            VariantError::Circular { .. } => LoadErrorReason::CircularDependency,
            VariantError::Missing { .. } => LoadErrorReason::InvalidData,
        };
        LoadError::new(reason, err.to_string()).with_cause(err)
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_reason_codes() {
        assert_eq!(LoadErrorReason::MissingFile.code(), "missing-file");
        assert_eq!(LoadErrorReason::InvalidYaml.code(), "invalid-yaml");
        assert_eq!(
            LoadErrorReason::VariantDisagreement.to_string(),
            "variant-disagreement"
        );
    }

    #[test]
    fn test_access_error_is_invalid_data() {
        let doc = bst_yaml::parse_file("kind: manual", "a.bst").unwrap();
        let err: LoadError = doc.get_string("name").unwrap_err().into();
        assert_eq!(err.reason(), LoadErrorReason::InvalidData);
        assert_eq!(
            err.to_string(),
            "a.bst [line 1 column 0]: Dictionary did not contain expected key 'name'"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_io_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = LoadError::new(LoadErrorReason::MissingFile, "Could not find file").with_cause(io);
        assert!(matches!(err.cause(), Some(LoadErrorCause::Io(_))));
        assert_eq!(err.source().map(|source| source.to_string()).as_deref(), Some("gone"));
    }
}
