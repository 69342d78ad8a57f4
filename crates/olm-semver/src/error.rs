use thiserror::Error;

/// Error type for version and range parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid semantic version \"{0}\"")]
    InvalidVersion(String),
    #[error("Invalid version range \"{input}\": {reason}")]
    InvalidConstraint { input: String, reason: String },
}

impl VersionError {
    pub(crate) fn constraint(input: &str, reason: impl Into<String>) -> Self {
        VersionError::InvalidConstraint {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
