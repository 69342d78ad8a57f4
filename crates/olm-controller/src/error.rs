use thiserror::Error;

use olm_semver::VersionError;

use crate::store::ConflictError;

/// Classification of failures by how the caller should react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Benign; short-circuits to a no-op path
    NotFound,
    /// Cannot succeed without a spec or catalog change
    Validation,
    /// No candidate satisfies the active constraints
    Unsatisfiable,
    /// A collaborator failed; retry
    Infrastructure,
    /// The pass was cancelled by its caller
    Cancelled,
}

/// Main error type for resolution and reconciliation
#[derive(Error, Debug, Clone)]
pub enum ControllerError {
    #[error("extension {0:?} not found")]
    NotFound(String),

    /// Clause-by-clause explanation of an empty candidate set
    #[error("{0}")]
    NoMatchingBundle(String),

    #[error(transparent)]
    InvalidVersionRange(#[from] VersionError),

    #[error("bundle {bundle:?} has invalid version {version:?}: {reason}")]
    InvalidBundleVersion {
        bundle: String,
        version: String,
        reason: String,
    },

    #[error("bundle {bundle:?} has a dependency declared via property {property:?} which is currently not supported")]
    UnsupportedDependency { bundle: String, property: String },

    #[error("bundle {bundle:?} has a malformed {property:?} property: {reason}")]
    InvalidDependency {
        bundle: String,
        property: String,
        reason: String,
    },

    #[error("could not find package dependencies for bundle {0:?}")]
    MissingDependency(String),

    #[error("invalid catalog {catalog:?}: {reason}")]
    InvalidCatalog { catalog: String, reason: String },

    /// The solver proved that no assignment exists
    #[error("{0}")]
    Unsatisfiable(String),

    /// The solver failed for reasons unrelated to the problem's satisfiability
    #[error("solver error: {0}")]
    Solver(String),

    #[error("error fetching catalog contents: {0}")]
    Catalog(String),

    #[error("error looking up installed bundle: {0}")]
    InstalledLookup(String),

    #[error("unpack failed: {0}")]
    Unpack(String),

    #[error("failed to apply desired deployment: {0}")]
    Apply(String),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("store error: {0}")]
    Store(String),

    #[error("reconcile cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ControllerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ControllerError::NotFound(_) => ErrorKind::NotFound,
            ControllerError::InvalidVersionRange(_)
            | ControllerError::InvalidBundleVersion { .. }
            | ControllerError::UnsupportedDependency { .. }
            | ControllerError::InvalidDependency { .. }
            | ControllerError::InvalidCatalog { .. }
            | ControllerError::Config(_) => ErrorKind::Validation,
            ControllerError::NoMatchingBundle(_)
            | ControllerError::MissingDependency(_)
            | ControllerError::Unsatisfiable(_) => ErrorKind::Unsatisfiable,
            ControllerError::Solver(_)
            | ControllerError::Catalog(_)
            | ControllerError::InstalledLookup(_)
            | ControllerError::Unpack(_)
            | ControllerError::Apply(_)
            | ControllerError::Conflict(_)
            | ControllerError::Store(_) => ErrorKind::Infrastructure,
            ControllerError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether retrying without any input change can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Infrastructure | ErrorKind::Cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ControllerError::Cancelled)
    }
}

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;
