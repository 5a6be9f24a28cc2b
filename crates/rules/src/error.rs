//! Errors that stop a validation run.
//!
//! Rule compile failures are not errors at this level; they are the normal
//! result of a run. Everything here means the run could not complete.

use std::error::Error as StdError;

use crate::loader::{DependencyResolutionFailure, LoadError};

#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    /// The module image itself could not be read or decoded.
    #[error(transparent)]
    Load(LoadError),

    /// The module, or a module it references, could not be resolved.
    #[error(transparent)]
    DependencyResolution(DependencyResolutionFailure),

    /// A rule annotation failed in a way the rule subsystem does not own.
    #[error("unclassified failure compiling {attribute} on {type_name}.{field}: {source}")]
    Unclassified {
        type_name: String,
        field: String,
        attribute: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl From<LoadError> for ValidateError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Unresolved(failure) => Self::DependencyResolution(failure),
            other => Self::Load(other),
        }
    }
}
