use thiserror::Error;

use crate::services::location::LocationError;

/// Errors surfaced to the user from a discovery run
///
/// Provider transport and classification failures are recovered inside the
/// pipeline and never show up here.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Location(#[from] LocationError),

    #[error("Invalid discovery request: {0}")]
    InvalidRequest(String),

    #[error("Not enough variety of restaurants found ({found} cuisine(s)). Try increasing the search radius.")]
    InsufficientVariety { found: usize },

    #[error("A discovery run is already in progress")]
    Busy,
}

impl DiscoveryError {
    /// Whether the user can simply try again (possibly after changing input)
    pub fn is_retryable(&self) -> bool {
        match self {
            DiscoveryError::Location(_)
            | DiscoveryError::InvalidRequest(_)
            | DiscoveryError::InsufficientVariety { .. }
            | DiscoveryError::Busy => true,
        }
    }
}

impl From<validator::ValidationErrors> for DiscoveryError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DiscoveryError::InvalidRequest(errors.to_string())
    }
}
