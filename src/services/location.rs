use async_trait::async_trait;
use thiserror::Error;

use crate::models::GeoPoint;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Permission to access location was denied")]
    PermissionDenied,

    #[error("Could not get your location: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Device location capability
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_permission(&self) -> PermissionStatus;

    async fn current_position(&self) -> Result<GeoPoint, LocationError>;
}

/// Ask for permission, then read the current position
pub async fn locate(provider: &dyn LocationProvider) -> Result<GeoPoint, LocationError> {
    if provider.request_permission().await != PermissionStatus::Granted {
        tracing::warn!("Location permission denied");
        return Err(LocationError::PermissionDenied);
    }

    let position = provider.current_position().await?;
    tracing::debug!("Current location: {}", position);
    Ok(position)
}

/// Provider pinned to a known position, for shells without a GPS and for tests
#[derive(Debug, Clone)]
pub struct FixedLocation {
    position: Option<GeoPoint>,
    permission: PermissionStatus,
}

impl FixedLocation {
    pub fn new(position: GeoPoint) -> Self {
        Self {
            position: Some(position),
            permission: PermissionStatus::Granted,
        }
    }

    pub fn denied() -> Self {
        Self {
            position: None,
            permission: PermissionStatus::Denied,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            position: None,
            permission: PermissionStatus::Granted,
        }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn request_permission(&self) -> PermissionStatus {
        self.permission
    }

    async fn current_position(&self) -> Result<GeoPoint, LocationError> {
        if self.permission == PermissionStatus::Denied {
            return Err(LocationError::PermissionDenied);
        }
        self.position
            .ok_or_else(|| LocationError::Unavailable("no position fix".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_locate_granted() {
        let point = GeoPoint::new(37.7749, -122.4194);
        assert_eq!(locate(&FixedLocation::new(point)).await, Ok(point));
    }

    #[tokio::test]
    async fn test_locate_denied() {
        assert_eq!(
            locate(&FixedLocation::denied()).await,
            Err(LocationError::PermissionDenied)
        );
    }

    #[test]
    fn test_locate_unavailable() {
        let result = tokio_test::block_on(locate(&FixedLocation::unavailable()));
        assert!(matches!(result, Err(LocationError::Unavailable(_))));
    }
}
