//! Geolocation: resolve the user's current position.
//!
//! A [`PositionSource`] is the platform capability (a browser report, a
//! configured home position, ...). [`GeolocationResolver`] adds the deadline
//! and [`SessionLocation`] remembers the last fix so callers don't re-prompt
//! for permission on every request.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::types::{Coordinate, LocationError};

/// A platform capability that can produce the current position.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &'static str;

    /// Ask the platform for a position. May prompt the user for permission.
    async fn current_position(&self) -> Result<Coordinate, LocationError>;
}

/// Always reports the same position (configured home, CLI flags).
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinate);

#[async_trait]
impl PositionSource for FixedPosition {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        if self.0.is_valid() {
            Ok(self.0)
        } else {
            Err(LocationError::PositionUnavailable)
        }
    }
}

/// Stand-in when no location capability exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

#[async_trait]
impl PositionSource for Unsupported {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        Err(LocationError::UnsupportedPlatform)
    }
}

/// Outcome a client reported from its own geolocation API.
#[derive(Debug, Clone, Copy)]
pub enum ReportedPosition {
    Fix(Coordinate),
    /// W3C `GeolocationPositionError.code`
    Failed(u16),
}

#[async_trait]
impl PositionSource for ReportedPosition {
    fn name(&self) -> &'static str {
        "reported"
    }

    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        match *self {
            ReportedPosition::Fix(coord) if coord.is_valid() => Ok(coord),
            ReportedPosition::Fix(_) => Err(LocationError::PositionUnavailable),
            ReportedPosition::Failed(code) => Err(LocationError::from_browser_code(code)),
        }
    }
}

/// Wraps a position source with the client-specified deadline. No retries.
#[derive(Clone)]
pub struct GeolocationResolver {
    source: Arc<dyn PositionSource>,
    timeout: Duration,
}

impl GeolocationResolver {
    pub fn new(source: Arc<dyn PositionSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Resolve the current position.
    ///
    /// # Errors
    /// Whatever the source reports, or `LocationError::Timeout` once the
    /// deadline passes.
    pub async fn resolve(&self) -> Result<Coordinate, LocationError> {
        tracing::debug!("Requesting position from {} source", self.source.name());

        match tokio::time::timeout(self.timeout, self.source.current_position()).await {
            Ok(Ok(coord)) => {
                tracing::info!("Got location: {}, {}", coord.lat, coord.lng);
                Ok(coord)
            }
            Ok(Err(e)) => {
                tracing::warn!("Location lookup failed: {}", e);
                Err(e)
            }
            Err(_) => {
                tracing::warn!("Location lookup timed out after {:?}", self.timeout);
                Err(LocationError::Timeout)
            }
        }
    }
}

/// Session-scoped last-known location.
///
/// Shared by reference between the components that need a position; only an
/// explicit [`SessionLocation::invalidate`] forces a fresh lookup.
pub struct SessionLocation {
    resolver: GeolocationResolver,
    last_known: RwLock<Option<Coordinate>>,
}

impl SessionLocation {
    pub fn new(resolver: GeolocationResolver) -> Self {
        Self {
            resolver,
            last_known: RwLock::new(None),
        }
    }

    /// Last position stored in this session, if any.
    pub fn last_known(&self) -> Option<Coordinate> {
        *self.last_known.read()
    }

    /// Record a position obtained elsewhere (e.g. a map click).
    pub fn set(&self, coord: Coordinate) {
        *self.last_known.write() = Some(coord);
    }

    /// Forget the stored position.
    pub fn invalidate(&self) {
        *self.last_known.write() = None;
    }

    /// Return the stored position or resolve and remember a new one.
    ///
    /// Failures are not remembered; the next call asks the platform again.
    ///
    /// # Errors
    /// Propagates the resolver's `LocationError`.
    pub async fn get_or_resolve(&self) -> Result<Coordinate, LocationError> {
        if let Some(coord) = self.last_known() {
            tracing::debug!("Returning cached location: {}", coord);
            return Ok(coord);
        }

        let coord = self.resolver.resolve().await?;
        self.set(coord);
        Ok(coord)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        result: Result<Coordinate, LocationError>,
    }

    #[async_trait]
    impl PositionSource for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn current_position(&self) -> Result<Coordinate, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct SlowSource;

    #[async_trait]
    impl PositionSource for SlowSource {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn current_position(&self) -> Result<Coordinate, LocationError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Coordinate::new(0.0, 0.0))
        }
    }

    #[tokio::test]
    async fn test_fixed_position() {
        let resolver = GeolocationResolver::new(
            Arc::new(FixedPosition(Coordinate::new(47.6, -122.3))),
            Duration::from_secs(1),
        );
        assert_eq!(resolver.resolve().await.unwrap(), Coordinate::new(47.6, -122.3));
    }

    #[tokio::test]
    async fn test_unsupported_platform() {
        let resolver = GeolocationResolver::new(Arc::new(Unsupported), Duration::from_secs(1));
        assert_eq!(resolver.resolve().await, Err(LocationError::UnsupportedPlatform));
    }

    #[tokio::test]
    async fn test_timeout() {
        let resolver = GeolocationResolver::new(Arc::new(SlowSource), Duration::from_millis(20));
        assert_eq!(resolver.resolve().await, Err(LocationError::Timeout));
    }

    #[tokio::test]
    async fn test_reported_failure_codes() {
        let denied = ReportedPosition::Failed(1);
        assert_eq!(
            denied.current_position().await,
            Err(LocationError::PermissionDenied)
        );
        let bad_fix = ReportedPosition::Fix(Coordinate::new(200.0, 0.0));
        assert_eq!(
            bad_fix.current_position().await,
            Err(LocationError::PositionUnavailable)
        );
    }

    #[tokio::test]
    async fn test_session_location_caches_until_invalidated() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            result: Ok(Coordinate::new(1.0, 2.0)),
        });
        let session = SessionLocation::new(GeolocationResolver::new(
            source.clone(),
            Duration::from_secs(1),
        ));

        session.get_or_resolve().await.unwrap();
        session.get_or_resolve().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        session.invalidate();
        assert!(session.last_known().is_none());
        session.get_or_resolve().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_session_location_does_not_cache_failures() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            result: Err(LocationError::PermissionDenied),
        });
        let session = SessionLocation::new(GeolocationResolver::new(
            source.clone(),
            Duration::from_secs(1),
        ));

        assert!(session.get_or_resolve().await.is_err());
        assert!(session.get_or_resolve().await.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_session_location_set_skips_resolver() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            result: Ok(Coordinate::new(1.0, 2.0)),
        });
        let session = SessionLocation::new(GeolocationResolver::new(
            source.clone(),
            Duration::from_secs(1),
        ));

        session.set(Coordinate::new(5.0, 6.0));
        assert_eq!(session.get_or_resolve().await.unwrap(), Coordinate::new(5.0, 6.0));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
