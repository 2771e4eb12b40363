//! Location services for spotfinder.
//!
//! Geolocation, reverse geocoding with provider racing, nearby fishing-spot
//! search and marine protected areas.

pub mod geocode;
pub mod location;
pub mod mpa;
pub mod places;
pub mod race;
pub mod types;

pub use geocode::{Geocoder, RegionResolver};
pub use location::{GeolocationResolver, PositionSource, SessionLocation};
pub use mpa::{MarineProtectedArea, MpaClient, ProtectionLevel};
pub use places::PlacesClient;
pub use race::{first_success, RaceError};
pub use types::*;
