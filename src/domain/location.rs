//! Location Reference
//!
//! A location is a named point on the map. Aggregation groups visits by a
//! normalized location key so that coordinates from different submissions
//! of the same place collapse into one bucket.

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Coordinates are rounded to 4 decimal places (~11m) before keying.
const KEY_PRECISION: f64 = 10_000.0;

/// Maximum length of a place name
pub const MAX_PLACE_NAME_LEN: usize = 200;

/// A named point on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    place_name: String,
    latitude: f64,
    longitude: f64,
}

impl Location {
    /// Create a validated location
    pub fn new(
        place_name: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, DomainError> {
        let place_name = place_name.into();
        let trimmed = place_name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::validation("place name must not be empty"));
        }
        if trimmed.len() > MAX_PLACE_NAME_LEN {
            return Err(DomainError::validation(format!(
                "place name exceeds {} characters",
                MAX_PLACE_NAME_LEN
            )));
        }
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(DomainError::validation(format!(
                "latitude {} out of range [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(DomainError::validation(format!(
                "longitude {} out of range [-180, 180]",
                longitude
            )));
        }

        Ok(Self {
            place_name: trimmed.to_string(),
            latitude,
            longitude,
        })
    }

    pub fn place_name(&self) -> &str {
        &self.place_name
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Normalized grouping key for this location
    pub fn key(&self) -> LocationKey {
        LocationKey::from_coordinates(self.latitude, self.longitude)
    }
}

/// Normalized location key: coordinates rounded and rendered as a stable
/// string, so the key is hashable, ordered and serializable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationKey(String);

impl LocationKey {
    /// Build a key from raw coordinates
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Self {
        Self(format!(
            "{:.4},{:.4}",
            round_coordinate(latitude),
            round_coordinate(longitude)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Round to key precision and collapse negative zero
fn round_coordinate(value: f64) -> f64 {
    let rounded = (value * KEY_PRECISION).round() / KEY_PRECISION;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_validation() {
        assert!(Location::new("Oslo", 59.9139, 10.7522).is_ok());
        assert!(Location::new("", 0.0, 0.0).is_err());
        assert!(Location::new("   ", 0.0, 0.0).is_err());
        assert!(Location::new("North of north", 90.1, 0.0).is_err());
        assert!(Location::new("Far east", 0.0, 180.5).is_err());
        assert!(Location::new("Nowhere", f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_place_name_trimmed() {
        let loc = Location::new("  Lisbon  ", 38.7223, -9.1393).unwrap();
        assert_eq!(loc.place_name(), "Lisbon");
    }

    #[test]
    fn test_key_collapses_nearby_coordinates() {
        let a = Location::new("NYC", 40.71281, -74.00601).unwrap();
        let b = Location::new("New York", 40.71279, -74.00599).unwrap();
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_key_distinguishes_distant_coordinates() {
        let a = Location::new("NYC", 40.7128, -74.0060).unwrap();
        let b = Location::new("Boston", 42.3601, -71.0589).unwrap();
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_key_has_no_negative_zero() {
        let key = LocationKey::from_coordinates(-0.00001, 0.00001);
        assert_eq!(key.as_str(), "0.0000,0.0000");
    }

    #[test]
    fn test_key_ordering_is_lexicographic() {
        let a = LocationKey::from_coordinates(10.0, 10.0);
        let b = LocationKey::from_coordinates(9.0, 9.0);
        // "10.0000,..." < "9.0000,..." as strings
        assert!(a < b);
    }
}
