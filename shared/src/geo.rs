//! Geographic primitives: coordinates and address snapshots

use serde::{Deserialize, Serialize};

/// A WGS-84 coordinate pair (degrees)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Postal address snapshot
///
/// Orders and shipments carry a copy of the address taken at checkout
/// time, never a live reference to the customer's profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Geocoded coordinates, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,
}

impl Address {
    /// All mandatory postal fields present and non-blank
    pub fn is_complete(&self) -> bool {
        !self.street.trim().is_empty()
            && !self.city.trim().is_empty()
            && !self.state.trim().is_empty()
            && !self.zip_code.trim().is_empty()
    }
}
