// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bounding-box coordinate orderings.
//!
//! The wire format carries a flat WGS84 bbox
//! (`[minLon, minLat, maxLon, maxLat]`, optionally with elevations at index 2
//! and 5). The index stores an envelope as a corner pair
//! (`[[minLon, maxLat], [maxLon, minLat]]`, north-west then south-east).
//! No range validation is done on the numbers themselves.

use serde_json::{json, Value};

use crate::error::StacError;

/// A bounding box, independent of ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
    /// `(min, max)` elevation, when the bbox is 3D
    pub elevation: Option<(f64, f64)>,
}

impl Coordinates {
    /// From `[minLon, minLat, maxLon, maxLat]` or
    /// `[minLon, minLat, minElev, maxLon, maxLat, maxElev]`.
    pub fn from_wgs84(bbox: &[f64]) -> Result<Self, StacError> {
        match *bbox {
            [min_lon, min_lat, max_lon, max_lat] => Ok(Self {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
                elevation: None,
            }),
            [min_lon, min_lat, min_elev, max_lon, max_lat, max_elev] => Ok(Self {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
                elevation: Some((min_elev, max_elev)),
            }),
            _ => Err(StacError::invalid(format!(
                "bbox must have 4 or 6 numbers, got {}",
                bbox.len()
            ))),
        }
    }

    /// From the stored corner pair `[[minLon, maxLat], [maxLon, minLat]]`,
    /// each corner optionally carrying an elevation.
    pub fn from_geojson(corners: &[Vec<f64>]) -> Result<Self, StacError> {
        let [nw, se] = corners else {
            return Err(StacError::invalid(format!(
                "envelope must have 2 corners, got {}",
                corners.len()
            )));
        };
        match (nw.as_slice(), se.as_slice()) {
            ([min_lon, max_lat], [max_lon, min_lat]) => Ok(Self {
                min_lon: *min_lon,
                min_lat: *min_lat,
                max_lon: *max_lon,
                max_lat: *max_lat,
                elevation: None,
            }),
            ([min_lon, max_lat, min_elev], [max_lon, min_lat, max_elev]) => Ok(Self {
                min_lon: *min_lon,
                min_lat: *min_lat,
                max_lon: *max_lon,
                max_lat: *max_lat,
                elevation: Some((*min_elev, *max_elev)),
            }),
            _ => Err(StacError::invalid(format!(
                "envelope corners must both have 2 or 3 numbers, got {} and {}",
                nw.len(),
                se.len()
            ))),
        }
    }

    /// Parse a stored envelope object (`{"type": "envelope", "coordinates": ...}`)
    /// or a bare corner array.
    pub fn from_envelope(value: &Value) -> Result<Self, StacError> {
        let coords = value.get("coordinates").unwrap_or(value);
        let corners: Vec<Vec<f64>> = serde_json::from_value(coords.clone())
            .map_err(|e| StacError::invalid(format!("malformed envelope: {}", e)))?;
        Self::from_geojson(&corners)
    }

    pub fn to_wgs84(&self) -> Vec<f64> {
        match self.elevation {
            None => vec![self.min_lon, self.min_lat, self.max_lon, self.max_lat],
            Some((lo, hi)) => vec![self.min_lon, self.min_lat, lo, self.max_lon, self.max_lat, hi],
        }
    }

    pub fn to_geojson(&self) -> Vec<Vec<f64>> {
        match self.elevation {
            None => vec![vec![self.min_lon, self.max_lat], vec![self.max_lon, self.min_lat]],
            Some((lo, hi)) => vec![
                vec![self.min_lon, self.max_lat, lo],
                vec![self.max_lon, self.min_lat, hi],
            ],
        }
    }

    /// Envelope shape usable in a `geo_shape` query
    pub fn to_envelope(&self) -> Value {
        json!({ "type": "envelope", "coordinates": self.to_geojson() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_round_trip() {
        let bbox = [5.9, 45.8, 10.5, 47.8];
        let c = Coordinates::from_wgs84(&bbox).unwrap();
        assert_eq!(c.to_wgs84(), bbox.to_vec());
        assert_eq!(c.to_geojson(), vec![vec![5.9, 47.8], vec![10.5, 45.8]]);
        assert_eq!(Coordinates::from_geojson(&c.to_geojson()).unwrap().to_wgs84(), bbox.to_vec());
    }

    #[test]
    fn test_six_number_bbox() {
        let bbox = [0.0, 1.0, -10.0, 2.0, 3.0, 100.0];
        let c = Coordinates::from_wgs84(&bbox).unwrap();
        assert_eq!(c.elevation, Some((-10.0, 100.0)));
        assert_eq!(c.to_geojson(), vec![vec![0.0, 3.0, -10.0], vec![2.0, 1.0, 100.0]]);
        assert_eq!(Coordinates::from_geojson(&c.to_geojson()).unwrap().to_wgs84(), bbox.to_vec());
    }

    #[test]
    fn test_wrong_length_is_invalid_argument() {
        let err = Coordinates::from_wgs84(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains('3'));

        assert!(Coordinates::from_geojson(&[vec![1.0, 2.0]]).is_err());
        assert!(Coordinates::from_geojson(&[vec![1.0, 2.0], vec![1.0, 2.0, 3.0]]).is_err());
    }

    #[test]
    fn test_envelope_value() {
        let c = Coordinates::from_wgs84(&[0.0, 0.0, 1.0, 1.0]).unwrap();
        let env = c.to_envelope();
        assert_eq!(env["type"], "envelope");
        assert_eq!(Coordinates::from_envelope(&env).unwrap(), c);
    }
}
