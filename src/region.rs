//! Region of interest construction.
//!
//! Regions are closed polygons in geographic coordinates (longitude/latitude in
//! degrees). They are built either from a point buffered by a radius in meters,
//! or from a west/south/east/north bounding box. All queries and outputs are
//! clipped to the region.

use geo::{
    BoundingRect, Contains, Coord, Destination, GeodesicArea, Haversine, LineString, Point, Polygon,
    Rect,
};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::{AnalysisError, Result};

/// Number of vertices used to approximate a buffered point.
const BUFFER_VERTICES: usize = 64;

/// Largest accepted buffer radius in meters.
const MAX_RADIUS_M: f64 = 1_000_000.0;

/// A closed polygon over which an analysis runs.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionOfInterest {
    polygon: Polygon<f64>,
}

impl RegionOfInterest {
    /// Buffer a point by `radius_m` meters.
    ///
    /// The buffer is a geodesic circle approximated by a regular ring of
    /// destination points. Buffers that would wrap across the antimeridian or
    /// over a pole are rejected.
    pub fn from_point(lat: f64, lon: f64, radius_m: f64) -> Result<Self> {
        check_lat(lat)?;
        check_lon(lon)?;
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(AnalysisError::validation(format!(
                "radius must be positive, got {radius_m}"
            )));
        }
        if radius_m > MAX_RADIUS_M {
            return Err(AnalysisError::validation(format!(
                "radius {radius_m} m exceeds the maximum of {MAX_RADIUS_M} m"
            )));
        }

        let origin = Point::new(lon, lat);
        let mut ring: Vec<Coord<f64>> = (0..BUFFER_VERTICES)
            .map(|i| {
                let bearing = 360.0 * i as f64 / BUFFER_VERTICES as f64;
                Haversine.destination(origin, bearing, radius_m).0
            })
            .collect();

        let (min_lon, max_lon) = ring.iter().fold((f64::MAX, f64::MIN), |(lo, hi), c| {
            (lo.min(c.x), hi.max(c.x))
        });
        let wraps = min_lon < -180.0 || max_lon > 180.0 || max_lon - min_lon > 180.0;
        if wraps || ring.iter().any(|c| c.y.abs() >= 90.0) {
            return Err(AnalysisError::validation(
                "buffered region crosses the antimeridian or a pole",
            ));
        }

        ring.push(ring[0]);
        Ok(Self {
            polygon: Polygon::new(LineString::from(ring), vec![]),
        })
    }

    /// Build a rectangular region from bounds in degrees.
    pub fn from_bounds(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        check_lon(west)?;
        check_lon(east)?;
        check_lat(south)?;
        check_lat(north)?;
        if west >= east || south >= north {
            return Err(AnalysisError::validation(format!(
                "bounds must satisfy west < east and south < north, got \
                 ({west}, {south}, {east}, {north})"
            )));
        }

        let rect = Rect::new(Coord { x: west, y: south }, Coord { x: east, y: north });
        Ok(Self {
            polygon: rect.to_polygon(),
        })
    }

    /// The exact polygon of the region.
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Axis-aligned envelope of the region.
    pub fn bounding_rect(&self) -> Rect<f64> {
        // a validated region always has at least three distinct vertices
        self.polygon
            .bounding_rect()
            .unwrap_or_else(|| Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 0.0 }))
    }

    /// Region covering the envelope of this one.
    pub fn bounds(&self) -> RegionOfInterest {
        RegionOfInterest {
            polygon: self.bounding_rect().to_polygon(),
        }
    }

    /// `[west, south, east, north]` of the envelope.
    pub fn wsen(&self) -> [f64; 4] {
        let r = self.bounding_rect();
        [r.min().x, r.min().y, r.max().x, r.max().y]
    }

    /// Geodesic area in square meters.
    pub fn area_m2(&self) -> f64 {
        self.polygon.geodesic_area_unsigned()
    }

    /// Whether the point lies strictly inside the region.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.polygon.contains(&Point::new(lon, lat))
    }

    /// Exterior ring as `[lon, lat]` pairs, closed.
    pub fn exterior(&self) -> Vec<[f64; 2]> {
        self.polygon
            .exterior()
            .coords()
            .map(|c| [c.x, c.y])
            .collect()
    }
}

/// Serialized as a GeoJSON `Polygon`.
impl Serialize for RegionOfInterest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Polygon", 2)?;
        state.serialize_field("type", "Polygon")?;
        state.serialize_field("coordinates", &[self.exterior()])?;
        state.end()
    }
}

fn check_lat(lat: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(AnalysisError::validation(format!(
            "latitude {lat} outside [-90, 90]"
        )));
    }
    Ok(())
}

fn check_lon(lon: f64) -> Result<()> {
    if !(-180.0..=180.0).contains(&lon) {
        return Err(AnalysisError::validation(format!(
            "longitude {lon} outside [-180, 180]"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Distance;

    #[test]
    fn test_point_buffer_has_area_and_contains_origin() {
        for (lat, lon, radius) in [
            (-15.7938, -47.8828, 5000.0),
            (0.0, 0.0, 1.0),
            (60.0, 179.0, 20_000.0),
            (-45.5, -120.25, 250_000.0),
        ] {
            let region = RegionOfInterest::from_point(lat, lon, radius).unwrap();
            assert!(region.area_m2() > 0.0, "area for {lat},{lon},{radius}");
            assert!(region.contains(lon, lat), "origin for {lat},{lon},{radius}");
        }
    }

    #[test]
    fn test_point_buffer_area_close_to_circle() {
        let region = RegionOfInterest::from_point(-15.7938, -47.8828, 5000.0).unwrap();
        let circle = std::f64::consts::PI * 5000.0 * 5000.0;
        let ratio = region.area_m2() / circle;
        assert!(ratio > 0.99 && ratio < 1.01, "ratio {ratio}");
    }

    #[test]
    fn test_point_buffer_ring_is_closed() {
        let region = RegionOfInterest::from_point(10.0, 10.0, 1000.0).unwrap();
        let ring = region.exterior();
        assert_eq!(ring.len(), BUFFER_VERTICES + 1);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_point_rejects_invalid_input() {
        assert!(RegionOfInterest::from_point(91.0, 0.0, 10.0).is_err());
        assert!(RegionOfInterest::from_point(0.0, -180.5, 10.0).is_err());
        assert!(RegionOfInterest::from_point(0.0, 0.0, 0.0).is_err());
        assert!(RegionOfInterest::from_point(0.0, 0.0, -5.0).is_err());
        assert!(RegionOfInterest::from_point(0.0, 0.0, f64::NAN).is_err());
        assert!(RegionOfInterest::from_point(0.0, 179.99, 50_000.0).is_err());
        assert!(RegionOfInterest::from_point(0.0, -179.99, 50_000.0).is_err());
        assert!(RegionOfInterest::from_point(89.9, 0.0, 50_000.0).is_err());
        assert!(RegionOfInterest::from_point(0.0, 0.0, 1_000_001.0).is_err());
    }

    #[test]
    fn test_point_buffer_radius_is_geodesic() {
        let (lat, lon, radius) = (-15.7938, -47.8828, 5000.0);
        let region = RegionOfInterest::from_point(lat, lon, radius).unwrap();
        let origin = Point::new(lon, lat);
        for [x, y] in region.exterior() {
            let d = Haversine.distance(origin, Point::new(x, y));
            assert!((d - radius).abs() < 1e-6 * radius, "vertex at {d} m");
        }
    }

    #[test]
    fn test_bounds_region() {
        let region = RegionOfInterest::from_bounds(-85.0, -56.0, -34.0, 13.0).unwrap();
        assert_eq!(region.wsen(), [-85.0, -56.0, -34.0, 13.0]);
        assert!(region.contains(-60.0, -20.0));
        assert!(!region.contains(-30.0, -20.0));
        assert!(region.area_m2() > 0.0);
    }

    #[test]
    fn test_bounds_rejects_inverted_box() {
        assert!(matches!(
            RegionOfInterest::from_bounds(-34.0, -56.0, -85.0, 13.0),
            Err(AnalysisError::Validation(_))
        ));
        assert!(RegionOfInterest::from_bounds(-85.0, 13.0, -34.0, 13.0).is_err());
    }

    #[test]
    fn test_envelope_contains_buffer() {
        let region = RegionOfInterest::from_point(-15.7938, -47.8828, 5000.0).unwrap();
        let envelope = region.bounds();
        assert!(envelope.area_m2() > region.area_m2());
        for [lon, lat] in region.exterior() {
            let [w, s, e, n] = envelope.wsen();
            assert!(lon >= w && lon <= e && lat >= s && lat <= n);
        }
    }

    #[test]
    fn test_serializes_as_geojson() {
        let region = RegionOfInterest::from_bounds(0.0, 0.0, 1.0, 1.0).unwrap();
        let json = serde_json::to_value(&region).unwrap();
        assert_eq!(json["type"], "Polygon");
        assert_eq!(json["coordinates"][0].as_array().unwrap().len(), 5);
    }
}
