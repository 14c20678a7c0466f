//! WGS-84 coordinate transformations
//!
//! Conversions between geodetic (latitude, longitude, altitude), Earth-Centered
//! Earth-Fixed (ECEF) and local East-North-Up (ENU) coordinates. Angles are in
//! degrees at the boundary and radians internally. Everything here is pure;
//! [`EnuFrame`] only caches the origin-derived rotation and translation.

use nalgebra::{Matrix3, SVector, Vector2, Vector3};

use crate::core::constants::{
    WGS84_ECCENTRICITY_SQUARED, WGS84_SECOND_ECCENTRICITY_SQUARED, WGS84_SEMI_MAJOR_AXIS,
    WGS84_SEMI_MINOR_AXIS,
};
use crate::core::GeodeticPosition;

/// Below this distance from the polar axis (meters) longitude is undefined
/// and the pole fallback is used.
pub const POLAR_AXIS_EPSILON: f64 = 1e-9;

/// Prime-vertical radius of curvature N(lat)
fn prime_vertical_radius(sin_lat: f64) -> f64 {
    WGS84_SEMI_MAJOR_AXIS / (1.0 - WGS84_ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt()
}

/// Convert geodetic coordinates to ECEF (meters)
pub fn geodetic_to_ecef(position: &GeodeticPosition) -> Vector3<f64> {
    let lat_rad = position.lat.to_radians();
    let lon_rad = position.lon.to_radians();
    let (sin_lat, cos_lat) = lat_rad.sin_cos();
    let (sin_lon, cos_lon) = lon_rad.sin_cos();

    let n = prime_vertical_radius(sin_lat);

    Vector3::new(
        (n + position.alt) * cos_lat * cos_lon,
        (n + position.alt) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_ECCENTRICITY_SQUARED) + position.alt) * sin_lat,
    )
}

/// Convert ECEF coordinates to geodetic using Bowring's closed-form formula.
///
/// Points on the polar axis have no defined longitude; they map to
/// latitude ±90°, longitude 0 and altitude `|z| - b`.
pub fn ecef_to_geodetic(ecef: &Vector3<f64>) -> GeodeticPosition {
    let (x, y, z) = (ecef.x, ecef.y, ecef.z);

    if x.abs() < POLAR_AXIS_EPSILON && y.abs() < POLAR_AXIS_EPSILON {
        let lat = if z >= 0.0 { 90.0 } else { -90.0 };
        return GeodeticPosition::new(lat, 0.0, z.abs() - WGS84_SEMI_MINOR_AXIS);
    }

    let a = WGS84_SEMI_MAJOR_AXIS;
    let b = WGS84_SEMI_MINOR_AXIS;
    let p = x.hypot(y);

    // Auxiliary (parametric) latitude
    let theta = (z * a).atan2(p * b);
    let (sin_theta, cos_theta) = theta.sin_cos();

    let lat_rad = (z + WGS84_SECOND_ECCENTRICITY_SQUARED * b * sin_theta.powi(3))
        .atan2(p - WGS84_ECCENTRICITY_SQUARED * a * cos_theta.powi(3));
    let lon_rad = y.atan2(x);

    // Well conditioned at every latitude, unlike p / cos(lat) - N
    let (sin_lat, cos_lat) = lat_rad.sin_cos();
    let alt = p * cos_lat + z * sin_lat - a * (1.0 - WGS84_ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt();

    GeodeticPosition::new(lat_rad.to_degrees(), lon_rad.to_degrees(), alt)
}

/// Rotation taking ECEF offsets into the ENU frame at the given origin
pub fn enu_rotation(origin: &GeodeticPosition) -> Matrix3<f64> {
    let (sin_lat, cos_lat) = origin.lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = origin.lon.to_radians().sin_cos();

    Matrix3::new(
        -sin_lon,           cos_lon,            0.0,
        -sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat,
        cos_lat * cos_lon,  cos_lat * sin_lon,  sin_lat,
    )
}

/// Convert an ECEF point to ENU relative to `origin`
pub fn ecef_to_enu(ecef: &Vector3<f64>, origin: &GeodeticPosition) -> Vector3<f64> {
    EnuFrame::new(*origin).ecef_to_enu(ecef)
}

/// Convert an ENU point relative to `origin` back to ECEF
pub fn enu_to_ecef(enu: &Vector3<f64>, origin: &GeodeticPosition) -> Vector3<f64> {
    EnuFrame::new(*origin).enu_to_ecef(enu)
}

/// Componentwise mean of a set of points, `None` for an empty set
pub fn average_points<const D: usize>(points: &[SVector<f64, D>]) -> Option<SVector<f64, D>> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(SVector::<f64, D>::zeros(), |acc, p| acc + p);
    Some(sum / points.len() as f64)
}

/// Geodetic centroid of a set of surface points, at zero altitude.
///
/// Latitude and longitude are averaged directly, which is adequate for the
/// tens-of-kilometers sensor baselines this crate deals with.
pub fn geodetic_centroid(points: &[GeodeticPosition]) -> Option<GeodeticPosition> {
    let lat_lon: Vec<Vector2<f64>> = points.iter().map(|p| Vector2::new(p.lat, p.lon)).collect();
    average_points(&lat_lon).map(|c| GeodeticPosition::on_surface(c.x, c.y))
}

/// Local East-North-Up tangent-plane frame anchored at a geodetic origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnuFrame {
    origin: GeodeticPosition,
    origin_ecef: Vector3<f64>,
    rotation: Matrix3<f64>,
}

impl EnuFrame {
    pub fn new(origin: GeodeticPosition) -> Self {
        Self {
            origin,
            origin_ecef: geodetic_to_ecef(&origin),
            rotation: enu_rotation(&origin),
        }
    }

    pub fn origin(&self) -> &GeodeticPosition {
        &self.origin
    }

    pub fn ecef_to_enu(&self, ecef: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * (ecef - self.origin_ecef)
    }

    pub fn enu_to_ecef(&self, enu: &Vector3<f64>) -> Vector3<f64> {
        // The rotation is orthonormal, so its transpose is its inverse
        self.origin_ecef + self.rotation.transpose() * enu
    }

    pub fn geodetic_to_enu(&self, position: &GeodeticPosition) -> Vector3<f64> {
        self.ecef_to_enu(&geodetic_to_ecef(position))
    }

    pub fn enu_to_geodetic(&self, enu: &Vector3<f64>) -> GeodeticPosition {
        ecef_to_geodetic(&self.enu_to_ecef(enu))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geodetic_to_ecef_conversion() {
        let ecef = geodetic_to_ecef(&GeodeticPosition::new(0.0, 0.0, 0.0));
        assert!((ecef.x - WGS84_SEMI_MAJOR_AXIS).abs() < 1e-6);
        assert!(ecef.y.abs() < 1e-6);
        assert!(ecef.z.abs() < 1e-6);

        let pole = geodetic_to_ecef(&GeodeticPosition::new(90.0, 0.0, 0.0));
        assert!(pole.x.abs() < 1e-6);
        assert!((pole.z - WGS84_SEMI_MINOR_AXIS).abs() < 1e-6);
    }

    #[test]
    fn test_ecef_to_geodetic_conversion() {
        let position = ecef_to_geodetic(&Vector3::new(WGS84_SEMI_MAJOR_AXIS + 500.0, 0.0, 0.0));
        assert!(position.lat.abs() < 1e-9);
        assert!(position.lon.abs() < 1e-9);
        assert!((position.alt - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_geodetic_round_trip() {
        let latitudes = [-89.89, -60.0, -33.3, -0.5, 0.0, 12.25, 40.7128, 71.0, 89.89];
        let longitudes = [-179.9, -74.006, 0.0, 45.0, 139.7, 180.0];
        let altitudes = [-100.0, 0.0, 10_000.0, 30_000.0];

        for &lat in &latitudes {
            for &lon in &longitudes {
                for &alt in &altitudes {
                    let original = GeodeticPosition::new(lat, lon, alt);
                    let recovered = ecef_to_geodetic(&geodetic_to_ecef(&original));

                    assert!((recovered.lat - lat).abs() < 1e-6, "lat {} -> {}", lat, recovered.lat);
                    assert!((recovered.alt - alt).abs() < 1e-3, "alt {} -> {} at lat {}", alt, recovered.alt, lat);

                    // 180 and -180 are the same meridian
                    let dlon = (recovered.lon - lon + 540.0) % 360.0 - 180.0;
                    assert!(dlon.abs() < 1e-6, "lon {} -> {}", lon, recovered.lon);
                }
            }
        }
    }

    #[test]
    fn test_polar_axis_fallback() {
        let north = ecef_to_geodetic(&Vector3::new(0.0, 0.0, WGS84_SEMI_MINOR_AXIS + 1234.0));
        assert_eq!(north.lat, 90.0);
        assert_eq!(north.lon, 0.0);
        assert!((north.alt - 1234.0).abs() < 1e-6);

        let south = ecef_to_geodetic(&Vector3::new(0.0, 0.0, -WGS84_SEMI_MINOR_AXIS));
        assert_eq!(south.lat, -90.0);
        assert!(south.alt.abs() < 1e-6);
        assert!(south.alt.is_finite());
    }

    #[test]
    fn test_enu_axes() {
        let origin = GeodeticPosition::new(0.0, 0.0, 0.0);
        let frame = EnuFrame::new(origin);

        // ~1 km north of the origin
        let north = frame.geodetic_to_enu(&GeodeticPosition::new(0.009, 0.0, 0.0));
        assert!(north.x.abs() < 1e-6);
        assert!((north.y - 1000.0).abs() < 10.0);
        assert!(north.z.abs() < 1.0);

        // Straight up
        let up = frame.geodetic_to_enu(&GeodeticPosition::new(0.0, 0.0, 250.0));
        assert!(up.x.abs() < 1e-6);
        assert!(up.y.abs() < 1e-6);
        assert!((up.z - 250.0).abs() < 1e-6);

        assert!(frame.geodetic_to_enu(&origin).norm() < 1e-6);
    }

    #[test]
    fn test_enu_round_trip() {
        let origins = [
            GeodeticPosition::new(40.7137, -73.9788, 0.0),
            GeodeticPosition::new(-33.86, 151.21, 58.0),
            GeodeticPosition::new(78.2, 15.6, 0.0),
        ];
        let points = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(723.355, 9557.755, 10_136.758),
            Vector3::new(-25_000.0, 14_000.0, 30_000.0),
            Vector3::new(100_000.0, -80_000.0, -50.0),
        ];

        for origin in &origins {
            for enu in &points {
                let ecef = enu_to_ecef(enu, origin);
                let recovered = ecef_to_enu(&ecef, origin);
                assert!((recovered - enu).norm() < 1e-6, "{:?} -> {:?}", enu, recovered);
            }
        }
    }

    #[test]
    fn test_enu_rotation_is_orthonormal() {
        let rotation = enu_rotation(&GeodeticPosition::new(40.7, -74.0, 0.0));
        let identity = rotation * rotation.transpose();
        assert!((identity - Matrix3::identity()).norm() < 1e-12);
    }

    #[test]
    fn test_average_points() {
        let points = [
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(3.0, 4.0, 5.0),
            Vector3::new(5.0, 0.0, -2.0),
        ];
        let mean = average_points(&points).unwrap();
        assert_eq!(mean, Vector3::new(3.0, 2.0, 2.0));

        let empty: [Vector2<f64>; 0] = [];
        assert!(average_points(&empty).is_none());
    }

    #[test]
    fn test_geodetic_centroid() {
        let centroid = geodetic_centroid(&[
            GeodeticPosition::new(40.0, -74.0, 500.0),
            GeodeticPosition::new(41.0, -73.0, 0.0),
        ])
        .unwrap();

        assert!((centroid.lat - 40.5).abs() < 1e-12);
        assert!((centroid.lon + 73.5).abs() < 1e-12);
        assert_eq!(centroid.alt, 0.0);
        assert!(geodetic_centroid(&[]).is_none());
    }
}
