//! Validation of detection records before any solve is attempted

use thiserror::Error;

use crate::algorithms::coordinates::geodetic_centroid;
use crate::core::{Detection, GeodeticPosition};

/// Validation errors raised on detection records
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("detection {detection}: {field} is not finite")]
    NonFinite { detection: usize, field: &'static str },

    #[error("detection {detection}: {field} = {value} {reason}")]
    OutOfRange {
        detection: usize,
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("detection {detection}: timestamp {actual} differs from {expected}")]
    TimestampMismatch { expected: u64, actual: u64, detection: usize },

    #[error("expected {expected} detections, got {actual}")]
    WrongDetectionCount { expected: usize, actual: usize },
}

/// Check a single detection's fields; `index` is 1-based for messages
pub fn validate_detection(index: usize, detection: &Detection) -> Result<(), ValidationError> {
    let fields = [
        ("sensor_lat", detection.sensor_lat),
        ("sensor_lon", detection.sensor_lon),
        ("ioo_lat", detection.ioo_lat),
        ("ioo_lon", detection.ioo_lon),
        ("freq_mhz", detection.freq_mhz),
        ("bistatic_range_km", detection.bistatic_range_km),
        ("doppler_hz", detection.doppler_hz),
    ];
    for (field, value) in fields {
        if !value.is_finite() {
            return Err(ValidationError::NonFinite { detection: index, field });
        }
    }

    let out_of_range = |field, value, reason| ValidationError::OutOfRange {
        detection: index,
        field,
        value,
        reason,
    };

    for (field, value) in [("sensor_lat", detection.sensor_lat), ("ioo_lat", detection.ioo_lat)] {
        if !(-90.0..=90.0).contains(&value) {
            return Err(out_of_range(field, value, "outside [-90, 90]"));
        }
    }
    for (field, value) in [("sensor_lon", detection.sensor_lon), ("ioo_lon", detection.ioo_lon)] {
        if !(-180.0..=180.0).contains(&value) {
            return Err(out_of_range(field, value, "outside [-180, 180]"));
        }
    }
    if detection.freq_mhz <= 0.0 {
        return Err(out_of_range("freq_mhz", detection.freq_mhz, "must be positive"));
    }
    if detection.bistatic_range_km <= 0.0 {
        return Err(out_of_range("bistatic_range_km", detection.bistatic_range_km, "must be positive"));
    }

    Ok(())
}

/// Validate every detection and require one shared timestamp
fn validate_simultaneous(detections: &[Detection]) -> Result<(), ValidationError> {
    for (i, detection) in detections.iter().enumerate() {
        validate_detection(i + 1, detection)?;
    }
    if let Some(first) = detections.first() {
        for (i, detection) in detections.iter().enumerate().skip(1) {
            if detection.timestamp != first.timestamp {
                return Err(ValidationError::TimestampMismatch {
                    expected: first.timestamp,
                    actual: detection.timestamp,
                    detection: i + 1,
                });
            }
        }
    }
    Ok(())
}

/// Sensor centroid at zero altitude, used as the ENU origin of a solve
fn sensor_centroid(detections: &[Detection]) -> GeodeticPosition {
    let sensors: Vec<GeodeticPosition> = detections.iter().map(Detection::sensor_position).collect();
    // Validated sets are never empty
    geodetic_centroid(&sensors).unwrap_or_else(|| GeodeticPosition::on_surface(0.0, 0.0))
}

/// Three simultaneous, validated detections
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionTriple {
    detections: [Detection; 3],
}

impl DetectionTriple {
    pub fn new(first: Detection, second: Detection, third: Detection) -> Result<Self, ValidationError> {
        let detections = [first, second, third];
        validate_simultaneous(&detections)?;
        Ok(Self { detections })
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn timestamp(&self) -> u64 {
        self.detections[0].timestamp
    }

    /// Centroid of the three sensors at zero altitude
    pub fn enu_origin(&self) -> GeodeticPosition {
        sensor_centroid(&self.detections)
    }
}

/// Two simultaneous, validated detections (fixed-altitude mode)
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionPair {
    detections: [Detection; 2],
}

impl DetectionPair {
    pub fn new(first: Detection, second: Detection) -> Result<Self, ValidationError> {
        let detections = [first, second];
        validate_simultaneous(&detections)?;
        Ok(Self { detections })
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn timestamp(&self) -> u64 {
        self.detections[0].timestamp
    }

    /// Midpoint of the two sensors at zero altitude
    pub fn enu_origin(&self) -> GeodeticPosition {
        sensor_centroid(&self.detections)
    }
}

/// A validated set of simultaneous detections ready to solve
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionSet {
    /// Full position and velocity solve
    Triple(DetectionTriple),
    /// Planar solve at a fixed altitude
    Pair(DetectionPair),
}

impl DetectionSet {
    /// Build from two or three detections
    pub fn from_detections(detections: &[Detection]) -> Result<Self, ValidationError> {
        match detections {
            [a, b, c] => Ok(DetectionSet::Triple(DetectionTriple::new(*a, *b, *c)?)),
            [a, b] => Ok(DetectionSet::Pair(DetectionPair::new(*a, *b)?)),
            other => Err(ValidationError::WrongDetectionCount {
                expected: 3,
                actual: other.len(),
            }),
        }
    }

    pub fn detections(&self) -> &[Detection] {
        match self {
            DetectionSet::Triple(triple) => triple.detections(),
            DetectionSet::Pair(pair) => pair.detections(),
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            DetectionSet::Triple(triple) => triple.timestamp(),
            DetectionSet::Pair(pair) => pair.timestamp(),
        }
    }

    pub fn enu_origin(&self) -> GeodeticPosition {
        match self {
            DetectionSet::Triple(triple) => triple.enu_origin(),
            DetectionSet::Pair(pair) => pair.enu_origin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(timestamp: u64) -> Detection {
        Detection {
            sensor_lat: 40.7128,
            sensor_lon: -74.0060,
            ioo_lat: 40.7589,
            ioo_lon: -73.9851,
            freq_mhz: 1090.0,
            timestamp,
            bistatic_range_km: 25.5,
            doppler_hz: 150.0,
        }
    }

    #[test]
    fn test_valid_detection() {
        assert!(validate_detection(1, &detection(1_700_000_000)).is_ok());
    }

    #[test]
    fn test_invalid_fields() {
        let cases = [
            (Detection { sensor_lat: 91.0, ..detection(0) }, "sensor_lat"),
            (Detection { ioo_lat: -90.5, ..detection(0) }, "ioo_lat"),
            (Detection { sensor_lon: 180.5, ..detection(0) }, "sensor_lon"),
            (Detection { ioo_lon: -181.0, ..detection(0) }, "ioo_lon"),
            (Detection { freq_mhz: 0.0, ..detection(0) }, "freq_mhz"),
            (Detection { bistatic_range_km: -1.0, ..detection(0) }, "bistatic_range_km"),
        ];

        for (invalid, expected_field) in cases {
            match validate_detection(2, &invalid) {
                Err(ValidationError::OutOfRange { detection, field, .. }) => {
                    assert_eq!(detection, 2);
                    assert_eq!(field, expected_field);
                }
                other => panic!("expected out of range {}, got {:?}", expected_field, other),
            }
        }
    }

    #[test]
    fn test_non_finite_field() {
        let invalid = Detection { doppler_hz: f64::NAN, ..detection(0) };
        assert_eq!(
            validate_detection(3, &invalid),
            Err(ValidationError::NonFinite { detection: 3, field: "doppler_hz" })
        );

        let infinite = Detection { sensor_lat: f64::INFINITY, ..detection(0) };
        assert!(matches!(validate_detection(1, &infinite), Err(ValidationError::NonFinite { .. })));
    }

    #[test]
    fn test_triple_requires_shared_timestamp() {
        let result = DetectionTriple::new(detection(1000), detection(1000), detection(1001));
        assert_eq!(
            result,
            Err(ValidationError::TimestampMismatch { expected: 1000, actual: 1001, detection: 3 })
        );

        let triple = DetectionTriple::new(detection(1000), detection(1000), detection(1000)).unwrap();
        assert_eq!(triple.timestamp(), 1000);
        assert_eq!(triple.detections().len(), 3);
    }

    #[test]
    fn test_triple_origin_is_sensor_centroid() {
        let triple = DetectionTriple::new(
            Detection { sensor_lat: 40.0, sensor_lon: -74.0, ..detection(5) },
            Detection { sensor_lat: 41.0, sensor_lon: -73.0, ..detection(5) },
            Detection { sensor_lat: 42.0, sensor_lon: -75.0, ..detection(5) },
        )
        .unwrap();

        let origin = triple.enu_origin();
        assert!((origin.lat - 41.0).abs() < 1e-12);
        assert!((origin.lon + 74.0).abs() < 1e-12);
        assert_eq!(origin.alt, 0.0);
    }

    #[test]
    fn test_detection_set_dispatch() {
        let pair = DetectionSet::from_detections(&[detection(7), detection(7)]).unwrap();
        assert!(matches!(pair, DetectionSet::Pair(_)));
        assert_eq!(pair.timestamp(), 7);

        let triple = DetectionSet::from_detections(&[detection(7), detection(7), detection(7)]).unwrap();
        assert!(matches!(triple, DetectionSet::Triple(_)));

        assert_eq!(
            DetectionSet::from_detections(&[detection(7)]),
            Err(ValidationError::WrongDetectionCount { expected: 3, actual: 1 })
        );
        assert!(matches!(
            DetectionSet::from_detections(&[detection(7), detection(8)]),
            Err(ValidationError::TimestampMismatch { .. })
        ));
    }
}
