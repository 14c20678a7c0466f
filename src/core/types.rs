//! Core data types for the bistatic telemetry solver

use nalgebra::{Vector3, Vector6};
use serde::{Deserialize, Serialize};

use crate::core::constants::{HZ_PER_MHZ, METERS_PER_KM};

/// Geodetic position on the WGS-84 ellipsoid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPosition {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Height above the ellipsoid in meters
    pub alt: f64,
}

impl GeodeticPosition {
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }

    /// Point on the ellipsoid surface (zero altitude)
    pub fn on_surface(lat: f64, lon: f64) -> Self {
        Self { lat, lon, alt: 0.0 }
    }
}

/// A single bistatic detection as reported by a passive sensor.
///
/// Field names follow the input record. Units are those of the record:
/// degrees, MHz, milliseconds, kilometers and Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub sensor_lat: f64,
    pub sensor_lon: f64,
    /// Illuminator of opportunity (transmitter) latitude
    pub ioo_lat: f64,
    /// Illuminator of opportunity (transmitter) longitude
    pub ioo_lon: f64,
    pub freq_mhz: f64,
    pub timestamp: u64,
    pub bistatic_range_km: f64,
    /// Negative values mean the sensor observed a frequency reduction
    pub doppler_hz: f64,
}

impl Detection {
    pub fn sensor_position(&self) -> GeodeticPosition {
        GeodeticPosition::on_surface(self.sensor_lat, self.sensor_lon)
    }

    pub fn transmitter_position(&self) -> GeodeticPosition {
        GeodeticPosition::on_surface(self.ioo_lat, self.ioo_lon)
    }

    pub fn freq_hz(&self) -> f64 {
        self.freq_mhz * HZ_PER_MHZ
    }

    pub fn bistatic_range_m(&self) -> f64 {
        self.bistatic_range_km * METERS_PER_KM
    }
}

/// Detection geometry and measurements expressed in a local ENU frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnuDetection {
    pub transmitter: Vector3<f64>,
    pub sensor: Vector3<f64>,
    pub freq_hz: f64,
    pub range_m: f64,
    pub doppler_hz: f64,
}

/// Target position and velocity in the local ENU frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverState {
    /// East, north, up (meters)
    pub position: Vector3<f64>,
    /// East, north, up (m/s)
    pub velocity: Vector3<f64>,
}

impl SolverState {
    pub fn new(position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self { position, velocity }
    }

    /// Stack as (x, y, z, vx, vy, vz)
    pub fn to_vector(&self) -> Vector6<f64> {
        Vector6::new(
            self.position.x,
            self.position.y,
            self.position.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
        )
    }

    pub fn from_vector(v: &Vector6<f64>) -> Self {
        Self {
            position: Vector3::new(v[0], v[1], v[2]),
            velocity: Vector3::new(v[3], v[4], v[5]),
        }
    }
}

/// Reason the optimizer stopped iterating successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Gradient infinity norm fell below tolerance
    GradientTolerance,
    /// Projected step fell below tolerance
    StepTolerance,
    /// Relative cost reduction fell below tolerance
    CostTolerance,
}

/// Final kinematic solution for one set of simultaneous detections
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Shared detection timestamp (Unix ms)
    pub timestamp: u64,
    pub position: GeodeticPosition,
    /// East, north, up velocity (m/s)
    pub velocity_enu: Vector3<f64>,
    /// Euclidean norm of the residual vector at convergence
    pub convergence_metric: f64,
    /// Interleaved range (m) and Doppler (Hz) residuals, one pair per detection
    pub residuals: Vec<f64>,
    pub iterations: usize,
    pub termination: Termination,
}
