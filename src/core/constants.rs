//! Physical constants and earth model parameters

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// WGS-84 semi-major axis (meters)
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS-84 flattening
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;

/// WGS-84 semi-minor (polar) axis (meters)
pub const WGS84_SEMI_MINOR_AXIS: f64 = WGS84_SEMI_MAJOR_AXIS * (1.0 - WGS84_FLATTENING);

/// WGS-84 first eccentricity squared, e² = f(2 - f)
pub const WGS84_ECCENTRICITY_SQUARED: f64 = WGS84_FLATTENING * (2.0 - WGS84_FLATTENING);

/// WGS-84 second eccentricity squared, e'² = (a² - b²) / b²
pub const WGS84_SECOND_ECCENTRICITY_SQUARED: f64 = WGS84_ECCENTRICITY_SQUARED / (1.0 - WGS84_ECCENTRICITY_SQUARED);

/// Meters per kilometer, for bistatic range inputs
pub const METERS_PER_KM: f64 = 1000.0;

/// Hertz per megahertz, for carrier frequency inputs
pub const HZ_PER_MHZ: f64 = 1.0e6;
