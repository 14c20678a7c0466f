//! Input decoding and result composition

pub mod composer;
pub mod parser;

pub use composer::{to_enu_detections, ResultComposer};
pub use parser::{load_input, parse_input, ParseError, TelemetryInput};
