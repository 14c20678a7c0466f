//! Output formatting

use crate::api::types::SolverOutput;

/// JSON formatter for output documents
pub struct JsonFormatter {
    /// Pretty print JSON
    pub pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonFormatter {
    /// Create a pretty-printing JSON formatter (two-space indentation)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a single-line JSON formatter
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    pub fn format(&self, output: &SolverOutput) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(output)
        } else {
            serde_json::to_string(output)
        }
    }
}
