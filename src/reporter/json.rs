//! JSON reporter for machine-readable output

use super::{AssessmentReport, ReportEntry};
use crate::battery::TestDefinition;
use serde::Serialize;

/// Reporter for JSON output
pub struct JsonReporter {
    /// Whether to pretty-print JSON
    pretty: bool,
}

impl JsonReporter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// A single rated result with its range bar
    pub fn report_result(&self, entry: &ReportEntry) -> String {
        self.encode(entry, "{}")
    }

    /// A full assessment: results, failures and body composition
    pub fn report_assessment(&self, report: &AssessmentReport) -> String {
        self.encode(report, "{}")
    }

    /// The test battery known to the loaded norms
    pub fn report_battery<'a>(&self, definitions: impl IntoIterator<Item = &'a TestDefinition>) -> String {
        let tests: Vec<_> = definitions.into_iter().collect();
        self.encode(&BatteryOutput { tests }, "{}")
    }

    /// Outcome of validating a norms directory
    pub fn report_validation(&self, tables: usize, fingerprint: &str) -> String {
        self.encode(
            &ValidationOutput {
                valid: true,
                tables,
                fingerprint,
            },
            "{}",
        )
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T, fallback: &str) -> String {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        encoded.unwrap_or_else(|_| fallback.to_string())
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct BatteryOutput<'a> {
    tests: Vec<&'a TestDefinition>,
}

#[derive(Serialize)]
struct ValidationOutput<'a> {
    valid: bool,
    tables: usize,
    fingerprint: &'a str,
}
