//! Reporter module for output formatting

pub mod console;
pub mod json;

pub use console::ConsoleReporter;
pub use json::JsonReporter;

use crate::assessment::{AssessmentOutcome, ClientProfile, TestFailure};
use crate::formulas::BodyComposition;
use crate::progress::ProgressDelta;
use crate::rangebar::{RangeBarLayout, RangeBarProjector};
use crate::rating::RatedResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A rated result with everything a renderer needs next to it
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry<'a> {
    #[serde(flatten)]
    pub result: &'a RatedResult,
    pub range_bar: RangeBarLayout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<&'a ProgressDelta>,
}

impl<'a> ReportEntry<'a> {
    pub fn new(
        result: &'a RatedResult,
        projector: &RangeBarProjector,
        mirror: bool,
        progress: Option<&'a ProgressDelta>,
    ) -> Self {
        Self {
            result,
            range_bar: projector.project(result, mirror),
            progress,
        }
    }
}

/// Everything shown for one assessment run
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentReport<'a> {
    pub client: &'a ClientProfile,
    pub taken_at: DateTime<Utc>,
    pub norms_fingerprint: &'a str,
    pub results: Vec<ReportEntry<'a>>,
    pub failures: &'a [TestFailure],
    pub unavailable: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_composition: Option<BodyComposition>,
}

impl<'a> AssessmentReport<'a> {
    /// Pair every rated result with its range bar and, when a previous
    /// snapshot was compared, its progress delta
    pub fn build(
        client: &'a ClientProfile,
        outcome: &'a AssessmentOutcome,
        deltas: &'a [ProgressDelta],
        projector: &RangeBarProjector,
        mirror: bool,
    ) -> Self {
        let results = outcome
            .snapshot
            .results()
            .iter()
            .map(|result| {
                let progress = deltas.iter().find(|d| d.test_id == result.test_id);
                ReportEntry::new(result, projector, mirror, progress)
            })
            .collect();

        Self {
            client,
            taken_at: outcome.snapshot.taken_at(),
            norms_fingerprint: outcome.snapshot.norms_fingerprint(),
            results,
            failures: &outcome.failures,
            unavailable: &outcome.unavailable,
            body_composition: outcome.body_composition,
        }
    }
}
