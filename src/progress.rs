//! Progress tracking between assessment snapshots

use crate::rating::{format_value, AssessmentSnapshot};
use crate::Tier;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Snapshots kept by a [`SnapshotHistory`]
pub const MAX_SNAPSHOTS: usize = 50;

/// Tier-based direction of change between two assessments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Improved,
    Declined,
    Unchanged,
}

impl Direction {
    /// Compare tier ordinals. Raw-value sign plays no part: an inverted test
    /// improves while its raw value falls.
    pub fn between(previous: Tier, current: Tier) -> Self {
        match current.ordinal().cmp(&previous.ordinal()) {
            std::cmp::Ordering::Greater => Direction::Improved,
            std::cmp::Ordering::Less => Direction::Declined,
            std::cmp::Ordering::Equal => Direction::Unchanged,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Improved => write!(f, "improved"),
            Direction::Declined => write!(f, "declined"),
            Direction::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Change in one test between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressDelta {
    pub test_id: String,
    pub test_name: String,
    pub previous_value: f64,
    pub current_value: f64,
    pub previous_tier: Tier,
    pub current_tier: Tier,
    /// `current - previous`, rounded to 2 decimals, sign untouched by inversion
    pub delta: f64,
    pub direction: Direction,
}

impl ProgressDelta {
    /// Console suffix: "[was 25 (Good), up 5]", "[was 80 (Good), down 4]"
    /// or "[unchanged at 25]"
    pub fn summary(&self) -> String {
        if self.delta == 0.0 {
            return format!("[unchanged at {}]", format_value(self.current_value));
        }
        let movement = if self.delta > 0.0 { "up" } else { "down" };
        format!(
            "[was {} ({}), {} {}]",
            format_value(self.previous_value),
            self.previous_tier,
            movement,
            format_value(self.delta.abs())
        )
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compare two snapshots test by test.
///
/// Only tests present in both snapshots produce a delta; the rest are
/// skipped. Output follows the order of `current`.
pub fn diff(current: &AssessmentSnapshot, previous: &AssessmentSnapshot) -> Vec<ProgressDelta> {
    let previous_by_id: HashMap<&str, _> = previous
        .results()
        .iter()
        .map(|r| (r.test_id.as_str(), r))
        .collect();

    let mut deltas = Vec::new();
    for curr in current.results() {
        let Some(prev) = previous_by_id.get(curr.test_id.as_str()) else {
            debug!(test_id = %curr.test_id, "no previous result, skipping progress");
            continue;
        };
        deltas.push(ProgressDelta {
            test_id: curr.test_id.clone(),
            test_name: curr.test_name.clone(),
            previous_value: prev.raw_value,
            current_value: curr.raw_value,
            previous_tier: prev.tier,
            current_tier: curr.tier,
            delta: round2(curr.raw_value - prev.raw_value),
            direction: Direction::between(prev.tier, curr.tier),
        });
    }
    deltas
}

/// In-memory run of a client's snapshots, oldest first, capped at
/// [`MAX_SNAPSHOTS`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotHistory {
    snapshots: VecDeque<AssessmentSnapshot>,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot, dropping the oldest past the cap. Snapshots are
    /// kept in `taken_at` order even if pushed out of order.
    pub fn push(&mut self, snapshot: AssessmentSnapshot) {
        let position = self
            .snapshots
            .iter()
            .rposition(|s| s.taken_at() <= snapshot.taken_at())
            .map_or(0, |i| i + 1);
        self.snapshots.insert(position, snapshot);
        while self.snapshots.len() > MAX_SNAPSHOTS {
            self.snapshots.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&AssessmentSnapshot> {
        self.snapshots.back()
    }

    /// The snapshot before the latest one
    pub fn previous(&self) -> Option<&AssessmentSnapshot> {
        let len = self.snapshots.len();
        if len < 2 {
            return None;
        }
        self.snapshots.get(len - 2)
    }

    /// Deltas between the two newest snapshots; empty with fewer than two
    pub fn progress(&self) -> Vec<ProgressDelta> {
        match (self.latest(), self.previous()) {
            (Some(current), Some(previous)) => diff(current, previous),
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssessmentSnapshot> {
        self.snapshots.iter()
    }
}
