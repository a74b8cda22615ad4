//! Fitgauge: normative rating engine for fitness assessments
//!
//! Converts raw test measurements into five-tier ratings against normative
//! threshold tables, derives body-composition metrics, compares successive
//! assessments and lays rated results out as range bars for renderers.

pub mod assessment;
pub mod battery;
pub mod config;
pub mod error;
pub mod formulas;
pub mod norms;
pub mod progress;
pub mod rangebar;
pub mod rating;
pub mod reporter;

pub use assessment::{assess, AssessmentInput, AssessmentOutcome, ClientProfile, TestFailure};
pub use battery::{FormulaKind, TestDefinition, TestKind};
pub use error::EngineError;
pub use norms::{NormsBuilder, NormsRepository, ThresholdTable, TierCutoffs};
pub use progress::{diff, Direction, ProgressDelta, SnapshotHistory};
pub use rangebar::{RangeBarLayout, RangeBarProjector, RangeBarSettings, Side, Zone};
pub use rating::{resolve_tier, AssessmentSnapshot, RatedResult, RatingEngine};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rating tier; derives `Ord` from worst (Poor) to best (Excellent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Poor,
    BelowAverage,
    Average,
    Good,
    Excellent,
}

impl Tier {
    /// Tiers in the order the rating walk visits them (best first)
    pub const TOP_DOWN: [Tier; 5] = [
        Tier::Excellent,
        Tier::Good,
        Tier::Average,
        Tier::BelowAverage,
        Tier::Poor,
    ];

    /// Ordinal used for progress direction: Excellent=4 … Poor=0
    pub fn ordinal(self) -> u8 {
        match self {
            Tier::Excellent => 4,
            Tier::Good => 3,
            Tier::Average => 2,
            Tier::BelowAverage => 1,
            Tier::Poor => 0,
        }
    }

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            Tier::Excellent => "Excellent",
            Tier::Good => "Good",
            Tier::Average => "Average",
            Tier::BelowAverage => "Below Average",
            Tier::Poor => "Poor",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Demographic gender key used by the norms tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            other => Err(EngineError::InvalidInput(format!(
                "unknown gender '{}', expected male or female",
                other
            ))),
        }
    }
}

/// Test category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Strength,
    Flexibility,
    Cardio,
    BodyComp,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Strength => write!(f, "strength"),
            Category::Flexibility => write!(f, "flexibility"),
            Category::Cardio => write!(f, "cardio"),
            Category::BodyComp => write!(f, "body_comp"),
        }
    }
}
