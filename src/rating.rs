//! Tier resolution against normative threshold tables

use crate::battery::{FormulaKind, TestKind};
use crate::formulas::BodyFatAdjustment;
use crate::norms::{NormsRepository, ThresholdTable, TierCutoffs};
use crate::{Category, EngineError, Gender, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Oldest age accepted by the engine
pub const MAX_AGE: i32 = 130;

/// A raw value rated against one demographic entry of a threshold table.
/// Produced once per test per assessment and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedResult {
    pub test_id: String,
    pub test_name: String,
    pub category: Category,
    pub raw_value: f64,
    pub unit: String,
    pub tier: Tier,
    /// Cutoffs the tier was resolved against (kept for range bars)
    pub cutoffs: TierCutoffs,
    /// Age bracket key the cutoffs came from
    pub bracket: String,
    pub inverted: bool,
}

impl RatedResult {
    /// Rate `raw_value` against `cutoffs`, taking identity from `table`
    pub fn from_table(table: &ThresholdTable, bracket: &str, cutoffs: TierCutoffs, raw_value: f64) -> Self {
        let def = &table.definition;
        Self {
            test_id: def.id.clone(),
            test_name: def.name.clone(),
            category: def.category,
            raw_value,
            unit: def.unit.clone(),
            tier: resolve_tier(raw_value, &cutoffs, def.inverted),
            cutoffs,
            bracket: bracket.to_string(),
            inverted: def.inverted,
        }
    }

    /// One-line summary, e.g. "Push-up Test: 25 reps (Good)"
    pub fn describe(&self) -> String {
        format!(
            "{}: {} {} ({})",
            self.test_name,
            format_value(self.raw_value),
            self.unit,
            self.tier
        )
    }
}

/// Trim float noise for display: at most 2 decimals, no trailing zeros
pub fn format_value(value: f64) -> String {
    let s = format!("{:.2}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Walk the tiers from Excellent down and return the first one whose cutoff
/// the value reaches.
///
/// Non-inverted tests win a tier on `raw >= cutoff`, inverted tests on
/// `raw <= cutoff`. A value equal to a cutoff belongs to that cutoff's tier.
/// Poor is open-ended and matches whatever is left, including values under
/// the cutoffs' floor.
pub fn resolve_tier(raw_value: f64, cutoffs: &TierCutoffs, inverted: bool) -> Tier {
    if cutoffs.below_floor(raw_value) {
        return Tier::Poor;
    }
    for tier in Tier::TOP_DOWN {
        if tier == Tier::Poor {
            break;
        }
        let Some(cutoff) = cutoffs.cutoff(tier) else {
            continue;
        };
        let reached = if inverted {
            raw_value <= cutoff
        } else {
            raw_value >= cutoff
        };
        if reached {
            return tier;
        }
    }
    Tier::Poor
}

/// Validate an age and convert it for bracket lookup
pub fn check_age(age: i32) -> Result<u32, EngineError> {
    if age < 0 {
        return Err(EngineError::OutOfDomain(format!("age {} is negative", age)));
    }
    if age > MAX_AGE {
        return Err(EngineError::OutOfDomain(format!(
            "age {} exceeds the supported maximum of {}",
            age, MAX_AGE
        )));
    }
    Ok(age as u32)
}

fn check_raw_value(test_id: &str, raw_value: f64) -> Result<(), EngineError> {
    if raw_value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::OutOfDomain(format!(
            "raw value for '{}' is not a finite number",
            test_id
        )))
    }
}

/// Resolves raw values to tiers using tables from a [`NormsRepository`].
///
/// Does not know whether a value was entered or computed: formula outputs are
/// rated through the same [`RatingEngine::rate`]. Tables tagged as body fat
/// have their cutoffs shifted for age first.
#[derive(Debug, Clone, Copy)]
pub struct RatingEngine<'a> {
    norms: &'a NormsRepository,
    body_fat: BodyFatAdjustment,
}

impl<'a> RatingEngine<'a> {
    pub fn new(norms: &'a NormsRepository) -> Self {
        Self {
            norms,
            body_fat: BodyFatAdjustment::default(),
        }
    }

    /// Use a non-default age shift for body-fat tables
    pub fn with_body_fat_adjustment(mut self, adjustment: BodyFatAdjustment) -> Self {
        self.body_fat = adjustment;
        self
    }

    pub fn norms(&self) -> &'a NormsRepository {
        self.norms
    }

    pub fn body_fat_adjustment(&self) -> &BodyFatAdjustment {
        &self.body_fat
    }

    /// Rate a single test result for a demographic key
    pub fn rate(
        &self,
        test_id: &str,
        raw_value: f64,
        gender: Gender,
        age: i32,
    ) -> Result<RatedResult, EngineError> {
        let age = check_age(age)?;
        check_raw_value(test_id, raw_value)?;
        let table = self.norms.load_table(test_id)?;
        let entry = table.entry_for(gender, age)?;
        let cutoffs = match table.definition.kind {
            TestKind::FormulaDerived(FormulaKind::BodyFat) => self.body_fat.adjust(&entry.cutoffs, age),
            TestKind::DirectEntry
            | TestKind::FormulaDerived(FormulaKind::Bmi | FormulaKind::WaistToHip) => entry.cutoffs,
        };
        Ok(RatedResult::from_table(table, &entry.key, cutoffs, raw_value))
    }
}

/// One completed assessment's rated results, in test order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSnapshot {
    taken_at: DateTime<Utc>,
    #[serde(default)]
    norms_fingerprint: String,
    results: Vec<RatedResult>,
}

impl AssessmentSnapshot {
    pub fn new(results: Vec<RatedResult>, taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at,
            norms_fingerprint: String::new(),
            results,
        }
    }

    /// Record which norms rated this snapshot
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.norms_fingerprint = fingerprint.into();
        self
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn norms_fingerprint(&self) -> &str {
        &self.norms_fingerprint
    }

    pub fn results(&self) -> &[RatedResult] {
        &self.results
    }

    pub fn get(&self, test_id: &str) -> Option<&RatedResult> {
        self.results.iter().find(|r| r.test_id == test_id)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
