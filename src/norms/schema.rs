//! Norms file schema and deserialization

use crate::battery::FormulaKind;
use crate::{Category, Gender, Tier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw record as stored in `<test_id>.json`. Only ever seen by the loader;
/// the engine works on the validated [`super::ThresholdTable`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NormsRecord {
    pub test_name: String,
    pub unit: String,
    pub category: Category,

    /// Lower raw value is better (e.g. recovery heart rate)
    #[serde(default)]
    pub inverted: bool,

    /// Set for tests computed from body measurements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<FormulaKind>,

    #[serde(default)]
    pub description: String,

    /// gender -> age bracket key (e.g. "20-29", "60+") -> cutoffs
    pub norms: BTreeMap<Gender, BTreeMap<String, TierCutoffs>>,
}

/// Five tier boundaries for one demographic key.
///
/// `poor` may be absent: the lowest tier is open-ended and always matches as
/// the fallback, so its cutoff is informational only.
///
/// `floor` closes the best end of an inverted table: values strictly below it
/// rate Poor (e.g. underweight BMI).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierCutoffs {
    pub excellent: f64,
    pub good: f64,
    pub average: f64,
    pub below_average: f64,
    #[serde(default)]
    pub poor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<f64>,
}

impl TierCutoffs {
    pub fn cutoff(&self, tier: Tier) -> Option<f64> {
        match tier {
            Tier::Excellent => Some(self.excellent),
            Tier::Good => Some(self.good),
            Tier::Average => Some(self.average),
            Tier::BelowAverage => Some(self.below_average),
            Tier::Poor => self.poor,
        }
    }

    /// Whether `raw_value` falls under the floor
    pub fn below_floor(&self, raw_value: f64) -> bool {
        self.floor.is_some_and(|floor| raw_value < floor)
    }

    /// Every tier boundary moved by `delta`; the floor stays put
    pub fn shifted(&self, delta: f64) -> Self {
        Self {
            excellent: self.excellent + delta,
            good: self.good + delta,
            average: self.average + delta,
            below_average: self.below_average + delta,
            poor: self.poor.map(|p| p + delta),
            floor: self.floor,
        }
    }

    /// Check finiteness and strict monotonic ordering from excellent to poor.
    ///
    /// Non-inverted cutoffs must strictly decrease, inverted ones strictly
    /// increase. Equal neighbours are rejected: the lower tier could never win.
    pub fn validate(&self, inverted: bool) -> Result<(), String> {
        let mut previous: Option<(Tier, f64)> = None;
        for tier in Tier::TOP_DOWN {
            let Some(value) = self.cutoff(tier) else {
                continue;
            };
            if !value.is_finite() {
                return Err(format!("{} cutoff is not a finite number", tier));
            }
            if let Some((prev_tier, prev_value)) = previous {
                let ordered = if inverted {
                    value > prev_value
                } else {
                    value < prev_value
                };
                if !ordered {
                    let expected = if inverted { "above" } else { "below" };
                    return Err(format!(
                        "{} cutoff {} must be strictly {} {} cutoff {}{}",
                        tier,
                        value,
                        expected,
                        prev_tier,
                        prev_value,
                        if inverted { " (inverted test)" } else { "" }
                    ));
                }
            }
            previous = Some((tier, value));
        }
        if let Some(floor) = self.floor {
            if !inverted {
                return Err("floor is only allowed on inverted tests".to_string());
            }
            if !floor.is_finite() || floor >= self.excellent {
                return Err(format!(
                    "floor {} must be a finite number below Excellent cutoff {}",
                    floor, self.excellent
                ));
            }
        }
        Ok(())
    }
}
