//! Body-composition formulas for computed tests
//!
//! The calculators produce raw values only; rating goes through the same
//! tier resolution as directly entered tests.

use crate::battery::FormulaKind;
use crate::norms::{NormsRepository, TierCutoffs};
use crate::rating::{RatedResult, RatingEngine};
use crate::{EngineError, Gender};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// US Navy circumference formula coefficients
mod navy {
    pub const NUMERATOR: f64 = 495.0;
    pub const OFFSET: f64 = 450.0;

    pub mod male {
        pub const A: f64 = 1.0324;
        pub const B: f64 = 0.19077;
        pub const C: f64 = 0.15456;
    }

    pub mod female {
        pub const A: f64 = 1.29579;
        pub const B: f64 = 0.35004;
        pub const C: f64 = 0.22100;
    }
}

fn require_positive(name: &str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidInput(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}

/// Body mass index: `weight_kg / (height_cm / 100)^2`.
///
/// The built-in `bmi` table carries a floor of 18.5, so underweight values
/// rate Poor.
pub fn bmi(weight_kg: f64, height_cm: f64) -> Result<f64, EngineError> {
    require_positive("height_cm", height_cm)?;
    require_positive("weight_kg", weight_kg)?;
    let height_m = height_cm / 100.0;
    Ok(weight_kg / (height_m * height_m))
}

/// Waist-to-hip ratio: `waist_cm / hip_cm`
pub fn waist_to_hip_ratio(waist_cm: f64, hip_cm: f64) -> Result<f64, EngineError> {
    require_positive("hip_cm", hip_cm)?;
    require_positive("waist_cm", waist_cm)?;
    Ok(waist_cm / hip_cm)
}

/// Body fat percentage from circumferences (US Navy method).
///
/// Returns `Ok(None)` when the formula has no valid answer for the input:
/// a logarithm argument that is not positive (waist at or below neck for men,
/// waist + hip at or below neck for women), a missing hip measurement for
/// women, or a result that is not a finite non-negative percentage.
/// Non-positive measurements are an error.
///
/// - male: `495 / (1.0324 - 0.19077 log10(waist - neck) + 0.15456 log10(height)) - 450`
/// - female: `495 / (1.29579 - 0.35004 log10(waist + hip - neck) + 0.22100 log10(height)) - 450`
pub fn body_fat_percent(
    gender: Gender,
    height_cm: f64,
    waist_cm: f64,
    neck_cm: f64,
    hip_cm: Option<f64>,
) -> Result<Option<f64>, EngineError> {
    require_positive("height_cm", height_cm)?;
    require_positive("waist_cm", waist_cm)?;
    require_positive("neck_cm", neck_cm)?;
    if let Some(hip) = hip_cm {
        require_positive("hip_cm", hip)?;
    }

    let (circumference, a, b, c) = match gender {
        Gender::Male => (
            waist_cm - neck_cm,
            navy::male::A,
            navy::male::B,
            navy::male::C,
        ),
        Gender::Female => {
            let Some(hip) = hip_cm else {
                warn!("body fat not computed: hip measurement required for female formula");
                return Ok(None);
            };
            (
                waist_cm + hip - neck_cm,
                navy::female::A,
                navy::female::B,
                navy::female::C,
            )
        }
    };

    if circumference <= 0.0 {
        warn!(
            %gender,
            circumference, "body fat not computed: circumference difference is not positive"
        );
        return Ok(None);
    }

    let density = a - b * circumference.log10() + c * height_cm.log10();
    let percent = navy::NUMERATOR / density - navy::OFFSET;
    if !percent.is_finite() || percent < 0.0 {
        warn!(%gender, percent, "body fat not computed: formula result out of range");
        return Ok(None);
    }
    Ok(Some(percent))
}

/// Age adjustment applied to body-fat cutoffs before rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BodyFatAdjustment {
    /// Ages at or below this use the table verbatim
    pub baseline_age: u32,
    /// Percentage points added to every cutoff per full decade above baseline
    pub increment_per_decade: f64,
}

impl Default for BodyFatAdjustment {
    fn default() -> Self {
        Self {
            baseline_age: 30,
            increment_per_decade: 1.0,
        }
    }
}

impl BodyFatAdjustment {
    /// Shift for a given age: increment × full decades above baseline
    pub fn shift_for_age(&self, age: u32) -> f64 {
        let decades = age.saturating_sub(self.baseline_age) / 10;
        decades as f64 * self.increment_per_decade
    }

    pub fn adjust(&self, cutoffs: &TierCutoffs, age: u32) -> TierCutoffs {
        cutoffs.shifted(self.shift_for_age(age))
    }
}

/// Rate a body-fat percentage against the `body_fat` table after shifting its
/// cutoffs for age. Same path as [`RatingEngine::rate`] on that table.
pub fn classify_body_fat(
    norms: &NormsRepository,
    body_fat_pct: f64,
    gender: Gender,
    age: i32,
    adjustment: &BodyFatAdjustment,
) -> Result<RatedResult, EngineError> {
    RatingEngine::new(norms)
        .with_body_fat_adjustment(*adjustment)
        .rate(FormulaKind::BodyFat.test_id(), body_fat_pct, gender, age)
}

/// Fat and lean mass split of body weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyComposition {
    pub fat_mass_kg: f64,
    pub lean_mass_kg: f64,
}

pub fn body_composition(weight_kg: f64, body_fat_pct: f64) -> Result<BodyComposition, EngineError> {
    require_positive("weight_kg", weight_kg)?;
    if !(0.0..=100.0).contains(&body_fat_pct) {
        return Err(EngineError::InvalidInput(format!(
            "body fat percentage {} outside 0-100",
            body_fat_pct
        )));
    }
    let fat_mass_kg = weight_kg * body_fat_pct / 100.0;
    Ok(BodyComposition {
        fat_mass_kg,
        lean_mass_kg: weight_kg - fat_mass_kg,
    })
}
