//! Range bar geometry for rated results
//!
//! Produces zone widths and a marker position as fractions of the bar. No
//! rendering happens here; renderers scale the fractions to their own units.

use crate::rating::RatedResult;
use crate::{EngineError, Tier};
use serde::{Deserialize, Serialize};

/// Semantic zone order along the bar when the best tier sits on the right
const WORST_TO_BEST: [Tier; 5] = [
    Tier::Poor,
    Tier::BelowAverage,
    Tier::Average,
    Tier::Good,
    Tier::Excellent,
];

/// Side of the bar the best tier renders on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    #[default]
    Right,
}

impl Side {
    pub fn flipped(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangeBarSettings {
    /// Width given to each open-ended tier (Excellent and Poor)
    pub open_zone_width: f64,
    /// Canonical side for the best tier
    pub best_side: Side,
}

impl Default for RangeBarSettings {
    fn default() -> Self {
        Self {
            open_zone_width: 0.15,
            best_side: Side::Right,
        }
    }
}

impl RangeBarSettings {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.open_zone_width.is_finite() && self.open_zone_width > 0.0 && self.open_zone_width < 0.5 {
            Ok(())
        } else {
            Err(EngineError::InvalidInput(format!(
                "open zone width {} must lie strictly between 0 and 0.5",
                self.open_zone_width
            )))
        }
    }
}

/// One coloured segment of the bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub tier: Tier,
    /// Fraction of the whole bar
    pub width: f64,
    /// Raw-value range covered by the zone; `None` where the tier is open-ended
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
}

/// Layout-ready bar: zones in render order (left to right) and a marker in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBarLayout {
    pub zones: Vec<Zone>,
    pub marker: f64,
    pub best_side: Side,
}

impl RangeBarLayout {
    pub fn total_width(&self) -> f64 {
        self.zones.iter().map(|z| z.width).sum()
    }
}

/// Cutoffs expressed so that larger is always better
struct Goodness {
    excellent: f64,
    good: f64,
    average: f64,
    below_average: f64,
    value: f64,
    under_floor: bool,
}

impl Goodness {
    fn of(result: &RatedResult) -> Self {
        let sign = if result.inverted { -1.0 } else { 1.0 };
        let c = &result.cutoffs;
        Self {
            excellent: sign * c.excellent,
            good: sign * c.good,
            average: sign * c.average,
            below_average: sign * c.below_average,
            value: sign * result.raw_value,
            under_floor: c.below_floor(result.raw_value),
        }
    }

    /// Numeric extent of each finite tier
    fn span(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Good => self.excellent - self.good,
            Tier::Average => self.good - self.average,
            Tier::BelowAverage => self.average - self.below_average,
            Tier::Excellent | Tier::Poor => 0.0,
        }
    }

    /// How far the value has moved through its tier toward the better edge.
    /// Open tiers borrow the span of their finite neighbour as a scale, so the
    /// result may leave [0, 1] on the open side.
    fn progress_in(&self, tier: Tier) -> f64 {
        let ratio = |offset: f64, span: f64| if span > 0.0 { offset / span } else { 0.5 };
        match tier {
            Tier::Excellent => {
                ratio(self.value - self.excellent, self.span(Tier::Good)).max(0.0)
            }
            Tier::Good => ratio(self.value - self.good, self.span(Tier::Good)).clamp(0.0, 1.0),
            Tier::Average => {
                ratio(self.value - self.average, self.span(Tier::Average)).clamp(0.0, 1.0)
            }
            Tier::BelowAverage => ratio(
                self.value - self.below_average,
                self.span(Tier::BelowAverage),
            )
            .clamp(0.0, 1.0),
            Tier::Poor if self.under_floor => 0.0,
            Tier::Poor => {
                (1.0 - ratio(self.below_average - self.value, self.span(Tier::BelowAverage)))
                    .min(1.0)
            }
        }
    }
}

/// Raw-value bounds of a tier's zone
fn bounds(result: &RatedResult, tier: Tier) -> (Option<f64>, Option<f64>) {
    let c = &result.cutoffs;
    if result.inverted {
        match tier {
            Tier::Excellent => (c.floor, Some(c.excellent)),
            Tier::Good => (Some(c.excellent), Some(c.good)),
            Tier::Average => (Some(c.good), Some(c.average)),
            Tier::BelowAverage => (Some(c.average), Some(c.below_average)),
            Tier::Poor => (Some(c.below_average), None),
        }
    } else {
        match tier {
            Tier::Excellent => (Some(c.excellent), None),
            Tier::Good => (Some(c.good), Some(c.excellent)),
            Tier::Average => (Some(c.average), Some(c.good)),
            Tier::BelowAverage => (Some(c.below_average), Some(c.average)),
            Tier::Poor => (None, Some(c.below_average)),
        }
    }
}

/// Projects rated results onto range bar geometry
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeBarProjector {
    settings: RangeBarSettings,
}

impl RangeBarProjector {
    pub fn new(settings: RangeBarSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RangeBarSettings {
        &self.settings
    }

    /// Lay out one result.
    ///
    /// Zones always run worst to best toward the best side, so inverted tests
    /// read the same way as normal ones. `mirror` swaps the side for
    /// right-to-left presentation without touching the tier math.
    pub fn project(&self, result: &RatedResult, mirror: bool) -> RangeBarLayout {
        let goodness = Goodness::of(result);
        let open = self.settings.open_zone_width.clamp(0.0, 0.5);
        let finite_share = 1.0 - 2.0 * open;

        let finite_tiers = [Tier::BelowAverage, Tier::Average, Tier::Good];
        let total_span: f64 = finite_tiers.iter().map(|&t| goodness.span(t)).sum();
        let spans_usable = total_span.is_finite()
            && total_span > 0.0
            && finite_tiers.iter().all(|&t| goodness.span(t) >= 0.0);

        let width_of = |tier: Tier| match tier {
            Tier::Excellent | Tier::Poor => open,
            finite if spans_usable => finite_share * goodness.span(finite) / total_span,
            _ => finite_share / finite_tiers.len() as f64,
        };

        let mut zones = Vec::with_capacity(WORST_TO_BEST.len());
        let mut marker = 0.0;
        let mut start = 0.0;
        for tier in WORST_TO_BEST {
            let width = width_of(tier);
            if tier == result.tier {
                marker = start + goodness.progress_in(tier) * width;
            }
            let (lower_bound, upper_bound) = bounds(result, tier);
            zones.push(Zone {
                tier,
                width,
                lower_bound,
                upper_bound,
            });
            start += width;
        }
        let mut marker = marker.clamp(0.0, 1.0);

        let best_side = if mirror {
            self.settings.best_side.flipped()
        } else {
            self.settings.best_side
        };
        if best_side == Side::Left {
            zones.reverse();
            marker = 1.0 - marker;
        }

        RangeBarLayout {
            zones,
            marker,
            best_side,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::norms::TierCutoffs;
    use crate::rating::resolve_tier;
    use crate::Category;

    fn result(raw: f64, cutoffs: TierCutoffs, inverted: bool) -> RatedResult {
        RatedResult {
            test_id: "t".to_string(),
            test_name: "T".to_string(),
            category: Category::Strength,
            raw_value: raw,
            unit: "u".to_string(),
            tier: resolve_tier(raw, &cutoffs, inverted),
            cutoffs,
            bracket: "20-29".to_string(),
            inverted,
        }
    }

    fn pushup() -> TierCutoffs {
        TierCutoffs {
            excellent: 36.0,
            good: 29.0,
            average: 22.0,
            below_average: 17.0,
            poor: Some(16.0),
            floor: None,
        }
    }

    fn step() -> TierCutoffs {
        TierCutoffs {
            excellent: 70.0,
            good: 79.0,
            average: 83.0,
            below_average: 89.0,
            poor: None,
            floor: None,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_widths_sum_to_one() {
        let projector = RangeBarProjector::default();
        for raw in [0.0, 17.0, 25.0, 36.0, 80.0] {
            let layout = projector.project(&result(raw, pushup(), false), false);
            assert!(approx(layout.total_width(), 1.0));
        }
    }

    #[test]
    fn test_open_zones_get_configured_width() {
        let projector = RangeBarProjector::new(RangeBarSettings {
            open_zone_width: 0.1,
            best_side: Side::Right,
        });
        let layout = projector.project(&result(25.0, pushup(), false), false);
        assert_eq!(layout.zones[0].tier, Tier::Poor);
        assert!(approx(layout.zones[0].width, 0.1));
        assert_eq!(layout.zones[4].tier, Tier::Excellent);
        assert!(approx(layout.zones[4].width, 0.1));
        // finite spans 5, 7, 7 share 0.8
        assert!(approx(layout.zones[1].width, 0.8 * 5.0 / 19.0));
        assert!(approx(layout.zones[2].width, 0.8 * 7.0 / 19.0));
        assert!(approx(layout.zones[3].width, 0.8 * 7.0 / 19.0));
    }

    #[test]
    fn test_zone_bounds_non_inverted() {
        let layout = RangeBarProjector::default().project(&result(25.0, pushup(), false), false);
        let good = layout.zones.iter().find(|z| z.tier == Tier::Good).unwrap();
        assert_eq!(good.lower_bound, Some(29.0));
        assert_eq!(good.upper_bound, Some(36.0));
        let excellent = layout.zones.iter().find(|z| z.tier == Tier::Excellent).unwrap();
        assert_eq!(excellent.upper_bound, None);
    }

    #[test]
    fn test_marker_interpolates_within_tier() {
        let projector = RangeBarProjector::default();
        let low = projector.project(&result(22.0, pushup(), false), false);
        let mid = projector.project(&result(25.5, pushup(), false), false);
        let average = low.zones[2];
        let average_start = low.zones[0].width + low.zones[1].width;
        assert!(approx(low.marker, average_start));
        assert!(approx(mid.marker, average_start + average.width / 2.0));
    }

    #[test]
    fn test_marker_clamped_far_beyond_best() {
        let layout = RangeBarProjector::default().project(&result(500.0, pushup(), false), false);
        assert_eq!(layout.marker, 1.0);
        let layout = RangeBarProjector::default().project(&result(-500.0, pushup(), false), false);
        assert_eq!(layout.marker, 0.0);
    }

    #[test]
    fn test_inverted_best_still_on_canonical_side() {
        let layout = RangeBarProjector::default().project(&result(65.0, step(), true), false);
        assert_eq!(layout.best_side, Side::Right);
        assert_eq!(layout.zones.last().unwrap().tier, Tier::Excellent);
        assert!(layout.marker > 0.85);

        let poor = RangeBarProjector::default().project(&result(120.0, step(), true), false);
        assert!(poor.marker < 0.15);
    }

    #[test]
    fn test_inverted_zone_bounds() {
        let layout = RangeBarProjector::default().project(&result(80.0, step(), true), false);
        let average = layout.zones.iter().find(|z| z.tier == Tier::Average).unwrap();
        assert_eq!(average.lower_bound, Some(79.0));
        assert_eq!(average.upper_bound, Some(83.0));
    }

    #[test]
    fn test_mirror_swaps_side_only() {
        let projector = RangeBarProjector::default();
        let r = result(25.0, pushup(), false);
        let normal = projector.project(&r, false);
        let mirrored = projector.project(&r, true);

        assert_eq!(mirrored.best_side, Side::Left);
        assert_eq!(mirrored.zones[0].tier, Tier::Excellent);
        assert!(approx(mirrored.marker, 1.0 - normal.marker));

        let mut reversed = normal.zones.clone();
        reversed.reverse();
        assert_eq!(mirrored.zones, reversed);
    }

    #[test]
    fn test_left_canonical_side_with_mirror_renders_right() {
        let projector = RangeBarProjector::new(RangeBarSettings {
            best_side: Side::Left,
            ..RangeBarSettings::default()
        });
        let layout = projector.project(&result(25.0, pushup(), false), true);
        assert_eq!(layout.best_side, Side::Right);
        assert_eq!(layout.zones[4].tier, Tier::Excellent);
    }

    #[test]
    fn test_value_under_floor_marks_worst_end() {
        let bmi = TierCutoffs {
            excellent: 23.0,
            good: 25.0,
            average: 27.5,
            below_average: 30.0,
            poor: None,
            floor: Some(18.5),
        };
        let layout = RangeBarProjector::default().project(&result(14.7, bmi, true), false);
        assert_eq!(layout.zones[0].tier, Tier::Poor);
        assert!(approx(layout.marker, 0.0));
        assert_eq!(layout.zones[4].lower_bound, Some(18.5));
        assert_eq!(layout.zones[4].upper_bound, Some(23.0));
    }

    #[test]
    fn test_degenerate_cutoffs_fall_back_to_equal_widths() {
        let flat = TierCutoffs {
            excellent: 10.0,
            good: 10.0,
            average: 10.0,
            below_average: 10.0,
            poor: None,
            floor: None,
        };
        let layout = RangeBarProjector::default().project(&result(10.0, flat, false), false);
        assert!(approx(layout.total_width(), 1.0));
        assert!(approx(layout.zones[1].width, layout.zones[2].width));
        assert!((0.0..=1.0).contains(&layout.marker));
    }

    #[test]
    fn test_settings_validation() {
        assert!(RangeBarSettings::default().validate().is_ok());
        let bad = RangeBarSettings {
            open_zone_width: 0.5,
            ..RangeBarSettings::default()
        };
        assert!(bad.validate().is_err());
        let bad = RangeBarSettings {
            open_zone_width: 0.0,
            ..RangeBarSettings::default()
        };
        assert!(bad.validate().is_err());
    }
}
