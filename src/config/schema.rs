//! Config schema and deserialization

use crate::formulas::BodyFatAdjustment;
use crate::rangebar::{RangeBarSettings, Side};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Range bar section of the config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeBarConfig {
    /// Width of each open-ended zone, strictly between 0 and 0.5
    #[serde(default)]
    pub open_zone_width: Option<f64>,

    /// Side the best tier renders on: "left" or "right"
    #[serde(default)]
    pub best_side: Option<Side>,
}

/// Body-fat age adjustment section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyFatConfig {
    #[serde(default)]
    pub baseline_age: Option<u32>,

    #[serde(default)]
    pub increment_per_decade: Option<f64>,
}

/// Root config structure for .fitgaugerc.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Extend another config file (path relative to this config)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Directory of norms tables layered over the built-in set. Relative
    /// paths are resolved against the config file that declares them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub norms_dir: Option<PathBuf>,

    #[serde(default)]
    pub range_bar: RangeBarConfig,

    #[serde(default)]
    pub body_fat: BodyFatConfig,

    /// Render best tiers on the opposite side (right-to-left layouts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror: Option<bool>,
}

impl Config {
    /// Merge CLI overrides into config. CLI values take precedence.
    pub fn merge_with_cli(mut self, cli_norms_dir: Option<&Path>, cli_mirror: bool) -> Self {
        if let Some(dir) = cli_norms_dir {
            self.norms_dir = Some(dir.to_path_buf());
        }
        if cli_mirror {
            self.mirror = Some(true);
        }
        self
    }

    /// Merge another config into this one (for extends)
    pub fn merge_from(&mut self, base: Config) {
        // Base values are overridden by this config's values
        if self.extends.is_none() {
            self.extends = base.extends;
        }
        if self.norms_dir.is_none() {
            self.norms_dir = base.norms_dir;
        }
        if self.mirror.is_none() {
            self.mirror = base.mirror;
        }

        if self.range_bar.open_zone_width.is_none() {
            self.range_bar.open_zone_width = base.range_bar.open_zone_width;
        }
        if self.range_bar.best_side.is_none() {
            self.range_bar.best_side = base.range_bar.best_side;
        }

        if self.body_fat.baseline_age.is_none() {
            self.body_fat.baseline_age = base.body_fat.baseline_age;
        }
        if self.body_fat.increment_per_decade.is_none() {
            self.body_fat.increment_per_decade = base.body_fat.increment_per_decade;
        }
    }

    /// Resolve a relative `normsDir` against the directory of the config file
    pub(super) fn anchor_paths(&mut self, config_dir: &Path) {
        if let Some(dir) = &self.norms_dir {
            if dir.is_relative() {
                self.norms_dir = Some(config_dir.join(dir));
            }
        }
    }

    /// Check values that deserialize fine but make no sense
    pub fn validate(&self) -> anyhow::Result<()> {
        self.range_bar_settings()
            .validate()
            .map_err(|e| anyhow::anyhow!("rangeBar.openZoneWidth: {}", e))?;
        if let Some(increment) = self.body_fat.increment_per_decade {
            if !increment.is_finite() || increment < 0.0 {
                anyhow::bail!(
                    "bodyFat.incrementPerDecade must be a non-negative number, got {}",
                    increment
                );
            }
        }
        Ok(())
    }

    pub fn range_bar_settings(&self) -> RangeBarSettings {
        let defaults = RangeBarSettings::default();
        RangeBarSettings {
            open_zone_width: self
                .range_bar
                .open_zone_width
                .unwrap_or(defaults.open_zone_width),
            best_side: self.range_bar.best_side.unwrap_or(defaults.best_side),
        }
    }

    pub fn body_fat_adjustment(&self) -> BodyFatAdjustment {
        let defaults = BodyFatAdjustment::default();
        BodyFatAdjustment {
            baseline_age: self.body_fat.baseline_age.unwrap_or(defaults.baseline_age),
            increment_per_decade: self
                .body_fat
                .increment_per_decade
                .unwrap_or(defaults.increment_per_decade),
        }
    }

    pub fn mirror(&self) -> bool {
        self.mirror.unwrap_or(false)
    }
}
