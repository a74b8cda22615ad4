//! Console reporter with colored output

use super::{AssessmentReport, ReportEntry};
use crate::battery::TestDefinition;
use crate::rangebar::RangeBarLayout;
use crate::rating::format_value;
use crate::Tier;
use colored::Colorize;

/// Characters in a rendered range bar
const BAR_WIDTH: usize = 30;

/// Reporter for terminal output
pub struct ConsoleReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show verbose output
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            use_colors: true,
            verbose: false,
        }
    }

    /// Disable colors
    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Enable verbose output
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    pub fn report_result(&self, entry: &ReportEntry) {
        print!("{}", self.format_result(entry));
    }

    pub fn report_assessment(&self, report: &AssessmentReport) {
        print!("{}", self.format_assessment(report));
    }

    /// Report in quiet mode (one line per result)
    pub fn report_quiet(&self, report: &AssessmentReport) {
        for entry in &report.results {
            println!(
                "{}: {} ({})",
                entry.result.test_id,
                format_value(entry.result.raw_value),
                self.colorize_tier(entry.result.tier)
            );
        }
    }

    pub fn report_battery<'a>(&self, definitions: impl IntoIterator<Item = &'a TestDefinition>) {
        print!("{}", self.format_battery(definitions));
    }

    pub fn format_result(&self, entry: &ReportEntry) -> String {
        let r = entry.result;
        let mut out = String::new();
        out.push('\n');
        out.push_str(&format!("{}\n", self.bold(&r.test_name)));
        out.push_str(&format!(
            "   Result: {} {} {}\n",
            format_value(r.raw_value),
            r.unit,
            self.colorize_tier(r.tier)
        ));
        out.push_str(&format!("   {}\n", self.render_bar(&entry.range_bar)));
        if self.verbose {
            out.push_str(&self.format_cutoffs(entry));
        }
        out
    }

    pub fn format_assessment(&self, report: &AssessmentReport) -> String {
        let mut out = String::new();
        let client = report.client;
        out.push('\n');
        let title = if client.name.is_empty() {
            "Fitness Assessment".to_string()
        } else {
            format!("Fitness Assessment: {}", client.name)
        };
        out.push_str(&format!("{}\n", self.bold(&title)));
        out.push_str(&format!(
            "   {} | age {} | {}\n\n",
            client.gender,
            client.age,
            report.taken_at.format("%Y-%m-%d %H:%M UTC")
        ));

        let name_width = report
            .results
            .iter()
            .map(|e| e.result.test_name.chars().count())
            .max()
            .unwrap_or(0);

        for entry in &report.results {
            let r = entry.result;
            let value = format!("{} {}", format_value(r.raw_value), r.unit);
            let tier = format!("{:<13}", r.tier.label());
            let mut line = format!(
                "   {:<name_width$}  {:>12}  {}  {}",
                r.test_name,
                value,
                self.paint_tier(r.tier, &tier),
                self.render_bar(&entry.range_bar),
            );
            if let Some(delta) = entry.progress {
                line.push_str("  ");
                line.push_str(&self.dimmed(&delta.summary()));
            }
            out.push_str(line.trim_end());
            out.push('\n');
            if self.verbose {
                out.push_str(&self.format_cutoffs(entry));
            }
        }

        if let Some(comp) = report.body_composition {
            out.push_str(&format!(
                "\n   Body composition: {} kg fat, {} kg lean\n",
                format_value(comp.fat_mass_kg),
                format_value(comp.lean_mass_kg)
            ));
        }

        if !report.unavailable.is_empty() {
            out.push('\n');
            for test_id in report.unavailable {
                out.push_str(&format!(
                    "   {} {}: not computable from the given measurements\n",
                    self.paint("⚠", Paint::Warning),
                    test_id
                ));
            }
        }

        if !report.failures.is_empty() {
            out.push('\n');
            out.push_str(&format!("   {}\n", self.bold("Not rated:")));
            for failure in report.failures {
                out.push_str(&format!(
                    "   {} {} {}\n",
                    self.paint("✗", Paint::Error),
                    failure.test_id,
                    self.dimmed(&failure.error.to_string())
                ));
            }
        }

        out.push_str(&format!(
            "\n   Rated: {}  Not rated: {}\n",
            report.results.len(),
            report.failures.len()
        ));
        out
    }

    pub fn format_battery<'a>(&self, definitions: impl IntoIterator<Item = &'a TestDefinition>) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", self.bold("Test battery")));
        for def in definitions {
            let mut notes = Vec::new();
            if def.inverted {
                notes.push("lower is better");
            }
            if def.is_computed() {
                notes.push("computed");
            }
            let notes = if notes.is_empty() {
                String::new()
            } else {
                format!(" ({})", notes.join(", "))
            };
            out.push_str(&format!(
                "   {:<14} {:<32} {:<12} {}{}\n",
                def.id,
                def.name,
                def.category.to_string(),
                def.unit,
                self.dimmed(&notes)
            ));
            if self.verbose && !def.description.is_empty() {
                out.push_str(&format!("   {:<14} {}\n", "", self.dimmed(&def.description)));
            }
        }
        out
    }

    fn format_cutoffs(&self, entry: &ReportEntry) -> String {
        let r = entry.result;
        let comparator = if r.inverted { "<=" } else { ">=" };
        let c = &r.cutoffs;
        let mut line = format!(
            "bracket {}: excellent {}{}, good {}{}, average {}{}, below average {}{}",
            r.bracket,
            comparator,
            format_value(c.excellent),
            comparator,
            format_value(c.good),
            comparator,
            format_value(c.average),
            comparator,
            format_value(c.below_average),
        );
        if let Some(floor) = c.floor {
            line.push_str(&format!(", poor below {}", format_value(floor)));
        }
        format!("       {} {}\n", self.dimmed("↳"), self.dimmed(&line))
    }

    /// Text range bar: one glyph per tier, `|` at the marker
    fn render_bar(&self, layout: &RangeBarLayout) -> String {
        let mut cells: Vec<(char, Tier)> = Vec::with_capacity(BAR_WIDTH);
        let mut cumulative = 0.0;
        for zone in &layout.zones {
            cumulative += zone.width;
            let end = ((cumulative * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
            while cells.len() < end {
                cells.push((tier_glyph(zone.tier), zone.tier));
            }
        }
        if let Some(last) = layout.zones.last() {
            while cells.len() < BAR_WIDTH {
                cells.push((tier_glyph(last.tier), last.tier));
            }
        }

        let marker = ((layout.marker * BAR_WIDTH as f64) as usize).min(BAR_WIDTH - 1);
        let mut bar = String::from("[");
        for (i, (glyph, tier)) in cells.into_iter().enumerate() {
            if i == marker {
                bar.push_str(&self.bold("|"));
            } else {
                bar.push_str(&self.paint_tier(tier, &glyph.to_string()));
            }
        }
        bar.push(']');
        bar
    }

    fn colorize_tier(&self, tier: Tier) -> String {
        self.paint_tier(tier, tier.label())
    }

    fn paint_tier(&self, tier: Tier, text: &str) -> String {
        if !self.use_colors {
            return text.to_string();
        }
        match tier {
            Tier::Excellent => text.green().bold().to_string(),
            Tier::Good => text.green().to_string(),
            Tier::Average => text.yellow().to_string(),
            Tier::BelowAverage => text.red().to_string(),
            Tier::Poor => text.red().bold().to_string(),
        }
    }

    fn paint(&self, text: &str, paint: Paint) -> String {
        if !self.use_colors {
            return text.to_string();
        }
        match paint {
            Paint::Warning => text.yellow().to_string(),
            Paint::Error => text.red().to_string(),
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.use_colors {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dimmed(&self, text: &str) -> String {
        if self.use_colors {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
enum Paint {
    Warning,
    Error,
}

fn tier_glyph(tier: Tier) -> char {
    match tier {
        Tier::Poor => '.',
        Tier::BelowAverage => '-',
        Tier::Average => '=',
        Tier::Good => '+',
        Tier::Excellent => '#',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{assess, AssessmentInput, ClientProfile};
    use crate::formulas::BodyFatAdjustment;
    use crate::norms::NormsRepository;
    use crate::progress::diff;
    use crate::rangebar::{RangeBarProjector, RangeBarSettings, Side};
    use crate::rating::RatingEngine;
    use crate::Gender;
    use chrono::{TimeZone, Utc};

    fn plain() -> ConsoleReporter {
        ConsoleReporter::new().without_colors()
    }

    fn bar_of(raw: f64, mirror: bool) -> String {
        let repo = NormsRepository::builtin().unwrap();
        let result = RatingEngine::new(&repo).rate("pushup", raw, Gender::Male, 25).unwrap();
        let layout = RangeBarProjector::default().project(&result, mirror);
        plain().render_bar(&layout)
    }

    #[test]
    fn test_bar_has_fixed_width() {
        for raw in [0.0, 20.0, 29.0, 60.0] {
            let bar = bar_of(raw, false);
            assert_eq!(bar.chars().count(), BAR_WIDTH + 2, "bar {:?}", bar);
            assert_eq!(bar.matches('|').count(), 1);
        }
    }

    #[test]
    fn test_bar_orientation() {
        let bar = bar_of(60.0, false);
        assert!(bar.starts_with("[."));
        assert!(bar.ends_with("|]"), "excellent marker at right edge: {}", bar);

        let mirrored = bar_of(60.0, true);
        assert!(mirrored.starts_with("[|"), "mirrored: {}", mirrored);
        assert!(mirrored.ends_with(".]"));
    }

    #[test]
    fn test_bar_left_canonical_side() {
        let repo = NormsRepository::builtin().unwrap();
        let result = RatingEngine::new(&repo).rate("pushup", 0.0, Gender::Male, 25).unwrap();
        let projector = RangeBarProjector::new(RangeBarSettings {
            best_side: Side::Left,
            ..RangeBarSettings::default()
        });
        let bar = plain().render_bar(&projector.project(&result, false));
        assert!(bar.starts_with("[#"));
        assert!(bar.ends_with("|]"), "poor marker on the right: {}", bar);
    }

    #[test]
    fn test_format_result_plain() {
        let repo = NormsRepository::builtin().unwrap();
        let result = RatingEngine::new(&repo).rate("plank", 95.0, Gender::Male, 30).unwrap();
        let entry = ReportEntry::new(&result, &RangeBarProjector::default(), false, None);
        let text = plain().verbose().format_result(&entry);
        assert!(text.contains("Forearm Plank Test"));
        assert!(text.contains("Result: 95 seconds Good"));
        assert!(text.contains("bracket 20-39: excellent >=120"));
    }

    #[test]
    fn test_format_result_shows_floor() {
        let repo = NormsRepository::builtin().unwrap();
        let result = RatingEngine::new(&repo).rate("bmi", 14.69, Gender::Male, 30).unwrap();
        let entry = ReportEntry::new(&result, &RangeBarProjector::default(), false, None);
        let text = plain().verbose().format_result(&entry);
        assert!(text.contains("Poor"));
        assert!(text.contains("poor below 18.5"));
    }

    #[test]
    fn test_format_assessment_plain() {
        let repo = NormsRepository::builtin().unwrap();
        let adj = BodyFatAdjustment::default();
        let mut input = AssessmentInput {
            client: ClientProfile {
                name: "Jordan".to_string(),
                age: 34,
                gender: Gender::Female,
                height_cm: None,
                weight_kg: None,
                waist_cm: None,
                hip_cm: None,
                neck_cm: None,
            },
            tests: [("zipper".to_string(), -4.0), ("lunges".to_string(), 12.0)]
                .into_iter()
                .collect(),
        };
        let previous = assess(&repo, &input, &adj, Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap());
        input.tests.insert("zipper".to_string(), 4.0);
        let current = assess(&repo, &input, &adj, Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap());
        let deltas = diff(&current.snapshot, &previous.snapshot);

        let report = AssessmentReport::build(
            &input.client,
            &current,
            &deltas,
            &RangeBarProjector::default(),
            false,
        );
        let text = plain().format_assessment(&report);

        assert!(text.contains("Fitness Assessment: Jordan"));
        assert!(text.contains("female | age 34 | 2025-04-01 09:00 UTC"));
        assert!(text.contains("Zipper (Back Scratch) Test"));
        assert!(text.contains("[was -4 (Below Average), up 8]"));
        assert!(text.contains("Not rated:"));
        assert!(text.contains("lunges"));
        assert!(text.contains("Rated: 1  Not rated: 1"));
    }

    #[test]
    fn test_format_battery_marks_computed_and_inverted() {
        let repo = NormsRepository::builtin().unwrap();
        let text = plain().format_battery(repo.definitions());
        let bmi_line = text.lines().find(|l| l.trim_start().starts_with("bmi ")).unwrap();
        assert!(bmi_line.contains("lower is better, computed"));
        let pushup_line = text.lines().find(|l| l.trim_start().starts_with("pushup ")).unwrap();
        assert!(!pushup_line.contains('('));
    }
}
