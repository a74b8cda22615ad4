//! Batch rating of one client assessment

use crate::battery::FormulaKind;
use crate::formulas::{self, BodyComposition, BodyFatAdjustment};
use crate::norms::NormsRepository;
use crate::rating::{AssessmentSnapshot, RatedResult, RatingEngine};
use crate::{EngineError, Gender};
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Who was assessed, plus optional body measurements for computed tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientProfile {
    #[serde(default)]
    pub name: String,
    pub age: i32,
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waist_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hip_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neck_cm: Option<f64>,
}

/// Raw assessment input: the client and entered test values keyed by test id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentInput {
    pub client: ClientProfile,
    #[serde(default)]
    pub tests: BTreeMap<String, f64>,
}

/// A test that could not be rated
#[derive(Debug, Clone, PartialEq)]
pub struct TestFailure {
    pub test_id: String,
    pub error: EngineError,
}

impl Serialize for TestFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TestFailure", 3)?;
        state.serialize_field("test_id", &self.test_id)?;
        state.serialize_field("kind", self.error.kind())?;
        state.serialize_field("message", &self.error.to_string())?;
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentOutcome {
    pub snapshot: AssessmentSnapshot,
    pub failures: Vec<TestFailure>,
    /// Computed tests whose measurements were given but yield no valid value
    pub unavailable: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_composition: Option<BodyComposition>,
}

impl AssessmentOutcome {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Rate every entered test, then derive computed tests from the client's
/// measurements.
///
/// Entered tests are rated in test-id order. A computed test is skipped when
/// its value was entered directly or its measurements are missing. A failure
/// on one test is recorded and the rest of the batch still runs. Body-fat
/// tables, entered or computed, are rated with `adjustment`.
pub fn assess(
    norms: &NormsRepository,
    input: &AssessmentInput,
    adjustment: &BodyFatAdjustment,
    taken_at: DateTime<Utc>,
) -> AssessmentOutcome {
    let engine = RatingEngine::new(norms).with_body_fat_adjustment(*adjustment);
    let client = &input.client;
    let mut results = Vec::new();
    let mut failures = Vec::new();
    let mut unavailable = Vec::new();

    let mut record = |test_id: &str, rated: Result<RatedResult, EngineError>| match rated {
        Ok(result) => results.push(result),
        Err(error) => {
            debug!(test_id, %error, "test not rated");
            failures.push(TestFailure {
                test_id: test_id.to_string(),
                error,
            });
        }
    };

    for (test_id, &value) in &input.tests {
        record(test_id, engine.rate(test_id, value, client.gender, client.age));
    }

    let mut body_fat_pct = input.tests.get(FormulaKind::BodyFat.test_id()).copied();
    for kind in FormulaKind::ALL {
        let test_id = kind.test_id();
        if input.tests.contains_key(test_id) {
            continue;
        }
        let computed = match compute(kind, client) {
            Ok(Some(value)) => value,
            Ok(None) => {
                if has_measurements(kind, client) {
                    unavailable.push(test_id.to_string());
                } else {
                    debug!(test_id, "measurements missing, computed test skipped");
                }
                continue;
            }
            Err(error) => {
                record(test_id, Err(error));
                continue;
            }
        };
        if kind == FormulaKind::BodyFat {
            body_fat_pct = Some(computed);
        }
        record(test_id, engine.rate(test_id, computed, client.gender, client.age));
    }

    let body_composition = match (client.weight_kg, body_fat_pct) {
        (Some(weight), Some(pct)) => formulas::body_composition(weight, pct).ok(),
        _ => None,
    };

    info!(
        rated = results.len(),
        failed = failures.len(),
        unavailable = unavailable.len(),
        "assessment rated"
    );

    AssessmentOutcome {
        snapshot: AssessmentSnapshot::new(results, taken_at).with_fingerprint(norms.fingerprint()),
        failures,
        unavailable,
        body_composition,
    }
}

fn has_measurements(kind: FormulaKind, client: &ClientProfile) -> bool {
    match kind {
        FormulaKind::Bmi => client.height_cm.is_some() && client.weight_kg.is_some(),
        FormulaKind::WaistToHip => client.waist_cm.is_some() && client.hip_cm.is_some(),
        FormulaKind::BodyFat => {
            client.height_cm.is_some() && client.waist_cm.is_some() && client.neck_cm.is_some()
        }
    }
}

/// Raw value of a computed test; `Ok(None)` when it cannot be derived
fn compute(kind: FormulaKind, client: &ClientProfile) -> Result<Option<f64>, EngineError> {
    if !has_measurements(kind, client) {
        return Ok(None);
    }
    match (kind, client.height_cm, client.weight_kg, client.waist_cm, client.hip_cm, client.neck_cm) {
        (FormulaKind::Bmi, Some(height), Some(weight), ..) => formulas::bmi(weight, height).map(Some),
        (FormulaKind::WaistToHip, _, _, Some(waist), Some(hip), _) => {
            formulas::waist_to_hip_ratio(waist, hip).map(Some)
        }
        (FormulaKind::BodyFat, Some(height), _, Some(waist), hip, Some(neck)) => {
            formulas::body_fat_percent(client.gender, height, waist, neck, hip)
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tier;
    use chrono::TimeZone;

    fn client(gender: Gender, age: i32) -> ClientProfile {
        ClientProfile {
            name: "Alex".to_string(),
            age,
            gender,
            height_cm: None,
            weight_kg: None,
            waist_cm: None,
            hip_cm: None,
            neck_cm: None,
        }
    }

    fn run(input: &AssessmentInput) -> AssessmentOutcome {
        let repo = NormsRepository::builtin().unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        assess(&repo, input, &BodyFatAdjustment::default(), at)
    }

    fn tests(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_direct_entries_rated_in_id_order() {
        let input = AssessmentInput {
            client: client(Gender::Male, 25),
            tests: tests(&[("zipper", 1.0), ("pushup", 30.0), ("plank", 95.0)]),
        };
        let outcome = run(&input);
        let ids: Vec<_> = outcome.snapshot.results().iter().map(|r| r.test_id.as_str()).collect();
        assert_eq!(ids, vec!["plank", "pushup", "zipper"]);
        assert!(!outcome.has_failures());
        assert_eq!(outcome.snapshot.get("pushup").unwrap().tier, Tier::Good);
    }

    #[test]
    fn test_failures_do_not_abort_batch() {
        let input = AssessmentInput {
            client: client(Gender::Male, 25),
            tests: tests(&[("pushup", 30.0), ("squat", 40.0), ("plank", f64::NAN)]),
        };
        let outcome = run(&input);
        assert_eq!(outcome.snapshot.len(), 1);
        assert_eq!(outcome.failures.len(), 2);
        let squat = outcome.failures.iter().find(|f| f.test_id == "squat").unwrap();
        assert_eq!(squat.error.kind(), "not_found");
        let plank = outcome.failures.iter().find(|f| f.test_id == "plank").unwrap();
        assert!(matches!(plank.error, EngineError::OutOfDomain(_)));
    }

    #[test]
    fn test_computed_tests_appended_after_entries() {
        let mut c = client(Gender::Male, 40);
        c.height_cm = Some(178.0);
        c.weight_kg = Some(80.0);
        c.waist_cm = Some(85.0);
        c.hip_cm = Some(100.0);
        c.neck_cm = Some(38.0);
        let input = AssessmentInput {
            client: c,
            tests: tests(&[("pushup", 20.0)]),
        };
        let outcome = run(&input);
        let ids: Vec<_> = outcome.snapshot.results().iter().map(|r| r.test_id.as_str()).collect();
        assert_eq!(ids, vec!["pushup", "bmi", "waist_to_hip", "body_fat"]);

        let whr = outcome.snapshot.get("waist_to_hip").unwrap();
        assert!((whr.raw_value - 0.85).abs() < 1e-12);
        assert_eq!(whr.tier, Tier::Excellent);

        let comp = outcome.body_composition.unwrap();
        let fat = outcome.snapshot.get("body_fat").unwrap().raw_value;
        assert!((comp.fat_mass_kg - 80.0 * fat / 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_measurements_skip_silently() {
        let mut c = client(Gender::Female, 30);
        c.height_cm = Some(165.0);
        let input = AssessmentInput {
            client: c,
            tests: BTreeMap::new(),
        };
        let outcome = run(&input);
        assert!(outcome.snapshot.is_empty());
        assert!(outcome.unavailable.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_uncomputable_body_fat_is_unavailable() {
        let mut c = client(Gender::Male, 30);
        c.height_cm = Some(180.0);
        c.waist_cm = Some(36.0);
        c.neck_cm = Some(38.0);
        let input = AssessmentInput {
            client: c,
            tests: BTreeMap::new(),
        };
        let outcome = run(&input);
        assert_eq!(outcome.unavailable, vec!["body_fat"]);
        assert!(outcome.snapshot.get("body_fat").is_none());
        assert!(outcome.body_composition.is_none());
    }

    #[test]
    fn test_entered_value_wins_over_computed() {
        let mut c = client(Gender::Male, 30);
        c.height_cm = Some(175.0);
        c.weight_kg = Some(70.0);
        let input = AssessmentInput {
            client: c,
            tests: tests(&[("bmi", 29.0)]),
        };
        let outcome = run(&input);
        assert_eq!(outcome.snapshot.len(), 1);
        assert_eq!(outcome.snapshot.get("bmi").unwrap().raw_value, 29.0);
    }

    #[test]
    fn test_entered_body_fat_is_age_adjusted() {
        let input = AssessmentInput {
            client: client(Gender::Male, 50),
            tests: tests(&[("body_fat", 14.0)]),
        };
        let result = run(&input).snapshot.get("body_fat").cloned().unwrap();
        assert_eq!(result.cutoffs.excellent, 15.0);
        assert_eq!(result.tier, Tier::Excellent);
    }

    #[test]
    fn test_entered_body_fat_agrees_with_single_rating() {
        let repo = NormsRepository::builtin().unwrap();
        let adj = BodyFatAdjustment {
            baseline_age: 30,
            increment_per_decade: 1.5,
        };
        let input = AssessmentInput {
            client: client(Gender::Male, 50),
            tests: tests(&[("body_fat", 15.5)]),
        };
        let outcome = assess(&repo, &input, &adj, Utc::now());
        let single = RatingEngine::new(&repo)
            .with_body_fat_adjustment(adj)
            .rate("body_fat", 15.5, Gender::Male, 50)
            .unwrap();
        assert_eq!(outcome.snapshot.get("body_fat"), Some(&single));
        assert_eq!(single.tier, Tier::Excellent);
    }

    #[test]
    fn test_custom_body_fat_table_rated_against_itself() {
        let json = r#"{
            "test_name": "Caliper Body Fat", "unit": "%", "category": "body_comp",
            "inverted": true, "formula": "body_fat",
            "norms": { "male": { "18+": { "excellent": 10, "good": 14, "average": 20, "below_average": 25 } } }
        }"#;
        let repo = NormsRepository::builder()
            .with_builtin()
            .with_json("caliper_body_fat", json)
            .initialize()
            .unwrap();
        let input = AssessmentInput {
            client: client(Gender::Male, 50),
            tests: tests(&[("caliper_body_fat", 13.0)]),
        };
        let outcome = assess(&repo, &input, &BodyFatAdjustment::default(), Utc::now());
        let result = outcome.snapshot.get("caliper_body_fat").unwrap();
        assert_eq!(result.cutoffs.excellent, 12.0);
        assert_eq!(result.tier, Tier::Good);
    }

    #[test]
    fn test_underweight_bmi_computed_as_poor() {
        let mut c = client(Gender::Female, 30);
        c.height_cm = Some(175.0);
        c.weight_kg = Some(45.0);
        let input = AssessmentInput {
            client: c,
            tests: BTreeMap::new(),
        };
        let outcome = run(&input);
        assert_eq!(outcome.snapshot.get("bmi").unwrap().tier, Tier::Poor);
    }

    #[test]
    fn test_bad_measurement_recorded_as_failure() {
        let mut c = client(Gender::Male, 30);
        c.height_cm = Some(0.0);
        c.weight_kg = Some(70.0);
        let input = AssessmentInput {
            client: c,
            tests: BTreeMap::new(),
        };
        let outcome = run(&input);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].test_id, "bmi");
        assert_eq!(outcome.failures[0].error.kind(), "invalid_input");
    }

    #[test]
    fn test_snapshot_carries_fingerprint() {
        let repo = NormsRepository::builtin().unwrap();
        let input = AssessmentInput {
            client: client(Gender::Male, 25),
            tests: tests(&[("pushup", 30.0)]),
        };
        let outcome = assess(&repo, &input, &BodyFatAdjustment::default(), Utc::now());
        assert_eq!(outcome.snapshot.norms_fingerprint(), repo.fingerprint());
    }

    #[test]
    fn test_input_parses_from_json() {
        let json = r#"{
            "client": { "name": "Sam", "age": 34, "gender": "female", "height_cm": 165 },
            "tests": { "pushup": 18, "sit_and_reach": 31.5 }
        }"#;
        let input: AssessmentInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.client.gender, Gender::Female);
        assert_eq!(input.client.height_cm, Some(165.0));
        assert_eq!(input.tests.len(), 2);
    }

    #[test]
    fn test_failure_serializes_kind_and_message() {
        let failure = TestFailure {
            test_id: "squat".to_string(),
            error: EngineError::NotFound {
                test_id: "squat".to_string(),
            },
        };
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["kind"], "not_found");
        assert!(value["message"].as_str().unwrap().contains("squat"));
    }
}
