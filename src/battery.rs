//! Test battery definitions
//!
//! Every test is either entered directly by the coach or derived from body
//! measurements by one of the formula calculators. The split is a closed enum
//! so dispatch in the assessment driver is checked by `match`.

use crate::Category;
use serde::{Deserialize, Serialize};

/// Formula used to derive a computed test's raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaKind {
    Bmi,
    WaistToHip,
    BodyFat,
}

impl FormulaKind {
    /// All formulas, in the order computed results are appended to a snapshot
    pub const ALL: [FormulaKind; 3] = [FormulaKind::Bmi, FormulaKind::WaistToHip, FormulaKind::BodyFat];

    /// Test id of the norms table that rates this formula's output
    pub fn test_id(self) -> &'static str {
        match self {
            FormulaKind::Bmi => "bmi",
            FormulaKind::WaistToHip => "waist_to_hip",
            FormulaKind::BodyFat => "body_fat",
        }
    }
}

/// How a test's raw value is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "formula")]
pub enum TestKind {
    DirectEntry,
    FormulaDerived(FormulaKind),
}

/// Metadata for a single test in the battery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDefinition {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub category: Category,
    /// Lower raw value is better
    pub inverted: bool,
    pub kind: TestKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl TestDefinition {
    pub fn is_computed(&self) -> bool {
        matches!(self.kind, TestKind::FormulaDerived(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_test_ids_are_distinct() {
        let ids: std::collections::HashSet<_> =
            FormulaKind::ALL.iter().map(|k| k.test_id()).collect();
        assert_eq!(ids.len(), FormulaKind::ALL.len());
    }

    #[test]
    fn test_kind_serialization() {
        let direct = serde_json::to_value(TestKind::DirectEntry).unwrap();
        assert_eq!(direct["type"], "direct_entry");

        let bmi = serde_json::to_value(TestKind::FormulaDerived(FormulaKind::Bmi)).unwrap();
        assert_eq!(bmi["type"], "formula_derived");
        assert_eq!(bmi["formula"], "bmi");
    }

    #[test]
    fn test_is_computed() {
        let mut def = TestDefinition {
            id: "pushup".to_string(),
            name: "Push-up Test".to_string(),
            unit: "reps".to_string(),
            category: Category::Strength,
            inverted: false,
            kind: TestKind::DirectEntry,
            description: String::new(),
        };
        assert!(!def.is_computed());
        def.kind = TestKind::FormulaDerived(FormulaKind::WaistToHip);
        assert!(def.is_computed());
    }
}
