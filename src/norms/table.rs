//! Validated threshold tables

use super::bracket::AgeBracket;
use super::schema::{NormsRecord, TierCutoffs};
use crate::battery::{TestDefinition, TestKind};
use crate::{EngineError, Gender};
use serde::Serialize;
use std::collections::BTreeMap;

/// One age bracket's cutoffs for one gender
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BracketEntry {
    /// Key as written in the source data
    pub key: String,
    pub bracket: AgeBracket,
    pub cutoffs: TierCutoffs,
}

/// Threshold table for a single test, validated at load time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdTable {
    pub definition: TestDefinition,
    /// Entries per gender, sorted by lower age bound; the last one is open-ended
    genders: BTreeMap<Gender, Vec<BracketEntry>>,
}

impl ThresholdTable {
    /// Validate a raw record into a table.
    ///
    /// Rejects empty gender maps, unparseable bracket keys, overlapping or
    /// gapped brackets and cutoffs that are not strictly monotonic in the
    /// direction implied by the inversion flag.
    pub fn from_record(test_id: &str, record: NormsRecord) -> Result<Self, EngineError> {
        if record.norms.is_empty() {
            return Err(EngineError::malformed(test_id, "no gender entries"));
        }

        let mut genders = BTreeMap::new();
        for (gender, brackets) in record.norms {
            let entries = Self::validate_brackets(test_id, gender, brackets, record.inverted)?;
            genders.insert(gender, entries);
        }

        let kind = match record.formula {
            Some(formula) => TestKind::FormulaDerived(formula),
            None => TestKind::DirectEntry,
        };

        Ok(Self {
            definition: TestDefinition {
                id: test_id.to_string(),
                name: record.test_name,
                unit: record.unit,
                category: record.category,
                inverted: record.inverted,
                kind,
                description: record.description,
            },
            genders,
        })
    }

    fn validate_brackets(
        test_id: &str,
        gender: Gender,
        brackets: BTreeMap<String, TierCutoffs>,
        inverted: bool,
    ) -> Result<Vec<BracketEntry>, EngineError> {
        if brackets.is_empty() {
            return Err(EngineError::malformed(
                test_id,
                format!("no age brackets for {}", gender),
            ));
        }

        let mut entries = Vec::with_capacity(brackets.len());
        for (key, cutoffs) in brackets {
            let bracket = AgeBracket::parse(&key).ok_or_else(|| {
                EngineError::malformed(test_id, format!("invalid age bracket '{}'", key))
            })?;
            cutoffs.validate(inverted).map_err(|reason| {
                EngineError::malformed(test_id, format!("{} {}: {}", gender, key, reason))
            })?;
            entries.push(BracketEntry {
                key,
                bracket,
                cutoffs,
            });
        }
        entries.sort_by_key(|e| e.bracket.lower);

        for pair in entries.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            match current.bracket.upper {
                None => {
                    return Err(EngineError::malformed(
                        test_id,
                        format!(
                            "{}: open-ended bracket '{}' must be the last one",
                            gender, current.key
                        ),
                    ))
                }
                Some(upper) if upper > next.bracket.lower => {
                    return Err(EngineError::malformed(
                        test_id,
                        format!(
                            "{}: brackets '{}' and '{}' overlap",
                            gender, current.key, next.key
                        ),
                    ))
                }
                Some(upper) if upper < next.bracket.lower => {
                    return Err(EngineError::malformed(
                        test_id,
                        format!(
                            "{}: gap between brackets '{}' and '{}'",
                            gender, current.key, next.key
                        ),
                    ))
                }
                Some(_) => {}
            }
        }

        // Terminal bracket catches every age above it
        if let Some(last) = entries.last_mut() {
            last.bracket = last.bracket.open_ended();
        }

        Ok(entries)
    }

    pub fn test_id(&self) -> &str {
        &self.definition.id
    }

    pub fn inverted(&self) -> bool {
        self.definition.inverted
    }

    pub fn genders(&self) -> impl Iterator<Item = Gender> + '_ {
        self.genders.keys().copied()
    }

    /// Bracket entries for a gender, youngest first
    pub fn brackets(&self, gender: Gender) -> Option<&[BracketEntry]> {
        self.genders.get(&gender).map(Vec::as_slice)
    }

    /// Resolve the demographic key to a bracket entry.
    ///
    /// Ages below the first bracket fold into it; ages beyond the last
    /// resolve to the terminal open-ended bracket.
    pub fn entry_for(&self, gender: Gender, age: u32) -> Result<&BracketEntry, EngineError> {
        let entries = self
            .genders
            .get(&gender)
            .ok_or_else(|| EngineError::UnsupportedDemographic {
                test_id: self.definition.id.clone(),
                gender,
            })?;

        let entry = entries
            .iter()
            .rev()
            .find(|e| e.bracket.lower <= age)
            .or_else(|| entries.first());

        entry.ok_or_else(|| {
            EngineError::malformed(&self.definition.id, format!("no age brackets for {}", gender))
        })
    }
}
