//! Normative data loading and the read-only table cache
//!
//! Tables are collected by a [`NormsBuilder`] and validated in one
//! [`NormsBuilder::initialize`] call. The resulting [`NormsRepository`] has no
//! mutating methods, so it can be shared across threads without locking.

mod bracket;
mod schema;
mod table;

pub use bracket::AgeBracket;
pub use schema::{NormsRecord, TierCutoffs};
pub use table::{BracketEntry, ThresholdTable};

use crate::battery::TestDefinition;
use crate::EngineError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Extension of norms files inside a norms directory
pub const NORMS_EXTENSION: &str = "json";

/// Tables shipped with the crate
const BUILTIN_NORMS: &[(&str, &str)] = &[
    ("pushup", include_str!("../../data/norms/pushup.json")),
    ("wall_sit", include_str!("../../data/norms/wall_sit.json")),
    ("plank", include_str!("../../data/norms/plank.json")),
    ("sit_and_reach", include_str!("../../data/norms/sit_and_reach.json")),
    ("zipper", include_str!("../../data/norms/zipper.json")),
    ("step_test", include_str!("../../data/norms/step_test.json")),
    ("bmi", include_str!("../../data/norms/bmi.json")),
    ("waist_to_hip", include_str!("../../data/norms/waist_to_hip.json")),
    ("body_fat", include_str!("../../data/norms/body_fat.json")),
];

enum Source {
    Builtin,
    Directory(PathBuf),
    Json { test_id: String, content: String },
    Record { test_id: String, record: NormsRecord },
}

/// Collects norms sources. Later sources replace earlier tables with the same id.
#[derive(Default)]
pub struct NormsBuilder {
    sources: Vec<Source>,
}

impl NormsBuilder {
    /// Add the tables embedded in the crate
    pub fn with_builtin(mut self) -> Self {
        self.sources.push(Source::Builtin);
        self
    }

    /// Add every `<test_id>.json` directly inside `dir`
    pub fn with_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sources.push(Source::Directory(dir.into()));
        self
    }

    /// Add a table from JSON text
    pub fn with_json(mut self, test_id: impl Into<String>, content: impl Into<String>) -> Self {
        self.sources.push(Source::Json {
            test_id: test_id.into(),
            content: content.into(),
        });
        self
    }

    /// Add an already-deserialized record
    pub fn with_record(mut self, test_id: impl Into<String>, record: NormsRecord) -> Self {
        self.sources.push(Source::Record {
            test_id: test_id.into(),
            record,
        });
        self
    }

    /// Load and validate every source. Consumes the builder: a repository is
    /// initialized exactly once and never reloaded.
    pub fn initialize(self) -> Result<NormsRepository, EngineError> {
        let mut repo = NormsRepository::default();

        for source in self.sources {
            match source {
                Source::Builtin => {
                    for (test_id, content) in BUILTIN_NORMS {
                        repo.insert(parse_table(test_id, content)?);
                    }
                }
                Source::Directory(dir) => {
                    for (test_id, path) in collect_norms_files(&dir)? {
                        let content = fs::read_to_string(&path).map_err(|e| {
                            EngineError::malformed(
                                &test_id,
                                format!("cannot read {}: {}", path.display(), e),
                            )
                        })?;
                        repo.insert(parse_table(&test_id, &content)?);
                    }
                }
                Source::Json { test_id, content } => {
                    repo.insert(parse_table(&test_id, &content)?);
                }
                Source::Record { test_id, record } => {
                    repo.insert(ThresholdTable::from_record(&test_id, record)?);
                }
            }
        }

        repo.fingerprint = repo.compute_fingerprint();
        let short = &repo.fingerprint[..12.min(repo.fingerprint.len())];
        info!(tables = repo.tables.len(), fingerprint = short, "norms repository initialized");
        Ok(repo)
    }
}

fn parse_table(test_id: &str, content: &str) -> Result<ThresholdTable, EngineError> {
    let record: NormsRecord = serde_json::from_str(content)
        .map_err(|e| EngineError::malformed(test_id, format!("invalid JSON: {}", e)))?;
    let table = ThresholdTable::from_record(test_id, record)?;
    debug!(test_id, inverted = table.inverted(), "loaded threshold table");
    Ok(table)
}

/// `<test_id>.json` files directly inside `dir`, sorted by file name
fn collect_norms_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, EngineError> {
    if !dir.is_dir() {
        return Err(EngineError::malformed(
            &dir.display().to_string(),
            "norms directory does not exist",
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let location = e
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| dir.display().to_string());
            EngineError::malformed(&location, format!("unreadable directory entry: {}", e))
        })?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(NORMS_EXTENSION)
        {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_string(), path.to_path_buf()));
        }
    }
    Ok(files)
}

/// Immutable, process-lifetime cache of validated threshold tables
#[derive(Debug, Default)]
pub struct NormsRepository {
    tables: Vec<ThresholdTable>,
    index: HashMap<String, usize>,
    fingerprint: String,
}

impl NormsRepository {
    pub fn builder() -> NormsBuilder {
        NormsBuilder::default()
    }

    /// Repository holding only the tables shipped with the crate
    pub fn builtin() -> Result<Self, EngineError> {
        Self::builder().with_builtin().initialize()
    }

    fn insert(&mut self, table: ThresholdTable) {
        match self.index.get(table.test_id()) {
            Some(&slot) => self.tables[slot] = table,
            None => {
                self.index.insert(table.test_id().to_string(), self.tables.len());
                self.tables.push(table);
            }
        }
    }

    /// Table for a test id. Same answer on every call.
    pub fn load_table(&self, test_id: &str) -> Result<&ThresholdTable, EngineError> {
        self.index
            .get(test_id)
            .map(|&slot| &self.tables[slot])
            .ok_or_else(|| EngineError::NotFound {
                test_id: test_id.to_string(),
            })
    }

    pub fn contains(&self, test_id: &str) -> bool {
        self.index.contains_key(test_id)
    }

    /// Definitions of every loaded test, in load order
    pub fn definitions(&self) -> impl Iterator<Item = &TestDefinition> {
        self.tables.iter().map(|t| &t.definition)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// SHA-256 over the normalized tables, recorded on every snapshot
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn compute_fingerprint(&self) -> String {
        let mut sorted: Vec<&ThresholdTable> = self.tables.iter().collect();
        sorted.sort_by(|a, b| a.test_id().cmp(b.test_id()));

        let mut hasher = Sha256::new();
        for table in sorted {
            let canonical = serde_json::to_string(table).unwrap_or_default();
            hasher.update(canonical.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

static INSTALLED: OnceLock<NormsRepository> = OnceLock::new();

/// Make `repo` the process-wide repository.
///
/// Only the first call succeeds; later calls hand their repository back
/// untouched so a running process can never swap tables under its readers.
pub fn install(repo: NormsRepository) -> Result<&'static NormsRepository, NormsRepository> {
    let mut candidate = Some(repo);
    let installed = INSTALLED.get_or_init(|| candidate.take().unwrap_or_default());
    match candidate {
        None => Ok(installed),
        Some(rejected) => Err(rejected),
    }
}

/// The process-wide repository, if [`install`] has been called
pub fn installed() -> Option<&'static NormsRepository> {
    INSTALLED.get()
}
