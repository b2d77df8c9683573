//! JSON file rule engine.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use super::{apply_update, RuleEngine};
use crate::error::EngineError;
use crate::persist::{read_optional, write_atomic};
use crate::rule::{Rule, RuleId};

/// FileEngine keeps the active rules as a JSON array on disk.
///
/// The file is in the declarative rule format, so it can be handed to an
/// enforcement process as-is. Each update replaces the file atomically.
pub struct FileEngine {
    path: PathBuf,
    limit: Option<usize>,
    lock: Mutex<()>,
}

impl FileEngine {
    /// Create an engine backed by `path`. A missing file means no active rules.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            limit: None,
            lock: Mutex::new(()),
        }
    }

    /// Reject update calls carrying more than `limit` rules or ids.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Get the rules file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<Rule>, EngineError> {
        match read_optional(&self.path)? {
            None => Ok(Vec::new()),
            Some(data) if data.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Some(data) => serde_json::from_slice(&data).map_err(|e| {
                EngineError::Unavailable(format!("{}: {}", self.path.display(), e))
            }),
        }
    }
}

impl RuleEngine for FileEngine {
    fn active_rules(&self) -> Result<Vec<Rule>, EngineError> {
        let _guard = self.lock.lock();
        self.load()
    }

    fn update(&self, add: &[Rule], remove: &[RuleId]) -> Result<(), EngineError> {
        let _guard = self.lock.lock();
        let mut rules = self.load()?;
        apply_update(&mut rules, add, remove, self.limit)?;

        let data = serde_json::to_vec_pretty(&rules)
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        write_atomic(&self.path, &data)?;
        Ok(())
    }
}
