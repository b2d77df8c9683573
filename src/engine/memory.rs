//! In-memory rule engine.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{apply_update, RuleEngine};
use crate::error::EngineError;
use crate::rule::{Rule, RuleId};

/// MemoryEngine holds the active rules in install order.
///
/// An optional per-call ceiling mimics the limit real engines put on the
/// number of rules in one update.
#[derive(Default)]
pub struct MemoryEngine {
    rules: RwLock<Vec<Rule>>,
    limit: Option<usize>,
    updates: AtomicUsize,
}

impl MemoryEngine {
    /// Create an engine with no active rules and no per-call limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject update calls carrying more than `limit` rules or ids.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Get the number of successful update calls.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::Relaxed)
    }

    /// Get the ids of the active rules in install order.
    pub fn active_ids(&self) -> Vec<RuleId> {
        self.rules.read().iter().map(|rule| rule.id).collect()
    }
}

impl RuleEngine for MemoryEngine {
    fn active_rules(&self) -> Result<Vec<Rule>, EngineError> {
        Ok(self.rules.read().clone())
    }

    fn update(&self, add: &[Rule], remove: &[RuleId]) -> Result<(), EngineError> {
        apply_update(&mut self.rules.write(), add, remove, self.limit)?;
        self.updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RedirectTarget;

    #[test]
    fn test_update_and_list() {
        let engine = MemoryEngine::new();
        let target = RedirectTarget::default();
        let rules = vec![
            Rule::redirect(10, "*://a.com", &target),
            Rule::redirect(11, "*://www.a.com", &target),
        ];

        engine.update(&rules, &[]).unwrap();
        assert_eq!(engine.active_rules().unwrap(), rules);

        engine.update(&[], &[10, 11]).unwrap();
        assert!(engine.active_ids().is_empty());
        assert_eq!(engine.update_count(), 2);
    }

    #[test]
    fn test_limit_rejects_large_calls() {
        let engine = MemoryEngine::new().with_limit(1);
        let target = RedirectTarget::default();
        let rules = vec![
            Rule::redirect(10, "*://a.com", &target),
            Rule::redirect(11, "*://www.a.com", &target),
        ];

        assert!(engine.update(&rules, &[]).is_err());
        assert_eq!(engine.update_count(), 0);
    }
}
