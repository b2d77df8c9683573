//! Rule synchronization: compute the rule set, then clear and reinstall.

use crate::engine::RuleEngine;
use crate::error::{Error, Result};
use crate::rule::RuleId;
use crate::{RuleSet, SyncConfig};

/// Maximum number of rules sent in one install call.
pub const BATCH_SIZE: usize = 50;

/// Outcome of one successful apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Rules removed by the clear step
    pub removed: usize,
    /// Rules installed
    pub installed: usize,
    /// Install calls issued
    pub batches: usize,
}

/// RuleSynchronizer replaces whatever rules the engine holds with a new set.
///
/// `apply` takes `&mut self`: a synchronizer owns its engine handle and only
/// one apply can run at a time through it.
pub struct RuleSynchronizer<E> {
    engine: E,
    batch_size: usize,
}

impl<E: RuleEngine> RuleSynchronizer<E> {
    /// Create a synchronizer with the default batch size.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            batch_size: BATCH_SIZE,
        }
    }

    /// Set the number of rules per install call (at least 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Get the batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Get the engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Compute the rule set for a configuration.
    pub fn compute(config: &SyncConfig) -> RuleSet {
        config.rule_set()
    }

    /// Compute and apply the rule set for a configuration.
    pub fn sync(&mut self, config: &SyncConfig) -> Result<SyncReport> {
        self.apply(&Self::compute(config))
    }

    /// Make `rules` the engine's complete active rule set.
    ///
    /// All active rules are removed first. If that fails nothing is
    /// installed. The new rules then go in sequential batches; a failed batch
    /// leaves earlier batches installed and is reported so the caller can
    /// retry the whole apply.
    pub fn apply(&mut self, rules: &RuleSet) -> Result<SyncReport> {
        let removed = self.clear()?;

        let mut report = SyncReport {
            removed,
            ..SyncReport::default()
        };
        if rules.is_empty() {
            log::info!("Cleared {} redirect rules", removed);
            return Ok(report);
        }

        let batches = rules.len().div_ceil(self.batch_size);
        for (index, batch) in rules.batches(self.batch_size).enumerate() {
            self.engine
                .update(batch, &[])
                .map_err(|source| {
                    let first_rule_id = batch.first().map(|rule| rule.id).unwrap_or_default();
                    log::error!(
                        "Install of batch {}/{} (first rule id {}) failed: {}",
                        index + 1,
                        batches,
                        first_rule_id,
                        source
                    );
                    Error::EnforcementInstall {
                        batch: index + 1,
                        batches,
                        first_rule_id,
                        source,
                    }
                })?;
            report.installed += batch.len();
            report.batches += 1;
        }

        log::info!(
            "Created {} redirect rules for {} websites in {} batches",
            report.installed,
            rules.domain_count(),
            report.batches
        );
        Ok(report)
    }

    /// Remove every active rule, returning how many were removed.
    ///
    /// Removals go out in chunks of the batch size, since engines count
    /// removed ids against the same per-call ceiling as added rules.
    fn clear(&mut self) -> Result<usize> {
        let active = self
            .engine
            .active_rules()
            .map_err(|source| Error::EnforcementClear { rules: 0, source })?;

        let ids: Vec<RuleId> = active.iter().map(|rule| rule.id).collect();
        if ids.is_empty() {
            return Ok(0);
        }

        log::debug!("Removing {} active rules", ids.len());
        for chunk in ids.chunks(self.batch_size) {
            self.engine
                .update(&[], chunk)
                .map_err(|source| Error::EnforcementClear {
                    rules: ids.len(),
                    source,
                })?;
        }
        Ok(ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;
    use crate::error::EngineError;
    use crate::rule::Rule;
    use crate::{Domain, RedirectTarget};
    use parking_lot::Mutex;

    fn config(names: &[&str], enabled: bool) -> SyncConfig {
        SyncConfig::new(
            names.iter().map(|n| Domain::parse(n).unwrap()).collect(),
            RedirectTarget::parse("https://safe.test").unwrap(),
            enabled,
        )
    }

    fn many(count: usize) -> SyncConfig {
        let names: Vec<String> = (0..count).map(|i| format!("site{i}.com")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        config(&refs, true)
    }

    /// Records every update call and can fail on a chosen call.
    #[derive(Default)]
    struct RecordingEngine {
        inner: MemoryEngine,
        calls: Mutex<Vec<(Vec<RuleId>, Vec<RuleId>)>>,
        fail_on_call: Option<usize>,
        fail_list: bool,
    }

    impl RuleEngine for RecordingEngine {
        fn active_rules(&self) -> std::result::Result<Vec<Rule>, EngineError> {
            if self.fail_list {
                return Err(EngineError::Unavailable("offline".to_string()));
            }
            self.inner.active_rules()
        }

        fn update(&self, add: &[Rule], remove: &[RuleId]) -> std::result::Result<(), EngineError> {
            let mut calls = self.calls.lock();
            calls.push((add.iter().map(|r| r.id).collect(), remove.to_vec()));
            if self.fail_on_call == Some(calls.len()) {
                return Err(EngineError::Unavailable("rejected".to_string()));
            }
            self.inner.update(add, remove)
        }
    }

    #[test]
    fn test_apply_installs_in_batches() {
        let mut sync = RuleSynchronizer::new(RecordingEngine::default());
        let rules = RuleSynchronizer::<RecordingEngine>::compute(&many(30));

        let report = sync.apply(&rules).unwrap();
        assert_eq!(report, SyncReport { removed: 0, installed: 120, batches: 3 });

        let calls = sync.engine().calls.lock();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(add, remove)| add.len() <= BATCH_SIZE && remove.is_empty()));
        let installed: Vec<RuleId> = calls.iter().flat_map(|(add, _)| add.clone()).collect();
        assert_eq!(installed, rules.ids());
    }

    #[test]
    fn test_apply_clears_before_install() {
        let mut sync = RuleSynchronizer::new(RecordingEngine::default());
        sync.sync(&config(&["a.com", "b.com"], true)).unwrap();

        let report = sync.sync(&config(&["c.com"], true)).unwrap();
        assert_eq!(report.removed, 8);
        assert_eq!(report.installed, 4);

        let calls = sync.engine().calls.lock();
        // Pure removal, then pure addition
        assert!(calls[1].0.is_empty());
        assert_eq!(calls[1].1.len(), 8);
        assert_eq!(calls[2].0, vec![10, 11, 12, 13]);
        assert!(calls[2].1.is_empty());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut sync = RuleSynchronizer::new(MemoryEngine::new());
        let rules = RuleSynchronizer::<MemoryEngine>::compute(&config(&["a.com", "b.com"], true));

        sync.apply(&rules).unwrap();
        sync.apply(&rules).unwrap();

        assert_eq!(sync.engine().active_rules().unwrap(), rules.rules());
    }

    #[test]
    fn test_disabled_clears() {
        let mut sync = RuleSynchronizer::new(MemoryEngine::new());
        sync.sync(&config(&["a.com", "b.com"], true)).unwrap();

        let report = sync.sync(&config(&["a.com", "b.com"], false)).unwrap();
        assert_eq!(report, SyncReport { removed: 8, installed: 0, batches: 0 });
        assert!(sync.engine().active_ids().is_empty());
    }

    #[test]
    fn test_clear_failure_installs_nothing() {
        let engine = RecordingEngine {
            fail_list: true,
            ..RecordingEngine::default()
        };
        let mut sync = RuleSynchronizer::new(engine);

        let err = sync.sync(&config(&["a.com"], true)).unwrap_err();
        assert!(matches!(err, Error::EnforcementClear { .. }));
        assert!(sync.engine().calls.lock().is_empty());
    }

    #[test]
    fn test_remove_failure_installs_nothing() {
        let mut sync = RuleSynchronizer::new(RecordingEngine::default());
        sync.sync(&config(&["a.com"], true)).unwrap();
        sync.engine.fail_on_call = Some(2);

        let err = sync.sync(&config(&["b.com"], true)).unwrap_err();
        assert_eq!(
            err,
            Error::EnforcementClear {
                rules: 4,
                source: EngineError::Unavailable("rejected".to_string()),
            }
        );
        assert_eq!(sync.engine().calls.lock().len(), 2);
        assert_eq!(sync.engine().inner.active_ids(), vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_install_failure_keeps_earlier_batches() {
        let engine = RecordingEngine {
            fail_on_call: Some(2),
            ..RecordingEngine::default()
        };
        let mut sync = RuleSynchronizer::new(engine);

        let err = sync.sync(&many(30)).unwrap_err();
        match err {
            Error::EnforcementInstall {
                batch,
                batches,
                first_rule_id,
                ..
            } => {
                assert_eq!(batch, 2);
                assert_eq!(batches, 3);
                // Rule index 50 is the third rule of domain index 12
                assert_eq!(first_rule_id, 132);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sync.engine().inner.active_ids().len(), 50);
    }

    #[test]
    fn test_clear_above_batch_size_under_engine_limit() {
        // 13 domains yield 52 rules, more than one call may carry
        let mut sync = RuleSynchronizer::new(MemoryEngine::new().with_limit(BATCH_SIZE));
        let rules = RuleSynchronizer::<MemoryEngine>::compute(&many(13));

        sync.apply(&rules).unwrap();
        let report = sync.apply(&rules).unwrap();
        assert_eq!(report, SyncReport { removed: 52, installed: 52, batches: 2 });

        let report = sync.apply(&RuleSet::empty()).unwrap();
        assert_eq!(report, SyncReport { removed: 52, installed: 0, batches: 0 });
        assert!(sync.engine().active_ids().is_empty());
    }

    #[test]
    fn test_clear_removes_in_batches() {
        let mut sync = RuleSynchronizer::new(RecordingEngine::default());
        sync.sync(&many(30)).unwrap();
        sync.sync(&config(&[], true)).unwrap();

        let calls = sync.engine().calls.lock();
        let removals: Vec<usize> = calls[3..].iter().map(|(_, remove)| remove.len()).collect();
        assert_eq!(removals, vec![50, 50, 20]);
        assert!(sync.engine().inner.active_ids().is_empty());
    }

    #[test]
    fn test_batch_size_respects_engine_limit() {
        let mut sync = RuleSynchronizer::new(MemoryEngine::new().with_limit(10)).with_batch_size(10);
        let report = sync.sync(&many(5)).unwrap();
        assert_eq!(report.batches, 2);
        assert_eq!(sync.engine().active_ids().len(), 20);
    }

    #[test]
    fn test_oversized_batch_rejected_by_limit() {
        let mut sync = RuleSynchronizer::new(MemoryEngine::new().with_limit(10));
        let err = sync.sync(&many(5)).unwrap_err();
        assert!(matches!(
            err,
            Error::EnforcementInstall {
                source: EngineError::LimitExceeded { limit: 10, requested: 20 },
                ..
            }
        ));
    }
}
