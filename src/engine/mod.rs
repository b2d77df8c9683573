//! Rule enforcement engine seam.
//!
//! The engine owns the durable copy of the active rules and enforces them.
//! An `update` call removes the listed ids and then adds the given rules; the
//! call either succeeds as a whole or leaves the active rules untouched.

mod file;
mod memory;

pub use file::FileEngine;
pub use memory::MemoryEngine;

use ahash::AHashSet;

use crate::error::EngineError;
use crate::rule::{Rule, RuleId};

/// RuleEngine is the interface to the rule enforcement subsystem.
pub trait RuleEngine: Send + Sync {
    /// List the active rules.
    fn active_rules(&self) -> Result<Vec<Rule>, EngineError>;

    /// Remove rules by id, then add rules.
    fn update(&self, add: &[Rule], remove: &[RuleId]) -> Result<(), EngineError>;
}

impl<E: RuleEngine + ?Sized> RuleEngine for std::sync::Arc<E> {
    fn active_rules(&self) -> Result<Vec<Rule>, EngineError> {
        (**self).active_rules()
    }

    fn update(&self, add: &[Rule], remove: &[RuleId]) -> Result<(), EngineError> {
        (**self).update(add, remove)
    }
}

/// Apply one update to `active`, validating before anything changes.
///
/// Unknown ids in `remove` are ignored. Added ids must be unique among
/// themselves and among the rules left after removal.
pub(crate) fn apply_update(
    active: &mut Vec<Rule>,
    add: &[Rule],
    remove: &[RuleId],
    limit: Option<usize>,
) -> Result<(), EngineError> {
    if let Some(limit) = limit {
        let requested = add.len().max(remove.len());
        if requested > limit {
            return Err(EngineError::LimitExceeded { limit, requested });
        }
    }

    let removed: AHashSet<RuleId> = remove.iter().copied().collect();
    let mut ids: AHashSet<RuleId> = active
        .iter()
        .map(|rule| rule.id)
        .filter(|id| !removed.contains(id))
        .collect();
    for rule in add {
        if !ids.insert(rule.id) {
            return Err(EngineError::DuplicateId(rule.id));
        }
    }

    active.retain(|rule| !removed.contains(&rule.id));
    active.extend_from_slice(add);
    Ok(())
}
