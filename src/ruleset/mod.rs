//! RuleSet computation and batching.

mod config;

pub use config::{
    SyncConfig, KEY_BLOCKED_WEBSITES, KEY_ENABLED, KEY_REDIRECT_URL, WATCHED_KEYS,
};

use std::slice::{Chunks, Iter};

use crate::rule::{Rule, RuleId, UrlPattern};
use crate::{Domain, RedirectTarget};

/// Width of the id block reserved for each domain.
///
/// Four ids of each block are used; the rest is headroom.
pub const ID_BLOCK: RuleId = 10;

/// Largest number of domains whose id blocks all fit in a [`RuleId`].
///
/// [`RuleSet::compute`] ignores domains past this position.
pub const MAX_DOMAINS: usize = ((RuleId::MAX - (ID_BLOCK - 1)) / ID_BLOCK) as usize;

/// RuleSet is the complete collection of rules that should be active.
///
/// It is never persisted: every synchronization pass recomputes it from
/// scratch, so rule ids are only meaningful within one pass. Reordering or
/// removing a domain shifts the ids of every domain after it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    domain_count: usize,
}

impl RuleSet {
    /// Create an empty rule set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compute the rule set for a configuration.
    ///
    /// Returns an empty set when disabled or when there are no domains.
    /// Otherwise each domain at index `i` gets four rules with ids
    /// `(i + 1) * 10 + offset`, one per [`UrlPattern`], in input order.
    /// Duplicate domains are not collapsed. Domains past [`MAX_DOMAINS`] are
    /// dropped with a warning.
    ///
    /// # Examples
    /// ```
    /// use redirector::{Domain, RedirectTarget, RuleSet};
    ///
    /// let domains = vec![Domain::parse("example.com").unwrap()];
    /// let target = RedirectTarget::parse("https://safe.test").unwrap();
    ///
    /// let rules = RuleSet::compute(&domains, &target, true);
    /// assert_eq!(rules.ids(), vec![10, 11, 12, 13]);
    /// assert!(RuleSet::compute(&domains, &target, false).is_empty());
    /// ```
    pub fn compute(domains: &[Domain], target: &RedirectTarget, enabled: bool) -> Self {
        if !enabled || domains.is_empty() {
            return Self::empty();
        }

        let domains = if domains.len() > MAX_DOMAINS {
            log::warn!(
                "Ignoring {} domains past the rule id space",
                domains.len() - MAX_DOMAINS
            );
            &domains[..MAX_DOMAINS]
        } else {
            domains
        };

        let mut rules = Vec::with_capacity(domains.len() * UrlPattern::ALL.len());
        for (index, domain) in domains.iter().enumerate() {
            let Some(base_id) = Self::base_id(index) else {
                break;
            };
            for pattern in UrlPattern::ALL {
                rules.push(Rule::redirect(
                    base_id + pattern.offset(),
                    pattern.render(domain),
                    target,
                ));
            }
        }

        Self {
            rules,
            domain_count: domains.len(),
        }
    }

    /// Base id for the domain at a zero-based position, or `None` at or past
    /// [`MAX_DOMAINS`].
    pub fn base_id(index: usize) -> Option<RuleId> {
        if index >= MAX_DOMAINS {
            return None;
        }
        RuleId::try_from(index)
            .ok()?
            .checked_add(1)?
            .checked_mul(ID_BLOCK)
    }

    /// Get the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the set has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Get the number of domains the set was computed from.
    pub fn domain_count(&self) -> usize {
        self.domain_count
    }

    /// Get the rules in order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Get the rule ids in order.
    pub fn ids(&self) -> Vec<RuleId> {
        self.rules.iter().map(|rule| rule.id).collect()
    }

    /// Iterate over the rules in order.
    pub fn iter(&self) -> Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Split into order-preserving batches of at most `size` rules.
    pub fn batches(&self, size: usize) -> Chunks<'_, Rule> {
        self.rules.chunks(size.max(1))
    }

    /// Consume the set and return its rules.
    pub fn into_rules(self) -> Vec<Rule> {
        self.rules
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for RuleSet {
    type Item = Rule;
    type IntoIter = std::vec::IntoIter<Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;

    fn domains(names: &[&str]) -> Vec<Domain> {
        names.iter().map(|n| Domain::parse(n).unwrap()).collect()
    }

    fn target() -> RedirectTarget {
        RedirectTarget::parse("https://safe.test").unwrap()
    }

    #[test]
    fn test_disabled_is_empty() {
        let rules = RuleSet::compute(&domains(&["a.com", "b.com"]), &target(), false);
        assert!(rules.is_empty());
        assert_eq!(rules.domain_count(), 0);
    }

    #[test]
    fn test_no_domains_is_empty() {
        assert!(RuleSet::compute(&[], &target(), true).is_empty());
    }

    #[test]
    fn test_single_domain() {
        let rules = RuleSet::compute(&domains(&["example.com"]), &target(), true);

        assert_eq!(rules.len(), 4);
        assert_eq!(rules.ids(), vec![10, 11, 12, 13]);
        let patterns: Vec<&str> = rules.iter().map(|r| r.match_pattern()).collect();
        assert_eq!(
            patterns,
            vec![
                "*://*.example.com/*",
                "*://example.com/*",
                "*://example.com",
                "*://www.example.com",
            ]
        );
        assert!(rules.iter().all(|r| r.redirect_url() == "https://safe.test"));
        assert!(rules.iter().all(|r| r.priority == 1));
    }

    #[test]
    fn test_ids_grow_by_block() {
        let rules = RuleSet::compute(&domains(&["a.com", "b.com"]), &target(), true);
        assert_eq!(rules.ids(), vec![10, 11, 12, 13, 20, 21, 22, 23]);
        assert_eq!(rules.domain_count(), 2);
    }

    #[test]
    fn test_ids_unique_for_large_lists() {
        let names: Vec<String> = (0..2500).map(|i| format!("site{i}.com")).collect();
        let list: Vec<Domain> = names.iter().map(|n| Domain::parse(n).unwrap()).collect();
        let rules = RuleSet::compute(&list, &target(), true);

        assert_eq!(rules.len(), 4 * list.len());
        let unique: AHashSet<RuleId> = rules.ids().into_iter().collect();
        assert_eq!(unique.len(), rules.len());
    }

    #[test]
    fn test_base_id_stops_at_id_space() {
        assert_eq!(RuleSet::base_id(0), Some(10));
        assert_eq!(RuleSet::base_id(MAX_DOMAINS - 1), Some(4_294_967_280));
        assert_eq!(RuleSet::base_id(MAX_DOMAINS), None);
        assert_eq!(RuleSet::base_id(usize::MAX), None);

        // The last block, highest offset included, still fits
        let last = RuleSet::base_id(MAX_DOMAINS - 1).unwrap();
        assert!(last.checked_add(UrlPattern::Www.offset()).is_some());
    }

    #[test]
    fn test_duplicates_not_collapsed() {
        let rules = RuleSet::compute(&domains(&["a.com", "a.com"]), &target(), true);
        assert_eq!(rules.len(), 8);
        assert_eq!(rules.rules()[0].match_pattern(), rules.rules()[4].match_pattern());
        assert_ne!(rules.rules()[0].id, rules.rules()[4].id);
    }

    #[test]
    fn test_deterministic() {
        let list = domains(&["a.com", "b.org", "c.net"]);
        assert_eq!(
            RuleSet::compute(&list, &target(), true),
            RuleSet::compute(&list, &target(), true)
        );
    }

    #[test]
    fn test_batches_preserve_order() {
        let names: Vec<String> = (0..30).map(|i| format!("site{i}.com")).collect();
        let list: Vec<Domain> = names.iter().map(|n| Domain::parse(n).unwrap()).collect();
        let rules = RuleSet::compute(&list, &target(), true);

        let batches: Vec<&[Rule]> = rules.batches(50).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 50);
        assert_eq!(batches[1].len(), 50);
        assert_eq!(batches[2].len(), 20);
        let joined: Vec<Rule> = batches.concat();
        assert_eq!(joined, rules.rules());
    }

    #[test]
    fn test_zero_batch_size_clamped() {
        let rules = RuleSet::compute(&domains(&["a.com"]), &target(), true);
        assert_eq!(rules.batches(0).count(), 4);
    }
}
