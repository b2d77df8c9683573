//! Synchronization configuration and its storage keys.

use serde_json::Value;

use crate::error::{Error, Result, StoreError};
use crate::store::{ConfigStore, StoreValues};
use crate::{Domain, RedirectTarget, RuleSet};

/// Store key holding the ordered list of blocked domains.
pub const KEY_BLOCKED_WEBSITES: &str = "blockedWebsites";
/// Store key holding the redirect URL.
pub const KEY_REDIRECT_URL: &str = "redirectUrl";
/// Store key holding the enabled flag.
pub const KEY_ENABLED: &str = "extensionEnabled";

/// Keys whose change requires a synchronization pass.
pub const WATCHED_KEYS: [&str; 3] = [KEY_BLOCKED_WEBSITES, KEY_REDIRECT_URL, KEY_ENABLED];

/// The configuration a rule set is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Blocked domains in list order
    pub domains: Vec<Domain>,
    /// Where blocked navigations are sent
    pub redirect_target: RedirectTarget,
    /// When false no rules are active
    pub enabled: bool,
}

impl SyncConfig {
    /// Create a new SyncConfig.
    pub fn new(domains: Vec<Domain>, redirect_target: RedirectTarget, enabled: bool) -> Self {
        Self {
            domains,
            redirect_target,
            enabled,
        }
    }

    /// Read the configuration from a store.
    pub fn load<S: ConfigStore + ?Sized>(store: &S) -> Result<Self> {
        let values = store.get(&WATCHED_KEYS).map_err(Error::StoreRead)?;
        Self::from_values(&values)
    }

    /// Decode the configuration from store values.
    ///
    /// Missing keys take their defaults. Only an explicit `false` disables.
    pub fn from_values(values: &StoreValues) -> Result<Self> {
        let domains = match values.get(KEY_BLOCKED_WEBSITES) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => {
                let mut domains = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) if s.trim().is_empty() => {
                            log::warn!("Skipping empty entry in {}", KEY_BLOCKED_WEBSITES);
                        }
                        Value::String(s) => domains.push(Domain::from_stored(s.clone())),
                        other => {
                            return Err(Error::StoreRead(StoreError::Decode {
                                key: KEY_BLOCKED_WEBSITES.to_string(),
                                reason: format!("expected string entry, got {other}"),
                            }))
                        }
                    }
                }
                domains
            }
            Some(other) => {
                return Err(Error::StoreRead(StoreError::Decode {
                    key: KEY_BLOCKED_WEBSITES.to_string(),
                    reason: format!("expected array, got {other}"),
                }))
            }
        };

        let redirect_target = match values.get(KEY_REDIRECT_URL) {
            None | Some(Value::Null) => RedirectTarget::default(),
            Some(Value::String(s)) if s.is_empty() => RedirectTarget::default(),
            Some(Value::String(s)) => RedirectTarget::parse(s)?,
            Some(other) => {
                return Err(Error::StoreRead(StoreError::Decode {
                    key: KEY_REDIRECT_URL.to_string(),
                    reason: format!("expected string, got {other}"),
                }))
            }
        };

        let enabled = !matches!(values.get(KEY_ENABLED), Some(Value::Bool(false)));

        Ok(Self {
            domains,
            redirect_target,
            enabled,
        })
    }

    /// Encode the configuration as store values.
    pub fn to_values(&self) -> StoreValues {
        let mut values = StoreValues::new();
        values.insert(
            KEY_BLOCKED_WEBSITES.to_string(),
            Value::Array(
                self.domains
                    .iter()
                    .map(|d| Value::String(d.as_str().to_string()))
                    .collect(),
            ),
        );
        values.insert(
            KEY_REDIRECT_URL.to_string(),
            Value::String(self.redirect_target.as_str().to_string()),
        );
        values.insert(KEY_ENABLED.to_string(), Value::Bool(self.enabled));
        values
    }

    /// Compute the rule set for this configuration.
    pub fn rule_set(&self) -> RuleSet {
        RuleSet::compute(&self.domains, &self.redirect_target, self.enabled)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            redirect_target: RedirectTarget::default(),
            enabled: true,
        }
    }
}
