//! Configuration edit surface.
//!
//! Each edit writes the store and then asks the watcher to synchronize with
//! the configuration the editor just wrote, so the pass does not depend on
//! the store read racing the write.

use serde_json::Value;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ruleset::{KEY_BLOCKED_WEBSITES, KEY_ENABLED, KEY_REDIRECT_URL};
use crate::store::{ConfigStore, StoreValues};
use crate::sync::SyncReport;
use crate::watcher::WatcherHandle;
use crate::{Domain, RedirectTarget, SyncConfig};

/// Editor applies user edits to the blocked list, redirect URL and toggle.
pub struct Editor<S: ?Sized> {
    store: Arc<S>,
    watcher: WatcherHandle,
}

impl<S: ConfigStore + ?Sized> Editor<S> {
    /// Create an editor over a store and a running watcher.
    pub fn new(store: Arc<S>, watcher: WatcherHandle) -> Self {
        Self { store, watcher }
    }

    /// Get the current configuration.
    pub fn config(&self) -> Result<SyncConfig> {
        SyncConfig::load(&*self.store)
    }

    /// Block a website. Returns the normalized domain.
    pub fn add_domain(&self, input: &str) -> Result<(Domain, SyncReport)> {
        let domain = Domain::parse(input)?;
        let mut config = self.config()?;
        if config.domains.contains(&domain) {
            return Err(Error::DuplicateDomain(domain.to_string()));
        }

        config.domains.push(domain.clone());
        self.write(KEY_BLOCKED_WEBSITES, domains_value(&config.domains))?;
        let report = self.sync(config)?;
        Ok((domain, report))
    }

    /// Unblock a website.
    pub fn remove_domain(&self, input: &str) -> Result<SyncReport> {
        let domain = Domain::parse(input)?;
        let mut config = self.config()?;
        let before = config.domains.len();
        config.domains.retain(|d| d != &domain);
        if config.domains.len() == before {
            return Err(Error::UnknownDomain(domain.to_string()));
        }

        self.write(KEY_BLOCKED_WEBSITES, domains_value(&config.domains))?;
        self.sync(config)
    }

    /// Unblock every website.
    pub fn clear_domains(&self) -> Result<SyncReport> {
        let mut config = self.config()?;
        config.domains.clear();
        self.write(KEY_BLOCKED_WEBSITES, Value::Array(Vec::new()))?;
        self.sync(config)
    }

    /// Set the redirect URL, adding `https://` when no scheme is given.
    pub fn set_redirect_url(&self, input: &str) -> Result<(RedirectTarget, SyncReport)> {
        let target = RedirectTarget::normalize(input)?;
        let mut config = self.config_or_default()?;
        config.redirect_target = target.clone();

        self.write(KEY_REDIRECT_URL, Value::String(target.as_str().to_string()))?;
        let report = self.sync(config)?;
        Ok((target, report))
    }

    /// Flip the enabled flag. Returns the new state.
    pub fn toggle(&self) -> Result<(bool, SyncReport)> {
        let mut config = self.config_or_default()?;
        config.enabled = !config.enabled;

        self.write(KEY_ENABLED, Value::Bool(config.enabled))?;
        let enabled = config.enabled;
        let report = self.sync(config)?;
        Ok((enabled, report))
    }

    /// Load the configuration, falling back to defaults when the stored
    /// redirect URL is unusable so that it can be replaced.
    fn config_or_default(&self) -> Result<SyncConfig> {
        match self.config() {
            Err(Error::InvalidInput(reason)) => {
                log::warn!("Stored configuration is invalid ({}), using defaults", reason);
                let values = self
                    .store
                    .get(&[KEY_BLOCKED_WEBSITES, KEY_ENABLED])
                    .map_err(Error::StoreRead)?;
                SyncConfig::from_values(&values)
            }
            other => other,
        }
    }

    fn write(&self, key: &str, value: Value) -> Result<()> {
        let mut values = StoreValues::new();
        values.insert(key.to_string(), value);
        self.store.set(values).map_err(Error::StoreWrite)
    }

    fn sync(&self, config: SyncConfig) -> Result<SyncReport> {
        self.watcher.request_sync(config)
    }
}

fn domains_value(domains: &[Domain]) -> Value {
    Value::Array(
        domains
            .iter()
            .map(|d| Value::String(d.as_str().to_string()))
            .collect(),
    )
}
