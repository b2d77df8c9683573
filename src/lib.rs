//! Redirector - keeps blocked domains in sync with declarative redirect rules.
//!
//! This crate maintains the rule set an external enforcement engine needs to
//! redirect navigations to blocked domains. The configuration (blocked
//! domains, redirect URL, enabled flag) lives in a key/value store; every
//! change recomputes the full rule set and replaces the engine's rules.
//!
//! # Features
//!
//! - **Deterministic rules**: the same configuration always yields the same
//!   rules, ids and order
//! - **Full coverage**: four URL filters per domain (subdomains, bare domain
//!   with and without path, explicit `www.`)
//! - **Clear then install**: stale rules are removed before new ones go in,
//!   in batches of at most 50 rules
//! - **Serialized passes**: one dispatch loop, queued triggers coalesce into
//!   a single pass that sees the latest configuration
//!
//! # Quick Start
//!
//! ```
//! use redirector::{Domain, MemoryEngine, RedirectTarget, RuleSynchronizer, SyncConfig};
//!
//! let config = SyncConfig::new(
//!     vec![Domain::parse("example.com").unwrap()],
//!     RedirectTarget::parse("https://safe.test").unwrap(),
//!     true,
//! );
//!
//! let mut synchronizer = RuleSynchronizer::new(MemoryEngine::new());
//! let report = synchronizer.sync(&config).unwrap();
//! assert_eq!(report.installed, 4);
//! ```
//!
//! # Watching a store
//!
//! ```
//! use redirector::{ConfigWatcher, Editor, MemoryEngine, MemoryStore, RuleSynchronizer};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let watcher = ConfigWatcher::new(store.clone(), RuleSynchronizer::new(MemoryEngine::new()));
//! let (handle, thread) = watcher.spawn();
//!
//! let editor = Editor::new(store, handle.clone());
//! editor.add_domain("www.example.com").unwrap();
//!
//! handle.shutdown().unwrap();
//! thread.join().unwrap();
//! ```
//!
//! # Rule ids
//!
//! The domain at position `i` owns ids `(i + 1) * 10` to `(i + 1) * 10 + 3`.
//! Ids are recomputed on every pass and shift when the list changes; nothing
//! may rely on an id surviving a resynchronization.

mod domain;
mod error;
mod persist;
mod target;

pub mod editor;
pub mod engine;
pub mod rule;
pub mod ruleset;
pub mod store;
pub mod sync;
pub mod watcher;

// Re-export core types
pub use domain::Domain;
pub use error::{DomainError, EngineError, Error, Result, StoreError};
pub use target::{RedirectTarget, DEFAULT_REDIRECT_URL};

// Re-export rule types
pub use rule::{ResourceType, Rule, RuleId, UrlPattern};
pub use ruleset::{RuleSet, SyncConfig};

// Re-export seams and their implementations
pub use engine::{FileEngine, MemoryEngine, RuleEngine};
pub use store::{ConfigStore, FileStore, MemoryStore, StoreChange};

// Re-export synchronization
pub use editor::Editor;
pub use sync::{RuleSynchronizer, SyncReport, BATCH_SIZE};
pub use watcher::{ConfigWatcher, PendingSync, Trigger, WatcherHandle, WatcherState};
