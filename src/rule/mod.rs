//! Declarative redirect rule types.

mod pattern;

pub use pattern::UrlPattern;

use serde::{Deserialize, Serialize};

use crate::RedirectTarget;

/// Rule identifier understood by the enforcement engine.
pub type RuleId = u32;

/// Priority shared by every rule.
pub const RULE_PRIORITY: u32 = 1;

/// Resource types a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Top-level navigation
    MainFrame,
}

/// What happens when a rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    /// Send the navigation to another URL
    Redirect { redirect: Redirect },
}

/// Redirect destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub url: String,
}

/// When a rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: Vec<ResourceType>,
}

/// One declarative match-and-redirect entry.
///
/// Serializes to the engine's rule shape:
/// ```json
/// {"id": 10, "priority": 1,
///  "action": {"type": "redirect", "redirect": {"url": "https://safe.test"}},
///  "condition": {"urlFilter": "*://*.example.com/*", "resourceTypes": ["main_frame"]}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

impl Rule {
    /// Create a top-level navigation redirect rule.
    pub fn redirect(id: RuleId, url_filter: impl Into<String>, target: &RedirectTarget) -> Self {
        Self {
            id,
            priority: RULE_PRIORITY,
            action: RuleAction::Redirect {
                redirect: Redirect {
                    url: target.as_str().to_string(),
                },
            },
            condition: RuleCondition {
                url_filter: url_filter.into(),
                resource_types: vec![ResourceType::MainFrame],
            },
        }
    }

    /// Get the URL filter.
    pub fn match_pattern(&self) -> &str {
        &self.condition.url_filter
    }

    /// Get the redirect destination.
    pub fn redirect_url(&self) -> &str {
        match &self.action {
            RuleAction::Redirect { redirect } => &redirect.url,
        }
    }

    /// Get the resource types this rule is restricted to.
    pub fn resource_types(&self) -> &[ResourceType] {
        &self.condition.resource_types
    }
}
