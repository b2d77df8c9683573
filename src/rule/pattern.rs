//! URL filter patterns emitted for each blocked domain.

use crate::Domain;

/// One of the four URL filters that together cover every common way of
/// navigating to a domain.
///
/// Filter matching in the enforcement engine does not unify "with or without
/// a path" or "with or without `www.`", so each form gets its own rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlPattern {
    /// `*://*.{domain}/*`
    AnySubdomain,
    /// `*://{domain}/*`
    BareWithPath,
    /// `*://{domain}`
    Bare,
    /// `*://www.{domain}`
    Www,
}

impl UrlPattern {
    /// All patterns in id-offset order.
    pub const ALL: [UrlPattern; 4] = [
        UrlPattern::AnySubdomain,
        UrlPattern::BareWithPath,
        UrlPattern::Bare,
        UrlPattern::Www,
    ];

    /// Offset added to the domain's base id.
    pub fn offset(self) -> u32 {
        match self {
            UrlPattern::AnySubdomain => 0,
            UrlPattern::BareWithPath => 1,
            UrlPattern::Bare => 2,
            UrlPattern::Www => 3,
        }
    }

    /// Render the URL filter for a domain.
    pub fn render(self, domain: &Domain) -> String {
        match self {
            UrlPattern::AnySubdomain => format!("*://*.{domain}/*"),
            UrlPattern::BareWithPath => format!("*://{domain}/*"),
            UrlPattern::Bare => format!("*://{domain}"),
            UrlPattern::Www => format!("*://www.{domain}"),
        }
    }
}
