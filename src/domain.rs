//! Blocked domain type and normalization.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Dot-separated labels of word characters and hyphens.
static HOSTNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w-]+(\.[\w-]+)*$").expect("hostname pattern is valid"));

/// A blocked hostname: no scheme, no leading `www.`, no trailing slash, lowercase.
///
/// # Examples
/// ```
/// use redirector::Domain;
///
/// let domain = Domain::parse("https://www.Example.com/").unwrap();
/// assert_eq!(domain.as_str(), "example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Normalize user input into a domain.
    ///
    /// Strips an `http://` or `https://` scheme, a leading `www.` and one
    /// trailing `/`, then checks the result is hostname-shaped.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let lower = input.trim().to_lowercase();

        let mut host = lower.as_str();
        for scheme in ["http://", "https://"] {
            if let Some(rest) = host.strip_prefix(scheme) {
                host = rest;
                break;
            }
        }
        if let Some(rest) = host.strip_prefix("www.") {
            host = rest;
        }
        if let Some(rest) = host.strip_suffix('/') {
            host = rest;
        }

        if host.is_empty() {
            return Err(DomainError::Empty);
        }
        if !HOSTNAME.is_match(host) {
            return Err(DomainError::InvalidHostname(host.to_string()));
        }

        Ok(Self(host.to_string()))
    }

    /// Wrap a value already normalized by the edit surface.
    ///
    /// Used for store contents, which are not re-validated.
    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Get the hostname.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Domain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
