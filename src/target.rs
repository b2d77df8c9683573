//! Redirect target type.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Redirect target used when nothing has been configured.
pub const DEFAULT_REDIRECT_URL: &str = "https://www.google.com";

const SCHEMES: [&str; 2] = ["http://", "https://"];

/// RedirectTarget is the absolute URL a blocked navigation is sent to.
///
/// Always carries an explicit `http://` or `https://` scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RedirectTarget(String);

impl RedirectTarget {
    /// Parse a target that must already carry a scheme.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        let rest = SCHEMES
            .iter()
            .find_map(|scheme| url.strip_prefix(scheme))
            .ok_or_else(|| Error::InvalidInput(format!("redirect URL has no http(s) scheme: {url:?}")))?;

        if rest.is_empty() {
            return Err(Error::InvalidInput(format!("redirect URL has no host: {url:?}")));
        }

        Ok(Self(url.to_string()))
    }

    /// Normalize user input, prepending `https://` when no scheme is given.
    pub fn normalize(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidInput("redirect URL is empty".to_string()));
        }

        if SCHEMES.iter().any(|scheme| input.starts_with(scheme)) {
            Self::parse(input)
        } else {
            Self::parse(&format!("https://{input}"))
        }
    }

    /// Get the URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RedirectTarget {
    fn default() -> Self {
        Self(DEFAULT_REDIRECT_URL.to_string())
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RedirectTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RedirectTarget {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<RedirectTarget> for String {
    fn from(target: RedirectTarget) -> Self {
        target.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requires_scheme() {
        assert_eq!(
            RedirectTarget::parse("https://safe.test").unwrap().as_str(),
            "https://safe.test"
        );
        assert_eq!(
            RedirectTarget::parse("http://safe.test/page").unwrap().as_str(),
            "http://safe.test/page"
        );
        assert!(RedirectTarget::parse("safe.test").is_err());
        assert!(RedirectTarget::parse("ftp://safe.test").is_err());
        assert!(RedirectTarget::parse("https://").is_err());
    }

    #[test]
    fn test_normalize_prepends_https() {
        assert_eq!(
            RedirectTarget::normalize("  safe.test ").unwrap().as_str(),
            "https://safe.test"
        );
        assert_eq!(
            RedirectTarget::normalize("http://safe.test").unwrap().as_str(),
            "http://safe.test"
        );
        assert!(RedirectTarget::normalize("").is_err());
    }

    #[test]
    fn test_default() {
        assert_eq!(RedirectTarget::default().as_str(), DEFAULT_REDIRECT_URL);
    }

    #[test]
    fn test_serde_rejects_schemeless() {
        let ok: RedirectTarget = serde_json::from_str("\"https://safe.test\"").unwrap();
        assert_eq!(ok.to_string(), "https://safe.test");
        assert!(serde_json::from_str::<RedirectTarget>("\"safe.test\"").is_err());
    }
}
