//! Remote fetch policy advertised by the backend
//!
//! The backend decides whether it will fetch remote documents on behalf of the
//! client and, if so, which URLs are acceptable. The policy is fetched once at
//! start-up. Until it arrives, or when fetching it fails, the policy is
//! [`FetchStatus::Unknown`], which the submission gate treats as unrestricted.

use regex::Regex;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::client::UpliftClient;
use crate::error::{PlaygroundError, Result};

/// Compiled allow-list for remote URLs
#[derive(Debug, Clone)]
pub struct AllowPattern {
    patterns: Vec<Regex>,
}

impl AllowPattern {
    /// Compile every pattern; the first one that fails aborts the whole list.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).map_err(|source| PlaygroundError::InvalidAllowPattern {
                    pattern: p.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// A URL is allowed when any of the patterns finds a match in it.
    pub fn is_match(&self, url: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(url))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn as_strs(&self) -> Vec<&str> {
        self.patterns.iter().map(|re| re.as_str()).collect()
    }
}

/// Whether the backend will fetch JSON-LD contexts referenced by the uplift
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextFetchPolicy {
    Open,
    Disabled,
    Whitelist(Vec<String>),
}

impl ContextFetchPolicy {
    pub fn describe(&self) -> String {
        match self {
            ContextFetchPolicy::Open => "any URL".to_string(),
            ContextFetchPolicy::Disabled => "disabled".to_string(),
            ContextFetchPolicy::Whitelist(urls) => format!("{} whitelisted", urls.len()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum FetchStatus {
    /// Not arrived yet, or the fetch failed
    #[default]
    Unknown,
    Disabled,
    Enabled(Option<AllowPattern>),
}

#[derive(Debug, Clone, Default)]
pub struct RemoteFetchPolicy {
    pub status: FetchStatus,
    pub context: Option<ContextFetchPolicy>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RegexField {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct ContextField {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    whitelist: Vec<String>,
}

#[derive(Deserialize)]
struct RemoteFetchResponse {
    enabled: bool,
    #[serde(default)]
    regex: Option<RegexField>,
    #[serde(default)]
    context: Option<ContextField>,
}

impl RemoteFetchPolicy {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            status: FetchStatus::Disabled,
            context: None,
        }
    }

    pub fn enabled(allow: Option<AllowPattern>) -> Self {
        Self {
            status: FetchStatus::Enabled(allow),
            context: None,
        }
    }

    /// Build a policy from a `/remote-fetch` response body.
    pub fn from_json(body: &str) -> Result<Self> {
        let response: RemoteFetchResponse = serde_json::from_str(body)?;

        let status = if response.enabled {
            let patterns = match response.regex {
                Some(RegexField::One(p)) => vec![p],
                Some(RegexField::Many(ps)) => ps,
                None => Vec::new(),
            };
            let allow = AllowPattern::new(&patterns)?;
            FetchStatus::Enabled((!allow.is_empty()).then_some(allow))
        } else {
            FetchStatus::Disabled
        };

        let context = response.context.and_then(|c| match c.kind.as_str() {
            "open" => Some(ContextFetchPolicy::Open),
            "disabled" => Some(ContextFetchPolicy::Disabled),
            "whitelist" => Some(ContextFetchPolicy::Whitelist(c.whitelist)),
            other => {
                warn!(kind = other, "Ignoring unrecognised context fetch policy");
                None
            }
        });

        Ok(Self { status, context })
    }

    /// Pattern remote URLs must match; `None` means no restriction.
    pub fn allow_pattern(&self) -> Option<&AllowPattern> {
        match &self.status {
            FetchStatus::Enabled(allow) => allow.as_ref(),
            _ => None,
        }
    }

    /// The `url` choice is hidden only when the backend explicitly said no.
    pub fn url_available(&self) -> bool {
        !matches!(self.status, FetchStatus::Disabled)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self.status, FetchStatus::Unknown)
    }

    pub fn describe(&self) -> String {
        match &self.status {
            FetchStatus::Unknown => "remote fetch: unknown".to_string(),
            FetchStatus::Disabled => "remote fetch: disabled".to_string(),
            FetchStatus::Enabled(None) => "remote fetch: any URL".to_string(),
            FetchStatus::Enabled(Some(allow)) => {
                format!("remote fetch: {}", allow.as_strs().join(" | "))
            }
        }
    }
}

/// Fetch the policy from the backend.
///
/// Transport and decoding failures degrade to an unknown policy. A pattern
/// that does not compile is a backend misconfiguration and is returned.
pub async fn load(client: &UpliftClient) -> Result<RemoteFetchPolicy> {
    match client.fetch_policy().await {
        Ok(policy) => {
            info!(policy = %policy.describe(), "Loaded remote fetch policy");
            Ok(policy)
        }
        Err(e @ PlaygroundError::InvalidAllowPattern { .. }) => {
            error!(error = %e, "Backend sent an unusable remote fetch pattern");
            Err(e)
        }
        Err(e) => {
            warn!(error = %e, "Could not load remote fetch policy, leaving it unknown");
            Ok(RemoteFetchPolicy::unknown())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_response() {
        let policy = RemoteFetchPolicy::from_json(r#"{"enabled": false}"#).unwrap();
        assert!(matches!(policy.status, FetchStatus::Disabled));
        assert!(!policy.url_available());
        assert!(policy.allow_pattern().is_none());
    }

    #[test]
    fn test_enabled_with_single_regex() {
        let policy =
            RemoteFetchPolicy::from_json(r#"{"enabled": true, "regex": "^https://a\\.org/.*$"}"#)
                .unwrap();
        let allow = policy.allow_pattern().unwrap();
        assert!(allow.is_match("https://a.org/doc.json"));
        assert!(!allow.is_match("https://b.org/x"));
        assert!(policy.url_available());
    }

    #[test]
    fn test_enabled_with_regex_list() {
        let policy = RemoteFetchPolicy::from_json(
            r#"{"enabled": true, "regex": ["^https://a\\.org/", "^https://b\\.org/"]}"#,
        )
        .unwrap();
        let allow = policy.allow_pattern().unwrap();
        assert!(allow.is_match("https://b.org/x"));
        assert!(!allow.is_match("https://c.org/x"));
    }

    #[test]
    fn test_enabled_without_regex_is_unrestricted() {
        let policy = RemoteFetchPolicy::from_json(r#"{"enabled": true, "regex": []}"#).unwrap();
        assert!(policy.allow_pattern().is_none());
        assert!(policy.is_known());
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let err = RemoteFetchPolicy::from_json(r#"{"enabled": true, "regex": "(unclosed"}"#)
            .unwrap_err();
        assert!(matches!(err, PlaygroundError::InvalidAllowPattern { .. }));
    }

    #[test]
    fn test_context_block() {
        let body = r#"{
            "enabled": false,
            "context": {"type": "whitelist", "whitelist": ["https://w3id.org/"]}
        }"#;
        let policy = RemoteFetchPolicy::from_json(body).unwrap();
        assert_eq!(
            policy.context,
            Some(ContextFetchPolicy::Whitelist(vec!["https://w3id.org/".to_string()]))
        );
    }

    #[test]
    fn test_unknown_policy_keeps_url_choice() {
        let policy = RemoteFetchPolicy::unknown();
        assert!(policy.url_available());
        assert!(!policy.is_known());
    }
}
