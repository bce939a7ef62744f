//! Static bearer token authentication.
//!
//! Tokens come from configuration and never change for the process lifetime:
//! - master token: read-write access
//! - public token: read-only access
//!
//! A registry with no tokens at all means the server is misconfigured and must refuse
//! every request.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ServerConfig;

/// Upper bound of the randomized delay applied to failed logins.
pub const AUTH_FAILURE_MAX_DELAY: Duration = Duration::from_millis(500);

/// A configured token and the privilege it grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub key: String,
    pub write_access: bool,
}

/// Privilege reported by the auth check endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rights {
    #[serde(rename = "rw")]
    ReadWrite,
    #[serde(rename = "r")]
    ReadOnly,
}

impl AccessToken {
    pub fn rights(&self) -> Rights {
        if self.write_access {
            Rights::ReadWrite
        } else {
            Rights::ReadOnly
        }
    }

    fn matches(&self, provided: &str) -> bool {
        Sha256::digest(provided.as_bytes()) == Sha256::digest(self.key.as_bytes())
    }
}

/// Immutable set of accepted tokens.
#[derive(Debug, Clone, Default)]
pub struct AuthRegistry {
    tokens: Vec<AccessToken>,
}

impl AuthRegistry {
    /// Build the registry from the master and public token values.
    ///
    /// Absent or empty values are dropped, so the result holds at most two entries.
    pub fn new(master_token: Option<&str>, public_token: Option<&str>) -> Self {
        let tokens = [(master_token, true), (public_token, false)]
            .into_iter()
            .filter_map(|(key, write_access)| {
                key.filter(|key| !key.is_empty()).map(|key| AccessToken {
                    key: key.to_string(),
                    write_access,
                })
            })
            .collect();
        Self { tokens }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.master_token.as_deref(),
            config.public_token.as_deref(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// First registered token equal to `provided`.
    pub fn authenticate(&self, provided: Option<&str>) -> Option<&AccessToken> {
        let provided = provided?;
        self.tokens.iter().find(|token| token.matches(provided))
    }
}

/// Pick the caller's token from the places a client may put it.
///
/// Order: `Authorization` header, `token` query parameter, `auth_token` body field.
/// Empty values are skipped. A `Bearer ` prefix on the header is stripped; a header
/// without it is taken as-is.
pub fn extract_token<'a>(
    authorization: Option<&'a str>,
    query_token: Option<&'a str>,
    body_token: Option<&'a str>,
) -> Option<&'a str> {
    let from_header = authorization.map(strip_bearer);
    [from_header, query_token, body_token]
        .into_iter()
        .flatten()
        .find(|token| !token.is_empty())
}

fn strip_bearer(value: &str) -> &str {
    value
        .strip_prefix("Bearer")
        .and_then(|rest| {
            let mut chars = rest.chars();
            chars
                .next()
                .filter(|c| c.is_whitespace())
                .map(|_| chars.as_str())
        })
        .unwrap_or(value)
}

/// Random delay in `[0, AUTH_FAILURE_MAX_DELAY]` used before answering a failed login.
pub fn auth_failure_delay() -> Duration {
    let ceiling = AUTH_FAILURE_MAX_DELAY.as_millis() as u64;
    Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_drops_empty_tokens() {
        assert_eq!(AuthRegistry::new(Some("master"), Some("public")).len(), 2);
        assert_eq!(AuthRegistry::new(Some("master"), None).len(), 1);
        assert_eq!(AuthRegistry::new(Some(""), Some("public")).len(), 1);
        assert!(AuthRegistry::new(None, Some("")).is_empty());
    }

    #[test]
    fn test_authenticate_grants_matching_privilege() {
        let registry = AuthRegistry::new(Some("master"), Some("public"));

        let master = registry.authenticate(Some("master")).unwrap();
        assert!(master.write_access);
        assert_eq!(master.rights(), Rights::ReadWrite);

        let public = registry.authenticate(Some("public")).unwrap();
        assert!(!public.write_access);
        assert_eq!(public.rights(), Rights::ReadOnly);
    }

    #[test]
    fn test_authenticate_rejects_unknown_or_missing() {
        let registry = AuthRegistry::new(Some("master"), None);

        assert!(registry.authenticate(Some("guess")).is_none());
        assert!(registry.authenticate(Some("")).is_none());
        assert!(registry.authenticate(Some("maste")).is_none());
        assert!(registry.authenticate(None).is_none());
    }

    #[test]
    fn test_empty_registry_never_authenticates() {
        let registry = AuthRegistry::new(None, None);

        assert!(registry.authenticate(Some("")).is_none());
        assert!(registry.authenticate(Some("anything")).is_none());
    }

    #[test]
    fn test_extract_token_order() {
        assert_eq!(
            extract_token(Some("Bearer header"), Some("query"), Some("body")),
            Some("header")
        );
        assert_eq!(extract_token(None, Some("query"), Some("body")), Some("query"));
        assert_eq!(extract_token(None, None, Some("body")), Some("body"));
        assert_eq!(extract_token(None, None, None), None);
    }

    #[test]
    fn test_extract_token_skips_empty_values() {
        assert_eq!(extract_token(Some("Bearer "), Some(""), Some("body")), Some("body"));
        assert_eq!(extract_token(Some(""), None, None), None);
    }

    #[test]
    fn test_extract_token_without_bearer_prefix() {
        assert_eq!(extract_token(Some("raw-token"), None, None), Some("raw-token"));
        assert_eq!(extract_token(Some("Bearertoken"), None, None), Some("Bearertoken"));
        assert_eq!(extract_token(Some("Bearer\ttab"), None, None), Some("tab"));
    }

    #[test]
    fn test_auth_failure_delay_is_bounded() {
        let samples: Vec<Duration> = (0..1000).map(|_| auth_failure_delay()).collect();

        assert!(samples.iter().all(|delay| *delay <= AUTH_FAILURE_MAX_DELAY));
        assert!(samples.iter().any(|delay| *delay < Duration::from_millis(100)));
        assert!(samples.iter().any(|delay| *delay > Duration::from_millis(400)));
    }

    #[test]
    fn test_rights_wire_format() {
        assert_eq!(serde_json::to_string(&Rights::ReadWrite).unwrap(), "\"rw\"");
        assert_eq!(serde_json::to_string(&Rights::ReadOnly).unwrap(), "\"r\"");
    }
}
