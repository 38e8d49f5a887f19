//! Interfaces to the external profile-fetching and authentication
//! collaborators. The crawler only ever talks to these traits; the live
//! DOM-scraping backend lives outside this crate.

pub mod replay;

use crate::error::Result;
use crate::model::{Profile, Relation};

pub use replay::ReplayFetcher;

/// One page of connection results for a profile.
#[derive(Debug, Clone)]
pub struct ConnectionPage {
    pub profiles: Vec<Profile>,
    /// False when the list could not be viewed (private account).
    /// Not an error: the caller records the privacy flag and moves on.
    pub accessible: bool,
}

/// Source of profile metadata and connection lists.
pub trait ProfileFetcher {
    /// Fetch overview metadata for a single profile.
    fn fetch_overview(&mut self, profile_id: &str) -> Result<Profile>;

    /// Fetch the requested connection list. `expected_count` is a hint from
    /// the overview (e.g. to bound scroll pagination); backends may ignore it.
    fn fetch_connections(
        &mut self,
        profile_id: &str,
        relation: Relation,
        expected_count: Option<u64>,
    ) -> Result<ConnectionPage>;
}

/// Outcome of an authentication attempt. Failure carries an error code and
/// is fatal to the calling process.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl AuthOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Session authentication, performed once before a crawl.
pub trait Authenticator {
    fn login(&mut self) -> AuthOutcome;
}

/// Reduce a profile URL or bare identifier to the bare identifier.
///
/// Accepts `https://open.example.com/user/alice`, with or without trailing
/// slash or query string, as well as plain `alice`.
pub fn normalize_profile_identifier(identifier: &str) -> String {
    if identifier.starts_with("http://") || identifier.starts_with("https://") {
        if let Ok(url) = url::Url::parse(identifier) {
            if let Some(segments) = url.path_segments() {
                if let Some(last) = segments.filter(|s| !s.is_empty()).last() {
                    return last.to_string();
                }
            }
        }
        // Unparseable URL: fall back to the last path-ish component
        return identifier
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(identifier)
            .to_string();
    }
    identifier.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_id() {
        assert_eq!(normalize_profile_identifier("alice"), "alice");
    }

    #[test]
    fn test_normalize_profile_url() {
        assert_eq!(
            normalize_profile_identifier("https://open.example.com/user/alice"),
            "alice"
        );
        assert_eq!(
            normalize_profile_identifier("https://open.example.com/user/alice/"),
            "alice"
        );
        assert_eq!(
            normalize_profile_identifier("https://open.example.com/user/alice?si=xyz"),
            "alice"
        );
    }

    #[test]
    fn test_auth_outcome_constructors() {
        assert!(AuthOutcome::ok().success);
        let failed = AuthOutcome::failed("BAD_CREDENTIALS");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("BAD_CREDENTIALS"));
    }
}
