//! Offline fetch backend that replays a recorded capture file.
//!
//! A capture is a JSON document mapping account ids to overview data plus a
//! follower-id list. It stands in for the live DOM scraper: the CLI can run
//! a full crawl against it, and the end-to-end tests drive the crawler
//! through the same code path a live backend would use.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{FollowgraphError, Result};
use crate::fetch::{AuthOutcome, Authenticator, ConnectionPage, ProfileFetcher};
use crate::model::{Profile, Relation};

/// Top-level capture document.
#[derive(Debug, Clone, Deserialize)]
pub struct Capture {
    /// Whether the recorded session was authenticated.
    #[serde(default = "default_authenticated")]
    pub authenticated: bool,
    /// Error code reported when `authenticated` is false.
    #[serde(default)]
    pub auth_error: Option<String>,
    pub accounts: HashMap<String, CapturedAccount>,
}

/// Recorded overview and connections for one account.
#[derive(Debug, Clone, Deserialize)]
pub struct CapturedAccount {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub followers: Option<u64>,
    #[serde(default)]
    pub following: Option<u64>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub follower_ids: Vec<String>,
    /// False when the follower list could not be viewed in the recorded
    /// session even though the overview loaded.
    #[serde(default = "default_accessible")]
    pub followers_accessible: bool,
}

fn default_authenticated() -> bool {
    true
}

fn default_accessible() -> bool {
    true
}

/// Fetch backend serving profiles from a [`Capture`].
pub struct ReplayFetcher {
    capture: Capture,
    base_url: String,
}

impl ReplayFetcher {
    pub fn new(capture: Capture, base_url: impl Into<String>) -> Self {
        Self {
            capture,
            base_url: base_url.into(),
        }
    }

    /// Load a capture file from disk.
    pub fn from_file(path: &Path, base_url: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let capture: Capture = serde_json::from_str(&raw).map_err(|e| {
            FollowgraphError::Config(format!("Invalid capture file {}: {}", path.display(), e))
        })?;
        log::info!(
            "Loaded capture with {} account(s) from {}",
            capture.accounts.len(),
            path.display()
        );
        Ok(Self::new(capture, base_url))
    }

    fn profile_url(&self, profile_id: &str) -> String {
        format!("{}/user/{}", self.base_url, profile_id)
    }

    fn overview(&self, profile_id: &str) -> Option<Profile> {
        let account = self.capture.accounts.get(profile_id)?;
        let mut profile = Profile::new(profile_id);
        profile.display_name = account.display_name.clone();
        profile.followers = account.followers;
        profile.following = account.following;
        profile.profile_url = Some(self.profile_url(profile_id));
        profile.avatar_url = account.avatar_url.clone();
        profile.is_private = account.is_private;
        Some(profile)
    }

    /// A follower entry whose own account was not captured. Mirrors a live
    /// follower tile: the id is known, counts are not.
    fn stub_profile(&self, profile_id: &str) -> Profile {
        let mut profile = Profile::new(profile_id);
        profile.profile_url = Some(self.profile_url(profile_id));
        profile
    }
}

impl ProfileFetcher for ReplayFetcher {
    fn fetch_overview(&mut self, profile_id: &str) -> Result<Profile> {
        self.overview(profile_id)
            .ok_or_else(|| FollowgraphError::ProfileNotFound(profile_id.to_string()))
    }

    fn fetch_connections(
        &mut self,
        profile_id: &str,
        relation: Relation,
        _expected_count: Option<u64>,
    ) -> Result<ConnectionPage> {
        let account = self
            .capture
            .accounts
            .get(profile_id)
            .cloned()
            .ok_or_else(|| FollowgraphError::ProfileNotFound(profile_id.to_string()))?;

        if account.is_private || !account.followers_accessible {
            return Ok(ConnectionPage {
                profiles: Vec::new(),
                accessible: false,
            });
        }

        let profiles = match relation {
            Relation::Followers => account
                .follower_ids
                .iter()
                .map(|id| self.overview(id).unwrap_or_else(|| self.stub_profile(id)))
                .collect(),
            // Following lists were never part of recorded sessions.
            Relation::Following => Vec::new(),
        };

        Ok(ConnectionPage {
            profiles,
            accessible: true,
        })
    }
}

impl Authenticator for ReplayFetcher {
    fn login(&mut self) -> AuthOutcome {
        if self.capture.authenticated {
            AuthOutcome::ok()
        } else {
            AuthOutcome::failed(
                self.capture
                    .auth_error
                    .clone()
                    .unwrap_or_else(|| "UNKNOWN_ERROR".to_string()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture_json() -> &'static str {
        r#"{
            "accounts": {
                "alice": {
                    "display_name": "Alice",
                    "followers": 2,
                    "following": 1,
                    "follower_ids": ["bob", "ghost"]
                },
                "bob": {
                    "display_name": "Bob",
                    "followers": 1,
                    "is_private": true
                }
            }
        }"#
    }

    fn fetcher() -> ReplayFetcher {
        let capture: Capture = serde_json::from_str(capture_json()).unwrap();
        ReplayFetcher::new(capture, "https://open.example.com")
    }

    #[test]
    fn test_fetch_overview() {
        let mut f = fetcher();
        let profile = f.fetch_overview("alice").unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("Alice"));
        assert_eq!(profile.followers, Some(2));
        assert_eq!(
            profile.profile_url.as_deref(),
            Some("https://open.example.com/user/alice")
        );
    }

    #[test]
    fn test_fetch_overview_unknown_id() {
        let mut f = fetcher();
        let err = f.fetch_overview("nobody").unwrap_err();
        assert!(matches!(err, FollowgraphError::ProfileNotFound(_)));
    }

    #[test]
    fn test_fetch_connections_resolves_and_stubs() {
        let mut f = fetcher();
        let page = f
            .fetch_connections("alice", Relation::Followers, Some(2))
            .unwrap();
        assert!(page.accessible);
        assert_eq!(page.profiles.len(), 2);
        let bob = page.profiles.iter().find(|p| p.id == "bob").unwrap();
        assert_eq!(bob.followers, Some(1));
        // "ghost" was never captured: id-only stub with unknown counts
        let ghost = page.profiles.iter().find(|p| p.id == "ghost").unwrap();
        assert_eq!(ghost.followers, None);
        assert!(ghost.display_name.is_none());
    }

    #[test]
    fn test_private_account_is_inaccessible_not_error() {
        let mut f = fetcher();
        let page = f
            .fetch_connections("bob", Relation::Followers, None)
            .unwrap();
        assert!(!page.accessible);
        assert!(page.profiles.is_empty());
    }

    #[test]
    fn test_login_outcomes() {
        let mut f = fetcher();
        assert!(f.login().success);

        let capture: Capture = serde_json::from_str(
            r#"{"authenticated": false, "auth_error": "SESSION_EXPIRED", "accounts": {}}"#,
        )
        .unwrap();
        let mut failed = ReplayFetcher::new(capture, "https://open.example.com");
        let outcome = failed.login();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("SESSION_EXPIRED"));
    }
}
