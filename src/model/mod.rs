//! Data model: profiles, directed follow relationships, and the canonical
//! edge identity used for deduplication across every layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discovered account and its known attributes.
///
/// Field names match the persisted JSON layout; optional fields and the
/// progress flags default on deserialization so datasets written before a
/// field existed still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Follower count as shown on the profile page; unknown until fetched.
    #[serde(default)]
    pub followers: Option<u64>,
    #[serde(default)]
    pub following: Option<u64>,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    pub last_seen_at: DateTime<Utc>,
    /// True once a follower fetch was attempted for this profile.
    /// Monotonic under merge: once set, a later upsert never clears it.
    #[serde(default)]
    pub followers_fetch_attempted: bool,
    /// True once a follower list was actually retrieved (non-empty).
    #[serde(default)]
    pub followers_fetched: bool,
    /// True when the follower list was skipped because the count exceeded
    /// the download limit.
    #[serde(default)]
    pub followers_oversized: bool,
}

impl Profile {
    /// Create a bare profile known only by its identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            followers: None,
            following: None,
            profile_url: None,
            avatar_url: None,
            is_private: false,
            last_seen_at: Utc::now(),
            followers_fetch_attempted: false,
            followers_fetched: false,
            followers_oversized: false,
        }
    }
}

/// Direction-typed edge label.
///
/// `Follower` means the source follows the target. `Following` is modeled
/// and round-trips through persistence, but the live crawl path only
/// produces `Follower` edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Follower,
    Following,
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationType::Follower => write!(f, "follower"),
            RelationType::Following => write!(f, "following"),
        }
    }
}

/// Which connection list to request from a fetcher.
///
/// Distinct from [`RelationType`]: a `Followers` request yields `follower`
/// edges pointing neighbor -> subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Followers,
    Following,
}

/// A directed, typed fact connecting two profiles. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: RelationType,
    pub discovered_at: DateTime<Utc>,
}

impl Relationship {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation_type: RelationType,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type,
            discovered_at: Utc::now(),
        }
    }

    /// Canonical identity of this edge. The discovery timestamp is
    /// deliberately excluded: two observations of the same fact are one
    /// edge, in memory and in the master tier alike.
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source_id: self.source_id.clone(),
            target_id: self.target_id.clone(),
            relation_type: self.relation_type,
        }
    }
}

/// Canonical edge identity: (source, target, relation type).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: RelationType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_key_ignores_timestamp() {
        let a = Relationship::new("alice", "bob", RelationType::Follower);
        let mut b = a.clone();
        b.discovered_at = b.discovered_at + chrono::Duration::seconds(42);
        assert_ne!(a, b);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_edge_key_distinguishes_direction_and_type() {
        let ab = Relationship::new("a", "b", RelationType::Follower);
        let ba = Relationship::new("b", "a", RelationType::Follower);
        let ab_following = Relationship::new("a", "b", RelationType::Following);
        assert_ne!(ab.key(), ba.key());
        assert_ne!(ab.key(), ab_following.key());
    }

    #[test]
    fn test_relation_type_serializes_lowercase() {
        let edge = Relationship::new("a", "b", RelationType::Follower);
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["relation_type"], "follower");
        assert_eq!(json["source_id"], "a");
        assert_eq!(json["target_id"], "b");
    }

    #[test]
    fn test_profile_deserializes_without_progress_flags() {
        // Layout written before the progress flags existed
        let json = r#"{
            "id": "alice",
            "display_name": "Alice",
            "followers": 12,
            "last_seen_at": "2024-05-01T12:00:00Z"
        }"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.id, "alice");
        assert_eq!(profile.followers, Some(12));
        assert!(!profile.followers_fetch_attempted);
        assert!(!profile.followers_fetched);
        assert!(!profile.followers_oversized);
        assert!(!profile.is_private);
    }
}
