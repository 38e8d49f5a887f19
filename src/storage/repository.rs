//! Authoritative in-memory graph with monotonic merge-on-upsert semantics.
//! The crawler's single source of truth for "have I seen this before".

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::model::{EdgeKey, Profile, Relationship, RelationType};
use crate::storage::store::TieredStore;

#[derive(Debug)]
pub struct GraphRepository {
    store: TieredStore,
    profiles: HashMap<String, Profile>,
    edges: Vec<Relationship>,
    edge_keys: HashSet<EdgeKey>,
}

impl GraphRepository {
    /// Load all persisted profiles and edges through the store, then
    /// backfill follower-fetch progress flags from inbound follower edges
    /// (reconciling state written before the flags existed).
    ///
    /// A load failure propagates as [`crate::FollowgraphError::StateLoad`];
    /// the in-memory graph is never silently reset to empty.
    pub fn open(store: TieredStore) -> Result<Self> {
        let profiles = store.load_profiles()?;
        let edges = store.load_edges()?;
        let edge_keys = edges.iter().map(Relationship::key).collect();

        let mut repo = Self {
            store,
            profiles,
            edges,
            edge_keys,
        };
        repo.backfill_progress_flags();
        log::debug!(
            "Loaded repository state with {} profiles and {} edges",
            repo.profiles.len(),
            repo.edges.len()
        );
        Ok(repo)
    }

    /// Any profile with at least one inbound follower edge has had a
    /// successful follower fetch, whether or not the flags were recorded
    /// at the time.
    fn backfill_progress_flags(&mut self) {
        let targets: HashSet<String> = self
            .edges
            .iter()
            .filter(|e| e.relation_type == RelationType::Follower)
            .map(|e| e.target_id.clone())
            .collect();
        for id in targets {
            if let Some(profile) = self.profiles.get_mut(&id) {
                profile.followers_fetch_attempted = true;
                profile.followers_fetched = true;
            }
        }
    }

    /// Insert or merge a profile. The three fetch-progress flags are
    /// combined by logical OR with any existing record so a later,
    /// less-informed write (e.g. a cache-hit re-touch) never erases prior
    /// successful work; every other field takes the incoming value.
    pub fn upsert_profile(&mut self, mut profile: Profile) {
        if let Some(existing) = self.profiles.get(&profile.id) {
            profile.followers_fetch_attempted |= existing.followers_fetch_attempted;
            profile.followers_fetched |= existing.followers_fetched;
            profile.followers_oversized |= existing.followers_oversized;
        }
        self.profiles.insert(profile.id.clone(), profile);
    }

    /// Insert an edge unless one with the same canonical key already
    /// exists. Returns whether the edge was added.
    pub fn add_edge(&mut self, edge: Relationship) -> bool {
        if self.edge_keys.insert(edge.key()) {
            self.edges.push(edge);
            true
        } else {
            false
        }
    }

    /// Insert many edges, returning how many were new.
    pub fn bulk_add_edges(&mut self, edges: impl IntoIterator<Item = Relationship>) -> usize {
        edges
            .into_iter()
            .filter(|e| self.add_edge(e.clone()))
            .count()
    }

    pub fn find_profile(&self, profile_id: &str) -> Option<&Profile> {
        self.profiles.get(profile_id)
    }

    /// Profiles that follow `profile_id`, derived by scanning follower
    /// edges with the given id as target.
    pub fn get_followers(&self, profile_id: &str) -> Vec<Profile> {
        self.edges
            .iter()
            .filter(|e| {
                e.relation_type == RelationType::Follower && e.target_id == profile_id
            })
            .filter_map(|e| self.profiles.get(&e.source_id).cloned())
            .collect()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn profiles(&self) -> &HashMap<String, Profile> {
        &self.profiles
    }

    pub fn edges(&self) -> &[Relationship] {
        &self.edges
    }

    /// Write the full in-memory state through the store (current tier
    /// overwritten, master tier merged).
    pub fn persist(&self) -> Result<()> {
        self.store.save_profiles(&self.profiles)?;
        self.store.save_edges(&self.edges)
    }

    /// Archive the current tier; a no-op after the first call.
    pub fn archive_snapshot(&mut self) -> Result<Option<std::path::PathBuf>> {
        self.store.archive_snapshot()
    }
}
