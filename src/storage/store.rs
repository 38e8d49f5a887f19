//! Tiered JSON persistence: `current/` holds the last persisted view,
//! `master/` the cumulative deduplicated history across runs, `archive/`
//! immutable timestamped copies of a completed run's current snapshot.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{FollowgraphError, Result};
use crate::model::{Profile, Relationship};

const PROFILES_FILE: &str = "profiles.json";
const EDGES_FILE: &str = "edges.json";

/// Three-tier graph store rooted at a base directory.
///
/// One store instance is assumed per crawl process. No file locking is
/// performed: two processes writing the same base directory can race and
/// corrupt the master-tier merge.
#[derive(Debug)]
pub struct TieredStore {
    base_path: PathBuf,
    archived: bool,
}

impl TieredStore {
    /// Open (or initialize) a store at `base_path`. Creates the tier
    /// directories and migrates any legacy flat-layout files into the
    /// master tier.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(base_path.join("current"))?;
        fs::create_dir_all(base_path.join("master"))?;
        fs::create_dir_all(base_path.join("archive"))?;

        let store = Self {
            base_path,
            archived: false,
        };
        store.migrate_legacy_layout()?;
        log::debug!("Initialized tiered store at {}", store.base_path.display());
        Ok(store)
    }

    fn current_path(&self, file: &str) -> PathBuf {
        self.base_path.join("current").join(file)
    }

    fn master_path(&self, file: &str) -> PathBuf {
        self.base_path.join("master").join(file)
    }

    /// Move flat `profiles.json`/`edges.json` written by the pre-tier
    /// layout into the master tier. Runs at most once: after the rename the
    /// flat files no longer exist. An existing master file is never
    /// clobbered; the legacy file is left in place with a warning.
    fn migrate_legacy_layout(&self) -> Result<()> {
        for file in [PROFILES_FILE, EDGES_FILE] {
            let legacy = self.base_path.join(file);
            if !legacy.exists() {
                continue;
            }
            let target = self.master_path(file);
            if target.exists() {
                log::warn!(
                    "Legacy file {} found but {} already exists; leaving legacy file untouched",
                    legacy.display(),
                    target.display()
                );
                continue;
            }
            fs::rename(&legacy, &target)?;
            log::info!(
                "Migrated legacy {} into master tier",
                legacy.display()
            );
        }
        Ok(())
    }

    fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let serialized = serde_json::to_string_pretty(value)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path).map_err(|e| FollowgraphError::StateLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let value = serde_json::from_str(&raw).map_err(|e| FollowgraphError::StateLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Some(value))
    }

    /// Persist profiles: overwrite the current tier, then merge into the
    /// master tier by id (overwrite-on-conflict). Keys are written sorted,
    /// so persisting identical state twice leaves master byte-identical.
    pub fn save_profiles(&self, profiles: &HashMap<String, Profile>) -> Result<()> {
        let current: BTreeMap<&String, &Profile> = profiles.iter().collect();
        self.write_json(&self.current_path(PROFILES_FILE), &current)?;

        let mut master: BTreeMap<String, Profile> = self
            .read_json(&self.master_path(PROFILES_FILE))?
            .unwrap_or_default();
        for (id, profile) in profiles {
            master.insert(id.clone(), profile.clone());
        }
        self.write_json(&self.master_path(PROFILES_FILE), &master)?;

        log::debug!("Persisted {} profiles", profiles.len());
        Ok(())
    }

    /// Persist edges: overwrite the current tier, then merge into the
    /// master tier by canonical edge key, skipping entries whose
    /// (source, target, type) triple is already present. Append order is
    /// preserved, so a repeat persist of identical state is a no-op for
    /// master content.
    pub fn save_edges(&self, edges: &[Relationship]) -> Result<()> {
        self.write_json(&self.current_path(EDGES_FILE), &edges)?;

        let mut master: Vec<Relationship> = self
            .read_json(&self.master_path(EDGES_FILE))?
            .unwrap_or_default();
        let mut seen: HashSet<_> = master.iter().map(Relationship::key).collect();
        for edge in edges {
            if seen.insert(edge.key()) {
                master.push(edge.clone());
            }
        }
        self.write_json(&self.master_path(EDGES_FILE), &master)?;

        log::debug!("Persisted {} edges", edges.len());
        Ok(())
    }

    /// Load profiles, preferring the master tier (the most complete
    /// history) and falling back to the current tier.
    pub fn load_profiles(&self) -> Result<HashMap<String, Profile>> {
        for path in [
            self.master_path(PROFILES_FILE),
            self.current_path(PROFILES_FILE),
        ] {
            if let Some(profiles) = self.read_json::<HashMap<String, Profile>>(&path)? {
                return Ok(profiles);
            }
        }
        Ok(HashMap::new())
    }

    /// Load edges, preferring the master tier over the current tier.
    pub fn load_edges(&self) -> Result<Vec<Relationship>> {
        for path in [self.master_path(EDGES_FILE), self.current_path(EDGES_FILE)] {
            if let Some(edges) = self.read_json::<Vec<Relationship>>(&path)? {
                return Ok(edges);
            }
        }
        Ok(Vec::new())
    }

    /// Copy the current tier into a timestamped archive directory.
    /// Idempotent per store instance: repeat calls are no-ops and return
    /// `None`.
    pub fn archive_snapshot(&mut self) -> Result<Option<PathBuf>> {
        if self.archived {
            log::debug!("Snapshot already archived for this store instance");
            return Ok(None);
        }

        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let target = self.base_path.join("archive").join(stamp);
        fs::create_dir_all(&target)?;

        let mut copied = 0;
        for file in [PROFILES_FILE, EDGES_FILE] {
            let source = self.current_path(file);
            if source.exists() {
                fs::copy(&source, target.join(file))?;
                copied += 1;
            }
        }

        self.archived = true;
        log::info!(
            "Archived {} snapshot file(s) to {}",
            copied,
            target.display()
        );
        Ok(Some(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelationType;
    use tempfile::TempDir;

    fn profile(id: &str, followers: Option<u64>) -> Profile {
        let mut p = Profile::new(id);
        p.followers = followers;
        p
    }

    fn profiles(entries: &[(&str, Option<u64>)]) -> HashMap<String, Profile> {
        entries
            .iter()
            .map(|(id, f)| (id.to_string(), profile(id, *f)))
            .collect()
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = TieredStore::new(temp.path()).unwrap();

        let p = profiles(&[("alice", Some(10)), ("bob", None)]);
        let edges = vec![Relationship::new("bob", "alice", RelationType::Follower)];
        store.save_profiles(&p).unwrap();
        store.save_edges(&edges).unwrap();

        let loaded = store.load_profiles().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["alice"].followers, Some(10));
        let loaded_edges = store.load_edges().unwrap();
        assert_eq!(loaded_edges.len(), 1);
        assert_eq!(loaded_edges[0].source_id, "bob");
    }

    #[test]
    fn test_idempotent_persist_master_byte_identical() {
        let temp = TempDir::new().unwrap();
        let store = TieredStore::new(temp.path()).unwrap();

        let p = profiles(&[("alice", Some(10)), ("bob", Some(2))]);
        let edges = vec![
            Relationship::new("bob", "alice", RelationType::Follower),
            Relationship::new("carol", "alice", RelationType::Follower),
        ];

        store.save_profiles(&p).unwrap();
        store.save_edges(&edges).unwrap();
        let master_profiles_1 = fs::read(temp.path().join("master/profiles.json")).unwrap();
        let master_edges_1 = fs::read(temp.path().join("master/edges.json")).unwrap();

        store.save_profiles(&p).unwrap();
        store.save_edges(&edges).unwrap();
        let master_profiles_2 = fs::read(temp.path().join("master/profiles.json")).unwrap();
        let master_edges_2 = fs::read(temp.path().join("master/edges.json")).unwrap();

        assert_eq!(master_profiles_1, master_profiles_2);
        assert_eq!(master_edges_1, master_edges_2);
    }

    #[test]
    fn test_master_merge_accumulates_across_stores() {
        let temp = TempDir::new().unwrap();

        // First run sees alice <- bob
        let store1 = TieredStore::new(temp.path()).unwrap();
        store1
            .save_profiles(&profiles(&[("alice", Some(10)), ("bob", None)]))
            .unwrap();
        store1
            .save_edges(&[Relationship::new("bob", "alice", RelationType::Follower)])
            .unwrap();

        // Second run sees only carol <- dave; master keeps both runs
        let store2 = TieredStore::new(temp.path()).unwrap();
        store2
            .save_profiles(&profiles(&[("carol", Some(3)), ("dave", None)]))
            .unwrap();
        store2
            .save_edges(&[Relationship::new("dave", "carol", RelationType::Follower)])
            .unwrap();

        let all = store2.load_profiles().unwrap();
        assert_eq!(all.len(), 4);
        let all_edges = store2.load_edges().unwrap();
        assert_eq!(all_edges.len(), 2);

        // Current tier only holds the second run's view
        let current: HashMap<String, Profile> = serde_json::from_str(
            &fs::read_to_string(temp.path().join("current/profiles.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(current.len(), 2);
        assert!(current.contains_key("carol"));
    }

    #[test]
    fn test_master_edge_merge_ignores_timestamp() {
        let temp = TempDir::new().unwrap();
        let store = TieredStore::new(temp.path()).unwrap();

        let first = Relationship::new("bob", "alice", RelationType::Follower);
        store.save_edges(std::slice::from_ref(&first)).unwrap();

        // Same fact observed later with a different timestamp
        let mut second = first.clone();
        second.discovered_at = second.discovered_at + chrono::Duration::hours(1);
        store.save_edges(&[second]).unwrap();

        assert_eq!(store.load_edges().unwrap().len(), 1);
    }

    #[test]
    fn test_legacy_layout_migrates_into_master() {
        let temp = TempDir::new().unwrap();

        let legacy: HashMap<String, Profile> = profiles(&[("alice", Some(7))]);
        fs::write(
            temp.path().join("profiles.json"),
            serde_json::to_string_pretty(&legacy).unwrap(),
        )
        .unwrap();
        let legacy_edges = vec![Relationship::new("bob", "alice", RelationType::Follower)];
        fs::write(
            temp.path().join("edges.json"),
            serde_json::to_string_pretty(&legacy_edges).unwrap(),
        )
        .unwrap();

        let store = TieredStore::new(temp.path()).unwrap();
        assert!(!temp.path().join("profiles.json").exists());
        assert!(temp.path().join("master/profiles.json").exists());
        assert_eq!(store.load_profiles().unwrap()["alice"].followers, Some(7));
        assert_eq!(store.load_edges().unwrap().len(), 1);

        // Re-opening does not re-run the migration
        let store2 = TieredStore::new(temp.path()).unwrap();
        assert_eq!(store2.load_profiles().unwrap().len(), 1);
    }

    #[test]
    fn test_legacy_file_never_clobbers_master() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("master")).unwrap();

        let master: HashMap<String, Profile> = profiles(&[("alice", Some(1))]);
        fs::write(
            temp.path().join("master/profiles.json"),
            serde_json::to_string_pretty(&master).unwrap(),
        )
        .unwrap();
        let legacy: HashMap<String, Profile> = profiles(&[("zed", Some(9))]);
        fs::write(
            temp.path().join("profiles.json"),
            serde_json::to_string_pretty(&legacy).unwrap(),
        )
        .unwrap();

        let store = TieredStore::new(temp.path()).unwrap();
        let loaded = store.load_profiles().unwrap();
        assert!(loaded.contains_key("alice"));
        assert!(!loaded.contains_key("zed"));
        assert!(temp.path().join("profiles.json").exists());
    }

    #[test]
    fn test_archive_snapshot_is_one_shot() {
        let temp = TempDir::new().unwrap();
        let mut store = TieredStore::new(temp.path()).unwrap();
        store.save_profiles(&profiles(&[("alice", Some(1))])).unwrap();
        store.save_edges(&[]).unwrap();

        let first = store.archive_snapshot().unwrap();
        let target = first.expect("first archive call copies the snapshot");
        assert!(target.join("profiles.json").exists());
        assert!(target.join("edges.json").exists());

        assert!(store.archive_snapshot().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_master_surfaces_state_load() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("master")).unwrap();
        fs::write(temp.path().join("master/profiles.json"), "{ not json").unwrap();

        let store = TieredStore::new(temp.path()).unwrap();
        let err = store.load_profiles().unwrap_err();
        assert!(matches!(err, FollowgraphError::StateLoad { .. }));
    }

    #[test]
    fn test_load_falls_back_to_current() {
        let temp = TempDir::new().unwrap();
        let store = TieredStore::new(temp.path()).unwrap();

        // Only a current-tier file present (e.g. master deleted by hand)
        let current: HashMap<String, Profile> = profiles(&[("alice", Some(4))]);
        fs::write(
            temp.path().join("current/profiles.json"),
            serde_json::to_string_pretty(
                &current.iter().collect::<BTreeMap<_, _>>(),
            )
            .unwrap(),
        )
        .unwrap();

        let loaded = store.load_profiles().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["alice"].followers, Some(4));
    }
}
