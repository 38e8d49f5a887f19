//! Per-run manifest: exactly the profiles and edges touched during the
//! current process invocation, independent of the cumulative store.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{EdgeKey, Profile, Relationship};
use crate::storage::repository::GraphRepository;

/// Metadata block written alongside the manifest's profile and edge files.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub root_id: String,
    pub root_display_name: Option<String>,
    pub profile_count: usize,
    pub edge_count: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct RunRecorder {
    profile_ids: BTreeSet<String>,
    edge_keys: HashSet<EdgeKey>,
    edges: Vec<Relationship>,
}

impl RunRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_profile(&mut self, profile: &Profile) {
        self.profile_ids.insert(profile.id.clone());
    }

    pub fn record_edge(&mut self, edge: &Relationship) {
        if self.edge_keys.insert(edge.key()) {
            self.edges.push(edge.clone());
        }
    }

    pub fn profile_count(&self) -> usize {
        self.profile_ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Write a self-contained manifest for this run under
    /// `results_dir/<timestamp>_<slug>/`. Profile records are resolved
    /// against the repository at write time so the manifest reflects their
    /// final merged state.
    pub fn write_manifest(
        &self,
        results_dir: &Path,
        root_id: &str,
        repository: &GraphRepository,
    ) -> Result<PathBuf> {
        let root_display_name = repository
            .find_profile(root_id)
            .and_then(|p| p.display_name.clone());
        let slug = slugify(root_display_name.as_deref().unwrap_or(root_id));

        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
        let run_dir = results_dir.join(format!("{}_{}", stamp, slug));
        fs::create_dir_all(&run_dir)?;

        let profiles: BTreeMap<&String, &Profile> = self
            .profile_ids
            .iter()
            .filter_map(|id| repository.find_profile(id).map(|p| (&p.id, p)))
            .collect();

        let metadata = RunMetadata {
            run_id: Uuid::new_v4(),
            root_id: root_id.to_string(),
            root_display_name,
            profile_count: profiles.len(),
            edge_count: self.edges.len(),
            generated_at: Utc::now(),
        };

        fs::write(
            run_dir.join("profiles.json"),
            serde_json::to_string_pretty(&profiles)?,
        )?;
        fs::write(
            run_dir.join("edges.json"),
            serde_json::to_string_pretty(&self.edges)?,
        )?;
        fs::write(
            run_dir.join("metadata.json"),
            serde_json::to_string_pretty(&metadata)?,
        )?;

        log::info!(
            "Wrote run manifest ({} profiles, {} edges) to {}",
            metadata.profile_count,
            metadata.edge_count,
            run_dir.display()
        );
        Ok(run_dir)
    }
}

/// Filesystem-safe slug from a display name: lowercase alphanumerics with
/// single dashes.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "run".to_string()
    } else {
        slug
    }
}
