//! Breadth-first crawl scheduler with selective re-fetch.
//!
//! The crawler walks outward from a seed account in strict FIFO order,
//! reusing repository state for profiles whose follower fetch was already
//! attempted, pruning hub accounts past the follower threshold, and
//! persisting the repository after every dequeued node so a crash loses at
//! most the in-flight node.

pub mod state;

use chrono::Utc;

use crate::config::CrawlSettings;
use crate::error::Result;
use crate::fetch::ProfileFetcher;
use crate::model::{Profile, Relation, Relationship, RelationType};
use crate::storage::{GraphRepository, RunRecorder};

pub use state::CrawlState;

/// Counters for one crawl invocation, reported by the CLI.
#[derive(Debug, Default, Clone)]
pub struct CrawlReport {
    /// Nodes dequeued and processed (including pruned ones).
    pub visited: usize,
    /// Nodes resolved by a fresh fetcher call.
    pub fetched: usize,
    /// Nodes resolved from the repository cache.
    pub cache_hits: usize,
    /// Nodes dropped by the follower threshold.
    pub pruned: usize,
    /// Nodes skipped after a fetch failure with no cached fallback.
    pub skipped: usize,
    /// New edges added to the repository.
    pub edges_added: usize,
}

pub struct Crawler<'a, F: ProfileFetcher> {
    fetcher: &'a mut F,
    repository: &'a mut GraphRepository,
    recorder: &'a mut RunRecorder,
    settings: &'a CrawlSettings,
}

impl<'a, F: ProfileFetcher> Crawler<'a, F> {
    pub fn new(
        fetcher: &'a mut F,
        repository: &'a mut GraphRepository,
        recorder: &'a mut RunRecorder,
        settings: &'a CrawlSettings,
    ) -> Self {
        Self {
            fetcher,
            repository,
            recorder,
            settings,
        }
    }

    /// Crawl outward from `root`. `max_depth` overrides the configured
    /// depth limit for this invocation.
    pub fn crawl(&mut self, root: &str, max_depth: Option<usize>) -> Result<CrawlReport> {
        let depth_limit = max_depth.unwrap_or(self.settings.max_depth);
        log::info!("Starting crawl at {} (depth={})", root, depth_limit);

        let mut report = CrawlReport::default();
        let mut state = CrawlState::seeded(root);

        while let Some((profile_id, depth)) = state.next() {
            report.visited += 1;

            if depth > depth_limit {
                log::debug!(
                    "Skipping {} because depth {} exceeds limit",
                    profile_id,
                    depth
                );
                continue;
            }

            let cached = self.repository.find_profile(&profile_id).cloned();

            // Cache-vs-fresh decision: a profile whose follower fetch was
            // already attempted is reused, not re-fetched.
            let (profile, neighbors) = match &cached {
                Some(hit) if hit.followers_fetch_attempted => {
                    let mut profile = hit.clone();
                    profile.last_seen_at = Utc::now();
                    let neighbors = if hit.followers_fetched {
                        self.repository.get_followers(&profile_id)
                    } else {
                        Vec::new()
                    };
                    log::debug!(
                        "Using cached data for {} (followers fetched={})",
                        profile_id,
                        hit.followers_fetched
                    );
                    report.cache_hits += 1;
                    (profile, neighbors)
                }
                _ => match self.fetch_profile(&profile_id) {
                    Ok(fetched) => {
                        report.fetched += 1;
                        fetched
                    }
                    Err(e) => {
                        log::error!("Failed to fetch profile {}: {}", profile_id, e);
                        match &cached {
                            Some(fallback) => {
                                let mut fallback = fallback.clone();
                                fallback.last_seen_at = Utc::now();
                                (fallback, Vec::new())
                            }
                            None => {
                                report.skipped += 1;
                                continue;
                            }
                        }
                    }
                },
            };

            // Threshold pruning: hub accounts are dropped entirely,
            // including their own record.
            if self.over_threshold(&profile) {
                log::info!(
                    "Skipping {} due to follower threshold ({} >= {})",
                    profile_id,
                    profile.followers.unwrap_or(0),
                    self.settings.follower_threshold
                );
                report.pruned += 1;
                continue;
            }

            self.recorder.record_profile(&profile);
            self.repository.upsert_profile(profile.clone());

            let mut edges_to_add = Vec::new();
            for neighbor in neighbors {
                if self.over_threshold(&neighbor) {
                    log::debug!("Omitting neighbor {} due to follower threshold", neighbor.id);
                    continue;
                }

                self.recorder.record_profile(&neighbor);
                self.repository.upsert_profile(neighbor.clone());

                // Follower relation: the neighbor follows the subject, so
                // the edge points neighbor -> subject.
                let edge = Relationship::new(
                    neighbor.id.clone(),
                    profile.id.clone(),
                    RelationType::Follower,
                );
                self.recorder.record_edge(&edge);
                edges_to_add.push(edge);

                if depth + 1 <= depth_limit {
                    state.enqueue(&neighbor.id, depth + 1);
                }
            }

            if !edges_to_add.is_empty() {
                report.edges_added += self.repository.bulk_add_edges(edges_to_add);
            }
            // Per-node persistence: bounds data loss to the in-flight node
            self.repository.persist()?;
        }

        log::info!(
            "Crawl finished: {} visited, {} fetched, {} cache hits, {} pruned, {} skipped, {} new edges",
            report.visited,
            report.fetched,
            report.cache_hits,
            report.pruned,
            report.skipped,
            report.edges_added
        );
        Ok(report)
    }

    /// Fetch a profile overview and, when allowed, its follower list.
    ///
    /// Progress flags from any cached record are carried forward so a
    /// fresh fetch never regresses them. The follower list is skipped for
    /// oversized accounts (kept, flagged) and private accounts; an
    /// inaccessible list reclassifies the profile as private.
    fn fetch_profile(&mut self, profile_id: &str) -> Result<(Profile, Vec<Profile>)> {
        let mut profile = self.fetcher.fetch_overview(profile_id)?;
        profile.last_seen_at = Utc::now();

        if let Some(existing) = self.repository.find_profile(profile_id) {
            profile.followers_fetch_attempted |= existing.followers_fetch_attempted;
            profile.followers_fetched |= existing.followers_fetched;
            profile.followers_oversized |= existing.followers_oversized;
        }

        let download_limit = self.settings.followers_download_limit;
        if download_limit > 0 && profile.followers.is_some_and(|f| f >= download_limit) {
            profile.followers_fetch_attempted = true;
            profile.followers_oversized = true;
            log::info!(
                "Skipping follower fetch for {} due to size limit ({} >= {})",
                profile_id,
                profile.followers.unwrap_or(0),
                download_limit
            );
            return Ok((profile, Vec::new()));
        }

        if profile.is_private {
            profile.followers_fetch_attempted = true;
            log::debug!("Profile {} marked as private; skipping connections", profile_id);
            return Ok((profile, Vec::new()));
        }

        let page = match self.fetcher.fetch_connections(
            profile_id,
            Relation::Followers,
            profile.followers,
        ) {
            Ok(page) => page,
            Err(e) => {
                // Overview succeeded; a connection failure is retried on a
                // later run because `attempted` stays unset.
                log::error!("Error while fetching followers for {}: {}", profile_id, e);
                return Ok((profile, Vec::new()));
            }
        };

        if !page.accessible {
            log::debug!("Follower list for {} not accessible", profile_id);
            profile.is_private = true;
            profile.followers_fetch_attempted = true;
            return Ok((profile, Vec::new()));
        }

        profile.followers_fetch_attempted = true;
        if !page.profiles.is_empty() {
            profile.followers_fetched = true;
        }

        Ok((profile, page.profiles))
    }

    fn over_threshold(&self, profile: &Profile) -> bool {
        profile
            .followers
            .is_some_and(|f| f >= self.settings.follower_threshold)
    }
}
