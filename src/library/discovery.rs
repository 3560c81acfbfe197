//! Character discovery over configured scan roots, with a freshness-window
//! cache.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::convention::{self, Candidate};
use super::{CharacterRecord, LibraryStats};

pub const DEFAULT_CACHE_SECS: u64 = 30;

/// One discovery pass, kept until it ages out or is invalidated. Replaced
/// wholesale on refresh, never patched.
struct ScanCache {
    records: Vec<CharacterRecord>,
    last_scan: Instant,
}

/// Discovers characters under a set of scan roots.
///
/// Results are cached for a freshness window (default 30 seconds); callers
/// can bypass the cache with `force_refresh`. Scanning failures in a single
/// root or candidate directory are logged and skipped, they never abort the
/// pass.
pub struct CharacterLibrary {
    roots: Vec<PathBuf>,
    cache_window: Duration,
    cache: Option<ScanCache>,
}

impl CharacterLibrary {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self::with_cache_window(roots, Duration::from_secs(DEFAULT_CACHE_SECS))
    }

    pub fn with_cache_window(roots: Vec<PathBuf>, cache_window: Duration) -> Self {
        Self {
            roots,
            cache_window,
            cache: None,
        }
    }

    /// Discover all characters, newest first.
    ///
    /// Returns the cached list when it is still fresh and `force_refresh` is
    /// not set.
    pub fn discover(&mut self, force_refresh: bool) -> Vec<CharacterRecord> {
        if !force_refresh {
            if let Some(cache) = &self.cache {
                if cache.last_scan.elapsed() < self.cache_window {
                    debug!(count = cache.records.len(), "returning cached character list");
                    return cache.records.clone();
                }
            }
        }

        let mut records = Vec::new();
        for root in &self.roots {
            if !root.exists() {
                debug!(root = %root.display(), "scan root does not exist, skipping");
                continue;
            }
            records.extend(scan_root(root));
        }

        let mut records = dedup_records(records);
        sort_newest_first(&mut records);

        info!(count = records.len(), "character discovery complete");

        self.cache = Some(ScanCache {
            records: records.clone(),
            last_scan: Instant::now(),
        });
        records
    }

    /// Force a rescan regardless of cache freshness.
    pub fn refresh(&mut self) -> Vec<CharacterRecord> {
        self.discover(true)
    }

    /// Drop the cache so the next `discover` rescans.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Look up one character by identity. Linear scan; collections are
    /// expected to stay in the low hundreds.
    pub fn find(&mut self, session_id: &str, character_id: &str) -> Option<CharacterRecord> {
        self.discover(false)
            .into_iter()
            .find(|r| r.matches(session_id, character_id))
    }

    /// Aggregate statistics over the current (possibly cached) result set.
    pub fn statistics(&mut self) -> LibraryStats {
        let records = self.discover(false);
        LibraryStats::from_records(&records)
    }

    /// Delete a character directory and everything under it.
    ///
    /// Soft outcome: `(success, message)`. The cache is invalidated on
    /// success so the next discovery reflects the removal.
    pub fn delete(&mut self, record: &CharacterRecord) -> (bool, String) {
        if !record.directory.exists() {
            return (
                false,
                format!("Character directory not found: {}", record.directory.display()),
            );
        }
        match std::fs::remove_dir_all(&record.directory) {
            Ok(()) => {
                self.invalidate();
                (
                    true,
                    format!("Character {} deleted", record.character_id),
                )
            }
            Err(e) => (false, format!("Error deleting character: {}", e)),
        }
    }
}

/// Scan one root: standard pass first, then legacy. Standard results come
/// first so they win the later first-seen-wins dedup.
fn scan_root(root: &Path) -> Vec<CharacterRecord> {
    let mut records = Vec::new();

    let mut candidates = convention::standard_candidates(root);
    candidates.extend(convention::legacy_candidates(root));
    debug!(root = %root.display(), candidates = candidates.len(), "scanning root");

    for candidate in candidates {
        records.extend(analyze_or_skip(&candidate));
    }
    records
}

fn analyze_or_skip(candidate: &Candidate) -> Option<CharacterRecord> {
    match convention::analyze_candidate(candidate) {
        Ok(Some(record)) => {
            debug!(
                session = %record.session_id,
                character = %record.character_id,
                images = record.total_images,
                "analyzed character"
            );
            Some(record)
        }
        Ok(None) => None,
        Err(e) => {
            warn!(
                session = %candidate.session_id,
                character = %candidate.character_id,
                error = %e,
                "failed to analyze character directory, skipping"
            );
            None
        }
    }
}

/// First-seen-wins dedup on `(session_id, character_id)`.
fn dedup_records(records: Vec<CharacterRecord>) -> Vec<CharacterRecord> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.key()) {
            unique.push(record);
        } else {
            debug!(
                session = %record.session_id,
                character = %record.character_id,
                "skipping duplicate character"
            );
        }
    }
    unique
}

/// Newest first; stable, so equal timestamps keep insertion order.
fn sort_newest_first(records: &mut [CharacterRecord]) {
    records.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
}
