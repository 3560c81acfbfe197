//! Character library: record model, directory conventions, and discovery.

pub mod convention;
pub mod discovery;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

pub use discovery::CharacterLibrary;

/// A discovered character: an immutable snapshot of one character directory.
///
/// Records index files on disk, they do not own them. A record is rebuilt
/// from scratch on every non-cached discovery pass.
#[derive(Debug, Clone)]
pub struct CharacterRecord {
    pub session_id: String,
    pub character_id: String,
    /// Directory holding the character's files.
    pub directory: PathBuf,
    /// Taken from directory metadata; used only for default sort order.
    pub creation_date: DateTime<Local>,
    pub base_image_path: Option<PathBuf>,
    /// Raw generation metadata document, shape not contractually fixed.
    pub base_metadata: Option<serde_json::Value>,
    /// Extracted from `base_metadata` when present.
    pub prompt: Option<String>,
    /// Realistic consistency variations under `ConsistencyTests/`.
    pub realistic_count: usize,
    /// Image count per style subdirectory under `Styles/`.
    pub styled_counts: BTreeMap<String, usize>,
    /// Base image (if any) + realistic + styled. Always recomputed at scan time.
    pub total_images: usize,
}

impl CharacterRecord {
    /// Dedup key for a discovery result set.
    pub fn key(&self) -> (String, String) {
        (self.session_id.clone(), self.character_id.clone())
    }

    pub fn matches(&self, session_id: &str, character_id: &str) -> bool {
        self.session_id == session_id && self.character_id == character_id
    }

    pub fn has_base_image(&self) -> bool {
        self.base_image_path.as_ref().is_some_and(|p| p.exists())
    }

    /// Pick up to `max` representative images: the base image, then up to
    /// three sorted realistic variations, then one image from each of up to
    /// two styles. Paths only, no decoding.
    pub fn preview_images(&self, max: usize) -> Vec<(PathBuf, String)> {
        let mut previews = Vec::new();

        if let Some(base) = &self.base_image_path {
            if base.exists() {
                previews.push((base.clone(), "Base Character".to_string()));
            }
        }

        let consistency = self.directory.join(convention::CONSISTENCY_DIR);
        for (i, img) in convention::realistic_images(&consistency)
            .into_iter()
            .take(3)
            .enumerate()
        {
            previews.push((img, format!("Variation {}", i + 1)));
        }

        let styles = self.directory.join(convention::STYLES_DIR);
        for style_name in self.styled_counts.keys().take(2) {
            let style_dir = styles.join(style_name);
            if let Some(img) = convention::png_images(&style_dir).into_iter().next() {
                previews.push((img, format!("{} Style", style_name)));
            }
        }

        previews.truncate(max);
        previews
    }
}

/// Aggregate statistics over a discovery result set.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryStats {
    pub total_characters: usize,
    pub total_images: usize,
    pub total_sessions: usize,
    pub style_breakdown: BTreeMap<String, usize>,
    pub creation_date_range: Option<DateRange>,
    pub average_images_per_character: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub earliest: String,
    pub latest: String,
}

impl LibraryStats {
    pub fn from_records(records: &[CharacterRecord]) -> Self {
        if records.is_empty() {
            return Self {
                total_characters: 0,
                total_images: 0,
                total_sessions: 0,
                style_breakdown: BTreeMap::new(),
                creation_date_range: None,
                average_images_per_character: 0.0,
            };
        }

        let total_images: usize = records.iter().map(|r| r.total_images).sum();

        let sessions: std::collections::HashSet<&str> =
            records.iter().map(|r| r.session_id.as_str()).collect();

        let mut style_breakdown: BTreeMap<String, usize> = BTreeMap::new();
        for record in records {
            for (style, count) in &record.styled_counts {
                *style_breakdown.entry(style.clone()).or_insert(0) += count;
            }
        }

        let earliest = records.iter().map(|r| r.creation_date).min();
        let latest = records.iter().map(|r| r.creation_date).max();
        let creation_date_range = match (earliest, latest) {
            (Some(e), Some(l)) => Some(DateRange {
                earliest: e.to_rfc3339(),
                latest: l.to_rfc3339(),
            }),
            _ => None,
        };

        Self {
            total_characters: records.len(),
            total_images,
            total_sessions: sessions.len(),
            style_breakdown,
            creation_date_range,
            average_images_per_character: total_images as f64 / records.len() as f64,
        }
    }
}
