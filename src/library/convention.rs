//! Directory convention parsing for character session trees.
//!
//! Two on-disk shapes are supported, tried in priority order:
//!
//! 1. Standard: `<root>/Session_*/Char_*/`
//! 2. Legacy: any other `<root>/<session>/<character>/` pair where the
//!    character directory holds a `Base-*.png` image or a `*metadata.json`
//!    file.
//!
//! Inside a character directory both shapes look the same:
//!
//! ```text
//! Base-Character.png | Base-Image.png
//! base_character_metadata.json | base_image_metadata.json
//! ConsistencyTests/Realistic_<NNN>.png (+ _metadata.json)
//! Styles/<StyleName>/<StyleName>_<NNN>.png (+ _metadata.json)
//! ```
//!
//! A directory that matches neither shape, or matches but holds zero
//! images, is not a character. That is a negative result, not an error.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::CharacterRecord;

pub const SESSION_PREFIX: &str = "Session_";
pub const CHARACTER_PREFIX: &str = "Char_";
pub const CONSISTENCY_DIR: &str = "ConsistencyTests";
pub const STYLES_DIR: &str = "Styles";
pub const REALISTIC_PREFIX: &str = "Realistic_";

/// Base image filenames, in resolution priority order. First match wins.
pub const BASE_IMAGE_CANDIDATES: &[&str] = &["Base-Character.png", "Base-Image.png"];

/// Metadata filenames, in resolution priority order.
pub const METADATA_CANDIDATES: &[&str] = &["base_character_metadata.json", "base_image_metadata.json"];

/// A directory that may be a character, identified but not yet analyzed.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub session_id: String,
    pub character_id: String,
    pub directory: PathBuf,
}

/// Collect `Session_*/Char_*` candidates under a root.
pub fn standard_candidates(root: &Path) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for session_dir in subdirectories(root) {
        let Some(session_id) = dir_name(&session_dir) else {
            continue;
        };
        if !session_id.starts_with(SESSION_PREFIX) {
            continue;
        }

        for char_dir in subdirectories(&session_dir) {
            let Some(character_id) = dir_name(&char_dir) else {
                continue;
            };
            if !character_id.starts_with(CHARACTER_PREFIX) {
                continue;
            }
            candidates.push(Candidate {
                session_id: session_id.clone(),
                character_id,
                directory: char_dir,
            });
        }
    }

    candidates
}

/// Collect loose-layout candidates under a root: any non-`Session_` top-level
/// directory whose subdirectories look like character folders.
///
/// Dotfile directories and tool cache directories are skipped outright.
pub fn legacy_candidates(root: &Path) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for session_dir in subdirectories(root) {
        let Some(session_id) = dir_name(&session_dir) else {
            continue;
        };
        if session_id.starts_with(SESSION_PREFIX) {
            // Already covered by the standard pass.
            continue;
        }
        if session_id.starts_with('.') || session_id == "__pycache__" {
            continue;
        }

        for char_dir in subdirectories(&session_dir) {
            let Some(character_id) = dir_name(&char_dir) else {
                continue;
            };
            if looks_like_character_dir(&char_dir) {
                debug!(session = %session_id, character = %character_id, "legacy candidate");
                candidates.push(Candidate {
                    session_id: session_id.clone(),
                    character_id,
                    directory: char_dir,
                });
            }
        }
    }

    candidates
}

/// A legacy directory qualifies if it holds at least one `Base-*.png` image
/// or one `*metadata.json` file.
fn looks_like_character_dir(dir: &Path) -> bool {
    files_in(dir).iter().any(|path| {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        (name.starts_with("Base-") && name.ends_with(".png")) || name.ends_with("metadata.json")
    })
}

/// Analyze a candidate character directory into a full record.
///
/// Returns `Ok(None)` when the directory holds no images at all; such
/// directories are noise, not characters. I/O errors on the directory itself
/// propagate so the caller can skip the candidate.
pub fn analyze_candidate(candidate: &Candidate) -> Result<Option<CharacterRecord>> {
    let dir = &candidate.directory;
    let creation_date = directory_creation_time(dir)
        .with_context(|| format!("reading metadata for {}", dir.display()))?;

    let base_image_path = BASE_IMAGE_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists());

    let base_metadata = load_base_metadata(dir);
    let prompt = base_metadata
        .as_ref()
        .and_then(|doc| doc.get("prompt"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let realistic_count = realistic_images(&dir.join(CONSISTENCY_DIR)).len();

    let mut styled_counts = BTreeMap::new();
    for style_dir in subdirectories(&dir.join(STYLES_DIR)) {
        if let Some(style_name) = dir_name(&style_dir) {
            // Style names are taken verbatim; new styles need no code change.
            styled_counts.insert(style_name, png_images(&style_dir).len());
        }
    }

    let total_images = usize::from(base_image_path.is_some())
        + realistic_count
        + styled_counts.values().sum::<usize>();

    if total_images == 0 {
        return Ok(None);
    }

    Ok(Some(CharacterRecord {
        session_id: candidate.session_id.clone(),
        character_id: candidate.character_id.clone(),
        directory: dir.clone(),
        creation_date,
        base_image_path,
        base_metadata,
        prompt,
        realistic_count,
        styled_counts,
        total_images,
    }))
}

/// Try metadata filenames in priority order. A missing or unparsable file is
/// downgraded to "no metadata"; a bad document must never sink a whole scan.
fn load_base_metadata(dir: &Path) -> Option<serde_json::Value> {
    for name in METADATA_CANDIDATES {
        let path = dir.join(name);
        if !path.exists() {
            continue;
        }
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(value) => return Some(value),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "malformed metadata file, ignoring");
                    return None;
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable metadata file, ignoring");
                return None;
            }
        }
    }
    None
}

fn directory_creation_time(dir: &Path) -> Result<DateTime<Local>> {
    let meta = fs::metadata(dir)?;
    // Creation time is not available on every filesystem.
    let stamp = meta.created().or_else(|_| meta.modified())?;
    Ok(DateTime::from(stamp))
}

/// `Realistic_*.png` files in a consistency folder, sorted by name.
pub fn realistic_images(dir: &Path) -> Vec<PathBuf> {
    files_with(dir, |name| {
        name.starts_with(REALISTIC_PREFIX) && name.ends_with(".png")
    })
}

/// All `.png` files directly in a directory, sorted by name.
pub fn png_images(dir: &Path) -> Vec<PathBuf> {
    files_with(dir, |name| name.ends_with(".png"))
}

/// All `.json` files directly in a directory, sorted by name.
pub fn json_files(dir: &Path) -> Vec<PathBuf> {
    files_with(dir, |name| name.ends_with(".json"))
}

fn files_with(dir: &Path, pred: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    files_in(dir)
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(&pred)
        })
        .collect()
}

/// Immediate files of a directory, sorted by name for deterministic output.
fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Immediate subdirectories, sorted by name. A missing directory yields an
/// empty list.
pub fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    dirs.sort();
    dirs
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        File::create(path).unwrap();
    }

    fn make_character(dir: &Path, base: bool, realistic: usize, styles: &[(&str, usize)]) {
        fs::create_dir_all(dir).unwrap();
        if base {
            touch(&dir.join("Base-Character.png"));
        }
        if realistic > 0 {
            let consistency = dir.join(CONSISTENCY_DIR);
            fs::create_dir_all(&consistency).unwrap();
            for i in 1..=realistic {
                touch(&consistency.join(format!("Realistic_{:03}.png", i)));
            }
        }
        for (style, count) in styles {
            let style_dir = dir.join(STYLES_DIR).join(style);
            fs::create_dir_all(&style_dir).unwrap();
            for i in 1..=*count {
                touch(&style_dir.join(format!("{}_{:03}.png", style, i)));
            }
        }
    }

    fn candidate(dir: &Path) -> Candidate {
        Candidate {
            session_id: "Session_001".to_string(),
            character_id: "Char_001".to_string(),
            directory: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_standard_candidates() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("Session_001/Char_001")).unwrap();
        fs::create_dir_all(root.path().join("Session_001/Char_002")).unwrap();
        fs::create_dir_all(root.path().join("Session_001/notes")).unwrap();
        fs::create_dir_all(root.path().join("misc/Char_003")).unwrap();

        let found = standard_candidates(root.path());
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.session_id == "Session_001"));
        assert!(found.iter().any(|c| c.character_id == "Char_001"));
        assert!(found.iter().any(|c| c.character_id == "Char_002"));
    }

    #[test]
    fn test_legacy_candidates_require_character_files() {
        let root = tempdir().unwrap();
        let with_base = root.path().join("20240101/alice");
        fs::create_dir_all(&with_base).unwrap();
        touch(&with_base.join("Base-Character.png"));

        let with_meta = root.path().join("20240101/bob");
        fs::create_dir_all(&with_meta).unwrap();
        touch(&with_meta.join("base_image_metadata.json"));

        // Neither a base image nor metadata: not a candidate.
        fs::create_dir_all(root.path().join("20240101/junk")).unwrap();
        // Hidden and cache directories are skipped.
        fs::create_dir_all(root.path().join(".git/whatever")).unwrap();
        fs::create_dir_all(root.path().join("__pycache__/x")).unwrap();
        // Standard-prefixed sessions belong to the standard pass.
        let standard = root.path().join("Session_9/ignored");
        fs::create_dir_all(&standard).unwrap();
        touch(&standard.join("Base-Character.png"));

        let found = legacy_candidates(root.path());
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.session_id == "20240101"));
    }

    #[test]
    fn test_analyze_counts_and_totals() {
        let root = tempdir().unwrap();
        let dir = root.path().join("char");
        make_character(&dir, true, 2, &[("ghibli", 3), ("rick_morty", 1)]);

        let record = analyze_candidate(&candidate(&dir)).unwrap().unwrap();
        assert_eq!(record.realistic_count, 2);
        assert_eq!(record.styled_counts.get("ghibli"), Some(&3));
        assert_eq!(record.styled_counts.get("rick_morty"), Some(&1));
        assert_eq!(record.total_images, 7);
        assert!(record.base_image_path.is_some());
    }

    #[test]
    fn test_analyze_zero_images_is_not_a_character() {
        let root = tempdir().unwrap();
        let dir = root.path().join("char");
        fs::create_dir_all(&dir).unwrap();
        // Metadata alone does not make a character.
        let mut f = File::create(dir.join("base_character_metadata.json")).unwrap();
        f.write_all(b"{\"prompt\": \"a wizard\"}").unwrap();

        assert!(analyze_candidate(&candidate(&dir)).unwrap().is_none());
    }

    #[test]
    fn test_base_image_priority_order() {
        let root = tempdir().unwrap();
        let dir = root.path().join("char");
        fs::create_dir_all(&dir).unwrap();
        touch(&dir.join("Base-Image.png"));
        touch(&dir.join("Base-Character.png"));

        let record = analyze_candidate(&candidate(&dir)).unwrap().unwrap();
        assert_eq!(
            record.base_image_path.unwrap().file_name().unwrap(),
            "Base-Character.png"
        );
    }

    #[test]
    fn test_malformed_metadata_is_ignored() {
        let root = tempdir().unwrap();
        let dir = root.path().join("char");
        fs::create_dir_all(&dir).unwrap();
        touch(&dir.join("Base-Character.png"));
        let mut f = File::create(dir.join("base_character_metadata.json")).unwrap();
        f.write_all(b"{ not json").unwrap();

        let record = analyze_candidate(&candidate(&dir)).unwrap().unwrap();
        assert!(record.base_metadata.is_none());
        assert!(record.prompt.is_none());
        assert_eq!(record.total_images, 1);
    }

    #[test]
    fn test_prompt_extracted_from_metadata() {
        let root = tempdir().unwrap();
        let dir = root.path().join("char");
        fs::create_dir_all(&dir).unwrap();
        touch(&dir.join("Base-Character.png"));
        let mut f = File::create(dir.join("base_character_metadata.json")).unwrap();
        f.write_all(br#"{"prompt": "a tall wizard", "extra_field": 42}"#)
            .unwrap();

        let record = analyze_candidate(&candidate(&dir)).unwrap().unwrap();
        assert_eq!(record.prompt.as_deref(), Some("a tall wizard"));
        assert!(record.base_metadata.is_some());
    }

    #[test]
    fn test_realistic_count_ignores_other_files() {
        let root = tempdir().unwrap();
        let dir = root.path().join("char");
        let consistency = dir.join(CONSISTENCY_DIR);
        fs::create_dir_all(&consistency).unwrap();
        touch(&consistency.join("Realistic_001.png"));
        touch(&consistency.join("Realistic_001_metadata.json"));
        touch(&consistency.join("notes.txt"));

        let record = analyze_candidate(&candidate(&dir)).unwrap().unwrap();
        assert_eq!(record.realistic_count, 1);
        assert_eq!(record.total_images, 1);
    }
}
