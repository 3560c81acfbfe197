//! Archive size estimation without building the archive.

use std::fs;
use std::path::Path;

use crate::library::convention::{self, CONSISTENCY_DIR, STYLES_DIR};
use crate::library::CharacterRecord;

/// Deflate rarely wins much on already-compressed PNG data; 70% of the raw
/// size tracks observed archives closely enough for a UI guardrail.
pub const ESTIMATED_COMPRESSION_RATIO: f64 = 0.7;

/// Estimate the archive size for a set of characters.
///
/// Sums the on-disk size of every image that would be packed (metadata files
/// are not counted) and scales by the compression ratio. Returns
/// `(0, "Unknown")` on any I/O error instead of failing.
pub fn estimate_archive_size(records: &[CharacterRecord]) -> (u64, String) {
    match raw_image_bytes(records) {
        Ok(total) => {
            let estimated = (total as f64 * ESTIMATED_COMPRESSION_RATIO) as u64;
            (estimated, format_size(estimated))
        }
        Err(_) => (0, "Unknown".to_string()),
    }
}

fn raw_image_bytes(records: &[CharacterRecord]) -> std::io::Result<u64> {
    let mut total = 0u64;

    for record in records {
        if let Some(base) = &record.base_image_path {
            if base.exists() {
                total += fs::metadata(base)?.len();
            }
        }

        total += png_bytes_in(&record.directory.join(CONSISTENCY_DIR))?;

        for style_dir in convention::subdirectories(&record.directory.join(STYLES_DIR)) {
            total += png_bytes_in(&style_dir)?;
        }
    }

    Ok(total)
}

fn png_bytes_in(dir: &Path) -> std::io::Result<u64> {
    let mut total = 0u64;
    for image in convention::png_images(dir) {
        total += fs::metadata(&image)?.len();
    }
    Ok(total)
}

pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.1} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.1} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.1} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::collections::BTreeMap;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn write_bytes(path: &Path, len: usize) {
        let mut f = File::create(path).unwrap();
        f.write_all(&vec![0u8; len]).unwrap();
    }

    fn record_for(dir: &Path, base: Option<PathBuf>) -> CharacterRecord {
        CharacterRecord {
            session_id: "Session_001".to_string(),
            character_id: "Char_001".to_string(),
            directory: dir.to_path_buf(),
            creation_date: Local::now(),
            base_image_path: base,
            base_metadata: None,
            prompt: None,
            realistic_count: 0,
            styled_counts: BTreeMap::new(),
            total_images: 1,
        }
    }

    #[test]
    fn test_estimate_scales_image_bytes() {
        let root = tempdir().unwrap();
        let dir = root.path().join("char");
        fs::create_dir_all(dir.join(CONSISTENCY_DIR)).unwrap();
        fs::create_dir_all(dir.join(STYLES_DIR).join("ghibli")).unwrap();

        let base = dir.join("Base-Character.png");
        write_bytes(&base, 1000);
        write_bytes(&dir.join(CONSISTENCY_DIR).join("Realistic_001.png"), 500);
        write_bytes(&dir.join(STYLES_DIR).join("ghibli/ghibli_001.png"), 500);
        // Metadata files are not counted.
        write_bytes(&dir.join(CONSISTENCY_DIR).join("Realistic_001_metadata.json"), 9999);

        let record = record_for(&dir, Some(base));
        let (bytes, human) = estimate_archive_size(&[record]);
        assert_eq!(bytes, 1400); // 2000 * 0.7
        assert_eq!(human, "1.4 KB");
    }

    #[test]
    fn test_estimate_empty_selection_is_zero() {
        let (bytes, human) = estimate_archive_size(&[]);
        assert_eq!(bytes, 0);
        assert_eq!(human, "0 bytes");
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
