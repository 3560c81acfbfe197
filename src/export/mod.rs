//! Deterministic ZIP export of character records.
//!
//! Archive layout is part of the tool's compatibility surface: archives must
//! match the layout of previously exported ones entry for entry. Directory
//! listings are sorted before writing so repeated builds over an unchanged
//! tree produce identical entry order.

pub mod estimate;
pub mod summary;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::library::convention::{self, CONSISTENCY_DIR, STYLES_DIR};
use crate::library::CharacterRecord;

pub use estimate::{estimate_archive_size, format_size};

/// Staging directories are named so cleanup can recognize its own leftovers.
const STAGING_PREFIX: &str = "charlib-export-";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no characters selected")]
    EmptySelection,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Soft result of an export operation. Failures carry a user-facing message
/// instead of propagating an error across the library boundary.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub success: bool,
    pub message: String,
    pub archive_path: Option<PathBuf>,
}

impl ExportOutcome {
    fn ok(message: String, path: PathBuf) -> Self {
        Self {
            success: true,
            message,
            archive_path: Some(path),
        }
    }

    fn fail(message: String) -> Self {
        Self {
            success: false,
            message,
            archive_path: None,
        }
    }
}

/// Export one character as a ZIP archive.
///
/// The archive lands in a uniquely named staging directory; the caller owns
/// eventual cleanup via [`cleanup_archive`].
pub fn export_character(record: &CharacterRecord, include_metadata: bool) -> ExportOutcome {
    match build_single(record, include_metadata) {
        Ok((path, size)) => {
            info!(character = %record.character_id, path = %path.display(), "character archive built");
            let name = path.file_name().map(|n| n.to_string_lossy().to_string());
            ExportOutcome::ok(
                format!(
                    "ZIP created successfully: {} ({})",
                    name.unwrap_or_default(),
                    format_size(size)
                ),
                path,
            )
        }
        Err(e) => {
            warn!(character = %record.character_id, error = %e, "character export failed");
            ExportOutcome::fail(format!("Error creating ZIP: {}", e))
        }
    }
}

/// Export several characters into one archive, each under a
/// `<session_id>_<character_id>/` folder.
pub fn export_batch(records: &[CharacterRecord], include_metadata: bool) -> ExportOutcome {
    match build_batch(records, include_metadata) {
        Ok((path, size)) => {
            info!(characters = records.len(), path = %path.display(), "batch archive built");
            ExportOutcome::ok(
                format!(
                    "Batch ZIP created: {} characters ({})",
                    records.len(),
                    format_size(size)
                ),
                path,
            )
        }
        Err(ExportError::EmptySelection) => {
            ExportOutcome::fail("No characters selected".to_string())
        }
        Err(e) => {
            warn!(error = %e, "batch export failed");
            ExportOutcome::fail(format!("Error creating batch ZIP: {}", e))
        }
    }
}

fn build_single(
    record: &CharacterRecord,
    include_metadata: bool,
) -> Result<(PathBuf, u64), ExportError> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = staging_path(&format!("{}_{}.zip", record.character_id, stamp))?;

    let file = File::create(&path)?;
    let mut zip = ZipWriter::new(file);
    let options = deflate_options();

    write_character_entries(&mut zip, options, record, "", include_metadata)?;
    if include_metadata {
        zip.start_file("README.txt", options)?;
        zip.write_all(summary::character_readme(record).as_bytes())?;
    }
    zip.finish()?;

    let size = fs::metadata(&path)?.len();
    Ok((path, size))
}

fn build_batch(
    records: &[CharacterRecord],
    include_metadata: bool,
) -> Result<(PathBuf, u64), ExportError> {
    if records.is_empty() {
        return Err(ExportError::EmptySelection);
    }

    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = staging_path(&format!("Characters_Batch_{}.zip", stamp))?;

    let file = File::create(&path)?;
    let mut zip = ZipWriter::new(file);
    let options = deflate_options();

    for record in records {
        let prefix = format!("{}_{}/", record.session_id, record.character_id);
        write_character_entries(&mut zip, options, record, &prefix, include_metadata)?;
    }

    if include_metadata {
        zip.start_file("batch_summary.json", options)?;
        zip.write_all(serde_json::to_string_pretty(&summary::batch_summary(records))?.as_bytes())?;
        zip.start_file("README.txt", options)?;
        zip.write_all(summary::batch_readme(records).as_bytes())?;
    }
    zip.finish()?;

    let size = fs::metadata(&path)?.len();
    Ok((path, size))
}

/// Write one character's entries under `prefix` ("" for single-character
/// archives, `<session>_<character>/` for batch members).
fn write_character_entries(
    zip: &mut ZipWriter<File>,
    options: SimpleFileOptions,
    record: &CharacterRecord,
    prefix: &str,
    include_metadata: bool,
) -> Result<(), ExportError> {
    // Base image, original filename preserved at the character root.
    if let Some(base) = &record.base_image_path {
        if let Some(name) = base.file_name().and_then(|n| n.to_str()) {
            add_file(zip, options, base, &format!("{}{}", prefix, name))?;
        }
    }

    if include_metadata {
        if let Some(doc) = &record.base_metadata {
            zip.start_file(format!("{}base_character_metadata.json", prefix), options)?;
            zip.write_all(serde_json::to_string_pretty(doc)?.as_bytes())?;
        }
    }

    let consistency = record.directory.join(CONSISTENCY_DIR);
    for image in convention::png_images(&consistency) {
        add_named(zip, options, &image, prefix, CONSISTENCY_DIR)?;
    }
    if include_metadata {
        for meta in convention::json_files(&consistency) {
            add_named(zip, options, &meta, prefix, CONSISTENCY_DIR)?;
        }
    }

    for style_dir in convention::subdirectories(&record.directory.join(STYLES_DIR)) {
        let Some(style_name) = style_dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let folder = format!("{}/{}", STYLES_DIR, style_name);
        for image in convention::png_images(&style_dir) {
            add_named(zip, options, &image, prefix, &folder)?;
        }
        if include_metadata {
            for meta in convention::json_files(&style_dir) {
                add_named(zip, options, &meta, prefix, &folder)?;
            }
        }
    }

    if include_metadata {
        zip.start_file(format!("{}character_summary.json", prefix), options)?;
        zip.write_all(
            serde_json::to_string_pretty(&summary::character_summary(record))?.as_bytes(),
        )?;
    }

    Ok(())
}

fn add_named(
    zip: &mut ZipWriter<File>,
    options: SimpleFileOptions,
    src: &Path,
    prefix: &str,
    folder: &str,
) -> Result<(), ExportError> {
    let Some(name) = src.file_name().and_then(|n| n.to_str()) else {
        return Ok(());
    };
    add_file(zip, options, src, &format!("{}{}/{}", prefix, folder, name))
}

/// Copy a file into the archive. A file that vanished between discovery and
/// export is skipped, not fatal; the source is opened before the entry is
/// started so a miss leaves no empty entry behind.
fn add_file(
    zip: &mut ZipWriter<File>,
    options: SimpleFileOptions,
    src: &Path,
    arcname: &str,
) -> Result<(), ExportError> {
    let mut file = match File::open(src) {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %src.display(), error = %e, "file disappeared during export, skipping");
            return Ok(());
        }
    };
    zip.start_file(arcname, options)?;
    io::copy(&mut file, zip)?;
    Ok(())
}

fn deflate_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn staging_path(file_name: &str) -> Result<PathBuf, ExportError> {
    let dir = tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir()?;
    Ok(dir.keep().join(file_name))
}

/// Remove an exported archive and, when empty, its staging directory.
/// Failures are logged, never propagated.
pub fn cleanup_archive(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "could not remove exported archive");
        return;
    }
    if let Some(parent) = path.parent() {
        let is_staging = parent
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(STAGING_PREFIX));
        if is_staging {
            let _ = fs::remove_dir(parent);
        }
    }
}
