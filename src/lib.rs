//! charlib: discovery and export of AI-generated character image sets.
//!
//! The library scans filesystem roots for character session directories,
//! reconstructs structured records from two generations of on-disk layout,
//! and packages selected characters into reproducible ZIP archives. The
//! image-generation service that produces these trees is an external
//! collaborator; charlib only reads what it left behind.

pub mod config;
pub mod export;
pub mod library;
pub mod logging;

pub use config::Config;
pub use export::{
    cleanup_archive, estimate_archive_size, export_batch, export_character, ExportOutcome,
};
pub use library::{CharacterLibrary, CharacterRecord, LibraryStats};
