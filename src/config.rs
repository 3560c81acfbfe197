use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Directories scanned for character sessions.
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,

    /// How long a discovery result stays fresh before a rescan.
    #[serde(default = "default_cache_secs")]
    pub cache_secs: u64,
}

fn default_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_cache_secs() -> u64 {
    30
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            cache_secs: default_cache_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Warn before building a batch whose estimated size exceeds this.
    #[serde(default = "default_size_warning_mb")]
    pub size_warning_mb: u64,

    #[serde(default = "default_include_metadata")]
    pub include_metadata_by_default: bool,
}

fn default_size_warning_mb() -> u64 {
    100
}

fn default_include_metadata() -> bool {
    true
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            size_warning_mb: default_size_warning_mb(),
            include_metadata_by_default: default_include_metadata(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("charlib")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.library.roots, vec![PathBuf::from(".")]);
        assert_eq!(config.library.cache_secs, 30);
        assert_eq!(config.export.size_warning_mb, 100);
        assert!(config.export.include_metadata_by_default);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"[library]\nroots = [\"/data/characters\"]\n")
            .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.library.roots, vec![PathBuf::from("/data/characters")]);
        assert_eq!(config.library.cache_secs, 30);
        assert_eq!(config.export.size_warning_mb, 100);
    }

    #[test]
    fn test_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.library.cache_secs, config.library.cache_secs);
    }
}
