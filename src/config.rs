//! Configuration types for the photo organizer

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Subdirectory layout derived from a photo's capture date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SubdirLayout {
    /// Nested year and month: root/YYYY/MM/
    #[default]
    YearMonth,
    /// One folder per day: root/YYYY-MM-DD/
    Daily,
}

/// Configuration for the photo organizer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory to organize in place
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Layout of the dated subdirectories
    #[serde(default)]
    pub layout: SubdirLayout,

    /// Directories to skip while scanning (absolute paths or folder names)
    #[serde(default)]
    pub exclude_dirs: Vec<PathBuf>,

    /// Follow symbolic links while scanning
    #[serde(default)]
    pub follow_links: bool,

    /// Directory for log files (defaults to `Log` beside the executable)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Verbose output
    #[serde(default)]
    pub verbose: bool,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError { source: e })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Photo Organizer Configuration File
# This file uses TOML format (https://toml.io)

# Directory to organize. Images anywhere below it are moved into
# dated subdirectories of this same directory.
root = "D:/Photos"

# Layout: "year-month" or "daily"
# - year-month: root/YYYY/MM/photo.jpg (default)
# - daily:      root/YYYY-MM-DD/photo.jpg
layout = "year-month"

# Directories to skip while scanning
# Can be absolute paths or folder names (will match any folder with that name)
exclude_dirs = [
    ".thumbnails",
    "@eaDir",
]

# Follow symbolic links while scanning
follow_links = false

# Directory for log files (defaults to "Log" beside the executable)
# log_dir = "D:/Logs/photo-organizer"

# Verbose output - log every probe and decision
verbose = false
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError { source: toml::ser::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_layout_is_year_month() {
        let config = Config::default();
        assert_eq!(config.layout, SubdirLayout::YearMonth);
        assert!(config.root.is_none());
        assert!(!config.follow_links);
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(&Config::sample_config()).unwrap();
        assert_eq!(config.root, Some(PathBuf::from("D:/Photos")));
        assert_eq!(config.layout, SubdirLayout::YearMonth);
        assert_eq!(config.exclude_dirs.len(), 2);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("layout = \"daily\"").unwrap();
        assert_eq!(config.layout, SubdirLayout::Daily);
        assert!(config.exclude_dirs.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("organizer.toml");

        let config = Config {
            root: Some(PathBuf::from("/photos")),
            layout: SubdirLayout::Daily,
            exclude_dirs: vec![PathBuf::from(".sync")],
            follow_links: true,
            log_dir: None,
            verbose: true,
        };
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Config::load_from_file(&missing),
            Err(ConfigError::ReadError { .. })
        ));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "layout = [").unwrap();
        let err = Config::load_from_file(&broken).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }
}
