//! CLI argument parsing with clap

use crate::config::{Config, SubdirLayout};
use clap::Parser;
use std::path::PathBuf;

/// Photo Organizer - sort photos into dated folders
///
/// Moves every image below ROOT into ROOT/YYYY/MM (or ROOT/YYYY-MM-DD),
/// dating each photo from its EXIF metadata, falling back to the file's
/// creation and modification times.
#[derive(Parser, Debug)]
#[command(name = "photo-organizer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to organize
    pub root: Option<PathBuf>,

    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long, env = "PHOTO_ORGANIZER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Layout of the dated subdirectories
    #[arg(short, long, value_enum)]
    pub layout: Option<SubdirLayout>,

    /// Directories to skip (absolute paths or folder names)
    #[arg(short = 'x', long = "exclude", num_args = 1..)]
    pub exclude: Option<Vec<PathBuf>>,

    /// Follow symbolic links while scanning
    #[arg(long)]
    pub follow_links: bool,

    /// Directory for log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub sample_config: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref root) = self.root {
            config.root = Some(root.clone());
        }
        if let Some(layout) = self.layout {
            config.layout = layout;
        }
        if let Some(ref exclude) = self.exclude {
            config.exclude_dirs = exclude.clone();
        }
        if self.follow_links {
            config.follow_links = true;
        }
        if let Some(ref log_dir) = self.log_dir {
            config.log_dir = Some(log_dir.clone());
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}
