//! Photo Organizer - sort a photo folder into dated subdirectories
//!
//! This library provides:
//! - Supported image detection by extension
//! - Capture date resolution from EXIF metadata with file time fallbacks
//! - Collision-free destination planning (`YYYY/MM` or `YYYY-MM-DD`)
//! - A cancellable organize engine that reports progress from a background worker

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod filesystem;
pub mod format;
pub mod planner;
pub mod progress;
pub mod time;

pub use cli::Cli;
pub use config::{Config, ConfigError, SubdirLayout};
pub use engine::{
    CancelToken, FileOutcome, FileStatus, OrganizeEngine, RunHandle, RunOutcome, RunPhase,
    RunSummary,
};
pub use error::{Error, Result};
pub use filesystem::{FileSystem, LocalFs};
pub use format::is_supported_image;
pub use planner::{candidate_names, plan_destination};
pub use progress::{ProgressEvent, ProgressSink, RunEvent};
pub use time::exif::ExifMetadata;
pub use time::{CaptureDate, DateResolver, DateSource, DateTag, MetadataSource, TagKind};
