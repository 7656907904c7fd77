//! Filesystem access used by the organizer
//!
//! Every blocking filesystem call the engine makes goes through [`FileSystem`],
//! so runs can be exercised against fakes that fail on demand.

use crate::error::{Error, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Filesystem operations needed to scan a tree and relocate files in it
pub trait FileSystem: Send + Sync {
    /// List every regular file below `root`, not descending into directories
    /// for which `skip_dir` returns true
    fn list_tree(&self, root: &Path, skip_dir: &dyn Fn(&Path) -> bool) -> Result<Vec<PathBuf>>;

    /// Create `path` and any missing parents; an existing directory is not an error
    fn create_dirs_if_absent(&self, path: &Path) -> io::Result<()>;

    /// Whether anything exists at `path`
    fn path_exists(&self, path: &Path) -> bool;

    /// Move `from` to `to` with a single rename call, refusing to replace an existing file
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Creation time, if the platform and filesystem record one
    fn creation_time(&self, path: &Path) -> Option<NaiveDateTime>;

    /// Last modification time
    fn modified_time(&self, path: &Path) -> io::Result<NaiveDateTime>;
}

/// The local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs {
    follow_links: bool,
}

impl LocalFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow symbolic links while listing trees
    pub fn with_follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }
}

/// Convert a filesystem timestamp into local wall-clock time
fn to_local(time: SystemTime) -> NaiveDateTime {
    let datetime: DateTime<Local> = time.into();
    datetime.naive_local()
}

impl FileSystem for LocalFs {
    fn list_tree(&self, root: &Path, skip_dir: &dyn Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
        let scan_error = |message: String| Error::Scan {
            root: root.to_path_buf(),
            message,
        };

        let metadata = fs::metadata(root).map_err(|e| scan_error(e.to_string()))?;
        if !metadata.is_dir() {
            return Err(scan_error("not a directory".into()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(self.follow_links)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_type().is_dir() || !skip_dir(e.path()))
        {
            let entry = entry.map_err(|e| scan_error(e.to_string()))?;
            if entry.file_type().is_file() {
                trace!(path = ?entry.path(), "Found file");
                files.push(entry.into_path());
            }
        }

        debug!(?root, count = files.len(), "Listed directory tree");
        Ok(files)
    }

    fn create_dirs_if_absent(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn path_exists(&self, path: &Path) -> bool {
        // symlink_metadata so a dangling link still counts as occupied
        fs::symlink_metadata(path).is_ok()
    }

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        if self.path_exists(to) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "destination already exists",
            ));
        }
        fs::rename(from, to)
    }

    fn creation_time(&self, path: &Path) -> Option<NaiveDateTime> {
        fs::metadata(path).and_then(|m| m.created()).ok().map(to_local)
    }

    fn modified_time(&self, path: &Path) -> io::Result<NaiveDateTime> {
        Ok(to_local(fs::metadata(path)?.modified()?))
    }
}
