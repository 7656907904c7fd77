//! Capture date resolution
//!
//! A photo's date is resolved through an ordered chain of probes, first hit wins:
//! 1. Embedded metadata tags: DateTimeOriginal, then DateTime, then DateTimeDigitized
//! 2. File system creation time, where the platform records one
//! 3. File system modification time
//!
//! Resolution never fails. Unreadable metadata is logged and skipped.

pub mod exif;

use crate::error::Result;
use crate::filesystem::FileSystem;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// Kind of date tag found in embedded metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TagKind {
    /// When the original image was taken
    DateTimeOriginal,
    /// When the file was last changed by the camera or software
    DateTime,
    /// When the image was digitized
    DateTimeDigitized,
}

/// Metadata tags to try, in priority order
pub const TAG_PRIORITY: [TagKind; 3] = [
    TagKind::DateTimeOriginal,
    TagKind::DateTime,
    TagKind::DateTimeDigitized,
];

/// A dated tag read from a file's embedded metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTag {
    pub kind: TagKind,
    pub timestamp: NaiveDateTime,
}

/// Reads the dated tags embedded in a file
pub trait MetadataSource: Send + Sync {
    /// Every parseable date tag across all metadata sections, in file order.
    /// Fails with [`crate::Error::MetadataUnreadable`] when the file's metadata cannot be read.
    fn read_dates(&self, path: &Path) -> Result<Vec<DateTag>>;
}

/// Source of a resolved capture date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateSource {
    /// An embedded metadata tag
    Metadata(TagKind),
    /// File system creation time
    Created,
    /// File system modification time
    Modified,
    /// Nothing was readable, the current time was used
    Now,
}

/// Resolved capture date of a photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaptureDate {
    /// The resolved timestamp, local wall-clock time
    pub timestamp: NaiveDateTime,
    /// Where it came from
    pub source: DateSource,
}

impl CaptureDate {
    fn new(timestamp: NaiveDateTime, source: DateSource) -> Self {
        Self { timestamp, source }
    }
}

/// Picks the highest-priority tag present, whatever section it came from
pub fn best_tag(tags: &[DateTag]) -> Option<CaptureDate> {
    TAG_PRIORITY.iter().find_map(|kind| {
        tags.iter()
            .find(|tag| tag.kind == *kind)
            .map(|tag| CaptureDate::new(tag.timestamp, DateSource::Metadata(tag.kind)))
    })
}

/// Resolves capture dates from metadata with filesystem fallbacks
pub struct DateResolver<'a> {
    metadata: &'a dyn MetadataSource,
    fs: &'a dyn FileSystem,
}

impl<'a> DateResolver<'a> {
    pub fn new(metadata: &'a dyn MetadataSource, fs: &'a dyn FileSystem) -> Self {
        Self { metadata, fs }
    }

    /// Resolve the capture date of `path`. Always returns a date.
    pub fn resolve(&self, path: &Path) -> CaptureDate {
        self.metadata_probe(path)
            .or_else(|| self.creation_probe(path))
            .unwrap_or_else(|| self.modified_fallback(path))
    }

    fn metadata_probe(&self, path: &Path) -> Option<CaptureDate> {
        let tags = match self.metadata.read_dates(path) {
            Ok(tags) => tags,
            Err(e) => {
                warn!(?path, error = %e, "Could not read metadata, falling back to file dates");
                return None;
            }
        };

        let found = best_tag(&tags);
        match &found {
            Some(date) => debug!(?path, source = ?date.source, "Extracted date from metadata"),
            None => debug!(?path, "No usable date tag in metadata"),
        }
        found
    }

    fn creation_probe(&self, path: &Path) -> Option<CaptureDate> {
        let created = self.fs.creation_time(path)?;
        debug!(?path, "Using file system creation time");
        Some(CaptureDate::new(created, DateSource::Created))
    }

    fn modified_fallback(&self, path: &Path) -> CaptureDate {
        match self.fs.modified_time(path) {
            Ok(modified) => {
                debug!(?path, "Using file system modification time");
                CaptureDate::new(modified, DateSource::Modified)
            }
            Err(e) => {
                warn!(?path, error = %e, "No readable file time, using current time");
                CaptureDate::new(Local::now().naive_local(), DateSource::Now)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use crate::filesystem::LocalFs;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::io;
    use std::path::PathBuf;

    pub(crate) fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    /// Metadata keyed by file name; unknown names are unreadable
    #[derive(Default)]
    pub(crate) struct FakeMetadata {
        pub(crate) tags: HashMap<String, Vec<DateTag>>,
    }

    impl FakeMetadata {
        pub(crate) fn with(mut self, name: &str, tags: Vec<DateTag>) -> Self {
            self.tags.insert(name.to_string(), tags);
            self
        }
    }

    impl MetadataSource for FakeMetadata {
        fn read_dates(&self, path: &Path) -> Result<Vec<DateTag>> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            self.tags
                .get(&name)
                .cloned()
                .ok_or_else(|| Error::MetadataUnreadable {
                    path: path.to_path_buf(),
                    message: "no metadata".into(),
                })
        }
    }

    /// File times without touching the disk
    struct FakeTimes {
        created: Option<NaiveDateTime>,
        modified: Option<NaiveDateTime>,
    }

    impl FileSystem for FakeTimes {
        fn list_tree(&self, _: &Path, _: &dyn Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }
        fn create_dirs_if_absent(&self, _: &Path) -> io::Result<()> {
            Ok(())
        }
        fn path_exists(&self, _: &Path) -> bool {
            false
        }
        fn move_file(&self, _: &Path, _: &Path) -> io::Result<()> {
            Ok(())
        }
        fn creation_time(&self, _: &Path) -> Option<NaiveDateTime> {
            self.created
        }
        fn modified_time(&self, _: &Path) -> io::Result<NaiveDateTime> {
            self.modified.ok_or_else(|| io::Error::other("gone"))
        }
    }

    fn tag(kind: TagKind, timestamp: NaiveDateTime) -> DateTag {
        DateTag { kind, timestamp }
    }

    static TIMES: FakeTimes = FakeTimes {
        created: None,
        modified: None,
    };

    #[test]
    fn test_original_beats_other_tags() {
        let metadata = FakeMetadata::default().with(
            "a.jpg",
            vec![
                tag(TagKind::DateTimeDigitized, at(2020, 1, 1)),
                tag(TagKind::DateTime, at(2021, 1, 1)),
                tag(TagKind::DateTimeOriginal, at(2019, 7, 4)),
            ],
        );
        let resolver = DateResolver::new(&metadata, &TIMES);
        let date = resolver.resolve(Path::new("a.jpg"));
        assert_eq!(date.timestamp, at(2019, 7, 4));
        assert_eq!(date.source, DateSource::Metadata(TagKind::DateTimeOriginal));
    }

    #[test]
    fn test_datetime_beats_digitized() {
        let metadata = FakeMetadata::default().with(
            "a.jpg",
            vec![
                tag(TagKind::DateTimeDigitized, at(2020, 1, 1)),
                tag(TagKind::DateTime, at(2021, 2, 2)),
            ],
        );
        let date = DateResolver::new(&metadata, &TIMES).resolve(Path::new("a.jpg"));
        assert_eq!(date.timestamp, at(2021, 2, 2));
    }

    #[test]
    fn test_only_digitized_tag() {
        let metadata = FakeMetadata::default()
            .with("a.jpg", vec![tag(TagKind::DateTimeDigitized, at(2018, 3, 9))]);
        let times = FakeTimes {
            created: Some(at(2024, 1, 1)),
            modified: Some(at(2024, 2, 2)),
        };
        let date = DateResolver::new(&metadata, &times).resolve(Path::new("a.jpg"));
        assert_eq!(date.timestamp, at(2018, 3, 9));
        assert_eq!(date.source, DateSource::Metadata(TagKind::DateTimeDigitized));
    }

    #[test]
    fn test_unreadable_metadata_uses_creation_time() {
        let metadata = FakeMetadata::default();
        let times = FakeTimes {
            created: Some(at(2022, 5, 5)),
            modified: Some(at(2023, 6, 6)),
        };
        let date = DateResolver::new(&metadata, &times).resolve(Path::new("broken.jpg"));
        assert_eq!(date, CaptureDate::new(at(2022, 5, 5), DateSource::Created));
    }

    #[test]
    fn test_no_tags_and_no_creation_uses_modified() {
        let metadata = FakeMetadata::default().with("a.png", Vec::new());
        let times = FakeTimes {
            created: None,
            modified: Some(at(2023, 6, 6)),
        };
        let date = DateResolver::new(&metadata, &times).resolve(Path::new("a.png"));
        assert_eq!(date, CaptureDate::new(at(2023, 6, 6), DateSource::Modified));
    }

    #[test]
    fn test_nothing_readable_still_resolves() {
        let metadata = FakeMetadata::default();
        let date = DateResolver::new(&metadata, &TIMES).resolve(Path::new("vanished.jpg"));
        assert_eq!(date.source, DateSource::Now);
    }

    #[test]
    fn test_garbage_file_on_disk_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_really.jpg");
        std::fs::write(&path, b"\x00\x01 definitely not an image").unwrap();

        let metadata = super::exif::ExifMetadata;
        let fs = LocalFs::new();
        let date = DateResolver::new(&metadata, &fs).resolve(&path);
        assert!(matches!(date.source, DateSource::Created | DateSource::Modified));
    }

    #[test]
    fn test_best_tag_empty() {
        assert!(best_tag(&[]).is_none());
    }
}
