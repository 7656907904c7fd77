//! EXIF date extraction for images

use super::{DateTag, MetadataSource, TagKind};
use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use exif::{Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::trace;

/// Reads date tags with kamadak-exif. Handles JPEG, TIFF-based RAW, HEIF, PNG and WebP containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifMetadata;

impl MetadataSource for ExifMetadata {
    fn read_dates(&self, path: &Path) -> Result<Vec<DateTag>> {
        let unreadable = |message: String| Error::MetadataUnreadable {
            path: path.to_path_buf(),
            message,
        };

        let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
        let mut reader = BufReader::new(file);

        let exif = Reader::new()
            .read_from_container(&mut reader)
            .map_err(|e| unreadable(e.to_string()))?;

        // Every IFD, thumbnail included, is a candidate section
        let tags = exif
            .fields()
            .filter_map(|field| {
                let kind = tag_kind(field.tag)?;
                let timestamp = ascii_datetime(&field.value)?;
                trace!(?path, ?kind, ifd = ?field.ifd_num, %timestamp, "Found EXIF date");
                Some(DateTag { kind, timestamp })
            })
            .collect();

        Ok(tags)
    }
}

fn tag_kind(tag: Tag) -> Option<TagKind> {
    match tag {
        Tag::DateTimeOriginal => Some(TagKind::DateTimeOriginal),
        Tag::DateTime => Some(TagKind::DateTime),
        Tag::DateTimeDigitized => Some(TagKind::DateTimeDigitized),
        _ => None,
    }
}

fn ascii_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Ascii(parts) => parts
            .iter()
            .find_map(|bytes| parse_exif_datetime(&String::from_utf8_lossy(bytes))),
        _ => None,
    }
}

/// Parse EXIF datetime string format: "YYYY:MM:DD HH:MM:SS"
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches(|c| c == '"' || c == '\0');

    let formats = [
        "%Y:%m:%d %H:%M:%S",
        "%Y:%m:%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];

    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}
