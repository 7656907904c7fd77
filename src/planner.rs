//! Destination planning
//!
//! Maps a capture date to a dated subdirectory of the root and picks a file
//! name there that is not already taken.

use crate::config::SubdirLayout;
use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use chrono::{Datelike, NaiveDateTime};
use regex::Regex;
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

static YEAR_DIR: OnceLock<Regex> = OnceLock::new();
static MONTH_DIR: OnceLock<Regex> = OnceLock::new();
static DAY_DIR: OnceLock<Regex> = OnceLock::new();

fn year_dir() -> &'static Regex {
    YEAR_DIR.get_or_init(|| Regex::new(r"^\d{4}$").expect("valid year pattern"))
}

fn month_dir() -> &'static Regex {
    MONTH_DIR.get_or_init(|| Regex::new(r"^(0[1-9]|1[0-2])$").expect("valid month pattern"))
}

fn day_dir() -> &'static Regex {
    DAY_DIR.get_or_init(|| {
        Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").expect("valid day pattern")
    })
}

impl SubdirLayout {
    /// Relative subdirectory for a capture date
    pub fn subdir(&self, timestamp: &NaiveDateTime) -> PathBuf {
        match self {
            SubdirLayout::YearMonth => {
                let mut dir = PathBuf::from(format!("{:04}", timestamp.year()));
                dir.push(format!("{:02}", timestamp.month()));
                dir
            }
            SubdirLayout::Daily => PathBuf::from(format!(
                "{:04}-{:02}-{:02}",
                timestamp.year(),
                timestamp.month(),
                timestamp.day()
            )),
        }
    }

    /// Whether `relative` (a directory path relative to the root) is a
    /// complete dated directory this layout would produce
    pub fn is_dated_dir(&self, relative: &Path) -> bool {
        let names: Vec<&OsStr> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name),
                _ => None,
            })
            .collect();
        let names: Option<Vec<&str>> = names.iter().map(|n| n.to_str()).collect();

        match (self, names.as_deref()) {
            (SubdirLayout::YearMonth, Some([year, month])) => {
                year_dir().is_match(year) && month_dir().is_match(month)
            }
            (SubdirLayout::Daily, Some([day])) => day_dir().is_match(day),
            _ => false,
        }
    }
}

/// Candidate file names for `file_name`: the name itself, then `stem_1.ext`, `stem_2.ext`, ...
///
/// The counter goes before the last extension. Names without one, including
/// dot-files such as `.hidden`, get the counter appended.
pub fn candidate_names(file_name: &OsStr) -> impl Iterator<Item = OsString> + '_ {
    let path = Path::new(file_name);
    let stem = path.file_stem().unwrap_or(file_name);
    let extension = path.extension();

    std::iter::once(file_name.to_os_string()).chain((1u64..).map(move |n| {
        let mut name = stem.to_os_string();
        name.push(format!("_{}", n));
        if let Some(ext) = extension {
            name.push(".");
            name.push(ext);
        }
        name
    }))
}

/// Compute a free destination for `file_name` under `root` for the given date,
/// creating the dated subdirectory if needed
pub fn plan_destination(
    fs: &dyn FileSystem,
    root: &Path,
    layout: SubdirLayout,
    timestamp: &NaiveDateTime,
    file_name: &OsStr,
) -> Result<PathBuf> {
    let relative = layout.subdir(timestamp);
    let dir = root.join(&relative);

    fs.create_dirs_if_absent(&dir).map_err(|e| Error::Planning {
        path: dir.clone(),
        source: e,
    })?;

    let destination = candidate_names(file_name)
        .map(|name| dir.join(name))
        .find(|candidate| !fs.path_exists(candidate))
        .ok_or_else(|| Error::InvalidFileName {
            path: dir.join(file_name),
        })?;

    debug!(?destination, "Planned destination");
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::LocalFs;
    use crate::time::tests::at;
    use std::fs;
    use tempfile::tempdir;

    fn names(file_name: &str, count: usize) -> Vec<String> {
        candidate_names(OsStr::new(file_name))
            .take(count)
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_subdir_formats() {
        let ts = at(2024, 3, 7);
        assert_eq!(SubdirLayout::YearMonth.subdir(&ts), Path::new("2024").join("03"));
        assert_eq!(SubdirLayout::Daily.subdir(&ts), PathBuf::from("2024-03-07"));
    }

    #[test]
    fn test_candidate_names_insert_before_extension() {
        assert_eq!(names("photo.jpg", 3), ["photo.jpg", "photo_1.jpg", "photo_2.jpg"]);
        assert_eq!(names("archive.tar.gz", 2), ["archive.tar.gz", "archive.tar_1.gz"]);
    }

    #[test]
    fn test_candidate_names_without_extension() {
        assert_eq!(names("IMG1", 3), ["IMG1", "IMG1_1", "IMG1_2"]);
        assert_eq!(names(".hidden", 2), [".hidden", ".hidden_1"]);
    }

    #[test]
    fn test_is_dated_dir() {
        let nested = SubdirLayout::YearMonth;
        assert!(nested.is_dated_dir(Path::new("2024/03")));
        assert!(!nested.is_dated_dir(Path::new("2024")));
        assert!(!nested.is_dated_dir(Path::new("2024/13")));
        assert!(!nested.is_dated_dir(Path::new("trip/03")));
        assert!(!nested.is_dated_dir(Path::new("2024/03/extra")));

        let daily = SubdirLayout::Daily;
        assert!(daily.is_dated_dir(Path::new("2024-03-07")));
        assert!(!daily.is_dated_dir(Path::new("2024-03")));
        assert!(!daily.is_dated_dir(Path::new("2024/03")));
    }

    #[test]
    fn test_plan_destination_creates_subdir() {
        let dir = tempdir().unwrap();
        let dest = plan_destination(
            &LocalFs::new(),
            dir.path(),
            SubdirLayout::YearMonth,
            &at(2023, 11, 2),
            OsStr::new("photo.jpg"),
        )
        .unwrap();

        assert_eq!(dest, dir.path().join("2023").join("11").join("photo.jpg"));
        assert!(dir.path().join("2023/11").is_dir());
        assert!(!dest.exists());
    }

    #[test]
    fn test_plan_destination_twice_with_first_written() {
        let dir = tempdir().unwrap();
        let fs_impl = LocalFs::new();
        let plan = || {
            plan_destination(
                &fs_impl,
                dir.path(),
                SubdirLayout::YearMonth,
                &at(2023, 11, 2),
                OsStr::new("photo.jpg"),
            )
            .unwrap()
        };

        let first = plan();
        assert_eq!(plan(), first);

        fs::write(&first, b"moved").unwrap();
        let second = plan();
        assert_eq!(second.file_name().unwrap(), "photo_1.jpg");
        assert_eq!(second.parent(), first.parent());
    }

    #[test]
    fn test_plan_destination_no_extension_collision() {
        let dir = tempdir().unwrap();
        let day = dir.path().join("2020-01-31");
        fs::create_dir_all(&day).unwrap();
        fs::write(day.join("IMG1"), b"taken").unwrap();

        let dest = plan_destination(
            &LocalFs::new(),
            dir.path(),
            SubdirLayout::Daily,
            &at(2020, 1, 31),
            OsStr::new("IMG1"),
        )
        .unwrap();
        assert_eq!(dest, day.join("IMG1_1"));
    }

    #[test]
    fn test_plan_destination_skips_every_taken_name() {
        let dir = tempdir().unwrap();
        let month = dir.path().join("2020").join("01");
        fs::create_dir_all(&month).unwrap();
        for name in ["a.png", "a_1.png", "a_2.png"] {
            fs::write(month.join(name), b"taken").unwrap();
        }

        let dest = plan_destination(
            &LocalFs::new(),
            dir.path(),
            SubdirLayout::YearMonth,
            &at(2020, 1, 15),
            OsStr::new("a.png"),
        )
        .unwrap();
        assert_eq!(dest, month.join("a_3.png"));
    }

    #[test]
    fn test_plan_destination_blocked_by_file() {
        let dir = tempdir().unwrap();
        // A regular file where the year directory should go
        fs::write(dir.path().join("2020"), b"in the way").unwrap();

        let err = plan_destination(
            &LocalFs::new(),
            dir.path(),
            SubdirLayout::YearMonth,
            &at(2020, 1, 15),
            OsStr::new("a.png"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Planning { .. }));
    }
}
