//! Supported image format detection by file extension

use std::path::Path;

/// Extensions recognised as images: common raster formats followed by camera RAW formats
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp", "heic",
    "cr2", "nef", "arw", "raw", "rw2", "orf", "raf", "srw", "dng",
];

/// Check if an extension (without the leading dot) is a supported image format
pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|supported| supported.eq_ignore_ascii_case(ext))
}

/// Check if a path names a supported image, judged only by its extension
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(is_supported_extension)
}
