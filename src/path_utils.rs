//! Path utilities for safe and consistent file path handling.
//!
//! Every place that compares two paths (illustration designation lookups, external
//! illustration deduplication, provenance of loaded images) goes through
//! [`normalize_path`], so the comparison rule is the same everywhere: the canonical
//! absolute path when the file exists, the lexically absolute path otherwise.

use crate::error::{Error, Result};

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Image extensions accepted in folder mode (compared case-insensitively).
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tiff", "gif"];

/// Gets the file name from a path with fallback to lossy conversion.
pub fn get_file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Converts a path to a string with fallback to lossy conversion.
pub fn path_to_string_lossy(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Returns the extension of `path` including its leading dot, or an empty string.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Checks whether the path carries one of the [`SUPPORTED_IMAGE_EXTENSIONS`].
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Checks if a path contains characters the platform's file system cannot store.
///
/// NUL is rejected everywhere; `< > " | ? *` only on Windows, where they are reserved.
///
/// # Arguments
///
/// * `path` - The path to validate
///
/// # Returns
///
/// * `Result<()>` - Ok if the path is valid, or an error describing the issue
pub fn validate_path(path: &Path) -> Result<()> {
    let path_str = path_to_string_lossy(path);

    // Skip the Windows verbatim prefix (\\?\), its question mark is legitimate
    let path_to_check = path_str.strip_prefix(r"\\?\").unwrap_or(&path_str);

    if path_to_check.chars().any(is_reserved_path_char) {
        return Err(Error::InvalidPath(
            path.to_path_buf(),
            "Path contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

#[cfg(windows)]
fn is_reserved_path_char(c: char) -> bool {
    matches!(c, '\0' | '<' | '>' | '"' | '|' | '?' | '*')
}

#[cfg(not(windows))]
fn is_reserved_path_char(c: char) -> bool {
    c == '\0'
}

/// Normalizes a path into the single form used for every path comparison.
///
/// Existing paths are canonicalized (symlinks, `.` and `..` resolved). Paths that do not
/// exist yet are made absolute against the current directory without touching the disk.
///
/// # Arguments
///
/// * `path` - The path to normalize
///
/// # Returns
///
/// * `Result<PathBuf>` - The normalized, absolute path
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    match path.canonicalize() {
        Ok(canonical) => Ok(canonical),
        Err(e) => {
            if path.exists() {
                Err(Error::InvalidPath(
                    path.to_path_buf(),
                    format!("Cannot access path: {}", e),
                ))
            } else {
                std::path::absolute(path).map_err(|e| {
                    Error::InvalidPath(path.to_path_buf(), format!("Cannot resolve path: {}", e))
                })
            }
        }
    }
}

/// Checks if a filename starts with a dot (hidden file).
pub fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Sanitizes a filename by replacing invalid characters with safe alternatives.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | '"' | '|' | '?' | '*' => '-',
            ':' => '-',
            '/' | '\\' => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Extracts the last number in a file name, e.g. `12` from `scan_012.png`.
///
/// # Arguments
///
/// * `path` - The path to extract numbers from
/// * `regex` - The regex pattern to use for extraction
///
/// # Returns
///
/// * `Option<f64>` - The extracted number, or None if not found or conversion failed
pub fn extract_number_from_filename_safe(path: &Path, regex: &regex::Regex) -> Option<f64> {
    let file_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();

    regex
        .captures_iter(&file_name)
        .last() // Take the last match, often more specific for versions/numbers
        .and_then(|cap| {
            let capture = cap.get(1).or_else(|| cap.get(0))?.as_str();
            if capture.contains('.') {
                capture.parse::<f64>().ok()
            } else {
                let trimmed = capture.trim_start_matches('0');
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
        })
}

/// Orders paths by the number in their file names; names without a number sort last,
/// ties fall back to the plain file name so the order is total.
pub fn compare_paths_by_number_safe(a: &Path, b: &Path, regex: &regex::Regex) -> Ordering {
    let a_num = extract_number_from_filename_safe(a, regex);
    let b_num = extract_number_from_filename_safe(b, regex);

    let by_number = match (a_num, b_num) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_number.then_with(|| get_file_name_lossy(a).cmp(&get_file_name_lossy(b)))
}
