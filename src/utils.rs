//! Utility functions for artifact file names and destination paths

use crate::config::FileCollisionAction;
use crate::error::{Error, Result};
use crate::types::FileName;
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Check that an artifact identifier is usable as a local file name
///
/// The identifier comes from the server, so it is treated as untrusted: it must be a single
/// normal path component.
///
/// # Errors
///
/// Returns [`Error::Validation`] for empty names, `.`/`..`, names containing path
/// separators or NUL bytes.
pub fn local_file_name(file_name: &FileName) -> Result<&str> {
    let name = file_name.as_str();
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::validation(
            "file_name",
            format!("{name:?} is not a file name"),
        ));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(Error::validation(
            "file_name",
            format!("{name:?} must not contain path separators"),
        ));
    }
    Ok(name)
}

/// Get a unique path for a file, handling collisions according to the specified action
///
/// # Arguments
///
/// * `path` - The desired file path
/// * `action` - How to handle file collisions
///
/// # Returns
///
/// Returns the final path to use. For Rename action, this may have a suffix added.
/// For Skip action, returns an error if the file already exists.
/// For Overwrite action, returns the original path unchanged.
///
/// # Examples
///
/// ```
/// use datagen_client::utils::get_unique_path;
/// use datagen_client::config::FileCollisionAction;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/sports_dataset.jsonl");
/// let unique = get_unique_path(path, FileCollisionAction::Rename).unwrap();
/// // If /tmp/sports_dataset.jsonl exists, returns /tmp/sports_dataset (1).jsonl
/// ```
pub fn get_unique_path(path: &Path, action: FileCollisionAction) -> Result<PathBuf> {
    match action {
        FileCollisionAction::Overwrite => Ok(path.to_path_buf()),
        FileCollisionAction::Skip => {
            if path.exists() {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!(
                        "{} already exists and collision action is Skip",
                        path.display()
                    ),
                )));
            }
            Ok(path.to_path_buf())
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Ok(path.to_path_buf());
            }

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| {
                    Error::validation("path", format!("cannot extract file stem of {}", path.display()))
                })?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path.parent().unwrap_or_else(|| Path::new(""));

            // Try adding (1), (2), (3), ... until we find a unique name
            for i in 1..=MAX_RENAME_ATTEMPTS {
                let new_name = match extension {
                    Some(ext) => format!("{} ({}).{}", stem, i, ext),
                    None => format!("{} ({})", stem, i),
                };
                let new_path = parent.join(new_name);
                if !new_path.exists() {
                    return Ok(new_path);
                }
            }

            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!(
                    "could not find a unique name for {} after {MAX_RENAME_ATTEMPTS} attempts",
                    path.display()
                ),
            )))
        }
    }
}
