//! Collision-free destination names.
//!
//! `report.pdf` becomes `report (1).pdf`, then `report (2).pdf`, and so on.
//! The search is bounded so a pathological folder can't stall a run.

use std::path::Path;

/// Upper bound on numbered candidates tried before giving up.
pub const MAX_ATTEMPTS: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamingError {
    /// No free name was found within [`MAX_ATTEMPTS`] candidates.
    #[error("no free name for '{filename}' in {folder} after {attempts} attempts")]
    NameResolutionExhausted {
        folder: String,
        filename: String,
        attempts: u32,
    },
}

/// Returns `filename` unchanged if it is free in `folder`, otherwise the
/// first free `name (n).ext`.
///
/// An entry counts as taken even when it is a dangling symlink.
pub fn resolve(folder: &Path, filename: &str) -> Result<String, NamingError> {
    resolve_with(folder, filename, |candidate| {
        candidate.symlink_metadata().is_ok()
    })
}

/// Like [`resolve`], with the occupancy check supplied by the caller.
///
/// Dry runs use this to treat names planned earlier in the run as taken.
pub fn resolve_with<F>(folder: &Path, filename: &str, is_taken: F) -> Result<String, NamingError>
where
    F: Fn(&Path) -> bool,
{
    if !is_taken(&folder.join(filename)) {
        return Ok(filename.to_string());
    }

    let (stem, extension) = split_name(filename);
    for counter in 1..=MAX_ATTEMPTS {
        let candidate = match extension {
            Some(ext) => format!("{} ({}).{}", stem, counter, ext),
            None => format!("{} ({})", stem, counter),
        };
        if !is_taken(&folder.join(&candidate)) {
            return Ok(candidate);
        }
    }

    Err(NamingError::NameResolutionExhausted {
        folder: folder.display().to_string(),
        filename: filename.to_string(),
        attempts: MAX_ATTEMPTS,
    })
}

/// Splits at the last dot; a leading dot belongs to the stem.
fn split_name(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(0) | None => (filename, None),
        Some(idx) => (&filename[..idx], Some(&filename[idx + 1..])),
    }
}
