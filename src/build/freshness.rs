//! Mtime-based freshness detection for dirty builds.
//!
//! An output is fresh when it exists and is at least as new as every input
//! that feeds it (the page source and the page template).

use std::path::Path;
use std::time::SystemTime;

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Check if `output` is at least as new as all of `inputs`.
///
/// Missing inputs are ignored; a missing output is never fresh.
pub fn is_output_fresh(output: &Path, inputs: &[&Path]) -> bool {
    let Some(output_time) = get_mtime(output) else {
        return false;
    };

    inputs
        .iter()
        .filter_map(|input| get_mtime(input))
        .all(|input_time| output_time >= input_time)
}
