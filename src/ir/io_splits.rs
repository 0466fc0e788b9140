//! Split list files: one image stem per line.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::OrchardError;

pub const SPLIT_LIST_EXTENSION: &str = "txt";

/// Path of the list file for `split` inside `split_dir`.
pub fn split_list_path(split_dir: &Path, split: &str) -> PathBuf {
    split_dir.join(format!("{split}.{SPLIT_LIST_EXTENSION}"))
}

/// Reads a split list. Lines are trimmed and blank lines dropped; order and
/// duplicates are preserved for the caller to judge.
pub fn read_split_list(path: &Path) -> Result<Vec<String>, OrchardError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(OrchardError::config(format!(
                "split list '{}' does not exist",
                path.display()
            )));
        }
        Err(err) => return Err(OrchardError::read(path, err)),
    };

    Ok(data
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Writes `stems` one per line with a trailing newline, creating parent
/// directories as needed.
pub fn write_split_list(path: &Path, stems: &[String]) -> Result<(), OrchardError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| OrchardError::write(parent, err))?;
    }

    let write_err = |err| OrchardError::write(path, err);
    let mut writer = BufWriter::new(fs::File::create(path).map_err(write_err)?);
    for stem in stems {
        writeln!(writer, "{stem}").map_err(write_err)?;
    }
    writer.flush().map_err(write_err)
}
