use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const DATA_FILE_ENV: &str = "TVTRACK_DATA";

pub fn data_file_path(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(DATA_FILE_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let base = dirs::data_dir().context("unable to resolve data directory")?;
    Ok(base.join("tvtrack").join("data.json"))
}
