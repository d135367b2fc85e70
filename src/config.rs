use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::paths::data_file_path;
use crate::tvmaze::DEFAULT_BASE_URL;

pub const SITE_INSTANCE_ENV: &str = "SITE_INSTANCE";
pub const TVMAZE_URL_ENV: &str = "TVTRACK_TVMAZE_URL";

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_path: PathBuf,
    pub site_instance: Option<String>,
    pub tvmaze_url: String,
}

impl Settings {
    pub fn resolve(data_override: Option<&Path>) -> Result<Self> {
        Ok(Self::from_parts(
            data_file_path(data_override)?,
            std::env::var(SITE_INSTANCE_ENV).ok(),
            std::env::var(TVMAZE_URL_ENV).ok(),
        ))
    }

    pub(crate) fn from_parts(
        data_path: PathBuf,
        site_instance: Option<String>,
        tvmaze_url: Option<String>,
    ) -> Self {
        let site_instance = site_instance
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let tvmaze_url = tvmaze_url
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            data_path,
            site_instance,
            tvmaze_url,
        }
    }
}
