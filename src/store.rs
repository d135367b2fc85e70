use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::watch_map::{reconcile, set_flag};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Show {
    pub(crate) id: u64,
    #[serde(default)]
    pub(crate) tvmaze_id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) location: String,
    #[serde(default)]
    pub(crate) length: String,
    #[serde(default)]
    pub(crate) season_maps: Vec<String>,
    #[serde(default)]
    pub(crate) watched_episode_maps: Vec<String>,
    #[serde(default)]
    pub(crate) favorite: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NewShow {
    pub(crate) title: String,
    pub(crate) tvmaze_id: Option<String>,
    pub(crate) location: Option<String>,
    pub(crate) length: Option<String>,
    pub(crate) season_maps: Option<Vec<String>>,
    pub(crate) favorite: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ShowPatch {
    pub(crate) tvmaze_id: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) location: Option<String>,
    pub(crate) length: Option<String>,
    pub(crate) season_maps: Option<Vec<String>>,
    pub(crate) watched_episode_maps: Option<Vec<String>>,
    pub(crate) favorite: Option<bool>,
}

impl ShowPatch {
    pub(crate) fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// `season` is 1-based, `episode_index` is the 0-based slot within it
/// (specials included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EpisodeDescriptor {
    pub(crate) season: usize,
    pub(crate) episode_index: usize,
}

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("show {0} not found")]
    ShowNotFound(u64),
    #[error("failed to read data file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse data file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize shows: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write data file {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

impl StoreError {
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, Self::ShowNotFound(_))
    }
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

/// The whole collection lives in one JSON file. Every operation reads the
/// file, mutates in memory and writes it back through a uniquely named
/// temporary sibling that is renamed over the original. Nothing serializes concurrent writers:
/// two overlapping read-modify-write cycles lose the earlier update.
pub(crate) struct ShowStore {
    path: PathBuf,
}

impl ShowStore {
    pub(crate) fn open(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn ensure_initialized(&self) -> StoreResult<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        info!(path = %self.path.display(), "creating empty data file");
        self.store_all(&[])
    }

    pub(crate) fn list(&self) -> StoreResult<Vec<Show>> {
        let raw = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        let shows: Vec<Show> = serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), count = shows.len(), "read shows");
        Ok(shows)
    }

    pub(crate) fn get(&self, id: u64) -> StoreResult<Show> {
        self.list()?
            .into_iter()
            .find(|show| show.id == id)
            .ok_or(StoreError::ShowNotFound(id))
    }

    pub(crate) fn create(&self, new_show: NewShow) -> StoreResult<Show> {
        let mut shows = self.list()?;
        let max_id = shows.iter().map(|show| show.id).max().unwrap_or(0);
        let season_maps = new_show.season_maps.unwrap_or_default();
        let watched_episode_maps = reconcile(Vec::new(), &season_maps);
        let title = if new_show.title.is_empty() {
            "?".to_string()
        } else {
            new_show.title
        };

        let show = Show {
            id: max_id + 1,
            tvmaze_id: new_show.tvmaze_id.unwrap_or_default(),
            title,
            location: new_show.location.unwrap_or_default(),
            length: new_show.length.unwrap_or_default(),
            season_maps,
            watched_episode_maps,
            favorite: new_show.favorite.unwrap_or(false),
        };
        shows.push(show.clone());
        self.store_all(&shows)?;
        info!(id = show.id, title = %show.title, "created show");
        Ok(show)
    }

    pub(crate) fn patch(&self, id: u64, patch: ShowPatch) -> StoreResult<Show> {
        let mut shows = self.list()?;
        let show = shows
            .iter_mut()
            .find(|show| show.id == id)
            .ok_or(StoreError::ShowNotFound(id))?;

        let ShowPatch {
            tvmaze_id,
            title,
            location,
            length,
            season_maps,
            watched_episode_maps,
            favorite,
        } = patch;

        let structure_changed = season_maps.is_some() || watched_episode_maps.is_some();
        if let Some(season_maps) = season_maps {
            show.season_maps = season_maps;
        }
        if let Some(watched_episode_maps) = watched_episode_maps {
            show.watched_episode_maps = watched_episode_maps;
        }
        if structure_changed {
            let prior = std::mem::take(&mut show.watched_episode_maps);
            show.watched_episode_maps = reconcile(prior, &show.season_maps);
        }
        if let Some(tvmaze_id) = tvmaze_id {
            show.tvmaze_id = tvmaze_id;
        }
        if let Some(title) = title {
            show.title = title;
        }
        if let Some(location) = location {
            show.location = location;
        }
        if let Some(length) = length {
            show.length = length;
        }
        if let Some(favorite) = favorite {
            show.favorite = favorite;
        }

        let patched = show.clone();
        self.store_all(&shows)?;
        info!(id, "patched show");
        Ok(patched)
    }

    /// Descriptors outside the show's current watch maps are skipped without
    /// error; clients may hold stale season structures.
    pub(crate) fn apply_episode_status(
        &self,
        id: u64,
        watched: Option<&[EpisodeDescriptor]>,
        unwatched: Option<&[EpisodeDescriptor]>,
    ) -> StoreResult<Show> {
        let mut shows = self.list()?;
        let show = shows
            .iter_mut()
            .find(|show| show.id == id)
            .ok_or(StoreError::ShowNotFound(id))?;

        let mut applied = 0;
        let updates = [(watched, true), (unwatched, false)];
        for (descriptors, flag) in updates {
            for descriptor in descriptors.unwrap_or_default() {
                let Some(season_idx) = descriptor.season.checked_sub(1) else {
                    continue;
                };
                if let Some(watch_map) = show.watched_episode_maps.get_mut(season_idx)
                    && set_flag(watch_map, descriptor.episode_index, flag)
                {
                    applied += 1;
                }
            }
        }

        let updated = show.clone();
        let requested = watched.is_some_and(|list| !list.is_empty())
            || unwatched.is_some_and(|list| !list.is_empty());
        if requested {
            self.store_all(&shows)?;
        }
        debug!(id, applied, "applied episode status");
        Ok(updated)
    }

    pub(crate) fn delete(&self, id: u64) -> StoreResult<()> {
        let shows = self.list()?;
        let before = shows.len();
        let remaining: Vec<Show> = shows.into_iter().filter(|show| show.id != id).collect();
        if remaining.len() == before {
            return Err(StoreError::ShowNotFound(id));
        }
        self.store_all(&remaining)?;
        info!(id, "deleted show");
        Ok(())
    }

    pub(crate) fn replace_all(&self, shows: &[Show]) -> StoreResult<()> {
        self.store_all(shows)?;
        info!(count = shows.len(), "replaced all shows");
        Ok(())
    }

    fn store_all(&self, shows: &[Show]) -> StoreResult<()> {
        let text = serde_json::to_string_pretty(shows).map_err(StoreError::Serialize)?;
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let write_error = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
        temp.write_all(text.as_bytes()).map_err(write_error)?;
        temp.persist(&self.path).map_err(|err| write_error(err.error))?;
        debug!(path = %self.path.display(), count = shows.len(), "wrote shows");
        Ok(())
    }
}
