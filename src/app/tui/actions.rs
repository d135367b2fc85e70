use std::collections::HashMap;
use std::sync::mpsc;

use anyhow::Result;
use ratatui::widgets::TableState;

use crate::store::{Show, ShowPatch, ShowStore};
use crate::tvmaze::EpisodeSource;
use crate::watch_map::is_watched;

use super::super::progress::{describe_slot, format_progress_text};
use super::{GridCursor, SeasonDetailsFetchResult, SeasonDetailsState};

pub(super) fn refresh_items(
    store: &ShowStore,
    items: &mut Vec<Show>,
    table_state: &mut TableState,
    preferred_id: Option<u64>,
) -> Result<()> {
    *items = store.list()?;
    if items.is_empty() {
        table_state.select(None);
        return Ok(());
    }

    if let Some(id) = preferred_id
        && let Some(idx) = items.iter().position(|show| show.id == id)
    {
        table_state.select(Some(idx));
        return Ok(());
    }

    match table_state.selected() {
        Some(selected) => table_state.select(Some(selected.min(items.len() - 1))),
        None => table_state.select(Some(0)),
    }
    Ok(())
}

pub(super) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(super) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

/// Flips the watched flag of the slot under the cursor.
pub(super) fn toggle_slot(store: &ShowStore, show: &Show, cursor: GridCursor) -> Result<String> {
    let descriptor = cursor.descriptor();
    let was_watched = show
        .watched_episode_maps
        .get(cursor.season)
        .is_some_and(|watch_map| is_watched(watch_map, cursor.slot));
    let list = [descriptor];
    let updated = if was_watched {
        store.apply_episode_status(show.id, None, Some(&list))?
    } else {
        store.apply_episode_status(show.id, Some(&list), None)?
    };
    Ok(format!(
        "{} {} marked {} ({} watched)",
        updated.title,
        describe_slot(&updated, descriptor),
        if was_watched { "unwatched" } else { "watched" },
        format_progress_text(&updated)
    ))
}

pub(super) fn toggle_favorite(store: &ShowStore, show: &Show) -> Result<String> {
    let updated = store.patch(
        show.id,
        ShowPatch {
            favorite: Some(!show.favorite),
            ..ShowPatch::default()
        },
    )?;
    Ok(if updated.favorite {
        format!("Added {} to favorites.", updated.title)
    } else {
        format!("Removed {} from favorites.", updated.title)
    })
}

pub(super) fn ensure_season_details<S>(
    source: &S,
    tvmaze_id: &str,
    details_by_id: &mut HashMap<String, SeasonDetailsState>,
    tx: &mpsc::Sender<SeasonDetailsFetchResult>,
) where
    S: EpisodeSource + Clone + Send + 'static,
{
    if matches!(
        details_by_id.get(tvmaze_id),
        Some(SeasonDetailsState::Loading | SeasonDetailsState::Ready(_))
    ) {
        return;
    }

    details_by_id.insert(tvmaze_id.to_string(), SeasonDetailsState::Loading);
    let tvmaze_id = tvmaze_id.to_string();
    let source = source.clone();
    let tx = tx.clone();
    std::thread::spawn(move || {
        let details = source
            .fetch_season_details(&tvmaze_id)
            .map_err(|err| err.to_string());
        let _ = tx.send(SeasonDetailsFetchResult { tvmaze_id, details });
    });
}

pub(super) fn drain_details_results(
    rx: &mpsc::Receiver<SeasonDetailsFetchResult>,
    details_by_id: &mut HashMap<String, SeasonDetailsState>,
) {
    while let Ok(result) = rx.try_recv() {
        let state = match result.details {
            Ok(seasons) => SeasonDetailsState::Ready(seasons),
            Err(err) => SeasonDetailsState::Failed(err),
        };
        details_by_id.insert(result.tvmaze_id, state);
    }
}
