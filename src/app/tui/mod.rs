mod actions;
mod render;
pub(crate) mod season_row;
mod session;

use std::collections::HashMap;
use std::io;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::TableState;

use crate::config::Settings;
use crate::store::{EpisodeDescriptor, Show, ShowStore};
use crate::tvmaze::{EpisodeMetadata, EpisodeSource};

use self::actions::{
    drain_details_results, ensure_season_details, refresh_items, status_error, status_info,
    toggle_favorite, toggle_slot,
};
use self::render::draw_tui;
use self::season_row::{HitRegion, hit_test};
use self::session::TuiSession;

/// Season and slot under the keyboard cursor, both 0-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct GridCursor {
    pub(crate) season: usize,
    pub(crate) slot: usize,
}

impl GridCursor {
    fn slot_count(show: &Show, season: usize) -> usize {
        show.watched_episode_maps
            .get(season)
            .map(|map| map.chars().count())
            .unwrap_or(0)
    }

    pub(crate) fn clamp_to(self, show: &Show) -> Self {
        let season = self.season.min(show.season_maps.len().saturating_sub(1));
        let slot = self
            .slot
            .min(Self::slot_count(show, season).saturating_sub(1));
        Self { season, slot }
    }

    pub(crate) fn move_slot(self, show: &Show, forward: bool) -> Self {
        let slot = if forward {
            self.slot + 1
        } else {
            self.slot.saturating_sub(1)
        };
        Self { slot, ..self }.clamp_to(show)
    }

    pub(crate) fn move_season(self, show: &Show, forward: bool) -> Self {
        let season = if forward {
            self.season + 1
        } else {
            self.season.saturating_sub(1)
        };
        Self { season, ..self }.clamp_to(show)
    }

    pub(crate) fn descriptor(self) -> EpisodeDescriptor {
        EpisodeDescriptor {
            season: self.season + 1,
            episode_index: self.slot,
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct PendingDelete {
    pub(super) id: u64,
    pub(super) title: String,
}

#[derive(Debug, Clone)]
pub(super) struct PendingInfo {
    pub(super) tvmaze_id: String,
    pub(super) heading: String,
    pub(super) descriptor: EpisodeDescriptor,
}

#[derive(Debug, Clone)]
pub(super) struct SeasonDetailsFetchResult {
    pub(super) tvmaze_id: String,
    pub(super) details: Result<Vec<Vec<EpisodeMetadata>>, String>,
}

#[derive(Debug, Clone)]
pub(super) enum SeasonDetailsState {
    Loading,
    Ready(Vec<Vec<EpisodeMetadata>>),
    Failed(String),
}

impl SeasonDetailsState {
    pub(super) fn episode(&self, descriptor: EpisodeDescriptor) -> Option<&EpisodeMetadata> {
        match self {
            Self::Ready(seasons) => seasons
                .get(descriptor.season.checked_sub(1)?)?
                .get(descriptor.episode_index),
            Self::Loading | Self::Failed(_) => None,
        }
    }
}

pub(crate) fn run_tui<S>(store: &ShowStore, source: &S, settings: &Settings) -> Result<()>
where
    S: EpisodeSource + Clone + Send + 'static,
{
    let mut session = TuiSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let mut items = store.list()?;
    let mut table_state = TableState::default();
    table_state.select((!items.is_empty()).then_some(0));
    let mut cursor = GridCursor::default();
    let mut cursor_show = items.first().map(|show| show.id);
    let mut pending_delete = None::<PendingDelete>;
    let mut pending_info = None::<PendingInfo>;
    let mut details_by_id: HashMap<String, SeasonDetailsState> = HashMap::new();
    let (details_tx, details_rx) = mpsc::channel::<SeasonDetailsFetchResult>();
    let mut hit_regions: Vec<HitRegion> = Vec::new();
    let mut status = if items.is_empty() {
        status_info("No tracked shows yet. Run `tvtrack lookup --search ... --add` to add one.")
    } else {
        status_info("Ready.")
    };

    loop {
        drain_details_results(&details_rx, &mut details_by_id);

        let selected = table_state.selected().and_then(|idx| items.get(idx));
        if selected.map(|show| show.id) != cursor_show {
            cursor = GridCursor::default();
            cursor_show = selected.map(|show| show.id);
        }
        if let Some(show) = selected {
            cursor = cursor.clamp_to(show);
        }

        hit_regions.clear();
        terminal.draw(|frame| {
            draw_tui(
                frame,
                &items,
                &mut table_state,
                cursor,
                &status,
                settings.site_instance.as_deref(),
                pending_delete.as_ref(),
                pending_info.as_ref(),
                &details_by_id,
                &mut hit_regions,
            )
        })?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }

        let key = match event::read()? {
            Event::Key(key) => key,
            Event::Mouse(mouse) => {
                if pending_delete.is_some() || pending_info.is_some() {
                    continue;
                }
                if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
                    continue;
                }
                let Some((region, slot)) = hit_test(&hit_regions, mouse.column, mouse.row) else {
                    continue;
                };
                let Some(show) = items.iter().find(|show| show.id == region.show_id) else {
                    continue;
                };
                let show_id = show.id;
                cursor = GridCursor {
                    season: region.season_idx,
                    slot,
                };
                match toggle_slot(store, show, cursor) {
                    Ok(msg) => status = status_info(&msg),
                    Err(err) => status = status_error(&format!("Update failed: {err}")),
                }
                refresh_items(store, &mut items, &mut table_state, Some(show_id))?;
                continue;
            }
            _ => continue,
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if pending_info.is_some() {
            pending_info = None;
            continue;
        }

        if let Some(dialog) = pending_delete.as_ref() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    let deleting_id = dialog.id;
                    let deleting_title = dialog.title.clone();
                    pending_delete = None;
                    match store.delete(deleting_id) {
                        Ok(()) => {
                            status = status_info(&format!("Deleted show: {deleting_title}"));
                        }
                        Err(err) if err.is_not_found() => {
                            status = status_error("Delete failed: show no longer exists.");
                        }
                        Err(err) => status = status_error(&format!("Delete failed: {err}")),
                    }
                    refresh_items(store, &mut items, &mut table_state, None)?;
                }
                KeyCode::Esc | KeyCode::Char('n') => {
                    pending_delete = None;
                    status = status_info("Delete canceled.");
                }
                _ => {}
            }
            continue;
        }

        let selected = table_state.selected().and_then(|idx| items.get(idx));
        match key.code {
            KeyCode::Char('q') => break,
            KeyCode::Up => {
                if let Some(selected) = table_state.selected() {
                    table_state.select(Some(selected.saturating_sub(1)));
                }
            }
            KeyCode::Down => {
                if let Some(selected) = table_state.selected()
                    && !items.is_empty()
                {
                    let next = (selected + 1).min(items.len().saturating_sub(1));
                    table_state.select(Some(next));
                }
            }
            KeyCode::Left | KeyCode::Right => {
                if let Some(show) = selected {
                    cursor = cursor.move_slot(show, key.code == KeyCode::Right);
                }
            }
            KeyCode::PageUp | KeyCode::PageDown => {
                if let Some(show) = selected {
                    cursor = cursor.move_season(show, key.code == KeyCode::PageDown);
                }
            }
            KeyCode::Char(' ') => {
                let Some(show) = selected else {
                    status = status_error("Update failed: no show selected.");
                    continue;
                };
                let show_id = show.id;
                match toggle_slot(store, show, cursor) {
                    Ok(msg) => status = status_info(&msg),
                    Err(err) => status = status_error(&format!("Update failed: {err}")),
                }
                refresh_items(store, &mut items, &mut table_state, Some(show_id))?;
            }
            KeyCode::Char('f') => {
                let Some(show) = selected else {
                    status = status_error("Update failed: no show selected.");
                    continue;
                };
                let show_id = show.id;
                match toggle_favorite(store, show) {
                    Ok(msg) => status = status_info(&msg),
                    Err(err) => status = status_error(&format!("Update failed: {err}")),
                }
                refresh_items(store, &mut items, &mut table_state, Some(show_id))?;
            }
            KeyCode::Char('i') => {
                let Some(show) = selected else {
                    status = status_error("Info failed: no show selected.");
                    continue;
                };
                if show.tvmaze_id.is_empty() {
                    status = status_error(&format!("{} has no TVmaze id.", show.title));
                    continue;
                }
                if GridCursor::slot_count(show, cursor.season) == 0 {
                    status = status_error("Info failed: the selected season has no episodes.");
                    continue;
                }
                ensure_season_details(source, &show.tvmaze_id, &mut details_by_id, &details_tx);
                pending_info = Some(PendingInfo {
                    tvmaze_id: show.tvmaze_id.clone(),
                    heading: show.title.clone(),
                    descriptor: cursor.descriptor(),
                });
            }
            KeyCode::Char('d') => {
                let Some(show) = selected else {
                    status = status_error("Delete failed: no show selected.");
                    continue;
                };
                pending_delete = Some(PendingDelete {
                    id: show.id,
                    title: show.title.clone(),
                });
                status = status_info("Confirm delete: y/Enter to delete, n/Esc to cancel.");
            }
            _ => {}
        }
    }

    terminal.show_cursor()?;
    session.leave()?;
    Ok(())
}
