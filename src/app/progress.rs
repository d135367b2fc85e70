use chrono::{DateTime, TimeZone};

use crate::season_map::{SEGMENT_SEPARATOR, parse_segments, regular_episode_number, slot_count};
use crate::store::{EpisodeDescriptor, Show};
use crate::watch_map::{WATCHED, watched_count};

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}

/// Watched and total slot counts over every season of a show.
pub(crate) fn watched_totals(show: &Show) -> (usize, usize) {
    let total = show.season_maps.iter().map(|map| slot_count(map)).sum();
    let watched = show
        .watched_episode_maps
        .iter()
        .map(|map| watched_count(map))
        .sum();
    (watched, total)
}

pub(crate) fn format_progress_text(show: &Show) -> String {
    let (watched, total) = watched_totals(show);
    format!("{watched}/{total}")
}

pub(crate) fn build_progress_gauge(show: &Show) -> Option<(f64, String)> {
    let (watched, total) = watched_totals(show);
    if total == 0 {
        return None;
    }
    let ratio = (watched as f64 / total as f64).clamp(0.0, 1.0);
    Some((ratio, format!("{watched}/{total}")))
}

/// First slot, in season order, that is not marked watched.
pub(crate) fn next_unwatched(show: &Show) -> Option<EpisodeDescriptor> {
    show.watched_episode_maps
        .iter()
        .enumerate()
        .find_map(|(season_idx, watch_map)| {
            watch_map
                .chars()
                .position(|flag| flag != WATCHED)
                .map(|episode_index| EpisodeDescriptor {
                    season: season_idx + 1,
                    episode_index,
                })
        })
}

pub(crate) fn describe_slot(show: &Show, descriptor: EpisodeDescriptor) -> String {
    let number = descriptor
        .season
        .checked_sub(1)
        .and_then(|idx| show.season_maps.get(idx))
        .and_then(|map| regular_episode_number(map, descriptor.episode_index));
    match number {
        Some(number) => format!("S{} E{number}", descriptor.season),
        None => format!("S{} special", descriptor.season),
    }
}

/// Plain-text rendering of one season: watch flags grouped by segment.
pub(crate) fn season_line(season_number: usize, season_map: &str, watch_map: &str) -> String {
    let segments = match parse_segments(season_map) {
        Ok(segments) => segments,
        Err(err) => return format!("{season_number:>3}  <invalid season map: {err}>"),
    };
    let mut flags = watch_map.chars();
    let groups: Vec<String> = segments
        .iter()
        .map(|segment| {
            (0..segment.len())
                .map(|_| flags.next().unwrap_or('.'))
                .collect()
        })
        .collect();
    format!(
        "{season_number:>3}  {}  ({}/{})",
        groups.join(&SEGMENT_SEPARATOR.to_string()),
        watched_count(watch_map),
        slot_count(season_map)
    )
}

pub(crate) fn favorite_mark(favorite: bool) -> &'static str {
    if favorite { "*" } else { "" }
}

pub(crate) fn export_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("data-{}.json", now.format("%Y%m%d-%H%M%S"))
}
