mod progress;
mod tui;

#[cfg(test)]
mod tests;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Local;
use tracing::info;

use crate::cli::{AddArgs, Cli, Command, EditArgs, LookupArgs};
use crate::config::Settings;
use crate::grid::{season_scene, season_svg, show_document, slot_at};
use crate::legacy::parse_legacy;
use crate::season_map::{SeasonMap, parse_segments};
use crate::store::{EpisodeDescriptor, NewShow, Show, ShowPatch, ShowStore};
use crate::tvmaze::{EpisodeSource, ShowInfo, TvMazeClient};
use crate::watch_map::reconcile;

use self::progress::{
    describe_slot, export_file_name, favorite_mark, format_progress_text, next_unwatched,
    season_line, truncate,
};

pub fn run(cli: Cli, settings: &Settings) -> Result<()> {
    let store = open_store(&settings.data_path)?;
    let source = TvMazeClient::new(&settings.tvmaze_url);

    match cli.command {
        Some(Command::List) => run_list(&store)?,
        Some(Command::Show { id }) => run_show(&store, id)?,
        Some(Command::Add(args)) => run_add(&store, args)?,
        Some(Command::Edit(args)) => run_edit(&store, args)?,
        Some(Command::Watch { id, episodes }) => run_set_status(&store, id, &episodes, true)?,
        Some(Command::Unwatch { id, episodes }) => run_set_status(&store, id, &episodes, false)?,
        Some(Command::Delete { id }) => run_delete(&store, id)?,
        Some(Command::Import { file, append }) => run_import(&store, &file, append)?,
        Some(Command::Export { output }) => run_export(&store, output)?,
        Some(Command::Restore { file }) => run_restore(&store, &file)?,
        Some(Command::Render { id, season, output }) => {
            run_render(&store, id, season, output.as_deref())?
        }
        Some(Command::Hit { id, season, x }) => run_hit(&store, id, season, x)?,
        Some(Command::Lookup(args)) => run_lookup(&store, &source, args)?,
        Some(Command::Refresh { id }) => run_refresh(&store, &source, id)?,
        Some(Command::Info { id, season, slot }) => run_info(&store, &source, id, season, slot)?,
        Some(Command::Tui) | None => tui::run_tui(&store, &source, settings)?,
    }

    Ok(())
}

fn open_store(path: &Path) -> Result<ShowStore> {
    let store = ShowStore::open(path);
    store
        .ensure_initialized()
        .with_context(|| format!("failed to prepare data file {}", path.display()))?;
    Ok(store)
}

fn run_list(store: &ShowStore) -> Result<()> {
    let shows = store.list()?;
    if shows.is_empty() {
        println!(
            "No tracked shows in {}. Run `tvtrack add --title ...` or `tvtrack lookup` first.",
            store.path().display()
        );
        return Ok(());
    }

    println!(
        "{:<6} {:<40} {:<8} {:<10} {:<3}",
        "ID", "TITLE", "SEASONS", "WATCHED", "FAV"
    );
    for show in shows {
        println!(
            "{:<6} {:<40} {:<8} {:<10} {:<3}",
            show.id,
            truncate(&show.title, 40),
            show.season_maps.len(),
            format_progress_text(&show),
            favorite_mark(show.favorite)
        );
    }
    Ok(())
}

fn run_show(store: &ShowStore, id: u64) -> Result<()> {
    let show = store.get(id)?;
    print_show(&show);
    Ok(())
}

fn print_show(show: &Show) {
    println!("{} {}", show.title, favorite_mark(show.favorite));
    println!("  id: {}", show.id);
    if !show.tvmaze_id.is_empty() {
        println!("  TVmaze: {}", show.tvmaze_id);
    }
    if !show.location.is_empty() {
        println!("  location: {}", show.location);
    }
    if !show.length.is_empty() {
        println!("  length: {}", show.length);
    }
    let (regular, specials) = show
        .season_maps
        .iter()
        .filter_map(|raw| raw.parse::<SeasonMap>().ok())
        .fold((0, 0), |(regular, specials), season_map| {
            let count = season_map.regular_episode_count();
            (regular + count, specials + season_map.slot_count() - count)
        });
    println!("  episodes: {regular} ({specials} specials)");
    println!("  watched: {}", format_progress_text(show));
    if let Some(next) = next_unwatched(show) {
        println!("  up next: {}", describe_slot(show, next));
    }
    for (idx, season_map) in show.season_maps.iter().enumerate() {
        let watch_map = show
            .watched_episode_maps
            .get(idx)
            .map(String::as_str)
            .unwrap_or("");
        println!("{}", season_line(idx + 1, season_map, watch_map));
    }
}

pub(crate) fn validate_season_maps(season_maps: &[String]) -> Result<()> {
    for (idx, season_map) in season_maps.iter().enumerate() {
        parse_segments(season_map)
            .with_context(|| format!("invalid map for season {}: '{season_map}'", idx + 1))?;
    }
    Ok(())
}

fn run_add(store: &ShowStore, args: AddArgs) -> Result<()> {
    validate_season_maps(&args.seasons)?;
    let show = store.create(NewShow {
        title: args.title,
        tvmaze_id: args.tvmaze_id,
        location: args.location,
        length: args.length,
        season_maps: Some(args.seasons),
        favorite: Some(args.favorite),
    })?;
    println!("Added show {}: {}", show.id, show.title);
    Ok(())
}

pub(crate) fn edit_patch(args: EditArgs) -> Result<ShowPatch> {
    validate_season_maps(&args.seasons)?;
    let patch = ShowPatch {
        tvmaze_id: args.tvmaze_id,
        title: args.title,
        location: args.location,
        length: args.length,
        season_maps: (!args.seasons.is_empty()).then_some(args.seasons),
        watched_episode_maps: (!args.watch_maps.is_empty()).then_some(args.watch_maps),
        favorite: args.favorite,
    };
    if patch.is_empty() {
        bail!("nothing to change: pass at least one field to edit");
    }
    Ok(patch)
}

fn run_edit(store: &ShowStore, args: EditArgs) -> Result<()> {
    let id = args.id;
    let patch = edit_patch(args)?;
    let show = store.patch(id, patch)?;
    println!("Updated show {}: {}", show.id, show.title);
    Ok(())
}

fn run_set_status(
    store: &ShowStore,
    id: u64,
    episodes: &[EpisodeDescriptor],
    watched: bool,
) -> Result<()> {
    let show = if watched {
        store.apply_episode_status(id, Some(episodes), None)?
    } else {
        store.apply_episode_status(id, None, Some(episodes))?
    };
    println!("{}: {} watched", show.title, format_progress_text(&show));
    Ok(())
}

fn run_delete(store: &ShowStore, id: u64) -> Result<()> {
    let show = store.get(id)?;
    store.delete(id)?;
    println!("Deleted show {}: {}", id, show.title);
    Ok(())
}

pub(crate) fn import_legacy(store: &ShowStore, text: &str, append: bool) -> Result<(usize, usize)> {
    let import = parse_legacy(text);
    let skipped = import.skipped;
    let mut shows = if append { store.list()? } else { Vec::new() };
    let first_id = shows.iter().map(|show| show.id).max().unwrap_or(0) + 1;
    let imported = import.into_shows(first_id);
    let count = imported.len();
    shows.extend(imported);
    store.replace_all(&shows)?;
    info!(count, skipped, append, "imported legacy shows");
    Ok((count, skipped))
}

fn run_import(store: &ShowStore, file: &Path, append: bool) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read import file {}", file.display()))?;
    let (count, skipped) = import_legacy(store, &text, append)?;
    println!("Imported {count} shows ({skipped} lines skipped).");
    Ok(())
}

fn run_export(store: &ShowStore, output: Option<PathBuf>) -> Result<()> {
    let shows = store.list()?;
    let output = output.unwrap_or_else(|| PathBuf::from(export_file_name(&Local::now())));
    let text = serde_json::to_string_pretty(&shows).context("failed to serialize shows")?;
    fs::write(&output, text)
        .with_context(|| format!("failed to write export file {}", output.display()))?;
    println!("Exported {} shows to {}", shows.len(), output.display());
    Ok(())
}

/// Restored shows get their watch maps brought back in line with their
/// season maps before they replace the collection.
pub(crate) fn restore_shows(store: &ShowStore, text: &str) -> Result<usize> {
    let mut shows: Vec<Show> =
        serde_json::from_str(text).context("restore file is not a JSON list of shows")?;
    for show in &mut shows {
        validate_season_maps(&show.season_maps)
            .with_context(|| format!("show {} ({})", show.id, show.title))?;
        let prior = std::mem::take(&mut show.watched_episode_maps);
        show.watched_episode_maps = reconcile(prior, &show.season_maps);
    }
    store.replace_all(&shows)?;
    Ok(shows.len())
}

fn run_restore(store: &ShowStore, file: &Path) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read restore file {}", file.display()))?;
    let count = restore_shows(store, &text)?;
    println!("Restored {count} shows from {}", file.display());
    Ok(())
}

fn run_render(
    store: &ShowStore,
    id: u64,
    season: Option<usize>,
    output: Option<&Path>,
) -> Result<()> {
    let show = store.get(id)?;
    let (svg, summary) = match season {
        Some(season) => {
            let season_map = season_of(&show, season)?;
            let watch_map = show
                .watched_episode_maps
                .get(season - 1)
                .map(String::as_str)
                .unwrap_or("");
            let scene = season_scene(season, &season_map, watch_map);
            let summary = format!(
                "{} season {season} ({}/{} seen)",
                show.title,
                scene.seen_count(),
                scene.boxes.len()
            );
            (season_svg(&scene), summary)
        }
        None => (show_document(&show), show.title.clone()),
    };
    match output {
        Some(path) => {
            fs::write(path, svg)
                .with_context(|| format!("failed to write SVG file {}", path.display()))?;
            println!("Rendered {summary} to {}", path.display());
        }
        None => io::stdout()
            .write_all(svg.as_bytes())
            .context("failed to write SVG to stdout")?,
    }
    Ok(())
}

pub(crate) fn season_of(show: &Show, season: usize) -> Result<SeasonMap> {
    let raw = season
        .checked_sub(1)
        .and_then(|idx| show.season_maps.get(idx))
        .with_context(|| format!("{} has no season {season}", show.title))?;
    raw.parse::<SeasonMap>()
        .with_context(|| format!("invalid map for season {season}: '{raw}'"))
}

fn run_hit(store: &ShowStore, id: u64, season: usize, x: f64) -> Result<()> {
    let show = store.get(id)?;
    let season_map = season_of(&show, season)?;
    match slot_at(&season_map, x) {
        Some(slot) => {
            let descriptor = EpisodeDescriptor {
                season,
                episode_index: slot,
            };
            println!("{} ({})", slot + 1, describe_slot(&show, descriptor));
        }
        None => println!("none"),
    }
    Ok(())
}

fn print_show_info(info: &ShowInfo) {
    println!("{} (TVmaze {})", info.title, info.tvmaze_id);
    println!("  length: {}", info.length);
    for (idx, season_map) in info.season_maps.iter().enumerate() {
        println!("{:>3}  {season_map}", idx + 1);
    }
}

pub(crate) fn new_show_from_info(info: ShowInfo) -> NewShow {
    NewShow {
        title: info.title,
        tvmaze_id: Some(info.tvmaze_id),
        location: None,
        length: Some(info.length),
        season_maps: Some(info.season_maps),
        favorite: None,
    }
}

fn run_lookup(store: &ShowStore, source: &impl EpisodeSource, args: LookupArgs) -> Result<()> {
    let info = match (args.tvmaze_id.as_deref(), args.search.as_deref()) {
        (_, Some(query)) => source.search_show(query)?,
        (Some(tvmaze_id), None) => source.fetch_show(tvmaze_id)?,
        (None, None) => bail!("pass a TVmaze id or --search QUERY"),
    };
    print_show_info(&info);
    if args.add {
        let show = store.create(new_show_from_info(info))?;
        println!("Added show {}: {}", show.id, show.title);
    }
    Ok(())
}

/// Pulls the current season structure from TVmaze and stores it; watch maps
/// are reconciled by the store.
pub(crate) fn refresh_show(
    store: &ShowStore,
    source: &impl EpisodeSource,
    id: u64,
) -> Result<Show> {
    let show = store.get(id)?;
    if show.tvmaze_id.is_empty() {
        bail!("{} has no TVmaze id", show.title);
    }
    let info = source
        .fetch_show(&show.tvmaze_id)
        .with_context(|| format!("failed to refresh {}", show.title))?;
    let patch = ShowPatch {
        season_maps: Some(info.season_maps),
        length: show.length.is_empty().then_some(info.length),
        ..ShowPatch::default()
    };
    Ok(store.patch(id, patch)?)
}

fn run_refresh(store: &ShowStore, source: &impl EpisodeSource, id: u64) -> Result<()> {
    let show = refresh_show(store, source, id)?;
    println!(
        "Refreshed {}: {} seasons, {} watched",
        show.title,
        show.season_maps.len(),
        format_progress_text(&show)
    );
    Ok(())
}

fn run_info(
    store: &ShowStore,
    source: &impl EpisodeSource,
    id: u64,
    season: usize,
    slot: usize,
) -> Result<()> {
    let show = store.get(id)?;
    let season_map = season_of(&show, season)?;
    let Some(slot_idx) = slot.checked_sub(1).filter(|idx| *idx < season_map.slot_count()) else {
        bail!("season {season} of {} has no slot {slot}", show.title);
    };
    if show.tvmaze_id.is_empty() {
        bail!("{} has no TVmaze id", show.title);
    }
    let details = source.fetch_season_details(&show.tvmaze_id)?;
    let episode = details
        .get(season - 1)
        .and_then(|episodes| episodes.get(slot_idx))
        .with_context(|| format!("TVmaze lists no episode for season {season} slot {slot}"))?;

    let label = match episode.episode_number {
        Some(number) => format!("S{} E{number}", episode.season),
        None => format!("S{} special", episode.season),
    };
    println!("{label}: {}", episode.title);
    println!("  slot {slot} of {}", show.title);
    println!("  length: {}", episode.length);
    if !episode.synopsis.is_empty() {
        println!();
        println!("{}", episode.synopsis);
    }
    Ok(())
}
