use chrono::{TimeZone, Utc};
use ratatui::layout::Rect;
use tempfile::TempDir;

use super::progress::*;
use super::tui::GridCursor;
use super::tui::season_row::*;
use super::*;
use crate::cli::parse_episode_ref;
use crate::grid::{layout, slot_at};
use crate::tvmaze::{EpisodeMetadata, TvMazeError};

fn show(season_maps: &[&str], watch_maps: &[&str]) -> Show {
    Show {
        id: 1,
        tvmaze_id: String::new(),
        title: "Show".to_string(),
        location: String::new(),
        length: String::new(),
        season_maps: season_maps.iter().map(|s| s.to_string()).collect(),
        watched_episode_maps: watch_maps.iter().map(|s| s.to_string()).collect(),
        favorite: false,
    }
}

fn temp_store() -> (TempDir, ShowStore) {
    let dir = TempDir::new().expect("temp dir");
    let store = ShowStore::open(&dir.path().join("data.json"));
    store.ensure_initialized().expect("init store");
    (dir, store)
}

fn season(raw: &str) -> SeasonMap {
    raw.parse().expect("valid season map")
}

fn line_text(line: &ratatui::text::Line<'_>) -> String {
    line.spans.iter().map(|span| span.content.to_string()).collect()
}

#[derive(Clone)]
struct FakeSource {
    info: ShowInfo,
}

impl EpisodeSource for FakeSource {
    fn fetch_show(&self, tvmaze_id: &str) -> Result<ShowInfo, TvMazeError> {
        if tvmaze_id == self.info.tvmaze_id {
            Ok(self.info.clone())
        } else {
            Err(TvMazeError::NotFound(tvmaze_id.to_string()))
        }
    }

    fn search_show(&self, _query: &str) -> Result<ShowInfo, TvMazeError> {
        Ok(self.info.clone())
    }

    fn fetch_season_details(
        &self,
        _tvmaze_id: &str,
    ) -> Result<Vec<Vec<EpisodeMetadata>>, TvMazeError> {
        Ok(Vec::new())
    }
}

fn fake_source(season_maps: &[&str]) -> FakeSource {
    FakeSource {
        info: ShowInfo {
            tvmaze_id: "82".to_string(),
            title: "Remote Title".to_string(),
            length: "60 min.".to_string(),
            season_maps: season_maps.iter().map(|s| s.to_string()).collect(),
        },
    }
}

#[test]
fn episode_ref_is_one_based_on_both_sides() {
    assert_eq!(
        parse_episode_ref("2:3"),
        Ok(EpisodeDescriptor {
            season: 2,
            episode_index: 2
        })
    );
    assert!(parse_episode_ref("0:1").is_err());
    assert!(parse_episode_ref("1:0").is_err());
    assert!(parse_episode_ref("13").is_err());
    assert!(parse_episode_ref("a:b").is_err());
}

#[test]
fn season_maps_are_validated_before_reaching_the_store() {
    assert!(validate_season_maps(&["".to_string(), "..+S".to_string()]).is_ok());
    let err = validate_season_maps(&["...".to_string(), "..+".to_string()])
        .expect_err("empty trailing segment");
    assert!(err.to_string().contains("season 2"));
}

#[test]
fn edit_requires_at_least_one_field() {
    let args = EditArgs {
        id: 1,
        title: None,
        tvmaze_id: None,
        location: None,
        length: None,
        seasons: Vec::new(),
        watch_maps: Vec::new(),
        favorite: None,
    };
    assert!(edit_patch(args).is_err());

    let args = EditArgs {
        id: 1,
        title: None,
        tvmaze_id: None,
        location: None,
        length: None,
        seasons: vec!["...".to_string()],
        watch_maps: Vec::new(),
        favorite: Some(true),
    };
    let patch = edit_patch(args).expect("valid patch");
    assert_eq!(patch.season_maps, Some(vec!["...".to_string()]));
    assert_eq!(patch.watched_episode_maps, None);
    assert_eq!(patch.favorite, Some(true));
}

#[test]
fn import_append_numbers_after_existing_shows() {
    let (_dir, store) = temp_store();
    store
        .create(NewShow {
            title: "Existing".to_string(),
            ..NewShow::default()
        })
        .expect("create");

    let text = "A, , , , 2, 1\nbroken line\nB, , , , 3|2, 1:1\n";
    let (count, skipped) = import_legacy(&store, text, true).expect("import");
    assert_eq!((count, skipped), (2, 1));

    let shows = store.list().expect("list");
    let ids: Vec<u64> = shows.iter().map(|show| show.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(shows[2].watched_episode_maps, vec!["x..", ".."]);
}

#[test]
fn import_without_append_replaces_the_collection() {
    let (_dir, store) = temp_store();
    store
        .create(NewShow {
            title: "Existing".to_string(),
            ..NewShow::default()
        })
        .expect("create");

    import_legacy(&store, "Only, , , , 1, 0\n", false).expect("import");
    let shows = store.list().expect("list");
    assert_eq!(shows.len(), 1);
    assert_eq!(shows[0].title, "Only");
    assert_eq!(shows[0].id, 1);
}

#[test]
fn restore_reconciles_watch_maps() {
    let (_dir, store) = temp_store();
    let text = r#"[{"id":4,"title":"Dark","seasonMaps":["...","S."],"watchedEpisodeMaps":["x"]}]"#;
    assert_eq!(restore_shows(&store, text).expect("restore"), 1);

    let restored = store.get(4).expect("get");
    assert_eq!(restored.watched_episode_maps, vec!["x..", ".."]);
    assert_eq!(restored.location, "");
}

#[test]
fn restore_rejects_invalid_season_maps() {
    let (_dir, store) = temp_store();
    let text = r#"[{"id":1,"title":"Bad","seasonMaps":["..+"]}]"#;
    assert!(restore_shows(&store, text).is_err());
    assert!(store.list().expect("list").is_empty());
}

#[test]
fn refresh_grows_seasons_and_keeps_progress() {
    let (_dir, store) = temp_store();
    let created = store
        .create(NewShow {
            title: "Tracked".to_string(),
            tvmaze_id: Some("82".to_string()),
            season_maps: Some(vec!["...".to_string()]),
            ..NewShow::default()
        })
        .expect("create");
    store
        .apply_episode_status(
            created.id,
            Some(&[EpisodeDescriptor {
                season: 1,
                episode_index: 1,
            }]),
            None,
        )
        .expect("watch");

    let refreshed =
        refresh_show(&store, &fake_source(&["....", "S."]), created.id).expect("refresh");
    assert_eq!(refreshed.season_maps, vec!["....", "S."]);
    assert_eq!(refreshed.watched_episode_maps, vec![".x..", ".."]);
    assert_eq!(refreshed.length, "60 min.");
    assert_eq!(refreshed.title, "Tracked");
}

#[test]
fn refresh_needs_a_tvmaze_id() {
    let (_dir, store) = temp_store();
    let created = store
        .create(NewShow {
            title: "Local only".to_string(),
            ..NewShow::default()
        })
        .expect("create");
    assert!(refresh_show(&store, &fake_source(&["."]), created.id).is_err());
}

#[test]
fn lookup_result_becomes_a_new_show() {
    let (_dir, store) = temp_store();
    let source = fake_source(&["..", "."]);
    let info = source.search_show("anything").expect("search");
    let created = store.create(new_show_from_info(info)).expect("create");
    assert_eq!(created.title, "Remote Title");
    assert_eq!(created.tvmaze_id, "82");
    assert_eq!(created.watched_episode_maps, vec!["..", "."]);
}

#[test]
fn season_of_checks_range() {
    let tracked = show(&["..", "S."], &["..", ".."]);
    assert!(season_of(&tracked, 0).is_err());
    assert!(season_of(&tracked, 3).is_err());
    assert_eq!(season_of(&tracked, 2).expect("season").slot_count(), 2);
}

#[test]
fn progress_counts_every_season() {
    let tracked = show(&["..+S", "..."], &["xx.", "x.."]);
    assert_eq!(watched_totals(&tracked), (3, 6));
    assert_eq!(format_progress_text(&tracked), "3/6");
    assert_eq!(build_progress_gauge(&tracked), Some((0.5, "3/6".to_string())));
    assert_eq!(build_progress_gauge(&show(&[], &[])), None);
}

#[test]
fn next_unwatched_walks_seasons_in_order() {
    let tracked = show(&["..", "S.."], &["xx", "x.."]);
    let next = next_unwatched(&tracked).expect("unwatched slot");
    assert_eq!(
        next,
        EpisodeDescriptor {
            season: 2,
            episode_index: 1
        }
    );
    assert_eq!(describe_slot(&tracked, next), "S2 E1");
    assert_eq!(
        describe_slot(
            &tracked,
            EpisodeDescriptor {
                season: 2,
                episode_index: 0
            }
        ),
        "S2 special"
    );
    assert_eq!(next_unwatched(&show(&["."], &["x"])), None);
}

#[test]
fn season_line_groups_flags_by_segment() {
    assert_eq!(season_line(1, "..+S.", "x.x"), "  1  x.+x.  (2/4)");
    assert!(season_line(2, "..+", "..").contains("invalid season map"));
}

#[test]
fn export_file_name_uses_timestamp() {
    let now = Utc
        .with_ymd_and_hms(2026, 10, 16, 14, 5, 9)
        .single()
        .expect("valid time");
    assert_eq!(export_file_name(&now), "data-20261016-140509.json");
}

#[test]
fn truncate_adds_ellipsis() {
    assert_eq!(truncate("Short", 10), "Short");
    assert_eq!(truncate("A much longer title", 10), "A much ...");
}

#[test]
fn raster_columns_agree_with_hit_test() {
    for raw in ["", ".", "..+S.", "S..+...+S", "............"] {
        let season_map = season(raw);
        let cells = classify_columns(&season_map);
        for (column, cell) in cells.iter().enumerate() {
            let hit = slot_at(&season_map, column_x(column));
            match cell {
                RowCell::Slot(slot) => assert_eq!(hit, Some(*slot), "{raw} column {column}"),
                _ => assert_eq!(hit, None, "{raw} column {column}"),
            }
        }
        for slot in 0..season_map.slot_count() {
            assert!(
                cells.contains(&RowCell::Slot(slot)),
                "{raw} slot {slot} has no column"
            );
        }
    }
}

#[test]
fn raster_places_labels_and_separators() {
    let season_map = season("..+S.");
    let cells = classify_columns(&season_map);
    assert_eq!(
        cells.iter().take_while(|cell| **cell == RowCell::Label).count(),
        4
    );
    assert!(cells.contains(&RowCell::Gap));

    let season_layout = layout(&season_map);
    for slot in 0..season_map.slot_count() {
        let midpoint = season_layout.slot_midpoint(slot).expect("midpoint");
        assert_eq!(cells[column_of(midpoint)], RowCell::Slot(slot));
    }

    let view = RowView {
        cursor_slot: None,
        column_offset: 0,
        visible_columns: 200,
    };
    let text = line_text(&season_row_line(7, &season_map, "x...", view));
    assert!(text.starts_with("  7 "));
    assert!(text.contains('+'));
    assert!(text.contains('\u{2605}'));
    assert!(text.contains('1') && text.contains('2') && text.contains('3'));
    assert_eq!(text.chars().count(), cells.len());
}

#[test]
fn clipped_row_keeps_requested_window() {
    let season_map = season("..........");
    let view = RowView {
        cursor_slot: Some(9),
        column_offset: 5,
        visible_columns: 12,
    };
    let text = line_text(&season_row_line(1, &season_map, "", view));
    assert_eq!(text.chars().count(), 12);
}

#[test]
fn column_offset_keeps_focus_visible() {
    assert_eq!(column_offset_for(50, 40, 80), 0);
    assert_eq!(column_offset_for(10, 100, 40), 0);
    assert_eq!(column_offset_for(50, 100, 40), 30);
    assert_eq!(column_offset_for(99, 100, 40), 60);
}

#[test]
fn hit_regions_resolve_terminal_cells() {
    let season_map = season("..+S.");
    let area = Rect::new(10, 5, 60, 1);
    let regions = vec![HitRegion {
        area,
        show_id: 3,
        season_idx: 1,
        column_offset: 0,
        season_map: season_map.clone(),
    }];

    let season_layout = layout(&season_map);
    let mid = season_layout.slot_midpoint(2).expect("midpoint");
    let column = area.x + column_of(mid) as u16;
    let (region, slot) = hit_test(&regions, column, 5).expect("slot under click");
    assert_eq!((region.show_id, region.season_idx, slot), (3, 1, 2));

    // season label, wrong row, left of the region
    assert!(hit_test(&regions, area.x, 5).is_none());
    assert!(hit_test(&regions, column, 6).is_none());
    assert!(hit_test(&regions, 2, 5).is_none());
}

#[test]
fn hit_regions_account_for_horizontal_scroll() {
    let season_map = season("..........");
    let region = HitRegion {
        area: Rect::new(0, 0, 20, 1),
        show_id: 1,
        season_idx: 0,
        column_offset: 30,
        season_map: season_map.clone(),
    };
    for column in 0..20u16 {
        assert_eq!(
            region.slot_at_column(column),
            slot_at(&season_map, column_x(usize::from(column) + 30))
        );
    }
}

#[test]
fn grid_cursor_stays_inside_the_show() {
    let tracked = show(&["...", "S.", ""], &["...", "..", ""]);
    let cursor = GridCursor::default();
    let cursor = cursor.move_slot(&tracked, true).move_slot(&tracked, true);
    assert_eq!(cursor, GridCursor { season: 0, slot: 2 });
    let cursor = cursor.move_slot(&tracked, true);
    assert_eq!(cursor.slot, 2);

    let cursor = cursor.move_season(&tracked, true);
    assert_eq!(cursor, GridCursor { season: 1, slot: 1 });
    let cursor = cursor.move_season(&tracked, true);
    assert_eq!(cursor, GridCursor { season: 2, slot: 0 });
    let cursor = cursor.move_season(&tracked, true);
    assert_eq!(cursor.season, 2);
    assert_eq!(
        GridCursor { season: 1, slot: 0 }.descriptor(),
        EpisodeDescriptor {
            season: 2,
            episode_index: 0
        }
    );
}
