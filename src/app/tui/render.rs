use std::collections::HashMap;

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, Gauge, Padding, Paragraph, Row, Table, TableState,
    Wrap,
};

use crate::grid::layout;
use crate::season_map::SeasonMap;
use crate::store::Show;

use super::super::progress::{
    build_progress_gauge, describe_slot, favorite_mark, format_progress_text, next_unwatched,
    truncate,
};
use super::season_row::{HitRegion, RowView, column_of, column_offset_for, season_row_line};
use super::{GridCursor, PendingDelete, PendingInfo, SeasonDetailsState};

const MAX_GRID_ROWS: u16 = 12;

#[allow(clippy::too_many_arguments)]
pub(super) fn draw_tui(
    frame: &mut Frame,
    items: &[Show],
    table_state: &mut TableState,
    cursor: GridCursor,
    status: &str,
    site_instance: Option<&str>,
    pending_delete: Option<&PendingDelete>,
    pending_info: Option<&PendingInfo>,
    details_by_id: &HashMap<String, SeasonDetailsState>,
    hit_regions: &mut Vec<HitRegion>,
) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let selected_show = table_state.selected().and_then(|idx| items.get(idx));
    let season_rows = selected_show
        .map(|show| show.season_maps.len() as u16)
        .unwrap_or(0)
        .clamp(1, MAX_GRID_ROWS);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(season_rows + 2),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected_idx = table_state.selected().map(|i| i + 1).unwrap_or(0);
    let selected_text = if selected_idx == 0 {
        "-".to_string()
    } else {
        selected_idx.to_string()
    };
    let mut header_spans = vec![Span::styled(
        "TVTRACK",
        Style::default()
            .fg(Color::Rgb(110, 170, 255))
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(instance) = site_instance {
        header_spans.push(Span::styled("   ", Style::default()));
        header_spans.push(Span::styled(
            instance.to_string(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }
    header_spans.extend([
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("{} shows", items.len()),
            Style::default().fg(Color::Rgb(185, 195, 210)),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("selected {selected_text}"),
            Style::default().fg(Color::Rgb(185, 195, 210)),
        ),
    ]);
    let header = Paragraph::new(Line::from(header_spans))
        .alignment(Alignment::Center)
        .block(panel_block("Dashboard"));
    frame.render_widget(header, chunks[0]);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(64), Constraint::Percentage(36)])
        .split(chunks[1]);
    let details_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3)])
        .split(body_chunks[1]);

    let rows: Vec<Row> = items
        .iter()
        .map(|show| {
            Row::new(vec![
                Cell::from(show.title.clone()),
                Cell::from(show.season_maps.len().to_string()),
                Cell::from(format_progress_text(show)),
                Cell::from(favorite_mark(show.favorite)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(60),
            Constraint::Length(9),
            Constraint::Length(10),
            Constraint::Length(4),
        ],
    )
    .header(
        Row::new(vec!["Title", "Seasons", "Watched", "Fav"]).style(
            Style::default()
                .fg(Color::Rgb(110, 170, 255))
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(panel_block("Library"))
    .row_highlight_style(
        Style::default()
            .bg(Color::Rgb(110, 170, 255))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, body_chunks[0], table_state);

    let selection_text = match selected_show {
        Some(show) => {
            let mut text = format!("Title\n{}", truncate(&show.title, 40));
            for (label, value) in [
                ("TVmaze", &show.tvmaze_id),
                ("Location", &show.location),
                ("Length", &show.length),
            ] {
                if !value.is_empty() {
                    text.push_str(&format!("\n\n{label}\n{}", truncate(value, 40)));
                }
            }
            let up_next = next_unwatched(show)
                .map(|descriptor| describe_slot(show, descriptor))
                .unwrap_or_else(|| "all caught up".to_string());
            text.push_str(&format!("\n\nUp Next\n{up_next}"));
            text
        }
        None => "No tracked shows yet.\n\nAdd one with `tvtrack add` or `tvtrack lookup --add`."
            .to_string(),
    };
    let selection = Paragraph::new(selection_text)
        .style(Style::default().fg(Color::Rgb(230, 230, 230)))
        .block(panel_block("Selected"))
        .alignment(Alignment::Left);
    frame.render_widget(selection, details_chunks[0]);
    if let Some((ratio, label)) = selected_show.and_then(build_progress_gauge) {
        let progress = Gauge::default()
            .block(panel_block("Progress"))
            .gauge_style(
                Style::default()
                    .fg(Color::Rgb(130, 190, 255))
                    .bg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .label(label)
            .ratio(ratio);
        frame.render_widget(progress, details_chunks[1]);
    }

    let seasons_block = panel_block("Seasons");
    let seasons_inner = seasons_block.inner(chunks[2]);
    frame.render_widget(seasons_block, chunks[2]);
    if let Some(show) = selected_show {
        draw_season_rows(frame, show, cursor, seasons_inner, hit_regions);
    }

    let command_bar = Paragraph::new(controls_line())
        .alignment(Alignment::Center)
        .block(panel_block("Controls"));
    frame.render_widget(command_bar, chunks[3]);

    let status_widget = Paragraph::new(status.to_string())
        .style(status_style(status))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, chunks[4]);

    if let Some(confirm) = pending_delete {
        let popup_text = format!(
            "Delete show?\n\n{}\n\nThis cannot be undone.\n\n[y / Enter] Delete   [n / Esc] Cancel",
            truncate(&confirm.title, 56)
        );
        draw_popup(frame, "Confirm Delete", popup_text);
    } else if let Some(info) = pending_info {
        let popup_text = info_popup_text(info, details_by_id.get(&info.tvmaze_id));
        draw_popup(frame, "Episode", popup_text);
    }
}

/// Draws one line per season and records each drawn line as a click target.
fn draw_season_rows(
    frame: &mut Frame,
    show: &Show,
    cursor: GridCursor,
    area: Rect,
    hit_regions: &mut Vec<HitRegion>,
) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    if show.season_maps.is_empty() {
        frame.render_widget(
            Paragraph::new("No seasons recorded.").style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    }

    let visible_rows = usize::from(area.height);
    let first_season = cursor.season.saturating_sub(visible_rows.saturating_sub(1));
    let visible_columns = usize::from(area.width);

    for (row, season_idx) in (first_season..show.season_maps.len())
        .take(visible_rows)
        .enumerate()
    {
        let row_area = Rect::new(area.x, area.y + row as u16, area.width, 1);
        let raw = &show.season_maps[season_idx];
        let season_map = match raw.parse::<SeasonMap>() {
            Ok(season_map) => season_map,
            Err(err) => {
                let text = format!("{:>3} invalid season map: {err}", season_idx + 1);
                frame.render_widget(
                    Paragraph::new(text).style(Style::default().fg(Color::Rgb(255, 145, 120))),
                    row_area,
                );
                continue;
            }
        };
        let watch_map = show
            .watched_episode_maps
            .get(season_idx)
            .map(String::as_str)
            .unwrap_or("");

        let on_cursor = cursor.season == season_idx;
        let season_layout = layout(&season_map);
        let total_columns = column_of(season_layout.total_width) + 1;
        let focus = if on_cursor {
            season_layout
                .slot_midpoint(cursor.slot)
                .map(column_of)
                .unwrap_or(0)
        } else {
            0
        };
        let view = RowView {
            cursor_slot: on_cursor.then_some(cursor.slot),
            column_offset: column_offset_for(focus, total_columns, visible_columns),
            visible_columns,
        };

        let line = season_row_line(season_idx + 1, &season_map, watch_map, view);
        frame.render_widget(Paragraph::new(line), row_area);
        hit_regions.push(HitRegion {
            area: row_area,
            show_id: show.id,
            season_idx,
            column_offset: view.column_offset,
            season_map,
        });
    }
}

fn info_popup_text(info: &PendingInfo, state: Option<&SeasonDetailsState>) -> String {
    let slot = format!(
        "Season {}, slot {}",
        info.descriptor.season,
        info.descriptor.episode_index + 1
    );
    let body = match state {
        None | Some(SeasonDetailsState::Loading) => "Loading episode details...".to_string(),
        Some(SeasonDetailsState::Failed(err)) => format!("Lookup failed: {err}"),
        Some(state) => match state.episode(info.descriptor) {
            Some(episode) => {
                let number = episode
                    .episode_number
                    .map(|number| format!("Episode {number}"))
                    .unwrap_or_else(|| "Special".to_string());
                let mut text = format!("{number}: {}\n{}", episode.title, episode.length);
                if !episode.synopsis.is_empty() {
                    text.push_str("\n\n");
                    text.push_str(&episode.synopsis);
                }
                text
            }
            None => "TVmaze lists no episode for this slot.".to_string(),
        },
    };
    format!(
        "{}\n{slot}\n\n{body}\n\nPress any key to close.",
        truncate(&info.heading, 56)
    )
}

fn draw_popup(frame: &mut Frame, title: &'static str, text: String) {
    let popup_area = popup_rect_for_text(frame.area(), &text);
    render_popup_shadow(frame, popup_area);
    frame.render_widget(Clear, popup_area);
    let popup = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(modal_block(title));
    frame.render_widget(popup, popup_area);
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn modal_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(
            Style::default()
                .fg(Color::Rgb(160, 190, 235))
                .add_modifier(Modifier::BOLD),
        )
        .title(title)
        .padding(Padding::new(2, 2, 1, 1))
}

fn controls_line() -> Line<'static> {
    let key = Style::default()
        .bg(Color::Rgb(72, 82, 96))
        .fg(Color::Rgb(230, 235, 242));
    let text = Style::default().fg(Color::Rgb(185, 195, 210));
    let mut spans = Vec::new();
    for (keys, action) in [
        ("↑/↓", "show"),
        ("←/→", "episode"),
        ("PgUp/PgDn", "season"),
        ("Space", "watched"),
        ("f", "favorite"),
        ("i", "info"),
        ("d", "delete"),
        ("q", "quit"),
    ] {
        spans.push(Span::styled(format!(" {keys} "), key));
        spans.push(Span::styled(format!(" {action}  "), text));
    }
    Line::from(spans)
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else if status.starts_with("INFO:") {
        Style::default().fg(Color::Rgb(205, 165, 255))
    } else {
        Style::default().fg(Color::Rgb(230, 235, 242))
    }
}

fn centered_fixed_rect(width: u16, height: u16, area: Rect) -> Rect {
    let clamped_width = width.min(area.width.max(1));
    let clamped_height = height.min(area.height.max(1));
    let x = area.x + area.width.saturating_sub(clamped_width) / 2;
    let y = area.y + area.height.saturating_sub(clamped_height) / 2;
    Rect::new(x, y, clamped_width, clamped_height)
}

fn render_popup_shadow(frame: &mut Frame, popup_area: Rect) {
    let area = frame.area();
    let shadow = Rect::new(
        (popup_area.x + 1).min(area.x + area.width.saturating_sub(1)),
        (popup_area.y + 1).min(area.y + area.height.saturating_sub(1)),
        popup_area.width.saturating_sub(1),
        popup_area.height.saturating_sub(1),
    );
    if shadow.width == 0 || shadow.height == 0 {
        return;
    }
    let shadow_block = Block::default().style(Style::default().bg(Color::Rgb(14, 16, 24)));
    frame.render_widget(shadow_block, shadow);
}

fn popup_rect_for_text(area: Rect, text: &str) -> Rect {
    let max_line_width = text
        .lines()
        .map(|line| line.chars().count() as u16)
        .max()
        .unwrap_or(0);
    // long synopsis lines wrap, so budget rows for the wrapped height
    let line_count: u16 = text
        .lines()
        .map(|line| (line.chars().count() as u16 / 60) + 1)
        .sum();

    let available_width = area.width.saturating_sub(2).max(1);
    let min_width = 48.min(available_width);
    let max_width = 72.min(available_width);
    let desired_width = max_line_width.saturating_add(12);
    let width = desired_width.clamp(min_width, max_width);

    let available_height = area.height.saturating_sub(2).max(1);
    let min_height = 10.min(available_height);
    let max_height = 24.min(available_height);
    let desired_height = line_count.saturating_add(6);
    let height = desired_height.clamp(min_height, max_height);

    centered_fixed_rect(width, height, area)
}
