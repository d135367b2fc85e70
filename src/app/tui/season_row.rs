use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::grid::{
    BOX_HEIGHT, LABEL_WIDTH, SPECIAL_MARKER, SeasonLayout, SlotLabel, layout, season_scene,
    slot_at,
};
use crate::season_map::SeasonMap;

/// Grid units covered by one terminal column.
pub(crate) const UNITS_PER_COLUMN: f64 = BOX_HEIGHT / 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowCell {
    Label,
    Slot(usize),
    Stroke,
    Gap,
}

/// Local grid x sampled by a column: its centre.
pub(crate) fn column_x(column: usize) -> f64 {
    (column as f64 + 0.5) * UNITS_PER_COLUMN
}

pub(crate) fn column_of(x: f64) -> usize {
    (x / UNITS_PER_COLUMN).floor().max(0.0) as usize
}

fn row_columns(layout: &SeasonLayout) -> usize {
    (layout.total_width / UNITS_PER_COLUMN).ceil() as usize
}

/// What each column of a season row shows. Slot columns are exactly the
/// columns for which `slot_at` resolves, so drawing and clicking agree.
pub(crate) fn classify_columns(season_map: &SeasonMap) -> Vec<RowCell> {
    let layout = layout(season_map);
    (0..row_columns(&layout))
        .map(|column| {
            let x = column_x(column);
            if x < LABEL_WIDTH {
                RowCell::Label
            } else if let Some(slot) = slot_at(season_map, x) {
                RowCell::Slot(slot)
            } else if layout
                .segments
                .iter()
                .any(|segment| x >= segment.x_start && x < segment.x_end)
            {
                RowCell::Stroke
            } else {
                RowCell::Gap
            }
        })
        .collect()
}

/// Leftmost visible column so that `focus` stays on screen.
pub(crate) fn column_offset_for(focus: usize, total: usize, visible: usize) -> usize {
    if total <= visible || visible == 0 {
        return 0;
    }
    focus.saturating_sub(visible / 2).min(total - visible)
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RowView {
    pub(crate) cursor_slot: Option<usize>,
    pub(crate) column_offset: usize,
    pub(crate) visible_columns: usize,
}

pub(crate) fn season_row_line(
    season_number: usize,
    season_map: &SeasonMap,
    watch_map: &str,
    view: RowView,
) -> Line<'static> {
    let scene = season_scene(season_number, season_map, watch_map);
    let cells = classify_columns(season_map);
    let mut glyphs: Vec<(char, Style)> = cells
        .iter()
        .map(|cell| match cell {
            RowCell::Label => (' ', label_style()),
            RowCell::Slot(slot) => {
                let seen = scene
                    .boxes
                    .get(*slot)
                    .is_some_and(|slot_box| slot_box.seen);
                (' ', slot_style(seen, view.cursor_slot == Some(*slot)))
            }
            RowCell::Stroke => ('\u{2502}', stroke_style()),
            RowCell::Gap => (' ', Style::default()),
        })
        .collect();

    let label_columns = cells
        .iter()
        .take_while(|cell| **cell == RowCell::Label)
        .count();
    let season_text = format!("{season_number:>width$} ", width = label_columns.saturating_sub(1));
    for (column, ch) in season_text.chars().take(label_columns).enumerate() {
        glyphs[column].0 = ch;
    }

    for center in &scene.separators {
        if let Some(glyph) = glyphs.get_mut(column_of(*center)) {
            *glyph = ('+', stroke_style());
        }
    }

    for slot_box in &scene.boxes {
        let text = match slot_box.label {
            SlotLabel::Number(number) => number.to_string(),
            SlotLabel::Special => SPECIAL_MARKER.to_string(),
        };
        let width = text.chars().count();
        let start = column_of(slot_box.midpoint()).saturating_sub(width.saturating_sub(1) / 2);
        for (column, ch) in (start..).zip(text.chars()) {
            if cells.get(column) == Some(&RowCell::Slot(slot_box.slot)) {
                glyphs[column].0 = ch;
            }
        }
    }

    let visible = glyphs
        .into_iter()
        .skip(view.column_offset)
        .take(view.visible_columns);
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut run = String::new();
    let mut run_style = Style::default();
    for (ch, style) in visible {
        if style != run_style && !run.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut run), run_style));
        }
        run_style = style;
        run.push(ch);
    }
    if !run.is_empty() {
        spans.push(Span::styled(run, run_style));
    }
    Line::from(spans)
}

fn label_style() -> Style {
    Style::default()
        .fg(Color::Rgb(136, 136, 136))
        .add_modifier(Modifier::BOLD)
}

fn stroke_style() -> Style {
    Style::default().fg(Color::Rgb(125, 135, 150))
}

fn slot_style(seen: bool, cursor: bool) -> Style {
    let style = if seen {
        Style::default().bg(Color::Rgb(204, 204, 204)).fg(Color::Black)
    } else {
        Style::default()
            .bg(Color::Rgb(48, 54, 64))
            .fg(Color::Rgb(230, 235, 242))
    };
    if cursor {
        style
            .bg(Color::Rgb(110, 170, 255))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

/// A drawn season row, kept for the frame so mouse clicks can be resolved
/// against exactly what is on screen.
#[derive(Debug, Clone)]
pub(crate) struct HitRegion {
    pub(crate) area: Rect,
    pub(crate) show_id: u64,
    pub(crate) season_idx: usize,
    pub(crate) column_offset: usize,
    pub(crate) season_map: SeasonMap,
}

impl HitRegion {
    fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.area.x
            && column < self.area.x.saturating_add(self.area.width)
            && row >= self.area.y
            && row < self.area.y.saturating_add(self.area.height)
    }

    pub(crate) fn slot_at_column(&self, column: u16) -> Option<usize> {
        let local = usize::from(column.checked_sub(self.area.x)?) + self.column_offset;
        slot_at(&self.season_map, column_x(local))
    }
}

pub(crate) fn hit_test(regions: &[HitRegion], column: u16, row: u16) -> Option<(&HitRegion, usize)> {
    let region = regions
        .iter()
        .find(|region| region.contains(column, row))?;
    let slot = region.slot_at_column(column)?;
    Some((region, slot))
}
