//! Season grid geometry.
//!
//! A season is drawn left to right: a square label cell holding the season
//! number, then each segment as a boxed run of slots, with a `+` glyph in the
//! gap between consecutive segments. All coordinates are in the season's own
//! local space; converting pointer positions into that space belongs to the
//! caller.

mod scene;
mod svg;

pub(crate) use scene::*;
pub(crate) use svg::*;

use crate::season_map::SeasonMap;

pub(crate) const BOX_HEIGHT: f64 = 35.0;
pub(crate) const OUTER_STROKE_WIDTH: f64 = BOX_HEIGHT / 10.0;
pub(crate) const DIVIDER_STROKE_WIDTH: f64 = OUTER_STROKE_WIDTH / 2.0;
pub(crate) const INTER_SEGMENT_SPACING: f64 = BOX_HEIGHT * 2.0 / 3.0;
pub(crate) const INNER_WIDTH: f64 = BOX_HEIGHT - 2.0 * OUTER_STROKE_WIDTH;
pub(crate) const LABEL_WIDTH: f64 = BOX_HEIGHT;
pub(crate) const SPECIAL_MARKER: char = '\u{2605}';

const SLOT_PITCH: f64 = INNER_WIDTH + DIVIDER_STROKE_WIDTH;

pub(crate) fn segment_width(slot_count: usize) -> f64 {
    if slot_count == 0 {
        return OUTER_STROKE_WIDTH;
    }
    let n = slot_count as f64;
    n * INNER_WIDTH + (n - 1.0) * DIVIDER_STROKE_WIDTH + OUTER_STROKE_WIDTH
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SegmentSpan {
    pub(crate) x_start: f64,
    pub(crate) x_end: f64,
    pub(crate) slot_count: usize,
    pub(crate) first_slot: usize,
}

impl SegmentSpan {
    fn contains_slot(&self, slot: usize) -> bool {
        slot >= self.first_slot && slot < self.first_slot + self.slot_count
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SeasonLayout {
    pub(crate) total_width: f64,
    pub(crate) segments: Vec<SegmentSpan>,
}

impl SeasonLayout {
    pub(crate) fn slot_count(&self) -> usize {
        self.segments.iter().map(|segment| segment.slot_count).sum()
    }

    /// Horizontal extent of a slot's interior, dividers excluded.
    pub(crate) fn slot_span(&self, slot: usize) -> Option<(f64, f64)> {
        let segment = self
            .segments
            .iter()
            .find(|segment| segment.contains_slot(slot))?;
        let within = (slot - segment.first_slot) as f64;
        let start = segment.x_start + OUTER_STROKE_WIDTH + within * SLOT_PITCH;
        Some((start, start + INNER_WIDTH))
    }

    pub(crate) fn slot_midpoint(&self, slot: usize) -> Option<f64> {
        self.slot_span(slot).map(|(start, end)| (start + end) / 2.0)
    }

    pub(crate) fn separator_centers(&self) -> Vec<f64> {
        self.segments
            .windows(2)
            .map(|pair| pair[0].x_end + INTER_SEGMENT_SPACING / 2.0)
            .collect()
    }
}

pub(crate) fn layout(season_map: &SeasonMap) -> SeasonLayout {
    let mut x = LABEL_WIDTH;
    let mut first_slot = 0;
    let mut segments = Vec::with_capacity(season_map.segments.len());

    for (idx, segment) in season_map.segments.iter().enumerate() {
        if idx > 0 {
            x += INTER_SEGMENT_SPACING;
        }
        let x_end = x + segment_width(segment.len());
        segments.push(SegmentSpan {
            x_start: x,
            x_end,
            slot_count: segment.len(),
            first_slot,
        });
        first_slot += segment.len();
        x = x_end;
    }

    SeasonLayout {
        total_width: x,
        segments,
    }
}

/// Maps a local x coordinate back to the global slot index under it.
/// The label cell, segment strokes, the gaps between segments and anything
/// past the last segment resolve to `None`.
pub(crate) fn slot_at(season_map: &SeasonMap, pointer_x: f64) -> Option<usize> {
    let x = pointer_x - LABEL_WIDTH;

    let mut segment_offset = 0.0;
    let mut slot_count_offset = 0;
    for segment in &season_map.segments {
        let width = segment_width(segment.len());
        if x >= segment_offset && x < segment_offset + width {
            let position = ((x - segment_offset - OUTER_STROKE_WIDTH) / SLOT_PITCH).floor();
            if position >= 0.0 && position < segment.len() as f64 {
                return Some(slot_count_offset + position as usize);
            }
            return None;
        }
        segment_offset += width + INTER_SEGMENT_SPACING;
        slot_count_offset += segment.len();
    }
    None
}
