use crate::season_map::{SeasonMap, Slot};
use crate::watch_map::is_watched;

use super::{BOX_HEIGHT, INNER_WIDTH, SegmentSpan, layout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotLabel {
    Number(u32),
    Special,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SlotBox {
    pub(crate) slot: usize,
    pub(crate) x: f64,
    pub(crate) width: f64,
    pub(crate) label: SlotLabel,
    pub(crate) seen: bool,
    pub(crate) first_in_segment: bool,
}

impl SlotBox {
    pub(crate) fn midpoint(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SeasonScene {
    pub(crate) season_number: usize,
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) boxes: Vec<SlotBox>,
    pub(crate) outlines: Vec<SegmentSpan>,
    pub(crate) separators: Vec<f64>,
}

impl SeasonScene {
    pub(crate) fn seen_count(&self) -> usize {
        self.boxes.iter().filter(|slot_box| slot_box.seen).count()
    }
}

pub(crate) fn season_scene(
    season_number: usize,
    season_map: &SeasonMap,
    watch_map: &str,
) -> SeasonScene {
    let layout = layout(season_map);
    let mut boxes = Vec::with_capacity(layout.slot_count());
    let mut number = 0;

    for (slot, kind) in season_map.slots().enumerate() {
        let Some((x, _)) = layout.slot_span(slot) else {
            continue;
        };
        let label = match kind {
            Slot::Regular => {
                number += 1;
                SlotLabel::Number(number)
            }
            Slot::Special => SlotLabel::Special,
        };
        let first_in_segment = layout
            .segments
            .iter()
            .any(|segment| segment.first_slot == slot);
        boxes.push(SlotBox {
            slot,
            x,
            width: INNER_WIDTH,
            label,
            seen: is_watched(watch_map, slot),
            first_in_segment,
        });
    }

    SeasonScene {
        season_number,
        width: layout.total_width,
        height: BOX_HEIGHT,
        separators: layout.separator_centers(),
        outlines: layout.segments,
        boxes,
    }
}
