use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub(crate) const SEGMENT_SEPARATOR: char = '+';
const REGULAR_CHAR: char = '.';
const SPECIAL_CHAR: char = 'S';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Regular,
    Special,
}

impl Slot {
    fn from_char(ch: char) -> Option<Self> {
        match ch {
            REGULAR_CHAR => Some(Self::Regular),
            SPECIAL_CHAR => Some(Self::Special),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Self::Regular => REGULAR_CHAR,
            Self::Special => SPECIAL_CHAR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    pub(crate) slots: Vec<Slot>,
}

impl Segment {
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn raw(&self) -> String {
        self.slots.iter().map(|slot| slot.as_char()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum SeasonMapError {
    #[error("invalid character '{ch}' at position {position} (expected '.', 'S' or '+')")]
    InvalidSlot { ch: char, position: usize },
    #[error("segment {index} is empty")]
    EmptySegment { index: usize },
}

/// Decoded form of a season's compact `..+S..` string. The string form only
/// exists at the storage and command-line boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SeasonMap {
    pub(crate) segments: Vec<Segment>,
}

impl SeasonMap {
    pub(crate) fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.segments
            .iter()
            .flat_map(|segment| segment.slots.iter().copied())
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    pub(crate) fn regular_episode_count(&self) -> usize {
        self.slots().filter(|slot| *slot == Slot::Regular).count()
    }
}

impl FromStr for SeasonMap {
    type Err = SeasonMapError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            segments: parse_segments(raw)?,
        })
    }
}

impl fmt::Display for SeasonMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                write!(f, "{SEGMENT_SEPARATOR}")?;
            }
            f.write_str(&segment.raw())?;
        }
        Ok(())
    }
}

/// An empty string is an empty season (zero segments). Any other empty
/// segment, such as in `..+` or `+S`, is rejected.
pub(crate) fn parse_segments(season_map: &str) -> Result<Vec<Segment>, SeasonMapError> {
    if season_map.is_empty() {
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    let mut position = 0;
    for (index, run) in season_map.split(SEGMENT_SEPARATOR).enumerate() {
        if run.is_empty() {
            return Err(SeasonMapError::EmptySegment { index });
        }
        let mut slots = Vec::with_capacity(run.len());
        for ch in run.chars() {
            let slot = Slot::from_char(ch).ok_or(SeasonMapError::InvalidSlot { ch, position })?;
            slots.push(slot);
            position += 1;
        }
        segments.push(Segment { slots });
        // account for the separator that split this run from the next
        position += 1;
    }
    Ok(segments)
}

pub(crate) fn strip_separators(season_map: &str) -> String {
    season_map
        .chars()
        .filter(|ch| *ch != SEGMENT_SEPARATOR)
        .collect()
}

pub(crate) fn slot_count(season_map: &str) -> usize {
    season_map
        .chars()
        .filter(|ch| *ch != SEGMENT_SEPARATOR)
        .count()
}

pub(crate) fn regular_episode_number(season_map: &str, slot: usize) -> Option<u32> {
    let mut number = 0;
    for (index, ch) in strip_separators(season_map).chars().enumerate() {
        if ch == REGULAR_CHAR {
            number += 1;
        }
        if index == slot {
            return (ch == REGULAR_CHAR).then_some(number);
        }
    }
    None
}
