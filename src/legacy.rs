use thiserror::Error;
use tracing::warn;

use crate::season_map::{SEGMENT_SEPARATOR, parse_segments};
use crate::store::Show;
use crate::watch_map::{ProgressMarker, from_progress_marker};

const SEASON_SEPARATOR: char = '|';
const FIELD_COUNT: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LegacyRecord {
    pub(crate) title: String,
    pub(crate) tvmaze_id: String,
    pub(crate) location: String,
    pub(crate) length: String,
    pub(crate) season_maps: Vec<String>,
    pub(crate) watched_episode_maps: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct LegacyImport {
    pub(crate) records: Vec<LegacyRecord>,
    pub(crate) skipped: usize,
}

impl LegacyImport {
    pub(crate) fn into_shows(self, first_id: u64) -> Vec<Show> {
        self.records
            .into_iter()
            .zip(first_id..)
            .map(|(record, id)| Show {
                id,
                tvmaze_id: record.tvmaze_id,
                title: record.title,
                location: record.location,
                length: record.length,
                season_maps: record.season_maps,
                watched_episode_maps: record.watched_episode_maps,
                favorite: false,
            })
            .collect()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum LegacyLineError {
    #[error("expected {FIELD_COUNT} comma-separated fields, found {0}")]
    MissingFields(usize),
    #[error("season {season}: {reason}")]
    Season { season: usize, reason: String },
    #[error("unrecognized progress marker '{0}'")]
    Progress(String),
}

pub(crate) fn parse_legacy(text: &str) -> LegacyImport {
    let mut import = LegacyImport::default();
    for (line_no, raw_line) in text.lines().enumerate() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(record) => import.records.push(record),
            Err(err) => {
                warn!(
                    line = line_no + 1,
                    error = %err,
                    input = line,
                    "skipping invalid legacy line"
                );
                import.skipped += 1;
            }
        }
    }
    import
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_line(line: &str) -> Result<LegacyRecord, LegacyLineError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < FIELD_COUNT {
        return Err(LegacyLineError::MissingFields(fields.len()));
    }

    let season_maps = parse_season_descriptors(fields[4])?;
    let marker = parse_progress(fields[5])?;
    let watched_episode_maps = from_progress_marker(&season_maps, marker);

    Ok(LegacyRecord {
        title: fields[0].to_string(),
        tvmaze_id: fields[1].to_string(),
        location: fields[2].to_string(),
        length: fields[3].to_string(),
        season_maps,
        watched_episode_maps,
    })
}

/// Seasons are separated by `|` and segments by `+`. A segment is either an
/// episode count (`12`) or an explicit run of `.` and `S`.
pub(crate) fn parse_season_descriptors(descriptor: &str) -> Result<Vec<String>, LegacyLineError> {
    descriptor
        .split(SEASON_SEPARATOR)
        .enumerate()
        .map(|(idx, season)| {
            parse_season_descriptor(season.trim()).map_err(|reason| LegacyLineError::Season {
                season: idx + 1,
                reason,
            })
        })
        .collect()
}

fn parse_season_descriptor(season: &str) -> Result<String, String> {
    let mut segments = Vec::new();
    for segment in season.split(SEGMENT_SEPARATOR) {
        let segment = segment.trim();
        if segment.is_empty() {
            return Err("segment is empty".to_string());
        }
        match segment.parse::<usize>() {
            Ok(0) => return Err("segment has no episodes".to_string()),
            Ok(count) => segments.push(".".repeat(count)),
            Err(_) => segments.push(segment.to_string()),
        }
    }
    let joined = segments.join(&SEGMENT_SEPARATOR.to_string());
    parse_segments(&joined).map_err(|err| err.to_string())?;
    Ok(joined)
}

fn parse_progress(field: &str) -> Result<ProgressMarker, LegacyLineError> {
    if field == "0" || field.eq_ignore_ascii_case("unstarted") {
        return Ok(ProgressMarker::UNSTARTED);
    }

    let invalid = || LegacyLineError::Progress(field.to_string());
    let (season, slots) = match field.split_once(':') {
        Some((season, slots)) => (season, Some(slots)),
        None => (field, None),
    };
    if season.is_empty() || !season.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(invalid());
    }
    let season = season.parse::<usize>().map_err(|_| invalid())?;
    let slots = match slots {
        Some(slots) if !slots.is_empty() && slots.chars().all(|ch| ch.is_ascii_digit()) => {
            Some(slots.parse::<usize>().map_err(|_| invalid())?)
        }
        Some(_) => return Err(invalid()),
        None => None,
    };
    Ok(ProgressMarker { season, slots })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_counts_and_explicit_runs() {
        let text = "\
// title, tvmaze, location, length, seasons, progress
Better Call Saul, 618, Netflix, 50 min., 10|10+S|..S.., 2:3
Severance, 44933, Apple TV+, 55 min., 9, unstarted // not started yet
";
        let import = parse_legacy(text);
        assert_eq!(import.skipped, 0);
        assert_eq!(import.records.len(), 2);

        let saul = &import.records[0];
        assert_eq!(saul.title, "Better Call Saul");
        assert_eq!(saul.tvmaze_id, "618");
        assert_eq!(saul.location, "Netflix");
        assert_eq!(saul.length, "50 min.");
        assert_eq!(saul.season_maps, vec!["..........", "..........+S", "..S.."]);
        assert_eq!(
            saul.watched_episode_maps,
            vec!["xxxxxxxxxx", "xxx........", "....."]
        );

        let severance = &import.records[1];
        assert_eq!(severance.season_maps, vec!["........."]);
        assert_eq!(severance.watched_episode_maps, vec!["........."]);
    }

    #[test]
    fn whole_season_marker_watches_every_slot() {
        let import = parse_legacy("Show, 1, , , 2|S.+., 2\n");
        assert_eq!(import.records[0].watched_episode_maps, vec!["xx", "xxx"]);
    }

    #[test]
    fn malformed_lines_are_skipped_and_counted() {
        let text = "\
Too, Few, Fields
Bad Season, 1, , , 3+x, 1
Empty Segment, 1, , , 3+, 1
Zero Count, 1, , , 0, 1
Empty Season, 1, , , 10||5, 0
Bad Marker, 1, , , 3, S1E2
Good, 1, , , 3, 1:1
";
        let import = parse_legacy(text);
        assert_eq!(import.skipped, 6);
        assert_eq!(import.records.len(), 1);
        assert_eq!(import.records[0].title, "Good");
        assert_eq!(import.records[0].watched_episode_maps, vec!["x.."]);
    }

    #[test]
    fn progress_marker_forms() {
        assert_eq!(parse_progress("0"), Ok(ProgressMarker::UNSTARTED));
        assert_eq!(parse_progress("Unstarted"), Ok(ProgressMarker::UNSTARTED));
        assert_eq!(
            parse_progress("3"),
            Ok(ProgressMarker {
                season: 3,
                slots: None
            })
        );
        assert_eq!(
            parse_progress("3:7"),
            Ok(ProgressMarker {
                season: 3,
                slots: Some(7)
            })
        );
        assert!(parse_progress("3:").is_err());
        assert!(parse_progress(":3").is_err());
        assert!(parse_progress("-1").is_err());
    }

    #[test]
    fn imported_records_get_sequential_ids() {
        let import = parse_legacy("A, , , , 1, 0\nB, , , , 2, 1\n");
        let shows = import.into_shows(4);
        let ids: Vec<u64> = shows.iter().map(|show| show.id).collect();
        assert_eq!(ids, vec![4, 5]);
        assert!(shows.iter().all(|show| !show.favorite));
    }
}
