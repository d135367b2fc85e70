use crate::season_map::slot_count;

pub(crate) const WATCHED: char = 'x';
pub(crate) const UNWATCHED: char = '.';

/// Legacy "seen through" marker: every season before `season` is fully
/// watched, `season` itself is watched for its first `slots` slots
/// (`None` meaning all of them).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProgressMarker {
    pub(crate) season: usize,
    pub(crate) slots: Option<usize>,
}

impl ProgressMarker {
    pub(crate) const UNSTARTED: Self = Self {
        season: 0,
        slots: Some(0),
    };
}

pub(crate) fn is_aligned(watch_maps: &[String], season_maps: &[String]) -> bool {
    watch_maps.len() == season_maps.len()
        && watch_maps
            .iter()
            .zip(season_maps)
            .all(|(watch_map, season_map)| watch_map.chars().count() == slot_count(season_map))
}

/// Resizes each watch map to its season's slot count, keeping existing flags
/// by position. Growth and shrinkage are assumed to happen at the end of a
/// season; an episode inserted mid-season shifts every later flag by one.
pub(crate) fn reconcile(prior: Vec<String>, season_maps: &[String]) -> Vec<String> {
    if is_aligned(&prior, season_maps) {
        return prior;
    }

    season_maps
        .iter()
        .enumerate()
        .map(|(idx, season_map)| {
            let expected = slot_count(season_map);
            let mut sanitized: String = prior
                .get(idx)
                .map(|watch_map| watch_map.chars().take(expected).collect())
                .unwrap_or_default();
            let present = sanitized.chars().count();
            if present < expected {
                sanitized.extend(std::iter::repeat_n(UNWATCHED, expected - present));
            }
            sanitized
        })
        .collect()
}

pub(crate) fn set_flag(watch_map: &mut String, index: usize, watched: bool) -> bool {
    let mut chars: Vec<char> = watch_map.chars().collect();
    let Some(flag) = chars.get_mut(index) else {
        return false;
    };
    *flag = if watched { WATCHED } else { UNWATCHED };
    *watch_map = chars.into_iter().collect();
    true
}

pub(crate) fn is_watched(watch_map: &str, index: usize) -> bool {
    watch_map.chars().nth(index) == Some(WATCHED)
}

pub(crate) fn watched_count(watch_map: &str) -> usize {
    watch_map.chars().filter(|ch| *ch == WATCHED).count()
}

pub(crate) fn from_progress_marker(season_maps: &[String], marker: ProgressMarker) -> Vec<String> {
    season_maps
        .iter()
        .enumerate()
        .map(|(idx, season_map)| {
            let season_number = idx + 1;
            let total = slot_count(season_map);
            let seen = if season_number < marker.season {
                total
            } else if season_number > marker.season {
                0
            } else {
                marker.slots.map_or(total, |slots| slots.min(total))
            };
            let mut watch_map = String::with_capacity(total);
            watch_map.extend(std::iter::repeat_n(WATCHED, seen));
            watch_map.extend(std::iter::repeat_n(UNWATCHED, total - seen));
            watch_map
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn extending_a_season_keeps_flags_and_pads_unwatched() {
        let reconciled = reconcile(strings(&["xx.."]), &strings(&["......"]));
        assert_eq!(reconciled, strings(&["xx...."]));
    }

    #[test]
    fn shrinking_a_season_truncates_flags() {
        let reconciled = reconcile(strings(&["xxxx"]), &strings(&[".."]));
        assert_eq!(reconciled, strings(&["xx"]));
    }

    #[test]
    fn aligned_maps_are_returned_untouched() {
        let prior = strings(&["x.x", "....x"]);
        let season_maps = strings(&["S..", "..+..."]);
        assert!(is_aligned(&prior, &season_maps));
        assert_eq!(reconcile(prior.clone(), &season_maps), prior);
    }

    #[test]
    fn new_seasons_start_unwatched_and_removed_seasons_drop() {
        let reconciled = reconcile(strings(&["xx"]), &strings(&["..", "S.+.."]));
        assert_eq!(reconciled, strings(&["xx", "...."]));

        let reconciled = reconcile(strings(&["xx", "x.x"]), &strings(&[".."]));
        assert_eq!(reconciled, strings(&["xx"]));
    }

    #[test]
    fn separators_do_not_count_as_slots() {
        let reconciled = reconcile(Vec::new(), &strings(&["..+S..", ""]));
        assert_eq!(reconciled, strings(&[".....", ""]));
    }

    #[test]
    fn set_flag_ignores_out_of_range_indices() {
        let mut watch_map = "....".to_string();
        assert!(set_flag(&mut watch_map, 2, true));
        assert_eq!(watch_map, "..x.");
        assert!(!set_flag(&mut watch_map, 4, true));
        assert_eq!(watch_map, "..x.");
        assert!(set_flag(&mut watch_map, 2, false));
        assert_eq!(watch_map, "....");
    }

    #[test]
    fn progress_marker_fills_earlier_seasons() {
        let season_maps = strings(&["...", "..+S.", "..."]);
        let marker = ProgressMarker {
            season: 2,
            slots: Some(3),
        };
        assert_eq!(
            from_progress_marker(&season_maps, marker),
            strings(&["xxx", "xxx.", "..."])
        );

        let whole_season = ProgressMarker {
            season: 2,
            slots: None,
        };
        assert_eq!(
            from_progress_marker(&season_maps, whole_season),
            strings(&["xxx", "xxxx", "..."])
        );

        assert_eq!(
            from_progress_marker(&season_maps, ProgressMarker::UNSTARTED),
            strings(&["...", "....", "..."])
        );
    }

    #[test]
    fn counts_watched_flags() {
        assert_eq!(watched_count("x.xx."), 3);
        assert!(is_watched("x.", 0));
        assert!(!is_watched("x.", 1));
        assert!(!is_watched("x.", 7));
    }
}
