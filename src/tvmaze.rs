use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::http::{HttpError, RetryPolicy, get_text_with_retries};

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.tvmaze.com/";

const REGULAR: &str = "regular";
const SIGNIFICANT_SPECIAL: &str = "significant_special";

#[derive(Debug, Error)]
pub(crate) enum TvMazeError {
    #[error("no TVmaze show matched '{0}'")]
    NotFound(String),
    #[error("TVmaze request failed: {0}")]
    Http(#[from] HttpError),
    #[error("unexpected TVmaze response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ShowInfo {
    pub(crate) tvmaze_id: String,
    pub(crate) title: String,
    pub(crate) length: String,
    pub(crate) season_maps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EpisodeMetadata {
    pub(crate) season: u32,
    pub(crate) episode_number: Option<u32>,
    pub(crate) title: String,
    pub(crate) length: String,
    pub(crate) synopsis: String,
}

/// Read-only provider of show structure and per-episode details.
pub(crate) trait EpisodeSource {
    fn fetch_show(&self, tvmaze_id: &str) -> Result<ShowInfo, TvMazeError>;
    fn search_show(&self, query: &str) -> Result<ShowInfo, TvMazeError>;
    /// Details indexed `[season - 1][slot]`, aligned with the season maps
    /// built from the same episode list.
    fn fetch_season_details(&self, tvmaze_id: &str)
    -> Result<Vec<Vec<EpisodeMetadata>>, TvMazeError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvMazeShow {
    id: u64,
    name: String,
    runtime: Option<u32>,
    average_runtime: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TvMazeEpisode {
    pub(crate) season: u32,
    pub(crate) number: Option<u32>,
    #[serde(rename = "type", default)]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) runtime: Option<u32>,
    #[serde(default)]
    pub(crate) summary: Option<String>,
}

impl TvMazeEpisode {
    fn slot_char(&self) -> Option<char> {
        match self.kind.as_str() {
            REGULAR => Some('.'),
            SIGNIFICANT_SPECIAL => Some('S'),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TvMazeClient {
    base_url: String,
    policy: RetryPolicy,
}

impl TvMazeClient {
    pub(crate) fn new(base_url: &str) -> Self {
        Self::with_policy(base_url, RetryPolicy::default())
    }

    pub(crate) fn with_policy(base_url: &str, policy: RetryPolicy) -> Self {
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { base_url, policy }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        relative: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TvMazeError> {
        let url = format!("{}{relative}", self.base_url);
        let body = get_text_with_retries(&url, query, self.policy)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn fetch_episodes(&self, tvmaze_id: &str) -> Result<Vec<TvMazeEpisode>, TvMazeError> {
        let episodes: Vec<TvMazeEpisode> = self.get_json(
            &format!("shows/{}/episodes", encode_path_segment(tvmaze_id)),
            &[("specials", "1")],
        )?;
        debug!(tvmaze_id, count = episodes.len(), "fetched episode list");
        Ok(episodes)
    }
}

impl EpisodeSource for TvMazeClient {
    fn fetch_show(&self, tvmaze_id: &str) -> Result<ShowInfo, TvMazeError> {
        let show: TvMazeShow = self
            .get_json(&format!("shows/{}", encode_path_segment(tvmaze_id)), &[])
            .map_err(|err| not_found_as(err, tvmaze_id))?;
        let episodes = self.fetch_episodes(&show.id.to_string())?;
        Ok(construct_show(show, &episodes))
    }

    fn search_show(&self, query: &str) -> Result<ShowInfo, TvMazeError> {
        let show: TvMazeShow = self
            .get_json("singlesearch/shows", &[("q", query)])
            .map_err(|err| not_found_as(err, query))?;
        let episodes = self.fetch_episodes(&show.id.to_string())?;
        Ok(construct_show(show, &episodes))
    }

    fn fetch_season_details(
        &self,
        tvmaze_id: &str,
    ) -> Result<Vec<Vec<EpisodeMetadata>>, TvMazeError> {
        let episodes = self
            .fetch_episodes(tvmaze_id)
            .map_err(|err| not_found_as(err, tvmaze_id))?;
        Ok(season_details_from_episodes(&episodes))
    }
}

fn not_found_as(err: TvMazeError, query: &str) -> TvMazeError {
    if matches!(&err, TvMazeError::Http(http) if http.status() == Some(404)) {
        TvMazeError::NotFound(query.to_string())
    } else {
        err
    }
}

fn construct_show(show: TvMazeShow, episodes: &[TvMazeEpisode]) -> ShowInfo {
    let runtime = show
        .runtime
        .filter(|minutes| *minutes > 0)
        .or(show.average_runtime.filter(|minutes| *minutes > 0));
    ShowInfo {
        tvmaze_id: show.id.to_string(),
        title: show.name,
        length: format_length(runtime),
        season_maps: season_maps_from_episodes(episodes),
    }
}

fn format_length(minutes: Option<u32>) -> String {
    match minutes {
        Some(minutes) => format!("{minutes} min."),
        None => "n/a".to_string(),
    }
}

/// Regular episodes become `.`, significant specials `S`; everything else is
/// left out. Seasons with no listed episodes come back as empty maps.
pub(crate) fn season_maps_from_episodes(episodes: &[TvMazeEpisode]) -> Vec<String> {
    let mut maps: Vec<String> = Vec::new();
    for episode in episodes {
        let Some(slot) = episode.slot_char() else {
            continue;
        };
        let Some(season_idx) = (episode.season as usize).checked_sub(1) else {
            continue;
        };
        if maps.len() <= season_idx {
            maps.resize(season_idx + 1, String::new());
        }
        maps[season_idx].push(slot);
    }
    maps
}

pub(crate) fn season_details_from_episodes(episodes: &[TvMazeEpisode]) -> Vec<Vec<EpisodeMetadata>> {
    let mut seasons: Vec<Vec<EpisodeMetadata>> = Vec::new();
    for episode in episodes {
        if episode.slot_char().is_none() {
            continue;
        }
        let Some(season_idx) = (episode.season as usize).checked_sub(1) else {
            continue;
        };
        if seasons.len() <= season_idx {
            seasons.resize_with(season_idx + 1, Vec::new);
        }
        seasons[season_idx].push(EpisodeMetadata {
            season: episode.season,
            episode_number: episode.number,
            title: episode.name.clone().unwrap_or_default(),
            length: format_length(episode.runtime),
            synopsis: strip_tags(episode.summary.as_deref().unwrap_or_default()),
        });
    }
    seasons
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::{Behavior, TestServer};

    fn episode(season: u32, number: Option<u32>, kind: &str) -> TvMazeEpisode {
        TvMazeEpisode {
            season,
            number,
            kind: kind.to_string(),
            name: Some(format!("S{season} {kind}")),
            runtime: Some(42),
            summary: Some("<p>Something <b>happens</b>.</p>".to_string()),
        }
    }

    fn client(server: &TestServer) -> TvMazeClient {
        TvMazeClient::with_policy(
            &server.base_url,
            RetryPolicy {
                connect_timeout: Duration::from_millis(200),
                read_timeout: Duration::from_millis(500),
                attempts: 1,
                retry_delay: Duration::from_millis(1),
            },
        )
    }

    #[test]
    fn season_maps_follow_episode_types() {
        let episodes = vec![
            episode(1, Some(1), "regular"),
            episode(1, None, "significant_special"),
            episode(1, None, "insignificant_special"),
            episode(1, Some(2), "regular"),
            episode(3, Some(1), "regular"),
        ];
        assert_eq!(season_maps_from_episodes(&episodes), vec![".S.", "", "."]);
    }

    #[test]
    fn season_details_line_up_with_season_maps() {
        let episodes = vec![
            episode(1, Some(1), "regular"),
            episode(1, None, "insignificant_special"),
            episode(1, None, "significant_special"),
            episode(2, Some(1), "regular"),
        ];
        let details = season_details_from_episodes(&episodes);
        let maps = season_maps_from_episodes(&episodes);
        assert_eq!(details.len(), maps.len());
        for (season, map) in details.iter().zip(&maps) {
            assert_eq!(season.len(), map.len());
        }
        assert_eq!(details[0][1].episode_number, None);
        assert_eq!(details[0][1].synopsis, "Something happens.");
        assert_eq!(details[0][1].length, "42 min.");
    }

    #[test]
    fn strips_markup_from_synopsis() {
        assert_eq!(strip_tags("<p>A <i>b</i> c</p>"), "A b c");
        assert_eq!(strip_tags("plain"), "plain");
    }

    #[test]
    fn encodes_unsafe_path_characters() {
        assert_eq!(encode_path_segment("82"), "82");
        assert_eq!(encode_path_segment("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn fetch_show_builds_info_from_show_and_episodes() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(
                200,
                r#"{"id":82,"name":"Game of Thrones","runtime":null,"averageRuntime":60}"#
                    .to_string(),
            ),
            Behavior::Respond(
                200,
                r#"[{"id":1,"name":"Winter Is Coming","season":1,"number":1,"type":"regular","runtime":62,"summary":"<p>Start.</p>"},
                   {"id":2,"name":"Special","season":1,"number":null,"type":"significant_special","runtime":50,"summary":null},
                   {"id":3,"name":"The North","season":2,"number":1,"type":"regular","runtime":55,"summary":""}]"#
                    .to_string(),
            ),
        ]);

        let info = client(&server).fetch_show("82").expect("fetch show");
        assert_eq!(info.tvmaze_id, "82");
        assert_eq!(info.title, "Game of Thrones");
        assert_eq!(info.length, "60 min.");
        assert_eq!(info.season_maps, vec![".S", "."]);
        assert_eq!(
            server.targets(),
            vec!["/shows/82", "/shows/82/episodes?specials=1"]
        );
    }

    #[test]
    fn search_miss_is_not_found() {
        let server = TestServer::spawn(vec![Behavior::Respond(404, String::new())]);
        let err = client(&server)
            .search_show("no such show")
            .expect_err("404 should be a miss");
        assert!(matches!(err, TvMazeError::NotFound(ref query) if query == "no such show"));
        assert_eq!(server.targets(), vec!["/singlesearch/shows?q=no+such+show"]);
    }
}
