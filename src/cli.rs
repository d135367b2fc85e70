use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::store::EpisodeDescriptor;

#[derive(Debug, Parser)]
#[command(
    name = "tvtrack",
    version,
    about = "Track watched episodes of TV shows, season by season"
)]
pub struct Cli {
    /// Data file to use instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List every tracked show
    List,
    /// Print one show with its season grid
    Show { id: u64 },
    /// Start tracking a new show
    Add(AddArgs),
    /// Change fields of a show
    Edit(EditArgs),
    /// Mark episodes as watched, given as SEASON:SLOT (both 1-based)
    Watch {
        id: u64,
        #[arg(required = true, value_parser = parse_episode_ref, value_name = "S:E")]
        episodes: Vec<EpisodeDescriptor>,
    },
    /// Mark episodes as unwatched, given as SEASON:SLOT (both 1-based)
    Unwatch {
        id: u64,
        #[arg(required = true, value_parser = parse_episode_ref, value_name = "S:E")]
        episodes: Vec<EpisodeDescriptor>,
    },
    Delete { id: u64 },
    /// Import shows from the old line-based text format
    Import {
        file: PathBuf,
        /// Keep existing shows instead of replacing them
        #[arg(long)]
        append: bool,
    },
    /// Write all shows to a JSON file
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all shows with the contents of an exported JSON file
    Restore { file: PathBuf },
    /// Render a show's seasons as SVG
    Render {
        id: u64,
        /// Render only this season (1-based)
        #[arg(long)]
        season: Option<usize>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Resolve a horizontal grid coordinate to a slot of a season
    Hit {
        id: u64,
        season: usize,
        #[arg(allow_negative_numbers = true)]
        x: f64,
    },
    /// Look a show up on TVmaze
    Lookup(LookupArgs),
    /// Re-derive a show's season maps from TVmaze
    Refresh { id: u64 },
    /// Show TVmaze details for one slot (season and slot are 1-based)
    Info { id: u64, season: usize, slot: usize },
    Tui,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub tvmaze_id: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub length: Option<String>,
    /// Season map such as `..........+S`; repeat once per season
    #[arg(long = "season", value_name = "MAP")]
    pub seasons: Vec<String>,
    #[arg(long)]
    pub favorite: bool,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    pub id: u64,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub tvmaze_id: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub length: Option<String>,
    /// Replaces every season map; repeat once per season
    #[arg(long = "season", value_name = "MAP")]
    pub seasons: Vec<String>,
    /// Replaces every watch map; repeat once per season
    #[arg(long = "watch-map", value_name = "MAP")]
    pub watch_maps: Vec<String>,
    #[arg(long)]
    pub favorite: Option<bool>,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    #[arg(required_unless_present = "search", conflicts_with = "search")]
    pub tvmaze_id: Option<String>,
    #[arg(long, value_name = "QUERY")]
    pub search: Option<String>,
    /// Add the result to the library
    #[arg(long)]
    pub add: bool,
}

pub(crate) fn parse_episode_ref(value: &str) -> Result<EpisodeDescriptor, String> {
    let (season, slot) = value
        .split_once(':')
        .ok_or_else(|| format!("expected SEASON:SLOT, got '{value}'"))?;
    let season = parse_position(season, "season")?;
    let slot = parse_position(slot, "slot")?;
    Ok(EpisodeDescriptor {
        season,
        episode_index: slot - 1,
    })
}

fn parse_position(value: &str, what: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(format!("{what} must be a positive number, got '{value}'")),
        Ok(position) => Ok(position),
    }
}
