//! Run settings assembled from an optional TOML file and command-line flags.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use treasure_hunt_core::CellCoord;
use treasure_hunt_world::{JsonFileStore, Maze, Simulator, DEFAULT_LAYOUT};

/// Configuration file consulted when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "treasure-hunt.toml";
const DEFAULT_STATE_FILE: &str = "state.json";
const DEFAULT_MAP_FILE: &str = "map.txt";

/// Simulator backed by the on-disk state file.
pub(crate) type FileSimulator = Simulator<JsonFileStore, ChaCha8Rng>;

/// Flags shared by every subcommand. Each one overrides the matching entry
/// of the configuration file.
#[derive(Debug, Default, Args)]
pub(crate) struct Overrides {
    /// TOML configuration file [default: treasure-hunt.toml when present]
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,
    /// Maze layout file; the built-in 7x7 maze is used when absent
    #[arg(long, global = true)]
    pub(crate) layout: Option<PathBuf>,
    /// Persisted simulator state file [default: state.json]
    #[arg(long, global = true)]
    pub(crate) state: Option<PathBuf>,
    /// Seed for start selection; entropy is used when absent
    #[arg(long, global = true)]
    pub(crate) seed: Option<u64>,
    /// Pins the start cell, given as ROW,COL
    #[arg(long, global = true, value_parser = parse_cell)]
    pub(crate) start: Option<CellCoord>,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    layout: Option<PathBuf>,
    state: Option<PathBuf>,
    map: Option<PathBuf>,
    seed: Option<u64>,
    start: Option<CellCoord>,
}

impl FileConfig {
    fn parse(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).with_context(|| format!("invalid configuration in {}", origin.display()))
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) layout: Option<PathBuf>,
    pub(crate) state: PathBuf,
    pub(crate) map: PathBuf,
    pub(crate) seed: Option<u64>,
    pub(crate) start: Option<CellCoord>,
}

impl Settings {
    /// Reads the configuration file, if any, and applies the flag overrides.
    pub(crate) fn resolve(overrides: &Overrides) -> Result<Self> {
        let file = match overrides.config.as_deref() {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                FileConfig::parse(&text, path)?
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    let text = fs::read_to_string(path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    FileConfig::parse(&text, path)?
                } else {
                    FileConfig::default()
                }
            }
        };
        Ok(Self::merge(file, overrides))
    }

    fn merge(file: FileConfig, overrides: &Overrides) -> Self {
        Self {
            layout: overrides.layout.clone().or(file.layout),
            state: overrides
                .state
                .clone()
                .or(file.state)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
            map: file.map.unwrap_or_else(|| PathBuf::from(DEFAULT_MAP_FILE)),
            seed: overrides.seed.or(file.seed),
            start: overrides.start.or(file.start),
        }
    }

    /// Text of the configured layout, or the built-in maze.
    pub(crate) fn layout_text(&self) -> Result<String> {
        match &self.layout {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("failed to read layout {}", path.display())),
            None => Ok(DEFAULT_LAYOUT.to_owned()),
        }
    }

    /// Parses the configured layout.
    pub(crate) fn maze(&self) -> Result<Maze> {
        let text = self.layout_text()?;
        let maze = Maze::parse(&text).with_context(|| match &self.layout {
            Some(path) => format!("invalid layout {}", path.display()),
            None => "invalid built-in layout".to_owned(),
        })?;
        Ok(maze)
    }

    /// Builds a simulator over the configured layout and state file.
    pub(crate) fn simulator(&self) -> Result<FileSimulator> {
        let rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let simulator = Simulator::new(self.maze()?, JsonFileStore::new(&self.state), rng);
        match self.start {
            Some(cell) => simulator
                .with_pinned_start(cell)
                .with_context(|| format!("cannot pin the start to {cell}")),
            None => Ok(simulator),
        }
    }
}

fn parse_cell(text: &str) -> Result<CellCoord> {
    let Some((row, column)) = text.split_once(',') else {
        bail!("expected ROW,COL but found '{text}'");
    };
    let row = row
        .trim()
        .parse()
        .with_context(|| format!("invalid row in '{text}'"))?;
    let column = column
        .trim()
        .parse()
        .with_context(|| format!("invalid column in '{text}'"))?;
    Ok(CellCoord::new(row, column))
}
