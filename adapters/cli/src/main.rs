#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for the blind treasure hunt.
//!
//! Each simulator subcommand is one call against the persisted state file:
//! the process loads the state, performs the call, saves when it mutated
//! anything and prints a single JSON object on stdout. Rule violations are
//! printed as `{"error": ...}` and exit with a failure status.

mod config;
mod grade;

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use treasure_hunt_core::{
    CellCoord, CellKind, GridDimensions, LookReport, MoveOutcome, ScanReport,
};
use treasure_hunt_system_explorer::{ExploreError, Explorer};
use treasure_hunt_world::SimulatorError;

use crate::{
    config::{Overrides, Settings},
    grade::GradeReport,
};

#[derive(Debug, Parser)]
#[command(name = "treasure-hunt", version)]
#[command(about = "Blind treasure hunt simulator and explorer")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Chooses a start cell and resets the simulator
    Init,
    /// Prints the current position
    Pos,
    /// Prints the grid dimensions
    Dims,
    /// Reports which neighbouring cells are walls
    Look,
    /// Classifies the current cell
    Scan,
    /// Attempts one step in direction N, E, S or W
    Move {
        /// Direction letter
        direction: String,
    },
    /// Maps the maze and writes the map artifact
    Explore {
        /// Artifact path [default: the configured map file]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compares a map artifact with the ground-truth layout
    Grade {
        /// Candidate map [default: the configured map file]
        #[arg(long)]
        map: Option<PathBuf>,
        /// Ground-truth layout [default: the configured layout]
        #[arg(long)]
        truth: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Response {
    Initialized {
        ok: bool,
        position: CellCoord,
    },
    Position {
        position: CellCoord,
    },
    Dimensions(GridDimensions),
    Look(LookReport),
    Scan(ScanReport),
    Moved {
        ok: bool,
        position: CellCoord,
        cell: CellKind,
    },
    Collided {
        ok: bool,
        hit: CellKind,
        position: CellCoord,
    },
    Explored(ExploreSummary),
    Graded(GradeReport),
    Rejected {
        error: &'static str,
        message: String,
    },
}

impl Response {
    /// JSON rejection for errors the caller can act on. Store failures
    /// have none and abort the process instead.
    fn rejected(error: &SimulatorError) -> Option<Self> {
        let code = match error {
            SimulatorError::Rules(rule) => rule.code(),
            SimulatorError::State(_) => "inconsistent_state",
            SimulatorError::Store(_) => return None,
        };
        Some(Self::Rejected {
            error: code,
            message: error.to_string(),
        })
    }

    fn exit_code(&self) -> ExitCode {
        match self {
            Self::Rejected { .. } | Self::Graded(GradeReport { passed: false, .. }) => {
                ExitCode::FAILURE
            }
            _ => ExitCode::SUCCESS,
        }
    }
}

impl From<MoveOutcome> for Response {
    fn from(outcome: MoveOutcome) -> Self {
        match outcome {
            MoveOutcome::Moved { position, cell } => Self::Moved {
                ok: true,
                position,
                cell,
            },
            MoveOutcome::Collided { position } => Self::Collided {
                ok: false,
                hit: CellKind::Wall,
                position,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ExploreSummary {
    ok: bool,
    start: CellCoord,
    output: String,
    cells_visited: usize,
    forward_moves: usize,
    backtrack_moves: usize,
    scans: usize,
    looks: usize,
}

/// Entry point for the treasure hunt command-line interface.
fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let settings = Settings::resolve(&cli.overrides)?;
    debug!(?settings, command = ?cli.command, "running command");
    let response = run(&settings, cli.command)?;

    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, &response).context("failed to encode the response")?;
    writeln!(stdout).context("failed to write the response")?;
    Ok(response.exit_code())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(settings: &Settings, command: CliCommand) -> Result<Response> {
    match command {
        CliCommand::Dims => Ok(Response::Dimensions(settings.maze()?.dimensions())),
        CliCommand::Explore { output } => {
            let output = output.unwrap_or_else(|| settings.map.clone());
            explore(settings, &output)
        }
        CliCommand::Grade { map, truth } => {
            let map = map.unwrap_or_else(|| settings.map.clone());
            grade_map(settings, &map, truth.as_deref())
        }
        CliCommand::Init => settle(
            settings,
            settings
                .simulator()?
                .initialize()
                .map(|position| Response::Initialized { ok: true, position }),
        ),
        CliCommand::Pos => settle(
            settings,
            settings
                .simulator()?
                .position()
                .map(|position| Response::Position { position }),
        ),
        CliCommand::Look => settle(settings, settings.simulator()?.look().map(Response::Look)),
        CliCommand::Scan => settle(settings, settings.simulator()?.scan().map(Response::Scan)),
        CliCommand::Move { direction } => settle(
            settings,
            settings
                .simulator()?
                .step_named(&direction)
                .map(Response::from),
        ),
    }
}

/// Turns rejections into JSON responses and everything else into a process
/// error.
fn settle(settings: &Settings, result: Result<Response, SimulatorError>) -> Result<Response> {
    let error = match result {
        Ok(response) => return Ok(response),
        Err(error) => error,
    };
    match Response::rejected(&error) {
        Some(response) => Ok(response),
        None => Err(error).with_context(|| {
            format!(
                "simulator state in {} is unavailable",
                settings.state.display()
            )
        }),
    }
}

fn explore(settings: &Settings, output: &Path) -> Result<Response> {
    let mut simulator = settings.simulator()?;
    let exploration = match Explorer::new().explore(&mut simulator) {
        Ok(exploration) => exploration,
        Err(ExploreError::Environment(error)) => return settle(settings, Err(error)),
        Err(error) => return Err(error).context("exploration failed"),
    };

    fs::write(output, exploration.artifact())
        .with_context(|| format!("failed to write {}", output.display()))?;

    let stats = exploration.stats;
    Ok(Response::Explored(ExploreSummary {
        ok: true,
        start: exploration.start,
        output: output.display().to_string(),
        cells_visited: stats.cells_visited,
        forward_moves: stats.forward_moves,
        backtrack_moves: stats.backtrack_moves,
        scans: stats.scans,
        looks: stats.looks,
    }))
}

fn grade_map(settings: &Settings, map: &Path, truth: Option<&Path>) -> Result<Response> {
    let truth = match truth {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read ground truth {}", path.display()))?,
        None => settings.layout_text()?,
    };
    let report = match fs::read_to_string(map) {
        Ok(candidate) => grade::grade(&truth, &candidate),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            GradeReport::missing(&map.display().to_string())
        }
        Err(error) => {
            return Err(error).with_context(|| format!("failed to read {}", map.display()));
        }
    };
    Ok(Response::Graded(report))
}
