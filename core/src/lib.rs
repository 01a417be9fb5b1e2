#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the treasure hunt engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative simulator, and the exploration system. Adapters and agents
//! submit [`Command`] values describing the only two permissible mutations,
//! the world executes them via its `apply` entry point and broadcasts
//! [`Event`] values describing what happened. Sensing never mutates anything
//! and is answered through read-only queries.
//!
//! The [`Environment`] trait is the narrow, one-call-at-a-time surface an
//! explorer uses. It deliberately exposes nothing about the true grid beyond
//! its dimensions.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commands that express all permissible simulator mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Chooses a fresh start cell and places the explorer on it.
    Initialize,
    /// Requests a single step in the specified direction.
    Step {
        /// Direction of travel for the attempted step.
        direction: Direction,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Announces that a new start cell was chosen.
    Initialized {
        /// Cell that now carries the start marker.
        start: CellCoord,
        /// Terrain that lies beneath the start marker.
        underlying: CellKind,
    },
    /// Confirms that the explorer moved between two adjacent cells.
    Advanced {
        /// Cell occupied before the step.
        from: CellCoord,
        /// Cell occupied after the step.
        to: CellCoord,
        /// Classification of the destination cell.
        cell: CellKind,
    },
    /// Reports that a step was refused because the destination is impassable.
    Collided {
        /// Cell the explorer still occupies.
        position: CellCoord,
        /// Direction of the refused step.
        direction: Direction,
    },
}

/// Location of a single grid cell expressed as row and column indices.
///
/// Serialized as a two element `[row, column]` array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct CellCoord {
    row: u32,
    column: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Returns the adjacent cell in `direction`, or `None` when the step would
    /// leave the non-negative quadrant.
    ///
    /// Upper bounds are not checked here; see [`GridDimensions::contains`].
    #[must_use]
    pub fn neighbor(self, direction: Direction) -> Option<CellCoord> {
        let (row, column) = match direction {
            Direction::North => (self.row.checked_sub(1)?, self.column),
            Direction::South => (self.row.checked_add(1)?, self.column),
            Direction::East => (self.row, self.column.checked_add(1)?),
            Direction::West => (self.row, self.column.checked_sub(1)?),
        };
        Some(CellCoord::new(row, column))
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }
}

impl From<[u32; 2]> for CellCoord {
    fn from([row, column]: [u32; 2]) -> Self {
        Self::new(row, column)
    }
}

impl From<CellCoord> for [u32; 2] {
    fn from(cell: CellCoord) -> Self {
        [cell.row, cell.column]
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Cardinal movement directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Every direction, in clockwise order starting at north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Direction that undoes a step taken in `self`.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Single letter used by the command surface.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::North => 'N',
            Self::East => 'E',
            Self::South => 'S',
            Self::West => 'W',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Direction {
    type Err = SimError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "N" => Ok(Self::North),
            "E" => Ok(Self::East),
            "S" => Ok(Self::South),
            "W" => Ok(Self::West),
            other => Err(SimError::InvalidDirection(other.to_owned())),
        }
    }
}

/// Classification of a single maze cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    /// Impassable cell.
    Wall,
    /// Open floor.
    Empty,
    /// Open floor carrying the start marker.
    Start,
    /// Open floor holding a treasure.
    Treasure,
}

impl CellKind {
    /// Symbol used for the kind in layouts and map artifacts.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Wall => '#',
            Self::Empty => '.',
            Self::Start => 'S',
            Self::Treasure => 'T',
        }
    }

    /// Parses a layout symbol, returning `None` for anything outside the four
    /// valid symbols.
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '#' => Some(Self::Wall),
            '.' => Some(Self::Empty),
            'S' => Some(Self::Start),
            'T' => Some(Self::Treasure),
            _ => None,
        }
    }

    /// Reports whether an explorer may stand on the cell.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        !matches!(self, Self::Wall)
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wall => "wall",
            Self::Empty => "empty",
            Self::Start => "start",
            Self::Treasure => "treasure",
        };
        f.write_str(name)
    }
}

/// Row and column counts of a grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDimensions {
    rows: u32,
    #[serde(rename = "cols")]
    columns: u32,
}

impl GridDimensions {
    /// Creates a new dimension descriptor.
    #[must_use]
    pub const fn new(rows: u32, columns: u32) -> Self {
        Self { rows, columns }
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.row() < self.rows && cell.column() < self.columns
    }

    /// Reports whether the cell lies on the outermost ring of the grid.
    #[must_use]
    pub const fn is_border(&self, cell: CellCoord) -> bool {
        self.contains(cell)
            && (cell.row() == 0
                || cell.column() == 0
                || cell.row() + 1 == self.rows
                || cell.column() + 1 == self.columns)
    }

    /// Dense row-major index of the cell, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Total number of cells, or `None` when it does not fit in `usize`.
    #[must_use]
    pub fn cell_count(&self) -> Option<usize> {
        let rows = usize::try_from(self.rows).ok()?;
        let columns = usize::try_from(self.columns).ok()?;
        rows.checked_mul(columns)
    }

    /// Iterates every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let columns = self.columns;
        (0..self.rows).flat_map(move |row| (0..columns).map(move |column| CellCoord::new(row, column)))
    }
}

/// Wall flags for the four neighbours of the current cell.
///
/// A flag is `true` when the neighbour is a wall or lies outside the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookReport {
    /// Whether the northern neighbour is blocked.
    #[serde(rename = "N")]
    pub north: bool,
    /// Whether the southern neighbour is blocked.
    #[serde(rename = "S")]
    pub south: bool,
    /// Whether the eastern neighbour is blocked.
    #[serde(rename = "E")]
    pub east: bool,
    /// Whether the western neighbour is blocked.
    #[serde(rename = "W")]
    pub west: bool,
}

impl LookReport {
    /// Reports whether the neighbour in `direction` is blocked.
    #[must_use]
    pub const fn is_blocked(&self, direction: Direction) -> bool {
        match direction {
            Direction::North => self.north,
            Direction::East => self.east,
            Direction::South => self.south,
            Direction::West => self.west,
        }
    }
}

/// Classification of the cell under the explorer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanReport {
    /// Kind of the current cell.
    pub cell: CellKind,
    /// Cell that was scanned.
    pub position: CellCoord,
}

/// Result of a movement request.
///
/// A collision is an ordinary outcome rather than an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveOutcome {
    /// The explorer stepped onto a passable cell.
    Moved {
        /// New position of the explorer.
        position: CellCoord,
        /// Classification of the new position.
        cell: CellKind,
    },
    /// The destination was a wall or outside the grid.
    Collided {
        /// Unchanged position of the explorer.
        position: CellCoord,
    },
}

impl MoveOutcome {
    /// Position of the explorer after the request.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        match self {
            Self::Moved { position, .. } | Self::Collided { position } => *position,
        }
    }
}

/// Rule violations reported by the simulator.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SimError {
    /// An operation other than dimensions was attempted before initialization.
    #[error("simulator has not been initialized")]
    NotInitialized,
    /// A movement argument was not one of `N`, `S`, `E`, `W`.
    #[error("invalid direction '{0}', expected one of N, S, E, W")]
    InvalidDirection(String),
    /// The grid contains no passable cell to start from.
    #[error("grid has no open cells")]
    NoOpenCells,
}

impl SimError {
    /// Stable machine-readable identifier used by the command surface.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "not_initialized",
            Self::InvalidDirection(_) => "invalid_direction",
            Self::NoOpenCells => "no_open_cells",
        }
    }
}

/// One-call-at-a-time surface through which an explorer senses and moves.
///
/// Every call is a complete, sequential step; implementations may persist
/// their state between calls.
pub trait Environment {
    /// Failure type for calls that cannot be answered.
    type Error: std::error::Error + 'static;

    /// Chooses a new start cell and returns it.
    fn initialize(&mut self) -> Result<CellCoord, Self::Error>;

    /// Returns the current position.
    fn position(&self) -> Result<CellCoord, Self::Error>;

    /// Returns the grid dimensions. Available before initialization.
    fn dimensions(&self) -> GridDimensions;

    /// Reports which neighbours of the current cell are blocked.
    fn look(&self) -> Result<LookReport, Self::Error>;

    /// Classifies the current cell.
    fn scan(&self) -> Result<ScanReport, Self::Error>;

    /// Attempts a single step.
    fn step(&mut self, direction: Direction) -> Result<MoveOutcome, Self::Error>;
}
