//! The explorer's private reconstruction of the maze.

use std::fmt;

use thiserror::Error;
use treasure_hunt_core::{CellCoord, CellKind, GridDimensions};

/// What the explorer believes about a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Belief {
    /// Not yet sensed.
    Unknown,
    /// Impassable.
    Wall,
    /// Open floor.
    Empty,
    /// The cell the run started on.
    Start,
    /// Open floor holding a treasure.
    Treasure,
}

impl Belief {
    /// Symbol used when rendering the map artifact.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Unknown => '?',
            Self::Wall => '#',
            Self::Empty => '.',
            Self::Start => 'S',
            Self::Treasure => 'T',
        }
    }
}

impl From<CellKind> for Belief {
    fn from(kind: CellKind) -> Self {
        match kind {
            CellKind::Wall => Self::Wall,
            CellKind::Empty => Self::Empty,
            CellKind::Start => Self::Start,
            CellKind::Treasure => Self::Treasure,
        }
    }
}

impl fmt::Display for Belief {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Attempts to update the belief grid that would break its invariants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BeliefError {
    /// The cell lies outside the grid.
    #[error("cell {cell} is outside the belief grid")]
    OutOfBounds {
        /// Offending cell.
        cell: CellCoord,
    },
    /// The grid has more cells than memory can address.
    #[error("a {rows}x{columns} grid is too large to map")]
    TooLarge {
        /// Row count of the requested grid.
        rows: u32,
        /// Column count of the requested grid.
        columns: u32,
    },
    /// The cell already left `Unknown`.
    #[error("cell {cell} is already classified as '{existing}'")]
    AlreadyClassified {
        /// Offending cell.
        cell: CellCoord,
        /// Classification recorded earlier.
        existing: Belief,
    },
}

/// Dense row-major grid of beliefs.
///
/// Every cell starts [`Belief::Unknown`] and leaves that state at most once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeliefGrid {
    dimensions: GridDimensions,
    cells: Vec<Belief>,
}

impl BeliefGrid {
    /// Creates a grid where every cell is unknown.
    pub fn new(dimensions: GridDimensions) -> Result<Self, BeliefError> {
        let count = dimensions.cell_count().ok_or(BeliefError::TooLarge {
            rows: dimensions.rows(),
            columns: dimensions.columns(),
        })?;
        Ok(Self {
            dimensions,
            cells: vec![Belief::Unknown; count],
        })
    }

    /// Row and column counts of the grid.
    #[must_use]
    pub const fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    /// Belief recorded for `cell`, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<Belief> {
        self.dimensions
            .index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Records the sensed kind of `cell`.
    pub fn classify(&mut self, cell: CellCoord, kind: CellKind) -> Result<(), BeliefError> {
        let index = self
            .dimensions
            .index(cell)
            .ok_or(BeliefError::OutOfBounds { cell })?;
        let slot = self
            .cells
            .get_mut(index)
            .ok_or(BeliefError::OutOfBounds { cell })?;
        if *slot != Belief::Unknown {
            return Err(BeliefError::AlreadyClassified {
                cell,
                existing: *slot,
            });
        }
        *slot = kind.into();
        Ok(())
    }

    /// Marks the unknown cells of the outer ring as walls and returns how many
    /// changed.
    pub fn seed_border(&mut self) -> usize {
        let dimensions = self.dimensions;
        self.resolve_unknown(|cell| dimensions.is_border(cell))
    }

    /// Marks every remaining unknown cell as a wall and returns how many
    /// changed.
    pub fn close_unknown(&mut self) -> usize {
        self.resolve_unknown(|_| true)
    }

    /// Number of cells still unknown.
    #[must_use]
    pub fn unknown_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|belief| **belief == Belief::Unknown)
            .count()
    }

    /// Renders the grid, one `\n`-terminated line per row.
    #[must_use]
    pub fn render(&self) -> String {
        let rows = usize::try_from(self.dimensions.rows()).unwrap_or_default();
        let mut out = String::with_capacity(self.cells.len().saturating_add(rows));
        for cell in self.dimensions.cells() {
            out.push(self.get(cell).unwrap_or(Belief::Unknown).symbol());
            if cell.column() + 1 == self.dimensions.columns() {
                out.push('\n');
            }
        }
        out
    }

    fn resolve_unknown<F>(&mut self, mut selected: F) -> usize
    where
        F: FnMut(CellCoord) -> bool,
    {
        let mut changed = 0;
        for (cell, belief) in self.dimensions.cells().zip(self.cells.iter_mut()) {
            if *belief == Belief::Unknown && selected(cell) {
                *belief = Belief::Wall;
                changed += 1;
            }
        }
        changed
    }
}

impl fmt::Display for BeliefGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
