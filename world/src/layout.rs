//! Immutable maze layouts parsed from text.

use treasure_hunt_core::{CellCoord, CellKind, GridDimensions};

use thiserror::Error;

/// The 7×7 comb maze used when no layout file is configured.
pub const DEFAULT_LAYOUT: &str = "\
#######
#S..T.#
#.#.#.#
#...#.#
#T#...#
#..#..#
#######
";

/// Reasons a layout could not be loaded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// The layout contained no rows.
    #[error("layout is empty")]
    Empty,
    /// The layout is wider or taller than coordinates can address.
    #[error("layout exceeds the addressable grid size")]
    TooLarge,
    /// A row's width differs from the first row.
    #[error("row {row} has {found} columns, expected {expected}")]
    Ragged {
        /// Zero-based index of the offending row.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A character outside `#`, `.`, `S`, `T` was found.
    #[error("unknown symbol '{symbol}' at row {row}, column {column}")]
    UnknownSymbol {
        /// Row of the symbol.
        row: usize,
        /// Column of the symbol.
        column: usize,
        /// Offending character.
        symbol: char,
    },
    /// A border cell was not a wall.
    #[error("border cell {cell} is not a wall")]
    OpenBorder {
        /// Offending border cell.
        cell: CellCoord,
    },
    /// More than one `S` marker was present.
    #[error("layout marks more than one start: {first} and {second}")]
    MultipleStarts {
        /// First start marker encountered.
        first: CellCoord,
        /// Second start marker encountered.
        second: CellCoord,
    },
    /// A pinned start cell lies outside the grid or on a wall.
    #[error("pinned start {cell} is not an open cell")]
    PinnedStartBlocked {
        /// Requested start cell.
        cell: CellCoord,
    },
}

/// Base terrain of a maze.
///
/// The base never carries a start marker: an `S` in the source text is
/// stored as empty ground, so the start chosen by the simulator can be
/// overlaid without touching the layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Maze {
    dimensions: GridDimensions,
    cells: Vec<CellKind>,
}

impl Maze {
    /// Parses a layout, one line per row and one symbol per column.
    ///
    /// Leading and trailing blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let trimmed = text.trim_matches(|ch| ch == '\n' || ch == '\r');
        if trimmed.is_empty() {
            return Err(LayoutError::Empty);
        }

        let lines: Vec<&str> = trimmed.lines().collect();
        let expected = lines.first().map_or(0, |line| line.chars().count());
        let rows = u32::try_from(lines.len()).map_err(|_| LayoutError::TooLarge)?;
        let columns = u32::try_from(expected).map_err(|_| LayoutError::TooLarge)?;
        let dimensions = GridDimensions::new(rows, columns);

        let cell_count = dimensions.cell_count().ok_or(LayoutError::TooLarge)?;
        let mut cells = Vec::with_capacity(cell_count);
        let mut marked_start: Option<CellCoord> = None;

        for (row_index, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != expected {
                return Err(LayoutError::Ragged {
                    row: row_index,
                    expected,
                    found,
                });
            }

            for (column_index, symbol) in line.chars().enumerate() {
                let kind =
                    CellKind::from_symbol(symbol).ok_or(LayoutError::UnknownSymbol {
                        row: row_index,
                        column: column_index,
                        symbol,
                    })?;
                let cell = CellCoord::new(
                    u32::try_from(row_index).map_err(|_| LayoutError::TooLarge)?,
                    u32::try_from(column_index).map_err(|_| LayoutError::TooLarge)?,
                );

                if kind.is_passable() && dimensions.is_border(cell) {
                    return Err(LayoutError::OpenBorder { cell });
                }

                if kind == CellKind::Start {
                    if let Some(first) = marked_start {
                        return Err(LayoutError::MultipleStarts {
                            first,
                            second: cell,
                        });
                    }
                    marked_start = Some(cell);
                    cells.push(CellKind::Empty);
                } else {
                    cells.push(kind);
                }
            }
        }

        Ok(Self { dimensions, cells })
    }

    /// Row and column counts of the maze.
    #[must_use]
    pub const fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    /// Base terrain at `cell`, or `None` outside the grid.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<CellKind> {
        self.dimensions
            .index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Reports whether an explorer may stand on `cell`.
    #[must_use]
    pub fn is_passable(&self, cell: CellCoord) -> bool {
        self.cell(cell).is_some_and(CellKind::is_passable)
    }

    /// Every passable cell in row-major order.
    #[must_use]
    pub fn open_cells(&self) -> Vec<CellCoord> {
        self.dimensions
            .cells()
            .filter(|cell| self.is_passable(*cell))
            .collect()
    }
}
