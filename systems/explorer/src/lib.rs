#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Blind depth-first explorer that maps a maze through an [`Environment`].
//!
//! The explorer never sees the true grid. It learns the maze one cell at a
//! time through `scan` and `look`, and every repositioning, including
//! backtracking, costs a real `step`. The simulator's position therefore
//! always matches the top of the traversal stack before the next sensing
//! call.

mod belief;

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, info, warn};
use treasure_hunt_core::{CellCoord, CellKind, Direction, Environment, LookReport, MoveOutcome};

pub use belief::{Belief, BeliefError, BeliefGrid};

/// Order in which open neighbours are tried.
pub const SEARCH_ORDER: [Direction; 4] = [
    Direction::North,
    Direction::South,
    Direction::East,
    Direction::West,
];

/// Failures that end an exploration run.
#[derive(Debug, Error)]
pub enum ExploreError<E> {
    /// The environment refused a call.
    #[error("environment call failed: {0}")]
    Environment(#[source] E),
    /// `look` reported a direction open but the step into it collided.
    #[error("look reported {direction} open at {position} but the step collided")]
    LookMoveDisagreement {
        /// Cell the explorer stood on.
        position: CellCoord,
        /// Direction that was reported open.
        direction: Direction,
    },
    /// The environment reports a position other than the one the explorer
    /// tracked.
    #[error("explorer expected to stand on {expected} but the environment reports {actual}")]
    Desynchronized {
        /// Position tracked by the explorer.
        expected: CellCoord,
        /// Position reported by the environment.
        actual: CellCoord,
    },
    /// A sensing result contradicted the belief grid.
    #[error(transparent)]
    Belief(#[from] BeliefError),
}

/// Counters collected during a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExplorationStats {
    /// Steps that entered a cell for the first time.
    pub forward_moves: usize,
    /// Steps that returned to a parent cell.
    pub backtrack_moves: usize,
    /// `scan` calls issued.
    pub scans: usize,
    /// `look` calls issued.
    pub looks: usize,
    /// Cells committed to the visited set, including the start.
    pub cells_visited: usize,
}

/// Outcome of a completed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exploration {
    /// Cell the run started on.
    pub start: CellCoord,
    /// Fully resolved map; contains no [`Belief::Unknown`] cells.
    pub map: BeliefGrid,
    /// Counters collected during the run.
    pub stats: ExplorationStats,
}

impl Exploration {
    /// Map artifact: one line per row, one symbol per column.
    #[must_use]
    pub fn artifact(&self) -> String {
        self.map.render()
    }
}

#[derive(Clone, Copy, Debug)]
struct Frame {
    cell: CellCoord,
    entered_by: Option<Direction>,
}

/// Depth-first explorer.
#[derive(Clone, Copy, Debug, Default)]
pub struct Explorer;

impl Explorer {
    /// Creates a new explorer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Initializes `env` and maps every cell reachable from the start.
    ///
    /// Cells that are never reached are recorded as walls. On success the
    /// environment is left on the start cell.
    pub fn explore<E>(&self, env: &mut E) -> Result<Exploration, ExploreError<E::Error>>
    where
        E: Environment,
    {
        let start = env.initialize().map_err(ExploreError::Environment)?;
        let dimensions = env.dimensions();
        info!(
            %start,
            rows = dimensions.rows(),
            columns = dimensions.columns(),
            "exploration started"
        );

        let mut map = BeliefGrid::new(dimensions)?;
        let _ = map.seed_border();
        map.classify(start, CellKind::Start)?;

        let mut visited = HashSet::from([start]);
        let mut stats = ExplorationStats::default();
        let mut stack = vec![Frame {
            cell: start,
            entered_by: None,
        }];

        while let Some(&frame) = stack.last() {
            let current = frame.cell;

            if visited.insert(current) {
                let scan = env.scan().map_err(ExploreError::Environment)?;
                stats.scans += 1;
                if scan.position != current {
                    return Err(desynchronized(current, scan.position));
                }
                map.classify(current, scan.cell)?;
            }

            let look = env.look().map_err(ExploreError::Environment)?;
            stats.looks += 1;

            if let Some((direction, next)) = next_frontier(current, &look, &visited, &map) {
                match env.step(direction).map_err(ExploreError::Environment)? {
                    MoveOutcome::Moved { position, .. } if position == next => {
                        debug!(from = %current, to = %next, %direction, "advanced");
                        stats.forward_moves += 1;
                        stack.push(Frame {
                            cell: next,
                            entered_by: Some(direction),
                        });
                    }
                    MoveOutcome::Moved { position, .. } => {
                        return Err(desynchronized(next, position));
                    }
                    MoveOutcome::Collided { .. } => {
                        warn!(position = %current, %direction, "look and step disagree");
                        return Err(ExploreError::LookMoveDisagreement {
                            position: current,
                            direction,
                        });
                    }
                }
                continue;
            }

            let _ = stack.pop();
            let (Some(entered_by), Some(parent)) = (frame.entered_by, stack.last()) else {
                continue;
            };

            let back = entered_by.opposite();
            match env.step(back).map_err(ExploreError::Environment)? {
                MoveOutcome::Moved { position, .. } if position == parent.cell => {
                    debug!(from = %current, to = %position, direction = %back, "backtracked");
                    stats.backtrack_moves += 1;
                }
                outcome => return Err(desynchronized(parent.cell, outcome.position())),
            }
        }

        let closed = map.close_unknown();
        stats.cells_visited = visited.len();
        info!(
            visited = stats.cells_visited,
            closed,
            forward_moves = stats.forward_moves,
            backtrack_moves = stats.backtrack_moves,
            "exploration finished"
        );

        Ok(Exploration { start, map, stats })
    }
}

fn next_frontier(
    current: CellCoord,
    look: &LookReport,
    visited: &HashSet<CellCoord>,
    map: &BeliefGrid,
) -> Option<(Direction, CellCoord)> {
    let dimensions = map.dimensions();
    SEARCH_ORDER.into_iter().find_map(|direction| {
        if look.is_blocked(direction) {
            return None;
        }
        let next = current.neighbor(direction)?;
        (dimensions.contains(next) && !visited.contains(&next)).then_some((direction, next))
    })
}

fn desynchronized<E>(expected: CellCoord, actual: CellCoord) -> ExploreError<E> {
    warn!(%expected, %actual, "explorer lost track of its position");
    ExploreError::Desynchronized { expected, actual }
}
