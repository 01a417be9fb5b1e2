#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative simulator state for the treasure hunt.
//!
//! A [`World`] pairs an immutable [`Maze`] with the mutable
//! [`SimulatorState`] that lives in a [`StateStore`] between calls. The start
//! marker is never written into the maze: the effective grid is derived on
//! every read as "base terrain plus start overlay", so repeated
//! initialization leaves no stale markers behind.

mod layout;
mod simulator;
mod store;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};
use treasure_hunt_core::{CellCoord, CellKind, Command, Event, SimError};

pub use layout::{LayoutError, Maze, DEFAULT_LAYOUT};
pub use simulator::{Simulator, SimulatorError};
pub use store::{JsonFileStore, MemoryStore, SimulatorState, StateStore, StoreError};

/// How [`Command::Initialize`] chooses the start cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StartPolicy {
    /// Uniformly random among all passable cells.
    #[default]
    Random,
    /// Always the given cell.
    Pinned(CellCoord),
}

impl StartPolicy {
    /// Builds a pinned policy after checking that `cell` is passable in `maze`.
    pub fn pinned(maze: &Maze, cell: CellCoord) -> Result<Self, LayoutError> {
        if maze.is_passable(cell) {
            Ok(Self::Pinned(cell))
        } else {
            Err(LayoutError::PinnedStartBlocked { cell })
        }
    }
}

/// Persisted state that does not fit the maze it is restored against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum StateError {
    /// The recorded position is outside the grid or on a wall.
    #[error("recorded position {cell} is not an open cell of this maze")]
    PositionBlocked {
        /// Recorded position.
        cell: CellCoord,
    },
    /// The recorded start is outside the grid or on a wall.
    #[error("recorded start {cell} is not an open cell of this maze")]
    StartBlocked {
        /// Recorded start.
        cell: CellCoord,
    },
    /// The terrain recorded beneath the start differs from the maze.
    #[error("start {cell} was recorded over {recorded} but the maze has {actual}")]
    StartTerrainMismatch {
        /// Recorded start.
        cell: CellCoord,
        /// Terrain kind stored with the record.
        recorded: CellKind,
        /// Terrain kind in the maze.
        actual: CellKind,
    },
}

/// Represents the authoritative simulator view for a single call.
#[derive(Debug)]
pub struct World<'maze> {
    maze: &'maze Maze,
    start_policy: StartPolicy,
    state: SimulatorState,
}

impl<'maze> World<'maze> {
    /// Creates an uninitialized world over `maze`.
    #[must_use]
    pub fn new(maze: &'maze Maze) -> Self {
        Self {
            maze,
            start_policy: StartPolicy::Random,
            state: SimulatorState::default(),
        }
    }

    /// Rebuilds a world from previously persisted state.
    ///
    /// Fails when the recorded position or start is not an open cell of
    /// `maze`, which happens when the record was written against another
    /// layout.
    pub fn restore(
        maze: &'maze Maze,
        start_policy: StartPolicy,
        state: SimulatorState,
    ) -> Result<Self, StateError> {
        if let Err(error) = validate(maze, &state) {
            warn!(%error, "rejected persisted state");
            return Err(error);
        }
        Ok(Self {
            maze,
            start_policy,
            state,
        })
    }

    /// Replaces the start policy used by later initializations.
    #[must_use]
    pub fn with_start_policy(mut self, start_policy: StartPolicy) -> Self {
        self.start_policy = start_policy;
        self
    }

    /// Mutable state to persist after applying commands.
    #[must_use]
    pub fn state(&self) -> &SimulatorState {
        &self.state
    }

    fn current_position(&self) -> Result<CellCoord, SimError> {
        match self.state.position {
            Some(position) if self.state.initialized => Ok(position),
            _ => Err(SimError::NotInitialized),
        }
    }

    fn effective_cell(&self, cell: CellCoord) -> Option<CellKind> {
        let base = self.maze.cell(cell)?;
        if self.state.initialized && self.state.start == Some(cell) {
            Some(CellKind::Start)
        } else {
            Some(base)
        }
    }

    fn choose_start<R>(&self, rng: &mut R) -> Result<CellCoord, SimError>
    where
        R: Rng,
    {
        match self.start_policy {
            StartPolicy::Pinned(cell) => Ok(cell),
            StartPolicy::Random => {
                let open = self.maze.open_cells();
                if open.is_empty() {
                    return Err(SimError::NoOpenCells);
                }
                Ok(open[rng.gen_range(0..open.len())])
            }
        }
    }
}

fn validate(maze: &Maze, state: &SimulatorState) -> Result<(), StateError> {
    if let Some(cell) = state.position.filter(|cell| !maze.is_passable(*cell)) {
        return Err(StateError::PositionBlocked { cell });
    }
    let Some(cell) = state.start else {
        return Ok(());
    };
    let actual = match maze.cell(cell) {
        Some(kind) if kind.is_passable() => kind,
        _ => return Err(StateError::StartBlocked { cell }),
    };
    match state.original_cell_kind {
        Some(recorded) if recorded != actual => Err(StateError::StartTerrainMismatch {
            cell,
            recorded,
            actual,
        }),
        _ => Ok(()),
    }
}

/// Applies the provided command to the world, mutating state deterministically
/// for a given random source.
pub fn apply<R>(
    world: &mut World<'_>,
    command: Command,
    rng: &mut R,
    out_events: &mut Vec<Event>,
) -> Result<(), SimError>
where
    R: Rng,
{
    match command {
        Command::Initialize => {
            let start = world.choose_start(rng)?;
            let underlying = world.maze.cell(start).ok_or(SimError::NoOpenCells)?;
            world.state = SimulatorState {
                position: Some(start),
                initialized: true,
                original_cell_kind: Some(underlying),
                start: Some(start),
            };
            debug!(%start, %underlying, "start cell chosen");
            out_events.push(Event::Initialized { start, underlying });
        }
        Command::Step { direction } => {
            let from = world.current_position()?;
            let destination = from
                .neighbor(direction)
                .filter(|cell| world.maze.is_passable(*cell));

            match destination.and_then(|to| Some((to, world.effective_cell(to)?))) {
                Some((to, cell)) => {
                    world.state.position = Some(to);
                    debug!(%from, %to, %direction, %cell, "advanced");
                    out_events.push(Event::Advanced { from, to, cell });
                }
                None => {
                    debug!(position = %from, %direction, "collided");
                    out_events.push(Event::Collided {
                        position: from,
                        direction,
                    });
                }
            }
        }
    }

    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use treasure_hunt_core::{
        CellCoord, CellKind, Direction, GridDimensions, LookReport, ScanReport, SimError,
    };

    use super::World;

    /// Row and column counts of the grid. Available before initialization.
    #[must_use]
    pub fn dimensions(world: &World<'_>) -> GridDimensions {
        world.maze.dimensions()
    }

    /// Current position of the explorer.
    pub fn position(world: &World<'_>) -> Result<CellCoord, SimError> {
        world.current_position()
    }

    /// Wall flags for the four neighbours of the current position.
    ///
    /// Cells outside the grid count as walls.
    pub fn look(world: &World<'_>) -> Result<LookReport, SimError> {
        let position = world.current_position()?;
        let blocked = |direction: Direction| {
            !position
                .neighbor(direction)
                .is_some_and(|cell| world.maze.is_passable(cell))
        };
        Ok(LookReport {
            north: blocked(Direction::North),
            south: blocked(Direction::South),
            east: blocked(Direction::East),
            west: blocked(Direction::West),
        })
    }

    /// Classification of the cell under the explorer.
    pub fn scan(world: &World<'_>) -> Result<ScanReport, SimError> {
        let position = world.current_position()?;
        // Restore and `apply` only ever leave the position on an open cell.
        let cell = world
            .effective_cell(position)
            .ok_or(SimError::NotInitialized)?;
        Ok(ScanReport { cell, position })
    }

    /// Effective classification of any cell, including the start overlay.
    #[must_use]
    pub fn cell(world: &World<'_>, cell: CellCoord) -> Option<CellKind> {
        world.effective_cell(cell)
    }

    /// Cell carrying the start marker, if initialized.
    #[must_use]
    pub fn start(world: &World<'_>) -> Option<CellCoord> {
        world.state.start.filter(|_| world.state.initialized)
    }

    /// Terrain hidden beneath the start marker, if initialized.
    #[must_use]
    pub fn underlying_start_cell(world: &World<'_>) -> Option<CellKind> {
        world
            .state
            .original_cell_kind
            .filter(|_| world.state.initialized)
    }

    /// Renders the effective grid, one line per row.
    #[must_use]
    pub fn render(world: &World<'_>) -> String {
        let dimensions = world.maze.dimensions();
        let mut out = String::new();
        for cell in dimensions.cells() {
            if let Some(kind) = world.effective_cell(cell) {
                out.push(kind.symbol());
            }
            if cell.column() + 1 == dimensions.columns() {
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::mock::StepRng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use treasure_hunt_core::{Direction, GridDimensions};

    use super::*;

    fn default_maze() -> Maze {
        Maze::parse(DEFAULT_LAYOUT).expect("default layout")
    }

    fn initialize(world: &mut World<'_>, rng: &mut ChaCha8Rng) -> CellCoord {
        let mut events = Vec::new();
        apply(world, Command::Initialize, rng, &mut events).expect("initialize");
        match events.as_slice() {
            [Event::Initialized { start, .. }] => *start,
            other => panic!("unexpected events: {other:?}"),
        }
    }

    fn recorded(position: CellCoord, start: CellCoord, underlying: CellKind) -> SimulatorState {
        SimulatorState {
            position: Some(position),
            initialized: true,
            original_cell_kind: Some(underlying),
            start: Some(start),
        }
    }

    #[test]
    fn queries_require_initialization() {
        let maze = default_maze();
        let world = World::new(&maze);

        assert_eq!(query::position(&world), Err(SimError::NotInitialized));
        assert_eq!(query::look(&world), Err(SimError::NotInitialized));
        assert_eq!(query::scan(&world), Err(SimError::NotInitialized));
        assert_eq!(query::dimensions(&world), GridDimensions::new(7, 7));
    }

    #[test]
    fn step_requires_initialization() {
        let maze = default_maze();
        let mut world = World::new(&maze);
        let mut events = Vec::new();
        let result = apply(
            &mut world,
            Command::Step {
                direction: Direction::North,
            },
            &mut ChaCha8Rng::seed_from_u64(7),
            &mut events,
        );
        assert_eq!(result, Err(SimError::NotInitialized));
        assert!(events.is_empty());
    }

    #[test]
    fn restore_accepts_a_consistent_record() {
        let maze = default_maze();
        let state = recorded(CellCoord::new(3, 2), CellCoord::new(1, 4), CellKind::Treasure);
        let world = World::restore(&maze, StartPolicy::Random, state).expect("consistent");

        assert_eq!(query::position(&world), Ok(CellCoord::new(3, 2)));
        assert_eq!(query::cell(&world, CellCoord::new(1, 4)), Some(CellKind::Start));
        assert!(World::restore(&maze, StartPolicy::Random, SimulatorState::default()).is_ok());
    }

    #[test]
    fn restore_rejects_positions_off_the_open_cells() {
        let maze = default_maze();
        let start = CellCoord::new(1, 1);
        for cell in [CellCoord::new(2, 2), CellCoord::new(0, 3), CellCoord::new(40, 40)] {
            let state = recorded(cell, start, CellKind::Empty);
            assert_eq!(
                World::restore(&maze, StartPolicy::Random, state).unwrap_err(),
                StateError::PositionBlocked { cell }
            );
        }
    }

    #[test]
    fn restore_rejects_a_start_that_does_not_fit_the_maze() {
        let maze = default_maze();
        let position = CellCoord::new(1, 2);

        let walled = recorded(position, CellCoord::new(2, 2), CellKind::Empty);
        assert_eq!(
            World::restore(&maze, StartPolicy::Random, walled).unwrap_err(),
            StateError::StartBlocked {
                cell: CellCoord::new(2, 2),
            }
        );

        let relabelled = recorded(position, CellCoord::new(1, 4), CellKind::Empty);
        assert_eq!(
            World::restore(&maze, StartPolicy::Random, relabelled).unwrap_err(),
            StateError::StartTerrainMismatch {
                cell: CellCoord::new(1, 4),
                recorded: CellKind::Empty,
                actual: CellKind::Treasure,
            }
        );
    }

    #[test]
    fn initialize_picks_an_open_cell_and_overlays_start() {
        let maze = default_maze();
        let mut world = World::new(&maze);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        for _ in 0..50 {
            let start = initialize(&mut world, &mut rng);
            assert!(maze.is_passable(start));
            assert_eq!(query::position(&world), Ok(start));
            assert_eq!(query::cell(&world, start), Some(CellKind::Start));
            assert_eq!(query::underlying_start_cell(&world), maze.cell(start));

            let rendered = query::render(&world);
            assert_eq!(rendered.matches('S').count(), 1);
        }
    }

    #[test]
    fn initialize_on_a_treasure_hides_it_under_the_start() {
        let maze = default_maze();
        let treasure = CellCoord::new(1, 4);
        let policy = StartPolicy::pinned(&maze, treasure).expect("treasure is open");
        let mut world = World::new(&maze).with_start_policy(policy);
        let start = initialize(&mut world, &mut ChaCha8Rng::seed_from_u64(3));

        assert_eq!(start, treasure);
        assert_eq!(query::underlying_start_cell(&world), Some(CellKind::Treasure));
        assert_eq!(query::scan(&world).map(|scan| scan.cell), Ok(CellKind::Start));
    }

    #[test]
    fn pinned_start_must_be_open() {
        let maze = default_maze();
        assert_eq!(
            StartPolicy::pinned(&maze, CellCoord::new(0, 0)),
            Err(LayoutError::PinnedStartBlocked {
                cell: CellCoord::new(0, 0),
            })
        );
        assert!(StartPolicy::pinned(&maze, CellCoord::new(40, 40)).is_err());
    }

    #[test]
    fn initialize_fails_without_open_cells() {
        let maze = Maze::parse("###\n###\n###").expect("layout");
        let mut world = World::new(&maze);
        let mut events = Vec::new();
        let result = apply(
            &mut world,
            Command::Initialize,
            &mut StepRng::new(0, 1),
            &mut events,
        );
        assert_eq!(result, Err(SimError::NoOpenCells));
        assert_eq!(world.state(), &SimulatorState::default());
    }

    #[test]
    fn collision_leaves_position_unchanged() {
        let maze = default_maze();
        let policy = StartPolicy::pinned(&maze, CellCoord::new(1, 1)).expect("open");
        let mut world = World::new(&maze).with_start_policy(policy);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let _ = initialize(&mut world, &mut rng);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Step {
                direction: Direction::North,
            },
            &mut rng,
            &mut events,
        )
        .expect("step");

        assert_eq!(
            events,
            vec![Event::Collided {
                position: CellCoord::new(1, 1),
                direction: Direction::North,
            }]
        );
        assert_eq!(query::position(&world), Ok(CellCoord::new(1, 1)));
    }

    #[test]
    fn step_reports_destination_classification() {
        let maze = default_maze();
        let policy = StartPolicy::pinned(&maze, CellCoord::new(1, 3)).expect("open");
        let mut world = World::new(&maze).with_start_policy(policy);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let _ = initialize(&mut world, &mut rng);

        let mut events = Vec::new();
        for direction in [Direction::East, Direction::West, Direction::West] {
            apply(&mut world, Command::Step { direction }, &mut rng, &mut events)
                .expect("step");
        }

        assert_eq!(
            events,
            vec![
                Event::Advanced {
                    from: CellCoord::new(1, 3),
                    to: CellCoord::new(1, 4),
                    cell: CellKind::Treasure,
                },
                Event::Advanced {
                    from: CellCoord::new(1, 4),
                    to: CellCoord::new(1, 3),
                    cell: CellKind::Start,
                },
                Event::Advanced {
                    from: CellCoord::new(1, 3),
                    to: CellCoord::new(1, 2),
                    cell: CellKind::Empty,
                },
            ]
        );
    }

    #[test]
    fn reinitialize_moves_the_single_start_marker() {
        let maze = default_maze();
        let first = CellCoord::new(1, 1);
        let second = CellCoord::new(5, 5);
        let mut world = World::new(&maze)
            .with_start_policy(StartPolicy::pinned(&maze, first).expect("open"));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let _ = initialize(&mut world, &mut rng);

        world = world.with_start_policy(StartPolicy::pinned(&maze, second).expect("open"));
        let _ = initialize(&mut world, &mut rng);

        assert_eq!(query::cell(&world, first), Some(CellKind::Empty));
        assert_eq!(query::cell(&world, second), Some(CellKind::Start));
        assert_eq!(query::render(&world).matches('S').count(), 1);
        assert_eq!(query::start(&world), Some(second));
    }
}
