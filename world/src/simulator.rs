//! Store-backed simulator: every call is load, apply or query, then save.

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};
use treasure_hunt_core::{
    CellCoord, Command, Direction, Environment, Event, GridDimensions, LookReport, MoveOutcome,
    ScanReport, SimError,
};

use crate::{
    apply, query, LayoutError, Maze, StartPolicy, StateError, StateStore, StoreError, World,
};

/// Failures surfaced by a [`Simulator`] call.
#[derive(Debug, Error)]
pub enum SimulatorError {
    /// The call violated a simulator rule.
    #[error(transparent)]
    Rules(#[from] SimError),
    /// The persisted state could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The persisted state does not fit the maze.
    #[error(transparent)]
    State(#[from] StateError),
}

impl SimulatorError {
    /// Rule violation behind the failure, if any.
    #[must_use]
    pub fn rule(&self) -> Option<&SimError> {
        match self {
            Self::Rules(error) => Some(error),
            Self::Store(_) | Self::State(_) => None,
        }
    }
}

/// Grid simulator whose mutable state lives in a [`StateStore`].
///
/// The simulator keeps no position of its own. Each operation reloads the
/// persisted record, so two simulators sharing a store behave like one
/// long-lived object invoked one call at a time.
#[derive(Debug)]
pub struct Simulator<S, R> {
    maze: Maze,
    start_policy: StartPolicy,
    store: S,
    rng: R,
}

impl<S, R> Simulator<S, R>
where
    S: StateStore,
    R: Rng,
{
    /// Creates a simulator that picks random start cells.
    #[must_use]
    pub fn new(maze: Maze, store: S, rng: R) -> Self {
        Self {
            maze,
            start_policy: StartPolicy::Random,
            store,
            rng,
        }
    }

    /// Pins every future initialization to `cell`.
    pub fn with_pinned_start(mut self, cell: CellCoord) -> Result<Self, LayoutError> {
        self.start_policy = StartPolicy::pinned(&self.maze, cell)?;
        Ok(self)
    }

    /// Maze the simulator hides.
    #[must_use]
    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    /// Backing state store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Chooses a new start cell, clearing any previous start marker.
    ///
    /// The previous record is replaced wholesale and is not consulted, so
    /// this also recovers a store whose record no longer fits the maze.
    pub fn initialize(&mut self) -> Result<CellCoord, SimulatorError> {
        let mut world = World::new(&self.maze).with_start_policy(self.start_policy);
        let mut events = Vec::new();
        apply(&mut world, Command::Initialize, &mut self.rng, &mut events)?;
        self.store.save(world.state())?;

        let start = query::position(&world)?;
        for event in &events {
            if let Event::Initialized { underlying, .. } = event {
                info!(%start, %underlying, "simulator initialized");
            }
        }
        Ok(start)
    }

    /// Current position of the explorer.
    pub fn position(&self) -> Result<CellCoord, SimulatorError> {
        let world = World::restore(&self.maze, self.start_policy, self.store.load()?)?;
        Ok(query::position(&world)?)
    }

    /// Row and column counts of the grid.
    #[must_use]
    pub fn dimensions(&self) -> GridDimensions {
        self.maze.dimensions()
    }

    /// Wall flags around the current position.
    pub fn look(&self) -> Result<LookReport, SimulatorError> {
        let world = World::restore(&self.maze, self.start_policy, self.store.load()?)?;
        let report = query::look(&world)?;
        debug!(?report, "look");
        Ok(report)
    }

    /// Classification of the current cell.
    pub fn scan(&self) -> Result<ScanReport, SimulatorError> {
        let world = World::restore(&self.maze, self.start_policy, self.store.load()?)?;
        let report = query::scan(&world)?;
        debug!(cell = %report.cell, position = %report.position, "scan");
        Ok(report)
    }

    /// Attempts a single step. Collisions are returned as an outcome and
    /// leave the persisted record untouched.
    pub fn step(&mut self, direction: Direction) -> Result<MoveOutcome, SimulatorError> {
        let mut world = World::restore(&self.maze, self.start_policy, self.store.load()?)?;
        step_world(&mut world, &mut self.store, &mut self.rng, direction)
    }

    /// Attempts a single step given the direction as text.
    ///
    /// Initialization is checked before the direction is parsed, so an
    /// uninitialized simulator reports [`SimError::NotInitialized`] for any
    /// argument.
    pub fn step_named(&mut self, direction: &str) -> Result<MoveOutcome, SimulatorError> {
        let mut world = World::restore(&self.maze, self.start_policy, self.store.load()?)?;
        let _ = query::position(&world)?;
        let direction = direction.parse::<Direction>()?;
        step_world(&mut world, &mut self.store, &mut self.rng, direction)
    }
}

fn step_world<S, R>(
    world: &mut World<'_>,
    store: &mut S,
    rng: &mut R,
    direction: Direction,
) -> Result<MoveOutcome, SimulatorError>
where
    S: StateStore,
    R: Rng,
{
    let before = query::position(world)?;
    let mut events = Vec::new();
    apply(world, Command::Step { direction }, rng, &mut events)?;

    let outcome = events
        .iter()
        .rev()
        .find_map(|event| match *event {
            Event::Advanced { to, cell, .. } => Some(MoveOutcome::Moved { position: to, cell }),
            Event::Collided { position, .. } => Some(MoveOutcome::Collided { position }),
            Event::Initialized { .. } => None,
        })
        .unwrap_or(MoveOutcome::Collided { position: before });

    if matches!(outcome, MoveOutcome::Moved { .. }) {
        store.save(world.state())?;
    }
    Ok(outcome)
}

impl<S, R> Environment for Simulator<S, R>
where
    S: StateStore,
    R: Rng,
{
    type Error = SimulatorError;

    fn initialize(&mut self) -> Result<CellCoord, Self::Error> {
        Simulator::initialize(self)
    }

    fn position(&self) -> Result<CellCoord, Self::Error> {
        Simulator::position(self)
    }

    fn dimensions(&self) -> GridDimensions {
        Simulator::dimensions(self)
    }

    fn look(&self) -> Result<LookReport, Self::Error> {
        Simulator::look(self)
    }

    fn scan(&self) -> Result<ScanReport, Self::Error> {
        Simulator::scan(self)
    }

    fn step(&mut self, direction: Direction) -> Result<MoveOutcome, Self::Error> {
        Simulator::step(self, direction)
    }
}
