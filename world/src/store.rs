//! Durable simulator state shared between independent invocations.
//!
//! Each simulator call loads the record, works on it, and (for mutations)
//! writes it back before returning. A missing record means the simulator has
//! never been initialized.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use treasure_hunt_core::{CellCoord, CellKind};

/// Mutable simulator state persisted between calls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorState {
    /// Current position of the explorer.
    pub position: Option<CellCoord>,
    /// Whether a start cell has been chosen.
    pub initialized: bool,
    /// Terrain beneath the start marker, stored as its layout symbol.
    #[serde(default, with = "optional_symbol")]
    pub original_cell_kind: Option<CellKind>,
    /// Cell carrying the start marker.
    #[serde(default)]
    pub start: Option<CellCoord>,
}

/// Errors raised while reading or writing the state record.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record exists but could not be read.
    #[error("failed to read simulator state from {}", path.display())]
    Read {
        /// Location of the record.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The record could not be written.
    #[error("failed to write simulator state to {}", path.display())]
    Write {
        /// Location of the record.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The record is not valid JSON for [`SimulatorState`].
    #[error("simulator state at {} is corrupt", path.display())]
    Corrupt {
        /// Location of the record.
        path: PathBuf,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
    /// The state could not be encoded.
    #[error("failed to encode simulator state")]
    Encode(#[source] serde_json::Error),
}

/// Load-or-default storage for [`SimulatorState`].
pub trait StateStore {
    /// Returns the persisted state, or the default state when none exists.
    fn load(&self) -> Result<SimulatorState, StoreError>;

    /// Persists `state`, replacing any previous record.
    fn save(&mut self, state: &SimulatorState) -> Result<(), StoreError>;
}

/// Stores the state as a JSON document on disk.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<SimulatorState, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(SimulatorState::default());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if contents.trim().is_empty() {
            return Ok(SimulatorState::default());
        }

        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&mut self, state: &SimulatorState) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(state).map_err(StoreError::Encode)?;
        let staging = self.staging_path();
        fs::write(&staging, encoded).map_err(|source| StoreError::Write {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &self.path).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Keeps the state in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Option<SimulatorState>,
    saves: usize,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `state`.
    #[must_use]
    pub fn with_state(state: SimulatorState) -> Self {
        Self {
            state: Some(state),
            saves: 0,
        }
    }

    /// Last saved state, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<&SimulatorState> {
        self.state.as_ref()
    }

    /// Number of completed saves.
    #[must_use]
    pub const fn saves(&self) -> usize {
        self.saves
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<SimulatorState, StoreError> {
        Ok(self.state.clone().unwrap_or_default())
    }

    fn save(&mut self, state: &SimulatorState) -> Result<(), StoreError> {
        self.state = Some(state.clone());
        self.saves += 1;
        Ok(())
    }
}

mod optional_symbol {
    use serde::{Deserialize, Deserializer, Serializer};
    use treasure_hunt_core::CellKind;

    pub(super) fn serialize<S>(value: &Option<CellKind>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(kind) => serializer.serialize_char(kind.symbol()),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<CellKind>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let symbol: Option<char> = Option::deserialize(deserializer)?;
        symbol
            .map(|symbol| {
                CellKind::from_symbol(symbol).ok_or_else(|| {
                    <D::Error as serde::de::Error>::custom(format!(
                        "unknown cell symbol '{symbol}'"
                    ))
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initialized_state() -> SimulatorState {
        SimulatorState {
            position: Some(CellCoord::new(3, 2)),
            initialized: true,
            original_cell_kind: Some(CellKind::Treasure),
            start: Some(CellCoord::new(1, 1)),
        }
    }

    #[test]
    fn missing_file_loads_default_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().expect("load"), SimulatorState::default());
    }

    #[test]
    fn saved_state_is_visible_to_a_fresh_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        let mut writer = JsonFileStore::new(&path);
        writer.save(&initialized_state()).expect("save");

        let reader = JsonFileStore::new(&path);
        assert_eq!(reader.load().expect("load"), initialized_state());
        assert!(!writer.staging_path().exists());
    }

    #[test]
    fn record_uses_documented_layout() {
        let encoded = serde_json::to_value(initialized_state()).expect("encode");
        assert_eq!(
            encoded,
            serde_json::json!({
                "position": [3, 2],
                "initialized": true,
                "original_cell_kind": "T",
                "start": [1, 1],
            })
        );
    }

    #[test]
    fn record_without_start_field_still_loads() {
        let state: SimulatorState = serde_json::from_str(
            r#"{"position": [1, 2], "initialized": true, "original_cell_kind": "."}"#,
        )
        .expect("decode");
        assert_eq!(state.position, Some(CellCoord::new(1, 2)));
        assert_eq!(state.original_cell_kind, Some(CellKind::Empty));
        assert_eq!(state.start, None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").expect("write");

        let error = JsonFileStore::new(&path).load().unwrap_err();
        assert!(matches!(error, StoreError::Corrupt { .. }));
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let result: Result<SimulatorState, _> = serde_json::from_str(
            r#"{"position": null, "initialized": false, "original_cell_kind": "x"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn memory_store_counts_saves() {
        let mut store = MemoryStore::new();
        assert_eq!(store.load().expect("load"), SimulatorState::default());
        store.save(&initialized_state()).expect("save");
        assert_eq!(store.saves(), 1);
        assert_eq!(store.snapshot(), Some(&initialized_state()));
    }
}
