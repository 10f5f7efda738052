//! Snapshot of the state that outlives a run: the position ledger and the
//! carry-forward balances. Stored as pretty-printed JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::TaxError;
use crate::records::PositionLedger;
use crate::tax::CarryForward;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub positions: PositionLedger,
    pub carry: CarryForward,
}

pub fn save_snapshot<P: AsRef<Path>>(path: P, snapshot: &EngineSnapshot) -> Result<(), TaxError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(snapshot).map_err(|e| TaxError::Parse(e.to_string()))?;
    std::fs::write(path, json)?;
    info!("Saved {} positions to {:?}", snapshot.positions.len(), path);
    Ok(())
}

pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<EngineSnapshot, TaxError> {
    let path = path.as_ref();
    debug!("Loading snapshot from {:?}", path);
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| TaxError::Parse(format!("{:?}: {}", path, e)))
}

/// Load the snapshot at `path`, or start empty if the file does not exist yet
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<EngineSnapshot, TaxError> {
    let path = path.as_ref();
    if path.exists() {
        load_snapshot(path)
    } else {
        debug!("No snapshot at {:?}, starting empty", path);
        Ok(EngineSnapshot::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Position};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_survives_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("darf.json");

        let mut snapshot = EngineSnapshot::default();
        snapshot
            .positions
            .add(Position::new("TAEE11", dec!(35.12), Category::Normal, 200, dec!(3.40)))
            .unwrap();
        snapshot.carry.accumulated_loss.day_trade = dec!(120.50);
        snapshot.carry.accumulated_darf = dec!(7.25);

        save_snapshot(&path, &snapshot).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), snapshot);
    }

    #[test]
    fn test_missing_snapshot_starts_empty() {
        let dir = TempDir::new().unwrap();
        let snapshot = load_or_default(dir.path().join("absent.json")).unwrap();
        assert!(snapshot.positions.is_empty());
        assert!(matches!(load_snapshot(dir.path().join("absent.json")), Err(TaxError::Io(_))));
    }

    #[test]
    fn test_corrupt_snapshot_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_snapshot(&path), Err(TaxError::Parse(_))));
    }
}
