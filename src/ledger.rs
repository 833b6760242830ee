//! Metadata Ledger
//!
//! One structured document describing every plate's identity and
//! placement. Written once, atomically, at run end; hashed over the
//! canonical JSON of the plate list so identical runs are provably
//! identical.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::config::ExportConfig;
use crate::plates::{PlateRecord, PxRect, PxSize};

pub const LEDGER_SCHEMA_VERSION: &str = "1.0.0";
pub const LEDGER_FILE: &str = "meta.json";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ledger schema version {found} is unreadable (reader supports {supported})")]
    SchemaMismatch { found: String, supported: String },

    #[error("invalid schema version: {0}")]
    BadVersion(String),
}

/// Placement fields keyed by plate id, for consumers that only need
/// geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatePlacement {
    pub dpi_used: u32,
    pub card_px: PxSize,
    pub rect_px: PxRect,
    pub size_px: PxSize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataLedger {
    pub schema_version: String,
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub dpi: u32,
    pub max_px: u32,
    pub plates: Vec<PlateRecord>,
    pub placement_by_id: BTreeMap<String, PlatePlacement>,
    /// SHA-256 over the canonical JSON of `plates`.
    pub ledger_hash: String,
}

impl MetadataLedger {
    /// Builds the ledger from the run's append-only plate list.
    pub fn assemble(
        plates: Vec<PlateRecord>,
        config: &ExportConfig,
    ) -> Result<Self, serde_json::Error> {
        let placement_by_id = plates
            .iter()
            .map(|p| {
                (
                    p.id.clone(),
                    PlatePlacement {
                        dpi_used: p.dpi_used,
                        card_px: p.card_px,
                        rect_px: p.rect_px,
                        size_px: p.size_px,
                    },
                )
            })
            .collect();
        let ledger_hash = plate_list_hash(&plates)?;

        Ok(Self {
            schema_version: LEDGER_SCHEMA_VERSION.to_string(),
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            dpi: config.target_dpi,
            max_px: config.max_px,
            plates,
            placement_by_id,
            ledger_hash,
        })
    }

    /// Write-temp-then-rename into `<out_dir>/meta.json`. A failed run
    /// never leaves a partial ledger: the temp file is removed on any
    /// error, and a previous run's intact ledger is only ever replaced
    /// by a complete new one.
    pub fn write_atomic(&self, out_dir: &Path) -> Result<PathBuf, LedgerError> {
        let tmp = out_dir.join(format!("{LEDGER_FILE}.tmp"));
        let path = out_dir.join(LEDGER_FILE);

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(path)
    }

    /// Reads a ledger back, rejecting schema majors this reader does
    /// not understand.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let content = fs::read_to_string(path)?;
        let ledger: Self = serde_json::from_str(&content)?;

        let found = semver::Version::parse(&ledger.schema_version)
            .map_err(|_| LedgerError::BadVersion(ledger.schema_version.clone()))?;
        let supported = semver::Version::parse(LEDGER_SCHEMA_VERSION)
            .map_err(|_| LedgerError::BadVersion(LEDGER_SCHEMA_VERSION.to_string()))?;
        if found.major != supported.major {
            return Err(LedgerError::SchemaMismatch {
                found: ledger.schema_version.clone(),
                supported: LEDGER_SCHEMA_VERSION.to_string(),
            });
        }
        Ok(ledger)
    }
}

/// SHA-256 of bytes as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Canonical JSON: sorted keys, no whitespace. Key order in the source
/// structs must not affect the hash.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v = serde_json::to_value(value)?;
    serde_json::to_string(&sort_value(v))
}

fn sort_value(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_value(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_value).collect()),
        other => other,
    }
}

/// The idempotence witness: same plate list, same hash.
pub fn plate_list_hash(plates: &[PlateRecord]) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(canonical_json(&plates)?.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{FinishType, Side};
    use crate::geom::Rect;
    use serde_json::json;

    fn plate(id: &str) -> PlateRecord {
        PlateRecord {
            id: id.into(),
            side: Side::Front,
            card_index: 0,
            finish: FinishType::Print,
            file: format!("{id}.png"),
            vector_file: None,
            export_rect: Rect::new(0.0, 150.0, 300.0, 0.0),
            rect_px: PxRect { x0: 0, y0: 0, x1: 600, y1: 300 },
            card_px: PxSize { w: 600, h: 300 },
            size_px: PxSize { w: 600, h: 300 },
            dpi_used: 144,
        }
    }

    fn cfg(dir: &Path) -> ExportConfig {
        ExportConfig::new(dir)
    }

    #[test]
    fn canonical_json_sorts_keys_recursively() {
        let obj1 = json!({"z": 1, "a": 2, "m": {"b": 1, "a": 2}});
        let obj2 = json!({"a": 2, "m": {"a": 2, "b": 1}, "z": 1});
        assert_eq!(canonical_json(&obj1).unwrap(), canonical_json(&obj2).unwrap());
        assert_eq!(
            canonical_json(&json!({"z": 1, "a": 2})).unwrap(),
            r#"{"a":2,"z":1}"#
        );
    }

    #[test]
    fn plate_hash_ignores_run_identity() {
        let dir = tempfile::tempdir().unwrap();
        let a = MetadataLedger::assemble(vec![plate("p")], &cfg(dir.path())).unwrap();
        let b = MetadataLedger::assemble(vec![plate("p")], &cfg(dir.path())).unwrap();
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.ledger_hash, b.ledger_hash);
    }

    #[test]
    fn placement_map_mirrors_plates() {
        let dir = tempfile::tempdir().unwrap();
        let ledger =
            MetadataLedger::assemble(vec![plate("a"), plate("b")], &cfg(dir.path())).unwrap();
        assert_eq!(ledger.placement_by_id.len(), 2);
        assert_eq!(ledger.placement_by_id["a"].dpi_used, 144);
        assert_eq!(ledger.placement_by_id["b"].card_px, PxSize { w: 600, h: 300 });
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = MetadataLedger::assemble(vec![plate("p")], &cfg(dir.path())).unwrap();
        let path = ledger.write_atomic(dir.path()).unwrap();

        assert!(path.ends_with(LEDGER_FILE));
        assert!(path.exists());
        assert!(!dir.path().join("meta.json.tmp").exists());
    }

    #[test]
    fn load_roundtrips_and_checks_schema() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = MetadataLedger::assemble(vec![plate("p")], &cfg(dir.path())).unwrap();
        let path = ledger.write_atomic(dir.path()).unwrap();

        let back = MetadataLedger::load(&path).unwrap();
        assert_eq!(back.ledger_hash, ledger.ledger_hash);
        assert_eq!(back.plates.len(), 1);
    }

    #[test]
    fn load_rejects_future_schema_major() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = MetadataLedger::assemble(vec![], &cfg(dir.path())).unwrap();
        ledger.schema_version = "2.0.0".into();
        let path = ledger.write_atomic(dir.path()).unwrap();

        let err = MetadataLedger::load(&path).unwrap_err();
        assert!(matches!(err, LedgerError::SchemaMismatch { .. }));
    }
}
