//! Run Configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to do when a finish layer's content does not intersect the
/// card frame at all.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmptyFinishPolicy {
    /// Export the full card frame instead. An off-card foil layer
    /// still produces a plate the operator can inspect.
    #[default]
    Fallback,
    /// Treat it as an authoring error and abort the run.
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    /// Requested rasterization density.
    #[serde(default = "default_target_dpi")]
    pub target_dpi: u32,
    /// Cap on either pixel dimension of a single raster.
    #[serde(default = "default_max_px")]
    pub max_px: u32,
    /// Destination folder for plates, outlines and the ledger.
    pub out_dir: PathBuf,
    #[serde(default)]
    pub empty_finish_policy: EmptyFinishPolicy,
}

fn default_target_dpi() -> u32 {
    600
}

fn default_max_px() -> u32 {
    8192
}

impl ExportConfig {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dpi: default_target_dpi(),
            max_px: default_max_px(),
            out_dir: out_dir.into(),
            empty_finish_policy: EmptyFinishPolicy::default(),
        }
    }
}
