//! Layer Classifier - Names to Identities
//!
//! Production layer names follow `<side>_layer_<n>_<finish>`, e.g.
//! `front_layer_0_print` or `back_layer_2_foil_gold_mask`. Anything
//! else is decoration and contributes nothing to the run.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Front, Side::Back];

    pub fn opposite(&self) -> Side {
        match self {
            Side::Front => Side::Back,
            Side::Back => Side::Front,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Front => write!(f, "front"),
            Side::Back => write!(f, "back"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FinishType {
    Print,
    Diecut,
    Uv,
    Emboss,
    Foil,
}

impl FinishType {
    /// Finish plates export as `<layer>_mask.png`; PRINT exports as
    /// `<layer>.png`.
    pub fn is_mask(&self) -> bool {
        !matches!(self, FinishType::Print)
    }
}

/// (side, card index) parsed from a layer name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerIdentity {
    pub side: Side,
    pub card_index: u32,
}

/// Parses `^(front|back)_layer_(\d+)_` off the trimmed, lowercased
/// name. None when the prefix does not match.
pub fn parse_identity(name: &str) -> Option<LayerIdentity> {
    let lower = name.trim().to_ascii_lowercase();

    let (side, rest) = if let Some(rest) = lower.strip_prefix("front_layer_") {
        (Side::Front, rest)
    } else if let Some(rest) = lower.strip_prefix("back_layer_") {
        (Side::Back, rest)
    } else {
        return None;
    };

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    if !rest[digits_end..].starts_with('_') {
        return None;
    }

    let card_index: u32 = rest[..digits_end].parse().ok()?;
    Some(LayerIdentity { side, card_index })
}

/// Maps a layer name suffix to its finish type. None means the layer
/// is never exported and contributes no geometry.
pub fn classify_finish(name: &str) -> Option<FinishType> {
    let n = name.trim().to_ascii_lowercase();

    if n.ends_with("_laser_cut") || n.ends_with("_die_cut") {
        return Some(FinishType::Diecut);
    }
    if n.ends_with("_spot_uv") {
        return Some(FinishType::Uv);
    }
    if n.ends_with("_emboss") || n.ends_with("_deboss") {
        return Some(FinishType::Emboss);
    }
    if n.contains("_foil_") {
        return Some(FinishType::Foil);
    }
    // `_back_print` also ends with `_print`.
    if n.ends_with("_print") {
        return Some(FinishType::Print);
    }
    None
}
