//! Plate Exporter
//!
//! Computes export rectangles, requests rasterization, and records
//! placement. Pixel placements are measured from the card frame's
//! top-left corner, y growing down; document space stays y-up.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::classify::{FinishType, Side};
use crate::config::{EmptyFinishPolicy, ExportConfig};
use crate::document::{DocumentSnapshot, LayerNode};
use crate::frame::{CardFrame, ClassifiedLayer};
use crate::geom::{collect_content_bounds, collect_deep_bounds, Rect};
use crate::pipeline::PipelineError;
use crate::resolution::pts_to_px;
use crate::surface::RenderSurface;

/// Pixel rectangle in card-canvas coordinates (top-left origin,
/// y-down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PxRect {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PxSize {
    pub w: i64,
    pub h: i64,
}

/// One exported plate. Created once at export time, never mutated; the
/// die-cut vector file is attached by value before the record joins
/// the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateRecord {
    pub id: String,
    pub side: Side,
    pub card_index: u32,
    #[serde(rename = "type")]
    pub finish: FinishType,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_file: Option<String>,
    /// Export rectangle in document units.
    pub export_rect: Rect,
    /// Placement within the card canvas, pixels, y-down.
    pub rect_px: PxRect,
    /// Full card canvas size in pixels.
    pub card_px: PxSize,
    /// Exported raster size in pixels.
    pub size_px: PxSize,
    pub dpi_used: u32,
}

impl PlateRecord {
    pub fn with_vector_file(mut self, file: String) -> Self {
        self.vector_file = Some(file);
        self
    }
}

/// Converts a document-space rectangle into card-canvas pixels:
/// x from the card's left edge, y down from the card's top edge.
pub fn rect_to_card_px(card: &Rect, rect: &Rect, dpi: u32) -> PxRect {
    PxRect {
        x0: pts_to_px(rect.left - card.left, dpi).round() as i64,
        y0: pts_to_px(card.top - rect.top, dpi).round() as i64,
        x1: pts_to_px(rect.right - card.left, dpi).round() as i64,
        y1: pts_to_px(card.top - rect.bottom, dpi).round() as i64,
    }
}

pub fn px_size(w_pt: f64, h_pt: f64, dpi: u32) -> PxSize {
    PxSize {
        w: pts_to_px(w_pt, dpi).round() as i64,
        h: pts_to_px(h_pt, dpi).round() as i64,
    }
}

/// Planned export rectangle for one layer, before any surface call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedRect {
    pub rect: Rect,
    /// True when the rect was cropped to the content/frame
    /// intersection rather than covering the full frame.
    pub cropped: bool,
    /// True when the content intersection was empty and the full frame
    /// stood in.
    pub empty_intersection: bool,
}

/// Computes the export rectangle for a classified layer, or None when
/// the layer has no visible geometry at all (skipped entirely, no
/// record).
pub fn plan_export_rect(
    doc: &DocumentSnapshot,
    layer: &LayerNode,
    finish: FinishType,
    frame: &CardFrame,
    side: Side,
) -> Option<PlannedRect> {
    let deep = collect_deep_bounds(doc, layer)?;
    let side_rect = *frame.side_rect(side);

    // PRINT always covers the full card frame.
    if finish == FinishType::Print {
        return Some(PlannedRect {
            rect: side_rect,
            cropped: false,
            empty_intersection: false,
        });
    }

    debug!("{}: deep bounds {deep:?}", layer.name);
    let content = collect_content_bounds(doc, layer, frame.width, frame.height);
    match content.and_then(|c| c.intersect(&side_rect)) {
        Some(rect) => Some(PlannedRect {
            rect,
            cropped: true,
            empty_intersection: false,
        }),
        // A classified, non-empty layer is never skipped: the full
        // frame stands in when nothing lands on the card.
        None => Some(PlannedRect {
            rect: side_rect,
            cropped: false,
            empty_intersection: true,
        }),
    }
}

/// Exports one plate: solos the layer, rasterizes its export rect at
/// the card's locked DPI, and records placement. Returns None when the
/// layer holds no geometry.
pub fn export_plate<S: RenderSurface>(
    doc: &DocumentSnapshot,
    surface: &mut S,
    frame: &CardFrame,
    cl: &ClassifiedLayer,
    config: &ExportConfig,
) -> Result<Option<PlateRecord>, PipelineError> {
    let layer = doc.layer(cl.layer_idx);
    let side = cl.identity.side;

    let Some(planned) = plan_export_rect(doc, layer, cl.finish, frame, side) else {
        debug!("skipping empty layer {}", layer.name);
        return Ok(None);
    };

    if planned.empty_intersection {
        match config.empty_finish_policy {
            EmptyFinishPolicy::Error => {
                return Err(PipelineError::EmptyFinishIntersection {
                    layer: layer.name.clone(),
                })
            }
            EmptyFinishPolicy::Fallback => warn!(
                "{}: no finish content inside the card frame, exporting full card",
                layer.name
            ),
        }
    }

    surface.set_solo_visible(&layer.id)?;

    let stem = if cl.finish.is_mask() {
        format!("{}_mask", layer.name)
    } else {
        layer.name.clone()
    };
    let file = format!("{stem}.png");
    surface.rasterize(&planned.rect, frame.dpi_used, &config.out_dir.join(&file))?;

    let side_rect = frame.side_rect(side);
    Ok(Some(PlateRecord {
        id: stem,
        side,
        card_index: cl.identity.card_index,
        finish: cl.finish,
        file,
        vector_file: None,
        export_rect: planned.rect,
        rect_px: rect_to_card_px(side_rect, &planned.rect, frame.dpi_used),
        card_px: px_size(side_rect.width(), side_rect.height(), frame.dpi_used),
        size_px: px_size(planned.rect.width(), planned.rect.height(), frame.dpi_used),
        dpi_used: frame.dpi_used,
    }))
}
