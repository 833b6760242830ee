//! Diecut Outline Extractor
//!
//! Produces one clean unfilled-stroke vector outline per die-cut
//! layer. Vector candidates are searched in three tiers (clip paths,
//! filled regions, stroked-only regions); when the document offers no
//! usable vector source, the already-exported mask raster is traced
//! instead.

use log::{debug, warn};

use crate::classify::Side;
use crate::config::ExportConfig;
use crate::document::{DocumentSnapshot, ItemNode, LayerNode, Rgb};
use crate::frame::CardFrame;
use crate::geom::{item_bounds, Rect};
use crate::pipeline::PipelineError;
use crate::plates::PlateRecord;
use crate::surface::{RenderSurface, ScratchShape, SurfaceError};

/// A candidate must overlap at least this share of the card area.
pub const MIN_CARD_OVERLAP: f64 = 0.20;

/// Layer/item names carrying these substrings are authoring guides.
const GUIDE_KEYWORDS: &[&str] = &["guide", "template", "bleed", "safe", "trim", "crop"];

/// Edge-alignment tolerance for guide rectangle detection.
const EDGE_TOLERANCE_PT: f64 = 3.0;

/// A filled rectangle covering this share of the card is a background,
/// not a cut line.
const FULL_COVER_RATIO: f64 = 0.95;

/// Traced shapes covering this share of the canvas are frame residue.
const TRACE_COVER_RATIO: f64 = 0.80;

/// Black/white threshold handed to the host tracer.
const TRACE_THRESHOLD: u8 = 128;

/// Traced rectangles inset at most this far from the canvas border
/// count as frame residue.
const INSET_FRAME_PT: f64 = 6.0;

/// Edge tolerance when matching traced rectangles against the placed
/// image border or the canvas.
const RECT_MATCH_PT: f64 = 1.0;

const OUTLINE_STROKE_PT: f64 = 1.0;

/// Exported vector coordinate precision (decimal places).
pub const VECTOR_PRECISION: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateTier {
    ClipPath,
    Filled,
    StrokedOnly,
}

#[derive(Debug, Clone)]
pub struct OutlineCandidate {
    pub item_idx: usize,
    pub bounds: Rect,
    pub tier: CandidateTier,
    /// True for actual clip boundaries; rule (d) of the guide filter
    /// never applies to these.
    pub genuine_clip: bool,
}

fn card_overlap_ratio(bounds: &Rect, card: &Rect) -> f64 {
    bounds
        .intersect(card)
        .map_or(0.0, |i| i.area() / card.area())
}

fn near_any_card_edge(b: &Rect, card: &Rect) -> bool {
    (b.left - card.left).abs() <= EDGE_TOLERANCE_PT
        || (b.right - card.right).abs() <= EDGE_TOLERANCE_PT
        || (b.top - card.top).abs() <= EDGE_TOLERANCE_PT
        || (b.bottom - card.bottom).abs() <= EDGE_TOLERANCE_PT
}

fn aligned_all_edges(b: &Rect, card: &Rect) -> bool {
    (b.left - card.left).abs() <= EDGE_TOLERANCE_PT
        && (b.right - card.right).abs() <= EDGE_TOLERANCE_PT
        && (b.top - card.top).abs() <= EDGE_TOLERANCE_PT
        && (b.bottom - card.bottom).abs() <= EDGE_TOLERANCE_PT
}

/// Guide/frame filter, applied to every tier.
fn is_guide_artifact(item: &ItemNode, bounds: &Rect, card: &Rect, genuine_clip: bool) -> bool {
    let name = item.name.to_ascii_lowercase();
    if !name.is_empty() && GUIDE_KEYWORDS.iter().any(|k| name.contains(k)) {
        return true;
    }

    let is_rect = item.kind.is_rectangle();
    let unfilled_stroked_rect = is_rect && !item.filled && item.stroked;

    if unfilled_stroked_rect {
        let guide_red = item.stroke_color.map_or(false, |c| c.is_guide_red());
        if guide_red && near_any_card_edge(bounds, card) {
            return true;
        }
        if aligned_all_edges(bounds, card) {
            return true;
        }
    }

    // A filled rectangle blanketing the card is a background. Genuine
    // clip boundaries legitimately cover the whole card.
    if !genuine_clip && is_rect && item.filled && bounds.area() >= FULL_COVER_RATIO * card.area() {
        return true;
    }

    false
}

fn eligible(
    doc: &DocumentSnapshot,
    item_idx: usize,
    card: &Rect,
    tier: CandidateTier,
    genuine_clip: bool,
) -> Option<OutlineCandidate> {
    let item = doc.item(item_idx);
    let bounds = item_bounds(item)?;
    if card_overlap_ratio(&bounds, card) < MIN_CARD_OVERLAP {
        return None;
    }
    if is_guide_artifact(item, &bounds, card, genuine_clip) {
        return None;
    }
    Some(OutlineCandidate {
        item_idx,
        bounds,
        tier,
        genuine_clip,
    })
}

/// All item-arena indices reachable from the layer and its visible
/// sublayers, depth-first.
fn all_items(doc: &DocumentSnapshot, layer: &LayerNode) -> Vec<usize> {
    let mut out = Vec::new();
    let mut layer_stack: Vec<&LayerNode> = vec![layer];
    while let Some(layer) = layer_stack.pop() {
        let mut item_stack: Vec<usize> = layer.items.clone();
        while let Some(idx) = item_stack.pop() {
            let item = doc.item(idx);
            if item.hidden {
                continue;
            }
            out.push(idx);
            item_stack.extend(item.children.iter().copied());
        }
        for &sub in &layer.sublayers {
            let sub = doc.layer(sub);
            if sub.visible {
                layer_stack.push(sub);
            }
        }
    }
    out
}

/// The clip boundary of a clipped group: the designated clip path when
/// one exists, otherwise the first child with usable bounds.
fn clip_boundary_of(doc: &DocumentSnapshot, group: &ItemNode) -> Option<usize> {
    if let Some(&designated) = group
        .children
        .iter()
        .find(|&&c| doc.item(c).kind.is_clip_path())
    {
        return Some(designated);
    }
    group
        .children
        .iter()
        .find(|&&c| item_bounds(doc.item(c)).is_some())
        .copied()
}

/// Three-tier candidate search, first non-empty tier wins.
pub fn find_candidates(
    doc: &DocumentSnapshot,
    layer: &LayerNode,
    card: &Rect,
) -> Vec<OutlineCandidate> {
    let items = all_items(doc, layer);

    let clipped_groups: Vec<usize> = items
        .iter()
        .copied()
        .filter(|&i| doc.item(i).kind.is_clipped_group())
        .collect();

    // Tier 1: clip boundaries.
    let mut tier1 = Vec::new();
    for &g in &clipped_groups {
        if let Some(boundary) = clip_boundary_of(doc, doc.item(g)) {
            if let Some(c) = eligible(doc, boundary, card, CandidateTier::ClipPath, true) {
                tier1.push(c);
            }
        }
    }
    if !tier1.is_empty() {
        return tier1;
    }

    // Relaxation: clipped groups exist but yielded nothing usable, so
    // accept the clipped contents themselves.
    if !clipped_groups.is_empty() {
        let mut relaxed = Vec::new();
        for &g in &clipped_groups {
            let boundary = clip_boundary_of(doc, doc.item(g));
            for &child in &doc.item(g).children {
                if Some(child) == boundary && doc.item(child).kind.is_clip_path() {
                    continue;
                }
                if let Some(c) = eligible(doc, child, card, CandidateTier::ClipPath, false) {
                    relaxed.push(c);
                }
            }
        }
        if !relaxed.is_empty() {
            return relaxed;
        }
    }

    // Tier 2: non-clip filled shapes.
    let tier2: Vec<_> = items
        .iter()
        .copied()
        .filter(|&i| {
            let item = doc.item(i);
            !item.kind.is_group() && !item.kind.is_clip_path() && item.filled
        })
        .filter_map(|i| eligible(doc, i, card, CandidateTier::Filled, false))
        .collect();
    if !tier2.is_empty() {
        return tier2;
    }

    // Tier 3: remaining stroked-only shapes.
    items
        .iter()
        .copied()
        .filter(|&i| {
            let item = doc.item(i);
            !item.kind.is_group() && !item.kind.is_clip_path() && !item.filled && item.stroked
        })
        .filter_map(|i| eligible(doc, i, card, CandidateTier::StrokedOnly, false))
        .collect()
}

fn rect_matches(b: &Rect, target: &Rect, eps: f64) -> bool {
    (b.left - target.left).abs() <= eps
        && (b.right - target.right).abs() <= eps
        && (b.top - target.top).abs() <= eps
        && (b.bottom - target.bottom).abs() <= eps
}

/// A rectangle whose edges all sit within [`INSET_FRAME_PT`] inside
/// the canvas border.
fn is_inset_frame(b: &Rect, canvas: &Rect) -> bool {
    let inset = |edge: f64, canvas_edge: f64, inward: f64| {
        let d = (edge - canvas_edge) * inward;
        (0.0..=INSET_FRAME_PT).contains(&d)
    };
    inset(b.left, canvas.left, 1.0)
        && inset(b.right, canvas.right, -1.0)
        && inset(b.top, canvas.top, -1.0)
        && inset(b.bottom, canvas.bottom, 1.0)
}

/// Traced shapes that reproduce the placed-image border, the card
/// frame, a slightly inset frame, or blanket most of the canvas.
fn is_trace_artifact(shape: &ScratchShape, placed: &Rect, canvas: &Rect) -> bool {
    if shape.rectangle
        && (rect_matches(&shape.bounds, placed, RECT_MATCH_PT)
            || rect_matches(&shape.bounds, canvas, RECT_MATCH_PT)
            || is_inset_frame(&shape.bounds, canvas))
    {
        return true;
    }
    shape.bounds.area() >= TRACE_COVER_RATIO * canvas.area()
}

/// Extracts the vector outline for one die-cut layer. Returns the
/// exported vector file name, or None when the host cannot trace and
/// no vector candidates exist; the raster mask plate stands either
/// way.
pub fn extract_outline<S: RenderSurface>(
    doc: &DocumentSnapshot,
    surface: &mut S,
    frame: &CardFrame,
    side: Side,
    layer_idx: usize,
    mask_plate: &PlateRecord,
    config: &ExportConfig,
    scratch_used: &mut bool,
) -> Result<Option<String>, PipelineError> {
    let layer = doc.layer(layer_idx);
    let card = *frame.side_rect(side);
    let vector_file = format!("{}.svg", layer.name);
    let out_path = config.out_dir.join(&vector_file);

    let candidates = find_candidates(doc, layer, &card);
    if !candidates.is_empty() {
        debug!(
            "{}: {} outline candidate(s), tier {:?}",
            layer.name,
            candidates.len(),
            candidates[0].tier
        );
        *scratch_used = true;
        surface.scratch_begin(card.width(), card.height())?;

        let ids: Vec<String> = candidates
            .iter()
            .map(|c| doc.item(c.item_idx).id.clone())
            .collect();
        // Card origin moves to the canvas origin.
        surface.scratch_duplicate(&ids, -card.left, -card.bottom)?;
        surface.scratch_flatten()?;
        if surface.scratch_shapes()?.len() >= 2 {
            surface.scratch_unite()?;
        }
        surface.scratch_stroke_only(OUTLINE_STROKE_PT, Rgb::BLACK)?;
        surface.scratch_export_vector(&out_path, VECTOR_PRECISION)?;
        return Ok(Some(vector_file));
    }

    debug!("{}: no vector candidates, tracing mask raster", layer.name);
    match trace_mask_raster(surface, &card, mask_plate, config, &out_path, scratch_used) {
        Ok(()) => Ok(Some(vector_file)),
        Err(SurfaceError::VectorizeUnavailable) => {
            warn!(
                "{}: auto-vectorization unavailable, outline dropped (mask plate stands)",
                layer.name
            );
            Ok(None)
        }
        Err(e) => Err(PipelineError::Export(e)),
    }
}

fn trace_mask_raster<S: RenderSurface>(
    surface: &mut S,
    card: &Rect,
    mask_plate: &PlateRecord,
    config: &ExportConfig,
    out_path: &std::path::Path,
    scratch_used: &mut bool,
) -> Result<(), SurfaceError> {
    *scratch_used = true;
    surface.scratch_begin(card.width(), card.height())?;

    let placed = mask_plate.export_rect.translate(-card.left, -card.bottom);
    surface.scratch_place_raster(&config.out_dir.join(&mask_plate.file), &placed)?;
    surface.scratch_auto_vectorize(TRACE_THRESHOLD)?;

    let canvas = Rect::new(0.0, card.height(), card.width(), 0.0);
    let doomed: Vec<String> = surface
        .scratch_shapes()?
        .iter()
        .filter(|s| is_trace_artifact(s, &placed, &canvas))
        .map(|s| s.id.clone())
        .collect();
    if !doomed.is_empty() {
        surface.scratch_delete_shapes(&doomed)?;
    }

    surface.scratch_stroke_only(OUTLINE_STROKE_PT, Rgb::BLACK)?;
    surface.scratch_export_vector(out_path, VECTOR_PRECISION)?;
    Ok(())
}
