//! Card Frame Resolver
//!
//! Derives one canonical rectangle per card index from whatever
//! evidence the document offers. Front and back share a size; each
//! side keeps its own document position. The DPI for a card index is
//! locked here, once, from the front rectangle.

use log::{debug, warn};
use std::collections::BTreeMap;

use crate::classify::{classify_finish, parse_identity, FinishType, LayerIdentity, Side};
use crate::config::ExportConfig;
use crate::document::DocumentSnapshot;
use crate::geom::{collect_content_bounds, collect_deep_bounds, Rect};
use crate::resolution::dpi_for_rect;

/// Cards narrower than this on either axis are suspicious but still
/// exported; downstream validation owns plausibility.
const TINY_CARD_PT: f64 = 36.0;

/// One production layer that survived classification.
#[derive(Debug, Clone)]
pub struct ClassifiedLayer {
    /// Layer-arena index in the snapshot.
    pub layer_idx: usize,
    pub identity: LayerIdentity,
    pub finish: FinishType,
}

/// Layers of one card index, split by side, in document order.
#[derive(Debug, Clone, Default)]
pub struct CardGroup {
    pub front: Vec<ClassifiedLayer>,
    pub back: Vec<ClassifiedLayer>,
}

impl CardGroup {
    pub fn side_layers(&self, side: Side) -> &[ClassifiedLayer] {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }

    fn side_layers_mut(&mut self, side: Side) -> &mut Vec<ClassifiedLayer> {
        match side {
            Side::Front => &mut self.front,
            Side::Back => &mut self.back,
        }
    }
}

/// Classifies every top-level layer; non-matching layers are dropped
/// entirely.
pub fn classify_document(doc: &DocumentSnapshot) -> Vec<ClassifiedLayer> {
    let mut out = Vec::new();
    for (idx, layer) in doc.top_layers() {
        let Some(identity) = parse_identity(&layer.name) else {
            debug!("ignoring layer without production prefix: {}", layer.name);
            continue;
        };
        let Some(finish) = classify_finish(&layer.name) else {
            debug!("ignoring unclassified layer: {}", layer.name);
            continue;
        };
        out.push(ClassifiedLayer {
            layer_idx: idx,
            identity,
            finish,
        });
    }
    out
}

/// Groups classified layers by card index, ordered by index.
pub fn group_cards(layers: Vec<ClassifiedLayer>) -> BTreeMap<u32, CardGroup> {
    let mut groups: BTreeMap<u32, CardGroup> = BTreeMap::new();
    for layer in layers {
        groups
            .entry(layer.identity.card_index)
            .or_default()
            .side_layers_mut(layer.identity.side)
            .push(layer);
    }
    groups
}

/// Canonical per-card rectangle set with its locked DPI.
#[derive(Debug, Clone, PartialEq)]
pub struct CardFrame {
    pub card_index: u32,
    pub width: f64,
    pub height: f64,
    pub front: Rect,
    pub back: Rect,
    pub dpi_used: u32,
}

impl CardFrame {
    pub fn side_rect(&self, side: Side) -> &Rect {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }
}

/// Seed evidence cascade, first non-empty wins.
fn side_seed(doc: &DocumentSnapshot, layers: &[ClassifiedLayer]) -> Option<(Rect, &'static str)> {
    type Strategy = fn(&DocumentSnapshot, &[ClassifiedLayer]) -> Option<Rect>;
    let strategies: [(&'static str, Strategy); 3] = [
        ("print", seed_from_print),
        ("finish", seed_from_finish),
        ("visible", seed_from_any_visible),
    ];
    strategies
        .iter()
        .find_map(|(name, run)| run(doc, layers).map(|r| (r, *name)))
}

/// Content bounds with the frame-artifact filter sized from the
/// layer's own deep bounds: the card size is not known yet at seed
/// time, so a full-extent decorative border is measured against the
/// extent it frames.
fn seed_content_bounds(doc: &DocumentSnapshot, layer_idx: usize) -> Option<Rect> {
    let layer = doc.layer(layer_idx);
    let deep = collect_deep_bounds(doc, layer)?;
    collect_content_bounds(doc, layer, deep.width(), deep.height())
}

fn seed_from_print(doc: &DocumentSnapshot, layers: &[ClassifiedLayer]) -> Option<Rect> {
    union_over(layers.iter().filter(|l| l.finish == FinishType::Print), doc)
}

fn seed_from_finish(doc: &DocumentSnapshot, layers: &[ClassifiedLayer]) -> Option<Rect> {
    union_over(
        layers.iter().filter(|l| {
            matches!(
                l.finish,
                FinishType::Foil | FinishType::Uv | FinishType::Emboss
            )
        }),
        doc,
    )
}

fn seed_from_any_visible(doc: &DocumentSnapshot, layers: &[ClassifiedLayer]) -> Option<Rect> {
    layers
        .iter()
        .filter_map(|l| collect_deep_bounds(doc, doc.layer(l.layer_idx)))
        .reduce(|a, b| a.union(&b))
}

fn union_over<'a, I>(layers: I, doc: &DocumentSnapshot) -> Option<Rect>
where
    I: Iterator<Item = &'a ClassifiedLayer>,
{
    layers
        .filter_map(|l| seed_content_bounds(doc, l.layer_idx))
        .reduce(|a, b| a.union(&b))
}

/// Resolves the canonical frame for one card index.
///
/// Missing seeds mirror the opposite side; with no evidence on either
/// side the first artboard stands in. Card size is the component-wise
/// max of both seeds, each side centered on its own seed centroid.
pub fn resolve_frame(
    doc: &DocumentSnapshot,
    card_index: u32,
    group: &CardGroup,
    config: &ExportConfig,
) -> CardFrame {
    let front_seed = side_seed(doc, &group.front);
    let back_seed = side_seed(doc, &group.back);

    let (front_seed, back_seed) = match (front_seed, back_seed) {
        (Some(f), Some(b)) => (f, b),
        (Some(f), None) => {
            debug!("card {card_index}: back seed mirrored from front");
            (f, (f.0, "mirrored"))
        }
        (None, Some(b)) => {
            debug!("card {card_index}: front seed mirrored from back");
            ((b.0, "mirrored"), b)
        }
        (None, None) => {
            warn!("card {card_index}: no frame evidence on either side, using artboard");
            ((doc.artboard, "artboard"), (doc.artboard, "artboard"))
        }
    };

    let width = front_seed.0.width().max(back_seed.0.width());
    let height = front_seed.0.height().max(back_seed.0.height());

    if width < TINY_CARD_PT || height < TINY_CARD_PT {
        warn!("card {card_index}: implausibly small frame {width:.1}x{height:.1}pt");
    }

    let (fx, fy) = front_seed.0.center();
    let (bx, by) = back_seed.0.center();
    let front = Rect::centered(fx, fy, width, height);
    let back = Rect::centered(bx, by, width, height);

    // One DPI per card index, computed from the front rectangle and
    // reused for every plate on both sides.
    let dpi_used = dpi_for_rect(&front, config.target_dpi, config.max_px);

    debug!(
        "card {card_index}: {width:.1}x{height:.1}pt at {dpi_used}dpi (front seed: {}, back seed: {})",
        front_seed.1, back_seed.1
    );

    CardFrame {
        card_index,
        width,
        height,
        front,
        back,
        dpi_used,
    }
}
