//! Geometry Resolver - Rectangles and Bounds Queries
//!
//! All rectangles are axis-aligned in document units (points), y-up:
//! `top >= bottom`, `right >= left`. Pixel conversion happens at the
//! plate-export boundary, nowhere else.

use serde::{Deserialize, Serialize};

use crate::document::{DocumentSnapshot, ItemNode, LayerNode};

/// Axes under this extent are treated as degenerate.
pub const DEGENERATE_EPS: f64 = 0.01;

/// Relative size tolerance for the frame-artifact filter.
const FRAME_TOLERANCE: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    /// Normalizing constructor: edges may arrive in either order.
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left: left.min(right),
            top: top.max(bottom),
            right: left.max(right),
            bottom: top.min(bottom),
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// A `w` x `h` rectangle centered on (`cx`, `cy`).
    pub fn centered(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self::new(cx - w / 2.0, cy + h / 2.0, cx + w / 2.0, cy - h / 2.0)
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() < DEGENERATE_EPS || self.height() < DEGENERATE_EPS
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.max(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.min(other.bottom),
        }
    }

    /// None when the projections are disjoint or merely edge-touching
    /// on some axis.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.min(other.top);
        let right = self.right.min(other.right);
        let bottom = self.bottom.max(other.bottom);
        if right <= left || top <= bottom {
            return None;
        }
        Some(Rect {
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect {
            left: self.left + dx,
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.bottom >= self.bottom
            && other.top <= self.top
    }
}

fn union_opt(acc: Option<Rect>, b: Option<Rect>) -> Option<Rect> {
    match (acc, b) {
        (Some(a), Some(b)) => Some(a.union(&b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Tight bounds of one item, falling back to visually-inclusive bounds
/// when the tight ones are degenerate. None for hidden items and items
/// with no usable extent on either query.
pub fn item_bounds(item: &ItemNode) -> Option<Rect> {
    if item.hidden {
        return None;
    }
    if let Some(b) = item.bounds.filter(|b| !b.is_degenerate()) {
        return Some(b);
    }
    item.visual_bounds.filter(|b| !b.is_degenerate())
}

/// Union of `item_bounds` over every visible item in `layer` and its
/// nested sublayers. Iterative walk over the snapshot arenas.
pub fn collect_deep_bounds(doc: &DocumentSnapshot, layer: &LayerNode) -> Option<Rect> {
    collect_bounds_filtered(doc, layer, |_| true)
}

/// Deep bounds excluding frame artifacts (decorative full-card borders
/// and guide rectangles). Used for finish-layer cropping.
pub fn collect_content_bounds(
    doc: &DocumentSnapshot,
    layer: &LayerNode,
    card_w: f64,
    card_h: f64,
) -> Option<Rect> {
    collect_bounds_filtered(doc, layer, |(item, bounds)| {
        !is_frame_artifact(item, bounds, card_w, card_h)
    })
}

fn collect_bounds_filtered<F>(doc: &DocumentSnapshot, layer: &LayerNode, keep: F) -> Option<Rect>
where
    F: Fn((&ItemNode, &Rect)) -> bool,
{
    let mut acc: Option<Rect> = None;

    let mut layer_stack: Vec<&LayerNode> = vec![layer];
    while let Some(layer) = layer_stack.pop() {
        let mut item_stack: Vec<usize> = layer.items.clone();
        while let Some(idx) = item_stack.pop() {
            let item = doc.item(idx);
            if item.hidden {
                continue;
            }
            if let Some(b) = item_bounds(item) {
                if keep((item, &b)) {
                    acc = union_opt(acc, Some(b));
                }
            }
            item_stack.extend(item.children.iter().copied());
        }
        for &sub in &layer.sublayers {
            let sub = doc.layer(sub);
            if sub.visible {
                layer_stack.push(sub);
            }
        }
    }

    acc
}

/// True when `bounds` matches the full card size within 2% relative
/// tolerance on both axes and the item is an unfilled stroke or a
/// no-fill rectangle. Such items frame the card instead of contributing
/// artwork.
pub fn is_frame_artifact(item: &ItemNode, bounds: &Rect, card_w: f64, card_h: f64) -> bool {
    if card_w <= 0.0 || card_h <= 0.0 {
        return false;
    }
    let matches_card = (bounds.width() - card_w).abs() <= card_w * FRAME_TOLERANCE
        && (bounds.height() - card_h).abs() <= card_h * FRAME_TOLERANCE;
    if !matches_card {
        return false;
    }
    let unfilled_stroke = !item.filled && item.stroked;
    let nofill_rect = !item.filled && item.kind.is_rectangle();
    unfilled_stroke || nofill_rect
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ItemKind, LayerNode, Rgb, SnapshotBuilder};

    fn path_item(id: &str, bounds: Rect) -> ItemNode {
        ItemNode {
            id: id.into(),
            name: String::new(),
            kind: ItemKind::Path {
                rectangle: false,
                clip: false,
            },
            hidden: false,
            bounds: Some(bounds),
            visual_bounds: None,
            filled: true,
            fill_color: Some(Rgb::BLACK),
            stroked: false,
            stroke_color: None,
            children: vec![],
        }
    }

    #[test]
    fn intersect_is_commutative() {
        let a = Rect::new(0.0, 100.0, 80.0, 0.0);
        let b = Rect::new(40.0, 140.0, 160.0, 60.0);
        assert_eq!(a.intersect(&b), b.intersect(&a));
        assert_eq!(
            a.intersect(&b).unwrap(),
            Rect::new(40.0, 100.0, 80.0, 60.0)
        );
    }

    #[test]
    fn intersect_none_on_disjoint_or_edge_touch() {
        let a = Rect::new(0.0, 10.0, 10.0, 0.0);
        let disjoint = Rect::new(20.0, 10.0, 30.0, 0.0);
        assert_eq!(a.intersect(&disjoint), None);

        // Shared edge: zero-area overlap is no overlap.
        let touching = Rect::new(10.0, 10.0, 20.0, 0.0);
        assert_eq!(a.intersect(&touching), None);
        assert_eq!(touching.intersect(&a), None);
    }

    #[test]
    fn union_covers_both() {
        let a = Rect::new(0.0, 10.0, 10.0, 0.0);
        let b = Rect::new(5.0, 30.0, 40.0, 20.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 30.0, 40.0, 0.0));
    }

    #[test]
    fn degenerate_tight_bounds_fall_back_to_visual() {
        let mut item = path_item("p", Rect::new(5.0, 5.0, 5.0, 5.0));
        item.visual_bounds = Some(Rect::new(0.0, 10.0, 10.0, 0.0));
        assert_eq!(item_bounds(&item), Some(Rect::new(0.0, 10.0, 10.0, 0.0)));

        item.visual_bounds = Some(Rect::new(0.0, 0.005, 10.0, 0.0));
        assert_eq!(item_bounds(&item), None);

        item.visual_bounds = None;
        assert_eq!(item_bounds(&item), None);
    }

    #[test]
    fn hidden_items_have_no_bounds() {
        let mut item = path_item("p", Rect::new(0.0, 10.0, 10.0, 0.0));
        item.hidden = true;
        assert_eq!(item_bounds(&item), None);
    }

    #[test]
    fn deep_bounds_unions_sublayers() {
        let mut b = SnapshotBuilder::new();
        let i0 = b.push_item(path_item("a", Rect::new(0.0, 50.0, 50.0, 0.0)));
        let i1 = b.push_item(path_item("b", Rect::new(100.0, 80.0, 120.0, 60.0)));
        let parent = b.push_layer(LayerNode {
            id: "l".into(),
            name: "front_layer_0_print".into(),
            visible: true,
            items: vec![i0],
            sublayers: vec![],
        });
        b.push_sublayer(
            parent,
            LayerNode {
                id: "ls".into(),
                name: "detail".into(),
                visible: true,
                items: vec![i1],
                sublayers: vec![],
            },
        );
        let doc = b.build();

        let bounds = collect_deep_bounds(&doc, doc.layer(0)).unwrap();
        assert_eq!(bounds, Rect::new(0.0, 80.0, 120.0, 0.0));
    }

    #[test]
    fn invisible_sublayers_are_skipped() {
        let mut b = SnapshotBuilder::new();
        let i0 = b.push_item(path_item("a", Rect::new(0.0, 50.0, 50.0, 0.0)));
        let i1 = b.push_item(path_item("b", Rect::new(500.0, 80.0, 600.0, 60.0)));
        let parent = b.push_layer(LayerNode {
            id: "l".into(),
            name: "front_layer_0_print".into(),
            visible: true,
            items: vec![i0],
            sublayers: vec![],
        });
        b.push_sublayer(
            parent,
            LayerNode {
                id: "ls".into(),
                name: "disabled".into(),
                visible: false,
                items: vec![i1],
                sublayers: vec![],
            },
        );
        let doc = b.build();

        let bounds = collect_deep_bounds(&doc, doc.layer(0)).unwrap();
        assert_eq!(bounds, Rect::new(0.0, 50.0, 50.0, 0.0));
    }

    #[test]
    fn frame_artifact_excluded_from_content_bounds() {
        // Unfilled red-stroked rectangle spanning the full card: a
        // decorative border, not content.
        let card = Rect::new(0.0, 150.0, 300.0, 0.0);
        let mut border = path_item("border", card);
        border.kind = ItemKind::Path {
            rectangle: true,
            clip: false,
        };
        border.filled = false;
        border.fill_color = None;
        border.stroked = true;
        border.stroke_color = Some(Rgb { r: 255, g: 0, b: 0 });

        let art = path_item("art", Rect::new(20.0, 130.0, 280.0, 20.0));

        let mut b = SnapshotBuilder::new();
        let i0 = b.push_item(border);
        let i1 = b.push_item(art);
        b.push_layer(LayerNode {
            id: "l".into(),
            name: "front_layer_0_foil_gold".into(),
            visible: true,
            items: vec![i0, i1],
            sublayers: vec![],
        });
        let doc = b.build();

        let content = collect_content_bounds(&doc, doc.layer(0), 300.0, 150.0).unwrap();
        assert_eq!(content, Rect::new(20.0, 130.0, 280.0, 20.0));

        // Deep bounds still see the border.
        let deep = collect_deep_bounds(&doc, doc.layer(0)).unwrap();
        assert_eq!(deep, card);
    }

    #[test]
    fn filled_full_card_art_is_not_an_artifact() {
        let card = Rect::new(0.0, 150.0, 300.0, 0.0);
        let art = path_item("bg", card);
        assert!(!is_frame_artifact(&art, &card, 300.0, 150.0));
    }

    #[test]
    fn near_card_size_within_tolerance_counts() {
        let mut border = path_item("b", Rect::new(0.0, 149.0, 298.0, 0.0));
        border.filled = false;
        border.stroked = true;
        let bounds = border.bounds.unwrap();
        assert!(is_frame_artifact(&border, &bounds, 300.0, 150.0));
    }
}
