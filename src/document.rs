//! Document Snapshot - Owned Immutable Layer Tree
//!
//! One snapshot is taken per run. All geometry and classification work
//! reads this tree; nothing in the core ever touches a live host object
//! graph. Nodes live in arenas and reference children by index.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::geom::Rect;

/// 8-bit RGB stroke/fill color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Template/guide strokes come in saturated reds.
    pub fn is_guide_red(&self) -> bool {
        self.r >= 200 && self.g <= 80 && self.b <= 80
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ItemKind {
    /// A single path. `rectangle` marks an axis-aligned four-corner
    /// path; `clip` marks the path as its group's designated clip
    /// boundary.
    Path {
        #[serde(default)]
        rectangle: bool,
        #[serde(default)]
        clip: bool,
    },
    CompoundPath,
    /// `clipped` groups mask their contents with a clip boundary.
    Group {
        #[serde(default)]
        clipped: bool,
    },
    PlacedRaster,
}

impl ItemKind {
    pub fn is_clip_path(&self) -> bool {
        matches!(self, ItemKind::Path { clip: true, .. })
    }

    pub fn is_rectangle(&self) -> bool {
        matches!(self, ItemKind::Path { rectangle: true, .. })
    }

    pub fn is_clipped_group(&self) -> bool {
        matches!(self, ItemKind::Group { clipped: true })
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ItemKind::Group { .. })
    }
}

/// One drawable item in the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemNode {
    /// Stable id understood by the render surface.
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub hidden: bool,
    /// Tight geometric bounds, document units.
    #[serde(default)]
    pub bounds: Option<Rect>,
    /// Visually-inclusive bounds (strokes, effects).
    #[serde(default)]
    pub visual_bounds: Option<Rect>,
    #[serde(default)]
    pub filled: bool,
    #[serde(default)]
    pub fill_color: Option<Rgb>,
    #[serde(default)]
    pub stroked: bool,
    #[serde(default)]
    pub stroke_color: Option<Rgb>,
    /// Item-arena indices of direct children (groups, compound paths).
    #[serde(default)]
    pub children: Vec<usize>,
}

/// One layer in the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerNode {
    /// Stable id understood by the render surface.
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Item-arena indices of the layer's top-level items.
    #[serde(default)]
    pub items: Vec<usize>,
    /// Layer-arena indices of nested sublayers.
    #[serde(default)]
    pub sublayers: Vec<usize>,
}

fn default_true() -> bool {
    true
}

/// Immutable snapshot of the source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    /// Layer-arena indices of the document's top-level layers, in
    /// document order.
    pub layers: Vec<usize>,
    pub layer_arena: Vec<LayerNode>,
    pub item_arena: Vec<ItemNode>,
    /// First page/artboard rectangle. Last-resort card frame evidence.
    pub artboard: Rect,
}

impl DocumentSnapshot {
    pub fn layer(&self, idx: usize) -> &LayerNode {
        &self.layer_arena[idx]
    }

    pub fn item(&self, idx: usize) -> &ItemNode {
        &self.item_arena[idx]
    }

    /// Top-level layers in document order.
    pub fn top_layers(&self) -> impl Iterator<Item = (usize, &LayerNode)> {
        self.layers.iter().map(move |&i| (i, &self.layer_arena[i]))
    }

    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Incremental snapshot construction for hosts and tests.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    layers: Vec<usize>,
    layer_arena: Vec<LayerNode>,
    item_arena: Vec<ItemNode>,
    artboard: Option<Rect>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artboard(mut self, rect: Rect) -> Self {
        self.artboard = Some(rect);
        self
    }

    /// Adds an item to the arena and returns its index.
    pub fn push_item(&mut self, item: ItemNode) -> usize {
        self.item_arena.push(item);
        self.item_arena.len() - 1
    }

    /// Adds a top-level layer and returns its arena index.
    pub fn push_layer(&mut self, layer: LayerNode) -> usize {
        self.layer_arena.push(layer);
        let idx = self.layer_arena.len() - 1;
        self.layers.push(idx);
        idx
    }

    /// Adds a sublayer under `parent` and returns its arena index.
    pub fn push_sublayer(&mut self, parent: usize, layer: LayerNode) -> usize {
        self.layer_arena.push(layer);
        let idx = self.layer_arena.len() - 1;
        self.layer_arena[parent].sublayers.push(idx);
        idx
    }

    pub fn build(self) -> DocumentSnapshot {
        DocumentSnapshot {
            layers: self.layers,
            layer_arena: self.layer_arena,
            item_arena: self.item_arena,
            artboard: self.artboard.unwrap_or(Rect::new(0.0, 792.0, 612.0, 0.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_roundtrips_through_json() {
        let mut b = SnapshotBuilder::new();
        let item = b.push_item(ItemNode {
            id: "p0".into(),
            name: String::new(),
            kind: ItemKind::Path {
                rectangle: true,
                clip: false,
            },
            hidden: false,
            bounds: Some(Rect::new(0.0, 100.0, 50.0, 0.0)),
            visual_bounds: None,
            filled: true,
            fill_color: Some(Rgb { r: 10, g: 20, b: 30 }),
            stroked: false,
            stroke_color: None,
            children: vec![],
        });
        b.push_layer(LayerNode {
            id: "l0".into(),
            name: "front_layer_0_print".into(),
            visible: true,
            items: vec![item],
            sublayers: vec![],
        });
        let doc = b.artboard(Rect::new(0.0, 100.0, 50.0, 0.0)).build();

        let json = serde_json::to_string(&doc).unwrap();
        let back: DocumentSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.layers.len(), 1);
        assert_eq!(back.layer(0).name, "front_layer_0_print");
        assert_eq!(back.item(0).kind, doc.item(0).kind);
    }

    #[test]
    fn guide_red_detection() {
        assert!(Rgb { r: 255, g: 0, b: 0 }.is_guide_red());
        assert!(Rgb { r: 210, g: 60, b: 40 }.is_guide_red());
        assert!(!Rgb { r: 255, g: 255, b: 0 }.is_guide_red());
        assert!(!Rgb::BLACK.is_guide_red());
    }
}
