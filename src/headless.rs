//! Headless Surface - Recording Placeholder Host
//!
//! Stands in for a real rendering host: resolves item ids against the
//! snapshot, models scratch-canvas shape state, writes placeholder
//! artifacts (a minimal transparent PNG, a minimal SVG document) and
//! records every call for assertions. Used by the CLI `export` command
//! and the test suite.

use std::fs;
use std::path::Path;

use crate::document::{DocumentSnapshot, Rgb};
use crate::geom::Rect;
use crate::surface::{RenderSurface, ScratchShape, SurfaceError};

/// Minimal 1x1 transparent PNG.
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Debug)]
struct Scratch {
    width: f64,
    height: f64,
    shapes: Vec<ScratchShape>,
    placed_raster: Option<Rect>,
}

#[derive(Debug)]
pub struct HeadlessSurface {
    doc: DocumentSnapshot,
    scratch: Option<Scratch>,
    /// Every call, in order, for test assertions.
    pub ops: Vec<String>,
    pub teardown_count: u32,
    /// Induces an ExportFailure on the next rasterize call.
    pub fail_rasterize: bool,
    /// When false, `scratch_auto_vectorize` reports unavailability.
    pub vectorize_supported: bool,
}

impl HeadlessSurface {
    pub fn new(doc: DocumentSnapshot) -> Self {
        Self {
            doc,
            scratch: None,
            ops: Vec::new(),
            teardown_count: 0,
            fail_rasterize: false,
            vectorize_supported: true,
        }
    }

    fn scratch_mut(&mut self) -> Result<&mut Scratch, SurfaceError> {
        self.scratch
            .as_mut()
            .ok_or_else(|| SurfaceError::Scratch("no scratch canvas".into()))
    }
}

impl RenderSurface for HeadlessSurface {
    fn set_solo_visible(&mut self, layer_id: &str) -> Result<(), SurfaceError> {
        self.ops.push(format!("solo:{layer_id}"));
        let known = self.doc.layer_arena.iter().any(|l| l.id == layer_id);
        if !known {
            return Err(SurfaceError::Visibility(layer_id.to_string()));
        }
        Ok(())
    }

    fn rasterize(&mut self, rect: &Rect, dpi: u32, out: &Path) -> Result<(), SurfaceError> {
        self.ops.push(format!(
            "rasterize:{}@{dpi}:{:.1}x{:.1}",
            out.file_name().and_then(|n| n.to_str()).unwrap_or("?"),
            rect.width(),
            rect.height()
        ));
        if self.fail_rasterize {
            return Err(SurfaceError::Rasterize("induced failure".into()));
        }
        fs::write(out, PLACEHOLDER_PNG)?;
        Ok(())
    }

    fn scratch_begin(&mut self, width: f64, height: f64) -> Result<(), SurfaceError> {
        self.ops.push(format!("scratch_begin:{width:.1}x{height:.1}"));
        self.scratch = Some(Scratch {
            width,
            height,
            shapes: Vec::new(),
            placed_raster: None,
        });
        Ok(())
    }

    fn scratch_teardown(&mut self) -> Result<(), SurfaceError> {
        self.ops.push("scratch_teardown".into());
        self.teardown_count += 1;
        if self.scratch.take().is_none() {
            return Err(SurfaceError::Scratch("teardown without canvas".into()));
        }
        Ok(())
    }

    fn scratch_duplicate(
        &mut self,
        item_ids: &[String],
        dx: f64,
        dy: f64,
    ) -> Result<(), SurfaceError> {
        self.ops.push(format!("scratch_duplicate:{}", item_ids.join(",")));
        let mut shapes = Vec::new();
        for id in item_ids {
            let item = self
                .doc
                .item_arena
                .iter()
                .find(|i| &i.id == id)
                .ok_or_else(|| SurfaceError::Scratch(format!("unknown item {id}")))?;
            let bounds = item
                .bounds
                .or(item.visual_bounds)
                .ok_or_else(|| SurfaceError::Scratch(format!("item {id} has no bounds")))?;
            shapes.push(ScratchShape {
                id: id.clone(),
                bounds: bounds.translate(dx, dy),
                rectangle: item.kind.is_rectangle(),
                filled: item.filled,
            });
        }
        self.scratch_mut()?.shapes.extend(shapes);
        Ok(())
    }

    fn scratch_flatten(&mut self) -> Result<(), SurfaceError> {
        self.ops.push("scratch_flatten".into());
        self.scratch_mut()?;
        Ok(())
    }

    fn scratch_shapes(&mut self) -> Result<Vec<ScratchShape>, SurfaceError> {
        Ok(self.scratch_mut()?.shapes.clone())
    }

    fn scratch_unite(&mut self) -> Result<(), SurfaceError> {
        self.ops.push("scratch_unite".into());
        let scratch = self.scratch_mut()?;
        let union = scratch
            .shapes
            .iter()
            .map(|s| s.bounds)
            .reduce(|a, b| a.union(&b));
        if let Some(bounds) = union {
            scratch.shapes = vec![ScratchShape {
                id: "united".into(),
                bounds,
                rectangle: false,
                filled: true,
            }];
        }
        Ok(())
    }

    fn scratch_stroke_only(&mut self, weight: f64, color: Rgb) -> Result<(), SurfaceError> {
        self.ops
            .push(format!("scratch_stroke_only:{weight}:{},{},{}", color.r, color.g, color.b));
        for shape in &mut self.scratch_mut()?.shapes {
            shape.filled = false;
        }
        Ok(())
    }

    fn scratch_export_vector(&mut self, out: &Path, precision: u8) -> Result<(), SurfaceError> {
        self.ops.push(format!(
            "scratch_export_vector:{}:p{precision}",
            out.file_name().and_then(|n| n.to_str()).unwrap_or("?")
        ));
        let scratch = self.scratch_mut()?;
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {:.1} {:.1}"></svg>"#,
            scratch.width, scratch.height
        );
        fs::write(out, svg)?;
        Ok(())
    }

    fn scratch_place_raster(&mut self, raster: &Path, rect: &Rect) -> Result<(), SurfaceError> {
        self.ops.push(format!(
            "scratch_place_raster:{}",
            raster.file_name().and_then(|n| n.to_str()).unwrap_or("?")
        ));
        if !raster.exists() {
            return Err(SurfaceError::Scratch(format!(
                "raster {} not found",
                raster.display()
            )));
        }
        self.scratch_mut()?.placed_raster = Some(*rect);
        Ok(())
    }

    fn scratch_auto_vectorize(&mut self, threshold: u8) -> Result<(), SurfaceError> {
        self.ops.push(format!("scratch_auto_vectorize:{threshold}"));
        if !self.vectorize_supported {
            return Err(SurfaceError::VectorizeUnavailable);
        }
        let scratch = self.scratch_mut()?;
        let placed = scratch
            .placed_raster
            .ok_or_else(|| SurfaceError::Scratch("no raster placed".into()))?;

        // Simulated trace: the image border rectangle plus an interior
        // outline shape.
        let inset_x = placed.width() * 0.15;
        let inset_y = placed.height() * 0.15;
        scratch.shapes = vec![
            ScratchShape {
                id: "trace_border".into(),
                bounds: placed,
                rectangle: true,
                filled: true,
            },
            ScratchShape {
                id: "trace_content".into(),
                bounds: Rect::new(
                    placed.left + inset_x,
                    placed.top - inset_y,
                    placed.right - inset_x,
                    placed.bottom + inset_y,
                ),
                rectangle: false,
                filled: true,
            },
        ];
        Ok(())
    }

    fn scratch_delete_shapes(&mut self, ids: &[String]) -> Result<(), SurfaceError> {
        self.ops.push(format!("scratch_delete:{}", ids.join(",")));
        let scratch = self.scratch_mut()?;
        scratch.shapes.retain(|s| !ids.contains(&s.id));
        Ok(())
    }
}
