//! Render Surface - The Single Side-Effecting Boundary
//!
//! Every mutation of the rendering host goes through this trait:
//! visibility soloing, rasterization, and all scratch-canvas vector
//! surgery. Classification, geometry and placement logic stay pure and
//! test against a mock implementation.

use std::path::Path;
use thiserror::Error;

use crate::document::Rgb;
use crate::geom::Rect;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("rasterization failed: {0}")]
    Rasterize(String),

    #[error("vector export failed: {0}")]
    VectorExport(String),

    #[error("auto-vectorization is not available on this host")]
    VectorizeUnavailable,

    #[error("scratch canvas error: {0}")]
    Scratch(String),

    #[error("visibility toggle failed for layer {0}")]
    Visibility(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One top-level shape currently on the scratch canvas, in scratch
/// coordinates (origin at the canvas bottom-left, y-up).
#[derive(Debug, Clone, PartialEq)]
pub struct ScratchShape {
    pub id: String,
    pub bounds: Rect,
    pub rectangle: bool,
    pub filled: bool,
}

/// Capabilities the core needs from the rendering host.
///
/// The scratch canvas is a singleton: `scratch_begin` creates it on
/// first use and resizes/clears it afterwards; `scratch_teardown` is
/// called exactly once at run end, on every exit path.
pub trait RenderSurface {
    /// Makes `layer_id` (with its own sublayers) the only visible
    /// layer on the document.
    fn set_solo_visible(&mut self, layer_id: &str) -> Result<(), SurfaceError>;

    /// Rasterizes `rect` (document units) at `dpi` into a PNG at
    /// `out`, preserving alpha.
    fn rasterize(&mut self, rect: &Rect, dpi: u32, out: &Path) -> Result<(), SurfaceError>;

    /// Creates the scratch canvas on first call; resizes and clears it
    /// on subsequent calls.
    fn scratch_begin(&mut self, width: f64, height: f64) -> Result<(), SurfaceError>;

    /// Releases the scratch canvas and restores prior surface state.
    fn scratch_teardown(&mut self) -> Result<(), SurfaceError>;

    /// Duplicates document items into the scratch canvas, translated
    /// by (`dx`, `dy`).
    fn scratch_duplicate(&mut self, item_ids: &[String], dx: f64, dy: f64)
        -> Result<(), SurfaceError>;

    /// Fully flattens/ungroups the scratch contents.
    fn scratch_flatten(&mut self) -> Result<(), SurfaceError>;

    /// Enumerates the scratch canvas's top-level shapes.
    fn scratch_shapes(&mut self) -> Result<Vec<ScratchShape>, SurfaceError>;

    /// Boolean-unites all top-level scratch shapes into one.
    fn scratch_unite(&mut self) -> Result<(), SurfaceError>;

    /// Strips fills and applies a uniform stroke to every scratch path.
    fn scratch_stroke_only(&mut self, weight: f64, color: Rgb) -> Result<(), SurfaceError>;

    /// Exports the scratch contents as a vector file, no embedded
    /// rasters, fixed coordinate precision.
    fn scratch_export_vector(&mut self, out: &Path, precision: u8) -> Result<(), SurfaceError>;

    /// Places an already-exported raster into the scratch canvas at
    /// `rect` (scratch coordinates).
    fn scratch_place_raster(&mut self, raster: &Path, rect: &Rect) -> Result<(), SurfaceError>;

    /// Traces the placed raster into vector paths: black/white
    /// threshold, tight fitting, fills only, white ignored. Returns
    /// [`SurfaceError::VectorizeUnavailable`] when the host cannot
    /// trace.
    fn scratch_auto_vectorize(&mut self, threshold: u8) -> Result<(), SurfaceError>;

    /// Deletes scratch shapes by id.
    fn scratch_delete_shapes(&mut self, ids: &[String]) -> Result<(), SurfaceError>;
}
