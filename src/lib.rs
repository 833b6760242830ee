//! PlateWorks Core - Card Plate Extraction Engine
//!
//! # The Four Guarantees (Non-Negotiable)
//! 1. Front And Back Share One Card Size
//! 2. PRINT Plates Cover The Full Card Frame
//! 3. One Locked DPI Per Card Index
//! 4. The Ledger Is Written Atomically Or Not At All

pub mod classify;
pub mod config;
pub mod document;
pub mod frame;
pub mod geom;
pub mod headless;
pub mod ledger;
pub mod outline;
pub mod pipeline;
pub mod plates;
pub mod resolution;
pub mod surface;

pub use classify::{classify_finish, parse_identity, FinishType, LayerIdentity, Side};
pub use config::{EmptyFinishPolicy, ExportConfig};
pub use document::{DocumentSnapshot, ItemKind, ItemNode, LayerNode, Rgb, SnapshotBuilder};
pub use frame::{classify_document, group_cards, resolve_frame, CardFrame, CardGroup};
pub use geom::Rect;
pub use headless::HeadlessSurface;
pub use ledger::{MetadataLedger, LEDGER_FILE, LEDGER_SCHEMA_VERSION};
pub use pipeline::{plan, ExportPipeline, PipelineError, RunSummary};
pub use plates::{PlateRecord, PxRect, PxSize};
pub use resolution::dpi_for_rect;
pub use surface::{RenderSurface, ScratchShape, SurfaceError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
