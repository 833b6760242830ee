//! Export Pipeline - Single Entry Point
//!
//! Strictly sequential: one document, one surface, card-index -> side
//! -> layer. The scratch canvas is acquired lazily by the outline
//! extractor and released exactly once here, on every exit path.

use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

use crate::classify::{FinishType, Side};
use crate::config::ExportConfig;
use crate::document::DocumentSnapshot;
use crate::frame::{classify_document, group_cards, resolve_frame};
use crate::geom::Rect;
use crate::ledger::{LedgerError, MetadataLedger};
use crate::outline::extract_outline;
use crate::plates::{
    export_plate, plan_export_rect, px_size, rect_to_card_px, PlateRecord, PxRect, PxSize,
};
use crate::surface::{RenderSurface, SurfaceError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("export failure: {0}")]
    Export(#[from] SurfaceError),

    #[error("finish layer {layer} has no content inside its card frame")]
    EmptyFinishIntersection { layer: String },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct RunSummary {
    pub ledger: MetadataLedger,
    pub ledger_path: PathBuf,
}

/// One planned export, before any surface call. The CLI `plan`
/// command serializes these for a dry run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedPlate {
    pub card_index: u32,
    pub side: Side,
    pub layer: String,
    #[serde(rename = "type")]
    pub finish: FinishType,
    pub export_rect: Rect,
    pub rect_px: PxRect,
    pub card_px: PxSize,
    pub dpi_used: u32,
    pub cropped: bool,
    pub empty_intersection: bool,
}

/// Computes every export rectangle and placement without touching a
/// render surface.
pub fn plan(doc: &DocumentSnapshot, config: &ExportConfig) -> Vec<PlannedPlate> {
    let groups = group_cards(classify_document(doc));
    let mut out = Vec::new();
    for (&card_index, group) in &groups {
        let frame = resolve_frame(doc, card_index, group, config);
        for side in Side::BOTH {
            for cl in group.side_layers(side) {
                let layer = doc.layer(cl.layer_idx);
                let Some(planned) = plan_export_rect(doc, layer, cl.finish, &frame, side) else {
                    continue;
                };
                let side_rect = frame.side_rect(side);
                out.push(PlannedPlate {
                    card_index,
                    side,
                    layer: layer.name.clone(),
                    finish: cl.finish,
                    export_rect: planned.rect,
                    rect_px: rect_to_card_px(side_rect, &planned.rect, frame.dpi_used),
                    card_px: px_size(side_rect.width(), side_rect.height(), frame.dpi_used),
                    dpi_used: frame.dpi_used,
                    cropped: planned.cropped,
                    empty_intersection: planned.empty_intersection,
                });
            }
        }
    }
    out
}

/// The export pipeline. `run` is the only entry point; it owns the
/// whole card-index -> side -> layer traversal and the ledger write.
pub struct ExportPipeline<S> {
    surface: S,
    config: ExportConfig,
}

impl<S: RenderSurface> ExportPipeline<S> {
    pub fn new(surface: S, config: ExportConfig) -> Self {
        Self { surface, config }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Runs the full export. Either every plate, outline and the
    /// ledger land in the destination folder, or the run fails and no
    /// new ledger exists.
    pub fn run(&mut self, doc: &DocumentSnapshot) -> Result<RunSummary, PipelineError> {
        self.check_destination()?;

        let mut scratch_used = false;
        let result = self.run_inner(doc, &mut scratch_used);

        // Scratch released exactly once, on every exit path.
        if scratch_used {
            match self.surface.scratch_teardown() {
                Ok(()) => {}
                Err(e) if result.is_ok() => return Err(e.into()),
                Err(e) => warn!("scratch teardown failed after run error: {e}"),
            }
        }
        result
    }

    fn check_destination(&self) -> Result<(), PipelineError> {
        let out = &self.config.out_dir;
        if out.as_os_str().is_empty() {
            return Err(PipelineError::Configuration(
                "output directory not set".into(),
            ));
        }
        fs::create_dir_all(out).map_err(|e| {
            PipelineError::Configuration(format!(
                "cannot create output directory {}: {e}",
                out.display()
            ))
        })?;

        let probe = out.join(".plateworks_probe");
        fs::write(&probe, b"")
            .and_then(|_| fs::remove_file(&probe))
            .map_err(|e| {
                PipelineError::Configuration(format!(
                    "output directory {} is not writable: {e}",
                    out.display()
                ))
            })
    }

    fn run_inner(
        &mut self,
        doc: &DocumentSnapshot,
        scratch_used: &mut bool,
    ) -> Result<RunSummary, PipelineError> {
        let classified = classify_document(doc);
        if classified.is_empty() {
            warn!("no production layers matched; the ledger will be empty");
        }
        let groups = group_cards(classified);

        let mut plates: Vec<PlateRecord> = Vec::new();
        for (&card_index, group) in &groups {
            let frame = resolve_frame(doc, card_index, group, &self.config);
            info!(
                "card {card_index}: {:.1}x{:.1}pt at {}dpi",
                frame.width, frame.height, frame.dpi_used
            );

            for side in Side::BOTH {
                for cl in group.side_layers(side) {
                    let Some(record) =
                        export_plate(doc, &mut self.surface, &frame, cl, &self.config)?
                    else {
                        continue;
                    };

                    let record = if cl.finish == FinishType::Diecut {
                        match extract_outline(
                            doc,
                            &mut self.surface,
                            &frame,
                            side,
                            cl.layer_idx,
                            &record,
                            &self.config,
                            scratch_used,
                        )? {
                            Some(vector) => record.with_vector_file(vector),
                            None => record,
                        }
                    } else {
                        record
                    };

                    plates.push(record);
                }
            }
        }

        let ledger = MetadataLedger::assemble(plates, &self.config)?;
        let ledger_path = ledger.write_atomic(&self.config.out_dir)?;
        info!(
            "run complete: {} plate(s), ledger at {}",
            ledger.plates.len(),
            ledger_path.display()
        );
        Ok(RunSummary {
            ledger,
            ledger_path,
        })
    }
}
