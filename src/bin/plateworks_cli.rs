//! PlateWorks CLI - Bridge Interface For Job Runners
//!
//! Commands: classify, plan, export
//! Outputs JSON to stdout
//! Returns non-zero on failure

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use plateworks_core::{
    classify_finish, parse_identity, pipeline, DocumentSnapshot, EmptyFinishPolicy, ExportConfig,
    ExportPipeline, HeadlessSurface,
};

#[derive(Parser)]
#[command(name = "plateworks-cli")]
#[command(about = "PlateWorks CLI - Card Plate Extraction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a single layer name
    Classify {
        /// Layer name, e.g. front_layer_0_print
        #[arg(short, long)]
        name: String,
    },

    /// Dry-run: compute frames and export rects without rendering
    Plan {
        /// Path to a document snapshot (JSON)
        #[arg(short, long)]
        document: PathBuf,

        /// Target rasterization DPI
        #[arg(long, default_value_t = 600)]
        dpi: u32,

        /// Maximum pixel dimension per raster
        #[arg(long, default_value_t = 8192)]
        max_px: u32,
    },

    /// Run the full export against the built-in headless surface
    Export {
        /// Path to a document snapshot (JSON)
        #[arg(short, long)]
        document: PathBuf,

        /// Destination folder
        #[arg(short, long)]
        out: PathBuf,

        /// Target rasterization DPI
        #[arg(long, default_value_t = 600)]
        dpi: u32,

        /// Maximum pixel dimension per raster
        #[arg(long, default_value_t = 8192)]
        max_px: u32,

        /// Fail when a finish layer has no content on the card
        #[arg(long)]
        strict_finish: bool,
    },
}

fn load_document(path: &PathBuf) -> Result<DocumentSnapshot, ExitCode> {
    DocumentSnapshot::load_from_file(path).map_err(|e| {
        eprintln!(r#"{{"error": "Failed to load document: {e}"}}"#);
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { name } => {
            let output = serde_json::json!({
                "name": name,
                "identity": parse_identity(&name),
                "type": classify_finish(&name),
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
            ExitCode::SUCCESS
        }

        Commands::Plan {
            document,
            dpi,
            max_px,
        } => {
            let doc = match load_document(&document) {
                Ok(d) => d,
                Err(code) => return code,
            };
            let config = ExportConfig {
                target_dpi: dpi,
                max_px,
                out_dir: PathBuf::new(),
                empty_finish_policy: EmptyFinishPolicy::Fallback,
            };

            let planned = pipeline::plan(&doc, &config);
            println!("{}", serde_json::to_string_pretty(&planned).unwrap());
            ExitCode::SUCCESS
        }

        Commands::Export {
            document,
            out,
            dpi,
            max_px,
            strict_finish,
        } => {
            let doc = match load_document(&document) {
                Ok(d) => d,
                Err(code) => return code,
            };
            let config = ExportConfig {
                target_dpi: dpi,
                max_px,
                out_dir: out,
                empty_finish_policy: if strict_finish {
                    EmptyFinishPolicy::Error
                } else {
                    EmptyFinishPolicy::Fallback
                },
            };

            let surface = HeadlessSurface::new(doc.clone());
            let mut pipeline = ExportPipeline::new(surface, config);

            match pipeline.run(&doc) {
                Ok(summary) => {
                    let output = serde_json::json!({
                        "success": true,
                        "ledger": summary.ledger_path,
                        "plates": summary.ledger.plates.len(),
                        "ledgerHash": summary.ledger.ledger_hash,
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    ExitCode::from(2)
                }
            }
        }
    }
}
