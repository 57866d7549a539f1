//! Anchorview CLI - Authoring-side tools
//!
//! `inspect` reports how the placement engine will normalise a glTF asset;
//! `bundle` lays out a static menu bundle from an exported item list.

mod bundle;
mod config;
mod inspect;

use anchorview_core::ModelConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "anchorview")]
#[command(about = "Anchorview authoring tools")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "anchorview.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); defaults to the config file's
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print bounds, base transform and final placement of a glTF/GLB asset
    Inspect {
        /// Model file (.gltf or .glb)
        model: PathBuf,

        /// Author placement override as a JSON file
        #[arg(long)]
        model_config: Option<PathBuf>,
    },

    /// Write a static bundle directory from a menu export
    Bundle {
        /// Menu JSON: an item array or {"title", "items"}
        #[arg(short, long)]
        menu: PathBuf,

        /// Output directory (overrides config)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Menu title (overrides menu file and config)
        #[arg(long)]
        title: Option<String>,

        /// Directory local asset paths are resolved against (defaults to the menu file's)
        #[arg(long)]
        source: Option<PathBuf>,
    },
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = config::Config::load(&args.config)?;

    // Initialize logging
    let level = parse_level(args.log_level.as_deref().unwrap_or(&config.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Inspect { model, model_config } => {
            let model_config = match model_config {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read model config: {}", path.display()))?;
                    Some(ModelConfig::from_json(&json).context("Invalid model config")?)
                }
                None => None,
            };

            let report = inspect::inspect(&model, model_config.as_ref())?;
            let size = report.volume.size();
            println!("{}", model.display());
            println!("  primitives:    {}", report.primitives);
            println!("  bounds min:    {:?}", report.volume.min.to_array());
            println!("  bounds max:    {:?}", report.volume.max.to_array());
            println!("  size:          {:?}", size.to_array());
            println!("  base scale:    {}", report.base.scale);
            println!("  center offset: {:?}", report.base.center_offset.to_array());
            println!("  final scale:   {}", report.placement.scale);
            println!("  position:      {:?}", report.placement.position.to_array());
            println!("  rotation:      {:?}", report.placement.rotation.to_array());
        }
        Command::Bundle { menu, out, title, source } => {
            let menu_file = bundle::MenuFile::load(&menu)?;
            let out = out.unwrap_or(config.bundle.output_dir);
            let title = title
                .or_else(|| menu_file.title().map(str::to_string))
                .unwrap_or(config.bundle.title);
            let source = source
                .or_else(|| menu.parent().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("."));

            let manifest = bundle::write_bundle(&menu_file, &out, &source, &title)?;
            info!(
                out = %out.display(),
                items = manifest.items.len(),
                ar_ready = manifest.ar_ready_count(),
                "Bundle written"
            );
            for item in &manifest.items {
                let state = if item.has_ar_data() { "AR" } else { "no AR" };
                println!("{:<24} {}", item.id, state);
            }
        }
    }

    Ok(())
}
