//! objects-inventory - publishes rendered Figma frames to Confluence.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use objects_inventory::{config::Config, inventory::Publisher};

/// Renders Figma frames for every object schema and publishes them, with a
/// generated page body, to the object's Confluence page.
#[derive(Parser)]
#[command(name = "objects-inventory", version, about)]
struct Args {
    /// Directory containing the object schema JSON files.
    #[arg(long, default_value = "schemas")]
    schemas_dir: PathBuf,

    /// Directory containing the Confluence HTML templates.
    #[arg(long, default_value = "confluence-templates")]
    templates_dir: PathBuf,

    /// Output directory for rendered images and page dumps.
    #[arg(long, default_value = "build")]
    build_dir: PathBuf,

    /// Credentials file (defaults to ~/.objects-inventory-config.json).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let publisher = Publisher::new(
        &config,
        args.schemas_dir,
        args.templates_dir,
        args.build_dir,
    )?;
    publisher.run()
}
