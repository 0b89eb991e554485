mod app;
mod chart;
mod color;
mod config;
mod data;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::Result;
use app::VehicleExplorerApp;
use clap::Parser;
use config::Config;
use data::pipeline::CleaningPolicy;
use eframe::egui;
use state::AppState;

/// Interactive dashboard over a used-vehicle listings file.
#[derive(Debug, Parser)]
#[command(name = "vehicle-explorer", version, about)]
struct Args {
    /// Listings file (.csv, .tsv, .json or .parquet)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Which incomplete rows to drop
    #[arg(long, value_enum)]
    cleaning: Option<CleaningPolicy>,

    /// Show the paint-color price comparison
    #[arg(long)]
    paint_colors: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(data) = args.data {
        config.data_path = data;
    }
    if let Some(cleaning) = args.cleaning {
        config.cleaning = cleaning;
    }
    config.show_paint_color_section |= args.paint_colors;

    // The table is prepared once, before any window exists.
    let data_path = config.data_path.clone();
    let mut state = AppState::new(config);
    if let Err(e) = state.load(&data_path) {
        log::error!("{e:#}");
        return Err(e);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([700.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Vehicle Explorer – Used Listings",
        options,
        Box::new(move |_cc| Ok(Box::new(VehicleExplorerApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("running the dashboard: {e}"))
}
