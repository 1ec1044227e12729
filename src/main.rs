// main.rs
/// rsync-gui: pick two directories and mirror one into the other with rsync
use eframe::egui;
use log::{info, warn};

mod app;
mod config;
mod logging;
mod picker;
mod transfer;
mod types;

use app::RsyncApp;
use config::Settings;

fn main() -> Result<(), eframe::Error> {
    let config_path = config::config_path();
    let (settings, config_error) = match Settings::load(&config_path) {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };

    if let Err(e) = logging::init(&settings.log_file) {
        eprintln!("Failed to open log file {}: {}", settings.log_file.display(), e);
    }
    if let Some(e) = config_error {
        warn!("{}; using default settings", e);
    }
    info!("Application started");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([settings.window_width, settings.window_height])
            .with_min_inner_size([400.0, 200.0])
            .with_title("Rsync GUI"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Rsync GUI",
        options,
        Box::new(move |cc| Ok(Box::new(RsyncApp::new(cc, settings)?))),
    );

    info!("Application closed");
    result
}
