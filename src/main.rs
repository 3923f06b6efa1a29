// GUI-subsystem binary: no console window is ever allocated on Windows.
// The viewer has no headless mode, so no console re-attachment is needed.
#![windows_subsystem = "windows"]
#![allow(dead_code)] // API surface kept for gallery/scripting growth

mod app;
mod cli;
mod debounce;
mod io;
pub mod logger;
mod lru;
mod picture;
mod probe;
mod settings;
mod tiles;
mod view;
mod viewer;

use app::ViewerApp;
use clap::Parser;
use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    let args = cli::CliArgs::parse();

    // Initialize session log (overwrites previous session log)
    logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("PixelFE"),
        ..Default::default()
    };

    eframe::run_native(
        "PixelFE",
        options,
        Box::new(move |cc| Box::new(ViewerApp::new(cc, args.path))),
    )
}
