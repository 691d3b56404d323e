#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use eframe::egui;
use egui::IconData;
use ping_logger::PingLoggerApp;

fn main() -> eframe::Result {
    env_logger::init();

    let app = PingLoggerApp::new();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([820.0, 520.0])
            .with_resizable(false)
            .with_icon(IconData::default()),
        ..Default::default()
    };
    eframe::run_native(
        "Ping Logger",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
}
