mod app;
mod chart;
mod color;
mod config;
mod data;
mod pipeline;
mod spec;
mod state;
mod ui;

use std::sync::Arc;

use app::PromptPlotApp;
use config::Config;
use eframe::egui;
use spec::llm::GeminiClient;

fn main() -> eframe::Result {
    env_logger::init();

    let config = match Config::new() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };
    if config.api_key.is_none() {
        log::warn!("GEMINI_API_KEY is not set; chart requests will fail until it is");
    }

    let model = Arc::new(GeminiClient::new(&config));
    let preview_rows = config.preview_rows;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([700.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Prompt Plot – Chart Assistant",
        options,
        Box::new(move |_cc| Ok(Box::new(PromptPlotApp::new(model, preview_rows)))),
    )
}
