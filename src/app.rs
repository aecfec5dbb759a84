use std::sync::Arc;
use std::time::Duration;

use eframe::egui;

use crate::spec::llm::CompletionModel;
use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct PromptPlotApp {
    pub state: AppState,
}

impl PromptPlotApp {
    pub fn new(model: Arc<dyn CompletionModel>, preview_rows: usize) -> Self {
        Self {
            state: AppState::new(model, preview_rows),
        }
    }
}

impl eframe::App for PromptPlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.poll_pending();
        if self.state.loading {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: request + parsed spec ----
        egui::SidePanel::left("request_panel")
            .default_width(320.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: preview + chart ----
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::preview_table(ui, &self.state);
            ui.separator();
            plot::chart_view(ui, &self.state);
        });
    }
}
