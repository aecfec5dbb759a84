use eframe::egui::{self, Color32, Key, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – request, parsed spec, errors
// ---------------------------------------------------------------------------

/// Render the request panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Describe your chart");
    ui.separator();

    if state.dataset.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    let response = ui.add(
        egui::TextEdit::multiline(&mut state.request)
            .hint_text("e.g. bar chart of matches per city between 2020 and 2024")
            .desired_rows(4)
            .desired_width(f32::INFINITY),
    );
    let ctrl_enter =
        response.has_focus() && ui.input(|i| i.key_pressed(Key::Enter) && i.modifiers.command);

    ui.horizontal(|ui: &mut Ui| {
        let generate = ui.add_enabled(state.can_submit(), egui::Button::new("Generate"));
        if generate.clicked() || ctrl_enter {
            state.submit_request();
        }
        if state.loading {
            ui.spinner();
            ui.label("Asking the model…");
        }
    });
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if let Some(request) = &state.last_request {
                ui.strong("Request");
                ui.label(RichText::new(request).italics());
                ui.add_space(6.0);
            }

            if let Some(error) = &state.chart_error {
                ui.label(RichText::new(error).color(Color32::RED));
                ui.add_space(6.0);
            }

            if let Some(json) = state.spec_json() {
                egui::CollapsingHeader::new(RichText::new("Parsed spec").strong())
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        ui.label(RichText::new(json).monospace());
                    });
            }
        });
}

// ---------------------------------------------------------------------------
// Data preview
// ---------------------------------------------------------------------------

/// First rows of the loaded dataset.
pub fn preview_table(ui: &mut Ui, state: &AppState) {
    let Some(dataset) = &state.dataset else {
        return;
    };
    let head = dataset.head(state.preview_rows);

    ui.strong(format!("Preview ({} of {} rows)", head.len(), dataset.len()));
    ui.push_id("preview_table", |ui: &mut Ui| {
        ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .vscroll(false)
                .columns(Column::auto().at_least(60.0).resizable(true), head.columns.len())
                .header(20.0, |mut header| {
                    for col in &head.columns {
                        header.col(|ui: &mut Ui| {
                            ui.strong(col);
                        });
                    }
                })
                .body(|mut body| {
                    for values in &head.rows {
                        body.row(18.0, |mut row| {
                            for value in values {
                                row.col(|ui: &mut Ui| {
                                    ui.label(value.to_string());
                                });
                            }
                        });
                    }
                });
        });
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} rows × {} columns loaded",
                ds.len(),
                ds.columns.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open dataset")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    let Some(path) = file else {
        return;
    };
    match crate::data::loader::load_file(&path) {
        Ok(dataset) => {
            log::info!(
                "Loaded {} rows from {} with columns {:?}",
                dataset.len(),
                path.display(),
                dataset.columns
            );
            state.set_dataset(dataset);
        }
        Err(e) => {
            log::error!("Failed to load file: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
