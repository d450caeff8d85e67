use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use ospi_scores::data::filter::{Grade, Subject};
use ospi_scores::data::loader::Year;

use crate::color::Side;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – query widgets
// ---------------------------------------------------------------------------

/// Render the left query panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Compare");
    ui.separator();

    let Some(dataset) = &state.dataset else {
        ui.label("No report loaded.");
        return;
    };

    // Clone what we need so we can mutate state inside the loop.
    let groups: Vec<String> = dataset.student_groups.iter().cloned().collect();
    let value_columns = dataset.numeric_columns.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new("query_grid").num_columns(2).show(ui, |ui: &mut Ui| {
                ui.strong("Grade");
                egui::ComboBox::from_id_salt("grade")
                    .selected_text(state.grade.label())
                    .show_ui(ui, |ui: &mut Ui| {
                        for g in Grade::ALL {
                            ui.selectable_value(&mut state.grade, g, g.label());
                        }
                    });
                ui.end_row();

                ui.strong("Subject");
                egui::ComboBox::from_id_salt("subject")
                    .selected_text(state.subject.keyword())
                    .show_ui(ui, |ui: &mut Ui| {
                        for s in Subject::ALL {
                            let text = format!("{} ({})", s.keyword(), s.label());
                            ui.selectable_value(&mut state.subject, s, text);
                        }
                    });
                ui.end_row();

                ui.strong("Value");
                let current = state.value_column.clone().unwrap_or_default();
                egui::ComboBox::from_id_salt("value_column")
                    .selected_text(&current)
                    .show_ui(ui, |ui: &mut Ui| {
                        for col in &value_columns {
                            if ui.selectable_label(current == *col, col).clicked() {
                                state.value_column = Some(col.clone());
                            }
                        }
                    });
                ui.end_row();
            });
            ui.separator();

            let header = format!("Student groups  ({}/{})", state.groups.len(), groups.len());
            egui::CollapsingHeader::new(RichText::new(header).strong())
                .id_salt("groups")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    for group in &groups {
                        let mut checked = state.groups.contains(group);
                        if ui.checkbox(&mut checked, group).changed() {
                            state.toggle_group(group);
                        }
                    }
                });
            ui.separator();

            if ui.button("Compare").clicked() {
                state.run_comparison();
            }

            if let Some(cmp) = &state.comparison {
                ui.add_space(6.0);
                ui.label(format!("{} schools plotted", cmp.len()));
                for side in Side::ALL {
                    let color = state.chart.colors().color_for(side);
                    ui.label(
                        RichText::new(format!("{}: {}", side.label(), state.chart.count(side)))
                            .color(color),
                    );
                }
            }
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
            ui.menu_button("Download OSPI report", |ui: &mut Ui| {
                let idle = !state.is_downloading();
                for year in Year::ALL {
                    if ui
                        .add_enabled(idle, egui::Button::new(year.to_string()))
                        .clicked()
                    {
                        state.load_year(year);
                        ui.close_menu();
                    }
                }
            });
            ui.separator();
            let can_export = state.comparison.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export comparison…"))
                .clicked()
            {
                save_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(ds), Some(source)) = (&state.dataset, &state.source) {
            ui.label(format!("{source}: {} rows", ds.len()));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open assessment report")
        .add_filter("Supported files", &["txt", "tsv", "csv", "parquet", "pq"])
        .add_filter("Tab-separated", &["txt", "tsv"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_path(&path);
    }
}

pub fn save_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export comparison")
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet"])
        .set_file_name("comparison.csv")
        .save_file();

    if let Some(path) = file {
        state.export(&path);
    }
}
