use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::{MultiSelect, YearRange};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// What the user did to a multiselect this frame.
enum SelectAction {
    Toggle(String),
    Clear,
}

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(bounds) = state.table.as_ref().and_then(|t| t.year_bounds()) else {
        ui.label("No listings loaded.");
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.checkbox(&mut state.show_table, "Show Data Table");
            ui.separator();

            // ---- Year range ----
            ui.strong("Select model year range");
            let YearRange { mut start, mut end } = state.filters.years;
            let (lo, hi) = bounds;
            let from = ui.add(egui::Slider::new(&mut start, lo..=hi).text("from"));
            let to = ui.add(egui::Slider::new(&mut end, lo..=hi).text("to"));
            if from.changed() || to.changed() {
                // Dragging one end past the other moves both.
                if from.changed() && start > end {
                    end = start;
                }
                if to.changed() && end < start {
                    start = end;
                }
                state.set_year_range(YearRange { start, end });
            }
            ui.separator();

            // ---- Multiselects ----
            let manufacturers = state.filters.manufacturers.clone();
            match multiselect(ui, "manufacturers", "Manufacturers", &manufacturers) {
                Some(SelectAction::Toggle(name)) => {
                    state.toggle_manufacturer(&name);
                }
                Some(SelectAction::Clear) => state.clear_manufacturers(),
                None => {}
            }

            if state.config.show_paint_color_section {
                let colors = state.filters.paint_colors.clone();
                match multiselect(ui, "paint_colors", "Paint colors", &colors) {
                    Some(SelectAction::Toggle(name)) => {
                        state.toggle_paint_color(&name);
                    }
                    Some(SelectAction::Clear) => state.clear_paint_colors(),
                    None => {}
                }
            }
        });
}

/// Collapsible checkbox list with a selection cap. Unselected options are
/// disabled once the cap is reached.
fn multiselect(ui: &mut Ui, id: &str, title: &str, selection: &MultiSelect) -> Option<SelectAction> {
    let header = format!(
        "{title}  ({}/{} selected, max {})",
        selection.selected().len(),
        selection.options().len(),
        selection.max()
    );
    let mut action = None;

    egui::CollapsingHeader::new(RichText::new(header).strong())
        .id_salt(id)
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            if ui.small_button("Clear").clicked() {
                action = Some(SelectAction::Clear);
            }
            for option in selection.options() {
                let mut checked = selection.is_selected(option);
                let enabled = checked || !selection.is_full();
                if ui
                    .add_enabled(enabled, egui::Checkbox::new(&mut checked, option.as_str()))
                    .changed()
                {
                    action = Some(SelectAction::Toggle(option.clone()));
                }
            }
        });

    action
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

        if let (Some(table), Some(report)) = (&state.table, &state.report) {
            let source = state
                .source
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ui.label(format!(
                "{source}: {} listings, {} rows dropped",
                table.len(),
                report.dropped()
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
        .set_title("Open vehicle listings")
        .add_filter("Supported files", &["csv", "tsv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv", "tsv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        if let Err(e) = state.load(&path) {
            log::error!("Failed to load file: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
