use eframe::egui::Ui;
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::data::model::{Column, ListingTable};

const ROW_HEIGHT: f32 = 18.0;

/// Scrollable view of the whole prepared table, one row per listing.
pub fn listing_table(ui: &mut Ui, table: &ListingTable) {
    ui.push_id("listing_table", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .max_scroll_height(400.0)
            .columns(TableColumn::auto().at_least(60.0), Column::PREPARED.len())
            .header(20.0, |mut header| {
                for col in Column::PREPARED {
                    header.col(|ui| {
                        ui.strong(col.name());
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, table.len(), |mut row| {
                    let listing = &table.listings()[row.index()];
                    for col in Column::PREPARED {
                        row.col(|ui| {
                            ui.label(listing.cell(col));
                        });
                    }
                });
            });
    });
}
