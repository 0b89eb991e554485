use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::chart::{self, Section};
use crate::config::Config;
use crate::data::filter::{FilterParams, YearRange};
use crate::data::model::ListingTable;
use crate::data::pipeline::{self, PrepareReport, Prepared};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: Config,

    /// Prepared table, read-only once loaded.
    pub table: Option<Arc<ListingTable>>,

    /// How the pipeline treated the rows of the current table.
    pub report: Option<PrepareReport>,

    /// File the current table came from.
    pub source: Option<PathBuf>,

    /// The user's current filter selection.
    pub filters: FilterParams,

    /// Page sections for the current filters (cached).
    pub sections: Vec<Section>,

    /// Whether the full prepared table is shown.
    pub show_table: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let filters = FilterParams::for_table(
            &ListingTable::from_listings(Vec::new()),
            config.selection_limits(),
        );
        Self {
            config,
            table: None,
            report: None,
            source: None,
            filters,
            sections: Vec::new(),
            show_table: false,
            status_message: None,
        }
    }

    /// Run the pipeline on `path` and switch to the result.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let prepared = pipeline::prepare(path, &self.config.pipeline_options())
            .with_context(|| format!("preparing {}", path.display()))?;
        self.set_prepared(path.to_path_buf(), prepared);
        Ok(())
    }

    /// Ingest a newly prepared table, reset filters and rebuild the page.
    pub fn set_prepared(&mut self, source: PathBuf, prepared: Prepared) {
        let Prepared { table, report } = prepared;
        self.filters = FilterParams::for_table(&table, self.config.selection_limits());
        self.table = Some(Arc::new(table));
        self.report = Some(report);
        self.source = Some(source);
        self.status_message = None;
        self.refilter();
    }

    /// Recompute every section from the immutable table.
    pub fn refilter(&mut self) {
        self.sections = match &self.table {
            Some(table) => chart::dashboard(table, &self.filters, &self.config),
            None => Vec::new(),
        };
    }

    pub fn set_year_range(&mut self, years: YearRange) {
        let bounds = self.table.as_ref().and_then(|t| t.year_bounds());
        let years = match bounds {
            Some(b) => years.clamped(b),
            None => years,
        };
        if years != self.filters.years {
            self.filters.years = years;
            self.refilter();
        }
    }

    /// Toggle a manufacturer; `false` if the selection is full.
    pub fn toggle_manufacturer(&mut self, name: &str) -> bool {
        let changed = self.filters.manufacturers.toggle(name);
        if changed {
            self.refilter();
        }
        changed
    }

    pub fn clear_manufacturers(&mut self) {
        self.filters.manufacturers.clear();
        self.refilter();
    }

    /// Toggle a paint colour; `false` if the selection is full.
    pub fn toggle_paint_color(&mut self, name: &str) -> bool {
        let changed = self.filters.paint_colors.toggle(name);
        if changed {
            self.refilter();
        }
        changed
    }

    pub fn clear_paint_colors(&mut self) {
        self.filters.paint_colors.clear();
        self.refilter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartKind, Control};
    use crate::data::model::tests::listing;

    fn state() -> AppState {
        let table = ListingTable::from_listings(vec![
            listing("ford f150", 2015, 20_000.0),
            listing("toyota camry", 2008, 6_000.0),
            listing("honda civic", 2012, 8_000.0),
            listing("ford focus", 2003, 2_000.0),
        ]);
        let mut state = AppState::new(Config::default());
        state.set_prepared(
            PathBuf::from("vehicles_us.csv"),
            Prepared {
                table,
                report: PrepareReport::default(),
            },
        );
        state
    }

    fn manufacturer_rows(state: &AppState) -> f64 {
        let section = state
            .sections
            .iter()
            .find(|s| s.control == Some(Control::Manufacturers))
            .unwrap();
        match &section.chart.kind {
            ChartKind::Histogram(h) => h.series.iter().flat_map(|s| s.values.iter()).sum(),
            _ => panic!("expected histogram"),
        }
    }

    #[test]
    fn test_defaults_after_load() {
        let state = state();
        assert_eq!(state.filters.years, YearRange { start: 2003, end: 2015 });
        assert_eq!(state.filters.manufacturers.selected(), ["ford", "toyota"]);
        assert_eq!(state.sections.len(), 8);
        assert_eq!(manufacturer_rows(&state), 3.0);
    }

    #[test]
    fn test_clearing_restores_full_view() {
        let mut state = state();
        let table_before = state.table.clone().unwrap();

        state.clear_manufacturers();
        assert!(state.toggle_manufacturer("honda"));
        assert_eq!(manufacturer_rows(&state), 1.0);

        state.clear_manufacturers();
        assert_eq!(manufacturer_rows(&state), 4.0);
        assert_eq!(state.table.as_deref(), Some(&*table_before));
    }

    #[test]
    fn test_year_range_is_clamped() {
        let mut state = state();
        state.set_year_range(YearRange { start: 1950, end: 2010 });
        assert_eq!(state.filters.years, YearRange { start: 2003, end: 2010 });
    }

    #[test]
    fn test_load_missing_file_keeps_state() {
        let mut state = state();
        let err = state.load(Path::new("/no/such/listings.csv")).unwrap_err();
        assert!(format!("{err:#}").contains("cannot read listings file"));
        assert_eq!(state.table.as_ref().unwrap().len(), 4);
    }
}
