use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::filter::SelectionLimits;
use crate::data::pipeline::{CleaningPolicy, PipelineOptions};

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Everything that differed between the two dashboard scripts, plus the data
/// location. Every field has a default so a partial JSON file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_path: PathBuf,
    pub cleaning: CleaningPolicy,
    /// Preferred chart size in logical pixels; capped to the window.
    pub chart_width: f32,
    pub chart_height: f32,
    pub histogram_bins: usize,
    pub manufacturer_max_selections: usize,
    pub paint_color_max_selections: usize,
    /// How many options each multiselect starts with.
    pub default_selections: usize,
    pub show_paint_color_section: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("vehicles_us.csv"),
            cleaning: CleaningPolicy::Targeted,
            chart_width: 1000.0,
            chart_height: 1000.0,
            histogram_bins: 20,
            manufacturer_max_selections: 5,
            paint_color_max_selections: 3,
            default_selections: 2,
            show_paint_color_section: false,
        }
    }
}

impl Config {
    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            cleaning: self.cleaning,
        }
    }

    pub fn selection_limits(&self) -> SelectionLimits {
        SelectionLimits {
            manufacturers: self.manufacturer_max_selections,
            paint_colors: self.paint_color_max_selections,
            defaults: self.default_selections,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"data_path": "listings.parquet", "cleaning": "all-fields", "show_paint_color_section": true}}"#
        )
        .unwrap();

        let cfg = Config::from_file(file.path()).unwrap();
        assert_eq!(cfg.data_path, PathBuf::from("listings.parquet"));
        assert_eq!(cfg.cleaning, CleaningPolicy::AllFields);
        assert!(cfg.show_paint_color_section);
        assert_eq!(cfg.histogram_bins, 20);
        assert_eq!(cfg.selection_limits().manufacturers, 5);
    }

    #[test]
    fn test_bad_config_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config file"));
    }
}
