use super::model::{Listing, ListingTable};

// ---------------------------------------------------------------------------
// Filter parameters: the only state the dashboard owns
// ---------------------------------------------------------------------------

/// Closed interval over `model_year`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }

    /// Clamp both ends into `bounds` and keep `start <= end`.
    pub fn clamped(self, (lo, hi): (i32, i32)) -> Self {
        let start = self.start.clamp(lo, hi);
        let end = self.end.clamp(lo, hi).max(start);
        YearRange { start, end }
    }
}

/// A bounded multi-value selection over a fixed list of options.
///
/// An empty selection places no constraint on the rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSelect {
    options: Vec<String>,
    /// In the order the user picked them.
    selected: Vec<String>,
    max: usize,
}

impl MultiSelect {
    /// Pre-select the first `defaults` options (never more than `max`).
    pub fn new(options: Vec<String>, max: usize, defaults: usize) -> Self {
        let selected = options.iter().take(defaults.min(max)).cloned().collect();
        MultiSelect {
            options,
            selected,
            max,
        }
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn is_selected(&self, value: &str) -> bool {
        self.selected.iter().any(|s| s == value)
    }

    pub fn is_full(&self) -> bool {
        self.selected.len() >= self.max
    }

    /// Flip one option. Returns `false` when the option is unknown or the
    /// selection is already at its maximum.
    pub fn toggle(&mut self, value: &str) -> bool {
        if let Some(pos) = self.selected.iter().position(|s| s == value) {
            self.selected.remove(pos);
            return true;
        }
        if self.is_full() || !self.options.iter().any(|o| o == value) {
            return false;
        }
        self.selected.push(value.to_string());
        true
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Whether a row value passes this selection.
    pub fn admits(&self, value: Option<&str>) -> bool {
        self.selected.is_empty() || value.is_some_and(|v| self.is_selected(v))
    }
}

/// Everything the user can change on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterParams {
    pub years: YearRange,
    pub manufacturers: MultiSelect,
    pub paint_colors: MultiSelect,
}

/// Selection limits for the two multiselects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLimits {
    pub manufacturers: usize,
    pub paint_colors: usize,
    pub defaults: usize,
}

impl FilterParams {
    /// Defaults: the full observed year range and the first few options of
    /// each multiselect.
    pub fn for_table(table: &ListingTable, limits: SelectionLimits) -> Self {
        let (start, end) = table.year_bounds().unwrap_or((0, 0));
        FilterParams {
            years: YearRange { start, end },
            manufacturers: MultiSelect::new(
                table.manufacturers().to_vec(),
                limits.manufacturers,
                limits.defaults,
            ),
            paint_colors: MultiSelect::new(
                table.paint_colors().to_vec(),
                limits.paint_colors,
                limits.defaults,
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Filtered views
// ---------------------------------------------------------------------------

/// Return indices of listings matching `keep`. The table is never touched.
pub fn filtered_indices(table: &ListingTable, keep: impl Fn(&Listing) -> bool) -> Vec<usize> {
    table
        .listings()
        .iter()
        .enumerate()
        .filter(|(_, l)| keep(l))
        .map(|(i, _)| i)
        .collect()
}

pub fn by_year(table: &ListingTable, years: &YearRange) -> Vec<usize> {
    filtered_indices(table, |l| years.contains(l.model_year))
}

pub fn by_manufacturer(table: &ListingTable, selection: &MultiSelect) -> Vec<usize> {
    filtered_indices(table, |l| selection.admits(Some(&l.manufacturer)))
}

pub fn by_paint_color(table: &ListingTable, selection: &MultiSelect) -> Vec<usize> {
    filtered_indices(table, |l| selection.admits(l.paint_color.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::listing;

    fn table() -> ListingTable {
        let mut rows = vec![
            listing("ford f150", 2015, 20_000.0),
            listing("toyota camry", 2008, 6_000.0),
            listing("honda civic", 2012, 8_000.0),
            listing("ford focus", 2003, 2_000.0),
        ];
        rows[0].paint_color = Some("red".to_string());
        rows[2].paint_color = Some("blue".to_string());
        ListingTable::from_listings(rows)
    }

    const LIMITS: SelectionLimits = SelectionLimits {
        manufacturers: 5,
        paint_colors: 3,
        defaults: 2,
    };

    #[test]
    fn test_defaults() {
        let t = table();
        let params = FilterParams::for_table(&t, LIMITS);
        assert_eq!(params.years, YearRange { start: 2003, end: 2015 });
        assert_eq!(params.manufacturers.selected(), ["ford", "toyota"]);
        assert_eq!(params.paint_colors.selected(), ["red", "blue"]);
        assert_eq!(by_year(&t, &params.years), [0, 1, 2, 3]);
    }

    #[test]
    fn test_year_range_is_closed() {
        let t = table();
        assert_eq!(by_year(&t, &YearRange { start: 2008, end: 2012 }), [1, 2]);
        assert_eq!(
            YearRange { start: 1990, end: 2030 }.clamped((2003, 2015)),
            YearRange { start: 2003, end: 2015 }
        );
        assert_eq!(
            YearRange { start: 2014, end: 2004 }.clamped((2003, 2015)),
            YearRange { start: 2014, end: 2014 }
        );
    }

    #[test]
    fn test_manufacturer_filter_and_clear() {
        let t = table();
        let before = t.clone();
        let mut sel = MultiSelect::new(t.manufacturers().to_vec(), 5, 0);
        assert!(sel.toggle("ford"));
        assert_eq!(by_manufacturer(&t, &sel), [0, 3]);

        sel.clear();
        let all = by_manufacturer(&t, &sel);
        assert_eq!(all, (0..t.len()).collect::<Vec<_>>());
        assert_eq!(t, before);
    }

    #[test]
    fn test_max_selections() {
        let mut sel = MultiSelect::new(
            ["red", "blue", "green", "white"].map(String::from).to_vec(),
            3,
            2,
        );
        assert!(sel.toggle("green"));
        assert!(sel.is_full());
        assert!(!sel.toggle("white"));
        assert!(!sel.toggle("purple"));
        assert!(sel.toggle("red"));
        assert_eq!(sel.selected(), ["blue", "green"]);
    }

    #[test]
    fn test_paint_color_filter_skips_missing() {
        let t = table();
        let mut sel = MultiSelect::new(t.paint_colors().to_vec(), 3, 0);
        assert_eq!(by_paint_color(&t, &sel).len(), 4);
        sel.toggle("blue");
        assert_eq!(by_paint_color(&t, &sel), [2]);
    }
}
