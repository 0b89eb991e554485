use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Column – the named fields of a listing
// ---------------------------------------------------------------------------

/// Every column the dashboard knows about, source and derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Price,
    ModelYear,
    Model,
    Condition,
    Cylinders,
    Fuel,
    Odometer,
    Transmission,
    Type,
    PaintColor,
    Is4wd,
    DatePosted,
    DaysListed,
    Manufacturer,
    ListingCategory,
    OdometerCategory,
}

impl Column {
    /// Columns read from the source file, in the order of the public dataset.
    pub const SOURCE: [Column; 13] = [
        Column::Price,
        Column::ModelYear,
        Column::Model,
        Column::Condition,
        Column::Cylinders,
        Column::Fuel,
        Column::Odometer,
        Column::Transmission,
        Column::Type,
        Column::PaintColor,
        Column::Is4wd,
        Column::DatePosted,
        Column::DaysListed,
    ];

    /// Columns the loader refuses to go without.
    pub const REQUIRED: [Column; 6] = [
        Column::Model,
        Column::ModelYear,
        Column::Cylinders,
        Column::Odometer,
        Column::DaysListed,
        Column::Price,
    ];

    /// Columns of the prepared table, as shown in the data viewer.
    pub const PREPARED: [Column; 16] = [
        Column::Price,
        Column::ModelYear,
        Column::Model,
        Column::Condition,
        Column::Cylinders,
        Column::Fuel,
        Column::Odometer,
        Column::Transmission,
        Column::Type,
        Column::PaintColor,
        Column::Is4wd,
        Column::DatePosted,
        Column::DaysListed,
        Column::Manufacturer,
        Column::ListingCategory,
        Column::OdometerCategory,
    ];

    /// Header name, matched case-sensitively against the source file.
    pub fn name(self) -> &'static str {
        match self {
            Column::Price => "price",
            Column::ModelYear => "model_year",
            Column::Model => "model",
            Column::Condition => "condition",
            Column::Cylinders => "cylinders",
            Column::Fuel => "fuel",
            Column::Odometer => "odometer",
            Column::Transmission => "transmission",
            Column::Type => "type",
            Column::PaintColor => "paint_color",
            Column::Is4wd => "is_4wd",
            Column::DatePosted => "date_posted",
            Column::DaysListed => "days_listed",
            Column::Manufacturer => "manufacturer",
            Column::ListingCategory => "listing_category",
            Column::OdometerCategory => "odometer_category",
        }
    }
}

// ---------------------------------------------------------------------------
// Rating – the four-level ordinal bucket
// ---------------------------------------------------------------------------

/// Ordinal bucket shared by `listing_category` and `odometer_category`.
/// Declaration order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rating {
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Good, Rating::Fair, Rating::Poor, Rating::VeryPoor];

    /// Bucket the number of days a listing has been active.
    pub fn from_days_listed(days: u32) -> Self {
        match days {
            0..=30 => Rating::Good,
            31..=60 => Rating::Fair,
            61..=90 => Rating::Poor,
            _ => Rating::VeryPoor,
        }
    }

    /// Bucket an odometer reading in miles. Bands are contiguous so that
    /// fractional medians never fall between two of them.
    pub fn from_odometer(miles: f64) -> Self {
        if miles <= 40_000.0 {
            Rating::Good
        } else if miles <= 70_000.0 {
            Rating::Fair
        } else if miles <= 100_000.0 {
            Rating::Poor
        } else {
            Rating::VeryPoor
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Good => "Good",
            Rating::Fair => "Fair",
            Rating::Poor => "Poor",
            Rating::VeryPoor => "Very Poor",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Listing – one prepared row
// ---------------------------------------------------------------------------

/// A vehicle listing after preparation. `model_year` and `cylinders` are
/// guaranteed present; the odometer may still be missing when no peer in its
/// (model, model_year) group had a reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    /// 1-based data row number in the source file (header excluded).
    pub source_row: usize,
    pub price: f64,
    pub model_year: i32,
    pub model: String,
    pub condition: Option<String>,
    pub cylinders: u32,
    pub fuel: Option<String>,
    pub odometer: Option<f64>,
    pub transmission: Option<String>,
    pub vehicle_type: Option<String>,
    pub paint_color: Option<String>,
    pub is_4wd: bool,
    pub date_posted: Option<String>,
    pub days_listed: u32,
    pub manufacturer: String,
    pub listing_category: Rating,
    pub odometer_category: Option<Rating>,
}

impl Listing {
    /// Render one cell for the tabular view.
    pub fn cell(&self, column: Column) -> String {
        fn text(v: &Option<String>) -> String {
            v.clone().unwrap_or_default()
        }
        match column {
            Column::Price => format!("{}", self.price),
            Column::ModelYear => self.model_year.to_string(),
            Column::Model => self.model.clone(),
            Column::Condition => text(&self.condition),
            Column::Cylinders => self.cylinders.to_string(),
            Column::Fuel => text(&self.fuel),
            Column::Odometer => self.odometer.map(|o| format!("{o}")).unwrap_or_default(),
            Column::Transmission => text(&self.transmission),
            Column::Type => text(&self.vehicle_type),
            Column::PaintColor => text(&self.paint_color),
            Column::Is4wd => u8::from(self.is_4wd).to_string(),
            Column::DatePosted => text(&self.date_posted),
            Column::DaysListed => self.days_listed.to_string(),
            Column::Manufacturer => self.manufacturer.clone(),
            Column::ListingCategory => self.listing_category.to_string(),
            Column::OdometerCategory => self
                .odometer_category
                .map(|r| r.to_string())
                .unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// ListingTable – the prepared, read-only table
// ---------------------------------------------------------------------------

/// The prepared table with pre-computed selector options.
/// Built once by the pipeline and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingTable {
    listings: Vec<Listing>,
    /// Distinct manufacturers in first-appearance order.
    manufacturers: Vec<String>,
    /// Distinct non-missing paint colors in first-appearance order.
    paint_colors: Vec<String>,
    year_bounds: Option<(i32, i32)>,
}

impl ListingTable {
    pub fn from_listings(listings: Vec<Listing>) -> Self {
        let manufacturers = distinct_in_order(listings.iter().map(|l| Some(&l.manufacturer)));
        let paint_colors = distinct_in_order(listings.iter().map(|l| l.paint_color.as_ref()));
        let year_bounds = listings
            .iter()
            .map(|l| l.model_year)
            .fold(None, |acc: Option<(i32, i32)>, y| {
                Some(match acc {
                    None => (y, y),
                    Some((lo, hi)) => (lo.min(y), hi.max(y)),
                })
            });

        ListingTable {
            listings,
            manufacturers,
            paint_colors,
            year_bounds,
        }
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn manufacturers(&self) -> &[String] {
        &self.manufacturers
    }

    pub fn paint_colors(&self) -> &[String] {
        &self.paint_colors
    }

    /// Observed (min, max) `model_year`, or `None` for an empty table.
    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        self.year_bounds
    }

    /// Number of listings.
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

fn distinct_in_order<'a>(values: impl Iterator<Item = Option<&'a String>>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values
        .flatten()
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal listing for tests elsewhere in the crate.
    pub(crate) fn listing(model: &str, year: i32, price: f64) -> Listing {
        let manufacturer = model.split_whitespace().next().unwrap_or(model).to_string();
        Listing {
            source_row: 1,
            price,
            model_year: year,
            model: model.to_string(),
            condition: Some("good".to_string()),
            cylinders: 6,
            fuel: Some("gas".to_string()),
            odometer: Some(50_000.0),
            transmission: Some("automatic".to_string()),
            vehicle_type: Some("sedan".to_string()),
            paint_color: None,
            is_4wd: false,
            date_posted: None,
            days_listed: 10,
            manufacturer,
            listing_category: Rating::Good,
            odometer_category: Some(Rating::Fair),
        }
    }

    #[test]
    fn test_days_listed_boundaries() {
        assert_eq!(Rating::from_days_listed(0), Rating::Good);
        assert_eq!(Rating::from_days_listed(30), Rating::Good);
        assert_eq!(Rating::from_days_listed(31), Rating::Fair);
        assert_eq!(Rating::from_days_listed(60), Rating::Fair);
        assert_eq!(Rating::from_days_listed(61), Rating::Poor);
        assert_eq!(Rating::from_days_listed(90), Rating::Poor);
        assert_eq!(Rating::from_days_listed(91), Rating::VeryPoor);
    }

    #[test]
    fn test_odometer_boundaries() {
        assert_eq!(Rating::from_odometer(40_000.0), Rating::Good);
        assert_eq!(Rating::from_odometer(40_001.0), Rating::Fair);
        assert_eq!(Rating::from_odometer(40_000.5), Rating::Fair);
        assert_eq!(Rating::from_odometer(70_000.0), Rating::Fair);
        assert_eq!(Rating::from_odometer(70_001.0), Rating::Poor);
        assert_eq!(Rating::from_odometer(100_000.0), Rating::Poor);
        assert_eq!(Rating::from_odometer(100_001.0), Rating::VeryPoor);
    }

    #[test]
    fn test_table_indices() {
        let mut red = listing("ford f150", 2015, 1.0);
        red.paint_color = Some("red".to_string());
        let table = ListingTable::from_listings(vec![
            listing("toyota camry", 2011, 1.0),
            red,
            listing("ford focus", 2003, 1.0),
        ]);
        assert_eq!(table.manufacturers(), ["toyota", "ford"]);
        assert_eq!(table.paint_colors(), ["red"]);
        assert_eq!(table.year_bounds(), Some((2003, 2015)));
        assert!(ListingTable::from_listings(Vec::new()).year_bounds().is_none());
    }

    #[test]
    fn test_cell_rendering() {
        let l = listing("ford f150", 2015, 9400.0);
        assert_eq!(l.cell(Column::Price), "9400");
        assert_eq!(l.cell(Column::Manufacturer), "ford");
        assert_eq!(l.cell(Column::PaintColor), "");
        assert_eq!(l.cell(Column::Is4wd), "0");
        assert_eq!(l.cell(Column::ListingCategory), "Good");
    }
}
