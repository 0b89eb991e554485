use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{MalformedRecord, PipelineError};
use super::loader::{LoadedListings, RawListing, load_listings};
use super::model::{Column, Listing, ListingTable, Rating};
use super::stats::median;

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

/// Which rows the final step throws away.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum CleaningPolicy {
    /// Drop rows missing `model_year` or the imputed cylinder count.
    #[default]
    Targeted,
    /// Additionally drop rows missing any other value the file carries.
    AllFields,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub cleaning: CleaningPolicy,
}

/// What happened to the rows on their way through the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrepareReport {
    pub rows_read: usize,
    /// Rejected rows with their 1-based source row number.
    pub malformed: Vec<(usize, MalformedRecord)>,
    /// Rows removed by the final completeness check.
    pub dropped_incomplete: usize,
    pub imputed_cylinders: usize,
    pub imputed_odometer: usize,
    /// Kept rows whose odometer could not be imputed.
    pub missing_odometer: usize,
}

impl PrepareReport {
    pub fn dropped(&self) -> usize {
        self.malformed.len() + self.dropped_incomplete
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    pub table: ListingTable,
    pub report: PrepareReport,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a listings file and turn it into the prepared table.
///
/// Load-time problems (missing file, missing column, untyped cell) are fatal.
/// Bad rows are dropped and reported instead.
pub fn prepare(path: &Path, options: &PipelineOptions) -> Result<Prepared, PipelineError> {
    let loaded = load_listings(path)?;
    let prepared = prepare_loaded(loaded, options);

    let r = &prepared.report;
    log::info!(
        "Prepared {} listings from {} ({} read, {} malformed, {} incomplete, \
         {} cylinders and {} odometer values imputed, {} odometer values still missing)",
        prepared.table.len(),
        path.display(),
        r.rows_read,
        r.malformed.len(),
        r.dropped_incomplete,
        r.imputed_cylinders,
        r.imputed_odometer,
        r.missing_odometer,
    );
    if prepared.table.is_empty() {
        log::warn!("No listings left in {} after preparation", path.display());
    }
    Ok(prepared)
}

/// Run every preparation step over rows that are already loaded.
/// Output keeps source row order.
pub fn prepare_loaded(loaded: LoadedListings, options: &PipelineOptions) -> Prepared {
    let LoadedListings { columns, rows } = loaded;
    let mut report = PrepareReport {
        rows_read: rows.len(),
        ..Default::default()
    };

    // Manufacturer, row validation and listing category.
    let mut staged = Vec::with_capacity(rows.len());
    for raw in rows {
        let source_row = raw.source_row;
        match Staged::new(raw) {
            Ok(s) => staged.push(s),
            Err(reason) => {
                log::warn!("Dropping row {source_row}: {reason}");
                report.malformed.push((source_row, reason));
            }
        }
    }

    // Peer-group imputation.
    let fills = peer_medians(&staged);

    let mut listings = Vec::with_capacity(staged.len());
    for (s, fill) in staged.into_iter().zip(fills) {
        let cylinders = s.raw.cylinders.or(fill.cylinders).map(f64::ceil);
        let odometer = s.raw.odometer.or(fill.odometer);
        if s.raw.cylinders.is_none() && cylinders.is_some() {
            report.imputed_cylinders += 1;
        }
        if s.raw.odometer.is_none() && odometer.is_some() {
            report.imputed_odometer += 1;
        }

        match s.finish(cylinders, odometer, &columns, options.cleaning) {
            Some(listing) => {
                if listing.odometer.is_none() {
                    report.missing_odometer += 1;
                }
                listings.push(listing);
            }
            None => report.dropped_incomplete += 1,
        }
    }

    Prepared {
        table: ListingTable::from_listings(listings),
        report,
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// A validated row waiting for imputation.
struct Staged {
    raw: RawListing,
    model: String,
    manufacturer: String,
    price: f64,
    days_listed: u32,
    listing_category: Rating,
}

impl Staged {
    fn new(mut raw: RawListing) -> Result<Self, MalformedRecord> {
        let model = raw.model.take().unwrap_or_default();
        let manufacturer = model
            .split_whitespace()
            .next()
            .ok_or(MalformedRecord::EmptyModel)?
            .to_string();

        let days = raw.days_listed.ok_or(MalformedRecord::MissingValue {
            column: Column::DaysListed.name(),
        })?;
        if days < 0 {
            return Err(MalformedRecord::NegativeValue {
                column: Column::DaysListed.name(),
                value: days as f64,
            });
        }
        let days_listed = u32::try_from(days).unwrap_or(u32::MAX);

        let price = raw.price.ok_or(MalformedRecord::MissingValue {
            column: Column::Price.name(),
        })?;
        non_negative(Column::Price, price)?;
        if let Some(odometer) = raw.odometer {
            non_negative(Column::Odometer, odometer)?;
        }
        if let Some(cylinders) = raw.cylinders {
            non_negative(Column::Cylinders, cylinders)?;
        }

        Ok(Staged {
            raw,
            model,
            manufacturer,
            price,
            days_listed,
            listing_category: Rating::from_days_listed(days_listed),
        })
    }

    /// Apply the imputed values, normalise `is_4wd` and run the completeness
    /// check. `None` means the row is dropped.
    fn finish(
        self,
        cylinders: Option<f64>,
        odometer: Option<f64>,
        columns: &BTreeSet<Column>,
        cleaning: CleaningPolicy,
    ) -> Option<Listing> {
        let Staged {
            raw,
            model,
            manufacturer,
            price,
            days_listed,
            listing_category,
        } = self;

        let model_year = raw.model_year.and_then(|y| i32::try_from(y).ok())?;
        let cylinders = cylinders? as u32;

        if cleaning == CleaningPolicy::AllFields {
            let optional = [
                (Column::Condition, &raw.condition),
                (Column::Fuel, &raw.fuel),
                (Column::Transmission, &raw.transmission),
                (Column::Type, &raw.vehicle_type),
                (Column::PaintColor, &raw.paint_color),
                (Column::DatePosted, &raw.date_posted),
            ];
            let gap = optional
                .iter()
                .any(|(col, value)| columns.contains(col) && value.is_none());
            if gap || odometer.is_none() {
                return None;
            }
        }

        Some(Listing {
            source_row: raw.source_row,
            price,
            model_year,
            model,
            condition: raw.condition,
            cylinders,
            fuel: raw.fuel,
            odometer,
            transmission: raw.transmission,
            vehicle_type: raw.vehicle_type,
            paint_color: raw.paint_color,
            is_4wd: raw.is_4wd.is_some_and(|v| v != 0.0),
            date_posted: raw.date_posted,
            days_listed,
            manufacturer,
            listing_category,
            odometer_category: odometer.map(Rating::from_odometer),
        })
    }
}

fn non_negative(column: Column, value: f64) -> Result<(), MalformedRecord> {
    if value < 0.0 {
        Err(MalformedRecord::NegativeValue {
            column: column.name(),
            value,
        })
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Fill {
    cylinders: Option<f64>,
    odometer: Option<f64>,
}

/// Median cylinders and odometer of each row's (model, model_year) group,
/// one entry per staged row. Rows without a year belong to no group.
fn peer_medians(staged: &[Staged]) -> Vec<Fill> {
    #[derive(Default)]
    struct Peers {
        cylinders: Vec<f64>,
        odometer: Vec<f64>,
    }

    let mut groups: BTreeMap<(&str, i64), Peers> = BTreeMap::new();
    for s in staged {
        let Some(year) = s.raw.model_year else {
            continue;
        };
        let peers = groups.entry((s.model.as_str(), year)).or_default();
        peers.cylinders.extend(s.raw.cylinders);
        peers.odometer.extend(s.raw.odometer);
    }

    let medians: BTreeMap<(&str, i64), Fill> = groups
        .into_iter()
        .map(|(key, peers)| {
            let fill = Fill {
                cylinders: median(&peers.cylinders),
                odometer: median(&peers.odometer),
            };
            (key, fill)
        })
        .collect();

    staged
        .iter()
        .map(|s| {
            s.raw
                .model_year
                .and_then(|year| medians.get(&(s.model.as_str(), year)).copied())
                .unwrap_or_default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use proptest::prelude::*;

    use super::*;

    fn raw(model: &str, year: Option<i64>, cylinders: Option<f64>, odometer: Option<f64>) -> RawListing {
        RawListing {
            model: Some(model.to_string()),
            model_year: year,
            cylinders,
            odometer,
            days_listed: Some(10),
            price: Some(5000.0),
            ..Default::default()
        }
    }

    fn run(rows: Vec<RawListing>, cleaning: CleaningPolicy) -> Prepared {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r.source_row = i + 1;
                r
            })
            .collect();
        let loaded = LoadedListings {
            columns: Column::REQUIRED.into_iter().collect(),
            rows,
        };
        prepare_loaded(loaded, &PipelineOptions { cleaning })
    }

    #[test]
    fn test_manufacturer_is_first_token() {
        let out = run(
            vec![
                raw("ford f150", Some(2015), Some(8.0), Some(1.0)),
                raw("f150", Some(2015), Some(8.0), Some(1.0)),
            ],
            CleaningPolicy::Targeted,
        );
        let l = out.table.listings();
        assert_eq!(l[0].manufacturer, "ford");
        assert_eq!(l[0].model, "ford f150");
        assert_eq!(l[1].manufacturer, "f150");
    }

    #[test]
    fn test_empty_model_is_dropped_not_fatal() {
        let mut missing = raw("", Some(2015), Some(8.0), Some(1.0));
        missing.model = None;
        let out = run(
            vec![
                raw("   ", Some(2015), Some(8.0), Some(1.0)),
                missing,
                raw("ram 1500", Some(2015), Some(8.0), Some(1.0)),
            ],
            CleaningPolicy::Targeted,
        );
        assert_eq!(out.table.len(), 1);
        assert_eq!(
            out.report.malformed,
            vec![(1, MalformedRecord::EmptyModel), (2, MalformedRecord::EmptyModel)]
        );
        assert_eq!(out.report.dropped(), 2);
    }

    #[test]
    fn test_invalid_rows_are_reported() {
        let mut no_days = raw("ford f150", Some(2015), Some(8.0), None);
        no_days.days_listed = None;
        let mut cheap = raw("ford f150", Some(2015), Some(8.0), None);
        cheap.price = Some(-1.0);
        let out = run(vec![no_days, cheap], CleaningPolicy::Targeted);
        assert!(out.table.is_empty());
        assert_eq!(
            out.report.malformed,
            vec![
                (1, MalformedRecord::MissingValue { column: "days_listed" }),
                (2, MalformedRecord::NegativeValue { column: "price", value: -1.0 }),
            ]
        );
    }

    #[test]
    fn test_negative_cylinders_are_reported() {
        let out = run(
            vec![
                raw("ford f150", Some(2015), Some(-6.0), Some(1.0)),
                raw("ford f150", Some(2015), Some(8.0), Some(1.0)),
            ],
            CleaningPolicy::Targeted,
        );
        assert_eq!(out.table.len(), 1);
        assert_eq!(out.table.listings()[0].cylinders, 8);
        assert_eq!(
            out.report.malformed,
            vec![(1, MalformedRecord::NegativeValue { column: "cylinders", value: -6.0 })]
        );
    }

    #[test]
    fn test_short_csv_row_does_not_abort() {
        let csv = "model,model_year,cylinders,odometer,days_listed,price,paint_color\n\
                   ford f150,2015,8,1000,5,9000,white\n\
                   ford f150,2015,8,3000,7,12000\n";
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(csv.as_bytes()).unwrap();

        let out = prepare(file.path(), &PipelineOptions::default()).unwrap();
        assert_eq!(out.table.len(), 2);
        assert_eq!(out.table.listings()[1].paint_color, None);
        assert!(out.report.malformed.is_empty());
    }

    #[test]
    fn test_odometer_uses_group_median_not_global() {
        let out = run(
            vec![
                raw("f150", Some(2015), Some(8.0), Some(10_000.0)),
                raw("f150", Some(2015), Some(8.0), None),
                raw("f150", Some(2015), Some(8.0), Some(30_000.0)),
                raw("civic", Some(2015), Some(4.0), Some(900_000.0)),
                raw("civic", Some(2015), Some(4.0), Some(800_000.0)),
            ],
            CleaningPolicy::Targeted,
        );
        let l = out.table.listings();
        assert_eq!(l[1].odometer, Some(20_000.0));
        assert_eq!(l[1].odometer_category, Some(Rating::Good));
        assert_eq!(out.report.imputed_odometer, 1);
    }

    #[test]
    fn test_group_key_includes_year() {
        let out = run(
            vec![
                raw("f150", Some(2014), Some(8.0), Some(90_000.0)),
                raw("f150", Some(2015), Some(8.0), Some(10_000.0)),
                raw("f150", Some(2015), Some(8.0), None),
            ],
            CleaningPolicy::Targeted,
        );
        assert_eq!(out.table.listings()[2].odometer, Some(10_000.0));
    }

    #[test]
    fn test_cylinders_are_ceiled_group_median() {
        let out = run(
            vec![
                raw("tacoma", Some(2010), Some(4.0), Some(1.0)),
                raw("tacoma", Some(2010), Some(5.0), Some(1.0)),
                raw("tacoma", Some(2010), None, Some(1.0)),
            ],
            CleaningPolicy::Targeted,
        );
        assert_eq!(out.table.listings()[2].cylinders, 5);
        assert_eq!(out.report.imputed_cylinders, 1);
    }

    #[test]
    fn test_rows_without_year_or_cylinders_are_dropped() {
        let out = run(
            vec![
                raw("f150", None, Some(8.0), Some(1.0)),
                raw("lonely", Some(2001), None, Some(1.0)),
                raw("f150", Some(2015), Some(8.0), Some(1.0)),
            ],
            CleaningPolicy::Targeted,
        );
        assert_eq!(out.table.len(), 1);
        assert_eq!(out.table.listings()[0].source_row, 3);
        assert_eq!(out.report.dropped_incomplete, 2);
    }

    #[test]
    fn test_all_missing_odometer_group() {
        let rows = vec![
            raw("beetle", Some(1999), Some(4.0), None),
            raw("beetle", Some(1999), Some(4.0), None),
        ];

        let kept = run(rows.clone(), CleaningPolicy::Targeted);
        assert_eq!(kept.table.len(), 2);
        for l in kept.table.listings() {
            assert_eq!(l.odometer, None);
            assert_eq!(l.odometer_category, None);
        }
        assert_eq!(kept.report.missing_odometer, 2);

        let strict = run(rows, CleaningPolicy::AllFields);
        assert!(strict.table.is_empty());
        assert_eq!(strict.report.dropped_incomplete, 2);
    }

    #[test]
    fn test_all_fields_only_checks_present_columns() {
        let mut with_color = raw("f150", Some(2015), Some(8.0), Some(1.0));
        with_color.paint_color = Some("red".to_string());
        let without_color = raw("f150", Some(2015), Some(8.0), Some(1.0));

        let mut columns: BTreeSet<Column> = Column::REQUIRED.into_iter().collect();
        let loaded = LoadedListings {
            columns: columns.clone(),
            rows: vec![with_color.clone(), without_color.clone()],
        };
        let opts = PipelineOptions { cleaning: CleaningPolicy::AllFields };
        assert_eq!(prepare_loaded(loaded, &opts).table.len(), 2);

        columns.insert(Column::PaintColor);
        let loaded = LoadedListings {
            columns,
            rows: vec![with_color, without_color],
        };
        assert_eq!(prepare_loaded(loaded, &opts).table.len(), 1);
    }

    #[test]
    fn test_is_4wd_normalised() {
        let mut four = raw("f150", Some(2015), Some(8.0), Some(1.0));
        four.is_4wd = Some(1.0);
        let out = run(
            vec![four, raw("f150", Some(2015), Some(8.0), Some(1.0))],
            CleaningPolicy::Targeted,
        );
        let l = out.table.listings();
        assert!(l[0].is_4wd);
        assert!(!l[1].is_4wd);
    }

    #[test]
    fn test_listing_category_boundaries() {
        let rows = [30, 31, 90, 91]
            .into_iter()
            .map(|days| {
                let mut r = raw("f150", Some(2015), Some(8.0), Some(1.0));
                r.days_listed = Some(days);
                r
            })
            .collect();
        let out = run(rows, CleaningPolicy::Targeted);
        let cats: Vec<Rating> = out.table.listings().iter().map(|l| l.listing_category).collect();
        assert_eq!(cats, [Rating::Good, Rating::Fair, Rating::Poor, Rating::VeryPoor]);
    }

    #[test]
    fn test_prepare_is_deterministic() {
        let csv = "price,model_year,model,condition,cylinders,fuel,odometer,transmission,type,paint_color,is_4wd,date_posted,days_listed\n\
                   9400,2011.0,bmw x5,good,6.0,gas,145000.0,automatic,SUV,,1.0,2018-06-23,19\n\
                   25500,,ford f-150,good,6.0,gas,88705.0,automatic,pickup,white,1.0,2018-10-19,50\n\
                   5500,2013.0,hyundai sonata,like new,4.0,gas,110000.0,automatic,sedan,red,,2019-02-07,79\n\
                   1500,2003.0,ford f-150,fair,8.0,gas,,automatic,pickup,,,2019-03-22,9\n\
                   14900,2013.0,hyundai sonata,excellent,,gas,80903.0,automatic,sedan,black,,2019-04-02,28\n\
                   3900,2003.0,ford f-150,excellent,8.0,gas,181613.0,automatic,pickup,,,2019-01-07,15\n";
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(csv.as_bytes()).unwrap();

        let opts = PipelineOptions::default();
        let first = prepare(file.path(), &opts).unwrap();
        let second = prepare(file.path(), &opts).unwrap();
        assert_eq!(first, second);

        let l = first.table.listings();
        assert_eq!(l.len(), 5);
        // Sonata 2013 gets 4 cylinders from its peer; F-150 2003 borrows 181613 miles.
        assert_eq!(l[3].cylinders, 4);
        assert_eq!(l[2].odometer, Some(181_613.0));
        assert_eq!(l[2].odometer_category, Some(Rating::VeryPoor));
        let rows: Vec<usize> = l.iter().map(|l| l.source_row).collect();
        assert_eq!(rows, [1, 3, 4, 5, 6]);
    }

    proptest! {
        #[test]
        fn prop_days_bucket_matches_bands(days in 0u32..10_000) {
            let expected = if days <= 30 {
                Rating::Good
            } else if days <= 60 {
                Rating::Fair
            } else if days <= 90 {
                Rating::Poor
            } else {
                Rating::VeryPoor
            };
            prop_assert_eq!(Rating::from_days_listed(days), expected);
        }

        #[test]
        fn prop_odometer_bucket_is_monotonic(a in 0.0f64..500_000.0, b in 0.0f64..500_000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(Rating::from_odometer(lo) <= Rating::from_odometer(hi));
        }
    }
}
