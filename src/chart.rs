use std::collections::BTreeMap;

use crate::config::Config;
use crate::data::filter::{self, FilterParams};
use crate::data::model::{Listing, ListingTable, Rating};
use crate::data::stats::{Bins, linear_fit};

// ---------------------------------------------------------------------------
// Chart specifications – plain data, rendered by ui::plot
// ---------------------------------------------------------------------------

/// Display order of the `condition` column.
pub const CONDITION_ORDER: [&str; 6] = ["new", "like new", "excellent", "good", "fair", "salvage"];

/// Label used for rows whose grouping value is missing.
const UNKNOWN: &str = "unknown";

/// Which filter widget sits next to a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    YearRange,
    Manufacturers,
    PaintColors,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub header: &'static str,
    pub control: Option<Control>,
    pub chart: Chart,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Stable widget id.
    pub id: &'static str,
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub kind: ChartKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartKind {
    Bars(BarsSpec),
    Histogram(HistogramSpec),
    Scatter(ScatterSpec),
}

/// One named series of per-bucket heights.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// Stacked bars over categorical x positions.
#[derive(Debug, Clone, PartialEq)]
pub struct BarsSpec {
    pub categories: Vec<String>,
    /// `values[i]` is the height at `categories[i]`.
    pub series: Vec<Series>,
}

/// Stacked histogram; `values[i]` is the height of bin `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSpec {
    pub bins: Option<Bins>,
    pub series: Vec<Series>,
    /// Overrides the palette when there is a single series.
    pub fixed_color: Option<[u8; 3]>,
    /// Label each bar with its total height.
    pub show_counts: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    /// Relative marker size in `0..=1`, one per point.
    pub sizes: Option<Vec<f64>>,
    /// OLS `(slope, intercept)`.
    pub trend: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub name: Option<String>,
    pub series: Vec<ScatterSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterSpec {
    pub facets: Vec<Facet>,
    /// Y interval the view must always include.
    pub y_include: Option<(f64, f64)>,
    pub marginals: Option<Marginals>,
}

/// Distributions of each scatter axis, drawn beside a single-facet scatter.
#[derive(Debug, Clone, PartialEq)]
pub struct Marginals {
    pub x: HistogramSpec,
    pub y: HistogramSpec,
}

// ---------------------------------------------------------------------------
// The page
// ---------------------------------------------------------------------------

/// Build every section of the page for the current filter parameters.
pub fn dashboard(table: &ListingTable, filters: &FilterParams, config: &Config) -> Vec<Section> {
    let all: Vec<&Listing> = table.listings().iter().collect();
    let pick = |indices: Vec<usize>| {
        indices
            .into_iter()
            .map(|i| &table.listings()[i])
            .collect::<Vec<&Listing>>()
    };
    let bins = config.histogram_bins;

    let mut sections = vec![
        Section {
            header: "Vehicle Types Produced by Manufacturer",
            control: None,
            chart: types_by_manufacturer(&all),
        },
        Section {
            header: "Distribution of Vehicle Cost",
            control: None,
            chart: price_distribution(&all, bins),
        },
        Section {
            header: "Days on Market by Price",
            control: None,
            chart: days_vs_price(&all),
        },
        Section {
            header: "Vehicle Condition Over Time",
            control: Some(Control::YearRange),
            chart: condition_by_year(&pick(filter::by_year(table, &filters.years))),
        },
        Section {
            header: "Price Distribution Between Manufacturers",
            control: Some(Control::Manufacturers),
            chart: price_by_manufacturer(
                &pick(filter::by_manufacturer(table, &filters.manufacturers)),
                bins,
            ),
        },
    ];

    if config.show_paint_color_section {
        sections.push(Section {
            header: "Price Distribution Between Paint Colors",
            control: Some(Control::PaintColors),
            chart: price_by_paint_color(
                &pick(filter::by_paint_color(table, &filters.paint_colors)),
                bins,
            ),
        });
    }

    sections.extend([
        Section {
            header: "Listing Days Based on Odometer Reading and Cylinders",
            control: None,
            chart: days_listed_by_cylinders(&all, bins),
        },
        Section {
            header: "Odometer Reading for Vehicle Fuel Types Over Time",
            control: None,
            chart: odometer_over_time(&all),
        },
        Section {
            header: "Trendlines between Odometer Reading and Price",
            control: None,
            chart: odometer_vs_price(&all, bins),
        },
    ]);

    sections
}

// ---------------------------------------------------------------------------
// Individual charts
// ---------------------------------------------------------------------------

/// Counts per manufacturer stacked by vehicle type; manufacturers sorted by
/// frequency.
pub fn types_by_manufacturer(rows: &[&Listing]) -> Chart {
    let by_maker = group(rows, |l| Some(l.manufacturer.as_str()), None);
    let mut makers: Vec<(String, usize)> = by_maker
        .into_iter()
        .map(|(name, members)| (name, members.len()))
        .collect();
    // Stable sort keeps first appearance among equal counts.
    makers.sort_by(|a, b| b.1.cmp(&a.1));
    let categories: Vec<String> = makers.into_iter().map(|(name, _)| name).collect();
    let position: BTreeMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    let series = group(rows, |l| l.vehicle_type.as_deref(), None)
        .into_iter()
        .map(|(name, members)| {
            let mut values = vec![0.0; categories.len()];
            for l in members {
                values[position[l.manufacturer.as_str()]] += 1.0;
            }
            Series { name, values }
        })
        .collect();

    Chart {
        id: "types_by_manufacturer",
        title: "Vehicle Types by Manufacturer",
        x_label: "manufacturer",
        y_label: "count",
        kind: ChartKind::Bars(BarsSpec { categories, series }),
    }
}

pub fn price_distribution(rows: &[&Listing], bins: usize) -> Chart {
    let mut spec = histogram(
        rows,
        |l| Some(l.price),
        |_| 1.0,
        bins,
        vec![("price".to_string(), rows.to_vec())],
    );
    spec.fixed_color = Some([0x00, 0x00, 0x80]);
    spec.show_counts = true;
    Chart {
        id: "price_distribution",
        title: "Distribution of Vehicle Costs",
        x_label: "Vehicle Price (dollars)",
        y_label: "Number of Vehicles",
        kind: ChartKind::Histogram(spec),
    }
}

pub fn days_vs_price(rows: &[&Listing]) -> Chart {
    let order = Rating::ALL.map(Rating::label);
    let series = group(rows, |l| Some(l.listing_category.label()), Some(&order[..]))
        .into_iter()
        .map(|(name, members)| ScatterSeries {
            name,
            points: members
                .iter()
                .map(|l| [f64::from(l.days_listed), l.price])
                .collect(),
            sizes: None,
            trend: None,
        })
        .collect();

    Chart {
        id: "days_vs_price",
        title: "Days on Market by Price and Listing Category",
        x_label: "days_listed",
        y_label: "Price (dollars)",
        kind: ChartKind::Scatter(ScatterSpec {
            facets: vec![Facet { name: None, series }],
            y_include: None,
            marginals: None,
        }),
    }
}

/// One bin per model year, stacked by condition.
pub fn condition_by_year(rows: &[&Listing]) -> Chart {
    let bounds = rows.iter().map(|l| l.model_year).fold(None, |acc, y| {
        Some(match acc {
            None => (y, y),
            Some((lo, hi)) => (i32::min(lo, y), i32::max(hi, y)),
        })
    });
    let bins = bounds.map(|(lo, hi)| Bins {
        start: f64::from(lo) - 0.5,
        width: 1.0,
        count: (hi - lo) as usize + 1,
    });

    let groups = group(rows, |l| l.condition.as_deref(), Some(&CONDITION_ORDER[..]));
    let spec = histogram_with(bins, |l| Some(f64::from(l.model_year)), |_| 1.0, groups);

    Chart {
        id: "condition_by_year",
        title: "Condition of Vehicles by Year",
        x_label: "model_year",
        y_label: "count",
        kind: ChartKind::Histogram(spec),
    }
}

pub fn price_by_manufacturer(rows: &[&Listing], bins: usize) -> Chart {
    let groups = group(rows, |l| Some(l.manufacturer.as_str()), None);
    Chart {
        id: "price_by_manufacturer",
        title: "Price Distribution Between Manufacturers",
        x_label: "price",
        y_label: "count",
        kind: ChartKind::Histogram(histogram(rows, |l| Some(l.price), |_| 1.0, bins, groups)),
    }
}

pub fn price_by_paint_color(rows: &[&Listing], bins: usize) -> Chart {
    let groups = group(rows, |l| l.paint_color.as_deref(), None);
    Chart {
        id: "price_by_paint_color",
        title: "Price Distribution Between Paint Colors",
        x_label: "price",
        y_label: "count",
        kind: ChartKind::Histogram(histogram(rows, |l| Some(l.price), |_| 1.0, bins, groups)),
    }
}

/// Days on market binned, bar height is the summed price, stacked by
/// cylinder count in numeric order.
pub fn days_listed_by_cylinders(rows: &[&Listing], bins: usize) -> Chart {
    let mut by_cyl: BTreeMap<u32, Vec<&Listing>> = BTreeMap::new();
    for &l in rows {
        by_cyl.entry(l.cylinders).or_default().push(l);
    }
    let groups = by_cyl
        .into_iter()
        .map(|(cyl, members)| (cyl.to_string(), members))
        .collect();

    Chart {
        id: "days_listed_by_cylinders",
        title: "Listing Days Based on Odometer Reading and Cylinders",
        x_label: "Number of Days on Market",
        y_label: "sum of price",
        kind: ChartKind::Histogram(histogram(
            rows,
            |l| Some(f64::from(l.days_listed)),
            |l| l.price,
            bins,
            groups,
        )),
    }
}

/// Odometer against model year, one facet per fuel, coloured by
/// transmission, marker size by price. Rows without an odometer are skipped.
pub fn odometer_over_time(rows: &[&Listing]) -> Chart {
    let with_odo: Vec<&Listing> = rows.iter().copied().filter(|l| l.odometer.is_some()).collect();
    let max_price = with_odo.iter().map(|l| l.price).fold(0.0, f64::max);

    let facets = group(&with_odo, |l| l.fuel.as_deref(), None)
        .into_iter()
        .map(|(fuel, members)| Facet {
            name: Some(fuel),
            series: group(&members, |l| l.transmission.as_deref(), None)
                .into_iter()
                .map(|(name, members)| ScatterSeries {
                    name,
                    points: members
                        .iter()
                        .filter_map(|l| Some([l.odometer?, f64::from(l.model_year)]))
                        .collect(),
                    sizes: Some(
                        members
                            .iter()
                            .map(|l| if max_price > 0.0 { l.price / max_price } else { 0.0 })
                            .collect(),
                    ),
                    trend: None,
                })
                .collect(),
        })
        .collect();

    Chart {
        id: "odometer_over_time",
        title: "Odometer Reading for Vehicle Fuel Types Over Time",
        x_label: "Odometer (Miles)",
        y_label: "model_year",
        kind: ChartKind::Scatter(ScatterSpec {
            facets,
            y_include: None,
            marginals: None,
        }),
    }
}

/// Odometer against price per condition, each with a least-squares trendline
/// and a histogram of both axes. Rows without an odometer are skipped.
pub fn odometer_vs_price(rows: &[&Listing], bins: usize) -> Chart {
    let with_odo: Vec<&Listing> = rows.iter().copied().filter(|l| l.odometer.is_some()).collect();
    let by_condition = || group(&with_odo, |l| l.condition.as_deref(), Some(&CONDITION_ORDER[..]));

    let marginals = Marginals {
        x: histogram(&with_odo, |l| Some(l.price), |_| 1.0, bins, by_condition()),
        y: histogram(&with_odo, |l| l.odometer, |_| 1.0, bins, by_condition()),
    };

    let series = by_condition()
        .into_iter()
        .map(|(name, members)| {
            let points: Vec<[f64; 2]> = members
                .iter()
                .filter_map(|l| Some([l.price, l.odometer?]))
                .collect();
            let trend = linear_fit(&points);
            ScatterSeries {
                name,
                points,
                sizes: None,
                trend,
            }
        })
        .collect();

    Chart {
        id: "odometer_vs_price",
        title: "Trendlines between Odometer Reading and Price",
        x_label: "Price (dollars)",
        y_label: "Odometer (Miles)",
        kind: ChartKind::Scatter(ScatterSpec {
            facets: vec![Facet { name: None, series }],
            y_include: Some((-100_000.0, 1_000_000.0)),
            marginals: Some(marginals),
        }),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Split rows into named groups. Names in `order` come first in that order,
/// the rest follow in first-appearance order. Missing keys group as
/// "unknown".
fn group<'a>(
    rows: &[&'a Listing],
    key: impl Fn(&'a Listing) -> Option<&'a str>,
    order: Option<&[&str]>,
) -> Vec<(String, Vec<&'a Listing>)> {
    let mut groups: Vec<(String, Vec<&'a Listing>)> = Vec::new();
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    for &l in rows {
        let name = key(l).unwrap_or(UNKNOWN);
        let idx = *index.entry(name).or_insert_with(|| {
            groups.push((name.to_string(), Vec::new()));
            groups.len() - 1
        });
        groups[idx].1.push(l);
    }

    if let Some(order) = order {
        let rank = |name: &str| order.iter().position(|o| *o == name).unwrap_or(order.len());
        groups.sort_by_key(|(name, _)| rank(name.as_str()));
    }
    groups
}

fn histogram<'a>(
    rows: &[&'a Listing],
    x: impl Fn(&Listing) -> Option<f64>,
    weight: impl Fn(&Listing) -> f64,
    bins: usize,
    groups: Vec<(String, Vec<&'a Listing>)>,
) -> HistogramSpec {
    let bins = Bins::covering(rows.iter().filter_map(|&l| x(l)), bins);
    histogram_with(bins, x, weight, groups)
}

fn histogram_with(
    bins: Option<Bins>,
    x: impl Fn(&Listing) -> Option<f64>,
    weight: impl Fn(&Listing) -> f64,
    groups: Vec<(String, Vec<&Listing>)>,
) -> HistogramSpec {
    let series = match bins {
        None => Vec::new(),
        Some(b) => groups
            .into_iter()
            .map(|(name, members)| {
                let mut values = vec![0.0; b.count];
                for l in members {
                    if let Some(idx) = x(l).and_then(|v| b.index_of(v)) {
                        values[idx] += weight(l);
                    }
                }
                Series { name, values }
            })
            .collect(),
    };
    HistogramSpec {
        bins,
        series,
        fixed_color: None,
        show_counts: false,
    }
}
