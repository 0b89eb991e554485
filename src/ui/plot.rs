use std::ops::RangeInclusive;

use eframe::egui::{Align2, Color32, ScrollArea, Ui, Vec2};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoint, PlotPoints, Points, Text};

use crate::chart::{BarsSpec, Chart, ChartKind, Facet, HistogramSpec, Marginals, ScatterSpec, Series};
use crate::color::ColorMap;
use crate::state::AppState;
use crate::ui::table;

/// Number of marker sizes used for size-encoded scatters.
const SIZE_TIERS: usize = 4;

/// Share of a scatter's width and height given to its marginal histograms.
const MARGINAL_SHARE: f32 = 0.2;

// ---------------------------------------------------------------------------
// Dashboard page (central panel)
// ---------------------------------------------------------------------------

/// Render the table toggle and every chart section, top to bottom.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    let Some(listings) = &state.table else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a listings file to explore  (File → Open…)");
        });
        return;
    };

    let size = chart_size(ui, state);

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Data viewer");
            if state.show_table {
                table::listing_table(ui, listings);
            }

            for section in &state.sections {
                ui.add_space(12.0);
                ui.heading(section.header);
                render_chart(ui, &section.chart, size);
            }
        });
}

/// Configured chart size, capped to what the window can show.
fn chart_size(ui: &Ui, state: &AppState) -> Vec2 {
    let screen = ui.ctx().screen_rect().size();
    Vec2::new(
        state.config.chart_width.min(ui.available_width()),
        state.config.chart_height.min(screen.y * 0.8),
    )
}

fn render_chart(ui: &mut Ui, chart: &Chart, size: Vec2) {
    match &chart.kind {
        ChartKind::Bars(spec) => bars(ui, chart, spec, size),
        ChartKind::Histogram(spec) => histogram(ui, chart, spec, size),
        ChartKind::Scatter(spec) => scatter(ui, chart, spec, size),
    }
}

fn base_plot<'a>(id: impl std::hash::Hash, chart: &Chart, size: Vec2) -> Plot<'a> {
    Plot::new(id)
        .legend(Legend::default())
        .x_axis_label(chart.x_label)
        .y_axis_label(chart.y_label)
        .width(size.x)
        .height(size.y)
        .allow_scroll(false)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_zoom(true)
}

// ---------------------------------------------------------------------------
// Bars and histograms
// ---------------------------------------------------------------------------

/// Build one bar chart per series, each stacked on the ones before it.
fn stacked(series: &[Series], x: impl Fn(usize) -> f64, width: f64, colors: &ColorMap) -> Vec<BarChart> {
    let mut charts: Vec<BarChart> = Vec::with_capacity(series.len());
    for s in series {
        let bars: Vec<Bar> = s
            .values
            .iter()
            .enumerate()
            .map(|(i, &v)| Bar::new(x(i), v).width(width))
            .collect();
        let below: Vec<&BarChart> = charts.iter().collect();
        let chart = BarChart::new(bars)
            .name(&s.name)
            .color(colors.color_for(&s.name))
            .stack_on(&below);
        charts.push(chart);
    }
    charts
}

fn series_colors(series: &[Series]) -> ColorMap {
    ColorMap::new(series.iter().map(|s| s.name.as_str()))
}

fn bars(ui: &mut Ui, chart: &Chart, spec: &BarsSpec, size: Vec2) {
    ui.label(chart.title);
    let colors = series_colors(&spec.series);
    let charts = stacked(&spec.series, |i| i as f64, 0.8, &colors);

    let categories = spec.categories.clone();
    base_plot(chart.id, chart, size)
        .x_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            categories.get(idx as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            for c in charts {
                plot_ui.bar_chart(c);
            }
        });
}

fn histogram(ui: &mut Ui, chart: &Chart, spec: &HistogramSpec, size: Vec2) {
    ui.label(chart.title);
    let Some(bins) = spec.bins else {
        ui.label("No rows match the current selection.");
        return;
    };

    let colors = series_colors(&spec.series);
    let mut charts = stacked(&spec.series, |i| bins.center(i), bins.width * 0.8, &colors);
    if let (Some([r, g, b]), [_]) = (spec.fixed_color, spec.series.as_slice()) {
        charts = charts
            .into_iter()
            .map(|c| c.color(Color32::from_rgb(r, g, b)))
            .collect();
    }

    let labels: Vec<(f64, f64)> = if spec.show_counts {
        (0..bins.count)
            .map(|i| (bins.center(i), spec.series.iter().map(|s| s.values[i]).sum::<f64>()))
            .filter(|&(_, total)| total > 0.0)
            .collect()
    } else {
        Vec::new()
    };

    base_plot(chart.id, chart, size).show(ui, |plot_ui| {
        for c in charts {
            plot_ui.bar_chart(c);
        }
        for (x, total) in labels {
            plot_ui.text(
                Text::new(PlotPoint::new(x, total), format!("{total}"))
                    .anchor(Align2::CENTER_BOTTOM),
            );
        }
    });
}

/// Small stacked histogram beside a scatter. `horizontal` lays the bars
/// along the y axis.
fn marginal(
    ui: &mut Ui,
    id: (&str, &str),
    spec: &HistogramSpec,
    colors: &ColorMap,
    size: Vec2,
    horizontal: bool,
) {
    let Some(bins) = spec.bins else {
        return;
    };
    let charts = stacked(&spec.series, |i| bins.center(i), bins.width * 0.9, colors);

    Plot::new(id)
        .width(size.x)
        .height(size.y)
        .show_axes([horizontal, !horizontal])
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for c in charts {
                plot_ui.bar_chart(if horizontal { c.horizontal() } else { c });
            }
        });
}

// ---------------------------------------------------------------------------
// Scatter plots
// ---------------------------------------------------------------------------

fn scatter(ui: &mut Ui, chart: &Chart, spec: &ScatterSpec, size: Vec2) {
    ui.label(chart.title);

    // One colour map across facets so a series keeps its colour everywhere.
    let mut names: Vec<&str> = Vec::new();
    for facet in &spec.facets {
        for s in &facet.series {
            if !names.contains(&s.name.as_str()) {
                names.push(&s.name);
            }
        }
    }
    let colors = ColorMap::new(names.into_iter());

    match spec.facets.as_slice() {
        [] => {
            ui.label("No rows to plot.");
        }
        [facet] => match &spec.marginals {
            Some(marginals) => with_marginals(ui, chart, facet, spec, marginals, &colors, size),
            None => scatter_facet(ui, (chart.id, 0), chart, facet, spec, &colors, size),
        },
        facets => {
            let width = size.x / facets.len() as f32;
            ui.horizontal(|ui: &mut Ui| {
                for (i, facet) in facets.iter().enumerate() {
                    ui.vertical(|ui: &mut Ui| {
                        if let Some(name) = &facet.name {
                            ui.label(format!("fuel = {name}"));
                        }
                        let facet_size = Vec2::new(width, size.y);
                        scatter_facet(ui, (chart.id, i), chart, facet, spec, &colors, facet_size);
                    });
                }
            });
        }
    }
}

/// Scatter with the x distribution above it and the y distribution to its
/// right.
fn with_marginals(
    ui: &mut Ui,
    chart: &Chart,
    facet: &Facet,
    spec: &ScatterSpec,
    marginals: &Marginals,
    colors: &ColorMap,
    size: Vec2,
) {
    let main = size * (1.0 - MARGINAL_SHARE);
    let side = size * MARGINAL_SHARE;

    ui.vertical(|ui: &mut Ui| {
        marginal(ui, (chart.id, "x"), &marginals.x, colors, Vec2::new(main.x, side.y), false);
        ui.horizontal(|ui: &mut Ui| {
            scatter_facet(ui, (chart.id, 0), chart, facet, spec, colors, main);
            marginal(ui, (chart.id, "y"), &marginals.y, colors, Vec2::new(side.x, main.y), true);
        });
    });
}

fn scatter_facet(
    ui: &mut Ui,
    id: (&str, usize),
    chart: &Chart,
    facet: &Facet,
    spec: &ScatterSpec,
    colors: &ColorMap,
    size: Vec2,
) {
    let mut plot = base_plot(id, chart, size);
    if let Some((lo, hi)) = spec.y_include {
        plot = plot.include_y(lo).include_y(hi);
    }

    plot.show(ui, |plot_ui| {
        for s in &facet.series {
            let color = colors.color_for(&s.name);

            match &s.sizes {
                None => {
                    let points = PlotPoints::from(s.points.clone());
                    plot_ui.points(Points::new(points).radius(2.0).color(color).name(&s.name));
                }
                Some(sizes) => {
                    // Bucket markers into a few radii; same name keeps one legend entry.
                    let mut tiers: Vec<Vec<[f64; 2]>> = vec![Vec::new(); SIZE_TIERS];
                    for (p, &rel) in s.points.iter().zip(sizes) {
                        let tier = ((rel.clamp(0.0, 1.0)) * (SIZE_TIERS as f64 - 1.0)).round() as usize;
                        tiers[tier].push(*p);
                    }
                    for (tier, pts) in tiers.into_iter().enumerate() {
                        if pts.is_empty() {
                            continue;
                        }
                        let radius = 1.5 + 2.5 * tier as f32;
                        plot_ui.points(
                            Points::new(PlotPoints::from(pts))
                                .radius(radius)
                                .color(color)
                                .name(&s.name),
                        );
                    }
                }
            }

            if let Some((slope, intercept)) = s.trend {
                let (min_x, max_x) = s.points.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])),
                );
                let line: PlotPoints = [min_x, max_x]
                    .iter()
                    .map(|&x| [x, slope * x + intercept])
                    .collect();
                plot_ui.line(Line::new(line).color(color).width(2.0).name(&s.name));
            }
        }
    });
}

