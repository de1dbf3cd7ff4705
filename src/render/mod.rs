//! Choropleth rendering to SVG.
//!
//! Each joined row is filled with the coolwarm color of its metric value,
//! normalized linearly over the observed range. Rows without a value are left
//! unfilled. A vertical colorbar to the right of the map serves as the legend.

mod palette;

pub use palette::{Normalize, coolwarm};

use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::{debug, info};

use crate::error::RenderError;
use crate::geometry::{self, Bounds};
use crate::join::JoinedTable;
use crate::stats::min_max;

const LEGEND_WIDTH: u32 = 160;
const LEGEND_STEPS: usize = 64;

/// Fixed presentation settings for the figure.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub output: PathBuf,
    pub title: String,
    pub legend_label: String,
    pub width: u32,
    pub height: u32,
}

fn drawing_err(e: impl std::fmt::Display) -> RenderError {
    RenderError::Drawing(e.to_string())
}

/// Draws `joined` keyed on `metric` and writes the figure to
/// `options.output`, returning the written path.
///
/// Refuses with [`RenderError::EmptyTable`] or [`RenderError::MissingColumn`]
/// when there is nothing plottable.
#[tracing::instrument(skip(joined, options), fields(output = %options.output.display()))]
pub fn render_choropleth(
    joined: &JoinedTable,
    metric: &str,
    options: &RenderOptions,
) -> Result<PathBuf, RenderError> {
    if joined.is_empty() {
        return Err(RenderError::EmptyTable);
    }
    if !joined.has_column(metric) {
        return Err(RenderError::MissingColumn(metric.to_string()));
    }

    if let Some(parent) = options.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| RenderError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let (vmin, vmax) = min_max(joined.rows().iter().filter_map(|r| r.metric)).unwrap_or((0.0, 0.0));
    let norm = Normalize::new(vmin, vmax);
    let bounds = joined
        .rows()
        .iter()
        .filter_map(|r| r.geometry.bounds())
        .reduce(Bounds::union)
        .unwrap_or(Bounds {
            min_x: -180.0,
            min_y: -90.0,
            max_x: 180.0,
            max_y: 90.0,
        })
        .padded(0.05);
    debug!(vmin, vmax, ?bounds, "Choropleth extent computed");

    draw(&options.output, joined, norm, bounds, options)?;

    info!(
        rows = joined.len(),
        filled = joined.matched(),
        "Choropleth written"
    );
    Ok(options.output.clone())
}

fn draw(
    path: &Path,
    joined: &JoinedTable,
    norm: Normalize,
    bounds: Bounds,
    options: &RenderOptions,
) -> Result<(), RenderError> {
    let root = SVGBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing_err)?;

    let (map_area, legend_area) =
        root.split_horizontally(options.width.saturating_sub(LEGEND_WIDTH) as i32);

    let mut chart = ChartBuilder::on(&map_area)
        .margin(20)
        .caption(&options.title, ("sans-serif", 28))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(bounds.min_x..bounds.max_x, bounds.min_y..bounds.max_y)
        .map_err(drawing_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Longitude")
        .y_desc("Latitude")
        .draw()
        .map_err(drawing_err)?;

    for (color, polygon) in fill_order(joined, norm) {
        chart
            .draw_series(std::iter::once(Polygon::new(
                polygon.exterior.clone(),
                color.filled(),
            )))
            .map_err(drawing_err)?;
        for hole in &polygon.holes {
            chart
                .draw_series(std::iter::once(Polygon::new(hole.clone(), WHITE.filled())))
                .map_err(drawing_err)?;
        }
    }

    for polygon in joined.rows().iter().flat_map(|r| r.geometry.polygons()) {
        for ring in std::iter::once(&polygon.exterior).chain(&polygon.holes) {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    ring.clone(),
                    BLACK.stroke_width(1),
                )))
                .map_err(drawing_err)?;
        }
    }

    draw_colorbar(&legend_area, norm, &options.legend_label)?;

    root.present().map_err(drawing_err)?;
    Ok(())
}

/// Filled polygons with their colors, largest bounding box first, so an
/// enclave lands on top of the hole its host leaves for it.
fn fill_order(joined: &JoinedTable, norm: Normalize) -> Vec<(RGBColor, &geometry::Polygon)> {
    let mut fills: Vec<(f64, RGBColor, &geometry::Polygon)> = joined
        .rows()
        .iter()
        .filter_map(|row| row.metric.map(|v| (coolwarm(norm.unit(v)), row)))
        .flat_map(|(color, row)| {
            row.geometry
                .polygons()
                .iter()
                .map(move |p| (p.bounds().map_or(0.0, |b| b.area()), color, p))
        })
        .collect();
    fills.sort_by(|a, b| b.0.total_cmp(&a.0));
    fills.into_iter().map(|(_, color, p)| (color, p)).collect()
}

fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    norm: Normalize,
    label: &str,
) -> Result<(), RenderError> {
    let (lo, hi) = if norm.vmax > norm.vmin {
        (norm.vmin, norm.vmax)
    } else {
        (norm.vmin - 0.5, norm.vmax + 0.5)
    };

    let mut bar = ChartBuilder::on(area)
        .margin_top(80)
        .margin_bottom(80)
        .margin_right(60)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..1.0, lo..hi)
        .map_err(drawing_err)?;

    bar.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_desc(label)
        .y_labels(7)
        .y_label_formatter(&|v| format!("{v:.1}"))
        .draw()
        .map_err(drawing_err)?;

    let step = (hi - lo) / LEGEND_STEPS as f64;
    bar.draw_series((0..LEGEND_STEPS).map(|i| {
        let y0 = lo + step * i as f64;
        let color = coolwarm((i as f64 + 0.5) / LEGEND_STEPS as f64);
        Rectangle::new([(0.0, y0), (1.0, y0 + step)], color.filled())
    }))
    .map_err(drawing_err)?;

    Ok(())
}
