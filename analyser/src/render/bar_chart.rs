use super::RenderError;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

/// Width of each bar, in load units.
pub const BAR_WIDTH: f64 = 20.0;
const CHART_SIZE: (u32, u32) = (1000, 500);
/// Headroom above the tallest bar
const Y_MARGIN: f64 = 1.05;

/// Where each bar goes and the ranges of both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct BarLayout {
    /// Opposite corners of each bar, `[(left, 0), (right, height)]`
    pub bars: Vec<[(f64, f64); 2]>,
    pub x_range: Range<f64>,
    pub y_range: Range<f64>,
}

/// Lay out one bar per `(load, peak)` point, centred on the load.
pub fn bar_layout(points: &[(f64, f64)]) -> BarLayout {
    let half = BAR_WIDTH / 2.0;
    let bars = points
        .iter()
        .map(|&(load, peak)| [(load - half, 0.0), (load + half, peak)])
        .collect::<Vec<_>>();

    let x_range = if bars.is_empty() {
        0.0..100.0
    } else {
        let left = bars.iter().map(|b| b[0].0).fold(f64::INFINITY, f64::min);
        let right = bars.iter().map(|b| b[1].0).fold(f64::NEG_INFINITY, f64::max);
        (left - BAR_WIDTH)..(right + BAR_WIDTH)
    };

    let top = points.iter().map(|p| p.1).fold(0.0, f64::max);
    let bottom = points.iter().map(|p| p.1).fold(0.0, f64::min);
    let y_range = if top == 0.0 && bottom == 0.0 {
        0.0..1.0
    } else {
        (bottom * Y_MARGIN)..(top * Y_MARGIN)
    };

    BarLayout {
        bars,
        x_range,
        y_range,
    }
}

/// Label for the metric axis, `node-0` becomes `Node-0 (MiB)`.
fn metric_axis_label(node: &str) -> String {
    let mut chars = node.chars();
    match chars.next() {
        Some(first) => format!("{}{} (MiB)", first.to_uppercase(), chars.as_str()),
        None => "(MiB)".to_string(),
    }
}

/// Draw peak node metric against achieved load as a bar chart and save it as a PNG.
///
/// `points` are `(achieved_load, peak_metric)` pairs, drawn in the order given.
pub fn render_load_comparison(
    points: &[(f64, f64)],
    node: &str,
    path: &Path,
) -> Result<(), RenderError> {
    let layout = bar_layout(points);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(RenderError::drawing)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(layout.x_range.clone(), layout.y_range.clone())
        .map_err(RenderError::drawing)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Actual QPS")
        .y_desc(metric_axis_label(node))
        .draw()
        .map_err(RenderError::drawing)?;

    chart
        .draw_series(
            layout
                .bars
                .iter()
                .map(|corners| Rectangle::new(*corners, BLUE.filled())),
        )
        .map_err(RenderError::drawing)?;

    root.present().map_err(RenderError::drawing)?;
    log::info!("Wrote load comparison chart to {}", path.display());

    Ok(())
}
