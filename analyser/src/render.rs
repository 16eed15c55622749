use polars::error::PolarsError;
use thiserror::Error;

mod bar_chart;
mod dashboard;
mod viewer;

pub use bar_chart::{bar_layout, render_load_comparison, BarLayout, BAR_WIDTH};
pub use dashboard::{build_dashboard_spec, write_dashboard, DASHBOARD_METRICS, SELECTION_PARAM};
pub use viewer::open_in_viewer;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to draw chart: {0}")]
    Drawing(String),
    #[error("Failed to read metric table: {0}")]
    Frame(#[from] PolarsError),
    #[error("Failed to encode chart: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    fn drawing(e: impl std::fmt::Display) -> Self {
        RenderError::Drawing(e.to_string())
    }
}
