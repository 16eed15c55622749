use super::RenderError;
use crate::aggregator::MetricTable;
use crate::schema::{METRIC_NAME_COLUMN, METRIC_VALUE_COLUMN, NORMALIZED_TS_COLUMN, POD_COLUMN};
use serde_json::{json, Value};
use std::path::Path;

/// The metrics shown on the dashboard, top chart first.
pub const DASHBOARD_METRICS: [&str; 3] = [
    "envoy_ingress_rate_by_replica_set",
    "envoy_2xx_requests_rate_by_replica_set",
    "envoy_5xx_requests_rate_by_replica_set",
];

/// Name of the legend selection shared by every chart.
pub const SELECTION_PARAM: &str = "pod_selection";

const DATASET_NAME: &str = "metrics";
const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

fn view_name(index: usize) -> String {
    format!("chart_{}", index + 1)
}

/// One line chart of a single metric, one line per pod.
fn metric_chart(index: usize, metric_name: &str) -> Value {
    json!({
        "name": view_name(index),
        "title": metric_name,
        "data": { "name": DATASET_NAME },
        "transform": [
            { "filter": { "field": METRIC_NAME_COLUMN, "equal": metric_name } }
        ],
        "mark": "line",
        "encoding": {
            "x": { "field": NORMALIZED_TS_COLUMN, "type": "quantitative" },
            "y": { "field": METRIC_VALUE_COLUMN, "type": "quantitative" },
            "color": { "field": POD_COLUMN, "type": "nominal" },
            "tooltip": [
                { "field": POD_COLUMN, "type": "nominal" },
                { "field": NORMALIZED_TS_COLUMN, "type": "quantitative" },
                { "field": METRIC_VALUE_COLUMN, "type": "quantitative" }
            ],
            "opacity": {
                "condition": { "param": SELECTION_PARAM, "value": 1 },
                "value": 0.2
            }
        }
    })
}

/// Build the Vega-Lite document describing the dashboard.
///
/// The first chart sits above the other two, which are side by side. Clicking a pod in any
/// legend highlights that pod in every chart.
pub fn build_dashboard_spec(table: &MetricTable) -> Result<Value, RenderError> {
    for name in table.metric_names()? {
        if !DASHBOARD_METRICS.contains(&name.as_str()) {
            log::info!("Metric {name} is not shown on the dashboard");
        }
    }

    let mut rows = Vec::new();
    for metric_name in DASHBOARD_METRICS {
        let points = table.points_for(metric_name)?;
        if points.is_empty() {
            log::warn!("No data for {metric_name}, its chart will be empty");
        }
        rows.extend(points);
    }

    let [top, left, right] = [0, 1, 2].map(|index| metric_chart(index, DASHBOARD_METRICS[index]));

    Ok(json!({
        "$schema": VEGA_LITE_SCHEMA,
        "datasets": { DATASET_NAME: rows },
        "params": [{
            "name": SELECTION_PARAM,
            "select": { "type": "point", "fields": [POD_COLUMN] },
            "bind": "legend",
            "views": (0..DASHBOARD_METRICS.len()).map(view_name).collect::<Vec<_>>()
        }],
        "vconcat": [
            top,
            { "hconcat": [left, right] }
        ]
    }))
}

/// Wrap a Vega-Lite document in a standalone HTML page.
fn dashboard_html(spec: &Value) -> Result<String, RenderError> {
    // A literal `</` would end the script element early
    let spec = serde_json::to_string(spec)?.replace("</", "<\\/");

    Ok(format!(
        r##"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <script src="https://cdn.jsdelivr.net/npm/vega@5"></script>
  <script src="https://cdn.jsdelivr.net/npm/vega-lite@5"></script>
  <script src="https://cdn.jsdelivr.net/npm/vega-embed@6"></script>
</head>
<body>
  <div id="vis"></div>
  <script type="text/javascript">
    vegaEmbed("#vis", {spec}).catch(console.error);
  </script>
</body>
</html>
"##
    ))
}

/// Write the dashboard for `table` as a single HTML document.
pub fn write_dashboard(table: &MetricTable, path: &Path) -> Result<(), RenderError> {
    let spec = build_dashboard_spec(table)?;
    let html = dashboard_html(&spec)?;
    std::fs::write(path, html)?;
    log::info!("Wrote dashboard to {}", path.display());
    Ok(())
}
