use crate::model::MetricPoint;
use crate::schema::{
    metric_table_schema, METRIC_NAME_COLUMN, METRIC_VALUE_COLUMN, NORMALIZED_TS_COLUMN,
    POD_COLUMN, TIMESTAMP_COLUMN,
};
use polars::prelude::*;

/// The long-form metric table, one row per pod, timestamp and metric.
#[derive(Debug, Clone)]
pub struct MetricTable {
    frame: DataFrame,
}

impl Default for MetricTable {
    fn default() -> Self {
        Self {
            frame: DataFrame::empty_with_schema(&metric_table_schema()),
        }
    }
}

impl MetricTable {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// The distinct metric names in the table, in order of first appearance.
    pub fn metric_names(&self) -> PolarsResult<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for name in self.frame.column(METRIC_NAME_COLUMN)?.str()?.into_iter().flatten() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Every row of the table, in order.
    ///
    /// Frames from [load_metric_frame](crate::schema::load_metric_frame) have no missing values,
    /// so a row with one is an error rather than something to skip.
    pub fn points(&self) -> PolarsResult<Vec<MetricPoint>> {
        let pods = self.frame.column(POD_COLUMN)?.str()?;
        let timestamps = self.frame.column(TIMESTAMP_COLUMN)?.str()?;
        let names = self.frame.column(METRIC_NAME_COLUMN)?.str()?;
        let values = self.frame.column(METRIC_VALUE_COLUMN)?.f64()?;
        let normalized = self.frame.column(NORMALIZED_TS_COLUMN)?.f64()?;

        pods.into_iter()
            .zip(timestamps)
            .zip(names)
            .zip(values)
            .zip(normalized)
            .enumerate()
            .map(|(row, ((((pod, timestamp), name), value), normalized_ts))| {
                match (pod, timestamp, name, value, normalized_ts) {
                    (
                        Some(pod),
                        Some(timestamp),
                        Some(name),
                        Some(metric_value),
                        Some(normalized_ts),
                    ) => Ok(MetricPoint {
                        kubernetes_pod_name: pod.to_string(),
                        timestamp: timestamp.to_string(),
                        metric_name: name.to_string(),
                        metric_value,
                        normalized_ts,
                    }),
                    _ => Err(PolarsError::ComputeError(
                        format!("Row {row} of the metric table has a missing value").into(),
                    )),
                }
            })
            .collect()
    }

    /// The rows for one metric, in order.
    pub fn points_for(&self, metric_name: &str) -> PolarsResult<Vec<MetricPoint>> {
        Ok(self
            .points()?
            .into_iter()
            .filter(|p| p.metric_name == metric_name)
            .collect())
    }
}

/// Stack normalised metric frames into one long-form table, in the order given.
///
/// Rows are kept as they are. Two sources that report the same pod, timestamp and metric both
/// appear in the result.
pub fn union_metric_frames<I>(frames: I) -> PolarsResult<MetricTable>
where
    I: IntoIterator<Item = DataFrame>,
{
    let mut table = MetricTable::default();
    for frame in frames {
        if frame.height() == 0 {
            continue;
        }
        table.frame.vstack_mut(&frame)?;
    }
    table.frame.as_single_chunk();

    log::debug!("Metric table has {} rows", table.height());

    Ok(table)
}
