//! The long-form metric table and the per-metric source tables it is built from.
//!
//! Source tables have one metric column, named after the metric, in second-to-last position:
//!
//! | `metric.kubernetes_pod_name` | `timestamp` | `<metric name>` | `normalized_ts` |
//! |---|---|---|---|
//!
//! Each is normalised into the long-form columns listed in [METRIC_TABLE_COLUMNS], with the
//! metric name moved into a column of its own so tables for different metrics can be stacked.

use crate::frame::{load_text_table, LoadError};
use polars::prelude::*;
use thiserror::Error;

pub const POD_SOURCE_COLUMN: &str = "metric.kubernetes_pod_name";
pub const POD_COLUMN: &str = "kubernetes_pod_name";
pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const METRIC_NAME_COLUMN: &str = "metric_name";
pub const METRIC_VALUE_COLUMN: &str = "metric_value";
pub const NORMALIZED_TS_COLUMN: &str = "normalized_ts";

/// A templated column left in some exports by the upstream query tooling.
///
/// It never carries data and is dropped by [strip_placeholder_column].
pub const PLACEHOLDER_COLUMN: &str = "metric.<rollup_column>";

/// Columns of the long-form metric table, in order.
pub const METRIC_TABLE_COLUMNS: [&str; 5] = [
    POD_COLUMN,
    TIMESTAMP_COLUMN,
    METRIC_NAME_COLUMN,
    METRIC_VALUE_COLUMN,
    NORMALIZED_TS_COLUMN,
];

/// Source columns every metric table must have besides the metric column itself.
const REQUIRED_SOURCE_COLUMNS: [&str; 3] =
    [POD_SOURCE_COLUMN, TIMESTAMP_COLUMN, NORMALIZED_TS_COLUMN];

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Expected at least 4 columns, found {found}")]
    TooFewColumns { found: usize },
    #[error("Missing required column {column:?}")]
    MissingColumn { column: String },
    #[error("Unexpected column {column:?}")]
    UnexpectedColumn { column: String },
    #[error("Column {column:?} is in the metric position but is not a metric")]
    NotAMetricColumn { column: String },
    #[error("Column {column:?} has no value in {rows} rows")]
    MissingValues { column: String, rows: usize },
    #[error("Values do not match the expected types: {0}")]
    InvalidValue(#[from] PolarsError),
}

/// The schema of the long-form metric table.
pub fn metric_table_schema() -> Schema {
    Schema::from_iter([
        Field::new(POD_COLUMN.into(), DataType::String),
        Field::new(TIMESTAMP_COLUMN.into(), DataType::String),
        Field::new(METRIC_NAME_COLUMN.into(), DataType::String),
        Field::new(METRIC_VALUE_COLUMN.into(), DataType::Float64),
        Field::new(NORMALIZED_TS_COLUMN.into(), DataType::Float64),
    ])
}

/// One source table, normalised to the long-form schema.
#[derive(Debug, Clone)]
pub struct MetricFrame {
    /// Where the table came from, usually the object key
    pub origin: String,
    pub metric_name: String,
    /// Rows in long form, see [METRIC_TABLE_COLUMNS]
    pub frame: DataFrame,
    /// Whether the placeholder column had to be removed
    pub placeholder_removed: bool,
}

/// Compatibility shim for exports that still carry [PLACEHOLDER_COLUMN].
///
/// Returns whether the column was present. Removal is logged so that its disappearance
/// upstream can be noticed, after which this shim can go.
pub fn strip_placeholder_column(frame: &mut DataFrame, origin: &str) -> bool {
    match frame.drop_in_place(PLACEHOLDER_COLUMN) {
        Ok(_) => {
            log::warn!("Dropped placeholder column {PLACEHOLDER_COLUMN:?} from {origin}");
            true
        }
        Err(_) => false,
    }
}

/// Load a per-metric table and normalise it to the long-form schema.
///
/// The metric name is the header of the second-to-last column. Returns [None] when the table
/// has no rows with a metric value, since such a table contributes nothing.
pub fn load_metric_frame(bytes: &[u8], origin: &str) -> Result<Option<MetricFrame>, SchemaError> {
    let mut frame = match load_text_table(bytes, true) {
        Ok(frame) => frame,
        Err(LoadError::Empty) => {
            log::debug!("Skipping empty table {origin}");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let columns = frame
        .get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>();
    if columns.len() < 4 {
        return Err(SchemaError::TooFewColumns {
            found: columns.len(),
        });
    }
    let metric_name = columns[columns.len() - 2].clone();
    if REQUIRED_SOURCE_COLUMNS.contains(&metric_name.as_str()) || metric_name == PLACEHOLDER_COLUMN
    {
        return Err(SchemaError::NotAMetricColumn {
            column: metric_name,
        });
    }

    let placeholder_removed = strip_placeholder_column(&mut frame, origin);

    for required in REQUIRED_SOURCE_COLUMNS {
        if !columns.iter().any(|c| c == required) {
            return Err(SchemaError::MissingColumn {
                column: required.to_string(),
            });
        }
    }
    if let Some(unexpected) = columns.iter().find(|c| {
        *c != &metric_name
            && c.as_str() != PLACEHOLDER_COLUMN
            && !REQUIRED_SOURCE_COLUMNS.contains(&c.as_str())
    }) {
        return Err(SchemaError::UnexpectedColumn {
            column: unexpected.clone(),
        });
    }

    if frame.height() == 0 {
        log::debug!("Skipping table without rows {origin}");
        return Ok(None);
    }

    let frame = frame
        .lazy()
        .with_column(lit(metric_name.as_str()).alias(METRIC_NAME_COLUMN))
        .select([
            col(POD_SOURCE_COLUMN).alias(POD_COLUMN),
            col(TIMESTAMP_COLUMN),
            col(METRIC_NAME_COLUMN),
            col(metric_name.as_str())
                .strict_cast(DataType::Float64)
                .alias(METRIC_VALUE_COLUMN),
            col(NORMALIZED_TS_COLUMN).strict_cast(DataType::Float64),
        ])
        .filter(col(METRIC_VALUE_COLUMN).is_not_null())
        .collect()?;

    if frame.height() == 0 {
        log::debug!("No metric values in {origin}");
        return Ok(None);
    }

    // Only the metric value may be missing, and those rows are gone
    for column in [POD_COLUMN, TIMESTAMP_COLUMN, NORMALIZED_TS_COLUMN] {
        let rows = frame.column(column)?.null_count();
        if rows > 0 {
            return Err(SchemaError::MissingValues {
                column: column.to_string(),
                rows,
            });
        }
    }

    Ok(Some(MetricFrame {
        origin: origin.to_string(),
        metric_name,
        frame,
        placeholder_removed,
    }))
}
