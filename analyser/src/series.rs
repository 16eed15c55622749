use crate::frame::{load_text_table, LoadError};
use polars::prelude::*;
use thiserror::Error;

/// Column holding the pod or node identity in a headerless table.
const NODE_COLUMN: &str = "column_1";
/// Column holding the metric value in a headerless table.
const VALUE_COLUMN: &str = "column_3";

#[derive(Error, Debug)]
pub enum SeriesError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Expected at least 3 columns, found {found}")]
    TooFewColumns { found: usize },
    #[error("No rows found for node {node:?}")]
    NoMatchingRows { node: String },
    #[error("Value {value:?} for node {node:?} is not a number")]
    InvalidValue { node: String, value: String },
    #[error("Failed to filter table: {0}")]
    Frame(#[from] PolarsError),
}

/// Find the peak of a node's metric in a per-node metric table.
///
/// Every row is treated as data, so a header row is simply a row that does not match. Rows
/// whose first column contains `node` are kept and their third column is compared numerically.
///
/// Finding no matching rows is an error, as is a matching row whose value is not a number.
pub fn peak_node_metric(bytes: &[u8], node: &str) -> Result<f64, SeriesError> {
    let frame = load_text_table(bytes, false)?;
    if frame.width() < 3 {
        return Err(SeriesError::TooFewColumns {
            found: frame.width(),
        });
    }

    let matching = frame
        .lazy()
        .select([col(NODE_COLUMN), col(VALUE_COLUMN)])
        .filter(col(NODE_COLUMN).str().contains_literal(lit(node)))
        .collect()?;
    log::trace!("Rows for {node}: {}", matching);

    if matching.height() == 0 {
        return Err(SeriesError::NoMatchingRows {
            node: node.to_string(),
        });
    }

    let mut peak = f64::NEG_INFINITY;
    for value in matching.column(VALUE_COLUMN)?.str()?.into_iter() {
        let raw = value.unwrap_or_default();
        let parsed = raw
            .parse::<f64>()
            .map_err(|_| SeriesError::InvalidValue {
                node: node.to_string(),
                value: raw.to_string(),
            })?;
        peak = peak.max(parsed);
    }

    Ok(peak)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMORY_TABLE: &str = "\
metric.kubernetes_pod_name,timestamp,envoy_memory_MB_by_replica_set,normalized_ts
ip-10-0-0-1.node-0.internal,2021-06-01T10:00:00Z,  412.5,0
ip-10-0-0-1.node-0.internal,2021-06-01T10:00:10Z,  512.3,10
ip-10-0-0-2.node-1.internal,2021-06-01T10:00:00Z,  999.0,0
ip-10-0-0-1.node-0.internal,2021-06-01T10:00:20Z,  98.1,20
";

    #[test]
    fn peak_is_numeric_maximum_of_matching_rows() -> anyhow::Result<()> {
        // As strings "98.1" would sort above "512.3"
        let peak = peak_node_metric(MEMORY_TABLE.as_bytes(), "node-0")?;
        assert_eq!(peak, 512.3);
        Ok(())
    }

    #[test]
    fn other_nodes_are_ignored() -> anyhow::Result<()> {
        let peak = peak_node_metric(MEMORY_TABLE.as_bytes(), "node-1")?;
        assert_eq!(peak, 999.0);
        Ok(())
    }

    #[test]
    fn single_matching_row_is_returned_exactly() -> anyhow::Result<()> {
        let peak = peak_node_metric(b"pod-node-0,t0,768.9\npod-node-1,t0,1.0\n", "node-0")?;
        assert_eq!(peak, 768.9);
        Ok(())
    }

    #[test]
    fn unknown_node_is_an_error() {
        let result = peak_node_metric(MEMORY_TABLE.as_bytes(), "node-7");
        assert!(matches!(result, Err(SeriesError::NoMatchingRows { node }) if node == "node-7"));
    }

    #[test]
    fn narrow_table_is_an_error() {
        let result = peak_node_metric(b"node-0,1\nnode-0,2\n", "node-0");
        assert!(matches!(result, Err(SeriesError::TooFewColumns { found: 2 })));
    }

    #[test]
    fn non_numeric_value_is_an_error() {
        let result = peak_node_metric(b"node-0,t0,12\nnode-0,t1,lots\n", "node-0");
        assert!(
            matches!(result, Err(SeriesError::InvalidValue { value, .. }) if value == "lots")
        );
    }

    #[test]
    fn empty_table_is_an_error() {
        let result = peak_node_metric(b"", "node-0");
        assert!(matches!(result, Err(SeriesError::Load(LoadError::Empty))));
    }
}
