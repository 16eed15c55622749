mod comparison;
mod metric_table;

pub use comparison::{compare_runs, sort_pairs_by_load, LoadComparisonAggregator};
pub use metric_table::{union_metric_frames, MetricTable};
