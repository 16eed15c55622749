use mesh_load_artifact_model::{parse_run_summary, RunSummary, SummaryError};

/// Decode a run summary and return it along with its achieved load.
///
/// The load is returned exactly as reported, with no rounding or unit conversion.
pub fn achieved_load(bytes: &[u8]) -> Result<(f64, RunSummary), SummaryError> {
    let summary = parse_run_summary(bytes)?;
    Ok((summary.actual_qps, summary))
}
