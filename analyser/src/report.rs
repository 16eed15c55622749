use crate::model::{ComparisonReport, DashboardSummary};
use anyhow::Context;
use chrono::Utc;
use std::fs::File;
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ComparedRow {
    #[tabled(rename = "Run")]
    run_id: String,
    #[tabled(rename = "Actual QPS")]
    #[tabled(display = "float2")]
    achieved_load: f64,
    #[tabled(rename = "Requested QPS")]
    requested_load: String,
    #[tabled(rename = "Peak")]
    #[tabled(display = "float2")]
    peak_metric: f64,
}

#[derive(Tabled)]
struct SkippedRow {
    #[tabled(rename = "Skipped run")]
    run_id: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}

/// Render the compared and skipped runs as terminal tables.
pub fn comparison_table(report: &ComparisonReport) -> String {
    let compared = report
        .pairs
        .iter()
        .map(|pair| ComparedRow {
            run_id: pair.run_id.to_string(),
            achieved_load: pair.achieved_load,
            requested_load: match &pair.summary.requested_qps {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(value) => value.to_string(),
                None => "-".to_string(),
            },
            peak_metric: pair.peak_metric,
        })
        .collect::<Vec<_>>();

    let mut out = format!("Peak {} by achieved load\n", report.node);
    let mut table = Table::new(&compared);
    table.with(Style::modern());
    out.push_str(&table.to_string());

    if !report.skipped.is_empty() {
        let skipped = report
            .skipped
            .iter()
            .map(|s| SkippedRow {
                run_id: s.run_id.to_string(),
                reason: s.reason.clone(),
            })
            .collect::<Vec<_>>();
        let mut table = Table::new(&skipped);
        table.with(Style::modern());
        out.push('\n');
        out.push_str(&table.to_string());
    }

    out
}

pub fn print_comparison(report: &ComparisonReport) {
    println!("\n{}", comparison_table(report));
}

/// Print what went into a dashboard.
pub fn print_dashboard_summary(summary: &DashboardSummary) {
    println!(
        "\nDashboard{}: {} rows from {} tables ({} empty, {} skipped, placeholder column removed from {})",
        summary
            .run_id
            .as_ref()
            .map(|id| format!(" for {id}"))
            .unwrap_or_default(),
        summary.rows,
        summary.frames_used,
        summary.frames_empty,
        summary.frames_skipped.len(),
        summary.placeholder_removals,
    );

    if !summary.frames_skipped.is_empty() {
        let skipped = summary
            .frames_skipped
            .iter()
            .map(|s| SkippedRow {
                run_id: s.origin.clone(),
                reason: s.reason.clone(),
            })
            .collect::<Vec<_>>();
        let mut table = Table::new(&skipped);
        table.with(Style::modern());
        println!("{table}");
    }
}

/// Write the comparison as pretty JSON to a new, timestamped file in `dir`.
pub fn write_json_report(report: &ComparisonReport, dir: &Path) -> anyhow::Result<PathBuf> {
    let path = dir.join(format!(
        "load-comparison-{}.json",
        Utc::now().format("%Y-%m-%dT%H.%M.%S%.fZ")
    ));
    let file = File::create_new(&path)
        .with_context(|| format!("Failed to create report {}", path.display()))?;
    serde_json::to_writer_pretty(file, report)?;

    log::info!("Wrote comparison report to {}", path.display());

    Ok(path)
}
