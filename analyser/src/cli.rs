use clap::{Args, Parser, Subcommand};
use mesh_load_analyser::store::S3StoreConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, long_about = None)]
pub struct CliArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct StoreArgs {
    /// Bucket the load test artifacts are stored in.
    #[arg(long, global = true, env = "LOAD_TEST_BUCKET")]
    pub bucket: Option<String>,

    /// AWS region of the bucket.
    #[arg(long, global = true, env = "AWS_REGION", default_value = "us-west-2")]
    pub region: String,

    /// Custom S3 endpoint, for S3 compatible stores.
    #[arg(long, global = true, env = "AWS_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,
}

impl StoreArgs {
    pub fn bucket(&self) -> anyhow::Result<&str> {
        self.bucket.as_deref().ok_or_else(|| {
            anyhow::anyhow!("No bucket given, pass --bucket or set LOAD_TEST_BUCKET")
        })
    }

    pub fn s3_config(&self) -> S3StoreConfig {
        S3StoreConfig {
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Copy every object in the bucket into a local directory.
    Mirror {
        /// Directory to mirror into.
        #[arg(long, default_value = "data")]
        dest: PathBuf,

        /// Only mirror objects under this prefix.
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Chart the peak memory of a node against the achieved load of every run.
    Compare {
        /// Directory holding the mirrored runs.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Use the data directory as it is instead of mirroring the bucket into it first.
        #[arg(long, default_value = "false")]
        skip_sync: bool,

        /// Node whose metric is compared.
        #[arg(long, default_value = "node-0")]
        node: String,

        /// Name of the per-node metric table in each run.
        #[arg(long, default_value = "envoy_memory_MB_by_replica_set.csv")]
        series_file: String,

        /// Where to write the chart.
        #[arg(long, default_value = "load_vs_memory.png")]
        output: PathBuf,

        /// Directory to write the JSON report to.
        #[arg(long, default_value = ".")]
        report_dir: PathBuf,

        /// Do not open the chart once it is written.
        #[arg(long, default_value = "false")]
        no_open: bool,

        /// Succeed even if some runs could not be compared.
        #[arg(long, env = "IGNORE_ANALYSIS_ERRORS", default_value = "false")]
        ignore_errors: bool,
    },

    /// Build an interactive dashboard of the request rates of one run.
    Dashboard {
        /// Name of the test, the first part of the run prefix.
        test_name: String,

        /// Timestamp of the run, the second part of the run prefix.
        run_ts: String,

        /// Where to write the dashboard.
        #[arg(long, default_value = "viz.html")]
        output: PathBuf,

        /// Do not open the dashboard once it is written.
        #[arg(long, default_value = "false")]
        no_open: bool,

        /// Read a previously mirrored directory instead of the bucket.
        #[arg(long)]
        from_dir: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_takes_test_and_timestamp() {
        let args = CliArgs::try_parse_from([
            "mesh-load-analyser",
            "--bucket",
            "load-results",
            "dashboard",
            "fishapp-load/",
            "2021-06-01T10:00/",
            "--no-open",
        ])
        .expect("valid arguments");

        assert_eq!(args.store.bucket.as_deref(), Some("load-results"));
        match args.command {
            Command::Dashboard {
                test_name,
                run_ts,
                output,
                no_open,
                from_dir,
            } => {
                assert_eq!(test_name, "fishapp-load/");
                assert_eq!(run_ts, "2021-06-01T10:00/");
                assert_eq!(output, PathBuf::from("viz.html"));
                assert!(no_open);
                assert!(from_dir.is_none());
            }
            _ => panic!("Expected the dashboard command"),
        }
    }

    #[test]
    fn compare_defaults() {
        let args = CliArgs::try_parse_from(["mesh-load-analyser", "compare", "--region", "eu-west-1"])
            .expect("valid arguments");

        assert_eq!(args.store.region, "eu-west-1");
        match args.command {
            Command::Compare {
                data_dir,
                node,
                series_file,
                output,
                skip_sync,
                ..
            } => {
                assert_eq!(data_dir, PathBuf::from("data"));
                assert_eq!(node, "node-0");
                assert_eq!(series_file, "envoy_memory_MB_by_replica_set.csv");
                assert_eq!(output, PathBuf::from("load_vs_memory.png"));
                assert!(!skip_sync);
            }
            _ => panic!("Expected the compare command"),
        }
    }
}
