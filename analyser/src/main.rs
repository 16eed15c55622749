use anyhow::anyhow;
use clap::Parser as _;
use mesh_load_analyser::render::open_in_viewer;
use mesh_load_analyser::report::{print_comparison, print_dashboard_summary, write_json_report};
use mesh_load_analyser::store::{DirectoryStore, S3Store};
use mesh_load_artifact_model::RunId;

use crate::cli::{CliArgs, Command};

mod cli;

const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = CliArgs::parse();
    log::info!("{CRATE_NAME} {CRATE_VERSION}");

    match args.command {
        Command::Mirror { dest, prefix } => {
            let bucket = args.store.bucket()?;
            let store = S3Store::connect(&args.store.s3_config()).await;
            let stats =
                mesh_load_analyser::execute_mirror(&store, bucket, &prefix, &dest).await?;
            println!(
                "Mirrored {} objects ({} bytes) into {}",
                stats.objects,
                stats.bytes,
                dest.display()
            );
        }
        Command::Compare {
            data_dir,
            skip_sync,
            node,
            series_file,
            output,
            report_dir,
            no_open,
            ignore_errors,
        } => {
            let report = if skip_sync {
                log::info!("Using {} without mirroring", data_dir.display());
                mesh_load_analyser::execute_comparison(&data_dir, &series_file, &node, &output)?
            } else {
                let bucket = args.store.bucket()?;
                let store = S3Store::connect(&args.store.s3_config()).await;
                mesh_load_analyser::execute_sync_and_comparison(
                    &store,
                    bucket,
                    &data_dir,
                    &series_file,
                    &node,
                    &output,
                )
                .await?
            };
            print_comparison(&report);
            write_json_report(&report, &report_dir)?;

            if !no_open {
                open_in_viewer(&output);
            }

            // Skipped runs are an error unless explicitly ignored
            if !report.skipped.is_empty() {
                let error_message = format!(
                    "{} out of {} runs could not be compared",
                    report.skipped.len(),
                    report.total_runs()
                );

                if ignore_errors {
                    log::warn!("{}", error_message);
                } else {
                    return Err(anyhow!(error_message));
                }
            }
        }
        Command::Dashboard {
            test_name,
            run_ts,
            output,
            no_open,
            from_dir,
        } => {
            let run_id = RunId::from_test_and_timestamp(&test_name, &run_ts);

            let summary = match from_dir {
                Some(dir) => {
                    let store = DirectoryStore::new(dir);
                    let bucket = store.root().display().to_string();
                    mesh_load_analyser::execute_dashboard(&store, &bucket, &run_id, &output)
                        .await?
                }
                None => {
                    let bucket = args.store.bucket()?;
                    let store = S3Store::connect(&args.store.s3_config()).await;
                    mesh_load_analyser::execute_dashboard(&store, bucket, &run_id, &output)
                        .await?
                }
            };
            print_dashboard_summary(&summary);

            if !no_open {
                open_in_viewer(&output);
            }
        }
    }

    Ok(())
}
