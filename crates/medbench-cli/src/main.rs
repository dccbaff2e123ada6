use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use medbench_storage::PgFeeStore;
use medbench_sync::{report_recent_runs, SyncConfig, SyncPipeline};

#[derive(Debug, Parser)]
#[command(name = "medbench")]
#[command(about = "Medical fee-schedule sync pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run all enabled sources (or one) through extract, normalize, and
    /// reconcile.
    Sync {
        /// Restrict the run to a single source by its registry name.
        #[arg(long)]
        source: Option<String>,
    },
    /// List registered source adapters.
    Sources,
    /// Summarize the most recent sync runs.
    Report {
        #[arg(long, default_value_t = 5)]
        runs: usize,
    },
    /// Create the fee table and its composite uniqueness constraint.
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = SyncConfig::from_env();

    match cli.command.unwrap_or(Commands::Sync { source: None }) {
        Commands::Sync { source } => {
            let store = PgFeeStore::connect(&config.database_url, config.table.clone()).await?;
            let pipeline = SyncPipeline::new(config, Arc::new(store));
            let summary = pipeline.run_once(source.as_deref()).await?;
            println!(
                "sync complete: run_id={} sources={} inserted={} updated={} reports={}",
                summary.run_id,
                summary.enabled_sources,
                summary.total_inserted,
                summary.total_updated,
                summary.reports_dir
            );
            for report in &summary.sources {
                println!(
                    "  {}: {} (inserted {}, updated {}, failed {})",
                    report.source, report.status, report.inserted, report.updated, report.failed
                );
            }
        }
        Commands::Sources => {
            for name in [
                medbench_adapters::FAIR_HEALTH_FACILITY,
                medbench_adapters::FAIR_HEALTH_PHYSICIANS,
                medbench_adapters::MEDICARE_CLINICAL_FEES,
                medbench_adapters::MEDICARE_ASC_ADDENDA,
                medbench_adapters::NOVITAS,
                medbench_adapters::NEW_JERSEY_DOBI,
                medbench_adapters::HORIZON_ASC,
            ] {
                let geozip = medbench_adapters::adapter_for_source(name)
                    .map(|a| a.has_geozip())
                    .unwrap_or(false);
                println!(
                    "{name} ({})",
                    if geozip { "geozip" } else { "national" }
                );
            }
        }
        Commands::Report { runs } => {
            let digest = report_recent_runs(runs, Some(config.workspace_root))?;
            println!("{digest}");
        }
        Commands::Init => {
            let store = PgFeeStore::connect(&config.database_url, config.table.clone()).await?;
            store.ensure_schema().await?;
            println!("schema ready for table {}", config.table);
        }
    }

    Ok(())
}
