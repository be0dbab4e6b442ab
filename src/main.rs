use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eth_schema::{
    connect, initialize, BulkExporter, Dataset, DatabaseConfig, ExportOptions, NamedTarget,
    PoolExporter, RowConnector, SchemaProfile,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "eth-schema", about = "Bootstrap and load the Ethereum analytics databases")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the tables of a target database if they do not exist.
    Init {
        #[arg(long, value_enum)]
        target: NamedTarget,
        /// Defaults to the profile of the target.
        #[arg(long, value_enum)]
        profile: Option<SchemaProfile>,
    },
    /// Append the records of a JSON file to a table.
    Export {
        #[arg(long, value_enum)]
        target: NamedTarget,
        #[arg(long)]
        table: String,
        /// JSON array of flat objects, one per row.
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,
        /// Roll the whole export back if any batch fails.
        #[arg(long)]
        transactional: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Init { target, profile } => {
            let config = DatabaseConfig::from_env(target)?;
            let profile = profile.unwrap_or_else(|| target.default_profile());

            let mut conn = connect(&config).await?;
            initialize(&mut conn, profile).await?;
            conn.close().await?;
        }
        Command::Export {
            target,
            table,
            file,
            batch_size,
            transactional,
        } => {
            let config = DatabaseConfig::from_env(target)?;
            let contents = tokio::fs::read_to_string(&file).await?;
            let records: serde_json::Value = serde_json::from_str(&contents)?;
            let dataset = Dataset::from_json(records)?;
            info!(
                "Loaded {} rows x {} columns from {}",
                dataset.num_rows(),
                dataset.num_columns(),
                file.display()
            );

            let exporter = PoolExporter::new(ExportOptions {
                batch_size,
                transactional,
            });
            exporter.export_table(&dataset, &table, &config).await?;
        }
    }
    Ok(())
}
