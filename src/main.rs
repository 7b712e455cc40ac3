use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::env;

mod init;
mod shiur;
mod stats;
mod store;
mod sync;
mod telemetry;
mod videos;

use store::sqlite::SqliteStore;

#[derive(Parser)]
#[command(name = "shiurcast", about = "Shiur catalog CLI")]
struct Cli {
    /// SQLite database path; defaults to SHIURCAST_DB or shiurcast.db
    #[arg(global = true, long)]
    db: Option<String>,
    /// Print the op result as one JSON envelope on stdout (logs stay on stderr)
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Init(init::InitCmd),
    Sync(sync::SyncCmd),
    Shiur(shiur::ShiurCmd),
    Stats(stats::StatsCmd),
    Videos(videos::VideosCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    telemetry::config::init_tracing();
    let db_path = cli
        .db
        .or_else(|| env::var("SHIURCAST_DB").ok())
        .unwrap_or_else(|| "shiurcast.db".to_string());

    let store = SqliteStore::connect(&db_path).await?;

    match cli.command {
        Commands::Init(args) => init::run(&store, &db_path, args).await?,
        Commands::Sync(args) => sync::run(&store, args).await?,
        Commands::Shiur(args) => shiur::run(&store, args).await?,
        Commands::Stats(args) => stats::run(&store, args).await?,
        Commands::Videos(args) => videos::run(args).await?,
    }

    Ok(())
}
