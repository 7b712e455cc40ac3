use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::store::sqlite::SqliteStore;
use crate::store::ShiurStore;
use crate::telemetry::{self};
use crate::telemetry::ops::init::Phase as InitPhase;

#[derive(Args)]
pub struct InitCmd {}

#[derive(Serialize)]
struct InitResult {
    db_path: String,
    shiurim: i64,
    platform_links: i64,
}

/// Create the database file and schema, then report what is in it.
/// Safe to run against an existing database.
pub async fn run(store: &SqliteStore, db_path: &str, _args: InitCmd) -> Result<()> {
    let log = telemetry::init();
    let _g = log.root_span_kv([("db", db_path.to_string())]).entered();

    {
        let _s = log.span(&InitPhase::Open).entered();
        store.ping().await?;
    }
    {
        let _s = log.span(&InitPhase::Schema).entered();
        store.ensure_schema().await?;
    }

    let counts = store.summary_counts().await?;
    log.info(format!("✅ Database ready at {db_path}"));
    log.info(format!(
        "  shiurim={} platform_links={}",
        counts.shiurim, counts.with_platform_links
    ));

    if telemetry::config::json_mode() {
        let result = InitResult {
            db_path: db_path.to_string(),
            shiurim: counts.shiurim,
            platform_links: counts.with_platform_links,
        };
        log.result(&result)?;
    }
    Ok(())
}
