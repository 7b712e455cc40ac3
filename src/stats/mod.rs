use anyhow::Result;
use clap::Args;

use crate::store::ShiurStore;
use crate::telemetry::{self};
use crate::telemetry::ops::stats::Phase as StatsPhase;

#[derive(Args, Debug)]
pub struct StatsCmd {}

pub async fn run(store: &dyn ShiurStore, _args: StatsCmd) -> Result<()> {
    let log = telemetry::stats();
    let _g = log.root_span().entered();
    let _s = log.span(&StatsPhase::Summary).entered();

    let counts = store.summary_counts().await?;

    log.info(format!("📊 Shiurim: total={}", counts.shiurim));
    log.info(format!("  with source doc: {}", counts.with_source_doc));
    log.info(format!("  with platform links: {}", counts.with_platform_links));
    if counts.shiurim > 0 {
        let pct = counts.with_blurb as f64 * 100.0 / counts.shiurim as f64;
        log.info(format!(
            "📈 Blurb coverage: {}/{} ({:.1}%)",
            counts.with_blurb, counts.shiurim, pct
        ));
    }
    match (counts.earliest_pub_date, counts.latest_pub_date) {
        (Some(first), Some(last)) => log.info(format!(
            "📅 Published: {} to {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        )),
        _ => log.info("📅 Published: (none yet)"),
    }

    if telemetry::config::json_mode() {
        log.result(&counts)?;
    }
    Ok(())
}
