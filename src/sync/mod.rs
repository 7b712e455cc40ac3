use anyhow::{bail, Result};
use clap::Args;
use reqwest::Client;
use std::time::Instant;
use url::Url;

use crate::store::{ShiurStore, StoreError};
use crate::telemetry::{self};
use crate::telemetry::ctx::LogCtx;
use crate::telemetry::ops::sync::{Phase as SyncPhase, SyncOp};

mod engine;
pub mod extract;
mod fetch;
mod parse;
mod types;

pub(crate) use parse::parse_date;
pub use types::SyncError;

use extract::NormalizedEpisode;
use parse::RawItem;
use types::{SyncPlan, SyncReport, SyncSummary};

#[derive(Args)]
pub struct SyncCmd {
    /// Feed URL; falls back to SHIURCAST_FEED_URL
    #[arg(long)]
    pub feed: Option<String>,
    /// Only process the first N feed items
    #[arg(long)]
    pub limit: Option<usize>,
    #[arg(long, default_value_t = false)]
    pub apply: bool,
}

pub async fn run(store: &dyn ShiurStore, args: SyncCmd) -> Result<()> {
    let log = telemetry::sync();

    let feed_url = match args.feed.clone().or_else(|| std::env::var("SHIURCAST_FEED_URL").ok()) {
        Some(url) if !url.trim().is_empty() => url,
        _ => bail!("No feed URL. Pass --feed or set SHIURCAST_FEED_URL."),
    };
    if Url::parse(&feed_url).is_err() {
        bail!("Invalid feed URL: {feed_url}");
    }

    let _g = log
        .root_span_kv([
            ("apply", args.apply.to_string()),
            ("feed_url", feed_url.clone()),
            ("limit", format!("{:?}", args.limit)),
        ])
        .entered();

    if !args.apply {
        let counts = store.summary_counts().await?;
        if telemetry::config::json_mode() {
            let plan = SyncPlan {
                feed_url: feed_url.clone(),
                limit: args.limit,
                episodes_on_record: counts.shiurim,
            };
            log.plan(&plan)?;
        } else {
            let limit = args
                .limit
                .map(|n| n.to_string())
                .unwrap_or_else(|| "all".to_string());
            log.info(format!("📝 Sync plan — feed={feed_url} limit={limit}"));
            log.info(format!("  episodes on record: {}", counts.shiurim));
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    let started = Instant::now();
    let client = fetch::http_client()?;
    log.info(format!("🔄 Starting RSS sync from {feed_url}"));

    match run_sync(&client, store, &feed_url, args.limit, &log).await {
        Ok(report) => {
            log.info(format!(
                "✅ Sync complete: {} synced, {} errors out of {} total",
                report.synced.len(),
                report.errors.len(),
                report.total
            ));
            for err in report.errors.iter().take(5) {
                log.info(format!("  ❌ {err}"));
            }
            if let Some(guid) = report.synced.first() {
                log.info(format!("  ✨ e.g. {guid}"));
            }
            log.totals(report.created, report.updated, report.errors.len());

            if telemetry::config::json_mode() {
                let summary = SyncSummary::from_report(&report);
                log.result_timed(&summary, started.elapsed().as_millis())?;
            }
            Ok(())
        }
        Err(err) => {
            log.error(format!("❌ Sync failed: {err}"));
            Err(err.into())
        }
    }
}

/// One full sync pass: ping, fetch, parse, extract, write. The store
/// ping comes first so a dead database aborts before any network talk.
pub(crate) async fn run_sync(
    client: &Client,
    store: &dyn ShiurStore,
    feed_url: &str,
    limit: Option<usize>,
    log: &LogCtx<SyncOp>,
) -> Result<SyncReport, SyncError> {
    {
        let _s = log.span(&SyncPhase::Ping).entered();
        store.ping().await.map_err(|err| {
            SyncError::StoreUnavailable(match err {
                StoreError::Unavailable(why) => why,
                other => other.to_string(),
            })
        })?;
    }

    let xml = {
        let _s = log
            .span_kv(&SyncPhase::FetchFeed, [("url", feed_url.to_string())])
            .entered();
        fetch::fetch_feed(client, feed_url)
            .await
            .map_err(|err| SyncError::FeedUnavailable(format!("{err:#}")))?
    };

    let items = {
        let _s = log.span(&SyncPhase::ParseFeed).entered();
        parse::parse_items(&xml).map_err(|err| SyncError::FeedUnavailable(format!("{err:#}")))?
    };

    let episodes = {
        let _s = log
            .span_kv(&SyncPhase::Extract, [("items", items.len().to_string())])
            .entered();
        normalize(&items, limit)
    };

    let report = {
        let _s = log
            .span_kv(&SyncPhase::WriteItems, [("episodes", episodes.len().to_string())])
            .entered();
        engine::sync_episodes(store, &episodes, log).await
    };

    Ok(report)
}

fn normalize(items: &[RawItem], limit: Option<usize>) -> Vec<NormalizedEpisode> {
    let cap = limit.unwrap_or(items.len());
    items.iter().take(cap).map(extract::extract_episode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem::MemStore;
    use bytes::Bytes;

    // Three items: one complete, one with no audio at all, and a
    // repeat of the first guid under a new title.
    const FEED_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Weekly Shiurim</title>
    <link>https://example.com</link>
    <description>Classes</description>
    <item>
      <title>Bereishit</title>
      <guid isPermaLink="false">ep-001</guid>
      <description>&lt;p&gt;In the beginning: a close read of the first aliyah.&lt;/p&gt;</description>
      <enclosure url="https://cdn.example.com/001.mp3" length="1" type="audio/mpeg"/>
      <pubDate>Fri, 25 Oct 2024 09:00:00 +0000</pubDate>
    </item>
    <item>
      <title>Noach</title>
      <guid isPermaLink="false">ep-002</guid>
      <description>&lt;p&gt;No recording was published for this one.&lt;/p&gt;</description>
      <pubDate>Fri, 01 Nov 2024 09:00:00 +0000</pubDate>
    </item>
    <item>
      <title>Bereishit (expanded edition)</title>
      <guid isPermaLink="false">ep-001</guid>
      <description>&lt;p&gt;The same opening shiur, re-recorded with better audio.&lt;/p&gt;</description>
      <enclosure url="https://cdn.example.com/001b.mp3" length="1" type="audio/mpeg"/>
      <pubDate>Fri, 08 Nov 2024 09:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn dead_store_aborts_before_any_network_call() {
        let store = MemStore::new();
        store.set_down(true);
        let log = telemetry::sync();
        let client = fetch::http_client().unwrap();

        // port 1 on loopback: the request would fail loudly if it were
        // ever attempted
        let err = run_sync(&client, &store, "http://127.0.0.1:1/feed.xml", None, &log)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::StoreUnavailable(_)));
        assert_eq!(store.calls(), vec!["ping".to_string()]);
    }

    #[tokio::test]
    async fn fixture_feed_lands_in_the_store_with_the_later_duplicate_winning() {
        let store = MemStore::new();
        let log = telemetry::sync();

        let xml = Bytes::from_static(FEED_FIXTURE.as_bytes());
        let items = parse::parse_items(&xml).unwrap();
        let episodes = normalize(&items, None);
        let report = engine::sync_episodes(&store, &episodes, &log).await;

        assert_eq!(report.total, 3);
        assert_eq!(report.synced, vec!["ep-001".to_string(), "ep-001".to_string()]);
        assert_eq!((report.created, report.updated), (1, 1));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].guid, "ep-002");
        assert_eq!(
            report.errors[0].kind,
            types::ItemErrorKind::MissingField("audio URL")
        );
        assert_eq!(report.synced.len() + report.errors.len(), report.total);

        // the repeated guid overwrote the first row instead of adding one
        assert_eq!(store.row_count(), 1);
        let row = store.find_by_guid("ep-001").await.unwrap().unwrap();
        assert_eq!(row.title, "Bereishit (expanded edition)");
        assert_eq!(row.audio_url, "https://cdn.example.com/001b.mp3");
        assert_eq!(
            row.blurb.as_deref(),
            Some("The same opening shiur, re-recorded with better audio.")
        );
    }

    #[test]
    fn limit_caps_the_batch() {
        let xml = Bytes::from_static(FEED_FIXTURE.as_bytes());
        let items = parse::parse_items(&xml).unwrap();
        assert_eq!(normalize(&items, Some(1)).len(), 1);
        assert_eq!(normalize(&items, Some(10)).len(), 3);
        assert_eq!(normalize(&items, None).len(), 3);
    }
}
