use crate::store::{ShiurFields, ShiurStore, StoreError};
use crate::sync::extract::NormalizedEpisode;
use crate::sync::types::{ItemError, ItemErrorKind, SyncReport};
use crate::telemetry::ctx::LogCtx;
use crate::telemetry::ops::sync::SyncOp;

enum Written {
    Created,
    Updated,
}

/// Upsert a batch of normalized episodes. A bad item never aborts the
/// batch; every episode lands in exactly one of `synced` or `errors`.
pub async fn sync_episodes(
    store: &dyn ShiurStore,
    episodes: &[NormalizedEpisode],
    log: &LogCtx<SyncOp>,
) -> SyncReport {
    let mut report = SyncReport {
        total: episodes.len(),
        synced: Vec::new(),
        created: 0,
        updated: 0,
        errors: Vec::new(),
    };

    for episode in episodes {
        match sync_one(store, episode, log).await {
            Ok((guid, Written::Created)) => {
                report.created += 1;
                report.synced.push(guid);
            }
            Ok((guid, Written::Updated)) => {
                report.updated += 1;
                report.synced.push(guid);
            }
            Err(err) => report.errors.push(err),
        }
    }

    report
}

async fn sync_one(
    store: &dyn ShiurStore,
    episode: &NormalizedEpisode,
    log: &LogCtx<SyncOp>,
) -> Result<(String, Written), ItemError> {
    let audio_url = validate(episode, log)?;
    let guid = episode.guid.clone();

    let fields = ShiurFields {
        guid: guid.clone(),
        title: episode.title.clone(),
        description: episode.description.clone(),
        blurb: episode.blurb.clone(),
        audio_url: audio_url.to_string(),
        source_doc: episode.source_doc.clone(),
        pub_date: episode.pub_date,
        duration: episode.duration.clone(),
        link: episode.link.clone(),
    };

    let existing = store
        .find_by_guid(&guid)
        .await
        .map_err(|err| persistence(episode, err, log))?;

    if existing.is_some() {
        store
            .update(&guid, &fields)
            .await
            .map_err(|err| persistence(episode, err, log))?;
        log.info_kv("♻️ update", [("guid", guid.clone()), ("title", episode.title.clone())]);
        Ok((guid, Written::Updated))
    } else {
        store
            .create(&fields)
            .await
            .map_err(|err| persistence(episode, err, log))?;
        log.info_kv("➕ insert", [("guid", guid.clone()), ("title", episode.title.clone())]);
        Ok((guid, Written::Created))
    }
}

/// Reject items that cannot be stored. Returns the audio URL so the
/// caller does not re-unwrap it.
fn validate<'a>(
    episode: &'a NormalizedEpisode,
    log: &LogCtx<SyncOp>,
) -> Result<&'a str, ItemError> {
    let title_key = || {
        if episode.title.trim().is_empty() {
            "unknown".to_string()
        } else {
            episode.title.clone()
        }
    };

    if episode.degenerate_guid {
        log.warn_kv("↩️ skip", [("reason", "degenerate guid".to_string()), ("title", title_key())]);
        return Err(ItemError { guid: title_key(), kind: ItemErrorKind::DegenerateGuid });
    }
    if episode.guid.trim().len() < 3 {
        log.warn_kv("↩️ skip", [("reason", "missing guid".to_string()), ("title", title_key())]);
        return Err(ItemError { guid: title_key(), kind: ItemErrorKind::MissingField("guid") });
    }
    if episode.title.trim().is_empty() {
        log.warn_kv("↩️ skip", [("reason", "missing title".to_string()), ("guid", episode.guid.clone())]);
        return Err(ItemError {
            guid: episode.guid.clone(),
            kind: ItemErrorKind::MissingField("title"),
        });
    }
    match episode.audio_url.as_deref() {
        Some(url) if !url.trim().is_empty() => Ok(url),
        _ => {
            log.warn_kv("↩️ skip", [("reason", "missing audio".to_string()), ("guid", episode.guid.clone())]);
            Err(ItemError {
                guid: episode.guid.clone(),
                kind: ItemErrorKind::MissingField("audio URL"),
            })
        }
    }
}

fn persistence(episode: &NormalizedEpisode, err: StoreError, log: &LogCtx<SyncOp>) -> ItemError {
    log.error_kv(
        "❌ write failed",
        [("guid", episode.guid.clone()), ("error", err.to_string())],
    );
    ItemError {
        guid: episode.guid.clone(),
        kind: ItemErrorKind::Persistence(err.to_string()),
    }
}
