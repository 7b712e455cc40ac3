use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Args, Subcommand};

use crate::store::{PlatformLinkFields, ShiurFields, ShiurStore};
use crate::sync::{self, extract};
use crate::telemetry::{self};
use crate::telemetry::ops::shiur::Phase as ShiurPhase;

pub mod types;

/// shiurcast shiur ls/show/add/edit/rm/links
#[derive(Args)]
pub struct ShiurCmd {
    #[command(subcommand)]
    pub cmd: ShiurSub,
}

#[derive(Subcommand)]
pub enum ShiurSub {
    /// List shiurim, newest first
    Ls {
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Show one shiur with its platform links
    Show { id_or_guid: String },
    /// Add a shiur by hand (plan-only by default; use --apply to write)
    Add(AddArgs),
    /// Overwrite selected fields of an existing shiur
    Edit(EditArgs),
    /// Remove a shiur and its platform links
    Rm {
        id_or_guid: String,
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    /// Replace the full platform link set for a shiur
    Links(LinksArgs),
}

#[derive(Args)]
pub struct AddArgs {
    pub title: String,
    #[arg(long)]
    pub audio_url: String,
    /// Stable identity; derived from title and date when omitted
    #[arg(long)]
    pub guid: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Short teaser; derived from the description when omitted
    #[arg(long)]
    pub blurb: Option<String>,
    #[arg(long)]
    pub source_doc: Option<String>,
    /// Publish date, RFC 2822 or RFC 3339; defaults to now
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub duration: Option<String>,
    #[arg(long)]
    pub link: Option<String>,
    #[arg(long, default_value_t = false)]
    pub apply: bool,
}

#[derive(Args)]
pub struct EditArgs {
    pub id_or_guid: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub audio_url: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub blurb: Option<String>,
    #[arg(long)]
    pub source_doc: Option<String>,
    /// Publish date, RFC 2822 or RFC 3339
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub duration: Option<String>,
    #[arg(long)]
    pub link: Option<String>,
    #[arg(long, default_value_t = false)]
    pub apply: bool,
}

#[derive(Args)]
pub struct LinksArgs {
    pub id_or_guid: String,
    #[arg(long)]
    pub youtube: Option<String>,
    #[arg(long)]
    pub youtube_music: Option<String>,
    #[arg(long)]
    pub spotify: Option<String>,
    #[arg(long)]
    pub apple: Option<String>,
    #[arg(long)]
    pub amazon: Option<String>,
    #[arg(long)]
    pub pocket: Option<String>,
    #[arg(long)]
    pub twenty_four_six: Option<String>,
    #[arg(long)]
    pub castbox: Option<String>,
    #[arg(long, default_value_t = false)]
    pub apply: bool,
}

pub async fn run(store: &dyn ShiurStore, args: ShiurCmd) -> Result<()> {
    match args.cmd {
        ShiurSub::Ls { limit } => ls(store, limit).await,
        ShiurSub::Show { id_or_guid } => show(store, &id_or_guid).await,
        ShiurSub::Add(args) => add(store, args).await,
        ShiurSub::Edit(args) => edit(store, args).await,
        ShiurSub::Rm { id_or_guid, apply } => rm(store, &id_or_guid, apply).await,
        ShiurSub::Links(args) => links(store, args).await,
    }
}

async fn ls(store: &dyn ShiurStore, limit: Option<i64>) -> Result<()> {
    let log = telemetry::shiur();
    let _g = log.root_span_kv([("limit", format!("{:?}", limit))]).entered();
    let _s = log.span(&ShiurPhase::List).entered();

    let shiurim = store.list(limit).await?;
    log.info(format!("🎧 Shiurim ({}):", shiurim.len()));
    for shiur in &shiurim {
        log.info(format!(
            "  [{}] {}  {}  guid={} duration={}",
            shiur.id,
            shiur.pub_date.format("%Y-%m-%d"),
            shiur.title,
            shiur.guid,
            shiur.duration.as_deref().unwrap_or("?")
        ));
    }

    if telemetry::config::json_mode() {
        let list = types::ShiurList { shiurim: shiurim.iter().map(types::ShiurRow::from).collect() };
        log.result(&list)?;
    }
    Ok(())
}

async fn show(store: &dyn ShiurStore, id_or_guid: &str) -> Result<()> {
    let log = telemetry::shiur();
    let _g = log.root_span_kv([("target", id_or_guid.to_string())]).entered();
    let _s = log.span(&ShiurPhase::Show).entered();

    let Some(shiur) = store.resolve(id_or_guid).await? else {
        bail!("No shiur matching {id_or_guid}");
    };
    let platform_links = store.platform_links(&shiur.id).await?;

    log.info(format!("🎧 {}", shiur.title));
    log.info(format!("  id={} guid={}", shiur.id, shiur.guid));
    log.info(format!(
        "  published={} duration={}",
        shiur.pub_date.format("%Y-%m-%d %H:%M"),
        shiur.duration.as_deref().unwrap_or("?")
    ));
    log.info(format!("  audio={}", shiur.audio_url));
    if let Some(doc) = &shiur.source_doc {
        log.info(format!("  source_doc={doc}"));
    }
    if let Some(blurb) = &shiur.blurb {
        log.info(format!("  blurb={blurb}"));
    }
    if let Some(links) = &platform_links {
        let names = platform_pairs(&to_link_fields(links));
        log.info(format!("  platforms={}", names.join(",")));
    }

    if telemetry::config::json_mode() {
        let detail = types::ShiurDetail { shiur, platform_links };
        log.result(&detail)?;
    }
    Ok(())
}

async fn add(store: &dyn ShiurStore, args: AddArgs) -> Result<()> {
    let log = telemetry::shiur();
    let _g = log
        .root_span_kv([
            ("mode", mode_str(args.apply).to_string()),
            ("title", args.title.clone()),
        ])
        .entered();

    let pub_date = match args.date.as_deref() {
        Some(raw) => match sync::parse_date(raw) {
            Some(dt) => dt,
            None => bail!("Unrecognized date: {raw}"),
        },
        None => Utc::now(),
    };

    let Some(guid) = args
        .guid
        .clone()
        .or_else(|| extract::synthetic_key(Some(&args.title), Some(pub_date)))
    else {
        bail!("Could not derive a guid; pass --guid");
    };

    let blurb = args
        .blurb
        .clone()
        .or_else(|| args.description.as_deref().and_then(extract::extract_blurb));
    let source_doc = args
        .source_doc
        .clone()
        .or_else(|| args.description.as_deref().and_then(extract::extract_source_doc));

    let fields = ShiurFields {
        guid: guid.clone(),
        title: args.title.clone(),
        description: args.description.clone(),
        blurb,
        audio_url: args.audio_url.clone(),
        source_doc,
        pub_date,
        duration: args.duration.clone(),
        link: args.link.clone(),
    };

    if !args.apply {
        let _s = log.span(&ShiurPhase::Plan).entered();
        log.info(format!(
            "📝 Shiur plan — add guid={} title={} audio={}",
            fields.guid, fields.title, fields.audio_url
        ));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            let plan = types::ShiurWritePlan { action: "add", fields };
            log.plan(&plan)?;
        }
        return Ok(());
    }

    let _s = log.span(&ShiurPhase::Add).entered();
    if store.find_by_guid(&guid).await?.is_some() {
        bail!("A shiur with guid {guid} already exists; use edit instead");
    }
    let created = store.create(&fields).await?;
    log.info("➕ Shiur added");
    log.info(format!("  id={} guid={}", created.id, created.guid));

    if telemetry::config::json_mode() {
        let result = types::ShiurWriteResult { action: "add", id: created.id, guid: created.guid };
        log.result(&result)?;
    }
    Ok(())
}

async fn edit(store: &dyn ShiurStore, args: EditArgs) -> Result<()> {
    let log = telemetry::shiur();
    let _g = log
        .root_span_kv([
            ("mode", mode_str(args.apply).to_string()),
            ("target", args.id_or_guid.clone()),
        ])
        .entered();

    let Some(existing) = store.resolve(&args.id_or_guid).await? else {
        bail!("No shiur matching {}", args.id_or_guid);
    };

    let mut fields = ShiurFields::from(&existing);
    let mut changes: Vec<&'static str> = Vec::new();

    if let Some(v) = args.title.clone() {
        fields.title = v;
        changes.push("title");
    }
    if let Some(v) = args.audio_url.clone() {
        fields.audio_url = v;
        changes.push("audio_url");
    }
    if let Some(v) = args.description.clone() {
        fields.description = Some(v);
        changes.push("description");
    }
    if let Some(v) = args.blurb.clone() {
        fields.blurb = Some(v);
        changes.push("blurb");
    }
    if let Some(v) = args.source_doc.clone() {
        fields.source_doc = Some(v);
        changes.push("source_doc");
    }
    if let Some(raw) = args.date.as_deref() {
        let Some(dt) = sync::parse_date(raw) else {
            bail!("Unrecognized date: {raw}");
        };
        fields.pub_date = dt;
        changes.push("pub_date");
    }
    if let Some(v) = args.duration.clone() {
        fields.duration = Some(v);
        changes.push("duration");
    }
    if let Some(v) = args.link.clone() {
        fields.link = Some(v);
        changes.push("link");
    }

    if changes.is_empty() {
        bail!("Nothing to change; pass at least one field flag.");
    }

    if !args.apply {
        let _s = log.span(&ShiurPhase::Plan).entered();
        log.info(format!(
            "📝 Shiur plan — edit id={} fields={}",
            existing.id,
            changes.join(",")
        ));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            let plan = types::ShiurEditPlan { action: "edit", id: existing.id, changes, fields };
            log.plan(&plan)?;
        }
        return Ok(());
    }

    let _s = log.span(&ShiurPhase::Edit).entered();
    let updated = store.update_by_id(&existing.id, &fields).await?;
    log.info("♻️ Shiur updated");
    log.info(format!("  id={} fields={}", updated.id, changes.join(",")));

    if telemetry::config::json_mode() {
        let result = types::ShiurWriteResult { action: "edit", id: updated.id, guid: updated.guid };
        log.result(&result)?;
    }
    Ok(())
}

async fn rm(store: &dyn ShiurStore, id_or_guid: &str, apply: bool) -> Result<()> {
    let log = telemetry::shiur();
    let _g = log
        .root_span_kv([
            ("mode", mode_str(apply).to_string()),
            ("target", id_or_guid.to_string()),
        ])
        .entered();

    let Some(existing) = store.resolve(id_or_guid).await? else {
        bail!("No shiur matching {id_or_guid}");
    };

    if !apply {
        let _s = log.span(&ShiurPhase::Plan).entered();
        log.info(format!(
            "📝 Shiur plan — rm id={} guid={} title={}",
            existing.id, existing.guid, existing.title
        ));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            let plan = types::ShiurRmPlan {
                action: "rm",
                id: existing.id,
                guid: existing.guid,
                title: existing.title,
            };
            log.plan(&plan)?;
        }
        return Ok(());
    }

    let _s = log.span(&ShiurPhase::Remove).entered();
    let removed = store.delete(&existing.id).await?;
    if removed {
        log.info("🧹 Shiur removed");
    } else {
        log.warn("↩️ Nothing removed; it was already gone");
    }

    if telemetry::config::json_mode() {
        let result = types::ShiurRmResult { removed, id: existing.id };
        log.result(&result)?;
    }
    Ok(())
}

async fn links(store: &dyn ShiurStore, args: LinksArgs) -> Result<()> {
    let log = telemetry::shiur();
    let _g = log
        .root_span_kv([
            ("mode", mode_str(args.apply).to_string()),
            ("target", args.id_or_guid.clone()),
        ])
        .entered();

    let Some(existing) = store.resolve(&args.id_or_guid).await? else {
        bail!("No shiur matching {}", args.id_or_guid);
    };

    let fields = PlatformLinkFields {
        youtube: args.youtube.clone(),
        youtube_music: args.youtube_music.clone(),
        spotify: args.spotify.clone(),
        apple: args.apple.clone(),
        amazon: args.amazon.clone(),
        pocket: args.pocket.clone(),
        twenty_four_six: args.twenty_four_six.clone(),
        castbox: args.castbox.clone(),
    };
    let platforms = platform_pairs(&fields);

    if !args.apply {
        let _s = log.span(&ShiurPhase::Plan).entered();
        let listed = if platforms.is_empty() {
            "(none — clears all)".to_string()
        } else {
            platforms.join(",")
        };
        log.info(format!(
            "📝 Shiur plan — links id={} platforms={listed}",
            existing.id
        ));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            let plan = types::LinksPlan { shiur_id: existing.id, platforms };
            log.plan(&plan)?;
        }
        return Ok(());
    }

    let _s = log.span(&ShiurPhase::Links).entered();
    let had_links = store.platform_links(&existing.id).await?.is_some();
    let row = store.put_platform_links(&existing.id, &fields).await?;
    if had_links {
        log.info("♻️ Platform links replaced");
    } else {
        log.info("➕ Platform links set");
    }

    if telemetry::config::json_mode() {
        let result = types::LinksResult { shiur_id: row.shiur_id, platforms };
        log.result(&result)?;
    }
    Ok(())
}

fn mode_str(apply: bool) -> &'static str {
    if apply { "apply" } else { "plan" }
}

/// Names of the platforms that actually carry a URL, in column order.
fn platform_pairs(fields: &PlatformLinkFields) -> Vec<&'static str> {
    let pairs: [(&'static str, &Option<String>); 8] = [
        ("youtube", &fields.youtube),
        ("youtube_music", &fields.youtube_music),
        ("spotify", &fields.spotify),
        ("apple", &fields.apple),
        ("amazon", &fields.amazon),
        ("pocket", &fields.pocket),
        ("twenty_four_six", &fields.twenty_four_six),
        ("castbox", &fields.castbox),
    ];
    pairs
        .into_iter()
        .filter(|(_, v)| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
}

fn to_link_fields(links: &crate::store::PlatformLinks) -> PlatformLinkFields {
    PlatformLinkFields {
        youtube: links.youtube.clone(),
        youtube_music: links.youtube_music.clone(),
        spotify: links.spotify.clone(),
        apple: links.apple.clone(),
        amazon: links.amazon.clone(),
        pocket: links.pocket.clone(),
        twenty_four_six: links.twenty_four_six.clone(),
        castbox: links.castbox.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem::MemStore;

    fn add_args(title: &str, guid: Option<&str>) -> AddArgs {
        AddArgs {
            title: title.to_string(),
            audio_url: "https://cdn.example.com/a.mp3".to_string(),
            guid: guid.map(str::to_string),
            description: Some(
                "<p>Why the omer count starts at night. More detail in the shiur itself.</p>"
                    .to_string(),
            ),
            blurb: None,
            source_doc: None,
            date: Some("Fri, 25 Oct 2024 09:00:00 +0000".to_string()),
            duration: None,
            link: None,
            apply: true,
        }
    }

    fn edit_args(target: &str) -> EditArgs {
        EditArgs {
            id_or_guid: target.to_string(),
            title: None,
            audio_url: None,
            description: None,
            blurb: None,
            source_doc: None,
            date: None,
            duration: None,
            link: None,
            apply: true,
        }
    }

    fn links_args(target: &str) -> LinksArgs {
        LinksArgs {
            id_or_guid: target.to_string(),
            youtube: None,
            youtube_music: None,
            spotify: None,
            apple: None,
            amazon: None,
            pocket: None,
            twenty_four_six: None,
            castbox: None,
            apply: true,
        }
    }

    async fn run_sub(store: &MemStore, cmd: ShiurSub) -> Result<()> {
        run(store, ShiurCmd { cmd }).await
    }

    #[tokio::test]
    async fn add_derives_guid_and_blurb_when_omitted() {
        let store = MemStore::new();
        run_sub(&store, ShiurSub::Add(add_args("Counting the Omer", None)))
            .await
            .unwrap();

        let rows = store.list(None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].guid.starts_with("counting-the-omer-"));
        assert_eq!(
            rows[0].blurb.as_deref(),
            Some("Why the omer count starts at night")
        );
    }

    #[tokio::test]
    async fn add_rejects_duplicate_guid() {
        let store = MemStore::new();
        run_sub(&store, ShiurSub::Add(add_args("One", Some("ep-1"))))
            .await
            .unwrap();
        let err = run_sub(&store, ShiurSub::Add(add_args("Two", Some("ep-1"))))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("already exists"));
        assert_eq!(store.row_count(), 1);
    }

    #[tokio::test]
    async fn plan_mode_writes_nothing() {
        let store = MemStore::new();
        let mut args = add_args("Planned only", Some("ep-9"));
        args.apply = false;
        run_sub(&store, ShiurSub::Add(args)).await.unwrap();
        assert_eq!(store.row_count(), 0);
    }

    #[tokio::test]
    async fn edit_overwrites_only_named_fields() {
        let store = MemStore::new();
        run_sub(&store, ShiurSub::Add(add_args("Before", Some("ep-1"))))
            .await
            .unwrap();

        let mut args = edit_args("ep-1");
        args.title = Some("After".to_string());
        args.duration = Some("12:34".to_string());
        run_sub(&store, ShiurSub::Edit(args)).await.unwrap();

        let row = store.find_by_guid("ep-1").await.unwrap().unwrap();
        assert_eq!(row.title, "After");
        assert_eq!(row.duration.as_deref(), Some("12:34"));
        assert_eq!(row.audio_url, "https://cdn.example.com/a.mp3");
    }

    #[tokio::test]
    async fn edit_with_no_flags_is_an_error() {
        let store = MemStore::new();
        run_sub(&store, ShiurSub::Add(add_args("One", Some("ep-1"))))
            .await
            .unwrap();
        let err = run_sub(&store, ShiurSub::Edit(edit_args("ep-1")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Nothing to change"));
    }

    #[tokio::test]
    async fn edit_rejects_unparsable_dates() {
        let store = MemStore::new();
        run_sub(&store, ShiurSub::Add(add_args("One", Some("ep-1"))))
            .await
            .unwrap();

        let mut args = edit_args("ep-1");
        args.date = Some("sometime soon".to_string());
        let err = run_sub(&store, ShiurSub::Edit(args)).await.unwrap_err();
        assert!(err.to_string().contains("Unrecognized date"));
    }

    #[tokio::test]
    async fn rm_plan_keeps_the_row_and_apply_removes_it() {
        let store = MemStore::new();
        run_sub(&store, ShiurSub::Add(add_args("One", Some("ep-1"))))
            .await
            .unwrap();

        run_sub(&store, ShiurSub::Rm { id_or_guid: "ep-1".to_string(), apply: false })
            .await
            .unwrap();
        assert_eq!(store.row_count(), 1);

        run_sub(&store, ShiurSub::Rm { id_or_guid: "ep-1".to_string(), apply: true })
            .await
            .unwrap();
        assert_eq!(store.row_count(), 0);
    }

    #[tokio::test]
    async fn links_replace_clears_omitted_platforms() {
        let store = MemStore::new();
        run_sub(&store, ShiurSub::Add(add_args("One", Some("ep-1"))))
            .await
            .unwrap();
        let id = store.find_by_guid("ep-1").await.unwrap().unwrap().id;

        let mut first = links_args("ep-1");
        first.youtube = Some("https://youtube.com/watch?v=abc".to_string());
        first.spotify = Some("https://open.spotify.com/episode/abc".to_string());
        run_sub(&store, ShiurSub::Links(first)).await.unwrap();

        let mut second = links_args("ep-1");
        second.spotify = Some("https://open.spotify.com/episode/xyz".to_string());
        run_sub(&store, ShiurSub::Links(second)).await.unwrap();

        let links = store.platform_links(&id).await.unwrap().unwrap();
        assert_eq!(links.youtube, None);
        assert_eq!(
            links.spotify.as_deref(),
            Some("https://open.spotify.com/episode/xyz")
        );
    }

    #[tokio::test]
    async fn show_of_a_missing_target_fails() {
        let store = MemStore::new();
        let err = run_sub(&store, ShiurSub::Show { id_or_guid: "nope".to_string() })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No shiur matching"));
    }
}
