use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::telemetry::{self};
use crate::telemetry::ops::videos::Phase as VideosPhase;

pub mod api;
pub mod duration;

use api::{TubeClient, TubeConfig, VideoItem};

/// shiurcast videos ls/playlists
#[derive(Args)]
pub struct VideosCmd {
    #[command(subcommand)]
    pub cmd: VideosSub,
}

#[derive(Subcommand)]
pub enum VideosSub {
    /// List channel uploads, shorts filtered out
    Ls {
        /// Channel id; falls back to SHIURCAST_CHANNEL_ID
        #[arg(long)]
        channel: Option<String>,
        #[arg(long, default_value_t = 25)]
        limit: usize,
        /// Page token from a previous run
        #[arg(long)]
        page: Option<String>,
        #[arg(long, default_value_t = false)]
        include_shorts: bool,
    },
    /// List the channel's playlists
    Playlists {
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        page: Option<String>,
    },
}

#[derive(Serialize)]
pub struct VideoRow {
    pub id: String,
    pub title: String,
    pub duration: Option<String>,
    pub seconds: Option<u64>,
    pub published_at: Option<String>,
    pub url: String,
    pub thumbnail: Option<String>,
    pub views: Option<u64>,
}

#[derive(Serialize)]
struct VideoList {
    videos: Vec<VideoRow>,
    next_page_token: Option<String>,
    total_results: Option<i64>,
}

#[derive(Serialize)]
struct PlaylistRow {
    id: String,
    title: String,
    videos: Option<u64>,
}

#[derive(Serialize)]
struct PlaylistList {
    playlists: Vec<PlaylistRow>,
    next_page_token: Option<String>,
}

pub async fn run(args: VideosCmd) -> Result<()> {
    match args.cmd {
        VideosSub::Ls { channel, limit, page, include_shorts } => {
            ls(channel, limit, page, include_shorts).await
        }
        VideosSub::Playlists { channel, page } => playlists(channel, page).await,
    }
}

fn resolve_channel(flag: Option<String>, cfg: &TubeConfig) -> Result<String> {
    match flag.or_else(|| cfg.channel_id.clone()) {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => bail!("No channel id. Pass --channel or set SHIURCAST_CHANNEL_ID."),
    }
}

async fn ls(
    channel: Option<String>,
    limit: usize,
    page: Option<String>,
    include_shorts: bool,
) -> Result<()> {
    let log = telemetry::videos();
    let cfg = TubeConfig::from_env();
    let channel_id = resolve_channel(channel, &cfg)?;
    let client = TubeClient::new(cfg)?;

    let _g = log
        .root_span_kv([
            ("channel", channel_id.clone()),
            ("limit", limit.to_string()),
            ("include_shorts", include_shorts.to_string()),
        ])
        .entered();

    let uploads = {
        let _s = log.span(&VideosPhase::Channel).entered();
        client.uploads_playlist(&channel_id).await?
    };

    let page_items = {
        let _s = log
            .span_kv(&VideosPhase::PlaylistItems, [("playlist", uploads.clone())])
            .entered();
        client.playlist_items(&uploads, page.as_deref()).await?
    };

    let ids: Vec<String> = page_items
        .items
        .iter()
        .filter_map(|item| item.content_details.as_ref()?.video_id.clone())
        .collect();

    let videos = {
        let _s = log
            .span_kv(&VideosPhase::Details, [("ids", ids.len().to_string())])
            .entered();
        client.videos(&ids).await?
    };

    let mut rows: Vec<VideoRow> = videos.iter().filter_map(video_row).collect();
    if !include_shorts {
        rows.retain(|row| !duration::is_short(row.seconds, &row.title));
    }
    rows.truncate(limit);

    let total = page_items.page_info.as_ref().and_then(|p| p.total_results);
    match total {
        Some(t) => log.info(format!("🎬 Videos ({} of {t} uploads):", rows.len())),
        None => log.info(format!("🎬 Videos ({}):", rows.len())),
    }
    for row in &rows {
        log.info(format!(
            "  [{}] {}  views={}  {}",
            row.duration.as_deref().unwrap_or("?"),
            row.title,
            row.views.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string()),
            row.url
        ));
    }
    if let Some(token) = &page_items.next_page_token {
        log.info(format!("  next page: --page {token}"));
    }

    if telemetry::config::json_mode() {
        let list = VideoList {
            videos: rows,
            next_page_token: page_items.next_page_token.clone(),
            total_results: total,
        };
        log.result(&list)?;
    }
    Ok(())
}

async fn playlists(channel: Option<String>, page: Option<String>) -> Result<()> {
    let log = telemetry::videos();
    let cfg = TubeConfig::from_env();
    let channel_id = resolve_channel(channel, &cfg)?;
    let client = TubeClient::new(cfg)?;

    let _g = log.root_span_kv([("channel", channel_id.clone())]).entered();

    let page_data = {
        let _s = log.span(&VideosPhase::Playlists).entered();
        client.playlists(&channel_id, page.as_deref()).await?
    };

    let rows: Vec<PlaylistRow> = page_data
        .items
        .iter()
        .filter_map(|entry| {
            Some(PlaylistRow {
                id: entry.id.clone()?,
                title: entry
                    .snippet
                    .as_ref()
                    .and_then(|s| s.title.clone())
                    .unwrap_or_default(),
                videos: entry.content_details.as_ref().and_then(|d| d.item_count),
            })
        })
        .collect();

    log.info(format!("📚 Playlists ({}):", rows.len()));
    for row in &rows {
        log.info(format!(
            "  [{}] {} ({} videos)",
            row.id,
            row.title,
            row.videos.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string())
        ));
    }
    if let Some(token) = &page_data.next_page_token {
        log.info(format!("  next page: --page {token}"));
    }

    if telemetry::config::json_mode() {
        let list = PlaylistList {
            playlists: rows,
            next_page_token: page_data.next_page_token.clone(),
        };
        log.result(&list)?;
    }
    Ok(())
}

/// Flatten one API video into a listing row; videos without an id are
/// unusable and dropped.
fn video_row(video: &VideoItem) -> Option<VideoRow> {
    let id = video.id.clone()?;
    let snippet = video.snippet.as_ref();
    let seconds = video
        .content_details
        .as_ref()
        .and_then(|d| d.duration.as_deref())
        .and_then(duration::parse_iso8601_duration);

    Some(VideoRow {
        url: format!("https://www.youtube.com/watch?v={id}"),
        title: snippet.and_then(|s| s.title.clone()).unwrap_or_default(),
        published_at: snippet.and_then(|s| s.published_at.clone()),
        thumbnail: snippet
            .and_then(|s| s.thumbnails.as_ref())
            .and_then(|t| t.best_url().map(str::to_string)),
        views: video
            .statistics
            .as_ref()
            .and_then(|s| s.view_count.as_deref())
            .and_then(|v| v.parse().ok()),
        duration: seconds.map(duration::format_duration),
        seconds,
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item(id: &str, iso: &str, title: &str, views: &str) -> VideoItem {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "snippet": {
                "title": title,
                "publishedAt": "2024-11-14T06:00:00Z",
                "thumbnails": { "medium": { "url": format!("https://i.ytimg.com/vi/{id}/mq.jpg") } }
            },
            "contentDetails": { "duration": iso },
            "statistics": { "viewCount": views }
        }))
        .unwrap()
    }

    #[test]
    fn video_row_maps_fields() {
        let row = video_row(&sample_item("vid-1", "PT41M23S", "Parashat Noach", "1532")).unwrap();
        assert_eq!(row.url, "https://www.youtube.com/watch?v=vid-1");
        assert_eq!(row.title, "Parashat Noach");
        assert_eq!(row.duration.as_deref(), Some("41:23"));
        assert_eq!(row.seconds, Some(2483));
        assert_eq!(row.views, Some(1532));
        assert_eq!(row.thumbnail.as_deref(), Some("https://i.ytimg.com/vi/vid-1/mq.jpg"));
    }

    #[test]
    fn videos_without_an_id_are_dropped() {
        let item: VideoItem =
            serde_json::from_value(serde_json::json!({ "snippet": { "title": "x" } })).unwrap();
        assert!(video_row(&item).is_none());
    }

    #[test]
    fn shorts_filter_keeps_full_length_videos() {
        let items = [
            sample_item("a", "PT45S", "Quick thought", "10"),
            sample_item("b", "PT41M23S", "Full shiur", "20"),
            sample_item("c", "PT5M", "Recap #shorts", "30"),
        ];
        let mut rows: Vec<VideoRow> = items.iter().filter_map(video_row).collect();
        rows.retain(|row| !duration::is_short(row.seconds, &row.title));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "b");
    }
}
