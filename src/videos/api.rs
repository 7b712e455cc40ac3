use std::time::Duration;

use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const PAGE_SIZE: u32 = 50;

#[derive(Clone, Debug)]
pub struct TubeConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub channel_id: Option<String>,
    pub timeout: Duration,
}

impl Default for TubeConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("YOUTUBE_API_KEY").ok(),
            base_url: API_BASE.to_string(),
            channel_id: std::env::var("SHIURCAST_CHANNEL_ID").ok(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl TubeConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(base) = std::env::var("YOUTUBE_API_BASE_URL") {
            cfg.base_url = base;
        }
        if let Ok(timeout) = std::env::var("YOUTUBE_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                cfg.timeout = Duration::from_secs(parsed);
            }
        }
        cfg
    }
}

/// Thin client for the YouTube Data API v3. The key travels as a
/// query parameter, never in source or logs.
#[derive(Clone)]
pub struct TubeClient {
    http: HttpClient,
    cfg: TubeConfig,
}

impl TubeClient {
    pub fn new(cfg: TubeConfig) -> Result<Self, TubeError> {
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(TubeError::http)?;
        Ok(Self { http, cfg })
    }

    fn resolve_api_key(&self) -> Result<String, TubeError> {
        if let Some(key) = &self.cfg.api_key {
            return Ok(key.clone());
        }
        std::env::var("YOUTUBE_API_KEY").map_err(|_| TubeError::MissingApiKey)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.cfg.base_url.trim_end_matches('/'))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TubeError> {
        let api_key = self.resolve_api_key()?;

        let response = self
            .http
            .get(self.endpoint(path))
            .query(query)
            .query(&[("key", api_key)])
            .send()
            .await
            .map_err(TubeError::from_reqwest)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(TubeError::from_reqwest)?;

        if !status.is_success() {
            let api_err = serde_json::from_slice::<ApiErrorEnvelope>(&bytes)
                .ok()
                .map(|env| env.error);
            return Err(TubeError::Api { status, error: api_err.unwrap_or_default() });
        }

        serde_json::from_slice(&bytes).map_err(TubeError::Decode)
    }

    /// The channel's uploads playlist, which lists every public video.
    pub async fn uploads_playlist(&self, channel_id: &str) -> Result<String, TubeError> {
        let resp: ChannelListResponse = self
            .get_json(
                "channels",
                &[
                    ("part", "contentDetails".to_string()),
                    ("id", channel_id.to_string()),
                ],
            )
            .await?;
        extract_uploads(&resp)
            .map(str::to_string)
            .ok_or_else(|| TubeError::Shape(format!("channel {channel_id} has no uploads playlist")))
    }

    pub async fn playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage, TubeError> {
        let mut query = vec![
            ("part", "snippet,contentDetails".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        self.get_json("playlistItems", &query).await
    }

    /// Full metadata for up to one page worth of video ids.
    pub async fn videos(&self, ids: &[String]) -> Result<Vec<VideoItem>, TubeError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let resp: VideoListResponse = self
            .get_json(
                "videos",
                &[
                    ("part", "snippet,contentDetails,statistics".to_string()),
                    ("id", ids.join(",")),
                ],
            )
            .await?;
        Ok(resp.items)
    }

    pub async fn playlists(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistsPage, TubeError> {
        let mut query = vec![
            ("part", "snippet,contentDetails".to_string()),
            ("channelId", channel_id.to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        self.get_json("playlists", &query).await
    }
}

fn extract_uploads(resp: &ChannelListResponse) -> Option<&str> {
    resp.items
        .first()?
        .content_details
        .as_ref()?
        .related_playlists
        .uploads
        .as_deref()
}

#[derive(Debug)]
pub enum TubeError {
    MissingApiKey,
    Http(reqwest::Error),
    Timeout,
    Api { status: StatusCode, error: ApiErrorBody },
    Decode(serde_json::Error),
    /// The response parsed but did not carry what was asked for.
    Shape(String),
}

impl TubeError {
    fn http(err: reqwest::Error) -> Self {
        if err.is_timeout() { TubeError::Timeout } else { TubeError::Http(err) }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        Self::http(err)
    }
}

impl std::fmt::Display for TubeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TubeError::MissingApiKey => write!(f, "YOUTUBE_API_KEY is not set"),
            TubeError::Http(err) => write!(f, "http error: {err}"),
            TubeError::Timeout => write!(f, "request timed out"),
            TubeError::Api { status, error } => {
                write!(f, "api error {status}: {}", error.message)
            }
            TubeError::Decode(err) => write!(f, "decode error: {err}"),
            TubeError::Shape(what) => write!(f, "unexpected response: {what}"),
        }
    }
}

impl std::error::Error for TubeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TubeError::Http(err) => Some(err),
            TubeError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Default for ApiErrorBody {
    fn default() -> Self {
        Self { message: "unknown error".to_string(), code: None, status: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelItem {
    pub content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedPlaylists {
    #[serde(default)]
    pub uploads: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemsPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    pub next_page_token: Option<String>,
    pub page_info: Option<PageInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub content_details: Option<PlaylistItemDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemDetails {
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_results: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub id: Option<String>,
    pub snippet: Option<VideoSnippet>,
    pub content_details: Option<VideoContentDetails>,
    pub statistics: Option<VideoStatistics>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: Option<String>,
    pub published_at: Option<String>,
    pub thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoContentDetails {
    pub duration: Option<String>,
}

/// Counters come back as decimal strings, not numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    pub view_count: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnails {
    pub default: Option<Thumb>,
    pub medium: Option<Thumb>,
    pub high: Option<Thumb>,
}

impl Thumbnails {
    /// Best available thumbnail, largest first.
    pub fn best_url(&self) -> Option<&str> {
        self.high
            .as_ref()
            .or(self.medium.as_ref())
            .or(self.default.as_ref())
            .and_then(|t| t.url.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumb {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistsPage {
    #[serde(default)]
    pub items: Vec<PlaylistEntry>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    pub id: Option<String>,
    pub snippet: Option<PlaylistSnippet>,
    pub content_details: Option<PlaylistContentDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSnippet {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistContentDetails {
    pub item_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_response_yields_uploads_playlist() {
        let raw = r#"{
            "items": [
                {
                    "contentDetails": {
                        "relatedPlaylists": { "uploads": "UUabc123", "likes": "" }
                    }
                }
            ]
        }"#;
        let resp: ChannelListResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_uploads(&resp), Some("UUabc123"));

        let empty: ChannelListResponse = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert_eq!(extract_uploads(&empty), None);
    }

    #[test]
    fn playlist_items_page_decodes_ids_and_token() {
        let raw = r#"{
            "nextPageToken": "CAUQAA",
            "pageInfo": { "totalResults": 250, "resultsPerPage": 50 },
            "items": [
                { "contentDetails": { "videoId": "vid-1", "videoPublishedAt": "2024-11-14T06:00:00Z" } },
                { "contentDetails": { "videoId": "vid-2" } }
            ]
        }"#;
        let page: PlaylistItemsPage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));
        assert_eq!(page.items.len(), 2);
        assert_eq!(
            page.items[0].content_details.as_ref().unwrap().video_id.as_deref(),
            Some("vid-1")
        );
        assert_eq!(page.page_info.unwrap().total_results, Some(250));
    }

    #[test]
    fn video_item_decodes_duration_views_and_thumbnail() {
        let raw = r#"{
            "items": [
                {
                    "id": "vid-1",
                    "snippet": {
                        "title": "Parashat Noach",
                        "publishedAt": "2024-11-14T06:00:00Z",
                        "thumbnails": {
                            "default": { "url": "https://i.ytimg.com/vi/vid-1/default.jpg" },
                            "medium": { "url": "https://i.ytimg.com/vi/vid-1/mqdefault.jpg" }
                        }
                    },
                    "contentDetails": { "duration": "PT41M23S" },
                    "statistics": { "viewCount": "1532" }
                }
            ]
        }"#;
        let resp: VideoListResponse = serde_json::from_str(raw).unwrap();
        let video = &resp.items[0];
        assert_eq!(video.id.as_deref(), Some("vid-1"));
        assert_eq!(
            video.content_details.as_ref().unwrap().duration.as_deref(),
            Some("PT41M23S")
        );
        assert_eq!(
            video.statistics.as_ref().unwrap().view_count.as_deref(),
            Some("1532")
        );
        assert_eq!(
            video.snippet.as_ref().unwrap().thumbnails.as_ref().unwrap().best_url(),
            Some("https://i.ytimg.com/vi/vid-1/mqdefault.jpg")
        );
    }

    #[test]
    fn google_error_envelope_decodes() {
        let raw = r#"{
            "error": {
                "code": 403,
                "message": "The request is missing a valid API key.",
                "status": "PERMISSION_DENIED"
            }
        }"#;
        let env: ApiErrorEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.error.code, Some(403));
        assert_eq!(env.error.status.as_deref(), Some("PERMISSION_DENIED"));

        let err = TubeError::Api { status: StatusCode::FORBIDDEN, error: env.error };
        assert_eq!(
            format!("{err}"),
            "api error 403 Forbidden: The request is missing a valid API key."
        );
    }

    #[test]
    fn missing_key_has_a_clear_message() {
        assert_eq!(format!("{}", TubeError::MissingApiKey), "YOUTUBE_API_KEY is not set");
    }
}
