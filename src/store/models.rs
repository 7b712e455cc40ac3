use chrono::{DateTime, Utc};
use serde::Serialize;

/// A persisted shiur row. `guid` is the stable upstream identity;
/// `id` is the locally assigned primary key.
#[derive(Debug, Clone, Serialize)]
pub struct Shiur {
    pub id: String,
    pub guid: String,
    pub title: String,
    pub description: Option<String>,
    pub blurb: Option<String>,
    pub audio_url: String,
    pub source_doc: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub duration: Option<String>,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable field set for create/update. Every write replaces the full
/// set; there are no partial column updates at the store level.
#[derive(Debug, Clone, Serialize)]
pub struct ShiurFields {
    pub guid: String,
    pub title: String,
    pub description: Option<String>,
    pub blurb: Option<String>,
    pub audio_url: String,
    pub source_doc: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub duration: Option<String>,
    pub link: Option<String>,
}

impl From<&Shiur> for ShiurFields {
    fn from(shiur: &Shiur) -> Self {
        ShiurFields {
            guid: shiur.guid.clone(),
            title: shiur.title.clone(),
            description: shiur.description.clone(),
            blurb: shiur.blurb.clone(),
            audio_url: shiur.audio_url.clone(),
            source_doc: shiur.source_doc.clone(),
            pub_date: shiur.pub_date,
            duration: shiur.duration.clone(),
            link: shiur.link.clone(),
        }
    }
}

/// External listening-platform links for one shiur (one row per shiur).
#[derive(Debug, Clone, Serialize)]
pub struct PlatformLinks {
    pub id: String,
    pub shiur_id: String,
    pub youtube: Option<String>,
    pub youtube_music: Option<String>,
    pub spotify: Option<String>,
    pub apple: Option<String>,
    pub amazon: Option<String>,
    pub pocket: Option<String>,
    pub twenty_four_six: Option<String>,
    pub castbox: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlatformLinkFields {
    pub youtube: Option<String>,
    pub youtube_music: Option<String>,
    pub spotify: Option<String>,
    pub apple: Option<String>,
    pub amazon: Option<String>,
    pub pocket: Option<String>,
    pub twenty_four_six: Option<String>,
    pub castbox: Option<String>,
}

/// Aggregate counters for the stats op.
#[derive(Debug, Clone, Serialize)]
pub struct StoreCounts {
    pub shiurim: i64,
    pub with_blurb: i64,
    pub with_source_doc: i64,
    pub with_platform_links: i64,
    pub earliest_pub_date: Option<DateTime<Utc>>,
    pub latest_pub_date: Option<DateTime<Utc>>,
}
