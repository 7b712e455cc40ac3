use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::{PlatformLinks, Shiur, ShiurFields};

/// Condensed listing row; the full record (description included) only
/// goes out through `show`.
#[derive(Serialize)]
pub struct ShiurRow {
    pub id: String,
    pub guid: String,
    pub title: String,
    pub pub_date: DateTime<Utc>,
    pub duration: Option<String>,
    pub audio_url: String,
}

impl From<&Shiur> for ShiurRow {
    fn from(shiur: &Shiur) -> Self {
        ShiurRow {
            id: shiur.id.clone(),
            guid: shiur.guid.clone(),
            title: shiur.title.clone(),
            pub_date: shiur.pub_date,
            duration: shiur.duration.clone(),
            audio_url: shiur.audio_url.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct ShiurList {
    pub shiurim: Vec<ShiurRow>,
}

#[derive(Serialize)]
pub struct ShiurDetail {
    pub shiur: Shiur,
    pub platform_links: Option<PlatformLinks>,
}

#[derive(Serialize)]
pub struct ShiurWritePlan {
    pub action: &'static str,
    pub fields: ShiurFields,
}

#[derive(Serialize)]
pub struct ShiurWriteResult {
    pub action: &'static str,
    pub id: String,
    pub guid: String,
}

#[derive(Serialize)]
pub struct ShiurEditPlan {
    pub action: &'static str,
    pub id: String,
    pub changes: Vec<&'static str>,
    pub fields: ShiurFields,
}

#[derive(Serialize)]
pub struct ShiurRmPlan {
    pub action: &'static str,
    pub id: String,
    pub guid: String,
    pub title: String,
}

#[derive(Serialize)]
pub struct ShiurRmResult {
    pub removed: bool,
    pub id: String,
}

#[derive(Serialize)]
pub struct LinksPlan {
    pub shiur_id: String,
    pub platforms: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct LinksResult {
    pub shiur_id: String,
    pub platforms: Vec<&'static str>,
}
