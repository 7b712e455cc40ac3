use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

use super::models::{PlatformLinkFields, PlatformLinks, Shiur, ShiurFields, StoreCounts};
use super::{ShiurStore, StoreError, StoreResult};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SHIUR_COLUMNS: &str =
    "id, guid, title, description, blurb, audio_url, source_doc, pub_date, duration, link, created_at, updated_at";

const LINK_COLUMNS: &str =
    "id, shiur_id, youtube, youtube_music, spotify, apple, amazon, pocket, twenty_four_six, castbox, created_at, updated_at";

/// SQLite-backed store. One file, two tables, schema applied on
/// connect so every op works against a fresh database.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(path: &str) -> StoreResult<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(format!("creating {}: {e}", parent.display())))?;
            }
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Private in-memory database; single connection so every query
    /// sees the same instance.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    /// Create tables and indexes if missing. Safe to run repeatedly.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS shiur (
                id          TEXT PRIMARY KEY,
                guid        TEXT NOT NULL UNIQUE,
                title       TEXT NOT NULL,
                description TEXT,
                blurb       TEXT,
                audio_url   TEXT NOT NULL,
                source_doc  TEXT,
                pub_date    TEXT NOT NULL,
                duration    TEXT,
                link        TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_shiur_pub_date ON shiur(pub_date DESC)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS platform_links (
                id              TEXT PRIMARY KEY,
                shiur_id        TEXT NOT NULL UNIQUE REFERENCES shiur(id) ON DELETE CASCADE,
                youtube         TEXT,
                youtube_music   TEXT,
                spotify         TEXT,
                apple           TEXT,
                amazon          TEXT,
                pocket          TEXT,
                twenty_four_six TEXT,
                castbox         TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ShiurStore for SqliteStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_by_guid(&self, guid: &str) -> StoreResult<Option<Shiur>> {
        let row = sqlx::query(&format!("SELECT {SHIUR_COLUMNS} FROM shiur WHERE guid = ?"))
            .bind(guid)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_shiur).transpose()
    }

    async fn create(&self, fields: &ShiurFields) -> StoreResult<Shiur> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO shiur (id, guid, title, description, blurb, audio_url, source_doc, pub_date, duration, link, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&fields.guid)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.blurb)
        .bind(&fields.audio_url)
        .bind(&fields.source_doc)
        .bind(ts(&fields.pub_date))
        .bind(&fields.duration)
        .bind(&fields.link)
        .bind(ts(&now))
        .bind(ts(&now))
        .execute(&self.pool)
        .await?;

        Ok(Shiur {
            id,
            guid: fields.guid.clone(),
            title: fields.title.clone(),
            description: fields.description.clone(),
            blurb: fields.blurb.clone(),
            audio_url: fields.audio_url.clone(),
            source_doc: fields.source_doc.clone(),
            pub_date: fields.pub_date,
            duration: fields.duration.clone(),
            link: fields.link.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(&self, guid: &str, fields: &ShiurFields) -> StoreResult<Shiur> {
        let res = sqlx::query(
            r#"
            UPDATE shiur
            SET title = ?, description = ?, blurb = ?, audio_url = ?, source_doc = ?, pub_date = ?, duration = ?, link = ?, updated_at = ?
            WHERE guid = ?
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.blurb)
        .bind(&fields.audio_url)
        .bind(&fields.source_doc)
        .bind(ts(&fields.pub_date))
        .bind(&fields.duration)
        .bind(&fields.link)
        .bind(ts(&Utc::now()))
        .bind(guid)
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("shiur with guid {guid}")));
        }
        self.find_by_guid(guid)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("shiur with guid {guid}")))
    }

    async fn list(&self, limit: Option<i64>) -> StoreResult<Vec<Shiur>> {
        let rows = match limit {
            Some(n) => {
                sqlx::query(&format!(
                    "SELECT {SHIUR_COLUMNS} FROM shiur ORDER BY pub_date DESC LIMIT ?"
                ))
                .bind(n)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("SELECT {SHIUR_COLUMNS} FROM shiur ORDER BY pub_date DESC"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter().map(row_to_shiur).collect()
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Shiur>> {
        let row = sqlx::query(&format!("SELECT {SHIUR_COLUMNS} FROM shiur WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_shiur).transpose()
    }

    async fn update_by_id(&self, id: &str, fields: &ShiurFields) -> StoreResult<Shiur> {
        let res = sqlx::query(
            r#"
            UPDATE shiur
            SET title = ?, description = ?, blurb = ?, audio_url = ?, source_doc = ?, pub_date = ?, duration = ?, link = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.blurb)
        .bind(&fields.audio_url)
        .bind(&fields.source_doc)
        .bind(ts(&fields.pub_date))
        .bind(&fields.duration)
        .bind(&fields.link)
        .bind(ts(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("shiur {id}")));
        }
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("shiur {id}")))
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM shiur WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn platform_links(&self, shiur_id: &str) -> StoreResult<Option<PlatformLinks>> {
        let row = sqlx::query(&format!(
            "SELECT {LINK_COLUMNS} FROM platform_links WHERE shiur_id = ?"
        ))
        .bind(shiur_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_links).transpose()
    }

    async fn put_platform_links(
        &self,
        shiur_id: &str,
        fields: &PlatformLinkFields,
    ) -> StoreResult<PlatformLinks> {
        if self.get(shiur_id).await?.is_none() {
            return Err(StoreError::NotFound(format!("shiur {shiur_id}")));
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO platform_links (id, shiur_id, youtube, youtube_music, spotify, apple, amazon, pocket, twenty_four_six, castbox, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(shiur_id) DO UPDATE SET
                youtube = excluded.youtube,
                youtube_music = excluded.youtube_music,
                spotify = excluded.spotify,
                apple = excluded.apple,
                amazon = excluded.amazon,
                pocket = excluded.pocket,
                twenty_four_six = excluded.twenty_four_six,
                castbox = excluded.castbox,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(shiur_id)
        .bind(&fields.youtube)
        .bind(&fields.youtube_music)
        .bind(&fields.spotify)
        .bind(&fields.apple)
        .bind(&fields.amazon)
        .bind(&fields.pocket)
        .bind(&fields.twenty_four_six)
        .bind(&fields.castbox)
        .bind(ts(&now))
        .bind(ts(&now))
        .execute(&self.pool)
        .await?;

        self.platform_links(shiur_id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("platform links missing after upsert for {shiur_id}")))
    }

    async fn summary_counts(&self) -> StoreResult<StoreCounts> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS shiurim,
                   COALESCE(SUM(CASE WHEN blurb IS NOT NULL AND blurb != '' THEN 1 ELSE 0 END), 0) AS with_blurb,
                   COALESCE(SUM(CASE WHEN source_doc IS NOT NULL AND source_doc != '' THEN 1 ELSE 0 END), 0) AS with_source_doc,
                   MIN(pub_date) AS earliest,
                   MAX(pub_date) AS latest
            FROM shiur
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let with_platform_links: i64 = sqlx::query("SELECT COUNT(*) AS n FROM platform_links")
            .fetch_one(&self.pool)
            .await?
            .get("n");

        Ok(StoreCounts {
            shiurim: row.get("shiurim"),
            with_blurb: row.get("with_blurb"),
            with_source_doc: row.get("with_source_doc"),
            with_platform_links,
            earliest_pub_date: row
                .get::<Option<String>, _>("earliest")
                .as_deref()
                .map(parse_ts)
                .transpose()?,
            latest_pub_date: row
                .get::<Option<String>, _>("latest")
                .as_deref()
                .map(parse_ts)
                .transpose()?,
        })
    }
}

/// Timestamps live in TEXT columns as RFC 3339 so lexicographic
/// ORDER BY matches chronological order.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {raw:?}: {e}")))
}

fn row_to_shiur(row: &SqliteRow) -> Result<Shiur, StoreError> {
    Ok(Shiur {
        id: row.get("id"),
        guid: row.get("guid"),
        title: row.get("title"),
        description: row.get("description"),
        blurb: row.get("blurb"),
        audio_url: row.get("audio_url"),
        source_doc: row.get("source_doc"),
        pub_date: parse_ts(&row.get::<String, _>("pub_date"))?,
        duration: row.get("duration"),
        link: row.get("link"),
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
    })
}

fn row_to_links(row: &SqliteRow) -> Result<PlatformLinks, StoreError> {
    Ok(PlatformLinks {
        id: row.get("id"),
        shiur_id: row.get("shiur_id"),
        youtube: row.get("youtube"),
        youtube_music: row.get("youtube_music"),
        spotify: row.get("spotify"),
        apple: row.get("apple"),
        amazon: row.get("amazon"),
        pocket: row.get("pocket"),
        twenty_four_six: row.get("twenty_four_six"),
        castbox: row.get("castbox"),
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
    })
}
