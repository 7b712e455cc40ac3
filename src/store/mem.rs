use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::models::{PlatformLinkFields, PlatformLinks, Shiur, ShiurFields, StoreCounts};
use super::{ShiurStore, StoreError, StoreResult};

/// In-memory stand-in for the SQLite store. Rows are keyed by guid,
/// links by shiur id. Failure injection covers the two paths the
/// synchronizer cares about: a dead store and per-guid write errors.
#[derive(Default)]
pub struct MemStore {
    rows: Mutex<HashMap<String, Shiur>>,
    links: Mutex<HashMap<String, PlatformLinks>>,
    fail_guids: Mutex<HashSet<String>>,
    down: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later write touching this guid returns an error.
    pub fn fail_writes_for(&self, guid: &str) {
        self.fail_guids.lock().unwrap().insert(guid.to_string());
    }

    /// When down, `ping` fails; reads and writes still work so tests
    /// can assert nothing got past the ping.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn check_write(&self, guid: &str) -> StoreResult<()> {
        if self.fail_guids.lock().unwrap().contains(guid) {
            return Err(StoreError::Unavailable(format!("injected failure for {guid}")));
        }
        Ok(())
    }

    fn shiur_from_fields(id: String, fields: &ShiurFields) -> Shiur {
        let now = Utc::now();
        Shiur {
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
        }
    }
}

#[async_trait]
impl ShiurStore for MemStore {
    async fn ping(&self) -> StoreResult<()> {
        self.record("ping");
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store marked down".to_string()));
        }
        Ok(())
    }

    async fn find_by_guid(&self, guid: &str) -> StoreResult<Option<Shiur>> {
        self.record(format!("find_by_guid {guid}"));
        Ok(self.rows.lock().unwrap().get(guid).cloned())
    }

    async fn create(&self, fields: &ShiurFields) -> StoreResult<Shiur> {
        self.record(format!("create {}", fields.guid));
        self.check_write(&fields.guid)?;
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&fields.guid) {
            return Err(StoreError::Unavailable(format!("duplicate guid {}", fields.guid)));
        }
        let shiur = Self::shiur_from_fields(Uuid::new_v4().to_string(), fields);
        rows.insert(fields.guid.clone(), shiur.clone());
        Ok(shiur)
    }

    async fn update(&self, guid: &str, fields: &ShiurFields) -> StoreResult<Shiur> {
        self.record(format!("update {guid}"));
        self.check_write(guid)?;
        let mut rows = self.rows.lock().unwrap();
        let existing = rows
            .get(guid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("shiur with guid {guid}")))?;
        let mut shiur = Self::shiur_from_fields(existing.id, fields);
        shiur.guid = existing.guid.clone();
        shiur.created_at = existing.created_at;
        rows.insert(existing.guid, shiur.clone());
        Ok(shiur)
    }

    async fn list(&self, limit: Option<i64>) -> StoreResult<Vec<Shiur>> {
        self.record("list");
        let mut all: Vec<Shiur> = self.rows.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
        if let Some(n) = limit {
            all.truncate(n.max(0) as usize);
        }
        Ok(all)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Shiur>> {
        self.record(format!("get {id}"));
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn update_by_id(&self, id: &str, fields: &ShiurFields) -> StoreResult<Shiur> {
        self.record(format!("update_by_id {id}"));
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("shiur {id}")))?;
        self.update(&existing.guid, fields).await
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.record(format!("delete {id}"));
        let mut rows = self.rows.lock().unwrap();
        let guid = rows.values().find(|s| s.id == id).map(|s| s.guid.clone());
        match guid {
            Some(guid) => {
                rows.remove(&guid);
                self.links.lock().unwrap().remove(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn platform_links(&self, shiur_id: &str) -> StoreResult<Option<PlatformLinks>> {
        self.record(format!("platform_links {shiur_id}"));
        Ok(self.links.lock().unwrap().get(shiur_id).cloned())
    }

    async fn put_platform_links(
        &self,
        shiur_id: &str,
        fields: &PlatformLinkFields,
    ) -> StoreResult<PlatformLinks> {
        self.record(format!("put_platform_links {shiur_id}"));
        if self.get(shiur_id).await?.is_none() {
            return Err(StoreError::NotFound(format!("shiur {shiur_id}")));
        }
        let now = Utc::now();
        let mut links = self.links.lock().unwrap();
        let existing = links.get(shiur_id);
        let row = PlatformLinks {
            id: existing
                .map(|l| l.id.clone())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            shiur_id: shiur_id.to_string(),
            youtube: fields.youtube.clone(),
            youtube_music: fields.youtube_music.clone(),
            spotify: fields.spotify.clone(),
            apple: fields.apple.clone(),
            amazon: fields.amazon.clone(),
            pocket: fields.pocket.clone(),
            twenty_four_six: fields.twenty_four_six.clone(),
            castbox: fields.castbox.clone(),
            created_at: existing.map(|l| l.created_at).unwrap_or(now),
            updated_at: now,
        };
        links.insert(shiur_id.to_string(), row.clone());
        Ok(row)
    }

    async fn summary_counts(&self) -> StoreResult<StoreCounts> {
        self.record("summary_counts");
        let rows = self.rows.lock().unwrap();
        let non_empty = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        Ok(StoreCounts {
            shiurim: rows.len() as i64,
            with_blurb: rows.values().filter(|s| non_empty(&s.blurb)).count() as i64,
            with_source_doc: rows.values().filter(|s| non_empty(&s.source_doc)).count() as i64,
            with_platform_links: self.links.lock().unwrap().len() as i64,
            earliest_pub_date: rows.values().map(|s| s.pub_date).min(),
            latest_pub_date: rows.values().map(|s| s.pub_date).max(),
        })
    }
}
