use async_trait::async_trait;

#[cfg(test)]
pub mod mem;
pub mod models;
pub mod sqlite;

pub use models::{PlatformLinkFields, PlatformLinks, Shiur, ShiurFields, StoreCounts};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    NotFound(String),
    Unavailable(String),
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(err) => write!(f, "database error: {err}"),
            StoreError::NotFound(what) => write!(f, "not found: {what}"),
            StoreError::Unavailable(why) => write!(f, "store unavailable: {why}"),
            StoreError::Corrupt(what) => write!(f, "corrupt row: {what}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(err) => Some(err),
            _ => None,
        }
    }
}

/// Persistence seam for shiur content. The synchronizer and the admin
/// ops only ever talk to this trait, never to SQL directly, so tests
/// can stand in an in-memory double.
#[async_trait]
pub trait ShiurStore: Send + Sync {
    /// Cheap connectivity check; sync refuses to process items when this fails.
    async fn ping(&self) -> StoreResult<()>;

    async fn find_by_guid(&self, guid: &str) -> StoreResult<Option<Shiur>>;

    /// Insert a new row keyed by `fields.guid`. Fails on guid collision.
    async fn create(&self, fields: &ShiurFields) -> StoreResult<Shiur>;

    /// Full overwrite of the row with this guid. The guid itself is immutable.
    async fn update(&self, guid: &str, fields: &ShiurFields) -> StoreResult<Shiur>;

    /// Newest first by publish date. `None` returns everything.
    async fn list(&self, limit: Option<i64>) -> StoreResult<Vec<Shiur>>;

    async fn get(&self, id: &str) -> StoreResult<Option<Shiur>>;

    /// Accepts either a local id or an upstream guid.
    async fn resolve(&self, id_or_guid: &str) -> StoreResult<Option<Shiur>> {
        if let Some(shiur) = self.get(id_or_guid).await? {
            return Ok(Some(shiur));
        }
        self.find_by_guid(id_or_guid).await
    }

    /// Full overwrite addressed by local id; the stored guid is left as is.
    async fn update_by_id(&self, id: &str, fields: &ShiurFields) -> StoreResult<Shiur>;

    /// Returns false when no row matched. Platform links go with the row.
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    async fn platform_links(&self, shiur_id: &str) -> StoreResult<Option<PlatformLinks>>;

    /// Upsert the one links row for a shiur, replacing all platform columns.
    async fn put_platform_links(
        &self,
        shiur_id: &str,
        fields: &PlatformLinkFields,
    ) -> StoreResult<PlatformLinks>;

    async fn summary_counts(&self) -> StoreResult<StoreCounts>;
}
