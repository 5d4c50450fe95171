use crate::{StorageError, WeatherRecord};
use async_trait::async_trait;

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Persistence for weather records.
///
/// Stores are append-only: `save` always adds a record and `find_latest`
/// returns the one with the greatest `last_updated` for the city. Old rows
/// are never pruned here; retention belongs to whoever owns the storage.
#[async_trait]
pub trait WeatherStore: Send + Sync {
    /// Most recently updated record for `city`, if any was ever saved.
    async fn find_latest(&self, city: &str) -> Result<Option<WeatherRecord>, StorageError>;

    /// Append `record`, assigning an id, and return the stored form.
    async fn save(&self, record: WeatherRecord) -> Result<WeatherRecord, StorageError>;
}

/// Pick the latest record for `city`; on equal timestamps the later one wins.
pub(crate) fn latest_for<'a, I>(records: I, city: &str) -> Option<&'a WeatherRecord>
where
    I: IntoIterator<Item = &'a WeatherRecord>,
{
    records
        .into_iter()
        .filter(|r| r.is_for_city(city))
        .max_by_key(|r| r.last_updated)
}
