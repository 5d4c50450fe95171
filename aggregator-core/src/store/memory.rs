use async_trait::async_trait;
use parking_lot::RwLock;

use super::{WeatherStore, latest_for};
use crate::{StorageError, WeatherRecord};

/// Append-only store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<WeatherRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records for `city` in insertion order.
    pub fn history(&self, city: &str) -> Vec<WeatherRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.is_for_city(city))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl WeatherStore for MemoryStore {
    async fn find_latest(&self, city: &str) -> Result<Option<WeatherRecord>, StorageError> {
        Ok(latest_for(self.records.read().iter(), city).cloned())
    }

    async fn save(&self, mut record: WeatherRecord) -> Result<WeatherRecord, StorageError> {
        let mut records = self.records.write();
        // max(id)+1 so ids stay unique even for records inserted with an explicit id.
        let next_id = records.iter().filter_map(|r| r.id).max().unwrap_or(0) + 1;
        record.id = Some(next_id);
        records.push(record.clone());
        Ok(record)
    }
}
