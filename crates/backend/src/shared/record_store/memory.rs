use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{Fields, RecordFilter, RecordId, RecordStore, StoredRecord};

#[derive(Default)]
struct MemoryState {
    collections: HashMap<String, Vec<StoredRecord>>,
    next_id: u64,
}

impl MemoryState {
    fn is_taken(&self, id: &RecordId) -> bool {
        self.collections
            .values()
            .flatten()
            .any(|record| &record.id == id)
    }
}

/// Хранилище в памяти процесса. Идентификаторы — возрастающие числа.
#[derive(Default)]
pub struct InMemoryRecordStore {
    state: Mutex<MemoryState>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow::anyhow!("in-memory record store lock poisoned"))
    }

    /// Кладёт запись с заданным идентификатором (для начального наполнения)
    pub fn insert_existing(
        &self,
        collection: &str,
        id: impl Into<String>,
        fields: Fields,
    ) -> anyhow::Result<()> {
        let mut state = self.lock()?;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(StoredRecord {
                id: RecordId(id.into()),
                fields,
            });
        Ok(())
    }

    /// Снимок записей коллекции в порядке вставки
    pub fn records(&self, collection: &str) -> anyhow::Result<Vec<StoredRecord>> {
        let state = self.lock()?;
        Ok(state
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    fn insert_new(state: &mut MemoryState, collection: &str, record: &Fields) -> RecordId {
        // Пропускаем идентификаторы, занятые через insert_existing
        let id = loop {
            state.next_id += 1;
            let candidate = RecordId(state.next_id.to_string());
            if !state.is_taken(&candidate) {
                break candidate;
            }
        };
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(StoredRecord {
                id: id.clone(),
                fields: record.clone(),
            });
        id
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn read_matching(
        &self,
        collection: &str,
        filter: &RecordFilter,
        limit: usize,
    ) -> anyhow::Result<Vec<StoredRecord>> {
        let state = self.lock()?;
        Ok(state
            .collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.matches(&r.fields))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_one(&self, collection: &str, record: &Fields) -> anyhow::Result<RecordId> {
        let mut state = self.lock()?;
        Ok(Self::insert_new(&mut state, collection, record))
    }

    async fn create_many(
        &self,
        collection: &str,
        records: &[Fields],
    ) -> anyhow::Result<Vec<RecordId>> {
        let mut state = self.lock()?;
        Ok(records
            .iter()
            .map(|record| Self::insert_new(&mut state, collection, record))
            .collect())
    }

    async fn update_one(
        &self,
        collection: &str,
        id: &RecordId,
        record: &Fields,
    ) -> anyhow::Result<()> {
        let mut state = self.lock()?;
        let existing = state
            .collections
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| &r.id == id))
            .ok_or_else(|| anyhow::anyhow!("record {} not found in '{}'", id, collection))?;
        for (field, value) in record {
            existing.fields.insert(field.clone(), value.clone());
        }
        Ok(())
    }
}
