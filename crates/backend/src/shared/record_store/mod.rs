pub mod memory;
pub mod sea_orm_store;

pub use memory::InMemoryRecordStore;
pub use sea_orm_store::SeaOrmRecordStore;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::shared::config::{Config, StorageBackend};

/// Поля записи: имя поля -> значение
pub type Fields = Map<String, Value>;

/// Идентификатор записи в хранилище
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

/// Запись, уже сохранённая в коллекции
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub fields: Fields,
}

/// Фильтр `field IN (values)`
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub field: String,
    pub values: Vec<Value>,
}

impl RecordFilter {
    pub fn field_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            values,
        }
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        match fields.get(&self.field) {
            Some(value) => {
                let key = key_of(value);
                self.values.iter().any(|v| key_of(v) == key)
            }
            None => false,
        }
    }
}

/// Canonical key used to compare field values: the JSON encoding,
/// so the string `"7"` and the number `7` stay distinct.
pub fn key_of(value: &Value) -> String {
    value.to_string()
}

/// Хранилище записей коллекций.
///
/// Все операции выполняются в рамках одной коллекции. Ошибки хранилища
/// прерывают импорт целиком; уже выполненные записи не откатываются.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Записи коллекции, удовлетворяющие фильтру, не более `limit`
    async fn read_matching(
        &self,
        collection: &str,
        filter: &RecordFilter,
        limit: usize,
    ) -> anyhow::Result<Vec<StoredRecord>>;

    async fn create_one(&self, collection: &str, record: &Fields) -> anyhow::Result<RecordId>;

    /// Идентификаторы возвращаются в порядке входных записей
    async fn create_many(
        &self,
        collection: &str,
        records: &[Fields],
    ) -> anyhow::Result<Vec<RecordId>>;

    /// Частичное обновление: переданные поля перезаписываются, остальные сохраняются
    async fn update_one(
        &self,
        collection: &str,
        id: &RecordId,
        record: &Fields,
    ) -> anyhow::Result<()>;
}

static STORE: OnceCell<Arc<dyn RecordStore>> = OnceCell::new();

/// Создаёт хранилище согласно конфигурации. Для `sqlite` база должна быть
/// уже инициализирована.
pub fn initialize_store(config: &Config) -> anyhow::Result<()> {
    let store: Arc<dyn RecordStore> = match config.storage.backend {
        StorageBackend::Sqlite => Arc::new(SeaOrmRecordStore::new(
            crate::shared::data::db::get_connection().clone(),
        )),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory record store: imported records are not persisted");
            Arc::new(InMemoryRecordStore::new())
        }
    };
    STORE
        .set(store)
        .map_err(|_| anyhow::anyhow!("Record store already initialized"))?;
    tracing::info!("Record store initialized: {:?}", config.storage.backend);
    Ok(())
}

pub fn get_store() -> &'static Arc<dyn RecordStore> {
    STORE.get().expect("Record store has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_matches_by_json_value() {
        let filter = RecordFilter::field_in("code", vec![json!(7), json!("a1")]);
        assert!(filter.matches(&fields(json!({"code": 7}))));
        assert!(filter.matches(&fields(json!({"code": "a1"}))));
        assert!(!filter.matches(&fields(json!({"code": "7"}))));
        assert!(!filter.matches(&fields(json!({"other": 7}))));
    }

    #[test]
    fn test_key_of_distinguishes_types() {
        assert_ne!(key_of(&json!(7)), key_of(&json!("7")));
        assert_eq!(key_of(&json!(7)), key_of(&json!(7)));
    }
}
