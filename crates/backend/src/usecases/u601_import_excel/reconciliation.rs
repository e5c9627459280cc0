use contracts::usecases::u601_import_excel::{ImportAction, ImportOutcome};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use super::errors::ImportError;
use super::row_projector::CandidateRecord;
use crate::shared::record_store::{key_of, RecordFilter, RecordStore, StoredRecord};

/// Итог сверки: результаты по строкам и счётчики
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub outcomes: Vec<ImportOutcome>,
    pub created: usize,
    pub updated: usize,
}

impl ReconcileReport {
    fn push(&mut self, id: String, action: ImportAction) {
        match action {
            ImportAction::Created => self.created += 1,
            ImportAction::Updated => self.updated += 1,
        }
        self.outcomes.push(ImportOutcome { id, action });
    }
}

/// Проверяет, что каждая запись содержит ключевое поле.
/// Ошибка указывает номер строки файла (с единицы).
pub fn validate_key_field(records: &[CandidateRecord], key_field: &str) -> Result<(), ImportError> {
    match records.iter().find(|r| !r.fields.contains_key(key_field)) {
        Some(record) => Err(ImportError::MissingKeyField {
            field: key_field.to_string(),
            row: record.row + 1,
        }),
        None => Ok(()),
    }
}

/// Создаёт или обновляет записи коллекции.
///
/// Без ключевого поля все записи создаются одним пакетом. С ключевым полем
/// существующие записи читаются одним запросом, после чего строки
/// обрабатываются по порядку: найденные по ключу обновляются, остальные
/// создаются. Сверка идёт только со снимком, прочитанным до записи, поэтому
/// повторяющийся новый ключ создаёт запись для каждой строки, а повторяющийся
/// существующий ключ обновляет одну и ту же запись несколько раз.
pub async fn reconcile(
    store: &dyn RecordStore,
    collection: &str,
    records: &[CandidateRecord],
    key_field: Option<&str>,
) -> Result<ReconcileReport, ImportError> {
    match key_field {
        None => create_all(store, collection, records).await,
        Some(key_field) => upsert_by_key(store, collection, records, key_field).await,
    }
}

async fn create_all(
    store: &dyn RecordStore,
    collection: &str,
    records: &[CandidateRecord],
) -> Result<ReconcileReport, ImportError> {
    let payload: Vec<_> = records.iter().map(|r| r.fields.clone()).collect();
    let ids = store
        .create_many(collection, &payload)
        .await
        .map_err(ImportError::Store)?;

    if ids.len() != records.len() {
        return Err(ImportError::Store(anyhow::anyhow!(
            "store returned {} identifiers for {} created records",
            ids.len(),
            records.len()
        )));
    }

    let mut report = ReconcileReport::default();
    for id in ids {
        report.push(id.0, ImportAction::Created);
    }
    Ok(report)
}

async fn upsert_by_key(
    store: &dyn RecordStore,
    collection: &str,
    records: &[CandidateRecord],
    key_field: &str,
) -> Result<ReconcileReport, ImportError> {
    validate_key_field(records, key_field)?;

    let key_values = distinct_key_values(records, key_field);
    let filter = RecordFilter::field_in(key_field, key_values);
    let limit = filter.values.len();
    let existing = store
        .read_matching(collection, &filter, limit)
        .await
        .map_err(ImportError::Store)?;
    let index = build_index(existing, key_field);

    tracing::info!(
        "Upsert into '{}' by '{}': {} rows, {} distinct keys, {} existing matches",
        collection,
        key_field,
        records.len(),
        limit,
        index.len()
    );

    let mut report = ReconcileReport::default();
    for record in records {
        let key = record.fields.get(key_field).map(key_of).unwrap_or_default();
        match index.get(&key) {
            Some(existing) => {
                store
                    .update_one(collection, &existing.id, &record.fields)
                    .await
                    .map_err(ImportError::Store)?;
                tracing::debug!("Row {}: updated {}", record.row + 1, existing.id);
                report.push(existing.id.0.clone(), ImportAction::Updated);
            }
            None => {
                let id = store
                    .create_one(collection, &record.fields)
                    .await
                    .map_err(ImportError::Store)?;
                tracing::debug!("Row {}: created {}", record.row + 1, id);
                report.push(id.0, ImportAction::Created);
            }
        }
    }
    Ok(report)
}

/// Значения ключа без повторов, в порядке первого появления
fn distinct_key_values(records: &[CandidateRecord], key_field: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|r| r.fields.get(key_field))
        .filter(|value| seen.insert(key_of(value)))
        .cloned()
        .collect()
}

/// Индекс "значение ключа -> существующая запись". При дублях побеждает первая.
fn build_index(existing: Vec<StoredRecord>, key_field: &str) -> HashMap<String, StoredRecord> {
    let mut index = HashMap::new();
    for record in existing {
        if let Some(value) = record.fields.get(key_field) {
            index.entry(key_of(value)).or_insert(record);
        }
    }
    index
}
