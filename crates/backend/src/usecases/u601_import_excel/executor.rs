use contracts::usecases::u601_import_excel::ImportResponse;
use std::sync::Arc;

use super::errors::ImportError;
use super::reconciliation::{self, ReconcileReport};
use super::row_projector::{self, ColumnMapping};
use crate::shared::i18n::{format_message, MessageTemplates};
use crate::shared::record_store::RecordStore;
use crate::shared::spreadsheet::decode_spreadsheet;

/// Параметры импорта, собранные из multipart-запроса.
/// Пустые строки считаются отсутствующими значениями.
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub file: Option<Vec<u8>>,
    pub collection: Option<String>,
    pub mapping: Option<String>,
    pub key_field: Option<String>,
}

/// Результат успешного импорта
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub key_field: Option<String>,
    pub report: ReconcileReport,
}

impl ImportSummary {
    /// Ответ клиенту: сообщение зависит от того, был ли upsert
    pub fn to_response(&self, m: &MessageTemplates) -> ImportResponse {
        let count = self.report.outcomes.len();
        let message = match self.key_field {
            Some(_) => format_message(
                m.processed_items,
                &[
                    ("count", count.to_string()),
                    ("created", self.report.created.to_string()),
                    ("updated", self.report.updated.to_string()),
                ],
            ),
            None => format_message(m.items_created, &[("count", count.to_string())]),
        };
        ImportResponse {
            message,
            data: self.report.outcomes.clone(),
        }
    }
}

/// Executor для UseCase импорта строк таблицы в коллекцию
pub struct ImportExecutor {
    store: Arc<dyn RecordStore>,
}

impl ImportExecutor {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Выполнить импорт.
    ///
    /// Все проверки входных данных выполняются до первого обращения к
    /// хранилищу. Ошибка хранилища прерывает импорт, уже записанные строки
    /// остаются в коллекции.
    pub async fn execute(&self, request: ImportRequest) -> Result<ImportSummary, ImportError> {
        let file = request.file.ok_or(ImportError::MissingFile)?;
        let collection = non_blank(request.collection).ok_or(ImportError::MissingCollection)?;
        let raw_mapping = non_blank(request.mapping).ok_or(ImportError::MissingMapping)?;
        let key_field = non_blank(request.key_field);

        let mapping = ColumnMapping::parse(&raw_mapping)?;

        let rows = decode_spreadsheet(&file)?;
        if rows.is_empty() {
            return Err(ImportError::EmptyFile);
        }

        let records = row_projector::project(&rows, &mapping);
        tracing::info!(
            "Excel import into '{}': {} rows read, {} mapped columns, {} items",
            collection,
            rows.len(),
            mapping.len(),
            records.len()
        );
        if records.is_empty() {
            return Err(ImportError::NoValidItems);
        }

        if let Some(key_field) = key_field.as_deref() {
            reconciliation::validate_key_field(&records, key_field)?;
        }

        let started_at = std::time::Instant::now();
        let report = reconciliation::reconcile(
            self.store.as_ref(),
            &collection,
            &records,
            key_field.as_deref(),
        )
        .await?;

        tracing::info!(
            "Excel import finished: collection={}, created={}, updated={}, elapsed_ms={}",
            collection,
            report.created,
            report.updated,
            started_at.elapsed().as_millis()
        );

        Ok(ImportSummary { key_field, report })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::i18n::resolve_messages;
    use crate::usecases::u601_import_excel::reconciliation::tests::RecordingStore;
    use contracts::usecases::u601_import_excel::{ImportAction, ImportErrorKind};
    use rust_xlsxwriter::Workbook;
    use serde_json::json;

    fn request(file: &[u8], mapping: &str, key_field: Option<&str>) -> ImportRequest {
        ImportRequest {
            file: Some(file.to_vec()),
            collection: Some("contacts".to_string()),
            mapping: Some(mapping.to_string()),
            key_field: key_field.map(str::to_string),
        }
    }

    const MAPPING: &str = r#"{"0": "name", "1": "email"}"#;

    #[tokio::test]
    async fn test_import_without_key() {
        let store = Arc::new(RecordingStore::new());
        let executor = ImportExecutor::new(store.clone());

        let summary = executor
            .execute(request(b"a1,b1\na2,b2\n", MAPPING, None))
            .await
            .unwrap();

        let m = resolve_messages(&[Some("en-US")], "en-US");
        let response = summary.to_response(m);
        assert_eq!(response.message, "2 items successfully created.");
        assert_eq!(response.data.len(), 2);
        assert!(response
            .data
            .iter()
            .all(|o| o.action == ImportAction::Created));

        let records = store.inner.records("contacts").unwrap();
        assert_eq!(
            serde_json::Value::Object(records[0].fields.clone()),
            json!({"name": "a1", "email": "b1"})
        );
    }

    #[tokio::test]
    async fn test_import_with_key_upserts() {
        let store = Arc::new(RecordingStore::new());
        store
            .inner
            .insert_existing("contacts", "7", json!({"name": "a1"}).as_object().cloned().unwrap())
            .unwrap();
        let executor = ImportExecutor::new(store.clone());

        let summary = executor
            .execute(request(b"a1,b1\na2,b2\n", MAPPING, Some("name")))
            .await
            .unwrap();

        assert_eq!(summary.report.created, 1);
        assert_eq!(summary.report.updated, 1);
        assert_eq!(summary.report.outcomes[0].id, "7");

        let m = resolve_messages(&[Some("fr")], "en-US");
        assert_eq!(
            summary.to_response(m).message,
            "2 éléments traités : 1 créés, 1 mis à jour."
        );
    }

    #[tokio::test]
    async fn test_long_numeric_codes_are_stored_and_matched_exactly() {
        let store = Arc::new(RecordingStore::new());
        store
            .inner
            .insert_existing(
                "contacts",
                "7",
                json!({"code": 9_007_199_254_740_992_i64, "big": "old"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .unwrap();
        let executor = ImportExecutor::new(store.clone());

        let summary = executor
            .execute(request(
                b"9007199254740993,12345678901234567890\n",
                r#"{"0": "code", "1": "big"}"#,
                Some("code"),
            ))
            .await
            .unwrap();

        // Соседний код 2^53 не должен совпасть
        assert_eq!(summary.report.created, 1);
        assert_eq!(summary.report.updated, 0);

        let records = store.inner.records("contacts").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields["big"], json!("old"));
        assert_eq!(records[1].fields["code"], json!(9_007_199_254_740_993_i64));
        assert_eq!(
            records[1].fields["big"],
            json!(12_345_678_901_234_567_890_u64)
        );
    }

    #[tokio::test]
    async fn test_import_xlsx_file() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "a1").unwrap();
        sheet.write_number(0, 1, 42.0).unwrap();
        sheet.write_string(1, 0, "a2").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let store = Arc::new(RecordingStore::new());
        let executor = ImportExecutor::new(store.clone());
        let summary = executor
            .execute(request(&bytes, r#"{"0": "name", "1": "age"}"#, None))
            .await
            .unwrap();

        assert_eq!(summary.report.created, 2);
        let records = store.inner.records("contacts").unwrap();
        assert_eq!(records[0].fields["age"], json!(42));
        assert!(!records[1].fields.contains_key("age"));
    }

    #[tokio::test]
    async fn test_missing_key_field_aborts_request() {
        let store = Arc::new(RecordingStore::new());
        let executor = ImportExecutor::new(store.clone());

        let err = executor
            .execute(request(b",b1\n", MAPPING, Some("name")))
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::MissingKeyField { ref field, row: 1 } if field == "name"));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_row_is_sheet_row() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(2, 0, "a3").unwrap();
        sheet.write_string(3, 1, "b4").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let store = Arc::new(RecordingStore::new());
        let executor = ImportExecutor::new(store.clone());
        let err = executor
            .execute(request(&bytes, MAPPING, Some("name")))
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::MissingKeyField { row: 4, .. }));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_client_faults_never_touch_store() {
        let store = Arc::new(RecordingStore::new());
        let executor = ImportExecutor::new(store.clone());

        let cases: Vec<(ImportRequest, fn(&ImportError) -> bool)> = vec![
            (
                ImportRequest {
                    file: None,
                    ..request(b"a", MAPPING, None)
                },
                |e| matches!(e, ImportError::MissingFile),
            ),
            (
                ImportRequest {
                    collection: Some("  ".to_string()),
                    ..request(b"a", MAPPING, None)
                },
                |e| matches!(e, ImportError::MissingCollection),
            ),
            (
                ImportRequest {
                    mapping: None,
                    ..request(b"a", MAPPING, None)
                },
                |e| matches!(e, ImportError::MissingMapping),
            ),
            (
                request(b"a", "{not json", None),
                |e| matches!(e, ImportError::InvalidMapping(_)),
            ),
            (request(b"", MAPPING, None), |e| {
                matches!(e, ImportError::EmptyFile)
            }),
            (request(b",,\n", MAPPING, None), |e| {
                matches!(e, ImportError::NoValidItems)
            }),
            (request(b"a1,b1\n", "{}", None), |e| {
                matches!(e, ImportError::NoValidItems)
            }),
        ];

        for (req, expected) in cases {
            let err = executor.execute(req).await.unwrap_err();
            assert!(expected(&err), "unexpected error: {err:?}");
            assert_eq!(err.kind(), ImportErrorKind::InvalidInput);
        }
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_blank_key_field_means_plain_create() {
        let store = Arc::new(RecordingStore::new());
        let executor = ImportExecutor::new(store.clone());
        let summary = executor
            .execute(request(b"a1,b1\n", MAPPING, Some("")))
            .await
            .unwrap();
        assert!(summary.key_field.is_none());
        assert_eq!(store.calls(), vec!["create_many 1"]);
    }

    #[tokio::test]
    async fn test_undecodable_file_is_server_fault() {
        let store = Arc::new(RecordingStore::new());
        let executor = ImportExecutor::new(store.clone());
        let err = executor
            .execute(request(b"PK\x03\x04garbage", MAPPING, None))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ImportErrorKind::DecodeFailure);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_server_fault() {
        let mut recording = RecordingStore::new();
        recording.fail_on_write = Some(1);
        let store = Arc::new(recording);
        let executor = ImportExecutor::new(store.clone());
        let err = executor
            .execute(request(b"a1,b1\n", MAPPING, None))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ImportErrorKind::StoreFailure);
    }
}
