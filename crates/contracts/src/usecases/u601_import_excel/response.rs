use serde::{Deserialize, Serialize};

/// Что произошло со строкой файла при импорте
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportAction {
    Created,
    Updated,
}

/// Результат обработки одной строки (в порядке строк файла)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub id: String,
    pub action: ImportAction,
}

/// Успешный ответ POST /api/import-excel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResponse {
    pub message: String,
    pub data: Vec<ImportOutcome>,
}

/// Класс ошибки: ошибка клиента (400) или сервера (500)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportErrorKind {
    InvalidInput,
    StoreFailure,
    DecodeFailure,
}

impl ImportErrorKind {
    pub fn is_client_fault(&self) -> bool {
        matches!(self, ImportErrorKind::InvalidInput)
    }
}

/// Тело ответа при ошибке импорта
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportErrorResponse {
    pub message: String,
    pub kind: ImportErrorKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        let outcome = ImportOutcome {
            id: "7".to_string(),
            action: ImportAction::Updated,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, serde_json::json!({"id": "7", "action": "updated"}));
    }

    #[test]
    fn test_error_kind_fault_class() {
        assert!(ImportErrorKind::InvalidInput.is_client_fault());
        assert!(!ImportErrorKind::StoreFailure.is_client_fault());
        assert!(!ImportErrorKind::DecodeFailure.is_client_fault());
        assert_eq!(
            serde_json::to_string(&ImportErrorKind::DecodeFailure).unwrap(),
            "\"decode_failure\""
        );
    }
}
