use contracts::usecases::u601_import_excel::{ImportErrorKind, ImportErrorResponse};
use thiserror::Error;

use crate::shared::i18n::{format_message, MessageTemplates};
use crate::shared::spreadsheet::DecodeError;

/// Ошибки импорта. Любая ошибка прерывает запрос целиком.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed upload request: {0}")]
    MalformedRequest(String),

    #[error("missing file")]
    MissingFile,

    #[error("missing target collection")]
    MissingCollection,

    #[error("missing mapping")]
    MissingMapping,

    #[error("invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("empty file")]
    EmptyFile,

    #[error("no valid items to import")]
    NoValidItems,

    #[error("row {row} is missing key field '{field}'")]
    MissingKeyField { field: String, row: usize },

    #[error("cannot decode spreadsheet: {0}")]
    Decode(#[from] DecodeError),

    #[error("store operation failed: {0:#}")]
    Store(anyhow::Error),
}

impl ImportError {
    pub fn kind(&self) -> ImportErrorKind {
        match self {
            ImportError::Decode(_) => ImportErrorKind::DecodeFailure,
            ImportError::Store(_) => ImportErrorKind::StoreFailure,
            _ => ImportErrorKind::InvalidInput,
        }
    }

    /// Текст для клиента на выбранном языке
    pub fn localized_message(&self, m: &MessageTemplates) -> String {
        match self {
            ImportError::MalformedRequest(detail) => {
                format_message(m.malformed_request, &[("error", detail.clone())])
            }
            ImportError::MissingFile => m.missing_file.to_string(),
            ImportError::MissingCollection => m.missing_collection.to_string(),
            ImportError::MissingMapping => m.missing_mapping.to_string(),
            ImportError::InvalidMapping(detail) => {
                format_message(m.invalid_mapping, &[("error", detail.clone())])
            }
            ImportError::EmptyFile => m.empty_file.to_string(),
            ImportError::NoValidItems => m.no_valid_items.to_string(),
            ImportError::MissingKeyField { field, .. } => {
                format_message(m.missing_key_for_upsert, &[("keyField", field.clone())])
            }
            ImportError::Decode(e) => format_message(m.internal_error, &[("error", e.to_string())]),
            ImportError::Store(e) => format_message(m.internal_error, &[("error", format!("{e:#}"))]),
        }
    }

    pub fn to_response(&self, m: &MessageTemplates) -> ImportErrorResponse {
        ImportErrorResponse {
            message: self.localized_message(m),
            kind: self.kind(),
        }
    }
}
