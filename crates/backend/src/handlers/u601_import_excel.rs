use axum::{
    extract::Multipart,
    http::{header::ACCEPT_LANGUAGE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::shared::config;
use crate::shared::i18n::{resolve_messages, MessageTemplates};
use crate::shared::record_store::{self, RecordStore};
use crate::usecases::u601_import_excel::{ImportError, ImportExecutor, ImportRequest};

/// Поля multipart-формы импорта
#[derive(Debug, Default)]
struct ImportForm {
    request: ImportRequest,
    locale: Option<String>,
}

impl ImportForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, ImportError> {
        let mut form = ImportForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ImportError::MalformedRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ImportError::MalformedRequest(e.body_text()))?;
                    form.request.file = Some(bytes.to_vec());
                }
                "collection" | "mapping" | "keyField" | "key_field" | "locale" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ImportError::MalformedRequest(e.body_text()))?;
                    match name.as_str() {
                        "collection" => form.request.collection = Some(text),
                        "mapping" => form.request.mapping = Some(text),
                        "locale" => form.locale = Some(text),
                        _ => form.request.key_field = Some(text),
                    }
                }
                other => tracing::debug!("Ignoring unknown form field '{}'", other),
            }
        }
        Ok(form)
    }
}

/// POST /api/import-excel
pub async fn import_excel(headers: HeaderMap, multipart: Multipart) -> Response {
    let default_locale = &config::get_config().import.default_locale;
    handle(
        headers,
        multipart,
        default_locale,
        record_store::get_store().clone(),
    )
    .await
}

async fn handle(
    headers: HeaderMap,
    mut multipart: Multipart,
    default_locale: &str,
    store: Arc<dyn RecordStore>,
) -> Response {
    let accept_language = headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let form = match ImportForm::read(&mut multipart).await {
        Ok(form) => form,
        Err(e) => {
            let m = resolve_messages(&[accept_language.as_deref()], default_locale);
            return error_response(e, m);
        }
    };

    let m = resolve_messages(
        &[form.locale.as_deref(), accept_language.as_deref()],
        default_locale,
    );

    match ImportExecutor::new(store).execute(form.request).await {
        Ok(summary) => (StatusCode::OK, Json(summary.to_response(m))).into_response(),
        Err(e) => error_response(e, m),
    }
}

fn error_response(error: ImportError, m: &MessageTemplates) -> Response {
    let kind = error.kind();
    let status = if kind.is_client_fault() {
        tracing::warn!("Excel import rejected: {}", error);
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!("Excel import failed: {:?}", error);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(error.to_response(m))).into_response()
}
