use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::handlers;

/// Конфигурация всех роутов приложения
pub fn configure_routes(max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // ========================================
        // USECASES
        // ========================================
        // U601 Excel import (multipart: file, collection, mapping, keyField, locale)
        .route(
            "/api/import-excel",
            post(handlers::u601_import_excel::import_excel)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}
