use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Middleware для логирования HTTP запросов:
/// метод, путь, статус, длительность и размер ответа
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;
    let (parts, body) = response.into_parts();

    // Читаем тело ответа, чтобы узнать реальный размер
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(
                "{} {} -> {} in {}ms (body error: {})",
                method,
                uri.path(),
                parts.status.as_u16(),
                start.elapsed().as_millis(),
                e
            );
            return Response::from_parts(parts, Body::default());
        }
    };

    tracing::info!(
        "{} {} -> {} in {}ms, {} bytes",
        method,
        uri.path(),
        parts.status.as_u16(),
        start.elapsed().as_millis(),
        bytes.len()
    );

    Response::from_parts(parts, Body::from(bytes))
}
