pub mod handlers;
pub mod routes;
pub mod shared;
pub mod system;
pub mod usecases;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use axum::http::{header, Method};
    use axum::middleware;
    use tokio::net::TcpListener;
    use tower_http::cors::{Any, CorsLayer};

    use shared::config::{self, StorageBackend};

    system::tracing::initialize()?;

    let config = config::load_config()?;

    if config.storage.backend == StorageBackend::Sqlite {
        let db_path = config::get_database_path(&config)?;
        shared::data::db::initialize_database(Some(&db_path.to_string_lossy()))
            .await
            .map_err(|e| anyhow::anyhow!("db init failed: {e}"))?;
    }
    shared::record_store::initialize_store(&config)?;

    let addr = config.bind_addr()?;
    let max_upload_bytes = config.import.max_upload_bytes;
    config::set_config(config)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ACCEPT_LANGUAGE,
        ]);

    let app = routes::configure_routes(max_upload_bytes)
        .layer(middleware::from_fn(
            system::middleware::request_logger::request_logger,
        ))
        .layer(cors);

    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Error: {} is already in use. Please ensure no other process is using this port.",
                    addr
                );
            } else {
                tracing::error!("Failed to bind to {}. Error: {}", addr, e);
            }
            return Err(e.into());
        }
    };

    axum::serve(listener, app).await?;

    Ok(())
}
