use once_cell::sync::OnceCell;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};

static DB_CONN: OnceCell<DatabaseConnection> = OnceCell::new();

pub async fn initialize_database(db_path: Option<&str>) -> anyhow::Result<()> {
    let db_file = db_path.unwrap_or("target/db/app.db");
    if let Some(parent) = std::path::Path::new(db_file).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if std::path::Path::new(db_file).is_absolute() {
        std::path::PathBuf::from(db_file)
    } else {
        std::env::current_dir()?.join(db_file)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);
    tracing::info!("Connecting to database: {}", db_url);
    let conn = Database::connect(&db_url).await?;

    ensure_schema(&conn).await?;

    DB_CONN
        .set(conn)
        .map_err(|_| anyhow::anyhow!("Database connection already initialized"))?;
    Ok(())
}

/// Создаёт таблицу импортируемых записей, если её ещё нет
pub async fn ensure_schema(conn: &DatabaseConnection) -> anyhow::Result<()> {
    let check_table = r#"
        SELECT name FROM sqlite_master
        WHERE type='table' AND name='import_record';
    "#;
    let existing = conn
        .query_all(Statement::from_string(
            DatabaseBackend::Sqlite,
            check_table.to_string(),
        ))
        .await?;

    if !existing.is_empty() {
        tracing::debug!("Table import_record already exists");
        return Ok(());
    }

    tracing::info!("Creating import_record table");
    let create_table_sql = r#"
        CREATE TABLE import_record (
            id TEXT PRIMARY KEY NOT NULL,
            collection TEXT NOT NULL,
            data_json TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#;
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        create_table_sql.to_string(),
    ))
    .await?;

    let create_index_sql = r#"
        CREATE INDEX IF NOT EXISTS idx_import_record_collection
        ON import_record (collection, created_at);
    "#;
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        create_index_sql.to_string(),
    ))
    .await?;

    Ok(())
}

pub fn get_connection() -> &'static DatabaseConnection {
    DB_CONN
        .get()
        .expect("Database connection has not been initialized")
}
