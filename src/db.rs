use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::auth::password::hash_password;

pub async fn init_db(database_url: &str) -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .expect("Failed to connect to database")
}

/// Bootstrap the schema. Idempotent; runs at every startup.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS officers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nip TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            password TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'officer',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS daily_attendance (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            officer_id INTEGER NOT NULL REFERENCES officers (id),
            date TEXT NOT NULL,
            clock_in TEXT,
            clock_out TEXT,
            status TEXT NOT NULL DEFAULT 'present',
            note TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (officer_id, date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clock_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            officer_id INTEGER NOT NULL REFERENCES officers (id),
            action TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            device_info TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rate_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fingerprint TEXT NOT NULL,
            endpoint TEXT NOT NULL,
            at_ms INTEGER NOT NULL,
            ip_address TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_rate_events_key ON rate_events (fingerprint, endpoint, at_ms)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed one admin and two officer accounts (password `admin123`) on an
/// empty officers table so a fresh install is usable immediately.
pub async fn seed_default_officers(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM officers")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let hashed = hash_password("admin123");
    for (nip, name, role) in [
        ("123456", "Administrator", "admin"),
        ("654321", "Officer 1", "officer"),
        ("789012", "Officer 2", "officer"),
    ] {
        sqlx::query("INSERT OR IGNORE INTO officers (nip, name, password, role) VALUES (?, ?, ?, ?)")
            .bind(nip)
            .bind(name)
            .bind(&hashed)
            .bind(role)
            .execute(pool)
            .await?;
    }

    info!("Seeded default officer accounts");
    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // Single connection: `sqlite::memory:` databases are per-connection.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    ensure_schema(&pool).await.unwrap();
    pool
}
