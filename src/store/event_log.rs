use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{Sqlite, SqlitePool};

use crate::model::clock_event::{ClockAction, EventWithOfficer};

/// A clock event about to be appended. Events are raw facts: they are
/// recorded even when the matching state transition is rejected elsewhere,
/// and they are never updated, deleted, or deduplicated.
pub struct NewClockEvent<'a> {
    pub officer_id: i64,
    pub action: ClockAction,
    pub at: NaiveDateTime,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub device_info: Option<&'a str>,
}

/// Append one event and return its id. Generic over the executor so the
/// append can join the attendance transaction.
pub async fn append<'e, E>(executor: E, ev: &NewClockEvent<'_>) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO clock_events (officer_id, action, timestamp, latitude, longitude, device_info)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(ev.officer_id)
    .bind(ev.action.to_string())
    .bind(ev.at)
    .bind(ev.latitude)
    .bind(ev.longitude)
    .bind(ev.device_info)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// All events on a date, newest first, with officer identity.
pub async fn events_on(
    pool: &SqlitePool,
    date: NaiveDate,
) -> Result<Vec<EventWithOfficer>, sqlx::Error> {
    sqlx::query_as::<_, EventWithOfficer>(
        r#"
        SELECT c.id, c.officer_id, o.nip, o.name, c.action, c.timestamp,
               c.latitude, c.longitude, c.device_info
        FROM clock_events c
        JOIN officers o ON c.officer_id = o.id
        WHERE DATE(c.timestamp) = ?
        ORDER BY c.timestamp DESC, c.id DESC
        "#,
    )
    .bind(date)
    .fetch_all(pool)
    .await
}

/// One officer's events on a date, newest first.
pub async fn officer_events_on(
    pool: &SqlitePool,
    officer_id: i64,
    date: NaiveDate,
) -> Result<Vec<EventWithOfficer>, sqlx::Error> {
    sqlx::query_as::<_, EventWithOfficer>(
        r#"
        SELECT c.id, c.officer_id, o.nip, o.name, c.action, c.timestamp,
               c.latitude, c.longitude, c.device_info
        FROM clock_events c
        JOIN officers o ON c.officer_id = o.id
        WHERE c.officer_id = ? AND DATE(c.timestamp) = ?
        ORDER BY c.timestamp DESC, c.id DESC
        "#,
    )
    .bind(officer_id)
    .bind(date)
    .fetch_all(pool)
    .await
}
