use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::ApiError;
use crate::model::attendance::{AttendanceWithOfficer, DailyAttendance, DayState};
use crate::model::clock_event::ClockAction;
use crate::store::event_log::{self, NewClockEvent};

#[derive(Debug)]
pub struct ClockOutcome {
    pub event_id: i64,
    /// None for break events, which never touch the daily record.
    pub attendance: Option<DailyAttendance>,
}

/// Apply one clock event: run the state transition (none for `break`) and
/// append the event-log row inside a single transaction, so the pair lands
/// as one unit or not at all.
pub async fn apply_clock_event(
    pool: &SqlitePool,
    ev: &NewClockEvent<'_>,
) -> Result<ClockOutcome, ApiError> {
    let mut tx = pool.begin().await?;

    let attendance = match ev.action {
        ClockAction::In => Some(record_clock_in(&mut *tx, ev.officer_id, ev.at).await?),
        ClockAction::Out => Some(record_clock_out(&mut *tx, ev.officer_id, ev.at).await?),
        ClockAction::Break => None,
    };

    let event_id = event_log::append(&mut *tx, ev).await?;
    tx.commit().await?;

    Ok(ClockOutcome {
        event_id,
        attendance,
    })
}

/// `NotStarted -> InProgress`. Creates today's row, or fills `clock_in` on a
/// pre-existing row that lacks it. The guarded write plus the
/// UNIQUE(officer_id, date) constraint keep concurrent replays down to
/// exactly one success; the loser is reported as `AlreadyClockedIn`.
pub async fn record_clock_in(
    conn: &mut SqliteConnection,
    officer_id: i64,
    when: NaiveDateTime,
) -> Result<DailyAttendance, ApiError> {
    let date = when.date();
    let existing = fetch_day(&mut *conn, officer_id, date).await?;

    match DayState::of(existing.as_ref()) {
        DayState::InProgress | DayState::Completed => Err(ApiError::AlreadyClockedIn),
        DayState::NotStarted => {
            match existing {
                Some(row) => {
                    let res = sqlx::query(
                        "UPDATE daily_attendance SET clock_in = ? WHERE id = ? AND clock_in IS NULL",
                    )
                    .bind(when.time())
                    .bind(row.id)
                    .execute(&mut *conn)
                    .await?;
                    if res.rows_affected() == 0 {
                        return Err(ApiError::AlreadyClockedIn);
                    }
                }
                None => {
                    let res = sqlx::query(
                        r#"
                        INSERT INTO daily_attendance (officer_id, date, clock_in, status)
                        VALUES (?, ?, ?, 'present')
                        "#,
                    )
                    .bind(officer_id)
                    .bind(date)
                    .bind(when.time())
                    .execute(&mut *conn)
                    .await;
                    if let Err(e) = res {
                        if let sqlx::Error::Database(db_err) = &e {
                            if db_err.is_unique_violation() {
                                return Err(ApiError::AlreadyClockedIn);
                            }
                        }
                        return Err(e.into());
                    }
                }
            }

            fetch_day(&mut *conn, officer_id, date)
                .await?
                .ok_or_else(|| ApiError::Storage(sqlx::Error::RowNotFound))
        }
    }
}

/// `InProgress -> Completed`. Rejected with `NotClockedInYet` from
/// `NotStarted` and `AlreadyClockedOut` from `Completed`; the guarded
/// UPDATE admits exactly one winner under concurrent replays.
pub async fn record_clock_out(
    conn: &mut SqliteConnection,
    officer_id: i64,
    when: NaiveDateTime,
) -> Result<DailyAttendance, ApiError> {
    let date = when.date();
    let existing = fetch_day(&mut *conn, officer_id, date).await?;

    match DayState::of(existing.as_ref()) {
        DayState::NotStarted => Err(ApiError::NotClockedInYet),
        DayState::Completed => Err(ApiError::AlreadyClockedOut),
        DayState::InProgress => {
            let res = sqlx::query(
                r#"
                UPDATE daily_attendance SET clock_out = ?
                WHERE officer_id = ? AND date = ?
                  AND clock_in IS NOT NULL AND clock_out IS NULL
                "#,
            )
            .bind(when.time())
            .bind(officer_id)
            .bind(date)
            .execute(&mut *conn)
            .await?;
            if res.rows_affected() == 0 {
                // Lost a race against another clock-out.
                return Err(ApiError::AlreadyClockedOut);
            }

            fetch_day(&mut *conn, officer_id, date)
                .await?
                .ok_or_else(|| ApiError::Storage(sqlx::Error::RowNotFound))
        }
    }
}

async fn fetch_day(
    conn: &mut SqliteConnection,
    officer_id: i64,
    date: NaiveDate,
) -> Result<Option<DailyAttendance>, sqlx::Error> {
    sqlx::query_as::<_, DailyAttendance>(
        r#"
        SELECT id, officer_id, date, clock_in, clock_out, status, note
        FROM daily_attendance
        WHERE officer_id = ? AND date = ?
        "#,
    )
    .bind(officer_id)
    .bind(date)
    .fetch_optional(&mut *conn)
    .await
}

/// Attendance rows for one date, joined with officer identity.
pub async fn rows_for_date(
    pool: &SqlitePool,
    date: NaiveDate,
) -> Result<Vec<AttendanceWithOfficer>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceWithOfficer>(
        r#"
        SELECT a.id, a.officer_id, o.nip, o.name, o.role,
               a.date, a.clock_in, a.clock_out, a.status, a.note
        FROM daily_attendance a
        JOIN officers o ON a.officer_id = o.id
        WHERE a.date = ?
        ORDER BY o.name
        "#,
    )
    .bind(date)
    .fetch_all(pool)
    .await
}

/// Attendance rows for an inclusive date range, newest date first.
pub async fn rows_for_range(
    pool: &SqlitePool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<AttendanceWithOfficer>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceWithOfficer>(
        r#"
        SELECT a.id, a.officer_id, o.nip, o.name, o.role,
               a.date, a.clock_in, a.clock_out, a.status, a.note
        FROM daily_attendance a
        JOIN officers o ON a.officer_id = o.id
        WHERE a.date BETWEEN ? AND ?
        ORDER BY a.date DESC, o.name
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

/// One officer's attendance rows for an inclusive date range.
pub async fn officer_rows_for_range(
    pool: &SqlitePool,
    officer_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<AttendanceWithOfficer>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceWithOfficer>(
        r#"
        SELECT a.id, a.officer_id, o.nip, o.name, o.role,
               a.date, a.clock_in, a.clock_out, a.status, a.note
        FROM daily_attendance a
        JOIN officers o ON a.officer_id = o.id
        WHERE a.officer_id = ? AND a.date BETWEEN ? AND ?
        ORDER BY a.date DESC
        "#,
    )
    .bind(officer_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}
