use std::collections::HashSet;
use std::str::FromStr;

use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::auth::AuthUser;
use crate::clock::{Clock, SharedClock};
use crate::error::ApiError;
use crate::model::clock_event::{ClockAction, EventWithOfficer};
use crate::models::ApiResponse;
use crate::store::attendance;
use crate::store::event_log::{self, NewClockEvent};

#[derive(Deserialize)]
pub struct ClockRequest {
    pub status: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub device_info: Option<String>,
}

/// Record a clock event for the authenticated officer.
pub async fn record_clock(
    auth: AuthUser,
    body: web::Json<ClockRequest>,
    pool: web::Data<SqlitePool>,
    clock: web::Data<SharedClock>,
) -> Result<HttpResponse, ApiError> {
    let action = ClockAction::from_str(body.status.trim())
        .map_err(|_| ApiError::Validation("Status must be one of: in, out, break!".into()))?;

    let now = clock.now();
    let outcome = attendance::apply_clock_event(
        pool.get_ref(),
        &NewClockEvent {
            officer_id: auth.officer_id,
            action,
            at: now,
            latitude: body.latitude,
            longitude: body.longitude,
            device_info: body.device_info.as_deref(),
        },
    )
    .await?;

    info!(officer_id = auth.officer_id, action = %action, "Clock event recorded");

    Ok(HttpResponse::Ok().json(ApiResponse::message_with_data(
        format!("Clock {action} recorded!"),
        json!({
            "event_id": outcome.event_id,
            "officer_id": auth.officer_id,
            "action": action,
            "timestamp": now,
            "latitude": body.latitude,
            "longitude": body.longitude,
            "attendance": outcome.attendance,
        }),
    )))
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub date: Option<NaiveDate>,
}

/// Live monitoring view: every officer's newest event on the date, plus the
/// full event history.
pub async fn live_status(
    _auth: AuthUser,
    query: web::Query<StatusQuery>,
    pool: web::Data<SqlitePool>,
    clock: web::Data<SharedClock>,
) -> Result<HttpResponse, ApiError> {
    let date = query.date.unwrap_or_else(|| clock.now().date());
    let events = event_log::events_on(pool.get_ref(), date).await?;

    // Events are ordered newest first, so the first hit per officer wins.
    let mut seen = HashSet::new();
    let mut latest: Vec<&EventWithOfficer> = Vec::new();
    for ev in &events {
        if seen.insert(ev.officer_id) {
            latest.push(ev);
        }
    }

    Ok(HttpResponse::Ok().json(ApiResponse::data(json!({
        "date": date,
        "total_officers": latest.len(),
        "officer_status": latest,
        "event_history": events,
    }))))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub officer_id: Option<i64>,
    pub date: Option<NaiveDate>,
}

/// One officer's events on a date; defaults to the caller and today.
pub async fn history(
    auth: AuthUser,
    query: web::Query<HistoryQuery>,
    pool: web::Data<SqlitePool>,
    clock: web::Data<SharedClock>,
) -> Result<HttpResponse, ApiError> {
    let officer_id = query.officer_id.unwrap_or(auth.officer_id);
    let date = query.date.unwrap_or_else(|| clock.now().date());
    let events = event_log::officer_events_on(pool.get_ref(), officer_id, date).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::data(json!({
        "officer_id": officer_id,
        "date": date,
        "total_events": events.len(),
        "history": events,
    }))))
}
