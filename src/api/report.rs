use std::collections::BTreeMap;

use actix_web::{HttpResponse, http::header, web};
use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;

use crate::auth::auth::AuthUser;
use crate::clock::{Clock, SharedClock};
use crate::config::Config;
use crate::error::ApiError;
use crate::model::attendance::{
    AttendanceWithOfficer, PresenceStatus, presence_status, work_minutes,
};
use crate::models::ApiResponse;
use crate::store::attendance;

/// Attendance row with its derived fields. Duration and presence are
/// recomputed from the raw clock times on every read.
#[derive(Serialize)]
struct AttendanceDetail {
    #[serde(flatten)]
    row: AttendanceWithOfficer,
    work_minutes: Option<i64>,
    presence: PresenceStatus,
}

fn detail(row: AttendanceWithOfficer, cutoff: NaiveTime) -> AttendanceDetail {
    let minutes = work_minutes(row.clock_in, row.clock_out);
    let presence = presence_status(row.clock_in, cutoff);
    AttendanceDetail {
        row,
        work_minutes: minutes,
        presence,
    }
}

#[derive(Serialize)]
struct Stats {
    total_records: usize,
    present: usize,
    absent: usize,
    late: usize,
    on_time: usize,
    attendance_pct: i64,
}

fn stats(details: &[AttendanceDetail]) -> Stats {
    let total = details.len();
    let present = details.iter().filter(|d| d.row.clock_in.is_some()).count();
    let late = details
        .iter()
        .filter(|d| d.presence == PresenceStatus::Late)
        .count();
    let on_time = details
        .iter()
        .filter(|d| d.presence == PresenceStatus::OnTime)
        .count();
    let attendance_pct = if total > 0 {
        ((present as f64 / total as f64) * 100.0).round() as i64
    } else {
        0
    };

    Stats {
        total_records: total,
        present,
        absent: total - present,
        late,
        on_time,
        attendance_pct,
    }
}

#[derive(Serialize)]
struct OfficerSummary {
    officer_id: i64,
    nip: String,
    name: String,
    role: String,
    total_days: usize,
    present: usize,
    absent: usize,
    late: usize,
    on_time: usize,
    total_work_minutes: i64,
    avg_work_minutes: i64,
}

fn summarize_per_officer(details: &[AttendanceDetail]) -> Vec<OfficerSummary> {
    let mut by_officer: BTreeMap<i64, OfficerSummary> = BTreeMap::new();

    for d in details {
        let s = by_officer
            .entry(d.row.officer_id)
            .or_insert_with(|| OfficerSummary {
                officer_id: d.row.officer_id,
                nip: d.row.nip.clone(),
                name: d.row.name.clone(),
                role: d.row.role.clone(),
                total_days: 0,
                present: 0,
                absent: 0,
                late: 0,
                on_time: 0,
                total_work_minutes: 0,
                avg_work_minutes: 0,
            });

        s.total_days += 1;
        match d.presence {
            PresenceStatus::Absent => s.absent += 1,
            PresenceStatus::Late => {
                s.present += 1;
                s.late += 1;
            }
            PresenceStatus::OnTime => {
                s.present += 1;
                s.on_time += 1;
            }
        }
        s.total_work_minutes += d.work_minutes.unwrap_or(0);
    }

    let mut summaries: Vec<_> = by_officer.into_values().collect();
    for s in &mut summaries {
        if s.present > 0 {
            s.avg_work_minutes = s.total_work_minutes / s.present as i64;
        }
    }
    summaries
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next_month.pred_opt()?))
}

#[derive(Deserialize)]
pub struct DailyQuery {
    pub date: Option<NaiveDate>,
}

pub async fn daily(
    _auth: AuthUser,
    query: web::Query<DailyQuery>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    clock: web::Data<SharedClock>,
) -> Result<HttpResponse, ApiError> {
    let date = query.date.unwrap_or_else(|| clock.now().date());
    let details: Vec<_> = attendance::rows_for_date(pool.get_ref(), date)
        .await?
        .into_iter()
        .map(|r| detail(r, config.late_cutoff))
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::data(json!({
        "date": date,
        "statistics": stats(&details),
        "attendance": details,
    }))))
}

#[derive(Deserialize)]
pub struct MonthlyQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

pub async fn monthly(
    _auth: AuthUser,
    query: web::Query<MonthlyQuery>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    clock: web::Data<SharedClock>,
) -> Result<HttpResponse, ApiError> {
    let today = clock.now().date();
    let month = query.month.unwrap_or_else(|| today.month());
    let year = query.year.unwrap_or_else(|| today.year());
    let (start, end) = month_bounds(year, month)
        .ok_or_else(|| ApiError::Validation("Month must be between 1 and 12!".into()))?;

    let details: Vec<_> = attendance::rows_for_range(pool.get_ref(), start, end)
        .await?
        .into_iter()
        .map(|r| detail(r, config.late_cutoff))
        .collect();
    let summaries = summarize_per_officer(&details);

    Ok(HttpResponse::Ok().json(ApiResponse::data(json!({
        "period": {
            "month": month,
            "year": year,
            "start_date": start,
            "end_date": end,
            "total_days": (end - start).num_days() + 1,
        },
        "overall": {
            "total_officers": summaries.len(),
            "statistics": stats(&details),
        },
        "summary_per_officer": summaries,
        "attendance": details,
    }))))
}

#[derive(Deserialize)]
pub struct OfficerReportQuery {
    pub officer_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub async fn per_officer(
    auth: AuthUser,
    query: web::Query<OfficerReportQuery>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    clock: web::Data<SharedClock>,
) -> Result<HttpResponse, ApiError> {
    let today = clock.now().date();
    // the current month is always a valid month
    let (month_start, month_end) = month_bounds(today.year(), today.month()).unwrap();

    let officer_id = query.officer_id.unwrap_or(auth.officer_id);
    let start = query.start_date.unwrap_or(month_start);
    let end = query.end_date.unwrap_or(month_end);

    let details: Vec<_> = attendance::officer_rows_for_range(pool.get_ref(), officer_id, start, end)
        .await?
        .into_iter()
        .map(|r| detail(r, config.late_cutoff))
        .collect();

    // Empty scope is an empty report, not an error.
    let officer = details.first().map(|d| {
        json!({
            "id": d.row.officer_id,
            "nip": d.row.nip,
            "name": d.row.name,
            "role": d.row.role,
        })
    });
    let total_work: i64 = details.iter().filter_map(|d| d.work_minutes).sum();
    let report_stats = stats(&details);
    let avg_work = if report_stats.present > 0 {
        total_work / report_stats.present as i64
    } else {
        0
    };

    Ok(HttpResponse::Ok().json(ApiResponse::data(json!({
        "officer": officer,
        "period": { "start_date": start, "end_date": end },
        "statistics": {
            "total_days": details.len(),
            "present": report_stats.present,
            "absent": report_stats.absent,
            "late": report_stats.late,
            "on_time": report_stats.on_time,
            "total_work_minutes": total_work,
            "avg_work_minutes": avg_work,
            "attendance_pct": report_stats.attendance_pct,
        },
        "attendance": details,
    }))))
}

#[derive(Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Admin-only JSON export of a date range, defaulting to the current month.
pub async fn export(
    auth: AuthUser,
    query: web::Query<ExportQuery>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    clock: web::Data<SharedClock>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let today = clock.now().date();
    let (month_start, month_end) = month_bounds(today.year(), today.month()).unwrap();
    let start = query.start_date.unwrap_or(month_start);
    let end = query.end_date.unwrap_or(month_end);

    let details: Vec<_> = attendance::rows_for_range(pool.get_ref(), start, end)
        .await?
        .into_iter()
        .map(|r| detail(r, config.late_cutoff))
        .collect();

    let payload = json!({
        "metadata": {
            "generated_at": clock.now(),
            "period": { "start_date": start, "end_date": end },
            "total_records": details.len(),
        },
        "data": details,
    });

    let mut resp = HttpResponse::Ok();
    if query.format.as_deref() == Some("download") {
        resp.insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"attendance_{start}_{end}.json\""),
        ));
    }

    Ok(resp.json(ApiResponse::message_with_data("Report exported!", payload)))
}
