use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;
use strum_macros::{Display, EnumString};

/// Raw clock action as submitted by an officer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClockAction {
    In,
    Out,
    Break,
}

/// Event-log row joined with officer identity, as served by the
/// live-status and history endpoints.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EventWithOfficer {
    pub id: i64,
    pub officer_id: i64,
    pub nip: String,
    pub name: String,
    pub action: String,
    pub timestamp: NaiveDateTime,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub device_info: Option<String>,
}
