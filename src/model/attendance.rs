use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use sqlx::FromRow;
use strum_macros::Display;

/// One row per (officer, date). Clock times are filled in by the state
/// machine in `store::attendance`; presence classification is always
/// derived from them on read, never stored.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailyAttendance {
    pub id: i64,
    pub officer_id: i64,
    pub date: NaiveDate,
    pub clock_in: Option<NaiveTime>,
    pub clock_out: Option<NaiveTime>,
    pub status: String,
    pub note: Option<String>,
}

/// Attendance row joined with officer identity for the report endpoints.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttendanceWithOfficer {
    pub id: i64,
    pub officer_id: i64,
    pub nip: String,
    pub name: String,
    pub role: String,
    pub date: NaiveDate,
    pub clock_in: Option<NaiveTime>,
    pub clock_out: Option<NaiveTime>,
    pub status: String,
    pub note: Option<String>,
}

/// Per-day progression: `NotStarted -> InProgress -> Completed`.
/// `Completed` is terminal for the day.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DayState {
    NotStarted,
    InProgress,
    Completed,
}

impl DayState {
    pub fn of(row: Option<&DailyAttendance>) -> Self {
        match row {
            None => DayState::NotStarted,
            Some(r) if r.clock_in.is_none() => DayState::NotStarted,
            Some(r) if r.clock_out.is_none() => DayState::InProgress,
            Some(_) => DayState::Completed,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PresenceStatus {
    OnTime,
    Late,
    Absent,
}

/// Clock-in strictly after the cutoff counts as late; a clock-in at the
/// cutoff exactly is on time.
pub fn presence_status(clock_in: Option<NaiveTime>, cutoff: NaiveTime) -> PresenceStatus {
    match clock_in {
        None => PresenceStatus::Absent,
        Some(t) if t > cutoff => PresenceStatus::Late,
        Some(_) => PresenceStatus::OnTime,
    }
}

/// Whole minutes between clock-in and clock-out, once both exist.
pub fn work_minutes(clock_in: Option<NaiveTime>, clock_out: Option<NaiveTime>) -> Option<i64> {
    match (clock_in, clock_out) {
        (Some(start), Some(end)) => Some((end - start).num_minutes()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn cutoff_is_strict_greater_than() {
        let cutoff = t(8, 0, 0);
        assert_eq!(presence_status(Some(t(8, 0, 0)), cutoff), PresenceStatus::OnTime);
        assert_eq!(presence_status(Some(t(8, 0, 1)), cutoff), PresenceStatus::Late);
        assert_eq!(presence_status(Some(t(7, 55, 0)), cutoff), PresenceStatus::OnTime);
        assert_eq!(presence_status(None, cutoff), PresenceStatus::Absent);
    }

    #[test]
    fn work_minutes_requires_both_times() {
        assert_eq!(work_minutes(Some(t(7, 55, 0)), Some(t(17, 0, 0))), Some(545));
        assert_eq!(work_minutes(Some(t(8, 0, 0)), None), None);
        assert_eq!(work_minutes(None, None), None);
    }

    #[test]
    fn day_state_progression() {
        let mut row = DailyAttendance {
            id: 1,
            officer_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            clock_in: None,
            clock_out: None,
            status: "present".into(),
            note: None,
        };
        assert_eq!(DayState::of(None), DayState::NotStarted);
        assert_eq!(DayState::of(Some(&row)), DayState::NotStarted);
        row.clock_in = Some(t(8, 0, 0));
        assert_eq!(DayState::of(Some(&row)), DayState::InProgress);
        row.clock_out = Some(t(17, 0, 0));
        assert_eq!(DayState::of(Some(&row)), DayState::Completed);
    }
}
