use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const MODULE_NAME: &str = "reengagement";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    pub id: i64,
    pub shortname: String,
    pub fullname: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseModule {
    pub id: i64,
    pub course: i64,
    pub instance: i64,
}

/// When the user is emailed about a re-engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmailUserMode {
    Never,
    Completion,
    Time,
}

impl EmailUserMode {
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Never),
            1 => Some(Self::Completion),
            2 => Some(Self::Time),
            _ => None,
        }
    }

    pub fn code(self) -> i16 {
        match self {
            Self::Never => 0,
            Self::Completion => 1,
            Self::Time => 2,
        }
    }

    /// Scheduled reminders get their own column in the progress listing.
    pub fn shows_email_time(self) -> bool {
        !matches!(self, Self::Never | Self::Completion)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reengagement {
    pub id: i64,
    pub course: i64,
    pub name: String,
    /// Seconds between starting and being marked complete.
    pub duration: i64,
    /// Seconds between starting and the scheduled reminder.
    pub emaildelay: i64,
    pub emailuser: EmailUserMode,
    pub remindercount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub timezone: Option<String>,
    pub deleted: bool,
}

impl User {
    pub fn fullname(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InProgressRecord {
    pub id: i64,
    pub reengagement: i64,
    pub userid: i64,
    pub completiontime: DateTime<Utc>,
    pub completed: bool,
    pub emailsent: i32,
    pub emailtime: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInProgress {
    pub reengagement: i64,
    pub userid: i64,
    pub completiontime: DateTime<Utc>,
    pub emailtime: DateTime<Utc>,
}

/// An in-progress record joined with the display fields of its user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InProgressRow {
    pub record: InProgressRecord,
    pub firstname: String,
    pub lastname: String,
}

impl InProgressRow {
    pub fn fullname(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }

    pub fn listing_order(a: &Self, b: &Self) -> Ordering {
        a.record
            .completiontime
            .cmp(&b.record.completiontime)
            .then_with(|| a.lastname.cmp(&b.lastname))
            .then_with(|| a.firstname.cmp(&b.firstname))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    StartReengagement,
    EditReengagementDuration,
    BulkActions,
}

impl Capability {
    pub fn name(self) -> &'static str {
        match self {
            Self::StartReengagement => "mod/reengagement:startreengagement",
            Self::EditReengagementDuration => "mod/reengagement:editreengagementduration",
            Self::BulkActions => "mod/reengagement:bulkactions",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewedEvent {
    pub id: Uuid,
    pub eventname: String,
    pub objectid: i64,
    pub contextinstanceid: i64,
    pub userid: i64,
    pub courseid: i64,
    pub snapshot: serde_json::Value,
    pub timecreated: DateTime<Utc>,
}

impl ViewedEvent {
    pub const NAME: &'static str = "\\mod_reengagement\\event\\course_module_viewed";

    pub fn new(
        cm: &CourseModule,
        course: &Course,
        reengagement: &Reengagement,
        user: &User,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            eventname: Self::NAME.to_string(),
            objectid: reengagement.id,
            contextinstanceid: cm.id,
            userid: user.id,
            courseid: course.id,
            snapshot: serde_json::json!({
                "course": course,
                "reengagement": reengagement,
            }),
            timecreated: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(minute: u32, firstname: &str, lastname: &str) -> InProgressRow {
        let time = Utc.with_ymd_and_hms(2026, 3, 1, 9, minute, 0).unwrap();
        InProgressRow {
            record: InProgressRecord {
                id: 1,
                reengagement: 1,
                userid: 1,
                completiontime: time,
                completed: false,
                emailsent: 0,
                emailtime: time,
            },
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
        }
    }

    #[test]
    fn email_modes_round_trip_codes() {
        for mode in [EmailUserMode::Never, EmailUserMode::Completion, EmailUserMode::Time] {
            assert_eq!(EmailUserMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(EmailUserMode::from_code(7), None);
    }

    #[test]
    fn only_scheduled_mode_shows_email_time() {
        assert!(!EmailUserMode::Never.shows_email_time());
        assert!(!EmailUserMode::Completion.shows_email_time());
        assert!(EmailUserMode::Time.shows_email_time());
    }

    #[test]
    fn listing_order_breaks_ties_on_names() {
        let mut rows = vec![
            row(5, "Zoe", "Adams"),
            row(1, "Ben", "Young"),
            row(5, "Amy", "Adams"),
            row(5, "Carl", "Baker"),
        ];
        rows.sort_by(InProgressRow::listing_order);
        let names: Vec<String> = rows.iter().map(InProgressRow::fullname).collect();
        assert_eq!(names, vec!["Ben Young", "Amy Adams", "Zoe Adams", "Carl Baker"]);
    }
}
