use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use crate::config::SiteConfig;
use crate::error::ViewError;
use crate::models::{Capability, Course, CourseModule, NewInProgress, Reengagement, ViewedEvent};
use crate::report;
use crate::store::Store;

/// Entry point into the page: a course module id or an activity instance id.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewParams {
    pub id: Option<i64>,
    pub a: Option<i64>,
}

async fn resolve(
    store: &dyn Store,
    params: ViewParams,
) -> Result<(CourseModule, Course, Reengagement), ViewError> {
    let missing = |table| ViewError::MissingRecord { table };

    if let Some(id) = params.id.filter(|id| *id != 0) {
        let cm = store
            .find_course_module(id)
            .await?
            .ok_or_else(|| missing("course_modules"))?;
        let course = store
            .find_course(cm.course)
            .await?
            .ok_or_else(|| missing("course"))?;
        let reengagement = store
            .find_reengagement(cm.instance)
            .await?
            .ok_or_else(|| missing("reengagement"))?;
        Ok((cm, course, reengagement))
    } else if let Some(a) = params.a.filter(|a| *a != 0) {
        let reengagement = store
            .find_reengagement(a)
            .await?
            .ok_or_else(|| missing("reengagement"))?;
        let course = store
            .find_course(reengagement.course)
            .await?
            .ok_or_else(|| missing("course"))?;
        let cm = store
            .find_course_module_by_instance(reengagement.id, course.id)
            .await?
            .ok_or_else(|| missing("course_modules"))?;
        Ok((cm, course, reengagement))
    } else {
        Err(ViewError::NoId)
    }
}

/// `now` moved by a stored number of seconds, or an error naming the field.
fn schedule_from(
    now: DateTime<Utc>,
    seconds: i64,
    field: &'static str,
) -> Result<DateTime<Utc>, ViewError> {
    TimeDelta::try_seconds(seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or(ViewError::InvalidSchedule { field })
}

/// Builds the activity page for `username`.
pub async fn view(
    store: &dyn Store,
    config: &SiteConfig,
    params: ViewParams,
    username: &str,
    now: DateTime<Utc>,
) -> Result<String, ViewError> {
    let (cm, course, reengagement) = resolve(store, params).await?;

    let user = match store.find_user(username).await? {
        Some(user) if !user.deleted => user,
        _ => return Err(ViewError::RequireLogin),
    };

    if !config.features_enabled() {
        return Err(ViewError::CompletionAvailabilityDisabled);
    }

    let event = ViewedEvent::new(&cm, &course, &reengagement, &user, now);
    store
        .record_event(&event)
        .await
        .map_err(ViewError::StoreWrite)?;
    info!(
        cmid = cm.id,
        reengagement = reengagement.id,
        username = %user.username,
        user = %user.fullname(),
        "course module viewed"
    );

    let can_start = store
        .has_capability(cm.id, user.id, Capability::StartReengagement)
        .await?;
    let can_edit = store
        .has_capability(cm.id, user.id, Capability::EditReengagementDuration)
        .await?;
    let can_bulk = store
        .has_capability(cm.id, user.id, Capability::BulkActions)
        .await?;
    debug!(can_start, can_edit, can_bulk, "capabilities resolved");

    if !can_start && !can_edit {
        return Err(ViewError::NotValid);
    }

    let viewer_tz = report::viewer_timezone(user.timezone.as_deref(), config.timezone);
    let mut body = String::new();

    if can_start {
        let record = match store.find_in_progress(reengagement.id, user.id).await? {
            Some(record) => record,
            None => {
                let start = NewInProgress {
                    reengagement: reengagement.id,
                    userid: user.id,
                    completiontime: schedule_from(now, reengagement.duration, "duration")?,
                    emailtime: schedule_from(now, reengagement.emaildelay, "emaildelay")?,
                };
                let record = store
                    .insert_in_progress(&start)
                    .await
                    .map_err(ViewError::StoreWrite)?;
                info!(
                    id = record.id,
                    reengagement = record.reengagement,
                    userid = record.userid,
                    "reengagement started"
                );
                record
            }
        };
        body.push_str(&report::render_checkstart(&record, viewer_tz));
    }

    if can_edit {
        let rows = store.in_progress_listing(reengagement.id).await?;
        body.push_str(&report::render_status(&reengagement, &rows, viewer_tz));
    }

    Ok(report::render_page(&reengagement.name, &course.fullname, &body))
}
