use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::models::{
    Capability, Course, CourseModule, EmailUserMode, InProgressRecord, InProgressRow,
    NewInProgress, Reengagement, User, ViewedEvent, MODULE_NAME,
};
use crate::store::Store;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn course_module_from_row(row: &PgRow) -> CourseModule {
    CourseModule {
        id: row.get("id"),
        course: row.get("course"),
        instance: row.get("instance"),
    }
}

fn in_progress_from_row(row: &PgRow) -> InProgressRecord {
    InProgressRecord {
        id: row.get("id"),
        reengagement: row.get("reengagement"),
        userid: row.get("userid"),
        completiontime: row.get("completiontime"),
        completed: row.get("completed"),
        emailsent: row.get("emailsent"),
        emailtime: row.get("emailtime"),
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn find_course_module(&self, id: i64) -> anyhow::Result<Option<CourseModule>> {
        let row = sqlx::query(
            "SELECT id, course, instance FROM reengagement.course_modules \
             WHERE id = $1 AND module = $2",
        )
        .bind(id)
        .bind(MODULE_NAME)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(course_module_from_row))
    }

    async fn find_course_module_by_instance(
        &self,
        instance: i64,
        course: i64,
    ) -> anyhow::Result<Option<CourseModule>> {
        let row = sqlx::query(
            "SELECT id, course, instance FROM reengagement.course_modules \
             WHERE instance = $1 AND course = $2 AND module = $3",
        )
        .bind(instance)
        .bind(course)
        .bind(MODULE_NAME)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(course_module_from_row))
    }

    async fn find_course(&self, id: i64) -> anyhow::Result<Option<Course>> {
        let row = sqlx::query("SELECT id, shortname, fullname FROM reengagement.courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Course {
            id: row.get("id"),
            shortname: row.get("shortname"),
            fullname: row.get("fullname"),
        }))
    }

    async fn find_reengagement(&self, id: i64) -> anyhow::Result<Option<Reengagement>> {
        let row = sqlx::query(
            "SELECT id, course, name, duration, emaildelay, emailuser, remindercount \
             FROM reengagement.activities WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let code: i16 = row.get("emailuser");
        let emailuser = EmailUserMode::from_code(code)
            .with_context(|| format!("activity {id} has unknown emailuser mode {code}"))?;

        Ok(Some(Reengagement {
            id: row.get("id"),
            course: row.get("course"),
            name: row.get("name"),
            duration: row.get("duration"),
            emaildelay: row.get("emaildelay"),
            emailuser,
            remindercount: row.get("remindercount"),
        }))
    }

    async fn find_user(&self, username: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, firstname, lastname, timezone, deleted \
             FROM reengagement.users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            username: row.get("username"),
            firstname: row.get("firstname"),
            lastname: row.get("lastname"),
            timezone: row.get("timezone"),
            deleted: row.get("deleted"),
        }))
    }

    async fn has_capability(
        &self,
        cmid: i64,
        userid: i64,
        capability: Capability,
    ) -> anyhow::Result<bool> {
        let granted: bool = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM reengagement.capabilities \
             WHERE cmid = $1 AND userid = $2 AND capability = $3) AS granted",
        )
        .bind(cmid)
        .bind(userid)
        .bind(capability.name())
        .fetch_one(&self.pool)
        .await?
        .get("granted");

        Ok(granted)
    }

    async fn find_in_progress(
        &self,
        reengagement: i64,
        userid: i64,
    ) -> anyhow::Result<Option<InProgressRecord>> {
        let row = sqlx::query(
            "SELECT id, reengagement, userid, completiontime, completed, emailsent, emailtime \
             FROM reengagement.inprogress WHERE reengagement = $1 AND userid = $2",
        )
        .bind(reengagement)
        .bind(userid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(in_progress_from_row))
    }

    async fn insert_in_progress(&self, record: &NewInProgress) -> anyhow::Result<InProgressRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO reengagement.inprogress
            (reengagement, userid, completiontime, completed, emailsent, emailtime)
            VALUES ($1, $2, $3, FALSE, 0, $4)
            RETURNING id, reengagement, userid, completiontime, completed, emailsent, emailtime
            "#,
        )
        .bind(record.reengagement)
        .bind(record.userid)
        .bind(record.completiontime)
        .bind(record.emailtime)
        .fetch_one(&self.pool)
        .await?;

        Ok(in_progress_from_row(&row))
    }

    async fn in_progress_listing(&self, reengagement: i64) -> anyhow::Result<Vec<InProgressRow>> {
        let rows = sqlx::query(
            r#"
            SELECT rip.id, rip.reengagement, rip.userid, rip.completiontime, rip.completed,
                   rip.emailsent, rip.emailtime, u.firstname, u.lastname
              FROM reengagement.inprogress rip
        INNER JOIN reengagement.users u ON u.id = rip.userid
             WHERE rip.reengagement = $1
               AND u.deleted = FALSE
          ORDER BY rip.completiontime ASC, u.lastname ASC, u.firstname ASC
            "#,
        )
        .bind(reengagement)
        .fetch_all(&self.pool)
        .await?;

        debug!(reengagement, rows = rows.len(), "loaded in-progress listing");

        Ok(rows
            .iter()
            .map(|row| InProgressRow {
                record: in_progress_from_row(row),
                firstname: row.get("firstname"),
                lastname: row.get("lastname"),
            })
            .collect())
    }

    async fn record_event(&self, event: &ViewedEvent) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reengagement.log_events
            (id, eventname, objectid, contextinstanceid, userid, courseid, snapshot, timecreated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id)
        .bind(&event.eventname)
        .bind(event.objectid)
        .bind(event.contextinstanceid)
        .bind(event.userid)
        .bind(event.courseid)
        .bind(&event.snapshot)
        .bind(event.timecreated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

async fn upsert_user(
    pool: &PgPool,
    username: &str,
    firstname: &str,
    lastname: &str,
    email: &str,
) -> anyhow::Result<i64> {
    let id: i64 = sqlx::query(
        r#"
        INSERT INTO reengagement.users (username, firstname, lastname, email)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (username) DO UPDATE
        SET firstname = EXCLUDED.firstname, lastname = EXCLUDED.lastname, email = EXCLUDED.email
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(firstname)
    .bind(lastname)
    .bind(email)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let course_id: i64 = sqlx::query(
        r#"
        INSERT INTO reengagement.courses (shortname, fullname)
        VALUES ($1, $2)
        ON CONFLICT (shortname) DO UPDATE SET fullname = EXCLUDED.fullname
        RETURNING id
        "#,
    )
    .bind("SCH101")
    .bind("Scholar Success Foundations")
    .fetch_one(pool)
    .await?
    .get("id");

    let activity_id: i64 = sqlx::query(
        r#"
        INSERT INTO reengagement.activities
        (course, name, duration, emaildelay, emailuser, remindercount)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (course, name) DO UPDATE
        SET duration = EXCLUDED.duration, emaildelay = EXCLUDED.emaildelay,
            emailuser = EXCLUDED.emailuser, remindercount = EXCLUDED.remindercount
        RETURNING id
        "#,
    )
    .bind(course_id)
    .bind("Check back in after a week")
    .bind(7 * 24 * 3600_i64)
    .bind(3 * 24 * 3600_i64)
    .bind(EmailUserMode::Time.code())
    .bind(2_i32)
    .fetch_one(pool)
    .await?
    .get("id");

    let cmid: i64 = sqlx::query(
        r#"
        INSERT INTO reengagement.course_modules (course, module, instance)
        VALUES ($1, $2, $3)
        ON CONFLICT (module, instance) DO UPDATE SET course = EXCLUDED.course
        RETURNING id
        "#,
    )
    .bind(course_id)
    .bind(MODULE_NAME)
    .bind(activity_id)
    .fetch_one(pool)
    .await?
    .get("id");

    let teacher = upsert_user(pool, "morgan.hale", "Morgan", "Hale", "morgan.hale@example.com").await?;
    for capability in [
        Capability::EditReengagementDuration,
        Capability::BulkActions,
    ] {
        grant(pool, cmid, teacher, capability).await?;
    }

    let students = [
        ("avery.lee", "Avery", "Lee", 2, false, 0),
        ("jules.moreno", "Jules", "Moreno", 5, false, 3),
        ("kiara.patel", "Kiara", "Patel", -1, true, 1),
    ];

    let now = Utc::now();
    for (username, firstname, lastname, days, completed, emailsent) in students {
        let userid = upsert_user(
            pool,
            username,
            firstname,
            lastname,
            &format!("{username}@example.com"),
        )
        .await?;
        grant(pool, cmid, userid, Capability::StartReengagement).await?;

        let completiontime = now + chrono::Duration::days(days);
        upsert_in_progress(
            pool,
            activity_id,
            userid,
            completiontime,
            completed,
            emailsent,
            completiontime - chrono::Duration::days(4),
        )
        .await?;
    }

    info!(course_id, activity_id, cmid, "seeded demo activity");
    Ok(())
}

async fn grant(
    pool: &PgPool,
    cmid: i64,
    userid: i64,
    capability: Capability,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO reengagement.capabilities (cmid, userid, capability)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(cmid)
    .bind(userid)
    .bind(capability.name())
    .execute(pool)
    .await?;

    Ok(())
}

async fn upsert_in_progress(
    pool: &PgPool,
    reengagement: i64,
    userid: i64,
    completiontime: DateTime<Utc>,
    completed: bool,
    emailsent: i32,
    emailtime: DateTime<Utc>,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO reengagement.inprogress
        (reengagement, userid, completiontime, completed, emailsent, emailtime)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (reengagement, userid) DO UPDATE
        SET completiontime = EXCLUDED.completiontime, completed = EXCLUDED.completed,
            emailsent = EXCLUDED.emailsent, emailtime = EXCLUDED.emailtime
        "#,
    )
    .bind(reengagement)
    .bind(userid)
    .bind(completiontime)
    .bind(completed)
    .bind(emailsent)
    .bind(emailtime)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        reengagement: i64,
        username: String,
        completiontime: DateTime<Utc>,
        completed: bool,
        emailsent: i32,
        emailtime: DateTime<Utc>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut upserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let userid: i64 = sqlx::query(
            "SELECT id FROM reengagement.users WHERE username = $1 AND deleted = FALSE",
        )
        .bind(&row.username)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("unknown user {}", row.username))?
        .get("id");

        let affected = upsert_in_progress(
            pool,
            row.reengagement,
            userid,
            row.completiontime,
            row.completed,
            row.emailsent,
            row.emailtime,
        )
        .await?;

        if affected > 0 {
            upserted += 1;
        }
    }

    Ok(upserted)
}
