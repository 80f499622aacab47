use crate::models::{
    Capability, Course, CourseModule, InProgressRecord, InProgressRow, NewInProgress,
    Reengagement, User, ViewedEvent,
};

/// Persistence needed by the view page.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn find_course_module(&self, id: i64) -> anyhow::Result<Option<CourseModule>>;
    async fn find_course_module_by_instance(
        &self,
        instance: i64,
        course: i64,
    ) -> anyhow::Result<Option<CourseModule>>;
    async fn find_course(&self, id: i64) -> anyhow::Result<Option<Course>>;
    async fn find_reengagement(&self, id: i64) -> anyhow::Result<Option<Reengagement>>;
    async fn find_user(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn has_capability(
        &self,
        cmid: i64,
        userid: i64,
        capability: Capability,
    ) -> anyhow::Result<bool>;
    async fn find_in_progress(
        &self,
        reengagement: i64,
        userid: i64,
    ) -> anyhow::Result<Option<InProgressRecord>>;
    async fn insert_in_progress(&self, record: &NewInProgress) -> anyhow::Result<InProgressRecord>;
    /// Rows for non-deleted users ordered by completion time, last name, first name.
    async fn in_progress_listing(&self, reengagement: i64) -> anyhow::Result<Vec<InProgressRow>>;
    async fn record_event(&self, event: &ViewedEvent) -> anyhow::Result<()>;
}
