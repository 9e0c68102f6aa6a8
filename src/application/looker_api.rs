// Client trait for the analytics platform API
use crate::domain::dashboard::Dashboard;
use crate::domain::query::{
    Query, QueryTask, QueryTaskOptions, User, WriteCreateQueryTask, WriteQuery,
};
use async_trait::async_trait;

#[async_trait]
pub trait LookerApi: Send + Sync {
    /// The user the current session is authenticated as
    async fn me(&self) -> anyhow::Result<User>;

    async fn dashboard(&self, dashboard_id: &str) -> anyhow::Result<Dashboard>;

    async fn query(&self, query_id: &str) -> anyhow::Result<Query>;

    /// Create a new query. Existing queries are never modified.
    async fn create_query(&self, body: &WriteQuery) -> anyhow::Result<Query>;

    /// Submit a query for asynchronous execution
    async fn create_query_task(
        &self,
        body: &WriteCreateQueryTask,
        options: QueryTaskOptions,
    ) -> anyhow::Result<QueryTask>;

    async fn query_task(&self, task_id: &str) -> anyhow::Result<QueryTask>;

    /// Results of a finished task, or its error payload
    async fn query_task_results(&self, task_id: &str) -> anyhow::Result<serde_json::Value>;
}
