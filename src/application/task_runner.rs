// Async query runner - Submits rebuilt queries as background tasks and polls them
use crate::application::looker_api::LookerApi;
use crate::domain::query::{QueryTaskOptions, QueryTaskStatus, ResultFormat, WriteCreateQueryTask};
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long to wait between status checks of a running task
#[async_trait]
pub trait PollWait: Send + Sync {
    /// `attempt` counts the waits already made for the current task
    async fn wait(&self, attempt: u32);

    fn interval(&self) -> Duration;
}

/// Sleeps the same interval before every poll
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedInterval {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

#[async_trait]
impl PollWait for FixedInterval {
    async fn wait(&self, _attempt: u32) {
        tokio::time::sleep(self.interval).await;
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Final state of one task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub task_id: String,
    pub query_id: String,
    pub status: QueryTaskStatus,
    /// Waits made while the task was running
    pub polls: u32,
    pub results: serde_json::Value,
}

impl TaskOutcome {
    pub fn succeeded(&self) -> bool {
        self.status.is_success()
    }

    /// Rows in a `json_fe` result payload
    pub fn row_count(&self) -> Option<usize> {
        self.results.get("data")?.as_array().map(|rows| rows.len())
    }
}

#[derive(Clone)]
pub struct TaskRunner {
    api: Arc<dyn LookerApi>,
    wait: Arc<dyn PollWait>,
}

impl TaskRunner {
    pub fn new(api: Arc<dyn LookerApi>, wait: Arc<dyn PollWait>) -> Self {
        Self { api, wait }
    }

    /// Run each query to completion, one at a time
    pub async fn run_all(&self, query_ids: &[String]) -> anyhow::Result<Vec<TaskOutcome>> {
        let mut outcomes = Vec::with_capacity(query_ids.len());
        for query_id in query_ids {
            outcomes.push(self.run(query_id).await?);
        }
        Ok(outcomes)
    }

    pub async fn run(&self, query_id: &str) -> anyhow::Result<TaskOutcome> {
        let body = WriteCreateQueryTask {
            query_id: query_id.to_string(),
            result_format: ResultFormat::JsonFe,
            deferred: false,
        };
        let task = self
            .api
            .create_query_task(&body, QueryTaskOptions::refresh())
            .await
            .with_context(|| format!("Failed to create query task for query {}", query_id))?;

        let task_id = task.id;
        let query_id = task.query_id;
        tracing::debug!("Submitted task {} for query {}", task_id, query_id);

        let mut status = self.check_status(&task_id).await?;
        let mut polls = 0;
        while status.is_running() {
            println!("{} {}", query_id, status);
            self.wait.wait(polls).await;
            polls += 1;
            status = self.check_status(&task_id).await?;
        }

        let results = self
            .api
            .query_task_results(&task_id)
            .await
            .with_context(|| format!("Failed to fetch results of task {}", task_id))?;
        println!("{} {}", query_id, status);

        if status.is_success() {
            tracing::info!("Query {} refreshed after {} polls", query_id, polls);
        } else {
            tracing::warn!(
                "Query {} finished with status {} (task {})",
                query_id,
                status,
                task_id
            );
        }

        Ok(TaskOutcome {
            task_id,
            query_id,
            status,
            polls,
            results,
        })
    }

    async fn check_status(&self, task_id: &str) -> anyhow::Result<QueryTaskStatus> {
        let task = self
            .api
            .query_task(task_id)
            .await
            .with_context(|| format!("Failed to fetch status of task {}", task_id))?;

        // A task without a status has not been picked up yet; treat it like the API's "added"
        Ok(task.status.unwrap_or(QueryTaskStatus::Added))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{FakeLookerApi, RecordingWait};

    #[tokio::test]
    async fn test_running_twice_then_complete() {
        let api = Arc::new(
            FakeLookerApi::new().with_status_script("1001", &["running", "running", "complete"]),
        );
        let wait = Arc::new(RecordingWait::default());
        let runner = TaskRunner::new(api.clone(), wait.clone());

        let outcome = runner.run("1001").await.unwrap();

        assert_eq!(outcome.status, QueryTaskStatus::Complete);
        assert_eq!(outcome.polls, 2);
        assert_eq!(wait.attempts(), vec![0, 1]);
        assert_eq!(api.calls_matching("query_task:"), 3);
        assert_eq!(api.calls_matching("query_task_results:"), 1);
        assert_eq!(
            api.calls(),
            vec![
                "create_query_task:1001",
                "query_task:task-1",
                "query_task:task-1",
                "query_task:task-1",
                "query_task_results:task-1",
            ]
        );
    }

    #[tokio::test]
    async fn test_task_request_bypasses_cache() {
        let api = Arc::new(FakeLookerApi::new());
        let runner = TaskRunner::new(api.clone(), Arc::new(RecordingWait::default()));

        runner.run("1001").await.unwrap();

        let (body, options) = &api.task_requests()[0];
        assert_eq!(body.query_id, "1001");
        assert_eq!(body.result_format, ResultFormat::JsonFe);
        assert!(!body.deferred);
        assert!(!options.cache);
        assert!(options.force_production);
    }

    #[tokio::test]
    async fn test_error_status_is_terminal_and_still_fetches_results() {
        let api = Arc::new(FakeLookerApi::new().with_status_script("1001", &["running", "error"]));
        let wait = Arc::new(RecordingWait::default());
        let runner = TaskRunner::new(api.clone(), wait.clone());

        let outcome = runner.run("1001").await.unwrap();

        assert_eq!(outcome.status, QueryTaskStatus::Error);
        assert!(!outcome.succeeded());
        assert_eq!(wait.count(), 1);
        assert_eq!(api.calls_matching("query_task_results:"), 1);
    }

    #[tokio::test]
    async fn test_non_running_first_status_skips_polling() {
        let api = Arc::new(FakeLookerApi::new().with_status_script("1001", &["added"]));
        let wait = Arc::new(RecordingWait::default());
        let runner = TaskRunner::new(api.clone(), wait.clone());

        let outcome = runner.run("1001").await.unwrap();

        assert_eq!(outcome.status, QueryTaskStatus::Added);
        assert_eq!(wait.count(), 0);
        assert_eq!(api.calls_matching("query_task:"), 1);
    }

    #[tokio::test]
    async fn test_run_all_is_sequential_and_ordered() {
        let api = Arc::new(
            FakeLookerApi::new()
                .with_status_script("1001", &["running", "complete"])
                .with_status_script("1002", &["complete"]),
        );
        let wait = Arc::new(RecordingWait::default());
        let runner = TaskRunner::new(api.clone(), wait.clone());

        let outcomes = runner
            .run_all(&["1001".to_string(), "1002".to_string()])
            .await
            .unwrap();

        let ids: Vec<&str> = outcomes.iter().map(|o| o.query_id.as_str()).collect();
        assert_eq!(ids, vec!["1001", "1002"]);
        assert_eq!(outcomes[0].task_id, "task-1");
        assert_eq!(outcomes[1].task_id, "task-2");

        // The second task is only submitted once the first has finished
        let calls = api.calls();
        let first_results = calls.iter().position(|c| c == "query_task_results:task-1").unwrap();
        let second_submit = calls.iter().position(|c| c == "create_query_task:1002").unwrap();
        assert!(first_results < second_submit);
    }

    #[test]
    fn test_fixed_interval_default() {
        assert_eq!(FixedInterval::default().interval(), Duration::from_secs(5));
    }
}
