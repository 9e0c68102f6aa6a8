// In-memory API double shared by the service tests
use crate::application::looker_api::LookerApi;
use crate::application::task_runner::PollWait;
use crate::domain::dashboard::Dashboard;
use crate::domain::query::{
    Query, QueryTask, QueryTaskOptions, QueryTaskStatus, User, WriteCreateQueryTask, WriteQuery,
};
use crate::infrastructure::looker_client::LookerApiError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct FakeState {
    calls: Vec<String>,
    created_queries: Vec<WriteQuery>,
    task_requests: Vec<(WriteCreateQueryTask, QueryTaskOptions)>,
    tasks: HashMap<String, (String, VecDeque<QueryTaskStatus>)>,
    next_query_id: u32,
    next_task_id: u32,
}

/// Serves scripted dashboards, queries and task status sequences, and records every call
pub struct FakeLookerApi {
    dashboards: HashMap<String, Dashboard>,
    queries: HashMap<String, Query>,
    status_scripts: HashMap<String, Vec<QueryTaskStatus>>,
    reject_credentials: bool,
    state: Mutex<FakeState>,
}

impl FakeLookerApi {
    pub fn new() -> Self {
        Self {
            dashboards: HashMap::new(),
            queries: HashMap::new(),
            status_scripts: HashMap::new(),
            reject_credentials: false,
            state: Mutex::new(FakeState {
                next_query_id: 1000,
                ..Default::default()
            }),
        }
    }

    pub fn with_dashboard(mut self, id: &str, json: serde_json::Value) -> Self {
        let dashboard: Dashboard = serde_json::from_value(json).expect("valid dashboard json");
        self.dashboards.insert(id.to_string(), dashboard);
        self
    }

    pub fn with_query(mut self, id: &str, model: &str, view: &str) -> Self {
        self.queries.insert(
            id.to_string(),
            Query {
                id: id.to_string(),
                model: model.to_string(),
                view: view.to_string(),
                fields: Some(vec![format!("{}.count", view)]),
                limit: Some("500".to_string()),
                ..Default::default()
            },
        );
        self
    }

    /// Statuses returned by successive polls of any task created for `query_id`.
    /// The last status repeats once the script runs out.
    pub fn with_status_script(mut self, query_id: &str, statuses: &[&str]) -> Self {
        self.status_scripts.insert(
            query_id.to_string(),
            statuses.iter().map(|s| QueryTaskStatus::parse(s)).collect(),
        );
        self
    }

    pub fn rejecting_credentials(mut self) -> Self {
        self.reject_credentials = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn created_queries(&self) -> Vec<WriteQuery> {
        self.state.lock().unwrap().created_queries.clone()
    }

    pub fn task_requests(&self) -> Vec<(WriteCreateQueryTask, QueryTaskOptions)> {
        self.state.lock().unwrap().task_requests.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl LookerApi for FakeLookerApi {
    async fn me(&self) -> anyhow::Result<User> {
        self.record("me".to_string());
        if self.reject_credentials {
            return Err(LookerApiError::Unauthorized {
                method: "GET".to_string(),
                path: "/user".to_string(),
                status: 401,
                body: "Requires authentication".to_string(),
            }
            .into());
        }
        Ok(User {
            id: "1".to_string(),
            display_name: Some("Refresh Bot".to_string()),
            email: Some("refresh-bot@example.com".to_string()),
        })
    }

    async fn dashboard(&self, dashboard_id: &str) -> anyhow::Result<Dashboard> {
        self.record(format!("dashboard:{}", dashboard_id));
        self.dashboards
            .get(dashboard_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("dashboard {} not found", dashboard_id))
    }

    async fn query(&self, query_id: &str) -> anyhow::Result<Query> {
        self.record(format!("query:{}", query_id));
        self.queries
            .get(query_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("query {} not found", query_id))
    }

    async fn create_query(&self, body: &WriteQuery) -> anyhow::Result<Query> {
        let mut state = self.state.lock().unwrap();
        state.next_query_id += 1;
        let id = state.next_query_id.to_string();
        state.calls.push(format!("create_query:{}", id));
        state.created_queries.push(body.clone());

        Ok(Query {
            id,
            model: body.model.clone(),
            view: body.view.clone(),
            fields: body.fields.clone(),
            filters: body.filters.clone(),
            ..Default::default()
        })
    }

    async fn create_query_task(
        &self,
        body: &WriteCreateQueryTask,
        options: QueryTaskOptions,
    ) -> anyhow::Result<QueryTask> {
        let mut state = self.state.lock().unwrap();
        state.next_task_id += 1;
        let task_id = format!("task-{}", state.next_task_id);
        state.calls.push(format!("create_query_task:{}", body.query_id));
        state.task_requests.push((body.clone(), options));

        let script = self
            .status_scripts
            .get(&body.query_id)
            .cloned()
            .unwrap_or_else(|| vec![QueryTaskStatus::Complete]);
        state
            .tasks
            .insert(task_id.clone(), (body.query_id.clone(), script.into()));

        Ok(QueryTask {
            id: task_id,
            query_id: body.query_id.clone(),
            status: Some(QueryTaskStatus::Added),
        })
    }

    async fn query_task(&self, task_id: &str) -> anyhow::Result<QueryTask> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("query_task:{}", task_id));
        let (query_id, statuses) = state
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| anyhow::anyhow!("task {} not found", task_id))?;

        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };

        Ok(QueryTask {
            id: task_id.to_string(),
            query_id: query_id.clone(),
            status,
        })
    }

    async fn query_task_results(&self, task_id: &str) -> anyhow::Result<serde_json::Value> {
        self.record(format!("query_task_results:{}", task_id));
        Ok(serde_json::json!({ "fields": {}, "data": [{"orders.count": 3}] }))
    }
}

/// Counts waits instead of sleeping
#[derive(Default)]
pub struct RecordingWait {
    waits: Mutex<Vec<u32>>,
}

impl RecordingWait {
    pub fn count(&self) -> usize {
        self.waits.lock().unwrap().len()
    }

    pub fn attempts(&self) -> Vec<u32> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl PollWait for RecordingWait {
    async fn wait(&self, attempt: u32) {
        self.waits.lock().unwrap().push(attempt);
    }

    fn interval(&self) -> Duration {
        Duration::ZERO
    }
}
