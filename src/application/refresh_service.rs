// Refresh service - Runs the whole cache refresh for one dashboard
use crate::application::credential_service::verify_api_credentials;
use crate::application::dashboard_service::DashboardService;
use crate::application::looker_api::LookerApi;
use crate::application::query_service::{QueryService, RebuiltQueries};
use crate::application::task_runner::{PollWait, TaskOutcome, TaskRunner};
use crate::presentation::report::print_query_ids;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RefreshSummary {
    pub dashboard_id: String,
    pub queries: RebuiltQueries,
    pub tasks: Vec<TaskOutcome>,
}

impl RefreshSummary {
    pub fn failed_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| !t.succeeded()).count()
    }
}

#[derive(Clone)]
pub struct RefreshService {
    api: Arc<dyn LookerApi>,
    dashboard_service: DashboardService,
    query_service: QueryService,
    task_runner: TaskRunner,
}

impl RefreshService {
    pub fn new(api: Arc<dyn LookerApi>, wait: Arc<dyn PollWait>) -> Self {
        Self {
            dashboard_service: DashboardService::new(api.clone()),
            query_service: QueryService::new(api.clone()),
            task_runner: TaskRunner::new(api.clone(), wait),
            api,
        }
    }

    pub async fn refresh(&self, dashboard_id: &str) -> anyhow::Result<RefreshSummary> {
        verify_api_credentials(self.api.as_ref()).await?;

        let plan = self.dashboard_service.read_dashboard(dashboard_id).await?;
        let queries = self.query_service.rebuild_queries(&plan).await?;
        if queries.is_empty() {
            tracing::warn!("Dashboard {} has no tiles backed by a query", dashboard_id);
        }

        for entry in &queries.entries {
            tracing::debug!(
                "Tile {}: {} -> {}",
                entry.tile_id,
                entry.old_query_id,
                entry.new_query_id
            );
        }

        let new_ids = queries.new_query_ids();
        print_query_ids(&new_ids, &queries.old_query_ids());

        let tasks = self.task_runner.run_all(&new_ids).await?;
        for task in &tasks {
            tracing::debug!(
                "Task {} for query {} returned {:?} rows",
                task.task_id,
                task.query_id,
                task.row_count()
            );
        }

        Ok(RefreshSummary {
            dashboard_id: dashboard_id.to_string(),
            queries,
            tasks,
        })
    }
}
