// Console report lines
use crate::application::refresh_service::RefreshSummary;

/// `label = ['a', 'b']`
pub fn format_query_ids(label: &str, ids: &[String]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("'{}'", id)).collect();
    format!("{} = [{}]", label, quoted.join(", "))
}

pub fn print_query_ids(new_ids: &[String], old_ids: &[String]) {
    println!("{}", format_query_ids("New queries", new_ids));
    println!("{}", format_query_ids("Old queries", old_ids));
}

pub fn format_summary(summary: &RefreshSummary) -> String {
    format!(
        "Refreshed dashboard {}: {} queries, {} tasks complete, {} failed",
        summary.dashboard_id,
        summary.queries.len(),
        summary.tasks.len() - summary.failed_tasks(),
        summary.failed_tasks()
    )
}
