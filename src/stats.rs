use crate::api::{ApiClient, ApiError};
use crate::render;

/// Fetches the aggregate counts and renders both charts. Purely
/// presentational; nothing is cached between calls.
pub async fn present(api: &ApiClient) -> Result<String, ApiError> {
    let response = api.fetch_statistics().await?;
    let view = render::build_stats_view(&response.statistics, response.total_rules);
    Ok(render::draw_stats(&view))
}
