use chrono::{DateTime, Utc};

/// Log group names become a single path segment: `/aws/ecs/app` -> `-aws-ecs-app`.
pub fn sanitize_log_group(log_group: &str) -> String {
    log_group.replace('/', "-")
}

pub fn export_destination_prefix(
    base_prefix: &str,
    log_group: &str,
    window_start: DateTime<Utc>,
) -> String {
    let trimmed = base_prefix.trim_matches('/');
    let partition = format!(
        "{}/{}",
        sanitize_log_group(log_group),
        window_start.format("%Y/%m/%d/%H")
    );
    if trimmed.is_empty() {
        partition
    } else {
        format!("{trimmed}/{partition}")
    }
}
