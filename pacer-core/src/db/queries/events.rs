use sqlx::SqlitePool;

use crate::db::models::{EventDetailRow, EventRow};

pub async fn get_event(pool: &SqlitePool, id: &str) -> Result<Option<EventRow>, sqlx::Error> {
    sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_event_detail(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<EventDetailRow>, sqlx::Error> {
    sqlx::query_as::<_, EventDetailRow>("SELECT * FROM event_details WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// All course categories under an event, in name order.
pub async fn list_event_details(
    pool: &SqlitePool,
    event_id: &str,
) -> Result<Vec<EventDetailRow>, sqlx::Error> {
    sqlx::query_as::<_, EventDetailRow>(
        "SELECT * FROM event_details WHERE event_id = ? ORDER BY course_name",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await
}

/// The GPX file URL recorded for a course, if any.
pub async fn gpx_url(
    pool: &SqlitePool,
    event_id: &str,
    event_detail_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT gpx_url FROM event_details WHERE id = ? AND event_id = ?")
            .bind(event_detail_id)
            .bind(event_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.and_then(|r| r.0))
}
