use sqlx::SqlitePool;

/// Users the follower is tracking on this course.
pub async fn tracked_user_ids(
    pool: &SqlitePool,
    follower_id: &str,
    event_detail_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT target_user_id FROM trackers WHERE follower_id = ? AND event_detail_id = ?",
    )
    .bind(follower_id)
    .bind(event_detail_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
