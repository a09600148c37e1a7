use sqlx::SqlitePool;

use crate::db::models::ParticipantRow;

/// Profile rows for a set of users on one course. Users without a
/// participant row are simply absent from the result.
pub async fn get_participants(
    pool: &SqlitePool,
    event_detail_id: &str,
    user_ids: &[String],
) -> Result<Vec<ParticipantRow>, sqlx::Error> {
    if user_ids.is_empty() {
        return Ok(vec![]);
    }

    let placeholders = vec!["?"; user_ids.len()].join(", ");
    let sql = format!(
        "SELECT * FROM participants WHERE event_detail_id = ? AND user_id IN ({placeholders})"
    );

    let mut query = sqlx::query_as::<_, ParticipantRow>(&sql).bind(event_detail_id);
    for user_id in user_ids {
        query = query.bind(user_id);
    }
    query.fetch_all(pool).await
}
