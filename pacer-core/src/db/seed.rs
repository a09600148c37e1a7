//! Fixture inserts for tests and the simulator. Production never calls
//! these: entity CRUD belongs to the event-management service.

use sqlx::SqlitePool;

pub async fn insert_event(
    pool: &SqlitePool,
    id: &str,
    name: &str,
    starts_at: Option<&str>,
    venue: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO events (id, name, starts_at, venue) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(starts_at)
        .bind(venue)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_event_detail(
    pool: &SqlitePool,
    id: &str,
    event_id: &str,
    course_name: &str,
    distance_km: Option<f64>,
    gpx_url: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO event_details (id, event_id, course_name, distance_km, gpx_url) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(event_id)
    .bind(course_name)
    .bind(distance_km)
    .bind(gpx_url)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_participant(
    pool: &SqlitePool,
    user_id: &str,
    event_detail_id: &str,
    name: &str,
    bib_number: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO participants (user_id, event_detail_id, name, bib_number) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(event_detail_id)
    .bind(name)
    .bind(bib_number)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_tracker(
    pool: &SqlitePool,
    follower_id: &str,
    target_user_id: &str,
    event_detail_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO trackers (follower_id, target_user_id, event_detail_id) VALUES (?, ?, ?)",
    )
    .bind(follower_id)
    .bind(target_user_id)
    .bind(event_detail_id)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, queries};

    #[tokio::test]
    async fn test_seed_and_read_back() {
        let pool = db::create_memory_pool().await.unwrap();
        db::run_migrations(&pool).await.unwrap();

        insert_event(&pool, "ev1", "Seoul Marathon", Some("2026-11-01T09:00:00+09:00"), Some("Seoul"))
            .await
            .unwrap();
        insert_event_detail(&pool, "full", "ev1", "Full Course", Some(42.195), Some("https://files.example/full.gpx"))
            .await
            .unwrap();
        insert_event_detail(&pool, "half", "ev1", "Half Course", Some(21.0975), None)
            .await
            .unwrap();
        insert_participant(&pool, "u1", "full", "Alice Kim", "1024").await.unwrap();
        insert_tracker(&pool, "u1", "u2", "full").await.unwrap();

        let event = queries::events::get_event(&pool, "ev1").await.unwrap().unwrap();
        assert_eq!(event.name, "Seoul Marathon");

        let details = queries::events::list_event_details(&pool, "ev1").await.unwrap();
        assert_eq!(details.len(), 2);

        let url = queries::events::gpx_url(&pool, "ev1", "full").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://files.example/full.gpx"));
        assert_eq!(queries::events::gpx_url(&pool, "ev1", "half").await.unwrap(), None);

        let participants =
            queries::participants::get_participants(&pool, "full", &["u1".to_string(), "ghost".to_string()])
                .await
                .unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].bib_number.as_deref(), Some("1024"));

        let tracked = queries::trackers::tracked_user_ids(&pool, "u1", "full").await.unwrap();
        assert_eq!(tracked, vec!["u2".to_string()]);
    }
}
