use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: String,
    pub name: String,
    pub starts_at: Option<String>,
    pub venue: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct EventDetailRow {
    pub id: String,
    pub event_id: String,
    pub course_name: String,
    pub distance_km: Option<f64>,
    pub gpx_url: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ParticipantRow {
    pub user_id: String,
    pub event_detail_id: String,
    pub name: Option<String>,
    pub bib_number: Option<String>,
    pub profile_image_url: Option<String>,
}
