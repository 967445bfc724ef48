use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Admin-approval states. Independent of payment state.
pub const VALID_STATUSES: [&str; 3] = ["pending", "approved", "rejected"];
/// Payment-confirmation states. Independent of approval state.
pub const VALID_PAYMENT_STATUSES: [&str; 3] = ["pending", "paid", "rejected"];

pub const SQUAD_SIZE: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Squad {
    pub id: Uuid,
    pub squad_name: String,
    pub leader_index: i32,
    pub registration_code: String,
    pub leader_email: String,
    pub leader_whatsapp: String,
    pub status: String,
    pub payment_status: String,
    pub payment_screenshot: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub remark: Option<String>,
    pub room_id: Option<String>,
    pub room_password: Option<String>,
    pub match_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SquadPlayer {
    pub id: Uuid,
    pub squad_id: Uuid,
    pub player_index: i32,
    pub name: String,
    pub whatsapp: String,
    pub uid: String,
    pub username: String,
    pub screenshot: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of the `players` JSON array in the registration form.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
    pub whatsapp: String,
    pub uid: String,
    pub username: String,
}

/// Squad row augmented with the computed columns the admin list view needs.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SquadSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub squad: Squad,
    pub total_players: i64,
    pub leader_name: Option<String>,
}

/// Public status projection returned for `GET /status/:code`.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SquadStatus {
    pub squad_name: String,
    pub registration_code: String,
    pub status: String,
    pub payment_status: String,
    pub payment_screenshot: Option<String>,
    pub remark: Option<String>,
    pub room_id: Option<String>,
    pub room_password: Option<String>,
    pub created_at: DateTime<Utc>,
}
