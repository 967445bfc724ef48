use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(rename = "adminCode")]
    pub admin_code: String,
}

#[derive(Debug, Deserialize)]
pub struct SquadListQuery {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Partial update: only supplied fields are written.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSquadRequest {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub remark: Option<String>,
    #[serde(rename = "roomId")]
    pub room_id: Option<String>,
    #[serde(rename = "roomPassword")]
    pub room_password: Option<String>,
}

impl UpdateSquadRequest {
    pub fn field_count(&self) -> usize {
        [
            self.status.is_some(),
            self.payment_status.is_some(),
            self.remark.is_some(),
            self.room_id.is_some(),
            self.room_password.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub subject: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "emailType")]
    pub email_type: Option<String>,
}
