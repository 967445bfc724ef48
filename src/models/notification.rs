use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named subject/body pair with `{placeholder}` tokens resolved at send time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailTemplate {
    pub id: Uuid,
    pub template_type: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Write-once audit row for every notification actually dispatched.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailLog {
    pub id: Uuid,
    pub squad_id: Uuid,
    pub email_type: String,
    pub subject: String,
    pub sent_to: String,
    pub sent_at: DateTime<Utc>,
}
