use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only payment history row. Distinct from the denormalized
/// payment fields on the squad itself, which reflect only the current state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub squad_id: Uuid,
    pub amount: i32,
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
    pub screenshot: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
