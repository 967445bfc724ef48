use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::generate_token;
use crate::models::admin::*;
use crate::models::payment::PaymentRecord;
use crate::models::squad::*;
use crate::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<Value>> {
    if state.config.admin_code.is_empty() || body.admin_code != state.config.admin_code {
        return Err(AppError::Unauthorized("Invalid admin code".into()));
    }

    let admin: Admin = sqlx::query_as("SELECT * FROM admins WHERE username = $1")
        .bind(&body.username)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

    let valid = bcrypt::verify(&body.password, &admin.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = generate_token(
        admin.id,
        &admin.username,
        &state.config.jwt.secret,
        state.config.jwt.expiry_secs,
    )?;

    tracing::info!("Admin '{}' logged in", admin.username);

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "admin": { "id": admin.id, "username": admin.username }
    })))
}

/// Only concrete, non-"all" filter values constrain the query.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, q: &SquadListQuery) {
    if let Some(status) = q.status.as_deref().filter(|s| !s.is_empty() && *s != "all") {
        qb.push(" AND s.status = ").push_bind(status.to_string());
    }
    if let Some(ps) = q
        .payment_status
        .as_deref()
        .filter(|s| !s.is_empty() && *s != "all")
    {
        qb.push(" AND s.payment_status = ").push_bind(ps.to_string());
    }
    if let Some(search) = q.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        qb.push(" AND (s.squad_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR s.registration_code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR s.leader_email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn total_pages(total: i64, limit: i64) -> i64 {
    if total == 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}

pub async fn list_squads(
    State(state): State<AppState>,
    Query(q): Query<SquadListQuery>,
) -> AppResult<Json<Value>> {
    let page = q.page.unwrap_or(1).max(1);
    let limit = q.limit.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * limit;

    let mut count_qb: QueryBuilder<'_, Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM squads s WHERE 1=1");
    push_filters(&mut count_qb, &q);
    let total: i64 = count_qb.build_query_scalar().fetch_one(&state.db).await?;

    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        r#"SELECT s.*,
            (SELECT COUNT(*) FROM squad_players WHERE squad_id = s.id) AS total_players,
            (SELECT name FROM squad_players
             WHERE squad_id = s.id AND player_index = s.leader_index) AS leader_name
        FROM squads s WHERE 1=1"#,
    );
    push_filters(&mut qb, &q);
    qb.push(" ORDER BY s.created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let squads: Vec<SquadSummary> = qb.build_query_as().fetch_all(&state.db).await?;

    Ok(Json(json!({
        "success": true,
        "data": squads,
        "pagination": {
            "total": total,
            "page": page,
            "limit": limit,
            "pages": total_pages(total, limit),
        }
    })))
}

pub async fn squad_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let squad: SquadSummary = sqlx::query_as(
        r#"SELECT s.*,
            (SELECT COUNT(*) FROM squad_players WHERE squad_id = s.id) AS total_players,
            (SELECT name FROM squad_players
             WHERE squad_id = s.id AND player_index = s.leader_index) AS leader_name
        FROM squads s WHERE s.id = $1"#,
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Squad not found".into()))?;

    let players: Vec<SquadPlayer> =
        sqlx::query_as("SELECT * FROM squad_players WHERE squad_id = $1 ORDER BY player_index")
            .bind(id)
            .fetch_all(&state.db)
            .await?;

    let payments: Vec<PaymentRecord> =
        sqlx::query_as("SELECT * FROM payments WHERE squad_id = $1 ORDER BY created_at DESC")
            .bind(id)
            .fetch_all(&state.db)
            .await?;

    let mut data = serde_json::to_value(&squad)
        .map_err(|e| AppError::Internal(format!("Serialization error: {e}")))?;
    if let Some(obj) = data.as_object_mut() {
        obj.insert("players".into(), json!(players));
        obj.insert("payments".into(), json!(payments));
    }

    Ok(Json(json!({ "success": true, "data": data })))
}

fn validate_update(body: &UpdateSquadRequest) -> Result<(), AppError> {
    if let Some(status) = body.status.as_deref() {
        if !VALID_STATUSES.contains(&status) {
            return Err(AppError::BadRequest("Invalid status".into()));
        }
    }
    if let Some(ps) = body.payment_status.as_deref() {
        if !VALID_PAYMENT_STATUSES.contains(&ps) {
            return Err(AppError::BadRequest("Invalid payment status".into()));
        }
    }
    if body.field_count() == 0 {
        return Err(AppError::BadRequest("No fields to update".into()));
    }
    Ok(())
}

pub async fn update_squad(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSquadRequest>,
) -> AppResult<Json<Value>> {
    validate_update(&body)?;

    // Only supplied fields reach the statement.
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("UPDATE squads SET ");
    let mut assignments = qb.separated(", ");
    if let Some(status) = &body.status {
        assignments.push("status = ").push_bind_unseparated(status);
    }
    if let Some(ps) = &body.payment_status {
        assignments
            .push("payment_status = ")
            .push_bind_unseparated(ps);
    }
    if let Some(remark) = &body.remark {
        assignments.push("remark = ").push_bind_unseparated(remark);
    }
    if let Some(room_id) = &body.room_id {
        assignments.push("room_id = ").push_bind_unseparated(room_id);
    }
    if let Some(room_password) = &body.room_password {
        assignments
            .push("room_password = ")
            .push_bind_unseparated(room_password);
    }
    qb.push(" WHERE id = ").push_bind(id).push(" RETURNING id");

    let updated: Option<Uuid> = qb
        .build_query_scalar()
        .fetch_optional(&state.db)
        .await?;
    if updated.is_none() {
        return Err(AppError::NotFound("Squad not found".into()));
    }

    // Fire-and-forget relative to the update's success response.
    if body.status.as_deref() == Some("approved") {
        let notifier = state.notifier.clone();
        tokio::spawn(async move {
            notifier.notify_squad(id, "approval").await;
        });
    }
    if body.payment_status.as_deref() == Some("paid") {
        let notifier = state.notifier.clone();
        tokio::spawn(async move {
            notifier.notify_squad(id, "payment_confirmation").await;
        });
    }

    Ok(Json(json!({
        "success": true,
        "message": "Squad updated successfully"
    })))
}

pub async fn send_custom_email(
    State(state): State<AppState>,
    Path(squad_id): Path<Uuid>,
    Json(body): Json<SendEmailRequest>,
) -> AppResult<Json<Value>> {
    let ctx = state
        .notifier
        .squad_context(squad_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Squad not found".into()))?;

    let email_type = body
        .email_type
        .as_deref()
        .filter(|t| !t.is_empty());

    let (subject, message) = match email_type {
        Some(t) => state.notifier.resolve_template(t, &ctx).await,
        None => {
            let subject = body
                .subject
                .clone()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| AppError::BadRequest("subject is required".into()))?;
            let message = body
                .message
                .clone()
                .filter(|m| !m.is_empty())
                .ok_or_else(|| AppError::BadRequest("message is required".into()))?;
            (subject, message)
        }
    };

    let sent = state
        .notifier
        .dispatch(
            squad_id,
            email_type.unwrap_or("custom"),
            &ctx,
            &subject,
            &message,
        )
        .await;

    if !sent {
        return Err(AppError::Internal("Failed to send email".into()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Email sent successfully"
    })))
}

pub async fn dashboard_stats(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM squads")
        .fetch_one(&state.db)
        .await?;

    let by_status: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM squads GROUP BY status")
            .fetch_all(&state.db)
            .await?;

    let by_payment: Vec<(String, i64)> =
        sqlx::query_as("SELECT payment_status, COUNT(*) FROM squads GROUP BY payment_status")
            .fetch_all(&state.db)
            .await?;

    let recent: Vec<(NaiveDate, i64)> = sqlx::query_as(
        r#"SELECT created_at::date AS date, COUNT(*)
        FROM squads
        WHERE created_at >= NOW() - INTERVAL '7 days'
        GROUP BY created_at::date
        ORDER BY date DESC"#,
    )
    .fetch_all(&state.db)
    .await?;

    let today: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM squads WHERE created_at::date = CURRENT_DATE")
            .fetch_one(&state.db)
            .await?;

    let status_counts: Vec<Value> = by_status
        .into_iter()
        .map(|(status, count)| json!({ "status": status, "count": count }))
        .collect();
    let payment_counts: Vec<Value> = by_payment
        .into_iter()
        .map(|(payment_status, count)| json!({ "payment_status": payment_status, "count": count }))
        .collect();
    let recent_counts: Vec<Value> = recent
        .into_iter()
        .map(|(date, count)| json!({ "date": date, "count": count }))
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "total": total,
            "byStatus": status_counts,
            "byPaymentStatus": payment_counts,
            "recentRegistrations": recent_counts,
            "today": today,
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_is_ceil_of_total_over_limit() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
        assert_eq!(total_pages(100, 7), 15);
    }

    #[test]
    fn update_with_no_fields_is_rejected() {
        let err = validate_update(&UpdateSquadRequest::default()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("No fields")));
    }

    #[test]
    fn update_rejects_unknown_status_values() {
        let body = UpdateSquadRequest {
            status: Some("cancelled".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            validate_update(&body),
            Err(AppError::BadRequest(msg)) if msg == "Invalid status"
        ));

        let body = UpdateSquadRequest {
            payment_status: Some("refunded".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            validate_update(&body),
            Err(AppError::BadRequest(msg)) if msg == "Invalid payment status"
        ));
    }

    #[test]
    fn update_accepts_each_field_independently() {
        for body in [
            UpdateSquadRequest {
                status: Some("approved".to_string()),
                ..Default::default()
            },
            UpdateSquadRequest {
                payment_status: Some("paid".to_string()),
                ..Default::default()
            },
            UpdateSquadRequest {
                remark: Some(String::new()),
                ..Default::default()
            },
            UpdateSquadRequest {
                room_id: Some("884213".to_string()),
                ..Default::default()
            },
        ] {
            assert!(validate_update(&body).is_ok());
        }
    }
}
