use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::models::squad::*;
use crate::services::codes;
use crate::AppState;

/// Parsed `POST /squad-register` multipart body. Screenshot files are
/// written to the upload store as they stream in (like the original disk
/// middleware); validation happens on the assembled form.
#[derive(Debug, Default)]
struct RegistrationForm {
    squad_name: String,
    leader_index: i32,
    leader_email: String,
    leader_whatsapp: String,
    players: Vec<PlayerEntry>,
    screenshots: Vec<String>,
}

fn is_ten_digit_phone(s: &str) -> bool {
    s.len() == 10 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Rejects before any row is written. Errors name the offending field.
fn validate_registration(form: &RegistrationForm) -> Result<(), AppError> {
    if form.squad_name.trim().is_empty() {
        return Err(AppError::BadRequest("squadName is required".into()));
    }
    if !form.leader_email.contains('@') {
        return Err(AppError::BadRequest(
            "Valid leaderEmail is required".into(),
        ));
    }
    if !is_ten_digit_phone(&form.leader_whatsapp) {
        return Err(AppError::BadRequest(
            "leaderWhatsapp must be a 10-digit number".into(),
        ));
    }
    if form.players.len() != SQUAD_SIZE {
        return Err(AppError::BadRequest(format!(
            "Exactly {SQUAD_SIZE} players are required"
        )));
    }
    if !(0..SQUAD_SIZE as i32).contains(&form.leader_index) {
        return Err(AppError::BadRequest(format!(
            "leaderIndex must be between 0 and {}",
            SQUAD_SIZE - 1
        )));
    }
    for (i, player) in form.players.iter().enumerate() {
        if player.name.trim().is_empty() {
            return Err(AppError::BadRequest(format!("players[{i}].name is required")));
        }
        if !is_ten_digit_phone(&player.whatsapp) {
            return Err(AppError::BadRequest(format!(
                "players[{i}].whatsapp must be a 10-digit number"
            )));
        }
        if player.uid.trim().is_empty() {
            return Err(AppError::BadRequest(format!("players[{i}].uid is required")));
        }
        if player.username.trim().is_empty() {
            return Err(AppError::BadRequest(format!(
                "players[{i}].username is required"
            )));
        }
        if form.screenshots.get(i).is_none() {
            return Err(AppError::BadRequest(format!(
                "players[{i}] screenshot is required"
            )));
        }
    }
    Ok(())
}

async fn parse_registration(
    state: &AppState,
    mut multipart: Multipart,
) -> AppResult<RegistrationForm> {
    let mut form = RegistrationForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "squadName" => {
                form.squad_name = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid squadName: {e}")))?;
            }
            "leaderIndex" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid leaderIndex: {e}")))?;
                form.leader_index = text
                    .trim()
                    .parse()
                    .map_err(|_| AppError::BadRequest("leaderIndex must be a number".into()))?;
            }
            "leaderEmail" => {
                form.leader_email = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid leaderEmail: {e}")))?;
            }
            "leaderWhatsapp" => {
                form.leader_whatsapp = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid leaderWhatsapp: {e}")))?;
            }
            "players" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid players field: {e}")))?;
                form.players = serde_json::from_str(&text).map_err(|_| {
                    AppError::BadRequest("players must be a JSON array of player entries".into())
                })?;
            }
            "screenshots" => {
                let original = field.file_name().unwrap_or("screenshot").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Screenshot upload failed: {e}")))?;
                let path = state.uploads.save("squad", &original, &bytes).await?;
                form.screenshots.push(path);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Inserts the squad and its four players atomically. Returns the new id.
async fn insert_squad(state: &AppState, form: &RegistrationForm, code: &str) -> AppResult<Uuid> {
    let mut tx = state.db.begin().await?;

    let squad_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO squads
            (squad_name, leader_index, registration_code, leader_email, leader_whatsapp, status, payment_status)
        VALUES ($1, $2, $3, $4, $5, 'pending', 'pending')
        RETURNING id"#,
    )
    .bind(&form.squad_name)
    .bind(form.leader_index)
    .bind(code)
    .bind(&form.leader_email)
    .bind(&form.leader_whatsapp)
    .fetch_one(&mut *tx)
    .await?;

    for (i, player) in form.players.iter().enumerate() {
        sqlx::query(
            r#"INSERT INTO squad_players
                (squad_id, player_index, name, whatsapp, uid, username, screenshot)
            VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(squad_id)
        .bind(i as i32)
        .bind(&player.name)
        .bind(&player.whatsapp)
        .bind(&player.uid)
        .bind(&player.username)
        .bind(form.screenshots.get(i))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(squad_id)
}

pub async fn register_squad(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<Value>> {
    let form = parse_registration(&state, multipart).await?;
    validate_registration(&form)?;

    // Pre-check is a convenience; the unique constraint decides the race.
    let name_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM squads WHERE squad_name = $1)")
            .bind(&form.squad_name)
            .fetch_one(&state.db)
            .await?;
    if name_taken {
        return Err(AppError::BadRequest("Squad name already exists".into()));
    }

    let mut code = codes::allocate_code(&state.db).await?;
    let mut squad_id = None;
    for _ in 0..3 {
        match insert_squad(&state, &form, &code).await {
            Ok(id) => {
                squad_id = Some(id);
                break;
            }
            // Lost a race on the code: re-roll and retry.
            Err(AppError::Database(e))
                if is_unique_violation(&e, "squads_registration_code_key") =>
            {
                code = codes::allocate_code(&state.db).await?;
            }
            Err(AppError::Database(e)) if is_unique_violation(&e, "squads_squad_name_key") => {
                return Err(AppError::Conflict("Squad name already exists".into()));
            }
            Err(e) => return Err(e),
        }
    }
    let squad_id = squad_id
        .ok_or_else(|| AppError::Internal("Could not persist squad registration".into()))?;

    tracing::info!("Squad '{}' registered with code {code}", form.squad_name);

    // Best-effort, after commit; never rolls back the registration.
    let notifier = state.notifier.clone();
    tokio::spawn(async move {
        notifier.notify_squad(squad_id, "registration_success").await;
    });

    Ok(Json(json!({
        "message": "Squad Registered Successfully",
        "registrationCode": code,
        "nextStep": "Complete payment to confirm registration"
    })))
}

pub async fn upload_payment(
    State(state): State<AppState>,
    Path(code): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let squad: Squad = sqlx::query_as("SELECT * FROM squads WHERE registration_code = $1")
        .bind(&code)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invalid registration code".into()))?;

    let mut screenshot = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() == Some("payment") {
            let original = field.file_name().unwrap_or("payment").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Payment upload failed: {e}")))?;
            screenshot = Some(state.uploads.save("payment", &original, &bytes).await?);
        }
    }
    let screenshot =
        screenshot.ok_or_else(|| AppError::BadRequest("Payment screenshot is required".into()))?;

    // Client-asserted "I paid": repeated uploads overwrite the current
    // state; the history table below keeps every submission.
    sqlx::query(
        r#"UPDATE squads
        SET payment_screenshot = $1, payment_status = 'paid', payment_date = NOW()
        WHERE id = $2"#,
    )
    .bind(&screenshot)
    .bind(squad.id)
    .execute(&state.db)
    .await?;

    sqlx::query(
        r#"INSERT INTO payments (squad_id, amount, payment_method, screenshot, status)
        VALUES ($1, $2, 'upi', $3, 'success')"#,
    )
    .bind(squad.id)
    .bind(state.config.entry_fee as i32)
    .bind(&screenshot)
    .execute(&state.db)
    .await?;

    let notifier = state.notifier.clone();
    let squad_id = squad.id;
    tokio::spawn(async move {
        notifier.notify_squad(squad_id, "payment_success").await;
    });

    Ok(Json(json!({
        "message": "Payment uploaded successfully",
        "status": "Under verification"
    })))
}

async fn squad_with_players(state: &AppState, code: &str) -> AppResult<(Squad, Vec<SquadPlayer>)> {
    let squad: Squad = sqlx::query_as("SELECT * FROM squads WHERE registration_code = $1")
        .bind(code)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invalid registration code".into()))?;

    let players: Vec<SquadPlayer> =
        sqlx::query_as("SELECT * FROM squad_players WHERE squad_id = $1 ORDER BY player_index")
            .bind(squad.id)
            .fetch_all(&state.db)
            .await?;

    Ok((squad, players))
}

pub async fn get_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<Value>> {
    let (squad, players) = squad_with_players(&state, &code).await?;
    Ok(Json(json!({ "squad": squad, "players": players })))
}

pub async fn check_status(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<Value>> {
    let status: SquadStatus = sqlx::query_as(
        r#"SELECT squad_name, registration_code, status, payment_status,
            payment_screenshot, remark, room_id, room_password, created_at
        FROM squads WHERE registration_code = $1"#,
    )
    .bind(&code)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Invalid registration code".into()))?;

    Ok(Json(json!({ "success": true, "data": status })))
}

pub async fn get_for_user(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<Value>> {
    let (squad, players) = squad_with_players(&state, &code).await?;
    let total = players.len();
    let mut squad_json = serde_json::to_value(&squad)
        .map_err(|e| AppError::Internal(format!("Serialization error: {e}")))?;
    if let Some(obj) = squad_json.as_object_mut() {
        obj.insert("players".into(), json!(players));
        obj.insert("total_players".into(), json!(total));
    }
    Ok(Json(json!({ "success": true, "squad": squad_json })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RegistrationForm {
        RegistrationForm {
            squad_name: "Night Owls".to_string(),
            leader_index: 0,
            leader_email: "lead@example.com".to_string(),
            leader_whatsapp: "9876543210".to_string(),
            players: (0..4)
                .map(|i| PlayerEntry {
                    name: format!("Player {i}"),
                    whatsapp: "9876543210".to_string(),
                    uid: format!("uid-{i}"),
                    username: format!("user{i}"),
                })
                .collect(),
            screenshots: (0..4).map(|i| format!("/uploads/squad/{i}.png")).collect(),
        }
    }

    fn error_message(form: &RegistrationForm) -> String {
        match validate_registration(form) {
            Err(AppError::BadRequest(msg)) => msg,
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(validate_registration(&valid_form()).is_ok());
    }

    #[test]
    fn short_leader_whatsapp_is_rejected() {
        let mut form = valid_form();
        form.leader_whatsapp = "12345".to_string();
        assert!(error_message(&form).contains("leaderWhatsapp"));

        form.leader_whatsapp = "9876543210".to_string();
        assert!(validate_registration(&form).is_ok());
    }

    #[test]
    fn non_numeric_whatsapp_is_rejected() {
        let mut form = valid_form();
        form.leader_whatsapp = "987654321x".to_string();
        assert!(error_message(&form).contains("leaderWhatsapp"));
    }

    #[test]
    fn email_must_contain_at_sign() {
        let mut form = valid_form();
        form.leader_email = "not-an-email".to_string();
        assert!(error_message(&form).contains("leaderEmail"));
    }

    #[test]
    fn empty_squad_name_is_rejected() {
        let mut form = valid_form();
        form.squad_name = "   ".to_string();
        assert!(error_message(&form).contains("squadName"));
    }

    #[test]
    fn leader_index_must_reference_a_slot() {
        let mut form = valid_form();
        form.leader_index = 4;
        assert!(error_message(&form).contains("leaderIndex"));
        form.leader_index = -1;
        assert!(error_message(&form).contains("leaderIndex"));
    }

    #[test]
    fn exactly_four_players_required() {
        let mut form = valid_form();
        form.players.pop();
        assert!(error_message(&form).contains("4 players"));
    }

    #[test]
    fn player_errors_name_the_offending_slot() {
        let mut form = valid_form();
        form.players[2].uid = String::new();
        assert_eq!(error_message(&form), "players[2].uid is required");

        let mut form = valid_form();
        form.players[1].whatsapp = "12345".to_string();
        assert!(error_message(&form).contains("players[1].whatsapp"));
    }

    #[test]
    fn each_player_needs_a_screenshot() {
        let mut form = valid_form();
        form.screenshots.truncate(3);
        assert_eq!(error_message(&form), "players[3] screenshot is required");
    }
}
