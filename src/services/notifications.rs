use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::mailer::Mailer;

/// Everything a template can reference about a squad. Built from the
/// persisted row after the triggering mutation has committed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SquadContext {
    pub squad_name: String,
    pub registration_code: String,
    pub leader_email: String,
    pub leader_name: Option<String>,
    pub status: String,
    pub remark: Option<String>,
    pub room_id: Option<String>,
    pub room_password: Option<String>,
    pub match_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl SquadContext {
    pub fn leader_name(&self) -> &str {
        self.leader_name.as_deref().unwrap_or("Leader")
    }

    fn room_id_or(&self, fallback: &str) -> String {
        self.room_id.clone().unwrap_or_else(|| fallback.to_string())
    }

    fn room_password_or(&self, fallback: &str) -> String {
        self.room_password
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }

    fn match_time_or(&self, fallback: &str) -> String {
        self.match_time
            .map(|t| t.format("%d %b %Y %H:%M UTC").to_string())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Substitutes the fixed placeholder set against squad data. Only these
/// seven tokens are ever resolved; caller-supplied templates cannot inject
/// additional keys. Unassigned optional fields resolve to readable text.
pub fn render_placeholders(text: &str, ctx: &SquadContext) -> String {
    let replacements = [
        ("{squad_name}", ctx.squad_name.clone()),
        ("{registration_code}", ctx.registration_code.clone()),
        ("{leader_name}", ctx.leader_name().to_string()),
        ("{status}", ctx.status.clone()),
        ("{room_id}", ctx.room_id_or("Not assigned")),
        ("{room_password}", ctx.room_password_or("Not assigned")),
        ("{match_time}", ctx.match_time_or("Will be announced")),
    ];

    let mut out = text.to_string();
    for (token, value) in replacements {
        out = out.replace(token, &value);
    }
    out
}

/// Built-in fallback templates used when no `email_templates` row matches
/// the requested type. Returns (subject, plain-text message).
pub fn default_template(email_type: &str, ctx: &SquadContext, entry_fee: u32) -> (String, String) {
    match email_type {
        "registration_success" => (
            "Squad Registration Successful - Free Fire Tournament".to_string(),
            format!(
                "Dear {leader},\n\nYour squad \"{name}\" has been registered for the tournament.\n\nRegistration Code: {code}\n\nNext steps:\n1. Complete payment of Rs {fee} to confirm your spot\n2. Upload the payment screenshot using your registration code\n3. Wait for admin approval\n4. You'll receive match details via email\n\nUse this registration code to check your status anytime.\n\nBest regards,\nTournament Team",
                leader = ctx.leader_name(),
                name = ctx.squad_name,
                code = ctx.registration_code,
                fee = entry_fee,
            ),
        ),
        "payment_success" => (
            "Payment Received - Free Fire Tournament".to_string(),
            format!(
                "Dear {leader},\n\nWe have received your payment upload for squad \"{name}\".\n\nAmount: Rs {fee}\nRegistration Code: {code}\n\nYour payment is under verification. We will review your registration and update the status within 24 hours. You will receive another email with match details once approved.\n\nKeep your registration code safe for future reference.\n\nBest regards,\nTournament Team",
                leader = ctx.leader_name(),
                name = ctx.squad_name,
                code = ctx.registration_code,
                fee = entry_fee,
            ),
        ),
        "approval" => (
            format!("Registration Approved - {}", ctx.squad_name),
            format!(
                "Congratulations! Your squad \"{name}\" has been approved for the tournament.\n\nMatch Details:\n- Room ID: {room}\n- Room Password: {password}\n- Match Time: {time}\n- Please join 15 minutes before the scheduled time.\n\nRegistration Code: {code}\n\nBest regards,\nTournament Team",
                name = ctx.squad_name,
                room = ctx.room_id_or("Will be announced"),
                password = ctx.room_password_or("Will be announced"),
                time = ctx.match_time_or("Will be announced"),
                code = ctx.registration_code,
            ),
        ),
        "payment_received" | "payment_confirmation" => (
            format!("Payment Verified - {}", ctx.squad_name),
            format!(
                "We have verified your payment for squad \"{name}\".\n\nPayment Details:\n- Amount: Rs {fee}\n- Status: Verified\n\nYour registration is now complete! We will review your submission and update the status within 24 hours.\n\nRegistration Code: {code}\n\nBest regards,\nTournament Team",
                name = ctx.squad_name,
                fee = entry_fee,
                code = ctx.registration_code,
            ),
        ),
        "rejection" => (
            format!("Registration Update - {}", ctx.squad_name),
            format!(
                "Regarding your squad \"{name}\", we regret to inform you that your registration has been rejected.\n\nReason: {reason}\n\nRegistration Code: {code}\n\nIf you believe this is a mistake, please contact support.\n\nBest regards,\nTournament Team",
                name = ctx.squad_name,
                reason = ctx.remark.as_deref().unwrap_or("Not specified"),
                code = ctx.registration_code,
            ),
        ),
        _ => (
            format!("Update - {}", ctx.squad_name),
            "Important update regarding your squad registration.".to_string(),
        ),
    }
}

/// Wraps a plain-text message in the portal's HTML shell: header band,
/// message box, squad details, footer.
pub fn wrap_html(ctx: &SquadContext, message: &str) -> String {
    let room_line = ctx
        .room_id
        .as_deref()
        .map(|r| format!("<p>Room ID: {r}</p>"))
        .unwrap_or_default();
    let password_line = ctx
        .room_password
        .as_deref()
        .map(|p| format!("<p>Room Password: {p}</p>"))
        .unwrap_or_default();

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 30px; text-align: center; border-radius: 10px 10px 0 0;">
    <h1>&#127918; Free Fire Tournament</h1>
  </div>
  <div style="background: #f9f9f9; padding: 30px; border-radius: 0 0 10px 10px;">
    <h2>Hello {leader}!</h2>
    <div style="background: white; padding: 20px; border-radius: 8px; margin: 20px 0; border-left: 4px solid #667eea;">
      {body}
    </div>
    <div style="margin-top: 30px; padding: 15px; background: #f8f9fa; border-radius: 8px;">
      <p><strong>Squad Details:</strong></p>
      <p>Squad Name: {name}</p>
      <p>Registration Code: <code style="background: #333; color: white; padding: 2px 8px; border-radius: 4px;">{code}</code></p>
      <p>Status: {status}</p>
      {room_line}
      {password_line}
    </div>
    <div style="margin-top: 30px; padding-top: 20px; border-top: 1px solid #ddd; color: #666;">
      <p>Best regards,<br><strong>Tournament Team</strong></p>
      <p style="font-size: 12px; color: #999;">This is an automated email. Please do not reply to this message.</p>
    </div>
  </div>
</div>"#,
        leader = ctx.leader_name(),
        body = message.replace('\n', "<br>"),
        name = ctx.squad_name,
        code = ctx.registration_code,
        status = ctx.status,
    )
}

/// Renders a named template against squad data, delivers it, and appends an
/// audit row for every successful send. Callers spawn the `notify_*` entry
/// points after their own mutation has committed; nothing here can fail the
/// triggering workflow.
#[derive(Clone)]
pub struct Notifier {
    db: PgPool,
    mailer: Option<Mailer>,
    entry_fee: u32,
}

impl Notifier {
    pub fn new(db: PgPool, mailer: Option<Mailer>, entry_fee: u32) -> Self {
        Self {
            db,
            mailer,
            entry_fee,
        }
    }

    pub async fn squad_context(&self, squad_id: Uuid) -> AppResult<Option<SquadContext>> {
        let ctx = sqlx::query_as::<_, SquadContext>(
            r#"SELECT s.squad_name, s.registration_code, s.leader_email, s.status,
                s.remark, s.room_id, s.room_password, s.match_time,
                (SELECT name FROM squad_players
                 WHERE squad_id = s.id AND player_index = s.leader_index) AS leader_name
            FROM squads s WHERE s.id = $1"#,
        )
        .bind(squad_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(ctx)
    }

    /// DB template for the type, with placeholder substitution; falls back
    /// to the built-in defaults. Lookup failures degrade to the defaults.
    pub async fn resolve_template(&self, email_type: &str, ctx: &SquadContext) -> (String, String) {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT subject, body FROM email_templates WHERE template_type = $1",
        )
        .bind(email_type)
        .fetch_optional(&self.db)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Template lookup failed for {email_type}: {e}");
            None
        });

        match row {
            Some((subject, body)) => (
                render_placeholders(&subject, ctx),
                render_placeholders(&body, ctx),
            ),
            None => default_template(email_type, ctx, self.entry_fee),
        }
    }

    /// Sends one email and, if the transport reports success, records
    /// exactly one `email_logs` row. Returns whether the send succeeded.
    pub async fn dispatch(
        &self,
        squad_id: Uuid,
        email_type: &str,
        ctx: &SquadContext,
        subject: &str,
        message: &str,
    ) -> bool {
        let html = wrap_html(ctx, message);

        let sent = match &self.mailer {
            Some(mailer) => mailer.send(&ctx.leader_email, subject, &html).await,
            None => {
                tracing::warn!("Email transport not configured; dropping '{email_type}' email");
                false
            }
        };

        if sent {
            if let Err(e) = sqlx::query(
                "INSERT INTO email_logs (squad_id, email_type, subject, sent_to) VALUES ($1, $2, $3, $4)",
            )
            .bind(squad_id)
            .bind(email_type)
            .bind(subject)
            .bind(&ctx.leader_email)
            .execute(&self.db)
            .await
            {
                tracing::error!("Email log insert failed: {e}");
            }
        }

        sent
    }

    /// Post-commit hook: renders the template for `email_type` against the
    /// squad's current state and delivers it. Failures are logged only.
    pub async fn notify_squad(&self, squad_id: Uuid, email_type: &str) {
        let ctx = match self.squad_context(squad_id).await {
            Ok(Some(ctx)) => ctx,
            Ok(None) => {
                tracing::warn!("Notification skipped: squad {squad_id} no longer exists");
                return;
            }
            Err(e) => {
                tracing::error!("Notification context fetch failed for {squad_id}: {e}");
                return;
            }
        };

        let (subject, message) = self.resolve_template(email_type, &ctx).await;
        if !self.dispatch(squad_id, email_type, &ctx, &subject, &message).await {
            tracing::warn!("'{email_type}' notification for squad {squad_id} was not delivered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SquadContext {
        SquadContext {
            squad_name: "Night Owls".to_string(),
            registration_code: "FF-K7M2XQ".to_string(),
            leader_email: "lead@example.com".to_string(),
            leader_name: Some("Asha".to_string()),
            status: "pending".to_string(),
            remark: None,
            room_id: None,
            room_password: None,
            match_time: None,
        }
    }

    #[test]
    fn placeholders_resolve_against_squad_data() {
        let text = "Squad {squad_name} ({registration_code}) led by {leader_name} is {status}";
        let out = render_placeholders(text, &ctx());
        assert_eq!(out, "Squad Night Owls (FF-K7M2XQ) led by Asha is pending");
    }

    #[test]
    fn unassigned_fields_resolve_to_readable_fallbacks() {
        let out = render_placeholders("{room_id} / {room_password} / {match_time}", &ctx());
        assert_eq!(out, "Not assigned / Not assigned / Will be announced");
    }

    #[test]
    fn missing_leader_name_falls_back() {
        let mut c = ctx();
        c.leader_name = None;
        assert_eq!(render_placeholders("{leader_name}", &c), "Leader");
    }

    #[test]
    fn approval_default_announces_placeholder_room() {
        let (subject, message) = default_template("approval", &ctx(), 200);
        assert_eq!(subject, "Registration Approved - Night Owls");
        assert!(message.contains("Room ID: Will be announced"));
        assert!(message.contains("Room Password: Will be announced"));
    }

    #[test]
    fn approval_default_includes_assigned_room() {
        let mut c = ctx();
        c.room_id = Some("884213".to_string());
        c.room_password = Some("owls".to_string());
        let (_, message) = default_template("approval", &c, 200);
        assert!(message.contains("Room ID: 884213"));
        assert!(message.contains("Room Password: owls"));
    }

    #[test]
    fn rejection_default_uses_remark_when_present() {
        let mut c = ctx();
        c.remark = Some("Duplicate players".to_string());
        let (_, message) = default_template("rejection", &c, 200);
        assert!(message.contains("Reason: Duplicate players"));

        let (_, message) = default_template("rejection", &ctx(), 200);
        assert!(message.contains("Reason: Not specified"));
    }

    #[test]
    fn unknown_type_falls_back_to_generic() {
        let (subject, message) = default_template("midnight_special", &ctx(), 200);
        assert_eq!(subject, "Update - Night Owls");
        assert!(message.contains("Important update"));
    }

    #[test]
    fn html_shell_embeds_message_and_details() {
        let html = wrap_html(&ctx(), "line one\nline two");
        assert!(html.contains("line one<br>line two"));
        assert!(html.contains("Night Owls"));
        assert!(html.contains("FF-K7M2XQ"));
        assert!(!html.contains("Room ID:"));

        let mut c = ctx();
        c.room_id = Some("884213".to_string());
        assert!(wrap_html(&c, "hi").contains("Room ID: 884213"));
    }
}
