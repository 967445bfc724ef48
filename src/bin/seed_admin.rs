//! Out-of-band bootstrap: creates (or re-keys) the admin account and
//! upserts the default email templates. Admin accounts are never created
//! through the public API.
//!
//! Usage: `DATABASE_URL=... ADMIN_USERNAME=... ADMIN_PASSWORD=... seed-admin`

use sqlx::postgres::PgPoolOptions;

const DEFAULT_TEMPLATES: [(&str, &str, &str); 3] = [
    (
        "registration_success",
        "Squad Registration Successful - Free Fire Tournament",
        "Dear {leader_name},\n\nYour squad \"{squad_name}\" has been registered for the tournament.\n\nRegistration Code: {registration_code}\n\nNext steps:\n1. Complete payment to confirm your spot\n2. Upload the payment screenshot using your registration code\n3. Wait for admin approval\n4. You'll receive match details via email\n\nBest regards,\nTournament Team",
    ),
    (
        "approval",
        "Registration Approved - {squad_name}",
        "Congratulations {leader_name}! Your squad \"{squad_name}\" has been approved for the tournament.\n\nMatch Details:\n- Room ID: {room_id}\n- Room Password: {room_password}\n- Match Time: {match_time}\n- Please join 15 minutes before the scheduled time.\n\nRegistration Code: {registration_code}\n\nBest regards,\nTournament Team",
    ),
    (
        "payment_received",
        "Payment Verified - {squad_name}",
        "We have verified your payment for squad \"{squad_name}\".\n\nYour registration is now complete! We will review your submission and update the status within 24 hours.\n\nRegistration Code: {registration_code}\n\nBest regards,\nTournament Team",
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| "DATABASE_URL must be set")?;
    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = std::env::var("ADMIN_PASSWORD")
        .map_err(|_| "ADMIN_PASSWORD must be set")?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;

    let password_hash = bcrypt::hash(&password, 12)?;

    let admin_id: uuid::Uuid = sqlx::query_scalar(
        r#"INSERT INTO admins (username, password_hash, role)
        VALUES ($1, $2, 'admin')
        ON CONFLICT (username) DO UPDATE SET password_hash = EXCLUDED.password_hash
        RETURNING id"#,
    )
    .bind(&username)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;

    println!("Admin '{username}' ready (id {admin_id})");

    for (template_type, subject, body) in DEFAULT_TEMPLATES {
        sqlx::query(
            r#"INSERT INTO email_templates (template_type, subject, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (template_type) DO UPDATE
                SET subject = EXCLUDED.subject, body = EXCLUDED.body"#,
        )
        .bind(template_type)
        .bind(subject)
        .bind(body)
        .execute(&pool)
        .await?;
        println!("Template '{template_type}' seeded");
    }

    Ok(())
}
