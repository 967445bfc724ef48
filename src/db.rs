use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;
use crate::error::AppResult;

pub async fn create_pool(config: &Config) -> PgPool {
    let url = config.database_url();
    PgPoolOptions::new()
        .min_connections(config.db.pool_min)
        .max_connections(config.db.pool_max)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(&url)
        .await
        .expect("Failed to connect to PostgreSQL")
}

/// Idempotent schema bootstrap, run once at startup.
///
/// Uniqueness (squad name, registration code, admin username) and the
/// cascade rules live here; application-level pre-checks are conveniences
/// on top of these constraints, not replacements for them.
pub async fn ensure_schema(pool: &PgPool) -> AppResult<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS admins (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'admin',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS squads (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            squad_name TEXT NOT NULL UNIQUE,
            leader_index INT NOT NULL DEFAULT 0,
            registration_code TEXT NOT NULL UNIQUE,
            leader_email TEXT NOT NULL,
            leader_whatsapp TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'approved', 'rejected')),
            payment_status TEXT NOT NULL DEFAULT 'pending'
                CHECK (payment_status IN ('pending', 'paid', 'rejected')),
            payment_screenshot TEXT,
            payment_date TIMESTAMPTZ,
            remark TEXT,
            room_id TEXT,
            room_password TEXT,
            match_time TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS squad_players (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            squad_id UUID NOT NULL REFERENCES squads(id) ON DELETE CASCADE,
            player_index INT NOT NULL,
            name TEXT NOT NULL,
            whatsapp TEXT NOT NULL,
            uid TEXT NOT NULL,
            username TEXT NOT NULL,
            screenshot TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (squad_id, player_index)
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS payments (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            squad_id UUID NOT NULL REFERENCES squads(id) ON DELETE CASCADE,
            amount INT NOT NULL,
            transaction_id TEXT,
            payment_method TEXT,
            screenshot TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'success', 'failed')),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS email_templates (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            template_type TEXT NOT NULL UNIQUE,
            subject TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS email_logs (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            squad_id UUID NOT NULL REFERENCES squads(id) ON DELETE CASCADE,
            email_type TEXT NOT NULL,
            subject TEXT NOT NULL,
            sent_to TEXT NOT NULL,
            sent_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
