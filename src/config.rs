use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub db: DbConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub uploads: UploadConfig,
    /// Shared secret required on top of credentials for admin login.
    pub admin_code: String,
    /// Tournament entry fee in rupees, quoted in payment emails and history.
    pub entry_fee: u32,
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_min: u32,
    pub pool_max: u32,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_secs: i64,
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub root: String,
    pub max_file_bytes: usize,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_or_parse("PORT", 3000),
            cors_origins: env_or("CORS_ORIGINS", "http://localhost:5173")
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            db: DbConfig {
                host: env_or("DB_HOST", "localhost"),
                port: env_or_parse("DB_PORT", 5432),
                database: env_or("DB_NAME", "tournament"),
                user: env_or("DB_USER", "tournament"),
                password: env_or("DB_PASSWORD", ""),
                pool_min: env_or_parse("DB_POOL_MIN", 2),
                pool_max: env_or_parse("DB_POOL_MAX", 20),
            },
            jwt: JwtConfig {
                secret: env_or("JWT_SECRET", "change-me-to-a-secure-random-string"),
                expiry_secs: env_or_parse("JWT_EXPIRY_SECS", 86_400),
            },
            email: EmailConfig {
                api_url: env_or("EMAIL_API_URL", "https://api.resend.com"),
                api_key: env_or("EMAIL_API_KEY", ""),
                from: env_or(
                    "EMAIL_FROM",
                    "Free Fire Tournament <noreply@tournament.local>",
                ),
            },
            uploads: UploadConfig {
                root: env_or("UPLOAD_DIR", "uploads"),
                max_file_bytes: env_or_parse("UPLOAD_MAX_BYTES", 10 * 1024 * 1024),
            },
            admin_code: env_or("ADMIN_CODE", ""),
            entry_fee: env_or_parse("ENTRY_FEE", 200),
        }
    }

    pub fn database_url(&self) -> String {
        if let Ok(url) = env::var("DATABASE_URL") {
            return url;
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db.user, self.db.password, self.db.host, self.db.port, self.db.database
        )
    }
}
