use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

use config::Config;
use services::mailer::Mailer;
use services::notifications::Notifier;
use services::uploads::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub notifier: Notifier,
    pub uploads: UploadStore,
}

fn build_cors(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    layer.allow_origin(origins)
}

fn build_router(state: AppState) -> Router {
    let cors = build_cors(&state.config);

    // --- Public squad routes (registration code is the only credential) ---
    let squad_routes = Router::new()
        .route("/squad-register", post(routes::squads::register_squad))
        .route("/upload-payment/:code", post(routes::squads::upload_payment))
        .route("/by-code/:code", get(routes::squads::get_by_code))
        .route("/status/:code", get(routes::squads::check_status))
        .route("/user/:code", get(routes::squads::get_for_user));

    // --- Admin routes (bearer auth, admin role) ---
    let admin_routes = Router::new()
        .route("/squads", get(routes::admin::list_squads))
        .route(
            "/squad/:id",
            get(routes::admin::squad_details).put(routes::admin::update_squad),
        )
        .route(
            "/squad/:id/send-email",
            post(routes::admin::send_custom_email),
        )
        .route("/dashboard/stats", get(routes::admin::dashboard_stats))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin,
        ))
        .route("/login", post(routes::admin::login));

    let api = Router::new()
        .nest("/squad", squad_routes)
        .nest("/admin", admin_routes);

    // Uploaded screenshots are served back at the same /uploads paths that
    // squad and player rows store.
    let uploads_dir = ServeDir::new(&state.config.uploads.root);

    Router::new()
        .nest("/api", api)
        .route("/health", get(routes::health::health))
        .nest_service("/uploads", uploads_dir)
        .layer(DefaultBodyLimit::max(
            state.config.uploads.max_file_bytes * 5,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let pool = db::create_pool(&config).await;
    db::ensure_schema(&pool).await?;

    let mailer = Mailer::new(&config.email);
    if mailer.is_none() {
        tracing::warn!("EMAIL_API_KEY not set; notification emails will be dropped");
    }
    let notifier = Notifier::new(pool.clone(), mailer, config.entry_fee);
    let uploads = UploadStore::new(&config.uploads);

    let port = config.port;
    let state = AppState {
        db: pool,
        config: Arc::new(config),
        notifier,
        uploads,
    };

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Tournament API listening on port {port}");

    axum::serve(listener, router).await?;
    Ok(())
}
