use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{trace::TraceLayer, cors::{Any, CorsLayer}};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quiz_overrides::{config::Settings, db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&settings.log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = db::connect(&settings.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(db::PgStore::new(pool));
    let state = routes::AppState {
        quizzes: store.clone(),
        overrides: store,
        bulk: settings.bulk,
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(routes::router(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let addr = format!("0.0.0.0:{}", settings.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        concurrency = settings.bulk.concurrency,
        timeout_secs = settings.bulk.call_timeout.as_secs(),
        "listening on http://0.0.0.0:{}",
        settings.port
    );

    axum::serve(listener, app).await?;
    Ok(())
}
