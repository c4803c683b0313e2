use sqlx::sqlite::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use folio_search::config;
use folio_search::db;
use folio_search::events;
use folio_search::scheduler::SearchScheduler;
use folio_search::sync::JobLedger;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_search=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config().map_err(anyhow::Error::msg)?;
    tracing::info!("Server will listen on {}:{}", app_config.server.host, app_config.server.port);

    // Create data directory if not exists / 创建数据目录
    let data_dir = app_config.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory: {:?}", data_dir);
    }

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| app_config.get_database_url());

    let pool = SqlitePool::connect(&database_url).await?;

    db::run_migrations(&pool).await?;

    // Clear push markers left by an interrupted run / 清理中断的推送标记
    let cleared = JobLedger::new(pool.clone()).reset_interrupted().await?;
    if cleared > 0 {
        tracing::warn!("Cleared {} interrupted search push marker(s)", cleared);
    }

    let (state, event_rx) = AppState::build(pool, &app_config);

    events::spawn_listener(event_rx, state.synchronizer.clone());

    let scheduler = SearchScheduler::new().await?;
    scheduler
        .schedule_push(&app_config.sync.cron, state.synchronizer.clone())
        .await?;
    scheduler.start().await?;

    let app = api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server running on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
