use anyhow::Result;
use axum::{middleware, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

use ethos_engine::api::{
    body_size_middleware, create_api_router, health, rate_limit_middleware,
    security_headers_middleware, ApiState, SecurityState,
};
use ethos_engine::database::DatabasePool;
use ethos_engine::{EthosConfig, EthosEngine};

#[tokio::main]
async fn main() -> Result<()> {
    let config = EthosConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        e
    })?;

    init_logging(&config)?;

    info!("Starting Agent Ethos reputation engine");

    let mut engine = EthosEngine::new(&config);

    // Optional PostgreSQL journal: connect, ensure schema, reload state.
    if config.database.postgres_enabled {
        let db = DatabasePool::connect(&config.database.postgres_url)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        db.init_schema().await.map_err(|e| anyhow::anyhow!(e))?;

        engine = engine.with_database(Arc::new(db));
        engine
            .load_from_database()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to reload persisted state: {}", e))?;
    } else {
        info!("PostgreSQL disabled - running in memory");
    }

    let engine = Arc::new(engine);
    let api_state = ApiState::new(engine.clone(), config.limits.clone(), &config.security);
    let security_state = SecurityState::new(
        config.security.rate_limit_per_minute,
        config.security.max_request_size,
    );

    let app = Router::new()
        .nest("/api/v1", create_api_router(api_state))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(
            security_state.clone(),
            body_size_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            security_state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind_addr, e))?;

    info!(
        "Reputation engine listening on {} (rate limit {}/min, max body {}KB)",
        bind_addr,
        config.security.rate_limit_per_minute,
        config.security.max_request_size / 1024
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_logging(config: &EthosConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
