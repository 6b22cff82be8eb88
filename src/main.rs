use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get, web};
use dotenvy::dotenv;

mod api;
mod auth;
mod clock;
mod config;
mod db;
mod error;
mod model;
mod models;
mod routes;
mod store;

use clock::{Clock, SharedClock, SystemClock};
use config::Config;
use db::init_db;
use models::ApiResponse;
use store::rate_limit::{CLOCK_EVENT_QUOTA, RateLimiter, RateQuota};
use tracing::info;
use tracing_appender::rolling;

#[get("/health")]
async fn health(clock: Data<SharedClock>) -> impl Responder {
    web::Json(ApiResponse::message_with_data(
        "Attendance API is running",
        serde_json::json!({
            "timestamp": clock.now(),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    ))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await;
    db::ensure_schema(&pool).await?;
    db::seed_default_officers(&pool).await?;

    let limiter = RateLimiter::new(
        pool.clone(),
        &[
            RateQuota {
                window_ms: config.rate_window_ms,
                max_requests: config.rate_max_requests,
            },
            CLOCK_EVENT_QUOTA,
        ],
    );
    let clock: SharedClock = Arc::new(SystemClock);

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(limiter.clone()))
            .app_data(Data::new(clock.clone()))
            .service(health)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
