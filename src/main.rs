use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use env_logger::Builder;
use log::LevelFilter;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use shadow_court::{app, utils::config::CONFIG};

fn init_logger() {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .filter_module("shadow_court", LevelFilter::Debug)
        .filter_module("tower_http", LevelFilter::Debug)
        .filter_module("axum", LevelFilter::Info)
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .format_target(true)
        .parse_default_env()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenv() {
        eprintln!("Warning: could not load .env: {}", e);
    }

    init_logger();

    let origin = CONFIG.allowed_origin.parse::<HeaderValue>()?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE]);

    let app = app::create_app(CONFIG.game.clone())
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &http::Request<_>| {
                tracing::info_span!(
                    "HTTP request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        );

    let listener = tokio::net::TcpListener::bind(CONFIG.addr).await?;
    log::info!("Shadow Court listening on http://{}", CONFIG.addr);
    axum::serve(listener, app).await?;
    Ok(())
}
