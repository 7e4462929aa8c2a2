//! HTTP middleware: CORS and request tracing

use axum::http::{header, HeaderValue, Method};
use std::time::Duration;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use crate::config::CorsConfig;

const CORS_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];
const CORS_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// CORS for the configured origins; `*` or an empty list allows any origin
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods(CORS_METHODS)
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(CORS_MAX_AGE);

    let any_origin = config.allowed_origins.is_empty()
        || config.allowed_origins.iter().any(|origin| origin == "*");
    if any_origin {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    base.allow_origin(origins)
        .allow_credentials(config.allow_credentials)
}

/// One INFO span per request, latency reported in microseconds
pub fn tracing_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Micros),
        )
}
