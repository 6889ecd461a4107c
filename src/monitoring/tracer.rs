/*!
 * Structured Tracing
 * Subscriber setup and span helpers built on the tracing crate
 */

use crate::core::types::ExecutionMode;
use tracing::{info, span, Level, Span};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - ORCHESTRATOR_TRACE_JSON: Enable JSON output (default: false)
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("ORCHESTRATOR_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    // try_init: tests and embedding callers may already have installed a subscriber
    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Generate a unique id for correlating one batch run in the logs
pub fn generate_batch_id() -> Uuid {
    Uuid::new_v4()
}

/// Span covering one batch run
pub fn span_batch(batch_id: &Uuid, mode: ExecutionMode, workers: usize) -> Span {
    span!(
        Level::INFO,
        "batch",
        batch_id = %batch_id,
        mode = %mode,
        workers = workers,
        total_ms = tracing::field::Empty,
    )
}

/// Span covering one worker from spawn to reap
pub fn span_worker(config_id: &str) -> Span {
    span!(
        Level::DEBUG,
        "worker",
        config_id = config_id,
        os_pid = tracing::field::Empty,
    )
}
