pub mod config;
pub mod errors;
pub mod generation;
pub mod llm;
pub mod orchestrator;
pub mod perception;

pub use errors::{EuporieError, EuporieResult};
pub use orchestrator::engine::Orchestrator;
pub use orchestrator::request::InvokeRequest;
pub use orchestrator::response::{Decision, ErrorReply, InvokeResponse};

/// Install the global subscriber. `RUST_LOG` wins; otherwise `info`.
/// Logs go to stderr so stdout stays clean for JSON output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
