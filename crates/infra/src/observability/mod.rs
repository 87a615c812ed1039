//! Tracing subscriber setup
//!
//! Library code only emits `tracing` events; binaries and tests call
//! [`init_tracing`] once to route them to stderr. `RUST_LOG` overrides the
//! default filter directive.

use std::str::FromStr;

use armis_domain::impl_wire_enum_conversions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_DIRECTIVE: &str = "armis_infra=info,warn";

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Plain,
    /// One JSON object per line, with span context
    Json,
}

impl_wire_enum_conversions!(LogFormat {
    Plain => "plain",
    Json => "json",
});

impl LogFormat {
    /// Format named by `ARMIS_LOG_FORMAT`, falling back to plain text.
    pub fn from_env() -> Self {
        std::env::var("ARMIS_LOG_FORMAT")
            .ok()
            .and_then(|raw| LogFormat::from_str(raw.trim()).ok())
            .unwrap_or_default()
    }
}

/// Install the global subscriber with [`DEFAULT_LOG_DIRECTIVE`].
///
/// Returns `false` when a global subscriber was already set; the existing one
/// is kept.
pub fn init_tracing(format: &LogFormat) -> bool {
    init_tracing_with(format, DEFAULT_LOG_DIRECTIVE)
}

/// Like [`init_tracing`] with an explicit fallback directive.
pub fn init_tracing_with(format: &LogFormat, default_directive: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        LogFormat::Plain => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    installed.is_ok()
}
