//! Tracing subscriber initialisation
//!
//! The engines only emit `tracing` events; hosts call [`init_tracing`] once
//! to print them. `RUST_LOG` takes precedence over the default filter.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Install a global fmt subscriber filtered by `RUST_LOG` or
/// `default_filter`.
///
/// Returns `false` when a global subscriber was already installed; the
/// existing one is kept.
pub fn init_tracing(default_filter: &str) -> bool {
    init_tracing_with(default_filter, LogFormat::Pretty)
}

/// Same as [`init_tracing`] with an explicit output format.
pub fn init_tracing_with(default_filter: &str, format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };

    match installed {
        Ok(()) => {
            tracing::debug!(default_filter, ?format, "tracing initialised");
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_initialisation_is_a_no_op() {
        let _ = init_tracing("warn");

        assert!(!init_tracing("debug"));
        assert!(!init_tracing_with("debug", LogFormat::Json));
    }
}
