//! Diagnostic logging setup.
//!
//! Everything goes to stderr so stdout carries only the console summary and
//! listings. `RUST_LOG` takes precedence over the default directive.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_DIRECTIVE: &str = "toolprobe=info";
pub const VERBOSE_LOG_DIRECTIVE: &str = "toolprobe=debug";

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_LOG_DIRECTIVE
    } else {
        DEFAULT_LOG_DIRECTIVE
    }
}

pub fn init_tracing(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .ok();
}
