//! # Structured Logging
//!
//! Span macros and subscriber setup built on the tracing ecosystem.
//!
//! Every Vault request runs inside a [`vault_span!`] carrying the method, the
//! API path and a request id, so the debug lines emitted by the transport can
//! be correlated in JSON output. Token values are never recorded as fields.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Create a tracing span for one Vault request.
///
/// ```rust,ignore
/// let span = vault_span!(VaultMethod::List, "kv/metadata/app/");
/// let span = vault_span!("GET", "kv/data/app", mount = "kv");
/// ```
#[macro_export]
macro_rules! vault_span {
    ($method:expr, $path:expr) => {
        tracing::debug_span!(
            "vault_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4()
        )
    };
    ($method:expr, $path:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "vault_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `debug` with `verbose` and
/// `warn` without, so access warnings still reach the terminal. Output goes to
/// stderr so that command output on stdout stays machine readable.
pub fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    if let Err(e) = installed {
        tracing::debug!("Global subscriber already installed: {}", e);
    }
}
