//! Logging setup.
//!
//! The library only emits `tracing` events. Applications that have no
//! subscriber of their own can call [`init`].

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber filtered by `RUST_LOG`.
///
/// Falls back to `default_filter` (e.g. `"smsync_client=info"`) when
/// `RUST_LOG` is unset or invalid. Does nothing if a global subscriber is
/// already installed, so calling it more than once is harmless.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init("smsync_client=debug");
        init("smsync_client=info");
        tracing::info!("logging initialised");
    }
}
