//! Logging setup
//!
//! The library itself never installs a subscriber; every component logs
//! through `tracing` inside the span it was given at construction. Binaries
//! call [`init`] once at startup to route those records somewhere.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global `tracing` subscriber
///
/// Sets up:
/// - Pretty formatting in debug builds, JSON in release builds
/// - Environment-based log level filtering (`RUST_LOG`)
///
/// # Example
///
/// ```rust,no_run
/// use tmplpak::observability;
///
/// # fn main() -> anyhow::Result<()> {
/// observability::init()?;
/// tracing::info!("Application started");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());

    #[cfg(debug_assertions)]
    {
        // Pretty formatting for development
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?;
    }

    #[cfg(not(debug_assertions))]
    {
        // JSON formatting for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    }

    Ok(())
}

fn default_filter() -> EnvFilter {
    if cfg!(debug_assertions) {
        EnvFilter::new("debug,tmplpak=trace")
    } else {
        EnvFilter::new("info")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        let filter = default_filter().to_string();
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_second_init_fails() {
        // Either this call installs the subscriber or another test already did;
        // the following call must fail in both cases.
        let _ = init();
        assert!(init().is_err());
    }
}
