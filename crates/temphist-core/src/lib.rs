pub mod config;
pub mod error;

pub use config::{Config, ValidationResult};
pub use error::AppError;

use anyhow::Result;

/// Initialize tracing/logging for the application
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("temphist core initialized");
    Ok(())
}
