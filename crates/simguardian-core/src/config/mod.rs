//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod database;
pub mod logging;
pub mod realtime;
pub mod session;
pub mod source;

use serde::{Deserialize, Serialize};

pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::realtime::{NotificationStoreConfig, RealtimeConfig};
pub use self::session::SessionConfig;
pub use self::source::{SourceConfig, SourceProvider};

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings. Required only for the Postgres source.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Which event source backs the notification store.
    #[serde(default)]
    pub source: SourceConfig,
    /// Notification store and subscription settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Identity used by the notifier daemon at startup.
    #[serde(default)]
    pub session: SessionConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `SIMGUARDIAN__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SIMGUARDIAN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let app: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        app.validate()?;
        Ok(app)
    }

    /// Check cross-section constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.source.provider == SourceProvider::Postgres && self.database.is_none() {
            return Err(AppError::configuration(
                "source.provider = \"postgres\" requires a [database] section",
            ));
        }
        if self.realtime.notifications.command_buffer == 0
            || self.realtime.notifications.event_buffer == 0
        {
            return Err(AppError::configuration(
                "notification buffers must be greater than zero",
            ));
        }
        Ok(())
    }
}
