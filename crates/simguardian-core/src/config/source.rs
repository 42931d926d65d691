//! Event source selection.

use serde::{Deserialize, Serialize};

/// Backend that supplies notification rows and insert events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceProvider {
    /// PostgreSQL table with a `LISTEN/NOTIFY` insert trigger.
    #[default]
    Postgres,
    /// Process-local store, useful for single-node demos.
    Memory,
}

/// Event source configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Which provider to use.
    #[serde(default)]
    pub provider: SourceProvider,
}
