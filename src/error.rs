//! Error types shared by repositories, the shopping list service and commands

use std::fmt;

use thiserror::Error;

/// Persisted entity kinds, used to label lookup failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Trip,
    Participant,
    Product,
    Consumption,
    Availability,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Trip => "Trip",
            EntityKind::Participant => "Participant",
            EntityKind::Product => "Product",
            EntityKind::Consumption => "Consumption",
            EntityKind::Availability => "Availability",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    /// A referenced id does not resolve
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: i64 },

    /// Malformed input rejected before it reaches storage
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage failure, tagged with where it happened
    #[error("Database error in {operation} on {table}{}: {source}", record_suffix(.record_id))]
    Database {
        operation: &'static str,
        table: &'static str,
        record_id: Option<i64>,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database connection lock poisoned")]
    LockPoisoned,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn record_suffix(record_id: &Option<i64>) -> String {
    record_id.map(|id| format!(" (id {})", id)).unwrap_or_default()
}

impl AppError {
    pub fn not_found(entity: EntityKind, id: i64) -> Self {
        AppError::NotFound { entity, id }
    }

    /// Builds a mapper for `rusqlite` failures, for use with `map_err`
    pub fn db(
        operation: &'static str,
        table: &'static str,
        record_id: Option<i64>,
    ) -> impl FnOnce(rusqlite::Error) -> AppError {
        move |source| AppError::Database {
            operation,
            table,
            record_id,
            source,
        }
    }
}

/// Result type for application operations
pub type AppResult<T> = Result<T, AppError>;
