use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for the execution service
#[derive(Error, Debug)]
pub enum DexflowError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Order lookup errors
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    // Routing errors
    #[error("No quotes available from any DEX")]
    NoQuoteAvailable,

    #[error("Failed to select a DEX from the ranked quotes")]
    RoutingFailure,

    #[error("Limit price not met: expected {expected} > limit {limit}")]
    LimitNotMet { expected: Decimal, limit: Decimal },

    // Quote source errors
    #[error("Quote source '{venue}' failed: {reason}")]
    QuoteSource { venue: String, reason: String },

    // Swap execution errors
    #[error("Swap execution failed on {venue}: {reason}")]
    SwapExecution { venue: String, reason: String },

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for DexflowError
pub type Result<T> = std::result::Result<T, DexflowError>;
