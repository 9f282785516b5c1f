//! # Error Types
//!
//! Error taxonomy for the vault core using `thiserror`.
//!
//! Validation and not-found errors are expected control flow for callers;
//! master-key, encryption, and database errors indicate misconfiguration or
//! corruption and should propagate to a top-level handler.

/// Custom result type for vault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Main error type for the vault core
#[derive(thiserror::Error, Debug)]
pub enum VaultError {
    /// Master key missing or too weak (fatal, at construction)
    #[error("Master key error: {message}")]
    MasterKey { message: String },

    /// Bad input or name collision (caller-correctable)
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// No secret with the requested name
    #[error("Secret '{name}' not found")]
    NotFound { name: String },

    /// Corrupt blob, wrong key, or cipher failure. Deliberately never
    /// decomposed further: error granularity would act as a decryption
    /// oracle.
    #[error("Encryption error: {message}")]
    Encryption { message: String },

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal errors that callers cannot act on
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl VaultError {
    /// Create a master key error
    pub fn master_key<S: Into<String>>(message: S) -> Self {
        Self::MasterKey { message: message.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(name: S) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create an encryption error
    pub fn encryption<S: Into<String>>(message: S) -> Self {
        Self::Encryption { message: message.into() }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Whether the error is expected control flow that a caller can correct
    pub fn is_caller_error(&self) -> bool {
        matches!(self, VaultError::Validation { .. } | VaultError::NotFound { .. })
    }

    /// Get the HTTP status code an API layer should return for this error
    pub fn status_code(&self) -> u16 {
        match self {
            VaultError::MasterKey { .. } => 500,
            VaultError::Validation { .. } => 400,
            VaultError::NotFound { .. } => 404,
            VaultError::Encryption { .. } => 500,
            VaultError::Database { .. } => 500,
            VaultError::Serialization { .. } => 500,
            VaultError::Config { .. } => 500,
            VaultError::Internal { .. } => 500,
        }
    }
}

// Error conversions for common external error types
impl From<sqlx::Error> for VaultError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<validator::ValidationErrors> for VaultError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}
