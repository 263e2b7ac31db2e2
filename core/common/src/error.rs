//! Common error types for the JamTalk vault.

use thiserror::Error;

/// Top-level error type for storage and vault operations.
///
/// Messages never carry key bytes, passwords, salts or plaintext.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying database cannot be opened or has been closed.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A single database operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Ciphertext tag verification failed (wrong key, corruption or tampering).
    #[error("Authentication failure: ciphertext did not verify")]
    AuthenticationFailure,

    /// An encrypted record was read while no master key is held.
    #[error("Vault is locked")]
    VaultLocked,

    /// Persisted hex text could not be decoded.
    #[error("Malformed hex: {0}")]
    MalformedHex(String),

    /// A record tagged as encrypted is missing or has invalid envelope fields.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Cryptographic operation failed for a reason other than authentication.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl Error {
    /// Whether this failure concerns a single persisted record.
    ///
    /// Record-level failures are converted to "absent" at the storage facade;
    /// everything else propagates to the caller.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            Error::AuthenticationFailure
                | Error::VaultLocked
                | Error::MalformedHex(_)
                | Error::MalformedEnvelope(_)
                | Error::Serialization(_)
        )
    }

    /// Short name of the failure, safe to log.
    ///
    /// Payloads of record-level errors may quote stored data, so log lines
    /// about individual records use this instead of `Display`.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::StoreUnavailable(_) => "store unavailable",
            Error::Storage(_) => "storage",
            Error::AuthenticationFailure => "authentication failure",
            Error::VaultLocked => "vault locked",
            Error::MalformedHex(_) => "malformed hex",
            Error::MalformedEnvelope(_) => "malformed envelope",
            Error::Crypto(_) => "crypto",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::InvalidInput(_) => "invalid input",
            Error::NotFound(_) => "not found",
            Error::AlreadyExists(_) => "already exists",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
