use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in secret-keeper.
#[derive(Debug, Error)]
pub enum SecretKeeperError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Single indistinguishable outcome for every decryption failure:
    /// wrong key, truncated blob, bad base64, or a failed auth tag.
    #[error("Invalid master key or corrupted data")]
    InvalidKey,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    #[error("Vault not initialized at {0} — run `secret-keeper init`")]
    VaultNotInitialized(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Vault is locked — no master key loaded")]
    VaultLocked,

    #[error("Secret '{0}' not found")]
    SecretNotFound(String),

    #[error("Invalid secret name '{0}' — must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidSecretName(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // --- Daemon errors ---
    #[error("Daemon not running — start it with `secret-keeper daemon start`")]
    DaemonNotRunning,

    #[error("Daemon protocol error: {0}")]
    Protocol(String),

    // --- Rotation errors ---
    #[error("Rotation failed: {0}")]
    RotationError(String),

    #[error("Unknown rotation provider '{0}'")]
    UnknownProvider(String),

    // --- Keyfile / keyring errors ---
    #[error("Keyfile error: {0}")]
    KeyfileError(String),

    #[error("Keyring error: {0}")]
    KeyringError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

/// Convenience type alias for secret-keeper results.
pub type Result<T> = std::result::Result<T, SecretKeeperError>;
