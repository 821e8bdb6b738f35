use std::path::PathBuf;

use crate::der::DerError;

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("Invalid signing configuration: {0}")]
    Configuration(String),
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Key file does not exist: {}", path.display())]
    KeyFileNotFound { path: PathBuf },
    #[error("Failed to read key file {}: {source}", path.display())]
    KeyFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unsupported private key type: {label}")]
    UnsupportedKeyType { label: String },
    #[error("Failed to decrypt private key {}: {reason}", path.display())]
    KeyDecryption { path: PathBuf, reason: String },
    #[error("Malformed private key {}: {reason}", path.display())]
    KeyParse { path: PathBuf, reason: String },
    #[error("Cannot sign HTTP request. Request does not contain the {header} header.")]
    HeaderNotFound { header: String },
    #[error("Invalid request URI {uri}: {reason}")]
    InvalidRequestUri { uri: String, reason: String },
    #[error("Signature operation failed: {0}")]
    Signing(String),
}

impl SigningError {
    pub(crate) fn key_parse(path: impl Into<PathBuf>, error: DerError) -> Self {
        Self::KeyParse {
            path: path.into(),
            reason: error.to_string(),
        }
    }

    pub(crate) fn key_decryption(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::KeyDecryption {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = SigningError> = std::result::Result<T, E>;
