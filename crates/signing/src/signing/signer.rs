use crate::config::HashAlgorithm;
use crate::error::Result;
use crate::keys::KeyType;

/// Signs the hash of a canonical signing string.
///
/// Implementations are sync; signing is CPU-bound.
pub trait RequestSigner: Send + Sync {
    /// Sign a digest produced with `hash_algorithm`. Returns the signature
    /// bytes exactly as they are base64 encoded into the header.
    fn sign_digest(&self, digest: &[u8], hash_algorithm: HashAlgorithm) -> Result<Vec<u8>>;

    fn key_type(&self) -> KeyType;

    /// Scheme name for diagnostics (e.g. "RSASSA-PSS", "ECDSA P-256").
    fn algorithm(&self) -> &'static str;
}
