use base64::{Engine, prelude::BASE64_STANDARD};

use crate::config::HashAlgorithm;

/// Computes the `Digest` header value for a request body, e.g.
/// `SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=`.
///
/// An absent body is digested as the empty byte string.
pub fn body_digest(body: Option<&str>, hash_algorithm: HashAlgorithm) -> String {
    let bytes = body.unwrap_or_default().as_bytes();
    let hash = hash_algorithm.digest(bytes);
    format!("{}={}", hash_algorithm.label(), BASE64_STANDARD.encode(hash))
}
