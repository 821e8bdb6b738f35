mod ecdsa;
mod rsa;
mod signer;

use base64::{Engine, prelude::BASE64_STANDARD};
use tracing::debug;

use crate::config::{HashAlgorithm, SigningAlgorithm};
use crate::error::Result;
use crate::keys::PrivateKeyMaterial;

pub use ecdsa::EcdsaSigner;
pub use self::rsa::RsaSigner;
pub use signer::RequestSigner;

/// Picks the signer for the loaded key type. `padding` only applies to RSA.
pub fn signer_for(
    material: &PrivateKeyMaterial,
    padding: SigningAlgorithm,
) -> Result<Box<dyn RequestSigner>> {
    Ok(match material {
        PrivateKeyMaterial::Rsa(key) => Box::new(RsaSigner::from_material(key, padding)?),
        PrivateKeyMaterial::Ecdsa(key) => Box::new(EcdsaSigner::from_material(key)?),
    })
}

/// Hashes `signing_string` and returns the base64 signature over the hash.
pub fn sign_canonical(
    signer: &dyn RequestSigner,
    signing_string: &str,
    hash_algorithm: HashAlgorithm,
) -> Result<String> {
    let digest = hash_algorithm.digest(signing_string.as_bytes());
    let signature = signer.sign_digest(&digest, hash_algorithm)?;
    debug!(
        algorithm = signer.algorithm(),
        key_type = %signer.key_type(),
        hash = %hash_algorithm,
        "Signed canonical string"
    );
    Ok(BASE64_STANDARD.encode(signature))
}
