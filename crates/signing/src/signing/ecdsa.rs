use k256::ecdsa::Error as EcdsaError;
use k256::ecdsa::signature::hazmat::PrehashSigner;

use super::signer::RequestSigner;
use crate::config::HashAlgorithm;
use crate::der;
use crate::error::{Result, SigningError};
use crate::keys::{EcCurve, EcKeyMaterial, KeyType};

enum SigningKey {
    P256(p256::ecdsa::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

/// ECDSA signer for P-256 and secp256k1.
///
/// The curve's fixed-width `r || s` output is re-encoded as a DER
/// `SEQUENCE { INTEGER r, INTEGER s }`. Nonces are derived per RFC 6979, so
/// signing is deterministic.
pub struct EcdsaSigner {
    signing_key: SigningKey,
}

impl EcdsaSigner {
    pub fn from_material(material: &EcKeyMaterial) -> Result<Self> {
        let invalid = |e: EcdsaError| SigningError::Signing(format!("invalid {} scalar: {e}", material.curve));
        let signing_key = match material.curve {
            EcCurve::P256 => SigningKey::P256(
                p256::ecdsa::SigningKey::from_slice(&material.scalar).map_err(invalid)?,
            ),
            EcCurve::Secp256k1 => SigningKey::Secp256k1(
                k256::ecdsa::SigningKey::from_slice(&material.scalar).map_err(invalid)?,
            ),
        };
        Ok(Self { signing_key })
    }

    pub fn curve(&self) -> EcCurve {
        match self.signing_key {
            SigningKey::P256(_) => EcCurve::P256,
            SigningKey::Secp256k1(_) => EcCurve::Secp256k1,
        }
    }

    /// Raw fixed-width `r || s`.
    fn sign_raw(&self, digest: &[u8]) -> std::result::Result<Vec<u8>, EcdsaError> {
        match &self.signing_key {
            SigningKey::P256(key) => {
                let signature: p256::ecdsa::Signature = key.sign_prehash(digest)?;
                Ok(signature.to_bytes().to_vec())
            }
            SigningKey::Secp256k1(key) => {
                let signature: k256::ecdsa::Signature = key.sign_prehash(digest)?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}

impl RequestSigner for EcdsaSigner {
    fn sign_digest(&self, digest: &[u8], _hash_algorithm: HashAlgorithm) -> Result<Vec<u8>> {
        let raw = self
            .sign_raw(digest)
            .map_err(|e| SigningError::Signing(format!("{} sign_prehash failed: {e}", self.algorithm())))?;
        der::encode_ecdsa_signature(&raw).map_err(|e| SigningError::Signing(e.to_string()))
    }

    fn key_type(&self) -> KeyType {
        KeyType::Ecdsa
    }

    fn algorithm(&self) -> &'static str {
        match self.curve() {
            EcCurve::P256 => "ECDSA P-256",
            EcCurve::Secp256k1 => "ECDSA secp256k1",
        }
    }
}
