use rand::rngs::OsRng;
use rsa::{Pkcs1v15Sign, Pss, RsaPrivateKey};
use sha2::{Sha256, Sha512};

use super::signer::RequestSigner;
use crate::config::{HashAlgorithm, SigningAlgorithm};
use crate::error::{Result, SigningError};
use crate::keys::{KeyType, RsaKeyMaterial};

/// RSA signer with PKCS#1 v1.5 or PSS padding.
///
/// PSS uses a salt as long as the digest and draws it from the OS RNG, so PSS
/// signatures differ between runs. PKCS#1 v1.5 output is deterministic.
pub struct RsaSigner {
    private_key: RsaPrivateKey,
    padding: SigningAlgorithm,
}

impl RsaSigner {
    pub fn new(private_key: RsaPrivateKey, padding: SigningAlgorithm) -> Self {
        Self {
            private_key,
            padding,
        }
    }

    pub fn from_material(material: &RsaKeyMaterial, padding: SigningAlgorithm) -> Result<Self> {
        let private_key = material
            .to_private_key()
            .map_err(|e| SigningError::Signing(format!("unusable RSA key: {e}")))?;
        Ok(Self::new(private_key, padding))
    }
}

impl RequestSigner for RsaSigner {
    fn sign_digest(&self, digest: &[u8], hash_algorithm: HashAlgorithm) -> Result<Vec<u8>> {
        let key = &self.private_key;
        let signature = match (self.padding, hash_algorithm) {
            (SigningAlgorithm::Pkcs1v15, HashAlgorithm::Sha256) => {
                key.sign(Pkcs1v15Sign::new::<Sha256>(), digest)
            }
            (SigningAlgorithm::Pkcs1v15, HashAlgorithm::Sha512) => {
                key.sign(Pkcs1v15Sign::new::<Sha512>(), digest)
            }
            (SigningAlgorithm::RsassaPss, HashAlgorithm::Sha256) => {
                key.sign_with_rng(&mut OsRng, Pss::new::<Sha256>(), digest)
            }
            (SigningAlgorithm::RsassaPss, HashAlgorithm::Sha512) => {
                key.sign_with_rng(&mut OsRng, Pss::new::<Sha512>(), digest)
            }
        };
        signature.map_err(|e| SigningError::Signing(format!("{} signing failed: {e}", self.algorithm())))
    }

    fn key_type(&self) -> KeyType {
        KeyType::Rsa
    }

    fn algorithm(&self) -> &'static str {
        match self.padding {
            SigningAlgorithm::Pkcs1v15 => "RSASSA-PKCS1-v1_5",
            SigningAlgorithm::RsassaPss => "RSASSA-PSS",
        }
    }
}
