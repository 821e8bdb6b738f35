use std::fmt;
use std::path::Path;

use ::rsa::{BigUint, RsaPrivateKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::legacy;
use super::pem::KeyDocument;
use crate::config::Passphrase;
use crate::der::{DerError, DerReader};
use crate::error::{Result, SigningError};

/// PKCS#1 `RSAPrivateKey` parameters as unsigned big-endian magnitudes.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RsaKeyMaterial {
    pub modulus: Vec<u8>,
    pub public_exponent: Vec<u8>,
    pub private_exponent: Vec<u8>,
    pub prime1: Vec<u8>,
    pub prime2: Vec<u8>,
    pub exponent1: Vec<u8>,
    pub exponent2: Vec<u8>,
    pub coefficient: Vec<u8>,
}

impl RsaKeyMaterial {
    /// Parses `SEQUENCE { version, n, e, d, p, q, dp, dq, qinv }`.
    /// Only two-prime keys (version 0) are accepted.
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self, DerError> {
        let mut outer = DerReader::new(der);
        let mut sequence = outer.read_sequence()?;
        outer.finish("RSAPrivateKey")?;

        if !sequence.read_unsigned_integer()?.is_empty() {
            return Err(DerError::Unsupported("multi-prime RSA key version"));
        }

        let mut next = || sequence.read_unsigned_integer().map(<[u8]>::to_vec);
        let material = Self {
            modulus: next()?,
            public_exponent: next()?,
            private_exponent: next()?,
            prime1: next()?,
            prime2: next()?,
            exponent1: next()?,
            exponent2: next()?,
            coefficient: next()?,
        };
        sequence.finish("RSAPrivateKey fields")?;
        Ok(material)
    }

    pub fn modulus_bits(&self) -> usize {
        match self.modulus.first() {
            Some(first) => self.modulus.len() * 8 - first.leading_zeros() as usize,
            None => 0,
        }
    }

    /// Builds the signing key. The CRT values are recomputed from the primes.
    pub fn to_private_key(&self) -> Result<RsaPrivateKey, ::rsa::Error> {
        let key = RsaPrivateKey::from_components(
            BigUint::from_bytes_be(&self.modulus),
            BigUint::from_bytes_be(&self.public_exponent),
            BigUint::from_bytes_be(&self.private_exponent),
            vec![
                BigUint::from_bytes_be(&self.prime1),
                BigUint::from_bytes_be(&self.prime2),
            ],
        )?;
        key.validate()?;
        Ok(key)
    }
}

impl fmt::Debug for RsaKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeyMaterial")
            .field("modulus_bits", &self.modulus_bits())
            .finish_non_exhaustive()
    }
}

/// Decodes an `RSA PRIVATE KEY` document, decrypting it first when it carries
/// legacy encryption headers.
pub(crate) fn load(
    path: &Path,
    document: KeyDocument,
    passphrase: Option<&Passphrase>,
) -> Result<RsaKeyMaterial> {
    let material = match &document.encryption {
        None => RsaKeyMaterial::from_pkcs1_der(&document.der)
            .map_err(|e| SigningError::key_parse(path, e))?,
        Some(headers) => {
            let passphrase = passphrase.ok_or_else(|| {
                SigningError::key_decryption(path, "key is encrypted but no passphrase was configured")
            })?;
            let plaintext = legacy::decrypt(path, headers, &document.der, passphrase.expose())?;
            RsaKeyMaterial::from_pkcs1_der(&plaintext).map_err(|e| {
                SigningError::key_decryption(
                    path,
                    format!("decrypted key is not PKCS#1 ({e}), wrong passphrase?"),
                )
            })?
        }
    };

    validate(path, &material)?;
    Ok(material)
}

/// Rejects parameter sets that do not form a usable key.
pub(crate) fn validate(path: &Path, material: &RsaKeyMaterial) -> Result<()> {
    material
        .to_private_key()
        .map(drop)
        .map_err(|e| SigningError::KeyParse {
            path: path.to_path_buf(),
            reason: format!("inconsistent RSA parameters: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::rsa::pkcs1::DecodeRsaPrivateKey;
    use ::rsa::traits::{PrivateKeyParts, PublicKeyParts};
    use std::path::PathBuf;

    use crate::keys::pem::classify;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
    }

    fn document(name: &str) -> KeyDocument {
        let path = fixture(name);
        let contents = std::fs::read(&path).unwrap();
        classify(&path, &contents).unwrap()
    }

    #[test]
    fn parses_plaintext_pkcs1() {
        let material = load(&fixture("rsa.private.pem"), document("rsa.private.pem"), None).unwrap();
        assert_eq!(material.modulus_bits(), 2048);
        assert_eq!(material.public_exponent, vec![0x01, 0x00, 0x01]);
    }

    #[test]
    fn matches_reference_decoder() {
        let pem = std::fs::read_to_string(fixture("rsa.private.pem")).unwrap();
        let reference = ::rsa::RsaPrivateKey::from_pkcs1_pem(&pem).unwrap();

        let material = load(&fixture("rsa.private.pem"), document("rsa.private.pem"), None).unwrap();
        let key = material.to_private_key().unwrap();

        assert_eq!(key.n(), reference.n());
        assert_eq!(key.e(), reference.e());
        assert_eq!(key.d(), reference.d());
        assert_eq!(key.primes(), reference.primes());
    }

    #[test]
    fn leading_sign_bytes_are_stripped() {
        let material = load(&fixture("rsa.private.pem"), document("rsa.private.pem"), None).unwrap();
        for field in [&material.modulus, &material.prime1, &material.prime2] {
            assert_ne!(field[0], 0);
        }
        assert_eq!(material.modulus.len(), 256);
    }

    #[test]
    fn encrypted_key_matches_plaintext() {
        let plain = load(&fixture("rsa.private.pem"), document("rsa.private.pem"), None).unwrap();
        let passphrase = Passphrase::new("test-passphrase");
        let decrypted = load(
            &fixture("rsa.encrypted.pem"),
            document("rsa.encrypted.pem"),
            Some(&passphrase),
        )
        .unwrap();
        assert_eq!(decrypted.modulus, plain.modulus);
        assert_eq!(decrypted.public_exponent, plain.public_exponent);
        assert!(decrypted == plain);
    }

    #[test]
    fn wrong_passphrase_is_a_decryption_error() {
        let passphrase = Passphrase::new("not-the-passphrase");
        let err = load(
            &fixture("rsa.encrypted.pem"),
            document("rsa.encrypted.pem"),
            Some(&passphrase),
        )
        .unwrap_err();
        assert!(matches!(err, SigningError::KeyDecryption { .. }), "{err:?}");
        assert!(!err.to_string().contains("not-the-passphrase"));
    }

    #[test]
    fn encrypted_key_without_passphrase_fails() {
        let err = load(&fixture("rsa.encrypted.pem"), document("rsa.encrypted.pem"), None)
            .unwrap_err();
        assert!(matches!(err, SigningError::KeyDecryption { .. }));
    }

    #[test]
    fn truncated_der_is_a_parse_error() {
        let mut document = document("rsa.private.pem");
        let len = document.der.len();
        document.der.truncate(len / 2);
        let err = load(Path::new("rsa.private.pem"), document, None).unwrap_err();
        assert!(matches!(err, SigningError::KeyParse { .. }));
    }

    #[test]
    fn wrong_field_tag_is_a_parse_error() {
        // SEQUENCE { INTEGER 0, OCTET STRING }
        let err = RsaKeyMaterial::from_pkcs1_der(&[0x30, 0x05, 0x02, 0x01, 0x00, 0x04, 0x00])
            .unwrap_err();
        assert!(matches!(err, DerError::UnexpectedTag { found: 0x04, .. }));
    }

    #[test]
    fn multi_prime_version_is_rejected() {
        let err = RsaKeyMaterial::from_pkcs1_der(&[0x30, 0x03, 0x02, 0x01, 0x01]).unwrap_err();
        assert!(matches!(err, DerError::Unsupported(_)));
    }
}
