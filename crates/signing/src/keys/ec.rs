use std::fmt;
use std::path::Path;

use ::pkcs8::{EncryptedPrivateKeyInfo, ObjectIdentifier, PrivateKeyInfo};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::pem::KeyDocument;
use super::pkcs8;
use super::{PrivateKeyMaterial, legacy};
use crate::config::Passphrase;
use crate::der::{DerError, DerReader, TAG_INTEGER};
use crate::error::{Result, SigningError};

const TAG_OCTET_STRING: u8 = 0x04;
const TAG_OBJECT_IDENTIFIER: u8 = 0x06;
const TAG_EC_PARAMETERS: u8 = 0xa0;

const PRIME256V1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP256K1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.10");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    Secp256k1,
}

impl EcCurve {
    pub fn name(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::Secp256k1 => "secp256k1",
        }
    }

    /// Scalar and coordinate width in bytes.
    pub fn field_size(self) -> usize {
        32
    }

    pub(crate) fn from_oid(oid: ObjectIdentifier) -> Option<Self> {
        if oid == PRIME256V1 {
            Some(Self::P256)
        } else if oid == SECP256K1 {
            Some(Self::Secp256k1)
        } else {
            None
        }
    }
}

impl fmt::Display for EcCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An EC private scalar, big-endian and `field_size` bytes wide.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EcKeyMaterial {
    #[zeroize(skip)]
    pub curve: EcCurve,
    pub scalar: Vec<u8>,
}

impl fmt::Debug for EcKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcKeyMaterial")
            .field("curve", &self.curve.name())
            .finish_non_exhaustive()
    }
}

/// Decodes an `EC PRIVATE KEY` document. A body under legacy `Proc-Type`
/// headers is decrypted and read as SEC1. Otherwise PKCS#8 is tried first,
/// then encrypted PKCS#8, then SEC1.
pub(crate) fn load(
    path: &Path,
    document: KeyDocument,
    passphrase: Option<&Passphrase>,
) -> Result<EcKeyMaterial> {
    match &document.encryption {
        None => load_unencrypted(path, &document.der, passphrase),
        Some(headers) => {
            let passphrase = passphrase.ok_or_else(|| {
                SigningError::key_decryption(path, "key is encrypted but no passphrase was configured")
            })?;
            let plaintext = legacy::decrypt(path, headers, &document.der, passphrase.expose())?;
            let curve = match sec1_curve(&plaintext) {
                Ok(Some(curve)) => curve,
                Err(e @ DerError::Unsupported(_)) => return Err(SigningError::key_parse(path, e)),
                _ => {
                    return Err(SigningError::key_decryption(
                        path,
                        "decrypted key is not SEC1, wrong passphrase?",
                    ));
                }
            };
            from_sec1_der(path, curve, &plaintext)
        }
    }
}

fn load_unencrypted(
    path: &Path,
    der: &[u8],
    passphrase: Option<&Passphrase>,
) -> Result<EcKeyMaterial> {
    if let Ok(info) = PrivateKeyInfo::try_from(der) {
        return expect_ec(path, pkcs8::from_private_key_info(path, &info)?);
    }

    if let Some(passphrase) = passphrase {
        if let Ok(encrypted) = EncryptedPrivateKeyInfo::try_from(der) {
            let document = pkcs8::decrypt(path, &encrypted, Some(passphrase))?;
            let info = pkcs8::decrypted_info(path, &document)?;
            return expect_ec(path, pkcs8::from_private_key_info(path, &info)?);
        }
    }

    let curve = sec1_curve(der)
        .map_err(|e| SigningError::key_parse(path, e))?
        .ok_or_else(|| SigningError::KeyParse {
            path: path.to_path_buf(),
            reason: "SEC1 key does not name its curve".to_string(),
        })?;
    from_sec1_der(path, curve, der)
}

fn expect_ec(path: &Path, material: PrivateKeyMaterial) -> Result<EcKeyMaterial> {
    match material {
        PrivateKeyMaterial::Ecdsa(key) => Ok(key),
        PrivateKeyMaterial::Rsa(_) => Err(SigningError::KeyParse {
            path: path.to_path_buf(),
            reason: "EC PRIVATE KEY armor holds an RSA key".to_string(),
        }),
    }
}

/// Reads the named curve from
/// `ECPrivateKey ::= SEQUENCE { version, privateKey, [0] parameters OPTIONAL, ... }`.
fn sec1_curve(der: &[u8]) -> Result<Option<EcCurve>, DerError> {
    let mut outer = DerReader::new(der);
    let mut sequence = outer.read_sequence()?;
    outer.finish("ECPrivateKey")?;

    sequence.read_element(TAG_INTEGER)?;
    sequence.read_element(TAG_OCTET_STRING)?;
    if sequence.peek_tag() != Some(TAG_EC_PARAMETERS) {
        return Ok(None);
    }

    let mut parameters = DerReader::new(sequence.read_element(TAG_EC_PARAMETERS)?);
    let oid = parameters.read_element(TAG_OBJECT_IDENTIFIER)?;
    let oid = ObjectIdentifier::from_bytes(oid).map_err(|_| DerError::Unsupported("curve OID"))?;
    EcCurve::from_oid(oid)
        .map(Some)
        .ok_or(DerError::Unsupported("elliptic curve"))
}

/// Decodes a SEC1 `ECPrivateKey` for a known curve. The embedded public key,
/// when present, must match the scalar.
pub(crate) fn from_sec1_der(path: &Path, curve: EcCurve, der: &[u8]) -> Result<EcKeyMaterial> {
    let scalar = match curve {
        EcCurve::P256 => p256::SecretKey::from_sec1_der(der).map(|key| key.to_bytes().to_vec()),
        EcCurve::Secp256k1 => {
            k256::SecretKey::from_sec1_der(der).map(|key| key.to_bytes().to_vec())
        }
    }
    .map_err(|e| SigningError::KeyParse {
        path: path.to_path_buf(),
        reason: format!("invalid {curve} private key: {e}"),
    })?;

    Ok(EcKeyMaterial { curve, scalar })
}
