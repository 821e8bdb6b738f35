use std::path::Path;

use ::pkcs8::{EncryptedPrivateKeyInfo, ObjectIdentifier, PrivateKeyInfo, SecretDocument};

use super::ec::{self, EcCurve};
use super::rsa::{self, RsaKeyMaterial};
use super::PrivateKeyMaterial;
use crate::config::Passphrase;
use crate::error::{Result, SigningError};

pub(crate) const RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
pub(crate) const ID_EC_PUBLIC_KEY: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// Decodes a `PrivateKeyInfo` or `EncryptedPrivateKeyInfo` document.
pub(crate) fn load(
    path: &Path,
    der: &[u8],
    passphrase: Option<&Passphrase>,
) -> Result<PrivateKeyMaterial> {
    if let Ok(info) = PrivateKeyInfo::try_from(der) {
        return from_private_key_info(path, &info);
    }

    let encrypted = EncryptedPrivateKeyInfo::try_from(der).map_err(|e| SigningError::KeyParse {
        path: path.to_path_buf(),
        reason: format!("not a PKCS#8 document: {e}"),
    })?;
    let document = decrypt(path, &encrypted, passphrase)?;
    let info = decrypted_info(path, &document)?;
    from_private_key_info(path, &info)
}

pub(crate) fn decrypt(
    path: &Path,
    encrypted: &EncryptedPrivateKeyInfo<'_>,
    passphrase: Option<&Passphrase>,
) -> Result<SecretDocument> {
    let passphrase = passphrase.ok_or_else(|| {
        SigningError::key_decryption(path, "key is encrypted but no passphrase was configured")
    })?;
    encrypted
        .decrypt(passphrase.expose())
        .map_err(|e| SigningError::key_decryption(path, format!("{e}, wrong passphrase?")))
}

pub(crate) fn decrypted_info<'a>(
    path: &Path,
    document: &'a SecretDocument,
) -> Result<PrivateKeyInfo<'a>> {
    PrivateKeyInfo::try_from(document.as_bytes()).map_err(|e| {
        SigningError::key_decryption(path, format!("decrypted key is not PKCS#8 ({e})"))
    })
}

/// Selects the key family from the algorithm OID.
pub(crate) fn from_private_key_info(
    path: &Path,
    info: &PrivateKeyInfo<'_>,
) -> Result<PrivateKeyMaterial> {
    let oid = info.algorithm.oid;
    if oid == RSA_ENCRYPTION {
        let material = RsaKeyMaterial::from_pkcs1_der(info.private_key)
            .map_err(|e| SigningError::key_parse(path, e))?;
        rsa::validate(path, &material)?;
        return Ok(PrivateKeyMaterial::Rsa(material));
    }
    if oid != ID_EC_PUBLIC_KEY {
        return Err(SigningError::UnsupportedKeyType {
            label: format!("PKCS#8 algorithm {oid}"),
        });
    }

    let curve_oid = info
        .algorithm
        .parameters_oid()
        .map_err(|e| SigningError::KeyParse {
            path: path.to_path_buf(),
            reason: format!("missing EC curve parameters: {e}"),
        })?;
    let curve = EcCurve::from_oid(curve_oid).ok_or_else(|| SigningError::UnsupportedKeyType {
        label: format!("EC curve {curve_oid}"),
    })?;
    ec::from_sec1_der(path, curve, info.private_key).map(PrivateKeyMaterial::Ecdsa)
}
