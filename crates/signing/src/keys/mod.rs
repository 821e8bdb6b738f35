//! Private key loading.
//!
//! Supported inputs:
//!
//! - `RSA PRIVATE KEY`: PKCS#1, plaintext or legacy OpenSSL encrypted
//!   (`Proc-Type: 4,ENCRYPTED` / `DEK-Info: DES-EDE3-CBC,...`)
//! - `EC PRIVATE KEY`: PKCS#8 (optionally encrypted) or SEC1
//! - `PRIVATE KEY` / `ENCRYPTED PRIVATE KEY`: PKCS#8 holding an RSA or EC key
//! - unarmored PKCS#8 DER
//!
//! Decoded key material is zeroed when dropped.

mod cache;
mod ec;
mod legacy;
mod pem;
mod pkcs8;
mod rsa;

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;
use zeroize::Zeroizing;

use crate::config::Passphrase;
use crate::error::{Result, SigningError};

pub use cache::KeyCache;
pub use ec::{EcCurve, EcKeyMaterial};
pub use legacy::derive_key;
pub use self::pem::KeyLabel;
pub use self::rsa::RsaKeyMaterial;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Rsa,
    Ecdsa,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa => f.write_str("RSA"),
            Self::Ecdsa => f.write_str("ECDSA"),
        }
    }
}

/// Decoded private key parameters.
#[derive(Clone)]
pub enum PrivateKeyMaterial {
    Rsa(RsaKeyMaterial),
    Ecdsa(EcKeyMaterial),
}

impl PrivateKeyMaterial {
    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Rsa(_) => KeyType::Rsa,
            Self::Ecdsa(_) => KeyType::Ecdsa,
        }
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa(key) => f.debug_tuple("Rsa").field(key).finish(),
            Self::Ecdsa(key) => f.debug_tuple("Ecdsa").field(key).finish(),
        }
    }
}

fn read_key_file(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(contents) => Ok(Zeroizing::new(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(SigningError::KeyFileNotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(SigningError::KeyFileRead {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Reads and decodes the private key at `path`.
pub fn load_private_key(path: &Path, passphrase: Option<&Passphrase>) -> Result<PrivateKeyMaterial> {
    let contents = read_key_file(path)?;
    let document = pem::classify(path, &contents)?;
    let label = document.label;

    let material = match label {
        KeyLabel::Rsa => PrivateKeyMaterial::Rsa(rsa::load(path, document, passphrase)?),
        KeyLabel::Ec => PrivateKeyMaterial::Ecdsa(ec::load(path, document, passphrase)?),
        KeyLabel::Pkcs8 => pkcs8::load(path, &document.der, passphrase)?,
    };

    debug!(
        key_file = %path.display(),
        ?label,
        key_type = %material.key_type(),
        "Loaded private key"
    );
    Ok(material)
}
