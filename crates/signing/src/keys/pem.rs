use std::path::Path;

use zeroize::Zeroizing;

use crate::der::TAG_SEQUENCE;
use crate::error::{Result, SigningError};

/// Key family announced by the PEM armor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLabel {
    /// `RSA PRIVATE KEY` (PKCS#1)
    Rsa,
    /// `EC PRIVATE KEY`
    Ec,
    /// `PRIVATE KEY`, `ENCRYPTED PRIVATE KEY` or bare DER
    Pkcs8,
}

impl KeyLabel {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "RSA PRIVATE KEY" => Some(Self::Rsa),
            "EC PRIVATE KEY" => Some(Self::Ec),
            "PRIVATE KEY" | "ENCRYPTED PRIVATE KEY" => Some(Self::Pkcs8),
            _ => None,
        }
    }
}

/// Legacy OpenSSL encryption headers, verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EncryptionHeaders {
    pub proc_type: String,
    pub dek_info: Option<String>,
}

/// A key file with its armor removed.
pub(crate) struct KeyDocument {
    pub label: KeyLabel,
    pub der: Zeroizing<Vec<u8>>,
    pub encryption: Option<EncryptionHeaders>,
}

/// Splits a key file into label, headers and DER body.
pub(crate) fn classify(path: &Path, contents: &[u8]) -> Result<KeyDocument> {
    let text = std::str::from_utf8(contents).ok().map(str::trim_start);
    if let Some(text) = text.filter(|text| text.starts_with("-----BEGIN ")) {
        let parsed = ::pem::parse(text).map_err(|e| SigningError::KeyParse {
            path: path.to_path_buf(),
            reason: format!("invalid PEM armor: {e}"),
        })?;
        let label = KeyLabel::from_tag(parsed.tag()).ok_or_else(|| {
            SigningError::UnsupportedKeyType {
                label: parsed.tag().to_string(),
            }
        })?;
        let encryption = parsed
            .headers()
            .get("Proc-Type")
            .map(|proc_type| EncryptionHeaders {
                proc_type: proc_type.trim().to_string(),
                dek_info: parsed.headers().get("DEK-Info").map(|v| v.trim().to_string()),
            });
        return Ok(KeyDocument {
            label,
            der: Zeroizing::new(parsed.into_contents()),
            encryption,
        });
    }

    if contents.first() == Some(&TAG_SEQUENCE) {
        return Ok(KeyDocument {
            label: KeyLabel::Pkcs8,
            der: Zeroizing::new(contents.to_vec()),
            encryption: None,
        });
    }

    Err(SigningError::UnsupportedKeyType {
        label: "unrecognized key encoding".to_string(),
    })
}
