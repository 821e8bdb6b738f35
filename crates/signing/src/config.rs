use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use sha2::{Digest, Sha256, Sha512};
use tracing::warn;
use zeroize::Zeroizing;

use crate::error::{Result, SigningError};

pub const HEADER_REQUEST_TARGET: &str = "(request-target)";
pub const HEADER_CREATED: &str = "(created)";
pub const HEADER_EXPIRES: &str = "(expires)";
pub const HEADER_DATE: &str = "Date";
pub const HEADER_HOST: &str = "Host";
pub const HEADER_DIGEST: &str = "Digest";
pub const HEADER_AUTHORIZATION: &str = "Authorization";

/// Digest used both for the `Digest` header and for hashing the signing string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Label used as the `Digest` header prefix.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SHA256" | "SHA-256" => Ok(Self::Sha256),
            "SHA512" | "SHA-512" => Ok(Self::Sha512),
            _ => Err(SigningError::UnsupportedAlgorithm(format!(
                "{s} not supported as hash algorithm"
            ))),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// RSA padding scheme. ECDSA keys ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SigningAlgorithm {
    #[default]
    Pkcs1v15,
    RsassaPss,
}

impl FromStr for SigningAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PKCS1-v15" | "PKCS1v15" => Ok(Self::Pkcs1v15),
            "RSASSA-PSS" | "PSS" => Ok(Self::RsassaPss),
            _ => Err(SigningError::UnsupportedAlgorithm(format!(
                "{s} not supported as signing algorithm"
            ))),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pkcs1v15 => f.write_str("PKCS1-v15"),
            Self::RsassaPss => f.write_str("RSASSA-PSS"),
        }
    }
}

/// Key passphrase. The buffer is wiped when dropped and never printed.
#[derive(Clone)]
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self(Zeroizing::new(passphrase.into()))
    }

    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// SHA-256 of the passphrase, hex encoded. Used as a cache key component.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.expose()))
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(***)")
    }
}

impl<'de> Deserialize<'de> for Passphrase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

impl From<&str> for Passphrase {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Passphrase {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// One entry of the signed header list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningHeader {
    RequestTarget,
    Created,
    Expires,
    Date,
    Host,
    Digest,
    /// A header looked up in the request's header parameters.
    Request(String),
}

impl SigningHeader {
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if name == HEADER_REQUEST_TARGET {
            Self::RequestTarget
        } else if name == HEADER_CREATED {
            Self::Created
        } else if name == HEADER_EXPIRES {
            Self::Expires
        } else if name.eq_ignore_ascii_case(HEADER_DATE) {
            Self::Date
        } else if name.eq_ignore_ascii_case(HEADER_HOST) {
            Self::Host
        } else if name.eq_ignore_ascii_case(HEADER_DIGEST) {
            Self::Digest
        } else {
            Self::Request(name.to_string())
        }
    }

    /// Lowercase name as it appears in the signing string and `headers="..."`.
    pub fn canonical_name(&self) -> String {
        match self {
            Self::RequestTarget => HEADER_REQUEST_TARGET.to_string(),
            Self::Created => HEADER_CREATED.to_string(),
            Self::Expires => HEADER_EXPIRES.to_string(),
            Self::Date => HEADER_DATE.to_ascii_lowercase(),
            Self::Host => HEADER_HOST.to_ascii_lowercase(),
            Self::Digest => HEADER_DIGEST.to_ascii_lowercase(),
            Self::Request(name) => name.to_ascii_lowercase(),
        }
    }
}

/// Immutable HTTP signing configuration, validated once by
/// [`SigningConfigurationBuilder::build`].
#[derive(Debug, Clone)]
pub struct SigningConfiguration {
    key_id: String,
    key_file_path: PathBuf,
    passphrase: Option<Passphrase>,
    signing_headers: Vec<SigningHeader>,
    hash_algorithm: HashAlgorithm,
    signing_algorithm: SigningAlgorithm,
    validity_period_seconds: u64,
}

impl SigningConfiguration {
    pub fn builder(
        key_id: impl Into<String>,
        key_file_path: impl Into<PathBuf>,
    ) -> SigningConfigurationBuilder {
        SigningConfigurationBuilder {
            key_id: key_id.into(),
            key_file_path: key_file_path.into(),
            passphrase: None,
            signing_headers: Vec::new(),
            hash_algorithm: HashAlgorithm::default(),
            signing_algorithm: SigningAlgorithm::default(),
            validity_period_seconds: 0,
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn key_file_path(&self) -> &Path {
        &self.key_file_path
    }

    pub fn passphrase(&self) -> Option<&Passphrase> {
        self.passphrase.as_ref()
    }

    pub fn signing_headers(&self) -> &[SigningHeader] {
        &self.signing_headers
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn signing_algorithm(&self) -> SigningAlgorithm {
        self.signing_algorithm
    }

    pub fn validity_period_seconds(&self) -> u64 {
        self.validity_period_seconds
    }
}

#[derive(Debug, Clone)]
pub struct SigningConfigurationBuilder {
    key_id: String,
    key_file_path: PathBuf,
    passphrase: Option<Passphrase>,
    signing_headers: Vec<String>,
    hash_algorithm: HashAlgorithm,
    signing_algorithm: SigningAlgorithm,
    validity_period_seconds: u64,
}

impl SigningConfigurationBuilder {
    pub fn passphrase(mut self, passphrase: impl Into<Passphrase>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    pub fn signing_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signing_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn hash_algorithm(mut self, hash_algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = hash_algorithm;
        self
    }

    pub fn signing_algorithm(mut self, signing_algorithm: SigningAlgorithm) -> Self {
        self.signing_algorithm = signing_algorithm;
        self
    }

    pub fn validity_period_seconds(mut self, seconds: u64) -> Self {
        self.validity_period_seconds = seconds;
        self
    }

    pub fn build(self) -> Result<SigningConfiguration> {
        if self.key_id.trim().is_empty() {
            return Err(SigningError::Configuration("keyId must not be empty".into()));
        }

        let names = if self.signing_headers.is_empty() {
            vec![HEADER_CREATED.to_string()]
        } else {
            self.signing_headers
        };

        let mut signing_headers: Vec<SigningHeader> = Vec::with_capacity(names.len());
        for name in &names {
            if name.trim().is_empty() {
                return Err(SigningError::Configuration(
                    "signing header names must not be blank".into(),
                ));
            }
            let header = SigningHeader::parse(name);
            let canonical = header.canonical_name();
            if signing_headers
                .iter()
                .any(|existing| existing.canonical_name() == canonical)
            {
                return Err(SigningError::Configuration(format!(
                    "signing header {name} is listed more than once"
                )));
            }
            signing_headers.push(header);
        }

        if self.validity_period_seconds == 0 && signing_headers.contains(&SigningHeader::Expires) {
            warn!("(expires) is signed with a zero validity period; signatures expire immediately");
        }

        Ok(SigningConfiguration {
            key_id: self.key_id,
            key_file_path: self.key_file_path,
            passphrase: self.passphrase,
            signing_headers,
            hash_algorithm: self.hash_algorithm,
            signing_algorithm: self.signing_algorithm,
            validity_period_seconds: self.validity_period_seconds,
        })
    }
}

/// Deserializable form of [`SigningConfiguration`] for external config loaders.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningSettings {
    pub key_id: String,
    pub key_file_path: PathBuf,
    #[serde(default)]
    pub key_passphrase: Option<Passphrase>,
    #[serde(default)]
    pub signing_headers: Vec<String>,
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: String,
    #[serde(default = "default_signing_algorithm")]
    pub signing_algorithm: String,
    #[serde(default)]
    pub validity_period_seconds: u64,
}

fn default_hash_algorithm() -> String {
    "SHA256".to_string()
}

fn default_signing_algorithm() -> String {
    "PKCS1-v15".to_string()
}

impl TryFrom<SigningSettings> for SigningConfiguration {
    type Error = SigningError;

    fn try_from(settings: SigningSettings) -> Result<Self> {
        let mut builder = SigningConfiguration::builder(settings.key_id, settings.key_file_path)
            .signing_headers(settings.signing_headers)
            .hash_algorithm(settings.hash_algorithm.parse()?)
            .signing_algorithm(settings.signing_algorithm.parse()?)
            .validity_period_seconds(settings.validity_period_seconds);
        if let Some(passphrase) = settings.key_passphrase {
            builder = builder.passphrase(passphrase);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_signing_headers_default_to_created() {
        let config = SigningConfiguration::builder("key", "key.pem").build().unwrap();
        assert_eq!(config.signing_headers(), &[SigningHeader::Created]);
    }

    #[test]
    fn builder_defaults() {
        let config = SigningConfiguration::builder("key", "key.pem").build().unwrap();
        assert_eq!(config.hash_algorithm(), HashAlgorithm::Sha256);
        assert_eq!(config.signing_algorithm(), SigningAlgorithm::Pkcs1v15);
        assert_eq!(config.validity_period_seconds(), 0);
        assert!(config.passphrase().is_none());
    }

    #[test]
    fn signing_header_order_is_preserved() {
        let config = SigningConfiguration::builder("key", "key.pem")
            .signing_headers(["(request-target)", "Host", "(created)", "X-Custom"])
            .build()
            .unwrap();
        assert_eq!(
            config.signing_headers(),
            &[
                SigningHeader::RequestTarget,
                SigningHeader::Host,
                SigningHeader::Created,
                SigningHeader::Request("X-Custom".into()),
            ]
        );
    }

    #[test]
    fn literal_headers_match_case_insensitively() {
        assert_eq!(SigningHeader::parse("digest"), SigningHeader::Digest);
        assert_eq!(SigningHeader::parse("DATE"), SigningHeader::Date);
        assert_eq!(SigningHeader::parse("host"), SigningHeader::Host);
        assert_eq!(
            SigningHeader::parse("(Created)"),
            SigningHeader::Request("(Created)".into())
        );
    }

    #[test]
    fn duplicate_signing_headers_are_rejected() {
        let err = SigningConfiguration::builder("key", "key.pem")
            .signing_headers(["Digest", "digest"])
            .build()
            .unwrap_err();
        assert!(matches!(err, SigningError::Configuration(_)));
    }

    #[test]
    fn empty_key_id_is_rejected() {
        let err = SigningConfiguration::builder("  ", "key.pem").build().unwrap_err();
        assert!(matches!(err, SigningError::Configuration(_)));
    }

    #[test]
    fn hash_algorithm_names() {
        assert_eq!("SHA256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha-512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
        assert!(matches!(
            "SHA1".parse::<HashAlgorithm>(),
            Err(SigningError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn signing_algorithm_names() {
        assert_eq!(
            "PKCS1-v15".parse::<SigningAlgorithm>().unwrap(),
            SigningAlgorithm::Pkcs1v15
        );
        assert_eq!(
            "RSASSA-PSS".parse::<SigningAlgorithm>().unwrap(),
            SigningAlgorithm::RsassaPss
        );
        assert!("RSASSA-OAEP".parse::<SigningAlgorithm>().is_err());
    }

    #[test]
    fn passphrase_debug_is_redacted() {
        let passphrase = Passphrase::new("hunter2");
        assert_eq!(format!("{passphrase:?}"), "Passphrase(***)");
        assert_eq!(passphrase.expose(), b"hunter2");
    }

    #[test]
    fn passphrase_fingerprint_is_stable_and_distinct() {
        let a = Passphrase::new("one");
        assert_eq!(a.fingerprint(), Passphrase::new("one").fingerprint());
        assert_ne!(a.fingerprint(), Passphrase::new("two").fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn settings_deserialize_from_json() {
        let settings: SigningSettings = serde_json::from_str(
            r#"{
                "keyId": "test-key",
                "keyFilePath": "/keys/rsa.pem",
                "keyPassphrase": "secret",
                "signingHeaders": ["(request-target)", "(created)", "(expires)"],
                "hashAlgorithm": "SHA512",
                "signingAlgorithm": "RSASSA-PSS",
                "validityPeriodSeconds": 300
            }"#,
        )
        .unwrap();
        let config = SigningConfiguration::try_from(settings).unwrap();
        assert_eq!(config.key_id(), "test-key");
        assert_eq!(config.hash_algorithm(), HashAlgorithm::Sha512);
        assert_eq!(config.signing_algorithm(), SigningAlgorithm::RsassaPss);
        assert_eq!(config.validity_period_seconds(), 300);
        assert_eq!(config.signing_headers().len(), 3);
        assert!(config.passphrase().is_some());
    }

    #[test]
    fn settings_debug_hides_passphrase() {
        let settings: SigningSettings = serde_json::from_str(
            r#"{"keyId": "k", "keyFilePath": "k.pem", "keyPassphrase": "hunter2"}"#,
        )
        .unwrap();
        let printed = format!("{settings:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("Passphrase(***)"));
        assert_eq!(settings.key_passphrase.as_ref().unwrap().expose(), b"hunter2");
    }

    #[test]
    fn settings_with_unknown_algorithm_fail_fast() {
        let settings: SigningSettings = serde_json::from_str(
            r#"{"keyId": "k", "keyFilePath": "k.pem", "hashAlgorithm": "MD5"}"#,
        )
        .unwrap();
        assert!(matches!(
            SigningConfiguration::try_from(settings),
            Err(SigningError::UnsupportedAlgorithm(_))
        ));
    }
}
