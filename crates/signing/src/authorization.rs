use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::canonical::canonicalize;
use crate::config::{HEADER_AUTHORIZATION, SigningConfiguration};
use crate::error::{Result, SigningError};
use crate::keys::{KeyCache, PrivateKeyMaterial, load_private_key};
use crate::request::RequestDescriptor;
use crate::signing::{sign_canonical, signer_for};

/// Signature scheme label. The verifier derives the actual algorithm from the
/// key registered under `keyId`.
pub const SIGNATURE_ALGORITHM: &str = "hs2019";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureResult {
    pub algorithm: &'static str,
    /// Base64 signature bytes.
    pub signature: String,
    /// Space separated lowercase header names, in signing order.
    pub headers: String,
    pub created: Option<i64>,
    pub expires: Option<i64>,
}

impl SignatureResult {
    /// `Signature keyId="..",algorithm="hs2019"[,created=..][,expires=..],headers="..",signature=".."`
    pub fn authorization_value(&self, key_id: &str) -> String {
        let mut value = format!(
            "Signature keyId=\"{key_id}\",algorithm=\"{}\"",
            self.algorithm
        );
        if let Some(created) = self.created {
            value.push_str(&format!(",created={created}"));
        }
        if let Some(expires) = self.expires {
            value.push_str(&format!(",expires={expires}"));
        }
        value.push_str(&format!(
            ",headers=\"{}\",signature=\"{}\"",
            self.headers, self.signature
        ));
        value
    }
}

/// Headers to merge into the outgoing request, in insertion order:
/// the literal `Date`, `Host` and `Digest` values as they were signed,
/// then `Authorization`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedHeaders {
    headers: Vec<(String, String)>,
}

impl SignedHeaders {
    fn insert(&mut self, name: impl Into<String>, value: String) {
        self.headers.push((name.into(), value));
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn authorization(&self) -> Option<&str> {
        self.get(HEADER_AUTHORIZATION)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Converts into an [`http::HeaderMap`]. Fails if a value (typically a
    /// `keyId` with quotes or control characters) is not a legal header value.
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SigningError::Configuration(format!("header name {name}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| SigningError::Configuration(format!("value of {name} header: {e}")))?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

impl IntoIterator for SignedHeaders {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.into_iter()
    }
}

/// Produces signed headers for outgoing requests.
///
/// One signer is built per client configuration and shared between requests.
/// Decoded keys are cached by default; [`HttpSigner::without_cache`] reads the
/// key file on every call instead.
#[derive(Debug, Clone)]
pub struct HttpSigner {
    config: SigningConfiguration,
    cache: Option<KeyCache>,
}

impl HttpSigner {
    pub fn new(config: SigningConfiguration) -> Self {
        Self::with_cache(config, KeyCache::new())
    }

    /// Shares `cache` with other signers.
    pub fn with_cache(config: SigningConfiguration, cache: KeyCache) -> Self {
        Self {
            config,
            cache: Some(cache),
        }
    }

    pub fn without_cache(config: SigningConfiguration) -> Self {
        Self { config, cache: None }
    }

    pub fn config(&self) -> &SigningConfiguration {
        &self.config
    }

    pub fn signed_headers(&self, request: &RequestDescriptor) -> Result<SignedHeaders> {
        self.signed_headers_at(request, Utc::now())
    }

    /// Signs `request` as if the current time were `now`.
    pub fn signed_headers_at(
        &self,
        request: &RequestDescriptor,
        now: DateTime<Utc>,
    ) -> Result<SignedHeaders> {
        let (literal_headers, result) = self.sign(request, now)?;

        let mut headers = SignedHeaders::default();
        for (name, value) in literal_headers {
            headers.insert(name, value);
        }
        headers.insert(
            HEADER_AUTHORIZATION,
            result.authorization_value(self.config.key_id()),
        );
        Ok(headers)
    }

    /// Signs `request` at `now` and returns the signature parameters without
    /// formatting them into headers.
    pub fn signature_at(
        &self,
        request: &RequestDescriptor,
        now: DateTime<Utc>,
    ) -> Result<SignatureResult> {
        self.sign(request, now).map(|(_, result)| result)
    }

    fn sign(
        &self,
        request: &RequestDescriptor,
        now: DateTime<Utc>,
    ) -> Result<(Vec<(&'static str, String)>, SignatureResult)> {
        let canonical = canonicalize(request, &self.config, now)?;

        let material = self.private_key()?;
        let signer = signer_for(&material, self.config.signing_algorithm())?;
        let signature = sign_canonical(
            signer.as_ref(),
            &canonical.input.signing_string(),
            self.config.hash_algorithm(),
        )?;

        let result = SignatureResult {
            algorithm: SIGNATURE_ALGORITHM,
            signature,
            headers: canonical.input.header_list(),
            created: canonical.created,
            expires: canonical.expires,
        };
        debug!(
            key_id = self.config.key_id(),
            method = %request.method(),
            headers = %result.headers,
            "Signed request"
        );
        Ok((canonical.literal_headers, result))
    }

    fn private_key(&self) -> Result<Arc<PrivateKeyMaterial>> {
        let path = self.config.key_file_path();
        let passphrase = self.config.passphrase();
        match &self.cache {
            Some(cache) => cache.get_or_load(path, passphrase),
            None => load_private_key(path, passphrase).map(Arc::new),
        }
    }
}
