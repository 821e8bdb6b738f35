//! Signing string construction.
//!
//! The signing string is one `"<lowercase-name>: <value>"` line per signed
//! header, in the configured order, joined with `\n` and without a trailing
//! newline:
//!
//! ```text
//! (request-target): get /v2/pet/1
//! (created): 1610000000
//! digest: SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=
//! ```
//!
//! The verifier rebuilds the same text from the received request, so every
//! byte here is part of the wire contract.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, CONTROLS, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;
use url::Url;

use crate::config::{
    HEADER_DATE, HEADER_DIGEST, HEADER_HOST, SigningConfiguration, SigningHeader,
};
use crate::digest::body_digest;
use crate::error::{Result, SigningError};
use crate::request::RequestDescriptor;

/// Characters left unescaped in query keys and values: alphanumerics and
/// `-_.!*()`. Everything else is percent-encoded, spaces as `%20`.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'*')
    .remove(b'(')
    .remove(b')');

/// Escaped in path parameter values so a value cannot end the path, start a
/// fragment, or read as an existing escape. The URI parser encodes the rest.
const PATH_PARAM_ENCODE_SET: &AsciiSet = &CONTROLS.add(b'?').add(b'#').add(b'%');

/// Replaces each `{name}` placeholder with the parameter value.
pub fn expand_path(template: &str, parameters: &HashMap<String, String>) -> Result<String> {
    let mut path = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        let name = &rest[open + 1..close];
        let value = parameters
            .get(name)
            .ok_or_else(|| SigningError::InvalidRequestUri {
                uri: template.to_string(),
                reason: format!("no value for path parameter {name}"),
            })?;
        path.push_str(&rest[..open]);
        path.extend(utf8_percent_encode(value, PATH_PARAM_ENCODE_SET));
        rest = &rest[close + 1..];
    }
    path.push_str(rest);
    Ok(path)
}

/// Serializes query parameters in insertion order. A parameter with several
/// values becomes repeated `name[]=value` pairs.
pub fn build_query_string(parameters: &[(String, Vec<String>)]) -> String {
    let mut pairs = Vec::new();
    for (name, values) in parameters {
        let key = if values.len() > 1 {
            format!("{name}[]")
        } else {
            name.clone()
        };
        for value in values {
            pairs.push(format!(
                "{}={}",
                utf8_percent_encode(&key, QUERY_ENCODE_SET),
                utf8_percent_encode(value, QUERY_ENCODE_SET)
            ));
        }
    }
    pairs.join("&")
}

/// RFC 1123 date as sent in the `Date` header.
pub fn format_http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Resolved location of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub host: String,
    pub path: String,
    pub query: String,
}

impl RequestTarget {
    pub fn resolve(request: &RequestDescriptor) -> Result<Self> {
        let path = expand_path(request.path_template(), request.path_parameters())?;
        let uri = format!("{}{}", request.base_path(), path);
        let url = Url::parse(&uri).map_err(|e| SigningError::InvalidRequestUri {
            uri: uri.clone(),
            reason: e.to_string(),
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| SigningError::InvalidRequestUri {
                uri: uri.clone(),
                reason: "no host component".to_string(),
            })?
            .to_string();

        Ok(Self {
            host,
            path: url.path().to_string(),
            query: build_query_string(request.query_parameters()),
        })
    }

    /// Path plus `?query` when there is a query.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }
}

/// Ordered `(lowercase name, value)` pairs that make up the signing string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalSignatureInput {
    entries: Vec<(String, String)>,
}

impl CanonicalSignatureInput {
    fn push(&mut self, name: String, value: String) {
        self.entries.push((name, value));
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Space separated header names for `headers="..."`.
    pub fn header_list(&self) -> String {
        self.entries
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn signing_string(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Output of [`canonicalize`].
#[derive(Debug, Clone)]
pub struct Canonicalization {
    pub input: CanonicalSignatureInput,
    /// `Date`, `Host` and `Digest` values that must also be sent as headers.
    pub literal_headers: Vec<(&'static str, String)>,
    pub created: Option<i64>,
    pub expires: Option<i64>,
}

/// Builds the signing input for `request` at the frozen time `now`.
///
/// Every request header named in the configuration is checked before any
/// value is computed.
pub fn canonicalize(
    request: &RequestDescriptor,
    config: &SigningConfiguration,
    now: DateTime<Utc>,
) -> Result<Canonicalization> {
    for header in config.signing_headers() {
        if let SigningHeader::Request(name) = header {
            if request.header(name).is_none() {
                return Err(SigningError::HeaderNotFound {
                    header: name.clone(),
                });
            }
        }
    }

    let target = RequestTarget::resolve(request)?;
    let created = now.timestamp();
    let validity = i64::try_from(config.validity_period_seconds()).unwrap_or(i64::MAX);

    let mut canonical = Canonicalization {
        input: CanonicalSignatureInput::default(),
        literal_headers: Vec::new(),
        created: None,
        expires: None,
    };

    for header in config.signing_headers() {
        let value = match header {
            SigningHeader::RequestTarget => format!(
                "{} {}",
                request.method().as_str().to_ascii_lowercase(),
                target.path_and_query()
            ),
            SigningHeader::Created => {
                canonical.created = Some(created);
                created.to_string()
            }
            SigningHeader::Expires => {
                let expires = created.saturating_add(validity);
                canonical.expires = Some(expires);
                expires.to_string()
            }
            SigningHeader::Date => {
                let date = format_http_date(now);
                canonical.literal_headers.push((HEADER_DATE, date.clone()));
                date
            }
            SigningHeader::Host => {
                canonical
                    .literal_headers
                    .push((HEADER_HOST, target.host.clone()));
                target.host.clone()
            }
            SigningHeader::Digest => {
                let digest = body_digest(request.body(), config.hash_algorithm());
                canonical
                    .literal_headers
                    .push((HEADER_DIGEST, digest.clone()));
                digest
            }
            SigningHeader::Request(name) => request
                .header(name)
                .map(str::to_string)
                .ok_or_else(|| SigningError::HeaderNotFound {
                    header: name.clone(),
                })?,
        };
        canonical.input.push(header.canonical_name(), value);
    }

    debug!(headers = %canonical.input.header_list(), "Built canonical signing string");
    Ok(canonical)
}
