//! HTTP request signing with `hs2019` style signatures.
//!
//! [`HttpSigner`] turns a [`RequestDescriptor`] into the `Date`, `Host`,
//! `Digest` and `Authorization` headers a verifying server expects, using an
//! RSA or ECDSA private key loaded from a PEM or DER file.

pub mod authorization;
pub mod canonical;
pub mod config;
pub mod der;
pub mod digest;
pub mod error;
pub mod keys;
pub mod request;
pub mod signing;

pub use authorization::{HttpSigner, SignatureResult, SignedHeaders};
pub use config::{
    HashAlgorithm, Passphrase, SigningAlgorithm, SigningConfiguration, SigningSettings,
};
pub use error::{Result, SigningError};
pub use keys::{KeyCache, PrivateKeyMaterial, load_private_key};
pub use request::RequestDescriptor;
pub use signing::{EcdsaSigner, RequestSigner, RsaSigner};
