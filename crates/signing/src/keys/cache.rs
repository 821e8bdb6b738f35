use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{load_private_key, PrivateKeyMaterial};
use crate::config::Passphrase;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    passphrase_fingerprint: Option<String>,
}

impl CacheKey {
    fn new(path: &Path, passphrase: Option<&Passphrase>) -> Self {
        Self {
            path: path.to_path_buf(),
            passphrase_fingerprint: passphrase.map(Passphrase::fingerprint),
        }
    }
}

/// Memoizes decoded private keys by file path and passphrase.
///
/// Cloning a `KeyCache` shares the underlying entries. Failed loads are not
/// cached, and a changed key file is only picked up after [`KeyCache::clear`].
#[derive(Debug, Clone, Default)]
pub struct KeyCache {
    entries: Arc<RwLock<HashMap<CacheKey, Arc<PrivateKeyMaterial>>>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached key for `path`, loading it on first use.
    pub fn get_or_load(
        &self,
        path: &Path,
        passphrase: Option<&Passphrase>,
    ) -> Result<Arc<PrivateKeyMaterial>> {
        let key = CacheKey::new(path, passphrase);
        if let Some(material) = self.entries.read().get(&key) {
            debug!(key_file = %path.display(), "Private key cache hit");
            return Ok(Arc::clone(material));
        }

        // Loading happens outside the lock; a concurrent miss for the same
        // key may decode the file twice, and the first insert wins.
        let material = Arc::new(load_private_key(path, passphrase)?);
        let mut entries = self.entries.write();
        let material = Arc::clone(entries.entry(key).or_insert(material));
        debug!(key_file = %path.display(), cached = entries.len(), "Cached private key");
        Ok(material)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
