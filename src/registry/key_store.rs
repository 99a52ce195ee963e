//! The store of public keys that are allowed to authenticate.

use std::collections::BTreeMap;

use crate::crypto::PublicSigningKey;

/// Maps hex encoded public keys to the decoded keys used to check signatures.
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: BTreeMap<String, PublicSigningKey>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the public key with the given hex representation.
    ///
    /// Returns `false` if the key can't be decoded, in which case the store is left untouched.
    /// Adding a key twice is not an error.
    pub fn add(&mut self, key: &str) -> bool {
        if self.keys.contains_key(key) {
            warn!("attempt to add previously added public key {}", key);
            return true;
        }
        match PublicSigningKey::from_hex(key) {
            Some(pk) => {
                debug!("added public key {}", key);
                self.keys.insert(key.to_string(), pk);
                true
            }
            None => {
                warn!("invalid public key {}: not a hex encoded Ed25519 key", key);
                false
            }
        }
    }

    /// Removes the given public key.
    ///
    /// Always succeeds: removing an unknown key leaves the store unchanged.
    pub fn remove(&mut self, key: &str) -> bool {
        if self.keys.remove(key).is_none() {
            warn!("attempt to remove unknown public key {}", key);
        }
        true
    }

    pub fn get(&self, key: &str) -> Option<&PublicSigningKey> {
        self.keys.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// Returns the hex representations of all stored keys.
    pub fn keys(&self) -> Vec<String> {
        self.keys.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SigningKeyPair;

    #[test]
    fn test_add_key() {
        let mut store = KeyStore::new();
        let key = SigningKeyPair::generate().public.to_hex();

        assert!(store.add(&key));
        assert!(store.contains(&key));
        assert_eq!(store.get(&key).map(|pk| pk.to_hex()), Some(key.clone()));

        // idempotent
        assert!(store.add(&key));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_malformed_key() {
        let mut store = KeyStore::new();
        let key = SigningKeyPair::generate().public.to_hex();

        assert!(!store.add("not hex"));
        assert!(!store.add(&key[..key.len() - 2]));
        assert!(!store.add(""));
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_key() {
        let mut store = KeyStore::new();
        let key = SigningKeyPair::generate().public.to_hex();
        store.add(&key);

        assert!(store.remove(&key));
        assert!(!store.contains(&key));
        // removing an absent key still succeeds
        assert!(store.remove(&key));
        assert!(store.is_empty());
    }

    #[test]
    fn test_keys() {
        let mut store = KeyStore::new();
        let mut keys: Vec<String> = (0..3)
            .map(|_| SigningKeyPair::generate().public.to_hex())
            .collect();
        for key in keys.iter() {
            store.add(key);
        }
        keys.sort();
        assert_eq!(store.keys(), keys);
    }
}
