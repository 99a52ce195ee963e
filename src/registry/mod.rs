//! The worker registry.
//!
//! The [`WorkerRegistry`] decides which workers may talk to the coordinator. It keeps three pieces
//! of state that always change together:
//! - the [`KeyStore`] of public keys that may authenticate (empty in unsafe mode),
//! - the ordered set of allowed [`WorkerId`]s,
//! - the registration status of every allowed worker.
//!
//! A worker moves through the states `unknown -> allowed -> registered`. Registration can be
//! revoked with [`WorkerRegistry::set_registration_status`] and removing a worker makes it unknown
//! again. In safe mode the identity of a worker is its hex encoded public key, in unsafe mode every
//! request is accepted and given a fresh identity.
//!
//! All three pieces of state live behind a single lock, so that every operation, including the
//! combined [`WorkerRegistry::authenticate_and_add_worker`], is atomic with respect to all others.

mod error;
mod key_store;
mod worker;

use std::{collections::HashMap, fs, path::Path, sync::Arc};

use tokio::sync::RwLock;

pub use self::{
    error::RegistryError,
    key_store::KeyStore,
    worker::{
        AuthMode,
        Authentication,
        Outcome,
        WorkerId,
        WorkerStatus,
        INVALID_WORKER,
        UNAUTHENTICATED_SUFFIX,
    },
};
use crate::settings::RegistrySettings;

/// A handle to the shared registry state.
///
/// Cloning the handle is cheap and every clone refers to the same state.
#[derive(Clone, Debug)]
pub struct WorkerRegistry {
    safe_mode: bool,
    inner: Arc<RwLock<Registry>>,
}

impl WorkerRegistry {
    /// Creates a registry, optionally allowing the workers listed in the `key_list` file.
    ///
    /// Keys in the file that can't be decoded are skipped with a warning.
    ///
    /// # Errors
    /// Fails if a key list is given in unsafe mode or if the key list can't be read.
    pub fn new(safe_mode: bool, key_list: Option<&Path>) -> Result<Self, RegistryError> {
        if !safe_mode {
            if key_list.is_some() {
                let err = RegistryError::UnsafeModeWithKeyList;
                error!("{}", err);
                return Err(err);
            }
            warn!("no key list file provided: no worker authentication will be used!");
            warn!("registry is running in UNSAFE MODE");
            return Ok(Self::from_registry(false, Registry::unauthenticated()));
        }

        let keys = match key_list {
            Some(path) => read_key_list(path)?,
            None => Vec::new(),
        };
        Ok(Self::with_keys(keys))
    }

    /// Creates a safe mode registry that allows the workers with the given public keys.
    ///
    /// Keys that can't be decoded are skipped with a warning.
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Registry::authenticated();
        for key in keys {
            let key = key.as_ref();
            if registry.add_key(key) {
                registry.insert_worker(key);
            } else {
                warn!("invalid public key {}: worker not added", key);
            }
        }
        Self::from_registry(true, registry)
    }

    /// Creates a registry from the `[registry]` settings.
    ///
    /// # Errors
    /// See [`WorkerRegistry::new`].
    pub fn from_settings(settings: &RegistrySettings) -> Result<Self, RegistryError> {
        Self::new(settings.safe_mode, settings.key_list.as_deref())
    }

    fn from_registry(safe_mode: bool, registry: Registry) -> Self {
        Self {
            safe_mode,
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Whether workers must authenticate.
    pub fn is_safe(&self) -> bool {
        self.safe_mode
    }

    /// Adds a public key that may authenticate, without allowing a worker yet.
    ///
    /// Returns `false` if the key can't be decoded. Always succeeds in unsafe mode.
    pub async fn add_key(&self, key: &str) -> bool {
        self.inner.write().await.add_key(key)
    }

    /// Removes a public key. Removing an unknown key succeeds as well, hence the result can't be
    /// used to tell whether the key was present.
    pub async fn remove_key(&self, key: &str) -> bool {
        self.inner.write().await.remove_key(key)
    }

    /// Returns the stored public keys. Always empty in unsafe mode.
    pub async fn list_keys(&self) -> Vec<String> {
        self.inner.read().await.list_keys()
    }

    /// Returns the identity the worker with the given public key is known by.
    ///
    /// In unsafe mode every call yields a new identity.
    pub fn generate_worker_id(&self, key: &str) -> WorkerId {
        generate_worker_id(self.safe_mode, key)
    }

    /// Allows the worker with the given public key.
    ///
    /// Fails with the invalid identity if the key can't be decoded. If the worker is allowed
    /// already, its identity is returned together with `false`.
    pub async fn add_worker(&self, key: &str) -> Outcome {
        self.inner.write().await.add_worker(key)
    }

    /// Removes the worker together with its registration status and public key.
    pub async fn remove_worker(&self, worker_id: &WorkerId) -> Outcome {
        self.inner.write().await.remove_worker(worker_id)
    }

    /// Checks the signed challenge of the worker with the given public key.
    ///
    /// The `signed_challenge` is the hex encoded signature followed by the challenge. Unknown keys
    /// and malformed signatures fail the authentication.
    pub async fn authenticate_worker(&self, key: &str, signed_challenge: &str) -> Authentication {
        self.inner.read().await.authenticate(key, signed_challenge)
    }

    /// Authenticates the worker, allows it if needed and marks it as registered.
    ///
    /// Nothing changes if the authentication fails.
    pub async fn authenticate_and_add_worker(&self, key: &str, signed_challenge: &str) -> Outcome {
        let mut registry = self.inner.write().await;
        if !registry.authenticate(key, signed_challenge).success {
            return Outcome::invalid();
        }
        let Outcome { worker_id, .. } = registry.insert_worker(key);
        registry.set_registration_status(&worker_id, true)
    }

    /// Sets the registration status of an allowed worker.
    ///
    /// Setting the current status again still succeeds.
    pub async fn set_registration_status(&self, worker_id: &WorkerId, registered: bool) -> Outcome {
        self.inner
            .write()
            .await
            .set_registration_status(worker_id, registered)
    }

    pub async fn is_allowed(&self, worker_id: &WorkerId) -> bool {
        self.inner.read().await.is_allowed(worker_id)
    }

    /// Whether the worker is registered. Unknown workers are not registered either.
    pub async fn is_registered(&self, worker_id: &WorkerId) -> bool {
        self.inner.read().await.is_registered(worker_id)
    }

    /// Returns all allowed workers and their registration status, in the order they were added.
    pub async fn list_workers(&self) -> Vec<WorkerStatus> {
        self.inner.read().await.list_workers()
    }
}

/// Reads one public key per line. Surrounding whitespace and blank lines are ignored.
fn read_key_list(path: &Path) -> Result<Vec<String>, RegistryError> {
    let content = fs::read_to_string(path)
        .map_err(|err| RegistryError::KeyList(path.display().to_string(), err))?;
    let keys: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    info!("read {} public key(s) from {}", keys.len(), path.display());
    Ok(keys)
}

fn generate_worker_id(safe_mode: bool, key: &str) -> WorkerId {
    if safe_mode {
        WorkerId::from(key)
    } else {
        WorkerId::unauthenticated()
    }
}

/// The registry state. Only ever accessed through the lock of a [`WorkerRegistry`].
#[derive(Debug)]
struct Registry {
    /// The public keys, `None` in unsafe mode.
    key_store: Option<KeyStore>,
    /// The allowed workers in insertion order.
    allowed: Vec<WorkerId>,
    /// The registration status of every allowed worker.
    registered: HashMap<WorkerId, bool>,
}

impl Registry {
    fn authenticated() -> Self {
        Self {
            key_store: Some(KeyStore::new()),
            allowed: Vec::new(),
            registered: HashMap::new(),
        }
    }

    fn unauthenticated() -> Self {
        Self {
            key_store: None,
            allowed: Vec::new(),
            registered: HashMap::new(),
        }
    }

    fn add_key(&mut self, key: &str) -> bool {
        self.key_store
            .as_mut()
            .map(|store| store.add(key))
            .unwrap_or(true)
    }

    fn remove_key(&mut self, key: &str) -> bool {
        self.key_store
            .as_mut()
            .map(|store| store.remove(key))
            .unwrap_or(true)
    }

    fn list_keys(&self) -> Vec<String> {
        self.key_store
            .as_ref()
            .map(KeyStore::keys)
            .unwrap_or_default()
    }

    fn add_worker(&mut self, key: &str) -> Outcome {
        if !self.add_key(key) {
            warn!("invalid public key {}: worker not added", key);
            return Outcome::invalid();
        }
        self.insert_worker(key)
    }

    /// Allows a worker whose public key is stored already.
    fn insert_worker(&mut self, key: &str) -> Outcome {
        let worker_id = generate_worker_id(self.key_store.is_some(), key);
        if let Some(store) = &self.key_store {
            if !store.contains(key) {
                error!(
                    "inconsistent worker registry: attempt to add worker {} without its public key",
                    worker_id
                );
                return Outcome::invalid();
            }
        }

        if self.registered.contains_key(&worker_id) {
            info!(
                "worker {} was added previously: no additional actions taken",
                worker_id
            );
            return Outcome::new(worker_id, false);
        }
        self.allowed.push(worker_id.clone());
        self.registered.insert(worker_id.clone(), false);
        info!("successfully added worker {}", worker_id);
        Outcome::new(worker_id, true)
    }

    fn remove_worker(&mut self, worker_id: &WorkerId) -> Outcome {
        if self.registered.remove(worker_id).is_none() {
            warn!("attempt to remove non-existent worker {}", worker_id);
            return Outcome::invalid();
        }
        self.allowed.retain(|id| id != worker_id);
        self.remove_key(worker_id.as_str());
        info!(
            "worker {} was removed: it is no longer allowed to register or take part in training",
            worker_id
        );
        Outcome::new(worker_id.clone(), true)
    }

    fn authenticate(&self, key: &str, signed_challenge: &str) -> Authentication {
        let store = match &self.key_store {
            Some(store) => store,
            None => {
                warn!("accepting worker as valid without authentication");
                return Authentication::skipped();
            }
        };
        let pk = match store.get(key) {
            Some(pk) => pk,
            None => {
                warn!("failed to authenticate worker with unknown public key {}", key);
                return Authentication::checked(false);
            }
        };

        let verified = hex::decode(signed_challenge)
            .ok()
            .and_then(|signed| pk.verify(&signed))
            .is_some();
        if verified {
            info!("successfully authenticated worker with public key {}", key);
        } else {
            warn!("failed to authenticate worker with public key {}", key);
        }
        Authentication::checked(verified)
    }

    fn set_registration_status(&mut self, worker_id: &WorkerId, registered: bool) -> Outcome {
        match self.registered.get_mut(worker_id) {
            Some(status) => {
                info!(
                    "set registration status of worker {} from {} to {}",
                    worker_id, status, registered
                );
                *status = registered;
                Outcome::new(worker_id.clone(), true)
            }
            None => {
                warn!(
                    "worker {} must be added before its registration status can change",
                    worker_id
                );
                Outcome::invalid()
            }
        }
    }

    fn is_allowed(&self, worker_id: &WorkerId) -> bool {
        self.registered.contains_key(worker_id)
    }

    fn is_registered(&self, worker_id: &WorkerId) -> bool {
        self.registered.get(worker_id).copied().unwrap_or(false)
    }

    fn list_workers(&self) -> Vec<WorkerStatus> {
        self.allowed
            .iter()
            .map(|worker_id| WorkerStatus {
                worker_id: worker_id.clone(),
                registered: self.is_registered(worker_id),
            })
            .collect()
    }
}
