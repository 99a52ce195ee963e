//! # Worker registry: who may take part in federated learning
//!
//! A federated learning coordinator accepts requests from many remote workers. Before a worker
//! receives a training round, the coordinator has to know whether the worker is allowed to take
//! part at all and whether it completed its registration. This crate keeps that knowledge.
//!
//! ## Safe and unsafe mode
//! In *safe mode* every worker owns an `Ed25519` key pair. The coordinator is handed the hex
//! encoded public keys of the allowed workers, for example through a key list file, and a worker
//! registers by presenting a challenge signed with its secret key. The identity of a worker is its
//! public key.
//!
//! In *unsafe mode* nothing is checked: every request is accepted and given a fresh identity
//! tagged as unauthenticated. This is meant for local experiments only.
//!
//! ## Usage
//! ```
//! # use worker_registry::{crypto::SigningKeyPair, WorkerRegistry};
//! # #[tokio::main]
//! # async fn main() {
//! let keys = SigningKeyPair::generate();
//! let key = keys.public.to_hex();
//! let registry = WorkerRegistry::with_keys(vec![key.as_str()]);
//!
//! let signed_challenge = hex::encode(keys.secret.sign(b"challenge"));
//! let outcome = registry
//!     .authenticate_and_add_worker(&key, &signed_challenge)
//!     .await;
//! assert!(outcome.success);
//! assert!(registry.is_registered(&outcome.worker_id).await);
//! # }
//! ```

#[macro_use]
extern crate tracing;

pub mod crypto;
pub mod registry;
pub mod settings;

pub use crate::registry::{
    AuthMode,
    Authentication,
    Outcome,
    RegistryError,
    WorkerId,
    WorkerRegistry,
    WorkerStatus,
};
