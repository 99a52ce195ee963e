//! Worker identities and the values returned by registry operations.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use sodiumoxide::crypto::hash::sha256;

/// The text of the sentinel identity returned by failed operations.
pub const INVALID_WORKER: &str = "invalid_worker";

/// The tag appended to identities handed out without authentication.
pub const UNAUTHENTICATED_SUFFIX: &str = "_unauthenticated";

// Distinguishes identities generated within the same clock tick.
static UNAUTHENTICATED_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(
    Clone, Debug, Display, From, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
/// The identifier of a worker.
///
/// In safe mode this is the hex encoded public key of the worker. In unsafe mode it is an opaque
/// token that is generated anew on every request.
pub struct WorkerId(String);

impl WorkerId {
    /// The sentinel identity that signals a failed operation.
    pub fn invalid() -> Self {
        Self(INVALID_WORKER.to_string())
    }

    /// Generates a fresh identity for a worker that was not authenticated.
    ///
    /// The identity is derived from the current time and is neither deterministic nor
    /// reproducible: two calls never return the same identity.
    pub fn unauthenticated() -> Self {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let count = UNAUTHENTICATED_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut seed = nanos.to_le_bytes().to_vec();
        seed.extend_from_slice(&count.to_le_bytes());
        let digest = sha256::hash(&seed);
        Self(format!("{}{}", hex::encode(digest.as_ref()), UNAUTHENTICATED_SUFFIX))
    }

    pub fn is_invalid(&self) -> bool {
        self.0 == INVALID_WORKER
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.0.ends_with(UNAUTHENTICATED_SUFFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for WorkerId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// The result of an operation that adds, removes or updates a worker.
///
/// A failed operation carries the [invalid] identity, except when adding a worker that is already
/// allowed: the identity is then returned with `success == false` to signal that nothing changed.
///
/// [invalid]: WorkerId::invalid
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub worker_id: WorkerId,
    pub success: bool,
}

impl Outcome {
    pub(crate) fn new(worker_id: WorkerId, success: bool) -> Self {
        Self {
            worker_id,
            success,
        }
    }

    pub(crate) fn invalid() -> Self {
        Self::new(WorkerId::invalid(), false)
    }

    /// Unwraps this outcome into the worker identity and the success flag.
    pub fn into_inner(self) -> (WorkerId, bool) {
        (self.worker_id, self.success)
    }
}

/// Whether a cryptographic check took place while authenticating a worker.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthMode {
    /// The registry runs in unsafe mode and accepted the worker without a check.
    #[display(fmt = "NO_AUTHENTICATION")]
    NoAuthentication,
    /// The signature of the worker was checked.
    #[display(fmt = "AUTHENTICATED")]
    Authenticated,
}

/// The result of authenticating a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Authentication {
    pub success: bool,
    pub mode: AuthMode,
}

impl Authentication {
    pub(crate) fn skipped() -> Self {
        Self {
            success: true,
            mode: AuthMode::NoAuthentication,
        }
    }

    pub(crate) fn checked(success: bool) -> Self {
        Self {
            success,
            mode: AuthMode::Authenticated,
        }
    }
}

/// An entry of the worker listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub worker_id: WorkerId,
    #[serde(rename = "registration_status")]
    pub registered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthenticated_ids_are_unique() {
        let ids: Vec<WorkerId> = (0..100).map(|_| WorkerId::unauthenticated()).collect();
        for (i, id) in ids.iter().enumerate() {
            assert!(id.is_unauthenticated());
            assert!(!id.is_invalid());
            assert!(!ids[i + 1..].contains(id));
        }
    }

    #[test]
    fn test_invalid_id() {
        assert!(WorkerId::invalid().is_invalid());
        assert_eq!(WorkerId::invalid().to_string(), INVALID_WORKER);
        assert!(!WorkerId::from("abcd").is_invalid());
        assert_eq!(Outcome::invalid().into_inner(), (WorkerId::invalid(), false));
    }

    #[test]
    fn test_auth_mode_display() {
        assert_eq!(AuthMode::NoAuthentication.to_string(), "NO_AUTHENTICATION");
        assert_eq!(AuthMode::Authenticated.to_string(), "AUTHENTICATED");
        assert_eq!(
            serde_json::to_string(&AuthMode::NoAuthentication).unwrap(),
            "\"NO_AUTHENTICATION\""
        );
    }

    #[test]
    fn test_worker_status_serialization() {
        let status = WorkerStatus {
            worker_id: WorkerId::from("abcd"),
            registered: true,
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            serde_json::json!({ "worker_id": "abcd", "registration_status": true })
        );
    }
}
