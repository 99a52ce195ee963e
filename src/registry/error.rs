use std::io;

use displaydoc::Display;
use thiserror::Error;

/// Errors which prevent a [`WorkerRegistry`] from being created.
///
/// [`WorkerRegistry`]: crate::registry::WorkerRegistry
#[derive(Debug, Display, Error)]
pub enum RegistryError {
    /// server started in unsafe mode but a list of public keys was provided: either start the server in safe mode or do not supply a key list
    UnsafeModeWithKeyList,
    /// failed to read the key list {0}: {1}
    KeyList(String, #[source] io::Error),
}
