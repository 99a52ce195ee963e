//! Wrappers around the [sodiumoxide] signing primitives used to authenticate workers.
//!
//! Workers hold an `Ed25519` key pair. The public half is handed to the coordinator out of band
//! as a hex string and the secret half is used to sign the challenge the worker presents when it
//! registers.
//!
//! # Examples
//! ## Combined signatures
//! ```
//! # use worker_registry::crypto::SigningKeyPair;
//! let keys = SigningKeyPair::generate();
//! let signed = keys.secret.sign(b"registration challenge");
//! assert_eq!(keys.public.verify(&signed).unwrap(), b"registration challenge".to_vec());
//! ```
//!
//! ## Hex encoded public keys
//! ```
//! # use worker_registry::crypto::{PublicSigningKey, SigningKeyPair};
//! let keys = SigningKeyPair::generate();
//! let text = keys.public.to_hex();
//! assert_eq!(PublicSigningKey::from_hex(&text), Some(keys.public));
//! assert!(PublicSigningKey::from_hex("not a key").is_none());
//! ```
//!
//! [sodiumoxide]: https://docs.rs/sodiumoxide/

pub(crate) mod sign;

pub use self::sign::{PublicSigningKey, SecretSigningKey, Signature, SigningKeyPair};

/// An interface for slicing into cryptographic byte objects.
pub trait ByteObject: Sized {
    /// Length in bytes of this object
    const LENGTH: usize;

    /// Gets the object byte representation.
    fn as_slice(&self) -> &[u8];

    /// Creates an object from the given buffer.
    ///
    /// # Errors
    /// Returns `None` if the length of the byte-slice isn't equal to the length of the object.
    fn from_slice(bytes: &[u8]) -> Option<Self>;

    /// Creates an object from the given buffer.
    ///
    /// # Panics
    /// Panics if the length of the byte-slice isn't equal to the length of the object.
    fn from_slice_unchecked(bytes: &[u8]) -> Self {
        Self::from_slice(bytes).unwrap()
    }
}
