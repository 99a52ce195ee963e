//! Wrappers around some of the [sodiumoxide] signing primitives.
//!
//! See the [crypto module] documentation since this is a private module anyways.
//!
//! [sodiumoxide]: https://docs.rs/sodiumoxide/
//! [crypto module]: crate::crypto

use std::convert::TryInto;

use derive_more::{AsMut, AsRef, From};
use sodiumoxide::crypto::sign;

use super::ByteObject;

#[derive(Debug, Clone)]
/// A `Ed25519` key pair for signatures.
pub struct SigningKeyPair {
    /// The `Ed25519` public key.
    pub public: PublicSigningKey,
    /// The `Ed25519` secret key.
    pub secret: SecretSigningKey,
}

impl SigningKeyPair {
    /// Generates a new random `Ed25519` key pair for signing.
    pub fn generate() -> Self {
        let (pk, sk) = sign::gen_keypair();
        Self {
            public: PublicSigningKey(pk),
            secret: SecretSigningKey(sk),
        }
    }
}

#[derive(AsRef, AsMut, From, Hash, Eq, Ord, PartialEq, Copy, Clone, PartialOrd, Debug)]
/// An `Ed25519` public key for signatures.
pub struct PublicSigningKey(sign::PublicKey);

impl PublicSigningKey {
    /// Decodes a public key from its hex representation.
    ///
    /// Returns `None` if `text` is not valid hex or doesn't decode to exactly
    /// [`PublicSigningKey::LENGTH`] bytes.
    pub fn from_hex(text: &str) -> Option<Self> {
        hex::decode(text)
            .ok()
            .and_then(|bytes| Self::from_slice(&bytes))
    }

    /// Encodes this public key as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_slice())
    }

    /// Verifies a combined signed message (signature followed by the message) against this
    /// public key.
    ///
    /// Returns the message without its signature if the signature is valid and `None` otherwise.
    pub fn verify(&self, signed_message: &[u8]) -> Option<Vec<u8>> {
        sign::verify(signed_message, self.as_ref()).ok()
    }

    /// Verifies the signature `s` against the message `m` and this public key.
    ///
    /// Returns `true` if the signature is valid and `false` otherwise.
    pub fn verify_detached(&self, s: &Signature, m: &[u8]) -> bool {
        sign::verify_detached(s.as_ref(), m, self.as_ref())
    }
}

impl ByteObject for PublicSigningKey {
    const LENGTH: usize = sign::PUBLICKEYBYTES;

    fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        sign::PublicKey::from_slice(bytes).map(Self)
    }
}

#[derive(AsRef, AsMut, From, Eq, PartialEq, Clone, Debug)]
/// An `Ed25519` secret key for signatures.
///
/// When this goes out of scope, its contents will be zeroed out.
pub struct SecretSigningKey(sign::SecretKey);

impl SecretSigningKey {
    /// Signs a message `m` with this secret key and returns the signature followed by `m`.
    pub fn sign(&self, m: &[u8]) -> Vec<u8> {
        sign::sign(m, self.as_ref())
    }

    /// Signs a message `m` with this secret key.
    pub fn sign_detached(&self, m: &[u8]) -> Signature {
        sign::sign_detached(m, self.as_ref()).into()
    }

    /// Computes the corresponding public key for this secret key.
    pub fn public_key(&self) -> PublicSigningKey {
        PublicSigningKey(self.0.public_key())
    }
}

impl ByteObject for SecretSigningKey {
    const LENGTH: usize = sign::SECRETKEYBYTES;

    fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        sign::SecretKey::from_slice(bytes).map(Self)
    }
}

#[derive(AsRef, AsMut, From, Eq, PartialEq, Copy, Clone, Debug)]
/// An `Ed25519` signature detached from its message.
pub struct Signature(sign::Signature);

impl ByteObject for Signature {
    const LENGTH: usize = sign::SIGNATUREBYTES;

    fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_key_hex() {
        let keys = SigningKeyPair::generate();
        let text = keys.public.to_hex();
        assert_eq!(text.len(), 2 * PublicSigningKey::LENGTH);
        assert_eq!(PublicSigningKey::from_hex(&text), Some(keys.public));
        assert_eq!(
            PublicSigningKey::from_hex(&text.to_uppercase()),
            Some(keys.public)
        );

        // odd length, non hex characters, wrong key length
        assert!(PublicSigningKey::from_hex(&text[1..]).is_none());
        assert!(PublicSigningKey::from_hex(&text.replace(&text[..2], "zz")).is_none());
        assert!(PublicSigningKey::from_hex(&text[2..]).is_none());
        assert!(PublicSigningKey::from_hex(&format!("{}00", text)).is_none());
        assert!(PublicSigningKey::from_hex("").is_none());
    }

    #[test]
    fn test_verify_combined() {
        let keys = SigningKeyPair::generate();
        let mut signed = keys.secret.sign(b"challenge");
        assert_eq!(signed.len(), Signature::LENGTH + b"challenge".len());
        assert_eq!(keys.public.verify(&signed), Some(b"challenge".to_vec()));

        // wrong key
        let other = SigningKeyPair::generate();
        assert!(other.public.verify(&signed).is_none());

        // tampered signature
        signed[0] ^= 1;
        assert!(keys.public.verify(&signed).is_none());

        // too short to even hold a signature
        assert!(keys.public.verify(&signed[..Signature::LENGTH - 1]).is_none());
    }

    #[test]
    fn test_verify_detached() {
        let keys = SigningKeyPair::generate();
        let signature = keys.secret.sign_detached(b"challenge");
        assert!(keys.public.verify_detached(&signature, b"challenge"));
        assert!(!keys.public.verify_detached(&signature, b"other challenge"));

        let combined = keys.secret.sign(b"challenge");
        assert_eq!(
            Signature::from_slice(&combined[..Signature::LENGTH]),
            Some(signature)
        );
        assert!(Signature::from_slice(&combined).is_none());
    }

    #[test]
    fn test_secret_key_public_key() {
        let keys = SigningKeyPair::generate();
        assert_eq!(keys.secret.public_key(), keys.public);
        let secret = SecretSigningKey::from_slice_unchecked(keys.secret.as_slice());
        assert_eq!(secret, keys.secret);
    }
}
