//! Keyring capabilities: how decoders resolve wire key ids to key material.

use std::collections::HashMap;

use crate::box_key::{BoxKeyPair, BoxPublic, BoxPublicKey, BoxSecretKey};
use crate::signing::{SigningKeyPair, SigningPublic, SigningPublicKey};

/// Box-key lookup capability consumed by decryption.
///
/// The returned index of [`lookup_box_secret`](Keyring::lookup_box_secret)
/// is chosen by the ring; callers must range-check it against their own
/// receiver list before trusting it.
pub trait Keyring: Send + Sync {
    /// Resolve a key id to a public key, if this ring recognizes it.
    fn lookup_box_public(&self, kid: &[u8]) -> Option<Box<dyn BoxPublicKey>>;

    /// Import an ephemeral public key from its wire representation.
    ///
    /// Returns `None` when the bytes cannot be a key of this ring's
    /// algebra.
    fn import_box_ephemeral(&self, kid: &[u8]) -> Option<Box<dyn BoxPublicKey>>;

    /// Find the first key id this ring holds a secret for.
    ///
    /// Returns the index into `kids` alongside the secret.
    fn lookup_box_secret(&self, kids: &[&[u8]]) -> Option<(usize, Box<dyn BoxSecretKey>)>;

    /// All secrets held, for trial decryption against anonymous receivers.
    ///
    /// A ring that does not want to be iterated (to keep lookups constant
    /// time) returns an empty vector.
    fn all_box_secrets(&self) -> Vec<Box<dyn BoxSecretKey>>;
}

/// Signing-key lookup capability consumed by verification.
pub trait SigKeyring: Send + Sync {
    /// Resolve a key id to a verifying key, if this ring recognizes it.
    fn lookup_signing_public(&self, kid: &[u8]) -> Option<Box<dyn SigningPublicKey>>;
}

/// A process-local in-memory keyring.
///
/// Box key ids are the raw public key bytes, so any well-formed kid resolves
/// to a public key; secrets resolve only if they were inserted. The ring is
/// non-iterable by default: anonymous-receiver trial decryption is opt-in
/// because it trades constant-time lookup for coverage.
#[derive(Default)]
pub struct KeyringStore {
    box_keys: HashMap<Vec<u8>, BoxKeyPair>,
    sig_keys: HashMap<Vec<u8>, SigningPublic>,
    iterable: bool,
}

impl KeyringStore {
    /// Create an empty, non-iterable ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow or forbid iteration over held secrets.
    pub fn set_iterable(&mut self, iterable: bool) {
        self.iterable = iterable;
    }

    /// Insert a box keypair, keyed by its public kid.
    pub fn insert_box_key(&mut self, key: &BoxKeyPair) {
        self.box_keys.insert(key.public_key().to_kid(), key.clone());
    }

    /// Insert the verifying half of a signing keypair.
    pub fn insert_signing_key(&mut self, key: &SigningKeyPair) {
        let public = key.verifying();
        self.sig_keys.insert(public.to_kid(), public);
    }
}

impl Keyring for KeyringStore {
    fn lookup_box_public(&self, kid: &[u8]) -> Option<Box<dyn BoxPublicKey>> {
        BoxPublic::from_kid(kid)
            .ok()
            .map(|k| Box::new(k) as Box<dyn BoxPublicKey>)
    }

    fn import_box_ephemeral(&self, kid: &[u8]) -> Option<Box<dyn BoxPublicKey>> {
        BoxPublic::from_kid(kid)
            .ok()
            .map(|k| Box::new(k) as Box<dyn BoxPublicKey>)
    }

    fn lookup_box_secret(&self, kids: &[&[u8]]) -> Option<(usize, Box<dyn BoxSecretKey>)> {
        for (i, kid) in kids.iter().enumerate() {
            if let Some(key) = self.box_keys.get(*kid) {
                return Some((i, key.clone_boxed()));
            }
        }
        None
    }

    fn all_box_secrets(&self) -> Vec<Box<dyn BoxSecretKey>> {
        if !self.iterable {
            return Vec::new();
        }
        self.box_keys.values().map(|k| k.clone_boxed()).collect()
    }
}

impl SigKeyring for KeyringStore {
    fn lookup_signing_public(&self, kid: &[u8]) -> Option<Box<dyn SigningPublicKey>> {
        self.sig_keys.get(kid).map(|k| k.clone_boxed())
    }
}
