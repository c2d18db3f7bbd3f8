//! Curve25519 box keys: capability traits and the crypto_box-backed
//! implementation.
//!
//! The traits carry exactly the operation set the format layer consumes.
//! Implementations are free to keep their secret material anywhere (memory,
//! hardware, a remote agent) as long as the operations hold to the layout
//! contract below.
//!
//! ## Ciphertext layout
//!
//! `seal_box` and [`BoxPrecomputedSharedKey::seal`] produce the encrypted
//! plaintext followed by the 16-byte Poly1305 tag. Derivations that use a
//! boxed payload as key material (the MAC-key construction) rely on the
//! non-tag segment sitting at the front.

use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::AeadInPlace;
use crypto_box::SalsaBox;
use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;

use crate::csprng;
use crate::nonce::Nonce;
use crate::{CryptoError, Result};

/// Size of a Curve25519 public or secret key in bytes.
pub const BOX_KEY_SIZE: usize = 32;

/// Bytes a box adds on top of the plaintext (the Poly1305 tag).
pub const BOX_OVERHEAD: usize = 16;

/// Raw 32-byte Curve25519 key material.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawBoxKey(pub [u8; BOX_KEY_SIZE]);

impl RawBoxKey {
    /// Create from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != BOX_KEY_SIZE {
            return Err(CryptoError::InvalidLength {
                expected: BOX_KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; BOX_KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Get the key bytes.
    pub fn as_array(&self) -> &[u8; BOX_KEY_SIZE] {
        &self.0
    }

    /// Constant-time equality.
    pub fn ct_eq(&self, other: &RawBoxKey) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl std::fmt::Debug for RawBoxKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawBoxKey({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// A Curve25519 public key as the format layer sees it.
pub trait BoxPublicKey: Send + Sync {
    /// Opaque key identifier. By convention the raw public key bytes.
    fn to_kid(&self) -> Vec<u8>;

    /// The raw key material.
    fn raw(&self) -> &RawBoxKey;

    /// Whether this receiver wants its key id left out of headers.
    fn hide_identity(&self) -> bool {
        false
    }

    /// Clone into an owned trait object.
    fn clone_boxed(&self) -> Box<dyn BoxPublicKey>;
}

/// A shared key precomputed from one secret and one public key.
///
/// Worth using when many boxes are opened against the same peer, e.g. trial
/// decryption across a header's receiver list.
pub trait BoxPrecomputedSharedKey: Send + Sync {
    /// Encrypt and authenticate `plaintext`.
    fn seal(&self, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Open a box produced by [`seal`](Self::seal).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::DecryptionFailed`] on any authentication
    /// failure.
    fn open(&self, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// A Curve25519 secret key capability.
pub trait BoxSecretKey: Send + Sync {
    /// The corresponding public key.
    fn public_key(&self) -> Box<dyn BoxPublicKey>;

    /// Box `plaintext` for `peer`.
    fn seal_box(&self, peer: &dyn BoxPublicKey, nonce: &Nonce, plaintext: &[u8])
        -> Result<Vec<u8>>;

    /// Open a box from `peer`.
    fn open_box(&self, peer: &dyn BoxPublicKey, nonce: &Nonce, ciphertext: &[u8])
        -> Result<Vec<u8>>;

    /// Precompute the shared key with `peer`.
    fn precompute(&self, peer: &dyn BoxPublicKey) -> Box<dyn BoxPrecomputedSharedKey>;

    /// Clone into an owned trait object.
    fn clone_boxed(&self) -> Box<dyn BoxSecretKey>;
}

/// Constant-time equality over two public keys' ids.
pub fn box_public_keys_equal(a: &dyn BoxPublicKey, b: &dyn BoxPublicKey) -> bool {
    let (ka, kb) = (a.to_kid(), b.to_kid());
    ka.len() == kb.len() && bool::from(ka.ct_eq(&kb))
}

/// An in-memory Curve25519 public key.
#[derive(Clone)]
pub struct BoxPublic {
    raw: RawBoxKey,
    hide: bool,
}

impl BoxPublic {
    /// Wrap raw key material.
    pub fn new(raw: RawBoxKey) -> Self {
        Self { raw, hide: false }
    }

    /// Wrap raw key material for a receiver that hides its identity.
    pub fn new_hidden(raw: RawBoxKey) -> Self {
        Self { raw, hide: true }
    }

    /// Parse from a key id.
    ///
    /// # Errors
    ///
    /// Returns an error if `kid` is not exactly 32 bytes.
    pub fn from_kid(kid: &[u8]) -> Result<Self> {
        Ok(Self::new(RawBoxKey::from_slice(kid)?))
    }
}

impl std::fmt::Debug for BoxPublic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxPublic")
            .field("raw", &self.raw)
            .field("hide", &self.hide)
            .finish()
    }
}

impl BoxPublicKey for BoxPublic {
    fn to_kid(&self) -> Vec<u8> {
        self.raw.0.to_vec()
    }

    fn raw(&self) -> &RawBoxKey {
        &self.raw
    }

    fn hide_identity(&self) -> bool {
        self.hide
    }

    fn clone_boxed(&self) -> Box<dyn BoxPublicKey> {
        Box::new(self.clone())
    }
}

/// An in-memory Curve25519 keypair.
///
/// The secret half zeroizes on drop (courtesy of `crypto_box`).
#[derive(Clone)]
pub struct BoxKeyPair {
    secret: crypto_box::SecretKey,
    public: BoxPublic,
}

impl BoxKeyPair {
    /// Generate a fresh keypair from the supplied CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InsufficientRandomness`] on a short CSPRNG
    /// read.
    pub fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Result<Self> {
        let mut bytes = [0u8; BOX_KEY_SIZE];
        csprng::random_fill(rng, &mut bytes)?;
        Ok(Self::from_secret_bytes(bytes, false))
    }

    /// Generate a keypair whose public half hides its identity in headers.
    pub fn generate_hidden<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Result<Self> {
        let mut pair = Self::generate(rng)?;
        pair.public.hide = true;
        Ok(pair)
    }

    /// Reconstruct a keypair from secret key bytes.
    pub fn from_secret_bytes(bytes: [u8; BOX_KEY_SIZE], hide: bool) -> Self {
        let secret = crypto_box::SecretKey::from(bytes);
        let raw = RawBoxKey(*secret.public_key().as_bytes());
        Self {
            secret,
            public: BoxPublic { raw, hide },
        }
    }

    fn shared_with(&self, peer: &dyn BoxPublicKey) -> SalsaBox {
        let peer_pk = crypto_box::PublicKey::from(*peer.raw().as_array());
        SalsaBox::new(&peer_pk, &self.secret)
    }
}

impl std::fmt::Debug for BoxKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BoxKeyPair {{ public: {:?}, secret: [REDACTED] }}", self.public)
    }
}

impl BoxSecretKey for BoxKeyPair {
    fn public_key(&self) -> Box<dyn BoxPublicKey> {
        Box::new(self.public.clone())
    }

    fn seal_box(
        &self,
        peer: &dyn BoxPublicKey,
        nonce: &Nonce,
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        seal_with(&self.shared_with(peer), nonce, plaintext)
    }

    fn open_box(
        &self,
        peer: &dyn BoxPublicKey,
        nonce: &Nonce,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        open_with(&self.shared_with(peer), nonce, ciphertext)
    }

    fn precompute(&self, peer: &dyn BoxPublicKey) -> Box<dyn BoxPrecomputedSharedKey> {
        Box::new(PrecomputedBox {
            inner: self.shared_with(peer),
        })
    }

    fn clone_boxed(&self) -> Box<dyn BoxSecretKey> {
        Box::new(self.clone())
    }
}

/// The crypto_box-backed precomputed shared key.
pub struct PrecomputedBox {
    inner: SalsaBox,
}

impl BoxPrecomputedSharedKey for PrecomputedBox {
    fn seal(&self, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>> {
        seal_with(&self.inner, nonce, plaintext)
    }

    fn open(&self, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
        open_with(&self.inner, nonce, ciphertext)
    }
}

fn seal_with(salsa: &SalsaBox, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut buf = plaintext.to_vec();
    let tag = salsa
        .encrypt_in_place_detached(GenericArray::from_slice(nonce.as_array()), &[], &mut buf)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    buf.extend_from_slice(tag.as_slice());
    Ok(buf)
}

fn open_with(salsa: &SalsaBox, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < BOX_OVERHEAD {
        return Err(CryptoError::DecryptionFailed);
    }
    let (body, tag) = ciphertext.split_at(ciphertext.len() - BOX_OVERHEAD);
    let mut buf = body.to_vec();
    salsa
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce.as_array()),
            &[],
            &mut buf,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| CryptoError::DecryptionFailed)?;
    Ok(buf)
}
