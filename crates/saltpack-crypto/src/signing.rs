//! Ed25519 signing keys: capability traits and the dalek-backed
//! implementation.

use ed25519_dalek::{Signer, Verifier};
use rand_core::CryptoRngCore;

use crate::csprng;
use crate::{CryptoError, Result};

/// Size of an Ed25519 public key in bytes.
pub const SIGNING_KEY_SIZE: usize = 32;

/// Size of an Ed25519 signature in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// A signing secret key capability.
pub trait SigningSecretKey: Send + Sync {
    /// Sign `message`, returning the 64-byte signature.
    fn sign(&self, message: &[u8]) -> Result<[u8; SIGNATURE_SIZE]>;

    /// The corresponding verifying key.
    fn public_key(&self) -> Box<dyn SigningPublicKey>;
}

/// A signature-verifying public key capability.
pub trait SigningPublicKey: Send + Sync + std::fmt::Debug {
    /// Opaque key identifier. By convention the raw public key bytes.
    fn to_kid(&self) -> Vec<u8>;

    /// Verify `signature` over `message`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::BadSignature`] if the signature has the wrong
    /// length or does not verify.
    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()>;

    /// Clone into an owned trait object.
    fn clone_boxed(&self) -> Box<dyn SigningPublicKey>;
}

/// Constant-time equality over two signing keys' ids.
pub fn signing_public_keys_equal(a: &dyn SigningPublicKey, b: &dyn SigningPublicKey) -> bool {
    use subtle::ConstantTimeEq;
    let (ka, kb) = (a.to_kid(), b.to_kid());
    ka.len() == kb.len() && bool::from(ka.ct_eq(&kb))
}

/// An in-memory Ed25519 verifying key.
#[derive(Clone)]
pub struct SigningPublic {
    inner: ed25519_dalek::VerifyingKey,
}

impl SigningPublic {
    /// Parse from a key id.
    ///
    /// # Errors
    ///
    /// Fails on a wrong-length kid or bytes that are not a valid curve
    /// point.
    pub fn from_kid(kid: &[u8]) -> Result<Self> {
        let bytes: [u8; SIGNING_KEY_SIZE] =
            kid.try_into().map_err(|_| CryptoError::InvalidLength {
                expected: SIGNING_KEY_SIZE,
                actual: kid.len(),
            })?;
        let inner = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|_| CryptoError::MalformedKey)?;
        Ok(Self { inner })
    }
}

impl std::fmt::Debug for SigningPublic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = self.inner.to_bytes();
        write!(f, "SigningPublic({:02x}{:02x}..)", b[0], b[1])
    }
}

impl SigningPublicKey for SigningPublic {
    fn to_kid(&self) -> Vec<u8> {
        self.inner.to_bytes().to_vec()
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let bytes: [u8; SIGNATURE_SIZE] =
            signature.try_into().map_err(|_| CryptoError::BadSignature)?;
        let sig = ed25519_dalek::Signature::from_bytes(&bytes);
        self.inner
            .verify(message, &sig)
            .map_err(|_| CryptoError::BadSignature)
    }

    fn clone_boxed(&self) -> Box<dyn SigningPublicKey> {
        Box::new(self.clone())
    }
}

/// An in-memory Ed25519 keypair.
#[derive(Clone)]
pub struct SigningKeyPair {
    inner: ed25519_dalek::SigningKey,
}

impl SigningKeyPair {
    /// Generate a fresh keypair from the supplied CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InsufficientRandomness`] on a short CSPRNG
    /// read.
    pub fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Result<Self> {
        let mut seed = [0u8; 32];
        csprng::random_fill(rng, &mut seed)?;
        Ok(Self {
            inner: ed25519_dalek::SigningKey::from_bytes(&seed),
        })
    }

    /// The verifying half as a concrete type.
    pub fn verifying(&self) -> SigningPublic {
        SigningPublic {
            inner: self.inner.verifying_key(),
        }
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKeyPair {{ public: {:?}, secret: [REDACTED] }}", self.verifying())
    }
}

impl SigningSecretKey for SigningKeyPair {
    fn sign(&self, message: &[u8]) -> Result<[u8; SIGNATURE_SIZE]> {
        Ok(self.inner.sign(message).to_bytes())
    }

    fn public_key(&self) -> Box<dyn SigningPublicKey> {
        Box::new(self.verifying())
    }
}
