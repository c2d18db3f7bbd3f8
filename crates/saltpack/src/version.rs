//! Wire versions, message types, and version acceptance policy.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A saltpack wire version.
///
/// Two majors are defined. Minor bumps are forward compatible: a validator
/// may accept any equal-or-newer minor of the major it expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Major version; framing differences live here.
    pub major: u32,
    /// Minor version; reserved for compatible extensions.
    pub minor: u32,
}

impl Version {
    /// Version 1.0.
    pub const V1: Version = Version { major: 1, minor: 0 };

    /// Version 2.0.
    pub const V2: Version = Version { major: 2, minor: 0 };

    /// Whether this is a major this implementation knows how to frame.
    pub fn is_known_major(&self) -> bool {
        self.major == 1 || self.major == 2
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// The message type tag carried in every header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    /// Multi-receiver authenticated encryption.
    Encryption,
    /// Signature interleaved with the payload it covers.
    AttachedSignature,
    /// Signature shipped separately from the payload.
    DetachedSignature,
    /// Combined signing and encryption.
    Signcryption,
}

impl MessageType {
    /// The wire integer for this type.
    pub fn code(self) -> i64 {
        match self {
            MessageType::Encryption => 0,
            MessageType::AttachedSignature => 1,
            MessageType::DetachedSignature => 2,
            MessageType::Signcryption => 3,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MessageType::Encryption => "encryption",
            MessageType::AttachedSignature => "attached signature",
            MessageType::DetachedSignature => "detached signature",
            MessageType::Signcryption => "signcryption",
        };
        f.write_str(name)
    }
}

/// Policy deciding which observed versions a decoder accepts.
pub trait VersionValidator {
    /// Accept or reject `observed`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadVersion`] when the version is not accepted.
    fn validate(&self, observed: Version) -> Result<()>;
}

/// Accepts one major version at a baseline minor, and any newer minor.
#[derive(Clone, Copy, Debug)]
pub struct SingleVersionValidator {
    expected: Version,
}

impl SingleVersionValidator {
    /// Build a validator around `expected`.
    pub fn new(expected: Version) -> Self {
        Self { expected }
    }
}

impl VersionValidator for SingleVersionValidator {
    fn validate(&self, observed: Version) -> Result<()> {
        if observed.major == self.expected.major && observed.minor >= self.expected.minor {
            Ok(())
        } else {
            Err(Error::BadVersion { observed })
        }
    }
}

/// Accepts every major this implementation can frame, at any minor.
#[derive(Clone, Copy, Debug, Default)]
pub struct KnownVersionValidator;

impl VersionValidator for KnownVersionValidator {
    fn validate(&self, observed: Version) -> Result<()> {
        if observed.is_known_major() {
            Ok(())
        } else {
            Err(Error::BadVersion { observed })
        }
    }
}
