//! Ledger identities: base58 account addresses and serialized public keys.
//!
//! Addresses are 25 bytes before base58 encoding: a version byte, the 20-byte
//! program hash, and the first four bytes of a double SHA-256 over the
//! preceding 21 bytes.
//!
//! Public keys use the ledger's serialization. A bare SEC1 point (leading
//! `0x02`, `0x03` or `0x04`) is an ECDSA P-256 key. Otherwise the first byte
//! names the algorithm and the second the curve or scheme. Every point is
//! decoded onto its curve; well-framed bytes that are not a curve point are
//! rejected.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

const ADDRESS_VERSION: u8 = 0x17;
const ADDRESS_LEN: usize = 25;
const HASH_LEN: usize = 20;

const TAG_ECDSA: u8 = 0x12;
const TAG_SM2: u8 = 0x13;
const TAG_EDDSA: u8 = 0x14;

const CURVE_P224: u8 = 1;
const CURVE_P256: u8 = 2;
const CURVE_P384: u8 = 3;
const CURVE_P521: u8 = 4;
const CURVE_SM2P256V1: u8 = 20;
const CURVE_ED25519: u8 = 25;

/// Errors produced while parsing an identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Not valid base58.
    #[error("invalid base58: {0}")]
    Base58(String),

    /// Not valid hex.
    #[error("invalid hex: {0}")]
    Hex(String),

    /// Decoded to the wrong number of bytes.
    #[error("expected {expected} bytes, got {actual}")]
    Length {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Address version byte is not the ledger's.
    #[error("unknown address version 0x{0:02x}")]
    Version(u8),

    /// Address checksum does not match its payload.
    #[error("address checksum mismatch")]
    Checksum,

    /// Unknown key algorithm tag.
    #[error("unknown key algorithm 0x{0:02x}")]
    Algorithm(u8),

    /// Unknown curve for the key's algorithm.
    #[error("unknown curve {0}")]
    Curve(u8),

    /// Point encoding is malformed.
    #[error("malformed public key point")]
    Point,
}

/// A base58 ledger account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; HASH_LEN]);

impl Address {
    /// Build an address from its 20-byte program hash.
    #[must_use]
    pub const fn from_hash(hash: [u8; HASH_LEN]) -> Self {
        Self(hash)
    }

    /// Parse and verify a base58 address.
    pub fn from_base58(s: &str) -> Result<Self, IdentityError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| IdentityError::Base58(e.to_string()))?;

        if bytes.len() != ADDRESS_LEN {
            return Err(IdentityError::Length {
                expected: ADDRESS_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[0] != ADDRESS_VERSION {
            return Err(IdentityError::Version(bytes[0]));
        }

        let (payload, checksum) = bytes.split_at(1 + HASH_LEN);
        if checksum != &double_sha256(payload)[..4] {
            return Err(IdentityError::Checksum);
        }

        let mut hash = [0u8; HASH_LEN];
        hash.copy_from_slice(&payload[1..]);
        Ok(Self(hash))
    }

    /// Encode as base58 with version byte and checksum.
    #[must_use]
    pub fn to_base58(&self) -> String {
        let mut bytes = Vec::with_capacity(ADDRESS_LEN);
        bytes.push(ADDRESS_VERSION);
        bytes.extend_from_slice(&self.0);
        let checksum = double_sha256(&bytes);
        bytes.extend_from_slice(&checksum[..4]);
        bs58::encode(bytes).into_string()
    }

    /// The 20-byte program hash.
    #[must_use]
    pub const fn hash(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

fn double_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

/// Signature scheme a public key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// ECDSA over a NIST curve.
    Ecdsa,
    /// SM2 over sm2p256v1.
    Sm2,
    /// Ed25519.
    EdDsa,
}

/// A structurally validated serialized public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    algorithm: KeyAlgorithm,
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Parse a hex-encoded serialized public key.
    pub fn from_hex(s: &str) -> Result<Self, IdentityError> {
        let bytes = hex::decode(s).map_err(|e| IdentityError::Hex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a serialized public key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        let Some((&tag, rest)) = bytes.split_first() else {
            return Err(IdentityError::Point);
        };

        let algorithm = match tag {
            0x02..=0x04 => {
                check_point(bytes, 32)?;
                decode_point(CURVE_P256, bytes)?;
                KeyAlgorithm::Ecdsa
            }
            TAG_ECDSA => {
                let (&curve, point) = rest.split_first().ok_or(IdentityError::Point)?;
                let coord_len = match curve {
                    CURVE_P224 => 28,
                    CURVE_P256 => 32,
                    CURVE_P384 => 48,
                    CURVE_P521 => 66,
                    other => return Err(IdentityError::Curve(other)),
                };
                check_point(point, coord_len)?;
                decode_point(curve, point)?;
                KeyAlgorithm::Ecdsa
            }
            TAG_SM2 => {
                let (&curve, point) = rest.split_first().ok_or(IdentityError::Point)?;
                if curve != CURVE_SM2P256V1 {
                    return Err(IdentityError::Curve(curve));
                }
                check_point(point, 32)?;
                decode_point(CURVE_SM2P256V1, point)?;
                KeyAlgorithm::Sm2
            }
            TAG_EDDSA => {
                let (&scheme, point) = rest.split_first().ok_or(IdentityError::Point)?;
                if scheme != CURVE_ED25519 {
                    return Err(IdentityError::Curve(scheme));
                }
                let point: [u8; 32] = point.try_into().map_err(|_| IdentityError::Length {
                    expected: 32,
                    actual: point.len(),
                })?;
                ed25519_dalek::VerifyingKey::from_bytes(&point)
                    .map_err(|_| IdentityError::Point)?;
                KeyAlgorithm::EdDsa
            }
            other => return Err(IdentityError::Algorithm(other)),
        };

        Ok(Self {
            algorithm,
            bytes: bytes.to_vec(),
        })
    }

    /// The key's signature scheme.
    #[must_use]
    pub const fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Serialized key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Serialized key as lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

/// Check SEC1 point framing: compressed `02|03 ‖ x` or uncompressed `04 ‖ x ‖ y`.
fn check_point(point: &[u8], coord_len: usize) -> Result<(), IdentityError> {
    let expected = match point.first() {
        Some(0x02 | 0x03) => 1 + coord_len,
        Some(0x04) => 1 + 2 * coord_len,
        _ => return Err(IdentityError::Point),
    };
    if point.len() == expected {
        Ok(())
    } else {
        Err(IdentityError::Length {
            expected,
            actual: point.len(),
        })
    }
}

/// Decode a framed SEC1 point onto `curve`.
fn decode_point(curve: u8, point: &[u8]) -> Result<(), IdentityError> {
    let on_curve = match curve {
        CURVE_P224 => p224::PublicKey::from_sec1_bytes(point).is_ok(),
        CURVE_P256 => p256::PublicKey::from_sec1_bytes(point).is_ok(),
        CURVE_P384 => p384::PublicKey::from_sec1_bytes(point).is_ok(),
        CURVE_P521 => p521::PublicKey::from_sec1_bytes(point).is_ok(),
        CURVE_SM2P256V1 => sm2::PublicKey::from_sec1_bytes(point).is_ok(),
        other => return Err(IdentityError::Curve(other)),
    };
    if on_curve {
        Ok(())
    } else {
        Err(IdentityError::Point)
    }
}
