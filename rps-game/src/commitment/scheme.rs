use crate::moves::Move;
use crate::{GameError, Result};
use rps_core::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const COMMITMENT_LEN: usize = 32;

/// Opaque digest binding a player to a hidden move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment([u8; COMMITMENT_LEN]);

impl Commitment {
    pub fn from_bytes(bytes: [u8; COMMITMENT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; COMMITMENT_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Commitment {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| GameError::internal(format!("Invalid commitment hex: {}", e)))?;
        let bytes: [u8; COMMITMENT_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            GameError::internal(format!(
                "Commitment must be {} bytes, got {}",
                COMMITMENT_LEN,
                b.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

/// Trait for commitment schemes
pub trait CommitmentScheme {
    fn commit(identity: &Identity, mv: Move, secret: &[u8]) -> Commitment;

    /// Fails closed: an unset or unknown move code never verifies.
    fn verify(commitment: &Commitment, identity: &Identity, code: u8, secret: &[u8]) -> bool {
        match Move::from_code(code) {
            Ok(mv) => Self::commit(identity, mv, secret) == *commitment,
            Err(_) => false,
        }
    }
}
