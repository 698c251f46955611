pub mod scheme;

pub use scheme::{Commitment, CommitmentScheme, COMMITMENT_LEN};

use crate::moves::Move;
use rand::RngCore;
use rps_core::Identity;
use sha2::{Digest, Sha256};

/// Domain separator for move commitments.
const COMMITMENT_DOMAIN: &[u8] = b"RPS_ESCROW_COMMIT_V1";

/// SHA-256 over (domain, identity, move, secret). Binding the identity means a
/// commitment copied from the opponent never verifies for the copier.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityBoundCommitment;

impl CommitmentScheme for IdentityBoundCommitment {
    fn commit(identity: &Identity, mv: Move, secret: &[u8]) -> Commitment {
        let mut hasher = Sha256::new();
        hasher.update(COMMITMENT_DOMAIN);
        // Length prefixes keep (identity, secret) boundaries unambiguous
        hasher.update((identity.as_bytes().len() as u64).to_be_bytes());
        hasher.update(identity.as_bytes());
        hasher.update([mv.code()]);
        hasher.update((secret.len() as u64).to_be_bytes());
        hasher.update(secret);
        Commitment::from_bytes(hasher.finalize().into())
    }
}

pub fn commit_hash(identity: &Identity, mv: Move, secret: Option<&[u8]>) -> Commitment {
    IdentityBoundCommitment::commit(identity, mv, secret.unwrap_or_default())
}

pub fn verify(commitment: &Commitment, identity: &Identity, code: u8, secret: Option<&[u8]>) -> bool {
    IdentityBoundCommitment::verify(commitment, identity, code, secret.unwrap_or_default())
}

/// Rnd secret for commitment
pub fn generate_secret() -> Vec<u8> {
    let mut secret = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::UNSET_MOVE;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    #[test]
    fn test_commitment_verifies_for_owner() {
        let alice = id("alice");
        let secret = generate_secret();

        for mv in Move::ALL {
            let commitment = commit_hash(&alice, mv, Some(secret.as_slice()));
            assert!(verify(&commitment, &alice, mv.code(), Some(secret.as_slice())));
        }

        let bare = commit_hash(&alice, Move::Paper, None);
        assert!(verify(&bare, &alice, Move::Paper.code(), None));
    }

    #[test]
    fn test_commitment_is_identity_bound() {
        let secret = generate_secret();
        let commitment = commit_hash(&id("alice"), Move::Rock, Some(secret.as_slice()));

        assert!(!verify(&commitment, &id("bob"), Move::Rock.code(), Some(secret.as_slice())));
    }

    #[test]
    fn test_wrong_move_or_secret_fails() {
        let alice = id("alice");
        let secret = generate_secret();
        let commitment = commit_hash(&alice, Move::Rock, Some(secret.as_slice()));

        assert!(!verify(&commitment, &alice, Move::Paper.code(), Some(secret.as_slice())));
        assert!(!verify(&commitment, &alice, Move::Rock.code(), Some(b"wrong secret".as_slice())));
        assert!(!verify(&commitment, &alice, Move::Rock.code(), None));
    }

    #[test]
    fn test_invalid_codes_fail_closed() {
        let alice = id("alice");
        let commitment = commit_hash(&alice, Move::Rock, None);

        assert!(!verify(&commitment, &alice, UNSET_MOVE, None));
        assert!(!verify(&commitment, &alice, 7, None));
    }

    #[test]
    fn test_hex_roundtrip() {
        let commitment = commit_hash(&id("alice"), Move::Scissors, None);
        let parsed: Commitment = commitment.to_hex().parse().unwrap();
        assert_eq!(parsed, commitment);
        assert!("abcd".parse::<Commitment>().is_err());
    }
}
