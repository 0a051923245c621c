use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::Hash;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ShaChainError {
    /// The provided secret cannot reproduce secrets revealed earlier.
    #[error("per-commitment secret is inconsistent with previously revealed secrets")]
    InconsistentSecret,
}

/// One stored secret. `pos` is the number of trailing zero bits of `index`;
/// a secret stored at position `pos` can re-derive every index sharing its
/// upper `64 - pos` bits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Slot {
    pos: u8,
    index: u64,
    secret: [u8; 32],
}

/// Compressed store of revealed per-commitment secrets.
///
/// Secrets arrive in decreasing index order (the engine stores the secret
/// revoking commitment `i` at index `2^64 - 1 - i`). Because all secrets come
/// from one hash tree, a secret whose index has `pos` trailing zeros subsumes
/// every previously revealed secret sharing its upper bits, so at most one
/// slot per position is ever live and any seen secret can be re-derived on
/// demand.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaChain {
    slots: Vec<Slot>,
}

impl ShaChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live slots; stays logarithmic in the number of secrets seen.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn place(index: u64) -> u8 {
        index.trailing_zeros() as u8
    }

    /// Mask selecting the bits above position `bits`.
    fn prefix_mask(bits: u8) -> u64 {
        if bits >= 64 {
            0
        } else {
            !((1u64 << bits) - 1)
        }
    }

    /// Walks the hash tree downward: flips each set bit of `index` below
    /// `bits`, highest first, hashing after each flip.
    fn derive(secret: [u8; 32], bits: u8, index: u64) -> [u8; 32] {
        let mut p = secret;
        for i in 0..bits {
            let bit_position = (bits - 1 - i) as usize;
            if index & (1 << bit_position) == (1 << bit_position) {
                p[bit_position / 8] ^= 1 << (bit_position & 7);
                p = Sha256::hash(&p).to_byte_array();
            }
        }
        p
    }

    /// Stores the secret for `index`, first checking that it reproduces every
    /// secret held in lower positions. Rejecting here catches a peer whose
    /// revealed secrets do not come from a single seed.
    pub fn insert(&mut self, index: u64, secret: [u8; 32]) -> Result<(), ShaChainError> {
        let pos = Self::place(index);
        for slot in self.slots.iter().filter(|s| s.pos < pos) {
            if Self::derive(secret, pos, slot.index) != slot.secret {
                return Err(ShaChainError::InconsistentSecret);
            }
        }
        self.slots.retain(|s| s.pos != pos);
        self.slots.push(Slot { pos, index, secret });
        self.slots.sort_by_key(|s| s.pos);
        Ok(())
    }

    /// Re-derives the secret for any index seen so far.
    pub fn get_secret(&self, index: u64) -> Option<[u8; 32]> {
        for slot in &self.slots {
            if index & Self::prefix_mask(slot.pos) == slot.index {
                return Some(Self::derive(slot.secret, slot.pos, index));
            }
        }
        None
    }
}
