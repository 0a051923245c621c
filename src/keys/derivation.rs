use std::str::FromStr;

use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use bitcoin::Network;

use crate::types::{ChannelBasepoints, ChannelKeyManager, KeyFamily, KeysManager};

/// The down-counting index of the first per-commitment secret. Commitment
/// numbers are 48 bits on the wire; commitment `n` uses secret index
/// `INITIAL_COMMITMENT_NUMBER - n`.
pub const INITIAL_COMMITMENT_NUMBER: u64 = (1 << 48) - 1;

impl KeysManager {
    /// Creates a key manager from a 32-byte seed.
    pub fn new(seed: [u8; 32], network: Network) -> Self {
        let secp_ctx = Secp256k1::new();
        let master_key =
            Xpriv::new_master(network, &seed).expect("the seed is 32 bytes, within BIP32 bounds");
        KeysManager {
            secp_ctx,
            master_key,
            network,
        }
    }

    /// Derives the secret of one key family for one channel:
    /// `m/1017'/0'/<key_family>'/0/<channel_index>`.
    pub fn derive_key(&self, key_family: KeyFamily, channel_index: u32) -> SecretKey {
        let path_str = format!("m/1017'/0'/{}'/0/{}", key_family as u32, channel_index);
        let path = DerivationPath::from_str(&path_str).expect("valid derivation path");

        let derived = self
            .master_key
            .derive_priv(&self.secp_ctx, &path)
            .expect("valid derivation");

        derived.private_key
    }

    /// Derives the full key set for one channel.
    pub fn derive_channel_keys(&self, channel_index: u32) -> ChannelKeyManager {
        let funding_key = self.derive_key(KeyFamily::MultiSig, channel_index);
        let revocation_basepoint_secret = self.derive_key(KeyFamily::RevocationBase, channel_index);
        let payment_basepoint_secret = self.derive_key(KeyFamily::PaymentBase, channel_index);
        let delayed_payment_basepoint_secret = self.derive_key(KeyFamily::DelayBase, channel_index);

        // The commitment seed is raw hash-ladder input, not a curve scalar
        let commitment_seed = self
            .derive_key(KeyFamily::CommitmentSeed, channel_index)
            .secret_bytes();

        ChannelKeyManager {
            funding_key,
            revocation_basepoint_secret,
            payment_basepoint_secret,
            delayed_payment_basepoint_secret,
            commitment_seed,
            secp_ctx: self.secp_ctx.clone(),
        }
    }
}

/// Runs the flip-and-hash ladder over the 48-bit down-counting index `idx`.
pub fn build_commitment_secret(seed: &[u8; 32], idx: u64) -> [u8; 32] {
    let mut p = *seed;
    for i in 0..48 {
        let bit_position = 47 - i;
        if idx & (1 << bit_position) == (1 << bit_position) {
            p[bit_position / 8] ^= 1 << (bit_position & 7);
            p = Sha256::hash(&p).to_byte_array();
        }
    }
    p
}

/// Per-commitment secret for the up-counting commitment index used by the
/// channel state machine.
pub fn per_commitment_secret(seed: &[u8; 32], index: u64) -> SecretKey {
    debug_assert!(index <= INITIAL_COMMITMENT_NUMBER);
    let raw = build_commitment_secret(seed, INITIAL_COMMITMENT_NUMBER - index);
    SecretKey::from_slice(&raw).expect("hash outputs are valid secret keys unless SHA-256 is broken")
}

/// Per-commitment point for the up-counting commitment index.
pub fn per_commitment_point(secp_ctx: &Secp256k1<All>, seed: &[u8; 32], index: u64) -> PublicKey {
    PublicKey::from_secret_key(secp_ctx, &per_commitment_secret(seed, index))
}

impl ChannelKeyManager {
    /// The public half of the channel key set.
    pub fn basepoints(&self) -> ChannelBasepoints {
        ChannelBasepoints {
            funding_pubkey: PublicKey::from_secret_key(&self.secp_ctx, &self.funding_key),
            revocation_basepoint: PublicKey::from_secret_key(
                &self.secp_ctx,
                &self.revocation_basepoint_secret,
            ),
            payment_basepoint: PublicKey::from_secret_key(
                &self.secp_ctx,
                &self.payment_basepoint_secret,
            ),
            delayed_payment_basepoint: PublicKey::from_secret_key(
                &self.secp_ctx,
                &self.delayed_payment_basepoint_secret,
            ),
        }
    }

    pub fn per_commitment_secret(&self, index: u64) -> SecretKey {
        per_commitment_secret(&self.commitment_seed, index)
    }

    pub fn per_commitment_point(&self, index: u64) -> PublicKey {
        per_commitment_point(&self.secp_ctx, &self.commitment_seed, index)
    }
}
