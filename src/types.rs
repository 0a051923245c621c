use bitcoin::bip32::Xpriv;
use bitcoin::script::ScriptBuf;
use bitcoin::secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use bitcoin::{Network, OutPoint};
use serde::{Deserialize, Serialize};

// KEY FAMILY ENUM
// ============================================================================

/// BIP32 key families used to derive channel keys, one hardened child per
/// family under `m/1017'/0'/<family>'/0/<channel>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    MultiSig = 0,
    RevocationBase = 1,
    PaymentBase = 2,
    DelayBase = 3,
    CommitmentSeed = 4,
}

// KEY MANAGEMENT STRUCTURES
// ============================================================================

/// Root of key derivation for a node; hands out per-channel key sets.
pub struct KeysManager {
    pub secp_ctx: Secp256k1<All>,
    pub master_key: Xpriv,
    pub network: Network,
}

/// The secret keys backing one channel.
///
/// In this protocol generation the payment base key doubles as the HTLC base
/// key: HTLC script keys and HTLC signatures are both derived from it.
pub struct ChannelKeyManager {
    /// Secret key used to sign commitment transactions
    pub funding_key: SecretKey,
    /// Base secret used to derive per-commitment revocation keys
    pub revocation_basepoint_secret: SecretKey,
    /// Base secret for the payment and HTLC keys
    pub payment_basepoint_secret: SecretKey,
    /// Base secret used to derive per-commitment delayed payment keys
    pub delayed_payment_basepoint_secret: SecretKey,
    /// Seed used to generate per-commitment secrets and points
    pub commitment_seed: [u8; 32],
    /// Secp256k1 context for cryptographic operations
    pub secp_ctx: Secp256k1<All>,
}

/// Channel public keys which do not change over the life of a channel.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBasepoints {
    /// Public key used to sign commitment transactions
    pub funding_pubkey: PublicKey,
    /// Base point used to derive per-commitment revocation keys
    pub revocation_basepoint: PublicKey,
    /// Base point for the payment and HTLC keys
    pub payment_basepoint: PublicKey,
    /// Base point used to derive per-commitment delayed payment keys
    pub delayed_payment_basepoint: PublicKey,
}

// COMMITMENT KEYS STRUCTURE
// ============================================================================

/// The set of public keys used in the creation of one commitment transaction,
/// derived from the channel basepoints and the per-commitment point. "Local"
/// here always means the owner of the commitment being built.
#[derive(Clone, Debug)]
pub struct CommitmentKeys {
    /// The per-commitment point the other keys are derived from
    pub per_commitment_point: PublicKey,

    /// The revocation key which allows the broadcaster's counterparty to
    /// punish them if they broadcast an old state
    pub revocation_key: PublicKey,

    /// Owner's HTLC key (derived from the owner's payment basepoint)
    pub local_htlc_key: PublicKey,

    /// Counterparty's HTLC key (derived from their payment basepoint)
    pub remote_htlc_key: PublicKey,

    /// Owner's delayed payment key (for the to_local output)
    pub local_delayed_payment_key: PublicKey,

    /// Counterparty's payment key (for the to_remote output)
    pub remote_payment_key: PublicKey,
}

// FUNDING OUTPOINT
// ============================================================================

/// The 2-of-2 funding output both commitment lineages spend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingUtxo {
    pub outpoint: OutPoint,
    /// The 2-of-2 multisig redeem script of the funding output
    pub redeem_script: ScriptBuf,
    pub amount_sat: u64,
}

// HTLC STRUCTURES
// ============================================================================

/// Direction of an HTLC relative to the owner of the commitment it sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HtlcDirection {
    /// The owner is paying: resolved against them by preimage, for them by
    /// timeout
    Offered,
    /// The owner is being paid
    Received,
}

/// The data a commitment output needs to carry for one HTLC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtlcOutputInfo {
    pub direction: HtlcDirection,
    pub htlc_id: u64,
    pub amount_msat: u64,
    pub payment_hash: [u8; 32],
    pub cltv_expiry: u32,
}

// OUTPUT SORTING STRUCTURES
// ============================================================================

/// A commitment output before serialization, with the metadata needed to
/// build and sign the second-level transaction that may spend it.
#[derive(Debug, Clone)]
pub struct OutputWithMetadata {
    pub value_sat: u64,
    pub script_pubkey: ScriptBuf,
    /// Witness script of the output, when it is a p2wsh
    pub witness_script: Option<ScriptBuf>,
    pub cltv_expiry: Option<u32>,
    /// Set when the output belongs to an HTLC
    pub htlc: Option<HtlcOutputInfo>,
}
