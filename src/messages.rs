//! Decoded peer messages consumed and produced by the commitment engine.
//!
//! Byte layouts belong to the adjacent wire codec; the engine only ever sees
//! these decoded values.

use bitcoin::secp256k1::ecdsa::Signature;
use bitcoin::secp256k1::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};

/// Proposal to open a channel, sent by the would-be funder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenChannel {
    /// The channel ID
    pub channel_id: u64,

    /// The channel value
    pub funding_satoshis: u64,

    /// The amount pushed to the counterparty as part of the open, in
    /// millisatoshi
    pub push_msat: u64,

    /// The threshold below which outputs on transactions broadcast by the
    /// sender will be omitted
    pub dust_limit_satoshis: u64,

    /// The minimum value unencumbered by HTLCs the counterparty must keep in
    /// the channel
    pub channel_reserve_satoshis: u64,

    /// The minimum HTLC size incoming to the sender, in millisatoshi
    pub htlc_minimum_msat: u64,

    /// The fee rate per 1000-weight of sender-generated transactions
    pub feerate_per_kw: u64,

    /// The number of blocks the counterparty will have to wait to claim
    /// on-chain funds if they broadcast a commitment transaction
    pub to_self_delay: u16,

    /// The maximum number of inbound HTLCs towards the sender
    pub max_accepted_htlcs: u16,

    /// The sender's key controlling the funding transaction
    pub funding_pubkey: PublicKey,

    /// Used to derive a revocation key for transactions broadcast by the
    /// counterparty
    pub revocation_basepoint: PublicKey,

    /// Used to derive the sender's payment and HTLC keys
    pub payment_basepoint: PublicKey,

    /// Used to derive the key the sender's delayed balance pays to
    pub delayed_payment_basepoint: PublicKey,

    /// The first to-be-broadcast-by-sender commitment's per-commitment point
    pub first_per_commitment_point: PublicKey,
}

/// Offers a new HTLC to the counterparty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAddHtlc {
    /// The channel ID
    pub channel_id: u64,

    /// The HTLC ID, assigned densely and monotonically by the sender
    pub id: u64,

    /// The HTLC value in millisatoshi
    pub amount_msat: u64,

    /// The expiry height of the HTLC
    pub cltv_expiry: u32,

    /// The payment hash, the preimage of which controls HTLC redemption
    pub payment_hash: [u8; 32],

    /// Opaque routing payload for the next hop
    pub onion_routing_packet: Vec<u8>,
}

/// Settles an HTLC by revealing its payment preimage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFulfillHtlc {
    /// The channel ID
    pub channel_id: u64,

    /// The HTLC ID
    pub id: u64,

    /// The preimage of the payment hash, allowing HTLC redemption
    pub payment_preimage: [u8; 32],
}

/// Removes an HTLC, refunding it to the payer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFailHtlc {
    /// The channel ID
    pub channel_id: u64,

    /// The HTLC ID
    pub id: u64,

    /// Opaque failure reason for the benefit of the original HTLC initiator
    pub reason: Vec<u8>,
}

/// Commits to all pending changes: a signature over the counterparty's next
/// commitment transaction plus one signature per untrimmed HTLC transaction,
/// in canonical order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSig {
    /// The channel ID
    pub channel_id: u64,

    /// A signature on the commitment transaction
    pub signature: Signature,

    /// Signatures on the HTLC transactions, ordered by the commitment output
    /// index they spend
    pub htlc_signatures: Vec<Signature>,
}

/// Revokes the previous commitment by disclosing its per-commitment secret
/// and supplies the point for the one after the newly signed state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeAndAck {
    /// The channel ID
    pub channel_id: u64,

    /// The secret revoking the sender's previous commitment
    pub per_commitment_secret: SecretKey,

    /// The per-commitment point of the sender's next commitment transaction
    pub next_per_commitment_point: PublicKey,

    /// The sender's signatures on its new HTLC-timeout transactions, needed
    /// by the counterparty to claim the symmetric HTLCs
    pub htlc_timeout_signatures: Vec<Signature>,
}

/// Fatal failure notification; the channel transitions to closing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// The channel ID
    pub channel_id: u64,

    /// Human-readable diagnostic
    pub data: String,
}

/// The update messages that flow through the pending-change pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateMessage {
    Add(UpdateAddHtlc),
    Fulfill(UpdateFulfillHtlc),
    Fail(UpdateFailHtlc),
}

impl UpdateMessage {
    /// The HTLC this update concerns.
    pub fn htlc_id(&self) -> u64 {
        match self {
            UpdateMessage::Add(add) => add.id,
            UpdateMessage::Fulfill(fulfill) => fulfill.id,
            UpdateMessage::Fail(fail) => fail.id,
        }
    }

    pub fn channel_id(&self) -> u64 {
        match self {
            UpdateMessage::Add(add) => add.channel_id,
            UpdateMessage::Fulfill(fulfill) => fulfill.channel_id,
            UpdateMessage::Fail(fail) => fail.channel_id,
        }
    }
}
