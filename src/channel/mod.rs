pub mod changes;
pub mod commitments;
pub mod policy;
pub mod spec;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::ErrorMessage;

/// Failures of the commitment engine.
///
/// Command-originated failures leave the channel usable; peer-originated
/// signature, revocation and ordering failures are fatal and must take the
/// channel to closing (see [`ChannelError::is_fatal`]).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The proposer cannot afford the HTLC in the relevant commitment.
    #[error("insufficient funds for htlc")]
    InsufficientFunds,

    /// A settle or fail referenced an HTLC absent from the signed state.
    #[error("unknown htlc id {0}")]
    UnknownHtlc(u64),

    /// The preimage does not hash to the HTLC's payment hash.
    #[error("invalid payment preimage for htlc {0}")]
    InvalidPreimage(u64),

    /// Signing requested with an empty pending-change pipeline.
    #[error("cannot sign: no pending changes")]
    CannotSignNoChanges,

    /// Signing requested while the previous remote commitment is still
    /// unrevoked.
    #[error("cannot sign: awaiting revocation of previous commitment")]
    CannotSignAwaitingRevoke,

    /// The peer's signature does not cover our commitment transaction.
    #[error("invalid commitment signature")]
    InvalidCommitSignature,

    /// A peer HTLC signature does not cover the corresponding HTLC
    /// transaction.
    #[error("invalid htlc signature")]
    InvalidHtlcSignature,

    /// The peer sent the wrong number of HTLC signatures.
    #[error("htlc signature count mismatch: expected {expected}, got {got}")]
    HtlcSigCountMismatch { expected: usize, got: usize },

    /// The revealed secret does not match the commitment it claims to
    /// revoke.
    #[error("invalid revocation: secret does not match per-commitment point")]
    InvalidRevocation,

    /// A revocation arrived while no signed commitment was outstanding.
    #[error("unexpected revocation: no outstanding commitment")]
    UnexpectedRevocation,

    /// The peer broke the dense monotonic HTLC id discipline.
    #[error("unexpected htlc id: expected {expected}, got {got}")]
    UnexpectedHtlcId { expected: u64, got: u64 },
}

impl ChannelError {
    /// Whether this failure must close the channel. Local command failures
    /// are recoverable; anything evidencing a misbehaving or incompatible
    /// peer is not.
    pub fn is_fatal(&self) -> bool {
        match self {
            ChannelError::InsufficientFunds
            | ChannelError::UnknownHtlc(_)
            | ChannelError::InvalidPreimage(_)
            | ChannelError::CannotSignNoChanges
            | ChannelError::CannotSignAwaitingRevoke => false,
            ChannelError::InvalidCommitSignature
            | ChannelError::InvalidHtlcSignature
            | ChannelError::HtlcSigCountMismatch { .. }
            | ChannelError::InvalidRevocation
            | ChannelError::UnexpectedRevocation
            | ChannelError::UnexpectedHtlcId { .. } => true,
        }
    }

    /// Renders the wire error the owning state machine sends before moving
    /// the channel to closing.
    pub fn into_wire(self, channel_id: u64) -> ErrorMessage {
        ErrorMessage {
            channel_id,
            data: self.to_string(),
        }
    }
}

// COMMANDS
// ============================================================================
// Requests from the owning node. Signing carries no payload (it is the
// parameterless send_commit), and the co-operative close handshake lives
// outside the engine.

/// Offer a new HTLC to the peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmdAddHtlc {
    pub amount_msat: u64,
    pub cltv_expiry: u32,
    pub payment_hash: [u8; 32],
    pub onion_routing_packet: Vec<u8>,
}

/// Settle an incoming HTLC whose preimage we learned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmdFulfillHtlc {
    pub id: u64,
    pub payment_preimage: [u8; 32],
}

/// Fail an incoming HTLC back to the payer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmdFailHtlc {
    pub id: u64,
    pub reason: Vec<u8>,
}
