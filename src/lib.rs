//! Commitment-update engine for Lightning payment channels.
//!
//! The crate implements the pure state layer of a payment channel: a
//! [`Commitments`] value describing the bilaterally signed state shared with
//! one peer, together with the protocol operations that add, settle and
//! revoke HTLCs on it. Each operation consumes the current state and returns
//! a new one plus the wire message to send, without performing any I/O —
//! transport, persistence and scheduling belong to the embedding node.

// Re-export commonly used external types
pub use bitcoin::secp256k1::{All, PublicKey, Secp256k1, SecretKey};
pub use bitcoin::Network;

pub mod channel;
pub mod keys;
pub mod messages;
pub mod scripts;
pub mod transactions;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use channel::changes::{LocalChanges, RemoteChanges};
pub use channel::commitments::{
    make_local_txs, make_remote_txs, Commitments, LocalCommit, LocalParams, PublishableTxs,
    RemoteCommit, RemoteNextCommitInfo, RemoteParams, SignedHtlcSuccess,
};
pub use channel::policy::{ChannelPolicy, PolicyError};
pub use channel::spec::{CommitmentSpec, Htlc, SpecError};
pub use channel::{ChannelError, CmdAddHtlc, CmdFailHtlc, CmdFulfillHtlc};
pub use keys::commitment::{
    derive_private_key, derive_public_key, derive_revocation_private_key,
    derive_revocation_public_key,
};
pub use keys::derivation::{
    build_commitment_secret, per_commitment_point, per_commitment_secret,
    INITIAL_COMMITMENT_NUMBER,
};
pub use keys::shachain::{ShaChain, ShaChainError};
pub use messages::{
    CommitSig, ErrorMessage, OpenChannel, RevokeAndAck, UpdateAddHtlc, UpdateFailHtlc,
    UpdateFulfillHtlc, UpdateMessage,
};
pub use types::{
    ChannelBasepoints, ChannelKeyManager, CommitmentKeys, FundingUtxo, HtlcDirection,
    HtlcOutputInfo, KeyFamily, KeysManager,
};
