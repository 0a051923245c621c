use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::Hash;
use bitcoin::script::ScriptBuf;
use bitcoin::secp256k1::ecdsa::Signature;
use bitcoin::secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use bitcoin::{Transaction, Txid};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::channel::changes::{LocalChanges, RemoteChanges};
use crate::channel::spec::{CommitmentSpec, SpecError};
use crate::channel::{ChannelError, CmdAddHtlc, CmdFailHtlc, CmdFulfillHtlc};
use crate::keys::commitment::{derive_private_key, derive_public_key};
use crate::keys::derivation::{per_commitment_point, per_commitment_secret};
use crate::keys::shachain::ShaChain;
use crate::messages::{
    CommitSig, RevokeAndAck, UpdateAddHtlc, UpdateFailHtlc, UpdateFulfillHtlc, UpdateMessage,
};
use crate::transactions::commitment::{
    commitment_number_obscure_factor, create_commitment_transaction,
};
use crate::transactions::htlc::{create_htlc_transactions, HtlcSuccessTx, HtlcTimeoutTx};
use crate::transactions::sign::{create_funding_witness, sign_input, verify_input_signature};
use crate::types::{ChannelKeyManager, CommitmentKeys, FundingUtxo, HtlcDirection};

// CHANNEL PARAMETERS
// ============================================================================

/// Our static channel parameters. `sha_seed` and the basepoint secrets never
/// leave this struct; the owning node must keep the persisted form as
/// protected as its wallet keys and drop it when the channel is archived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalParams {
    /// Outputs under this value are omitted from commitments we broadcast
    pub dust_limit_sat: u64,
    /// Blocks the *counterparty* must wait to claim their to_local output
    /// (we chose this value during the handshake)
    pub to_self_delay: u16,
    pub funding_key: SecretKey,
    pub revocation_basepoint_secret: SecretKey,
    /// Also the base of our HTLC keys
    pub payment_basepoint_secret: SecretKey,
    pub delayed_payment_basepoint_secret: SecretKey,
    /// Seed of our per-commitment secret chain; never transmitted
    pub sha_seed: [u8; 32],
    pub is_funder: bool,
}

impl LocalParams {
    /// Assembles parameters from a channel key set.
    pub fn from_key_manager(
        keys: &ChannelKeyManager,
        dust_limit_sat: u64,
        to_self_delay: u16,
        is_funder: bool,
    ) -> Self {
        LocalParams {
            dust_limit_sat,
            to_self_delay,
            funding_key: keys.funding_key,
            revocation_basepoint_secret: keys.revocation_basepoint_secret,
            payment_basepoint_secret: keys.payment_basepoint_secret,
            delayed_payment_basepoint_secret: keys.delayed_payment_basepoint_secret,
            sha_seed: keys.commitment_seed,
            is_funder,
        }
    }

    pub fn funding_pubkey(&self, secp_ctx: &Secp256k1<All>) -> PublicKey {
        PublicKey::from_secret_key(secp_ctx, &self.funding_key)
    }

    pub fn revocation_basepoint(&self, secp_ctx: &Secp256k1<All>) -> PublicKey {
        PublicKey::from_secret_key(secp_ctx, &self.revocation_basepoint_secret)
    }

    pub fn payment_basepoint(&self, secp_ctx: &Secp256k1<All>) -> PublicKey {
        PublicKey::from_secret_key(secp_ctx, &self.payment_basepoint_secret)
    }

    pub fn delayed_payment_basepoint(&self, secp_ctx: &Secp256k1<All>) -> PublicKey {
        PublicKey::from_secret_key(secp_ctx, &self.delayed_payment_basepoint_secret)
    }
}

/// The peer's static channel parameters, as announced in the opening
/// handshake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteParams {
    /// Outputs under this value are omitted from commitments the peer
    /// broadcasts
    pub dust_limit_sat: u64,
    /// Blocks *we* must wait to claim our to_local output (the peer chose
    /// this value)
    pub to_self_delay: u16,
    pub funding_pubkey: PublicKey,
    pub revocation_basepoint: PublicKey,
    /// Also the base of the peer's HTLC keys
    pub payment_basepoint: PublicKey,
    pub delayed_payment_basepoint: PublicKey,
    pub is_funder: bool,
}

// PER-COMMITMENT STATE
// ============================================================================

/// An HTLC-success transaction carrying both signatures, broadcastable as
/// soon as the payment preimage is known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedHtlcSuccess {
    pub txinfo: HtlcSuccessTx,
    pub remote_sig: Signature,
    pub local_sig: Signature,
}

impl SignedHtlcSuccess {
    /// Completes the transaction with the preimage.
    pub fn claim(&self, payment_preimage: [u8; 32]) -> Transaction {
        self.txinfo
            .finalize(&self.remote_sig, &self.local_sig, payment_preimage)
    }
}

/// Everything needed for a unilateral close at the current local state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishableTxs {
    /// Fully signed commitment transaction
    pub commit_tx: Transaction,
    /// Fully signed HTLC-timeout transactions, one per offered HTLC
    pub htlc_timeout_txs: Vec<Transaction>,
    /// HTLC-success transactions, complete except for their preimages
    pub htlc_success_txs: Vec<SignedHtlcSuccess>,
}

/// The last fully signed local commitment, directly broadcastable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCommit {
    pub index: u64,
    pub spec: CommitmentSpec,
    pub publishable_txs: PublishableTxs,
}

/// The last commitment we signed for the peer. We keep only identifying
/// data plus the point needed to re-derive its keys; the transactions
/// themselves live on the peer's side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommit {
    pub index: u64,
    /// Spec from the *peer's* point of view: `to_local` is their balance and
    /// our outgoing HTLCs appear as `Received`
    pub spec: CommitmentSpec,
    pub txid: Txid,
    pub remote_per_commitment_point: PublicKey,
}

/// Where the signing/revocation round currently stands with the peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteNextCommitInfo {
    /// We signed and sent a commitment for this state and are waiting for
    /// the peer to revoke the previous one
    AwaitingRevocation(RemoteCommit),
    /// The peer's next per-commitment point; we are free to sign
    Ready(PublicKey),
}

// COMMITMENTS
// ============================================================================

/// The bilaterally signed channel state and its pending-change pipeline.
///
/// Every operation is a pure transformation: it borrows the current value,
/// returns the successor plus any outbound message, and leaves the original
/// untouched on error. The owning state machine must serialize operations
/// per channel and persist the successor before emitting the message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitments {
    pub channel_id: u64,
    pub local_params: LocalParams,
    pub remote_params: RemoteParams,
    pub commit_input: FundingUtxo,
    pub local_commit: LocalCommit,
    pub remote_commit: RemoteCommit,
    pub local_changes: LocalChanges,
    pub remote_changes: RemoteChanges,
    /// Largest HTLC id we have ever assigned; ids are dense, so the next
    /// offer uses this plus one
    pub local_current_htlc_id: u64,
    /// Largest HTLC id the peer has used; enforced dense and monotonic
    pub remote_current_htlc_id: u64,
    pub remote_next_commit_info: RemoteNextCommitInfo,
    /// Every revoked remote secret, keyed by `2^64 - 1 - commit_index`
    pub remote_per_commitment_secrets: ShaChain,
}

fn spec_err(err: SpecError) -> ChannelError {
    match err {
        SpecError::UnknownHtlc(id) => ChannelError::UnknownHtlc(id),
        SpecError::InsufficientBalance => ChannelError::InsufficientFunds,
    }
}

impl Commitments {
    /// Whether we have anything to sign for the peer.
    pub fn local_has_changes(&self) -> bool {
        !self.remote_changes.acked.is_empty() || !self.local_changes.proposed.is_empty()
    }

    /// Whether the peer has anything that a commit_sig from them could cover.
    pub fn remote_has_changes(&self) -> bool {
        !self.local_changes.acked.is_empty() || !self.remote_changes.proposed.is_empty()
    }

    // ------------------------------------------------------------------
    // HTLC proposal
    // ------------------------------------------------------------------

    /// Offers a new HTLC to the peer. The HTLC must be affordable in the
    /// remote commitment, where our balance is `to_remote` and all our
    /// pending proposals already count against it.
    pub fn send_add(&self, cmd: &CmdAddHtlc) -> Result<(Commitments, UpdateAddHtlc), ChannelError> {
        let id = self.local_current_htlc_id + 1;
        let add = UpdateAddHtlc {
            channel_id: self.channel_id,
            id,
            amount_msat: cmd.amount_msat,
            cltv_expiry: cmd.cltv_expiry,
            payment_hash: cmd.payment_hash,
            onion_routing_packet: cmd.onion_routing_packet.clone(),
        };

        let mut next = self.clone();
        next.local_current_htlc_id = id;
        next.local_changes.proposed.push(UpdateMessage::Add(add.clone()));

        next.remote_commit
            .spec
            .reduce(&next.remote_changes.acked, &next.local_changes.proposed)
            .map_err(spec_err)?;

        debug!("channel {}: offering htlc {} ({} msat)", self.channel_id, id, cmd.amount_msat);
        Ok((next, add))
    }

    /// Accepts an HTLC offered by the peer after checking its id discipline
    /// and that the peer can afford it in our commitment, where their
    /// balance is `to_remote`.
    pub fn receive_add(&self, add: UpdateAddHtlc) -> Result<Commitments, ChannelError> {
        let expected = self.remote_current_htlc_id + 1;
        if add.id != expected {
            return Err(ChannelError::UnexpectedHtlcId {
                expected,
                got: add.id,
            });
        }

        let mut next = self.clone();
        next.remote_current_htlc_id = add.id;
        next.remote_changes.proposed.push(UpdateMessage::Add(add));

        next.local_commit
            .spec
            .reduce(&next.local_changes.acked, &next.remote_changes.proposed)
            .map_err(spec_err)?;

        Ok(next)
    }

    // ------------------------------------------------------------------
    // HTLC settlement
    // ------------------------------------------------------------------

    /// Settles an incoming HTLC with its preimage. The HTLC must exist in
    /// our signed local commitment, not merely be proposed.
    pub fn send_fulfill(
        &self,
        cmd: &CmdFulfillHtlc,
    ) -> Result<(Commitments, UpdateFulfillHtlc), ChannelError> {
        let htlc = self
            .local_commit
            .spec
            .find(HtlcDirection::Received, cmd.id)
            .ok_or(ChannelError::UnknownHtlc(cmd.id))?;

        if Sha256::hash(&cmd.payment_preimage).to_byte_array() != htlc.add.payment_hash {
            return Err(ChannelError::InvalidPreimage(cmd.id));
        }

        let fulfill = UpdateFulfillHtlc {
            channel_id: self.channel_id,
            id: cmd.id,
            payment_preimage: cmd.payment_preimage,
        };
        let mut next = self.clone();
        next.local_changes
            .proposed
            .push(UpdateMessage::Fulfill(fulfill.clone()));
        Ok((next, fulfill))
    }

    /// Processes the peer settling one of our outgoing HTLCs. In the remote
    /// commitment spec (peer's point of view) our outgoing HTLCs appear as
    /// `Received`. Returns the original offer so the caller can settle the
    /// matching upstream HTLC.
    pub fn receive_fulfill(
        &self,
        fulfill: UpdateFulfillHtlc,
    ) -> Result<(Commitments, UpdateAddHtlc), ChannelError> {
        let htlc = self
            .remote_commit
            .spec
            .find(HtlcDirection::Received, fulfill.id)
            .ok_or(ChannelError::UnknownHtlc(fulfill.id))?;

        if Sha256::hash(&fulfill.payment_preimage).to_byte_array() != htlc.add.payment_hash {
            return Err(ChannelError::InvalidPreimage(fulfill.id));
        }

        let origin = htlc.add.clone();
        let mut next = self.clone();
        next.remote_changes
            .proposed
            .push(UpdateMessage::Fulfill(fulfill));
        Ok((next, origin))
    }

    /// Fails an incoming HTLC back to the peer. No preimage is involved;
    /// the reason is an opaque blob for the payment's originator.
    pub fn send_fail(
        &self,
        cmd: &CmdFailHtlc,
    ) -> Result<(Commitments, UpdateFailHtlc), ChannelError> {
        self.local_commit
            .spec
            .find(HtlcDirection::Received, cmd.id)
            .ok_or(ChannelError::UnknownHtlc(cmd.id))?;

        let fail = UpdateFailHtlc {
            channel_id: self.channel_id,
            id: cmd.id,
            reason: cmd.reason.clone(),
        };
        let mut next = self.clone();
        next.local_changes
            .proposed
            .push(UpdateMessage::Fail(fail.clone()));
        Ok((next, fail))
    }

    /// Processes the peer failing one of our outgoing HTLCs. Returns the
    /// original offer so the caller can fail the matching upstream HTLC.
    pub fn receive_fail(
        &self,
        fail: UpdateFailHtlc,
    ) -> Result<(Commitments, UpdateAddHtlc), ChannelError> {
        let htlc = self
            .remote_commit
            .spec
            .find(HtlcDirection::Received, fail.id)
            .ok_or(ChannelError::UnknownHtlc(fail.id))?;

        let origin = htlc.add.clone();
        let mut next = self.clone();
        next.remote_changes.proposed.push(UpdateMessage::Fail(fail));
        Ok((next, origin))
    }

    // ------------------------------------------------------------------
    // Commitment signing
    // ------------------------------------------------------------------

    /// Signs the peer's next commitment over every change they have acked
    /// plus everything we have proposed. Only one unrevoked commitment may
    /// be outstanding at a time.
    pub fn send_commit(
        &self,
        secp_ctx: &Secp256k1<All>,
    ) -> Result<(Commitments, CommitSig), ChannelError> {
        let remote_next_point = match &self.remote_next_commit_info {
            RemoteNextCommitInfo::Ready(point) => *point,
            RemoteNextCommitInfo::AwaitingRevocation(_) => {
                return Err(ChannelError::CannotSignAwaitingRevoke)
            }
        };
        if !self.local_has_changes() {
            return Err(ChannelError::CannotSignNoChanges);
        }

        let spec = self
            .remote_commit
            .spec
            .reduce(&self.remote_changes.acked, &self.local_changes.proposed)
            .map_err(spec_err)?;

        let (commit_tx, htlc_timeout_txs, htlc_success_txs) = make_remote_txs(
            secp_ctx,
            self.remote_commit.index + 1,
            &self.local_params,
            &self.remote_params,
            &self.commit_input,
            &remote_next_point,
            &spec,
        );

        let signature = sign_input(
            secp_ctx,
            &commit_tx,
            0,
            &self.commit_input.redeem_script,
            self.commit_input.amount_sat,
            &self.local_params.funding_key,
        );

        // HTLC transactions are signed with the payment key for this
        // commitment, in canonical order
        let payment_key = derive_private_key(
            &self.local_params.payment_basepoint_secret,
            &remote_next_point,
            secp_ctx,
        );
        let htlc_signatures: Vec<Signature> = sorted_htlc_txs(&htlc_timeout_txs, &htlc_success_txs)
            .iter()
            .map(|htlc_tx| {
                sign_input(
                    secp_ctx,
                    htlc_tx.tx(),
                    0,
                    htlc_tx.script(),
                    htlc_tx.input_value_sat(),
                    &payment_key,
                )
            })
            .collect();

        debug!(
            "channel {}: signing remote commitment {} with {} htlc signatures",
            self.channel_id,
            self.remote_commit.index + 1,
            htlc_signatures.len()
        );

        let commit_sig = CommitSig {
            channel_id: self.channel_id,
            signature,
            htlc_signatures,
        };

        let mut next = self.clone();
        next.remote_next_commit_info =
            RemoteNextCommitInfo::AwaitingRevocation(RemoteCommit {
                index: self.remote_commit.index + 1,
                spec,
                txid: commit_tx.compute_txid(),
                remote_per_commitment_point: remote_next_point,
            });
        next.local_changes.signed = std::mem::take(&mut next.local_changes.proposed);
        next.remote_changes.acked.clear();

        Ok((next, commit_sig))
    }

    /// Verifies a commit_sig from the peer over our next commitment, stores
    /// the fully signed transactions, and revokes our previous commitment.
    pub fn receive_commit(
        &self,
        secp_ctx: &Secp256k1<All>,
        commit: &CommitSig,
    ) -> Result<(Commitments, RevokeAndAck), ChannelError> {
        if !self.remote_has_changes() {
            return Err(ChannelError::CannotSignNoChanges);
        }

        let spec = self
            .local_commit
            .spec
            .reduce(&self.local_changes.acked, &self.remote_changes.proposed)
            .map_err(spec_err)?;

        let local_index = self.local_commit.index + 1;
        let local_point =
            per_commitment_point(secp_ctx, &self.local_params.sha_seed, local_index);

        let (commit_tx, htlc_timeout_txs, htlc_success_txs) = make_local_txs(
            secp_ctx,
            local_index,
            &self.local_params,
            &self.remote_params,
            &self.commit_input,
            &local_point,
            &spec,
        );

        // The peer's signature must cover the exact transaction we derived
        verify_input_signature(
            secp_ctx,
            &commit_tx,
            0,
            &self.commit_input.redeem_script,
            self.commit_input.amount_sat,
            &commit.signature,
            &self.remote_params.funding_pubkey,
        )
        .map_err(|_| ChannelError::InvalidCommitSignature)?;

        let local_funding_sig = sign_input(
            secp_ctx,
            &commit_tx,
            0,
            &self.commit_input.redeem_script,
            self.commit_input.amount_sat,
            &self.local_params.funding_key,
        );
        let mut signed_commit_tx = commit_tx.clone();
        signed_commit_tx.input[0].witness = create_funding_witness(
            &self.commit_input.redeem_script,
            &local_funding_sig,
            &self.local_params.funding_pubkey(secp_ctx),
            &commit.signature,
            &self.remote_params.funding_pubkey,
        );

        let sorted = sorted_htlc_txs(&htlc_timeout_txs, &htlc_success_txs);
        if commit.htlc_signatures.len() != sorted.len() {
            return Err(ChannelError::HtlcSigCountMismatch {
                expected: sorted.len(),
                got: commit.htlc_signatures.len(),
            });
        }

        let local_htlc_key = derive_private_key(
            &self.local_params.payment_basepoint_secret,
            &local_point,
            secp_ctx,
        );
        let remote_htlc_pubkey =
            derive_public_key(&self.remote_params.payment_basepoint, &local_point, secp_ctx);

        let mut signed_timeout_txs = Vec::new();
        let mut signed_success_txs = Vec::new();
        let mut our_timeout_signatures = Vec::new();
        for (htlc_tx, remote_sig) in sorted.iter().zip(commit.htlc_signatures.iter()) {
            verify_input_signature(
                secp_ctx,
                htlc_tx.tx(),
                0,
                htlc_tx.script(),
                htlc_tx.input_value_sat(),
                remote_sig,
                &remote_htlc_pubkey,
            )
            .map_err(|_| ChannelError::InvalidHtlcSignature)?;

            let local_sig = sign_input(
                secp_ctx,
                htlc_tx.tx(),
                0,
                htlc_tx.script(),
                htlc_tx.input_value_sat(),
                &local_htlc_key,
            );

            match htlc_tx {
                HtlcTxRef::Timeout(timeout_tx) => {
                    our_timeout_signatures.push(local_sig);
                    signed_timeout_txs.push(timeout_tx.finalize(remote_sig, &local_sig));
                }
                HtlcTxRef::Success(success_tx) => {
                    signed_success_txs.push(SignedHtlcSuccess {
                        txinfo: (*success_tx).clone(),
                        remote_sig: *remote_sig,
                        local_sig,
                    });
                }
            }
        }

        // Revealing this secret revokes the commitment we are replacing;
        // only then does local_commit.index advance
        let revocation = RevokeAndAck {
            channel_id: self.channel_id,
            per_commitment_secret: per_commitment_secret(
                &self.local_params.sha_seed,
                self.local_commit.index,
            ),
            next_per_commitment_point: per_commitment_point(
                secp_ctx,
                &self.local_params.sha_seed,
                local_index + 1,
            ),
            htlc_timeout_signatures: our_timeout_signatures,
        };

        debug!(
            "channel {}: accepted commitment {} ({} htlcs), revoking {}",
            self.channel_id,
            local_index,
            spec.htlcs.len(),
            self.local_commit.index
        );

        let mut next = self.clone();
        next.local_commit = LocalCommit {
            index: local_index,
            spec,
            publishable_txs: PublishableTxs {
                commit_tx: signed_commit_tx,
                htlc_timeout_txs: signed_timeout_txs,
                htlc_success_txs: signed_success_txs,
            },
        };
        next.local_changes.acked.clear();
        let newly_acked = std::mem::take(&mut next.remote_changes.proposed);
        next.remote_changes.acked.extend(newly_acked);

        Ok((next, revocation))
    }

    /// Processes the peer's revocation of their previous commitment. The
    /// revealed secret must be the discrete log of the per-commitment point
    /// that commitment was built on.
    pub fn receive_revocation(
        &self,
        secp_ctx: &Secp256k1<All>,
        revocation: &RevokeAndAck,
    ) -> Result<Commitments, ChannelError> {
        let their_next_commit = match &self.remote_next_commit_info {
            RemoteNextCommitInfo::Ready(_) => return Err(ChannelError::UnexpectedRevocation),
            RemoteNextCommitInfo::AwaitingRevocation(commit) => commit.clone(),
        };

        let revealed_point =
            PublicKey::from_secret_key(secp_ctx, &revocation.per_commitment_secret);
        if revealed_point != self.remote_commit.remote_per_commitment_point {
            return Err(ChannelError::InvalidRevocation);
        }

        let mut next = self.clone();
        next.remote_per_commitment_secrets
            .insert(
                u64::MAX - self.remote_commit.index,
                revocation.per_commitment_secret.secret_bytes(),
            )
            .map_err(|_| ChannelError::InvalidRevocation)?;

        debug!(
            "channel {}: peer revoked commitment {}",
            self.channel_id, self.remote_commit.index
        );

        next.remote_commit = their_next_commit;
        next.remote_next_commit_info =
            RemoteNextCommitInfo::Ready(revocation.next_per_commitment_point);
        let signed = std::mem::take(&mut next.local_changes.signed);
        next.local_changes.acked.extend(signed);

        Ok(next)
    }
}

// TRANSACTION DERIVATION
// ============================================================================

enum HtlcTxRef<'a> {
    Timeout(&'a HtlcTimeoutTx),
    Success(&'a HtlcSuccessTx),
}

impl HtlcTxRef<'_> {
    fn tx(&self) -> &Transaction {
        match self {
            HtlcTxRef::Timeout(timeout_tx) => &timeout_tx.tx,
            HtlcTxRef::Success(success_tx) => &success_tx.tx,
        }
    }

    fn script(&self) -> &ScriptBuf {
        match self {
            HtlcTxRef::Timeout(timeout_tx) => &timeout_tx.htlc_script,
            HtlcTxRef::Success(success_tx) => &success_tx.htlc_script,
        }
    }

    fn input_value_sat(&self) -> u64 {
        match self {
            HtlcTxRef::Timeout(timeout_tx) => timeout_tx.input_value_sat,
            HtlcTxRef::Success(success_tx) => success_tx.input_value_sat,
        }
    }
}

/// Canonical HTLC signature order: ascending by the commitment output index
/// each transaction spends. Both peers must reproduce this exactly.
fn sorted_htlc_txs<'a>(
    htlc_timeout_txs: &'a [HtlcTimeoutTx],
    htlc_success_txs: &'a [HtlcSuccessTx],
) -> Vec<HtlcTxRef<'a>> {
    let mut refs: Vec<HtlcTxRef<'a>> = htlc_timeout_txs
        .iter()
        .map(HtlcTxRef::Timeout)
        .chain(htlc_success_txs.iter().map(HtlcTxRef::Success))
        .collect();
    refs.sort_by_key(|htlc_tx| htlc_tx.tx().input[0].previous_output.vout);
    refs
}

fn obscure_factor(
    secp_ctx: &Secp256k1<All>,
    local_params: &LocalParams,
    remote_params: &RemoteParams,
) -> u64 {
    let (funder_basepoint, fundee_basepoint) = if local_params.is_funder {
        (
            local_params.payment_basepoint(secp_ctx),
            remote_params.payment_basepoint,
        )
    } else {
        (
            remote_params.payment_basepoint,
            local_params.payment_basepoint(secp_ctx),
        )
    };
    commitment_number_obscure_factor(&funder_basepoint, &fundee_basepoint)
}

/// Builds our commitment transaction and its second-level HTLC transactions
/// for the given spec (our point of view).
pub fn make_local_txs(
    secp_ctx: &Secp256k1<All>,
    commitment_index: u64,
    local_params: &LocalParams,
    remote_params: &RemoteParams,
    commit_input: &FundingUtxo,
    local_per_commitment_point: &PublicKey,
    spec: &CommitmentSpec,
) -> (Transaction, Vec<HtlcTimeoutTx>, Vec<HtlcSuccessTx>) {
    let keys = CommitmentKeys::from_basepoints(
        local_per_commitment_point,
        &local_params.delayed_payment_basepoint(secp_ctx),
        &local_params.payment_basepoint(secp_ctx),
        &remote_params.revocation_basepoint,
        &remote_params.payment_basepoint,
        secp_ctx,
    );
    // The peer chose how long our balance stays locked
    let to_self_delay = remote_params.to_self_delay;

    let (commit_tx, outputs) = create_commitment_transaction(
        commit_input.outpoint,
        spec.to_local_msat,
        spec.to_remote_msat,
        &keys,
        to_self_delay,
        local_params.dust_limit_sat,
        spec.feerate_per_kw,
        local_params.is_funder,
        commitment_index,
        obscure_factor(secp_ctx, local_params, remote_params),
        &spec.htlc_output_infos(),
    );

    let (htlc_timeout_txs, htlc_success_txs) = create_htlc_transactions(
        commit_tx.compute_txid(),
        &outputs,
        &keys,
        to_self_delay,
        spec.feerate_per_kw,
    );

    (commit_tx, htlc_timeout_txs, htlc_success_txs)
}

/// Builds the peer's commitment transaction and its second-level HTLC
/// transactions for the given spec (their point of view). Same template as
/// [`make_local_txs`] with the roles swapped.
pub fn make_remote_txs(
    secp_ctx: &Secp256k1<All>,
    commitment_index: u64,
    local_params: &LocalParams,
    remote_params: &RemoteParams,
    commit_input: &FundingUtxo,
    remote_per_commitment_point: &PublicKey,
    spec: &CommitmentSpec,
) -> (Transaction, Vec<HtlcTimeoutTx>, Vec<HtlcSuccessTx>) {
    let keys = CommitmentKeys::from_basepoints(
        remote_per_commitment_point,
        &remote_params.delayed_payment_basepoint,
        &remote_params.payment_basepoint,
        &local_params.revocation_basepoint(secp_ctx),
        &local_params.payment_basepoint(secp_ctx),
        secp_ctx,
    );
    // We chose how long the peer's balance stays locked
    let to_self_delay = local_params.to_self_delay;

    let (commit_tx, outputs) = create_commitment_transaction(
        commit_input.outpoint,
        spec.to_local_msat,
        spec.to_remote_msat,
        &keys,
        to_self_delay,
        remote_params.dust_limit_sat,
        spec.feerate_per_kw,
        remote_params.is_funder,
        commitment_index,
        obscure_factor(secp_ctx, local_params, remote_params),
        &spec.htlc_output_infos(),
    );

    let (htlc_timeout_txs, htlc_success_txs) = create_htlc_transactions(
        commit_tx.compute_txid(),
        &outputs,
        &keys,
        to_self_delay,
        spec.feerate_per_kw,
    );

    (commit_tx, htlc_timeout_txs, htlc_success_txs)
}
