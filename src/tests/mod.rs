use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{All, Secp256k1};
use bitcoin::{Network, Txid};

use crate::*;

mod commitments_tests;
mod transaction_tests;

pub const FUNDING_SAT: u64 = 10_000_000;
pub const FUNDING_MSAT: u64 = FUNDING_SAT * 1000;
pub const FEERATE_PER_KW: u64 = 5_000;
pub const DUST_LIMIT_SAT: u64 = 546;
pub const TO_SELF_DELAY: u16 = 144;

/// A funded channel between Alice (funder, all funds on her side) and Bob,
/// as the opening state machine would hand it to the engine.
pub struct TestChannel {
    pub secp: Secp256k1<All>,
    pub alice: Commitments,
    pub bob: Commitments,
}

pub fn remote_params_of(keys: &ChannelKeyManager, is_funder: bool) -> RemoteParams {
    let basepoints = keys.basepoints();
    RemoteParams {
        dust_limit_sat: DUST_LIMIT_SAT,
        to_self_delay: TO_SELF_DELAY,
        funding_pubkey: basepoints.funding_pubkey,
        revocation_basepoint: basepoints.revocation_basepoint,
        payment_basepoint: basepoints.payment_basepoint,
        delayed_payment_basepoint: basepoints.delayed_payment_basepoint,
        is_funder,
    }
}

pub fn open_channel() -> TestChannel {
    let secp = Secp256k1::new();

    let alice_keys = KeysManager::new([0x41; 32], Network::Bitcoin).derive_channel_keys(0);
    let bob_keys = KeysManager::new([0x42; 32], Network::Bitcoin).derive_channel_keys(0);

    let alice_params =
        LocalParams::from_key_manager(&alice_keys, DUST_LIMIT_SAT, TO_SELF_DELAY, true);
    let bob_params =
        LocalParams::from_key_manager(&bob_keys, DUST_LIMIT_SAT, TO_SELF_DELAY, false);
    let alice_remote = remote_params_of(&bob_keys, false);
    let bob_remote = remote_params_of(&alice_keys, true);

    let funding_tx = transactions::create_funding_transaction(
        Txid::from_byte_array([0x11; 32]),
        0,
        FUNDING_SAT,
        &alice_params.funding_pubkey(&secp),
        &alice_remote.funding_pubkey,
    );
    let commit_input = transactions::funding_utxo(
        &funding_tx,
        0,
        &alice_params.funding_pubkey(&secp),
        &alice_remote.funding_pubkey,
    );

    // Alice funded the whole channel, push 0
    let alice_spec = CommitmentSpec::new(FEERATE_PER_KW, FUNDING_MSAT, 0);
    let bob_spec = CommitmentSpec::new(FEERATE_PER_KW, 0, FUNDING_MSAT);

    let alice_point_0 = per_commitment_point(&secp, &alice_params.sha_seed, 0);
    let bob_point_0 = per_commitment_point(&secp, &bob_params.sha_seed, 0);
    let alice_point_1 = per_commitment_point(&secp, &alice_params.sha_seed, 1);
    let bob_point_1 = per_commitment_point(&secp, &bob_params.sha_seed, 1);

    let (alice_commit_tx, _, _) = make_local_txs(
        &secp,
        0,
        &alice_params,
        &alice_remote,
        &commit_input,
        &alice_point_0,
        &alice_spec,
    );
    let alice_txid = alice_commit_tx.compute_txid();
    let (bob_commit_tx, _, _) = make_local_txs(
        &secp,
        0,
        &bob_params,
        &bob_remote,
        &commit_input,
        &bob_point_0,
        &bob_spec,
    );
    let bob_txid = bob_commit_tx.compute_txid();

    let alice = Commitments {
        channel_id: 1,
        local_params: alice_params,
        remote_params: alice_remote,
        commit_input: commit_input.clone(),
        local_commit: LocalCommit {
            index: 0,
            spec: alice_spec,
            publishable_txs: PublishableTxs {
                commit_tx: alice_commit_tx,
                htlc_timeout_txs: vec![],
                htlc_success_txs: vec![],
            },
        },
        remote_commit: RemoteCommit {
            index: 0,
            spec: bob_spec.clone(),
            txid: bob_txid,
            remote_per_commitment_point: bob_point_0,
        },
        local_changes: LocalChanges::new(),
        remote_changes: RemoteChanges::new(),
        local_current_htlc_id: 0,
        remote_current_htlc_id: 0,
        remote_next_commit_info: RemoteNextCommitInfo::Ready(bob_point_1),
        remote_per_commitment_secrets: ShaChain::new(),
    };

    let bob = Commitments {
        channel_id: 1,
        local_params: bob_params,
        remote_params: bob_remote,
        commit_input,
        local_commit: LocalCommit {
            index: 0,
            spec: bob_spec,
            publishable_txs: PublishableTxs {
                commit_tx: bob_commit_tx,
                htlc_timeout_txs: vec![],
                htlc_success_txs: vec![],
            },
        },
        remote_commit: RemoteCommit {
            index: 0,
            spec: alice.local_commit.spec.clone(),
            txid: alice_txid,
            remote_per_commitment_point: alice_point_0,
        },
        local_changes: LocalChanges::new(),
        remote_changes: RemoteChanges::new(),
        local_current_htlc_id: 0,
        remote_current_htlc_id: 0,
        remote_next_commit_info: RemoteNextCommitInfo::Ready(alice_point_1),
        remote_per_commitment_secrets: ShaChain::new(),
    };

    TestChannel { secp, alice, bob }
}

/// One full signing round: sender signs, receiver verifies and revokes,
/// sender absorbs the revocation.
pub fn sign_dance(
    secp: &Secp256k1<All>,
    sender: &Commitments,
    receiver: &Commitments,
) -> (Commitments, Commitments) {
    let (sender1, commit_sig) = sender.send_commit(secp).expect("sender has changes to sign");
    let (receiver1, revocation) = receiver
        .receive_commit(secp, &commit_sig)
        .expect("commitment signatures must verify");
    let sender2 = sender1
        .receive_revocation(secp, &revocation)
        .expect("revocation must verify");
    (sender2, receiver1)
}

pub fn assert_balances_conserved(commitments: &Commitments) {
    assert_eq!(
        commitments.local_commit.spec.total_msat(),
        FUNDING_MSAT,
        "local commitment must conserve channel funds"
    );
    assert_eq!(
        commitments.remote_commit.spec.total_msat(),
        FUNDING_MSAT,
        "remote commitment must conserve channel funds"
    );
}
