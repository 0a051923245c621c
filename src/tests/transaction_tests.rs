use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::Hash;
use bitcoin::script::ScriptBuf;

use super::{open_channel, FEERATE_PER_KW, FUNDING_MSAT};
use crate::transactions::commitment::{
    commitment_number_obscure_factor, set_obscured_commitment_number,
};
use crate::transactions::fees::{commit_tx_fee, is_htlc_dust};
use crate::transactions::sort_commitment_outputs;
use crate::types::{HtlcDirection, OutputWithMetadata};
use crate::*;

fn spec_with_htlcs(htlcs: Vec<(HtlcDirection, u64, u64, u32)>) -> CommitmentSpec {
    let mut spec = CommitmentSpec::new(FEERATE_PER_KW, FUNDING_MSAT / 2, FUNDING_MSAT / 2);
    for (direction, id, amount_msat, cltv_expiry) in htlcs {
        // Keep the spec conserving: in-flight value leaves the payer's side
        match direction {
            HtlcDirection::Offered => spec.to_local_msat -= amount_msat,
            HtlcDirection::Received => spec.to_remote_msat -= amount_msat,
        }
        spec.htlcs.push(Htlc {
            direction,
            add: messages::UpdateAddHtlc {
                channel_id: 1,
                id,
                amount_msat,
                cltv_expiry,
                payment_hash: Sha256::hash(&id.to_be_bytes()).to_byte_array(),
                onion_routing_packet: vec![],
            },
        });
    }
    spec
}

#[test]
fn test_commitment_build_is_deterministic() {
    let channel = open_channel();
    let spec = spec_with_htlcs(vec![
        (HtlcDirection::Offered, 1, 1_000_000_000, 500),
        (HtlcDirection::Received, 1, 500_000_000, 510),
    ]);
    let point = per_commitment_point(&channel.secp, &channel.alice.local_params.sha_seed, 3);

    let (tx_a, timeouts_a, successes_a) = make_local_txs(
        &channel.secp,
        3,
        &channel.alice.local_params,
        &channel.alice.remote_params,
        &channel.alice.commit_input,
        &point,
        &spec,
    );
    let (tx_b, timeouts_b, successes_b) = make_local_txs(
        &channel.secp,
        3,
        &channel.alice.local_params,
        &channel.alice.remote_params,
        &channel.alice.commit_input,
        &point,
        &spec,
    );

    assert_eq!(tx_a.compute_txid(), tx_b.compute_txid());
    assert_eq!(timeouts_a, timeouts_b);
    assert_eq!(successes_a, successes_b);
}

#[test]
fn test_both_sides_derive_the_same_remote_commitment() {
    // What Alice builds as "Bob's commitment" must be exactly what Bob
    // builds as his own, or signatures would never verify
    let channel = open_channel();
    let bob_point = per_commitment_point(&channel.secp, &channel.bob.local_params.sha_seed, 0);
    let bob_spec = channel.bob.local_commit.spec.clone();

    let (alice_view, alice_timeouts, alice_successes) = make_remote_txs(
        &channel.secp,
        0,
        &channel.alice.local_params,
        &channel.alice.remote_params,
        &channel.alice.commit_input,
        &bob_point,
        &bob_spec,
    );
    let (bob_view, bob_timeouts, bob_successes) = make_local_txs(
        &channel.secp,
        0,
        &channel.bob.local_params,
        &channel.bob.remote_params,
        &channel.bob.commit_input,
        &bob_point,
        &bob_spec,
    );

    assert_eq!(alice_view.compute_txid(), bob_view.compute_txid());
    assert_eq!(alice_timeouts, bob_timeouts);
    assert_eq!(alice_successes, bob_successes);
}

#[test]
fn test_output_ordering() {
    let script_a = ScriptBuf::from_bytes(vec![0x00, 0x01]);
    let script_b = ScriptBuf::from_bytes(vec![0x00, 0x02]);
    let output = |value_sat: u64, script: &ScriptBuf, cltv: Option<u32>| OutputWithMetadata {
        value_sat,
        script_pubkey: script.clone(),
        witness_script: None,
        cltv_expiry: cltv,
        htlc: None,
    };

    let mut outputs = vec![
        output(2000, &script_a, None),
        output(1000, &script_b, None),
        output(1000, &script_a, Some(510)),
        output(1000, &script_a, Some(500)),
    ];
    sort_commitment_outputs(&mut outputs);

    // Value first, then script bytes, then CLTV among identical outputs
    assert_eq!(
        outputs
            .iter()
            .map(|o| (o.value_sat, o.script_pubkey.clone(), o.cltv_expiry))
            .collect::<Vec<_>>(),
        vec![
            (1000, script_a.clone(), Some(500)),
            (1000, script_a.clone(), Some(510)),
            (1000, script_b.clone(), None),
            (2000, script_a.clone(), None),
        ]
    );
}

#[test]
fn test_obscured_commitment_number_encoding() {
    let channel = open_channel();
    let secp = &channel.secp;
    let funder_basepoint = channel.alice.local_params.payment_basepoint(secp);
    let fundee_basepoint = channel.alice.remote_params.payment_basepoint;
    let factor = commitment_number_obscure_factor(&funder_basepoint, &fundee_basepoint);

    assert!(factor < (1 << 48), "obscure factor is 48 bits");

    let mut tx = channel.alice.local_commit.publishable_txs.commit_tx.clone();
    let commitment_number = 42;
    set_obscured_commitment_number(&mut tx, commitment_number, factor);

    let locktime = tx.lock_time.to_consensus_u32();
    let sequence = tx.input[0].sequence.to_consensus_u32();
    assert_eq!(locktime >> 24, 0x20, "locktime carries the 0x20 prefix");
    assert_eq!(sequence >> 24, 0x80, "sequence carries the 0x80 prefix");

    let obscured =
        ((sequence as u64 & 0xFF_FFFF) << 24) | (locktime as u64 & 0xFF_FFFF);
    assert_eq!(
        obscured ^ factor,
        commitment_number,
        "the commitment number must be recoverable by either peer"
    );
}

#[test]
fn test_dust_htlcs_are_trimmed() {
    let channel = open_channel();
    let params = &channel.alice.local_params;

    // 2_000 sat is under dust + second-level claim fee at this feerate
    assert!(is_htlc_dust(
        HtlcDirection::Offered,
        2_000,
        params.dust_limit_sat,
        FEERATE_PER_KW
    ));

    let spec = spec_with_htlcs(vec![
        (HtlcDirection::Offered, 1, 1_000_000_000, 500),
        (HtlcDirection::Offered, 2, 2_000_000, 500),
    ]);
    let point = per_commitment_point(&channel.secp, &params.sha_seed, 1);
    let (tx, timeouts, successes) = make_local_txs(
        &channel.secp,
        1,
        params,
        &channel.alice.remote_params,
        &channel.alice.commit_input,
        &point,
        &spec,
    );

    assert_eq!(
        tx.output.len(),
        3,
        "to_local, to_remote and one untrimmed HTLC"
    );
    assert_eq!(timeouts.len(), 1, "no second-level claim for a trimmed HTLC");
    assert!(successes.is_empty());
    assert_eq!(timeouts[0].htlc_id, 1);

    // The trimmed amount went to fees, not to any output
    let total_out: u64 = tx.output.iter().map(|o| o.value.to_sat()).sum();
    let expected_fee = commit_tx_fee(FEERATE_PER_KW, 1);
    assert_eq!(
        total_out,
        FUNDING_MSAT / 1000 - expected_fee - 2_000,
        "outputs plus fee plus the trimmed value account for the whole funding"
    );
}

#[test]
fn test_htlc_transactions_spend_their_outputs() {
    let channel = open_channel();
    let spec = spec_with_htlcs(vec![
        (HtlcDirection::Offered, 1, 900_000_000, 500),
        (HtlcDirection::Received, 4, 800_000_000, 520),
    ]);
    let point = per_commitment_point(&channel.secp, &channel.alice.local_params.sha_seed, 2);
    let (commit_tx, timeouts, successes) = make_local_txs(
        &channel.secp,
        2,
        &channel.alice.local_params,
        &channel.alice.remote_params,
        &channel.alice.commit_input,
        &point,
        &spec,
    );
    let commit_txid = commit_tx.compute_txid();

    for timeout_tx in &timeouts {
        let input = &timeout_tx.tx.input[0];
        assert_eq!(input.previous_output.txid, commit_txid);
        let spent = &commit_tx.output[input.previous_output.vout as usize];
        assert_eq!(
            spent.script_pubkey,
            timeout_tx.htlc_script.to_p2wsh(),
            "timeout tx must spend the output committing to its script"
        );
        assert_eq!(spent.value.to_sat(), timeout_tx.input_value_sat);
        assert_eq!(
            timeout_tx.tx.lock_time.to_consensus_u32(),
            timeout_tx.cltv_expiry,
            "timeout path only opens at expiry"
        );
    }

    for success_tx in &successes {
        let input = &success_tx.tx.input[0];
        assert_eq!(input.previous_output.txid, commit_txid);
        let spent = &commit_tx.output[input.previous_output.vout as usize];
        assert_eq!(spent.script_pubkey, success_tx.htlc_script.to_p2wsh());
        assert_eq!(
            success_tx.tx.lock_time.to_consensus_u32(),
            0,
            "success path is claimable immediately"
        );
    }
}

#[test]
fn test_funding_script_is_order_independent() {
    let channel = open_channel();
    let secp = &channel.secp;
    let alice_pub = channel.alice.local_params.funding_pubkey(secp);
    let bob_pub = channel.alice.remote_params.funding_pubkey;

    assert_eq!(
        scripts::create_funding_script(&alice_pub, &bob_pub),
        scripts::create_funding_script(&bob_pub, &alice_pub),
        "both peers must derive the same funding script"
    );
}
