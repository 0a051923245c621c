use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::{Hash, HashEngine};
use bitcoin::locktime::absolute::LockTime;
use bitcoin::script::ScriptBuf;
use bitcoin::secp256k1::PublicKey;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, Sequence, Transaction, TxIn, TxOut, Witness};

use crate::scripts::{
    create_offered_htlc_script, create_received_htlc_script, create_to_local_script,
    create_to_remote_script,
};
use crate::transactions::fees::{commit_tx_fee, is_htlc_dust};
use crate::types::{CommitmentKeys, HtlcDirection, HtlcOutputInfo, OutputWithMetadata};

/// Lower 48 bits of `SHA256(funder_payment_basepoint || fundee_payment_basepoint)`.
/// XORed into the commitment number so that chain observers cannot count
/// channel updates, while both peers can still recognize their own
/// commitments on chain.
pub fn commitment_number_obscure_factor(
    funder_payment_basepoint: &PublicKey,
    fundee_payment_basepoint: &PublicKey,
) -> u64 {
    let mut engine = Sha256::engine();
    engine.input(&funder_payment_basepoint.serialize());
    engine.input(&fundee_payment_basepoint.serialize());
    let res = Sha256::from_engine(engine).to_byte_array();

    res[26..32]
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | *byte as u64)
}

/// Encodes the obscured commitment number: lower 24 bits in the locktime,
/// upper 24 bits in the input sequence, with the fixed 0x20/0x80 prefixes.
pub fn set_obscured_commitment_number(
    tx: &mut Transaction,
    commitment_number: u64,
    obscure_factor: u64,
) {
    let obscured = commitment_number ^ obscure_factor;
    tx.lock_time = LockTime::from_consensus(0x2000_0000 | (obscured & 0xFF_FFFF) as u32);
    tx.input[0].sequence =
        Sequence::from_consensus(0x8000_0000 | ((obscured >> 24) & 0xFF_FFFF) as u32);
}

/// Sorts commitment outputs into their canonical order: by value, then by
/// script, then by CLTV expiry for otherwise identical HTLC outputs. Both
/// peers must produce the same order or their signatures will not line up.
pub fn sort_commitment_outputs(outputs: &mut Vec<OutputWithMetadata>) {
    outputs.sort_by(|a, b| {
        a.value_sat
            .cmp(&b.value_sat)
            .then_with(|| a.script_pubkey.as_bytes().cmp(b.script_pubkey.as_bytes()))
            .then_with(|| {
                a.cltv_expiry
                    .unwrap_or(0)
                    .cmp(&b.cltv_expiry.unwrap_or(0))
            })
    });
}

/// Creates the balance outputs (to_local / to_remote), dropping any that
/// fall under the dust limit. The commitment fee has already been taken out
/// of the funder's balance by the caller.
fn create_balance_outputs(
    to_local_sat: u64,
    to_remote_sat: u64,
    keys: &CommitmentKeys,
    to_self_delay: u16,
    dust_limit_sat: u64,
) -> Vec<OutputWithMetadata> {
    let mut outputs = Vec::new();

    if to_remote_sat >= dust_limit_sat {
        outputs.push(OutputWithMetadata {
            value_sat: to_remote_sat,
            script_pubkey: create_to_remote_script(&keys.remote_payment_key),
            witness_script: None,
            cltv_expiry: None,
            htlc: None,
        });
    }

    if to_local_sat >= dust_limit_sat {
        let witness_script = create_to_local_script(
            &keys.revocation_key,
            &keys.local_delayed_payment_key,
            to_self_delay,
        );
        outputs.push(OutputWithMetadata {
            value_sat: to_local_sat,
            script_pubkey: witness_script.to_p2wsh(),
            witness_script: Some(witness_script),
            cltv_expiry: None,
            htlc: None,
        });
    }

    outputs
}

/// Creates one output per untrimmed HTLC, keeping a back-reference to the
/// HTLC so second-level transactions can be matched to output indices after
/// sorting.
fn create_htlc_outputs(
    htlcs: &[HtlcOutputInfo],
    keys: &CommitmentKeys,
    dust_limit_sat: u64,
    feerate_per_kw: u64,
) -> Vec<OutputWithMetadata> {
    let mut outputs = Vec::new();

    for htlc in htlcs {
        let amount_sat = htlc.amount_msat / 1000;
        if is_htlc_dust(htlc.direction, amount_sat, dust_limit_sat, feerate_per_kw) {
            continue;
        }

        let witness_script = match htlc.direction {
            HtlcDirection::Offered => create_offered_htlc_script(
                &keys.revocation_key,
                &keys.local_htlc_key,
                &keys.remote_htlc_key,
                &htlc.payment_hash,
            ),
            HtlcDirection::Received => create_received_htlc_script(
                &keys.revocation_key,
                &keys.local_htlc_key,
                &keys.remote_htlc_key,
                &htlc.payment_hash,
                htlc.cltv_expiry,
            ),
        };

        outputs.push(OutputWithMetadata {
            value_sat: amount_sat,
            script_pubkey: witness_script.to_p2wsh(),
            witness_script: Some(witness_script),
            cltv_expiry: Some(htlc.cltv_expiry),
            htlc: Some(htlc.clone()),
        });
    }

    outputs
}

/// Builds an unsigned commitment transaction spending the funding output,
/// returning it together with its outputs' metadata in final output order.
#[allow(clippy::too_many_arguments)]
pub fn create_commitment_transaction(
    funding_outpoint: OutPoint,
    to_local_msat: u64,
    to_remote_msat: u64,
    keys: &CommitmentKeys,
    to_self_delay: u16,
    dust_limit_sat: u64,
    feerate_per_kw: u64,
    owner_pays_fee: bool,
    commitment_number: u64,
    obscure_factor: u64,
    htlcs: &[HtlcOutputInfo],
) -> (Transaction, Vec<OutputWithMetadata>) {
    let num_untrimmed = htlcs
        .iter()
        .filter(|h| {
            !is_htlc_dust(
                h.direction,
                h.amount_msat / 1000,
                dust_limit_sat,
                feerate_per_kw,
            )
        })
        .count();
    let fee = commit_tx_fee(feerate_per_kw, num_untrimmed);

    // The funder carries the fee; trimmed HTLC value is implicitly added to
    // the fee by never becoming an output.
    let mut to_local_sat = to_local_msat / 1000;
    let mut to_remote_sat = to_remote_msat / 1000;
    if owner_pays_fee {
        to_local_sat = to_local_sat.saturating_sub(fee);
    } else {
        to_remote_sat = to_remote_sat.saturating_sub(fee);
    }

    let mut outputs =
        create_balance_outputs(to_local_sat, to_remote_sat, keys, to_self_delay, dust_limit_sat);
    outputs.extend(create_htlc_outputs(htlcs, keys, dust_limit_sat, feerate_per_kw));
    sort_commitment_outputs(&mut outputs);

    let tx_out: Vec<TxOut> = outputs
        .iter()
        .map(|out| TxOut {
            value: Amount::from_sat(out.value_sat),
            script_pubkey: out.script_pubkey.clone(),
        })
        .collect();

    let mut tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: funding_outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ZERO,
            witness: Witness::new(),
        }],
        output: tx_out,
    };

    set_obscured_commitment_number(&mut tx, commitment_number, obscure_factor);

    (tx, outputs)
}
