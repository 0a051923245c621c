use bitcoin::locktime::absolute::LockTime;
use bitcoin::script::ScriptBuf;
use bitcoin::secp256k1::ecdsa::Signature;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use serde::{Deserialize, Serialize};

use crate::scripts::create_to_local_script;
use crate::transactions::fees::{htlc_success_tx_fee, htlc_timeout_tx_fee};
use crate::transactions::sign::der_with_sighash_all;
use crate::types::{CommitmentKeys, HtlcDirection, OutputWithMetadata};

/// An unsigned HTLC-timeout transaction: reclaims an offered HTLC after its
/// expiry, through a delayed, revocable output mirroring to_local.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtlcTimeoutTx {
    pub tx: Transaction,
    pub htlc_id: u64,
    /// Witness script of the commitment output this transaction spends
    pub htlc_script: ScriptBuf,
    /// Value of the spent commitment output
    pub input_value_sat: u64,
    pub cltv_expiry: u32,
}

/// An unsigned HTLC-success transaction: claims a received HTLC with the
/// payment preimage, through a delayed, revocable output mirroring to_local.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtlcSuccessTx {
    pub tx: Transaction,
    pub htlc_id: u64,
    /// Witness script of the commitment output this transaction spends
    pub htlc_script: ScriptBuf,
    /// Value of the spent commitment output
    pub input_value_sat: u64,
    pub payment_hash: [u8; 32],
}

fn second_level_tx(
    htlc_outpoint: OutPoint,
    output_amount_sat: u64,
    locktime: u32,
    keys: &CommitmentKeys,
    to_self_delay: u16,
) -> Transaction {
    let to_local_script = create_to_local_script(
        &keys.revocation_key,
        &keys.local_delayed_payment_key,
        to_self_delay,
    );

    Transaction {
        version: Version::TWO,
        lock_time: LockTime::from_consensus(locktime),
        input: vec![TxIn {
            previous_output: htlc_outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ZERO,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(output_amount_sat),
            script_pubkey: to_local_script.to_p2wsh(),
        }],
    }
}

/// Builds one HTLC-timeout transaction per offered HTLC output and one
/// HTLC-success transaction per received HTLC output of a commitment
/// transaction. `outputs` must be the metadata returned by the commitment
/// builder, in final output order, so the spent outpoint indices line up.
pub fn create_htlc_transactions(
    commit_txid: Txid,
    outputs: &[OutputWithMetadata],
    keys: &CommitmentKeys,
    to_self_delay: u16,
    feerate_per_kw: u64,
) -> (Vec<HtlcTimeoutTx>, Vec<HtlcSuccessTx>) {
    let mut timeout_txs = Vec::new();
    let mut success_txs = Vec::new();

    for (vout, output) in outputs.iter().enumerate() {
        let htlc = match &output.htlc {
            Some(htlc) => htlc,
            None => continue,
        };
        let htlc_outpoint = OutPoint {
            txid: commit_txid,
            vout: vout as u32,
        };
        let htlc_script = output
            .witness_script
            .clone()
            .expect("HTLC outputs always carry their witness script");

        match htlc.direction {
            HtlcDirection::Offered => {
                let fee = htlc_timeout_tx_fee(feerate_per_kw);
                timeout_txs.push(HtlcTimeoutTx {
                    tx: second_level_tx(
                        htlc_outpoint,
                        output.value_sat.saturating_sub(fee),
                        htlc.cltv_expiry,
                        keys,
                        to_self_delay,
                    ),
                    htlc_id: htlc.htlc_id,
                    htlc_script,
                    input_value_sat: output.value_sat,
                    cltv_expiry: htlc.cltv_expiry,
                });
            }
            HtlcDirection::Received => {
                let fee = htlc_success_tx_fee(feerate_per_kw);
                success_txs.push(HtlcSuccessTx {
                    tx: second_level_tx(
                        htlc_outpoint,
                        output.value_sat.saturating_sub(fee),
                        0,
                        keys,
                        to_self_delay,
                    ),
                    htlc_id: htlc.htlc_id,
                    htlc_script,
                    input_value_sat: output.value_sat,
                    payment_hash: htlc.payment_hash,
                });
            }
        }
    }

    (timeout_txs, success_txs)
}

impl HtlcTimeoutTx {
    /// Attaches the complete witness. Stack, bottom to top: CHECKMULTISIG
    /// dummy, counterparty signature, owner signature, an empty element
    /// selecting the timeout path, the HTLC script.
    pub fn finalize(&self, remote_sig: &Signature, local_sig: &Signature) -> Transaction {
        let witness = Witness::from_slice(&[
            &[][..],
            &der_with_sighash_all(remote_sig)[..],
            &der_with_sighash_all(local_sig)[..],
            &[][..],
            self.htlc_script.as_bytes(),
        ]);

        let mut signed_tx = self.tx.clone();
        signed_tx.input[0].witness = witness;
        signed_tx
    }
}

impl HtlcSuccessTx {
    /// Attaches the complete witness; the payment preimage selects the
    /// success path.
    pub fn finalize(
        &self,
        remote_sig: &Signature,
        local_sig: &Signature,
        payment_preimage: [u8; 32],
    ) -> Transaction {
        let witness = Witness::from_slice(&[
            &[][..],
            &der_with_sighash_all(remote_sig)[..],
            &der_with_sighash_all(local_sig)[..],
            &payment_preimage[..],
            self.htlc_script.as_bytes(),
        ]);

        let mut signed_tx = self.tx.clone();
        signed_tx.input[0].witness = witness;
        signed_tx
    }
}
