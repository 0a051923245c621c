use bitcoin::locktime::absolute::LockTime;
use bitcoin::script::ScriptBuf;
use bitcoin::secp256k1::PublicKey;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, Sequence, Transaction, TxIn, TxOut, Txid, Witness};

use crate::scripts::create_funding_script;
use crate::types::FundingUtxo;

/// Creates a minimal funding transaction: one input spending an existing
/// UTXO, one 2-of-2 P2WSH output that becomes the channel capacity. Change
/// handling is the wallet's concern.
pub fn create_funding_transaction(
    input_txid: Txid,
    input_vout: u32,
    funding_amount_sat: u64,
    local_funding_pubkey: &PublicKey,
    remote_funding_pubkey: &PublicKey,
) -> Transaction {
    let funding_script = create_funding_script(local_funding_pubkey, remote_funding_pubkey);

    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: input_txid,
                vout: input_vout,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(funding_amount_sat),
            script_pubkey: funding_script.to_p2wsh(),
        }],
    }
}

/// The funding outpoint plus the data needed to sign spends of it. This is
/// what the opening handshake hands to the commitment engine once the
/// funding transaction confirms.
pub fn funding_utxo(
    funding_tx: &Transaction,
    vout: u32,
    local_funding_pubkey: &PublicKey,
    remote_funding_pubkey: &PublicKey,
) -> FundingUtxo {
    FundingUtxo {
        outpoint: OutPoint {
            txid: funding_tx.compute_txid(),
            vout,
        },
        redeem_script: create_funding_script(local_funding_pubkey, remote_funding_pubkey),
        amount_sat: funding_tx.output[vout as usize].value.to_sat(),
    }
}
