use bitcoin::hashes::Hash;
use bitcoin::script::ScriptBuf;
use bitcoin::secp256k1::ecdsa::Signature;
use bitcoin::secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{Amount, Transaction, Witness};

/// SIGHASH_ALL message for a P2WSH input.
fn p2wsh_sighash(
    tx: &Transaction,
    input_index: usize,
    witness_script: &ScriptBuf,
    amount_sat: u64,
) -> Message {
    let mut sighash_cache = SighashCache::new(tx);
    let sighash = sighash_cache
        .p2wsh_signature_hash(
            input_index,
            witness_script,
            Amount::from_sat(amount_sat),
            EcdsaSighashType::All,
        )
        .expect("input index is in range for internally built transactions");
    Message::from_digest(sighash.to_byte_array())
}

/// Signs a P2WSH input with SIGHASH_ALL, returning the compact signature
/// exchanged on the wire.
pub fn sign_input(
    secp_ctx: &Secp256k1<All>,
    tx: &Transaction,
    input_index: usize,
    witness_script: &ScriptBuf,
    amount_sat: u64,
    secret_key: &SecretKey,
) -> Signature {
    let msg = p2wsh_sighash(tx, input_index, witness_script, amount_sat);
    secp_ctx.sign_ecdsa(&msg, secret_key)
}

/// Verifies a counterparty signature over a P2WSH input by recomputing the
/// sighash the signer must have committed to.
pub fn verify_input_signature(
    secp_ctx: &Secp256k1<All>,
    tx: &Transaction,
    input_index: usize,
    witness_script: &ScriptBuf,
    amount_sat: u64,
    signature: &Signature,
    pubkey: &PublicKey,
) -> Result<(), bitcoin::secp256k1::Error> {
    let msg = p2wsh_sighash(tx, input_index, witness_script, amount_sat);
    secp_ctx.verify_ecdsa(&msg, signature, pubkey)
}

/// DER-serializes a signature and appends the SIGHASH_ALL flag, the form
/// script interpreters consume.
pub fn der_with_sighash_all(signature: &Signature) -> Vec<u8> {
    let mut sig_bytes = signature.serialize_der().to_vec();
    sig_bytes.push(EcdsaSighashType::All as u8);
    sig_bytes
}

/// Assembles the witness spending the 2-of-2 funding output. CHECKMULTISIG
/// consumes signatures in the order the pubkeys appear in the script, which
/// is lexicographic; the leading empty element feeds the CHECKMULTISIG
/// off-by-one.
pub fn create_funding_witness(
    redeem_script: &ScriptBuf,
    sig_a: &Signature,
    pubkey_a: &PublicKey,
    sig_b: &Signature,
    pubkey_b: &PublicKey,
) -> Witness {
    let (first_sig, second_sig) = if pubkey_a.serialize() < pubkey_b.serialize() {
        (sig_a, sig_b)
    } else {
        (sig_b, sig_a)
    };

    Witness::from_slice(&[
        &[][..],
        &der_with_sighash_all(first_sig)[..],
        &der_with_sighash_all(second_sig)[..],
        redeem_script.as_bytes(),
    ])
}
