pub mod commitment;
pub mod fees;
pub mod funding;
pub mod htlc;
pub mod sign;

pub use commitment::{
    commitment_number_obscure_factor, create_commitment_transaction,
    set_obscured_commitment_number, sort_commitment_outputs,
};
pub use fees::{
    commit_tx_fee, htlc_success_tx_fee, htlc_timeout_tx_fee, is_htlc_dust,
};
pub use funding::{create_funding_transaction, funding_utxo};
pub use htlc::{create_htlc_transactions, HtlcSuccessTx, HtlcTimeoutTx};
pub use sign::{
    create_funding_witness, der_with_sighash_all, sign_input, verify_input_signature,
};
