// ============================================================================
// FEE CALCULATIONS
// ============================================================================
// Commitment and second-level transaction weights are fixed by the
// transaction templates, so fees are pure functions of the feerate.

use crate::types::HtlcDirection;

/// Weight of a commitment transaction with no HTLC outputs.
pub const COMMITMENT_TX_BASE_WEIGHT: u64 = 724;
/// Additional weight per untrimmed HTLC output.
pub const COMMITMENT_TX_WEIGHT_PER_HTLC: u64 = 172;
/// Weight of an HTLC-timeout transaction.
pub const HTLC_TIMEOUT_TX_WEIGHT: u64 = 663;
/// Weight of an HTLC-success transaction.
pub const HTLC_SUCCESS_TX_WEIGHT: u64 = 703;

/// Fee of a commitment transaction carrying `num_untrimmed_htlcs` outputs:
/// `(feerate_per_kw * weight) / 1000`.
pub fn commit_tx_fee(feerate_per_kw: u64, num_untrimmed_htlcs: usize) -> u64 {
    let weight = COMMITMENT_TX_BASE_WEIGHT + COMMITMENT_TX_WEIGHT_PER_HTLC * num_untrimmed_htlcs as u64;
    (feerate_per_kw * weight) / 1000
}

pub fn htlc_timeout_tx_fee(feerate_per_kw: u64) -> u64 {
    (feerate_per_kw * HTLC_TIMEOUT_TX_WEIGHT) / 1000
}

pub fn htlc_success_tx_fee(feerate_per_kw: u64) -> u64 {
    (feerate_per_kw * HTLC_SUCCESS_TX_WEIGHT) / 1000
}

/// An HTLC is trimmed from the commitment when its amount cannot pay for the
/// second-level transaction that would claim it plus the dust limit of the
/// commitment's owner. Trimmed amounts go to fees.
pub fn is_htlc_dust(
    direction: HtlcDirection,
    htlc_amount_sat: u64,
    dust_limit_sat: u64,
    feerate_per_kw: u64,
) -> bool {
    let claim_fee = match direction {
        HtlcDirection::Offered => htlc_timeout_tx_fee(feerate_per_kw),
        HtlcDirection::Received => htlc_success_tx_fee(feerate_per_kw),
    };
    htlc_amount_sat < dust_limit_sat + claim_fee
}
