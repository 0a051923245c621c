use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::{UpdateAddHtlc, UpdateMessage};
use crate::types::{HtlcDirection, HtlcOutputInfo};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SpecError {
    /// A fulfill or fail referenced an HTLC the spec does not contain.
    #[error("unknown htlc id {0}")]
    UnknownHtlc(u64),

    /// Applying the changes drove a balance below zero.
    #[error("balance below zero after applying changes")]
    InsufficientBalance,
}

/// One HTLC as seen by the owner of a commitment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Htlc {
    pub direction: HtlcDirection,
    pub add: UpdateAddHtlc,
}

/// The balance-and-HTLC snapshot a commitment transaction encodes, always
/// written from the point of view of the commitment's owner: `to_local_msat`
/// is the owner's balance and `Offered` HTLCs are paid by the owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentSpec {
    pub feerate_per_kw: u64,
    pub to_local_msat: u64,
    pub to_remote_msat: u64,
    pub htlcs: Vec<Htlc>,
}

impl CommitmentSpec {
    pub fn new(feerate_per_kw: u64, to_local_msat: u64, to_remote_msat: u64) -> Self {
        CommitmentSpec {
            feerate_per_kw,
            to_local_msat,
            to_remote_msat,
            htlcs: Vec::new(),
        }
    }

    /// Finds the HTLC with the given direction and id.
    pub fn find(&self, direction: HtlcDirection, id: u64) -> Option<&Htlc> {
        self.htlcs
            .iter()
            .find(|htlc| htlc.direction == direction && htlc.add.id == id)
    }

    /// Balances plus in-flight HTLC value; constant across every reachable
    /// state of a channel.
    pub fn total_msat(&self) -> u64 {
        self.to_local_msat
            + self.to_remote_msat
            + self
                .htlcs
                .iter()
                .map(|htlc| htlc.add.amount_msat)
                .sum::<u64>()
    }

    /// The HTLC data the transaction builders consume.
    pub fn htlc_output_infos(&self) -> Vec<HtlcOutputInfo> {
        self.htlcs
            .iter()
            .map(|htlc| HtlcOutputInfo {
                direction: htlc.direction,
                htlc_id: htlc.add.id,
                amount_msat: htlc.add.amount_msat,
                payment_hash: htlc.add.payment_hash,
                cltv_expiry: htlc.add.cltv_expiry,
            })
            .collect()
    }

    /// Folds two change lists into a new spec. The first list belongs to the
    /// owner of this spec (their additions enter as `Offered` and debit
    /// `to_local`), the second to the counterparty (`Received`, debiting
    /// `to_remote`). All additions apply before any settlement; a fulfill
    /// removes the opposite-direction HTLC and credits the settler, a fail
    /// removes it and refunds the payer.
    pub fn reduce(
        &self,
        owner_changes: &[UpdateMessage],
        counterparty_changes: &[UpdateMessage],
    ) -> Result<CommitmentSpec, SpecError> {
        let mut to_local = self.to_local_msat as i64;
        let mut to_remote = self.to_remote_msat as i64;
        let mut htlcs = self.htlcs.clone();

        for change in owner_changes {
            if let UpdateMessage::Add(add) = change {
                to_local -= add.amount_msat as i64;
                htlcs.push(Htlc {
                    direction: HtlcDirection::Offered,
                    add: add.clone(),
                });
            }
        }
        for change in counterparty_changes {
            if let UpdateMessage::Add(add) = change {
                to_remote -= add.amount_msat as i64;
                htlcs.push(Htlc {
                    direction: HtlcDirection::Received,
                    add: add.clone(),
                });
            }
        }

        let mut remove = |direction: HtlcDirection, id: u64| -> Result<u64, SpecError> {
            let position = htlcs
                .iter()
                .position(|htlc| htlc.direction == direction && htlc.add.id == id)
                .ok_or(SpecError::UnknownHtlc(id))?;
            Ok(htlcs.remove(position).add.amount_msat)
        };

        for change in owner_changes {
            match change {
                // The owner settles an HTLC it received and claims the funds
                UpdateMessage::Fulfill(fulfill) => {
                    to_local += remove(HtlcDirection::Received, fulfill.id)? as i64;
                }
                // The owner refuses an HTLC it received, refunding the payer
                UpdateMessage::Fail(fail) => {
                    to_remote += remove(HtlcDirection::Received, fail.id)? as i64;
                }
                UpdateMessage::Add(_) => {}
            }
        }
        for change in counterparty_changes {
            match change {
                UpdateMessage::Fulfill(fulfill) => {
                    to_remote += remove(HtlcDirection::Offered, fulfill.id)? as i64;
                }
                UpdateMessage::Fail(fail) => {
                    to_local += remove(HtlcDirection::Offered, fail.id)? as i64;
                }
                UpdateMessage::Add(_) => {}
            }
        }

        if to_local < 0 || to_remote < 0 {
            return Err(SpecError::InsufficientBalance);
        }

        Ok(CommitmentSpec {
            feerate_per_kw: self.feerate_per_kw,
            to_local_msat: to_local as u64,
            to_remote_msat: to_remote as u64,
            htlcs,
        })
    }
}
