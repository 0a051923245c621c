use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::{ErrorMessage, OpenChannel};

/// Violations of our channel-acceptance policy. All of them reject the
/// channel: the opening state machine sends the rendered wire error and
/// moves to closed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    #[error("requirement failed: channelReserveSatoshis too high: ratio={ratio} max={max}")]
    ReserveTooHigh { ratio: f64, max: f64 },

    #[error("requirement failed: toSelfDelay too high: delay={delay} max={max}")]
    ToSelfDelayTooHigh { delay: u16, max: u16 },

    #[error("requirement failed: dustLimitSatoshis too low: dust={dust} min={min}")]
    DustLimitTooLow { dust: u64, min: u64 },

    #[error("requirement failed: pushMsat exceeds funding: push={push_msat} funding={funding_msat}")]
    PushExceedsFunding { push_msat: u64, funding_msat: u64 },
}

impl PolicyError {
    /// Renders the wire error sent before the channel is abandoned.
    pub fn into_wire(self, channel_id: u64) -> ErrorMessage {
        ErrorMessage {
            channel_id,
            data: self.to_string(),
        }
    }
}

/// Bounds we impose on channels proposed to us.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelPolicy {
    /// Largest acceptable `channel_reserve / funding` ratio
    pub max_reserve_ratio: f64,
    /// Largest delay the peer may impose on our to_local outputs
    pub max_to_self_delay: u16,
    /// Smallest dust limit we consider safe against uneconomical outputs
    pub min_dust_limit_sat: u64,
}

impl Default for ChannelPolicy {
    fn default() -> Self {
        ChannelPolicy {
            max_reserve_ratio: 0.05,
            max_to_self_delay: 2016,
            min_dust_limit_sat: 546,
        }
    }
}

impl ChannelPolicy {
    /// Validates the structural parameters of a received `open_channel`.
    pub fn validate_open_channel(&self, open: &OpenChannel) -> Result<(), PolicyError> {
        let funding_msat = open.funding_satoshis * 1000;
        if open.push_msat > funding_msat {
            return Err(PolicyError::PushExceedsFunding {
                push_msat: open.push_msat,
                funding_msat,
            });
        }

        let ratio = open.channel_reserve_satoshis as f64 / open.funding_satoshis as f64;
        if ratio > self.max_reserve_ratio {
            return Err(PolicyError::ReserveTooHigh {
                ratio,
                max: self.max_reserve_ratio,
            });
        }

        if open.to_self_delay > self.max_to_self_delay {
            return Err(PolicyError::ToSelfDelayTooHigh {
                delay: open.to_self_delay,
                max: self.max_to_self_delay,
            });
        }

        if open.dust_limit_satoshis < self.min_dust_limit_sat {
            return Err(PolicyError::DustLimitTooLow {
                dust: open.dust_limit_satoshis,
                min: self.min_dust_limit_sat,
            });
        }

        Ok(())
    }
}
