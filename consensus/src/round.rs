//! Map heights to rounds.
//!
//! A round is a contiguous span of heights in which every active validator forges exactly one
//! block. Height 0 (genesis) is the synthetic round 0; round 1 starts at height 1. With 4 active
//! validators, rounds are organized as follows:
//!
//! ```txt
//! 0: [0]
//! 1: [1, 2, 3, 4]
//! 2: [5, 6, 7, 8]
//! 3: [9, 10, 11, 12]
//! ...
//! ```
//!
//! When a milestone changes the number of active validators, the new count takes effect at the
//! milestone height, which must be the first height of a round under the previous count.

use crate::{milestone::MilestoneConfig, Error};
use serde::Serialize;

/// Where a height falls in the round schedule.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundInfo {
    /// Round the height belongs to.
    pub round: u64,

    /// First height of the round.
    pub round_height: u64,

    /// Round of the following height.
    pub next_round: u64,

    /// Number of validators forging in the round.
    pub max_validators: u32,
}

impl RoundInfo {
    /// The synthetic round containing only genesis.
    pub const GENESIS: Self = Self {
        round: 0,
        round_height: 0,
        next_round: 1,
        max_validators: 0,
    };

    /// Returns true if this is the round's last height (the next height opens a new round).
    pub const fn is_last_height(&self) -> bool {
        self.next_round != self.round
    }
}

/// Returns the round `height` belongs to.
///
/// Fails with [Error::InvalidMilestoneConfiguration] if a validator-count change at or before
/// `height` does not fall on a round boundary.
pub fn calculate_round(height: u64, config: &MilestoneConfig) -> Result<RoundInfo, Error> {
    if height == 0 {
        return Ok(RoundInfo::GENESIS);
    }

    let mut round = 1;
    let mut round_height = 1;
    let mut span_start = 1;
    let mut active = config.milestone(1).active_validators;
    for (next_height, next_active) in config
        .transitions(1, |m| m.active_validators)
        .into_iter()
        .skip(1)
    {
        if height < next_height {
            break;
        }

        // The span under the previous count must consist of whole rounds
        let span = next_height - span_start;
        if span % active as u64 != 0 {
            return Err(Error::InvalidMilestoneConfiguration {
                height: next_height,
                active_validators: next_active,
            });
        }
        round += span / active as u64;
        round_height = next_height;
        span_start = next_height;
        active = next_active;
    }

    let offset = height - span_start;
    let completed = offset / active as u64;
    round += completed;
    round_height += completed * active as u64;
    let next_round = if (offset + 1) % active as u64 == 0 {
        round + 1
    } else {
        round
    };

    Ok(RoundInfo {
        round,
        round_height,
        next_round,
        max_validators: active,
    })
}

/// Returns true if `height` is the first height of a round.
///
/// Only milestones that actually change the number of active validators open a new span; a
/// milestone that only changes (say) the reward does not shift round boundaries.
pub fn is_new_round(height: u64, config: &MilestoneConfig) -> bool {
    if height <= 1 {
        return true;
    }

    let mut span = (1, config.milestone(1).active_validators);
    for transition in config.transitions(1, |m| m.active_validators) {
        if transition.0 > height {
            break;
        }
        span = transition;
    }
    let (span_start, active) = span;
    (height - span_start) % active as u64 == 0
}
