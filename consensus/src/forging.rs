//! Determine which validator is scheduled to forge.
//!
//! Validators take turns in slot order, so a missed slot advances the rotation just like a forged
//! block would. The rotation restarts at index 0 whenever a milestone changes the number of active
//! validators, counting from the slot after the last block forged under the previous count.

use crate::{
    milestone::MilestoneConfig,
    slots::{slot_info, slot_number, BlockTimeLookup},
    Timestamp,
};
use serde::Serialize;

/// The forging schedule at some point in time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgingInfo {
    /// Timestamp a block forged in the current slot must carry.
    pub block_timestamp: Timestamp,

    /// Whether the current slot still accepts a block.
    pub can_forge: bool,

    /// Index (in round order) of the validator scheduled for the current slot.
    pub current_forger: u32,

    /// Index of the validator scheduled for the following slot.
    pub next_forger: u32,
}

/// Returns the forging schedule at `timestamp` for the block following `height - 1`.
pub fn calculate_forging_info<L: BlockTimeLookup + ?Sized>(
    lookup: &L,
    timestamp: Timestamp,
    height: u64,
    config: &MilestoneConfig,
) -> ForgingInfo {
    let slot = slot_info(lookup, timestamp, height, config);

    let mut last_span_slot = 0;
    for (next_height, _) in config
        .transitions(1, |m| m.active_validators)
        .into_iter()
        .skip(1)
    {
        if height < next_height {
            break;
        }
        let last_height = next_height - 1;
        let last_time = lookup.block_timestamp(last_height);
        last_span_slot = slot_number(lookup, last_time, last_height, config).saturating_add(1);
    }

    let active = config.milestone(height).active_validators as u64;
    let current_forger = slot.slot_number.saturating_sub(last_span_slot) % active;
    let next_forger = (current_forger + 1) % active;
    ForgingInfo {
        block_timestamp: slot.start_time,
        can_forge: slot.forging_status,
        current_forger: current_forger as u32,
        next_forger: next_forger as u32,
    }
}
