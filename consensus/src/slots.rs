//! Map timestamps to forging slots.
//!
//! Time is divided into slots of `block_time` seconds starting at the configuration's epoch. When
//! a milestone changes the block time, slots under the old block time end at the last block
//! forged before the milestone and numbering continues under the new block time from there:
//!
//! ```txt
//! block time 8 until height 2, then 4:
//!
//! slot:   0        1    2    3    4
//! time:   0        8    12   16   20
//! height: 1        2    3    4    5
//! ```
//!
//! Because validators can miss slots, the time at which a span ends depends on when blocks were
//! actually forged. That history is supplied through [BlockTimeLookup]; use [Scheduled] when no
//! history is available (or none was missed).

use crate::{milestone::MilestoneConfig, Timestamp};
use serde::Serialize;
use std::time::Duration;

/// Provides the timestamp of the block forged at a given height.
///
/// Only queried for heights at milestone boundaries at or below the height being evaluated.
pub trait BlockTimeLookup {
    /// Returns the timestamp of the block at `height`.
    fn block_timestamp(&self, height: u64) -> Timestamp;
}

impl<F: Fn(u64) -> Timestamp> BlockTimeLookup for F {
    fn block_timestamp(&self, height: u64) -> Timestamp {
        self(height)
    }
}

/// A [BlockTimeLookup] that assumes every slot since the epoch produced a block.
///
/// Heights 0 and 1 are forged at the epoch and every later block follows its parent by the
/// parent's block time. Timestamps saturate at `u64::MAX`.
#[derive(Clone, Debug)]
pub struct Scheduled {
    epoch: Timestamp,

    /// First height of each block-time span, its block time, and the timestamp of that height.
    spans: Vec<(u64, u32, Timestamp)>,
}

impl Scheduled {
    pub fn new(config: &MilestoneConfig) -> Self {
        let epoch = config.epoch();
        let mut spans: Vec<(u64, u32, Timestamp)> = Vec::new();
        for (height, block_time) in config.transitions(1, |m| m.block_time) {
            let timestamp = match spans.last() {
                Some(&(start, previous_block_time, timestamp)) => {
                    advance(timestamp, height - start, previous_block_time)
                }
                None => epoch,
            };
            spans.push((height, block_time, timestamp));
        }
        Self { epoch, spans }
    }
}

impl BlockTimeLookup for Scheduled {
    fn block_timestamp(&self, height: u64) -> Timestamp {
        let index = self.spans.partition_point(|&(start, _, _)| start < height);
        if index == 0 {
            return self.epoch;
        }
        let (start, block_time, timestamp) = self.spans[index - 1];
        advance(timestamp, height - start, block_time)
    }
}

/// Returns the time `blocks` slots of `block_time` seconds after `timestamp`.
fn advance(timestamp: Timestamp, blocks: u64, block_time: u32) -> Timestamp {
    timestamp.saturating_add(blocks.saturating_mul(block_time as u64))
}

/// The slot a timestamp falls in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotInfo {
    /// Number of slots elapsed since the epoch.
    pub slot_number: u64,

    /// First second of the slot.
    pub start_time: Timestamp,

    /// Last second of the slot.
    pub end_time: Timestamp,

    /// Duration of the slot, in seconds.
    pub block_time: u32,

    /// Whether a block may still be forged in this slot (only during its first half).
    pub forging_status: bool,
}

/// Position of the block-time span containing some height.
struct Span {
    /// Slots completed in all earlier spans.
    total_slots: u64,

    /// Time at which the previous span ended (the epoch for the first span).
    end_time: Timestamp,

    /// Block time of this span.
    block_time: u32,
}

fn span<L: BlockTimeLookup + ?Sized>(lookup: &L, height: u64, config: &MilestoneConfig) -> Span {
    let transitions = config.transitions(1, |m| m.block_time);
    let mut block_time = config.milestone(1).block_time;
    let mut total_slots: u64 = 0;
    let mut end_time = config.epoch();
    let mut span_height = 1;
    for &(next_height, next_block_time) in transitions.iter().skip(1) {
        if height < next_height {
            break;
        }
        let start_time = lookup.block_timestamp(span_height);
        let last_time = lookup.block_timestamp(next_height - 1);
        end_time = last_time.saturating_add(block_time as u64);
        let slots = end_time.saturating_sub(start_time) / block_time as u64;
        total_slots = total_slots.saturating_add(slots);

        block_time = next_block_time;
        span_height = next_height;
    }
    Span {
        total_slots,
        end_time,
        block_time,
    }
}

/// Returns the block time in effect at `height`.
pub fn block_time(height: u64, config: &MilestoneConfig) -> u32 {
    config.milestone(height).block_time
}

/// Returns true if `height` is the first height forged under a new block time.
pub fn is_new_block_time(height: u64, config: &MilestoneConfig) -> bool {
    height == 1
        || config
            .transitions(1, |m| m.block_time)
            .iter()
            .any(|&(start, _)| start == height)
}

/// Returns the slot `timestamp` falls in when evaluated at `height`.
///
/// Timestamps earlier than the start of the current block-time span are treated as the span's
/// first slot. The last slot before `u64::MAX` is truncated to end there.
pub fn slot_info<L: BlockTimeLookup + ?Sized>(
    lookup: &L,
    timestamp: Timestamp,
    height: u64,
    config: &MilestoneConfig,
) -> SlotInfo {
    let span = span(lookup, height, config);
    let block_time = span.block_time as u64;
    let elapsed = timestamp.saturating_sub(span.end_time) / block_time;

    // Never past `timestamp` (or the span end), so this cannot overflow
    let start_time = span.end_time + elapsed * block_time;
    SlotInfo {
        slot_number: span.total_slots.saturating_add(elapsed),
        start_time,
        end_time: start_time.saturating_add(block_time - 1),
        block_time: span.block_time,
        forging_status: timestamp < start_time.saturating_add(block_time / 2),
    }
}

/// Returns the number of the slot `timestamp` falls in when evaluated at `height`.
pub fn slot_number<L: BlockTimeLookup + ?Sized>(
    lookup: &L,
    timestamp: Timestamp,
    height: u64,
    config: &MilestoneConfig,
) -> u64 {
    slot_info(lookup, timestamp, height, config).slot_number
}

/// Returns true if a block may be forged at `timestamp` when evaluated at `height`.
pub fn is_forging_allowed<L: BlockTimeLookup + ?Sized>(
    lookup: &L,
    timestamp: Timestamp,
    height: u64,
    config: &MilestoneConfig,
) -> bool {
    slot_info(lookup, timestamp, height, config).forging_status
}

/// Returns the start time of `slot` when evaluated at `height`.
///
/// Slots before the current block-time span are clamped to the span's first slot and slots
/// starting after `u64::MAX` saturate to it.
pub fn slot_time<L: BlockTimeLookup + ?Sized>(
    lookup: &L,
    slot: u64,
    height: u64,
    config: &MilestoneConfig,
) -> Timestamp {
    let span = span(lookup, height, config);
    let elapsed = slot.saturating_sub(span.total_slots);
    advance(span.end_time, elapsed, span.block_time)
}

/// Returns the slot following the one `now` falls in.
pub fn next_slot<L: BlockTimeLookup + ?Sized>(
    lookup: &L,
    now: Timestamp,
    height: u64,
    config: &MilestoneConfig,
) -> u64 {
    slot_number(lookup, now, height, config).saturating_add(1)
}

/// Returns how long until the slot following the one `now` falls in begins.
pub fn time_until_next_slot<L: BlockTimeLookup + ?Sized>(
    lookup: &L,
    now: Timestamp,
    height: u64,
    config: &MilestoneConfig,
) -> Duration {
    let next = next_slot(lookup, now, height, config);
    let start_time = slot_time(lookup, next, height, config);
    Duration::from_secs(start_time.saturating_sub(now))
}
