//! Milestone tables shared by tests.

use crate::milestone::{MilestoneConfig, RawMilestone};
use num_bigint::BigUint;
use rand::Rng;

/// Resolves `raw` without validating round boundaries, filling any field the genesis entry leaves
/// unset with a default (4 validators, 8 second blocks, no reward, epoch 0).
pub fn config(raw: Vec<RawMilestone>) -> MilestoneConfig {
    config_with_supply(0u32, raw)
}

/// Like [config], with a genesis supply.
pub fn config_with_supply(
    supply: impl Into<BigUint>,
    mut raw: Vec<RawMilestone>,
) -> MilestoneConfig {
    let genesis = &mut raw[0];
    genesis.active_validators.get_or_insert(4);
    genesis.block_time.get_or_insert(8);
    genesis.reward.get_or_insert_with(|| BigUint::from(0u32));
    genesis.epoch.get_or_insert(0);
    MilestoneConfig::new(supply.into(), raw).unwrap()
}

/// Generates a valid table where validator counts change on round boundaries and unrelated
/// milestones (block time, reward) land anywhere in between. Block times are at least 2 seconds so
/// the first second of every slot may forge.
pub fn random_config(rng: &mut impl Rng) -> MilestoneConfig {
    let mut active = rng.gen_range(1..=10u32);
    let mut raw = vec![RawMilestone::at(0)
        .active_validators(active)
        .block_time(rng.gen_range(2..=10))
        .reward(rng.gen_range(0..5u32))
        .epoch(rng.gen_range(0..1_000_000))];
    let mut span_start = 1u64;
    for _ in 0..rng.gen_range(0..6) {
        let next = span_start + active as u64 * rng.gen_range(1..=4u64);
        let inside = rng.gen_range(span_start..next);
        raw.push(
            RawMilestone::at(inside)
                .block_time(rng.gen_range(2..=10))
                .reward(rng.gen_range(0..5u32)),
        );
        active = rng.gen_range(1..=10);
        raw.push(RawMilestone::at(next).active_validators(active));
        span_start = next;
    }
    MilestoneConfig::new(BigUint::from(rng.gen_range(0..1_000_000u64)), raw).unwrap()
}
