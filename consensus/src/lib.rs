//! Agree on rounds, forging schedules, quorums, and block linkage from a milestone table.
//!
//! Every node in a validator-set network must derive the same answers to a handful of questions
//! from the same configuration: which round a height belongs to, which validator is scheduled to
//! forge at a given time, and whether a received block extends the chain it claims to extend. This
//! crate answers them with pure functions over an explicit [milestone::MilestoneConfig].
//!
//! # Overview
//!
//! - [milestone]: the height-activated parameter table (validators, block time, reward, epoch).
//! - [round]: maps heights to rounds, honoring validator-count changes.
//! - [slots]: maps timestamps to time slots, honoring block-time changes.
//! - [forging]: maps a timestamp and height to the scheduled forger.
//! - [chain]: checks that a block is linked to its predecessor.
//! - [supply]: accumulates token supply and computes validator approval.
//! - [snapshot]: publishes immutable configuration snapshots for reconfiguration.
//! - [types]: block identifiers and the linkage view of a block.
//!
//! Quorum predicates (`is_majority`, `is_minority`) live in `meridian-utils`.
//!
//! # Determinism
//!
//! No function in this crate performs I/O (other than [milestone::MilestoneConfig::load]), reads
//! the wall clock, or caches results. Callers that need the same answer for the same height many
//! times should memoize externally, keyed by the configuration snapshot they used.

use thiserror::Error;

pub mod chain;
pub mod forging;
pub mod milestone;
pub mod round;
pub mod slots;
pub mod snapshot;
pub mod supply;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// Errors that can occur while loading a configuration or evaluating it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Bad milestone at height {height}: the number of validators ({active_validators}) can only be changed at the beginning of a new round")]
    InvalidMilestoneConfiguration { height: u64, active_validators: u32 },
    #[error("No milestones")]
    NoMilestones,
    #[error("First milestone must start at height 0, found {0}")]
    MissingGenesisMilestone(u64),
    #[error("Genesis milestone does not define {0}")]
    MissingField(&'static str),
    #[error("Milestone at height {next} follows milestone at height {previous}")]
    UnsortedMilestones { previous: u64, next: u64 },
    #[error("Milestone at height {0} has zero active validators")]
    ZeroActiveValidators(u64),
    #[error("Milestone at height {0} has zero block time")]
    ZeroBlockTime(u64),
    #[error("Invalid epoch: {0}")]
    InvalidEpoch(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unable to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Block not chained: {0}")]
    NotChained(String),
    #[error("Validator {0} appears twice")]
    DuplicateValidator(String),
}
