//! Height-activated consensus parameters.
//!
//! A network's parameters (how many validators are active, how long a block slot lasts, how much a
//! block rewards its forger) change over time at agreed heights called milestones. Milestones are
//! persisted sparsely: an entry only lists the fields it changes and inherits the rest from the
//! entry before it. [MilestoneConfig] resolves that inheritance once, at load time, into a table
//! where every entry is fully populated, so lookups never re-merge records.
//!
//! # Format
//!
//! ```json
//! {
//!   "genesisBlock": { "totalAmount": "12500000000000000" },
//!   "milestones": [
//!     { "height": 0, "activeValidators": 53, "blockTime": 8, "reward": "0", "epoch": "2017-03-21T13:00:00.000Z" },
//!     { "height": 75600, "reward": "200000000" }
//!   ]
//! }
//! ```
//!
//! The genesis entry (height 0) must define every field. Keys other than those shown are ignored.

use crate::{round::calculate_round, Error, Timestamp};
use chrono::DateTime;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize, Serializer};
use std::path::Path;
use tracing::{debug, info};

/// A fully-resolved set of consensus parameters, effective from `height` until the next milestone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// First height at which these parameters apply.
    pub height: u64,

    /// Number of validators forging in each round.
    pub active_validators: u32,

    /// Duration of a forging slot, in seconds.
    pub block_time: u32,

    /// Amount minted for every block forged under this milestone.
    #[serde(serialize_with = "serialize_amount")]
    pub reward: BigUint,

    /// Origin of slot numbering, in seconds since the Unix epoch.
    ///
    /// Slots are always numbered from the epoch in effect at height 1. A later milestone may carry
    /// a different value, which is kept in the table but never moves the origin.
    pub epoch: Timestamp,
}

/// A sparse milestone entry. Fields left as `None` are inherited from the previous entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawMilestone {
    pub height: u64,
    pub active_validators: Option<u32>,
    pub block_time: Option<u32>,
    pub reward: Option<BigUint>,
    pub epoch: Option<Timestamp>,
}

impl RawMilestone {
    /// Creates an entry at `height` that changes nothing.
    pub fn at(height: u64) -> Self {
        Self {
            height,
            ..Default::default()
        }
    }

    /// Sets the number of active validators.
    pub fn active_validators(mut self, active_validators: u32) -> Self {
        self.active_validators = Some(active_validators);
        self
    }

    /// Sets the block time (in seconds).
    pub fn block_time(mut self, block_time: u32) -> Self {
        self.block_time = Some(block_time);
        self
    }

    /// Sets the per-block reward.
    pub fn reward(mut self, reward: impl Into<BigUint>) -> Self {
        self.reward = Some(reward.into());
        self
    }

    /// Sets the epoch (in seconds since the Unix epoch).
    pub fn epoch(mut self, epoch: Timestamp) -> Self {
        self.epoch = Some(epoch);
        self
    }
}

impl Milestone {
    /// Applies the fields set in `raw` on top of `self`.
    fn merge(&self, raw: RawMilestone) -> Self {
        Self {
            height: raw.height,
            active_validators: raw.active_validators.unwrap_or(self.active_validators),
            block_time: raw.block_time.unwrap_or(self.block_time),
            reward: raw.reward.unwrap_or_else(|| self.reward.clone()),
            epoch: raw.epoch.unwrap_or(self.epoch),
        }
    }

    fn check(&self) -> Result<(), Error> {
        if self.active_validators == 0 {
            return Err(Error::ZeroActiveValidators(self.height));
        }
        if self.block_time == 0 {
            return Err(Error::ZeroBlockTime(self.height));
        }
        Ok(())
    }
}

/// An immutable, resolved milestone table and the genesis supply it starts from.
///
/// Construct with [MilestoneConfig::new] (structural checks only) followed by
/// [MilestoneConfig::validate], or load a network file with [MilestoneConfig::load] /
/// [MilestoneConfig::from_json] (which do both).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneConfig {
    #[serde(serialize_with = "serialize_amount")]
    genesis_total_amount: BigUint,
    milestones: Vec<Milestone>,
}

impl MilestoneConfig {
    /// Resolves sparse milestone entries into a fully-populated table.
    ///
    /// Entries must be sorted by height (entries sharing a height are folded together, later
    /// fields winning), the first must be at height 0 and define every field, and no entry may
    /// resolve to zero active validators or a zero block time.
    ///
    /// This does not check that validator-count changes fall on round boundaries; call
    /// [MilestoneConfig::validate] before using the table for consensus.
    pub fn new(genesis_total_amount: BigUint, raw: Vec<RawMilestone>) -> Result<Self, Error> {
        let mut entries = raw.into_iter();
        let genesis = entries.next().ok_or(Error::NoMilestones)?;
        if genesis.height != 0 {
            return Err(Error::MissingGenesisMilestone(genesis.height));
        }
        let mut current = Milestone {
            height: 0,
            active_validators: genesis
                .active_validators
                .ok_or(Error::MissingField("activeValidators"))?,
            block_time: genesis.block_time.ok_or(Error::MissingField("blockTime"))?,
            reward: genesis.reward.ok_or(Error::MissingField("reward"))?,
            epoch: genesis.epoch.ok_or(Error::MissingField("epoch"))?,
        };
        current.check()?;

        let mut milestones = Vec::new();
        for entry in entries {
            if entry.height < current.height {
                return Err(Error::UnsortedMilestones {
                    previous: current.height,
                    next: entry.height,
                });
            }
            let merged = current.merge(entry);
            merged.check()?;
            if merged.height == current.height {
                current = merged;
                continue;
            }
            milestones.push(std::mem::replace(&mut current, merged));
        }
        milestones.push(current);

        Ok(Self {
            genesis_total_amount,
            milestones,
        })
    }

    /// Checks that every validator-count change happens at the first height of a round.
    ///
    /// Computes the round of every milestone height, which walks (and checks) every
    /// validator-count transition at or before it.
    pub fn validate(&self) -> Result<(), Error> {
        for milestone in &self.milestones {
            let round = calculate_round(milestone.height, self)?;
            debug!(
                height = milestone.height,
                round = round.round,
                active_validators = milestone.active_validators,
                block_time = milestone.block_time,
                "validated milestone"
            );
        }
        Ok(())
    }

    /// Parses, resolves, and validates a network configuration file's contents.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let file: NetworkFile = serde_json::from_str(json)?;
        let genesis_total_amount = file.genesis_block.total_amount.parse()?;
        let raw = file
            .milestones
            .into_iter()
            .map(PersistedMilestone::parse)
            .collect::<Result<Vec<_>, _>>()?;
        let config = Self::new(genesis_total_amount, raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a network configuration file from disk and passes it to [MilestoneConfig::from_json].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            milestones = config.milestones.len(),
            "loaded milestone configuration"
        );
        Ok(config)
    }

    /// Returns the milestone in effect at `height` (the last one starting at or before it).
    pub fn milestone(&self, height: u64) -> &Milestone {
        // The first milestone starts at height 0, so at least one entry always qualifies.
        let index = self.milestones.partition_point(|m| m.height <= height);
        &self.milestones[index - 1]
    }

    /// Returns the resolved table, sorted by strictly increasing height.
    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    /// Returns the supply minted by the genesis block.
    pub fn genesis_total_amount(&self) -> &BigUint {
        &self.genesis_total_amount
    }

    /// Returns the origin of slot numbering (the epoch in effect when forging starts at height 1).
    pub fn epoch(&self) -> Timestamp {
        self.milestone(1).epoch
    }

    /// Returns every height at or after `from` where `key` takes a new value, paired with that
    /// value.
    ///
    /// The first entry is always `(from, key(milestone(from)))`. Later milestones that repeat the
    /// previous value (because they only change some other field) are skipped.
    pub fn transitions<T, F>(&self, from: u64, key: F) -> Vec<(u64, T)>
    where
        T: PartialEq,
        F: Fn(&Milestone) -> T,
    {
        let mut transitions = vec![(from, key(self.milestone(from)))];
        for milestone in self.milestones.iter().filter(|m| m.height > from) {
            let value = key(milestone);
            if let Some((_, last)) = transitions.last() {
                if *last == value {
                    continue;
                }
            }
            transitions.push((milestone.height, value));
        }
        transitions
    }
}

/// Writes an amount as a decimal string.
pub(crate) fn serialize_amount<S: Serializer>(
    amount: &BigUint,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(amount)
}

/// An amount persisted either as a decimal string or as a JSON number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Amount {
    Text(String),
    Number(u64),
}

impl Amount {
    fn parse(self) -> Result<BigUint, Error> {
        match self {
            Amount::Number(value) => Ok(BigUint::from(value)),
            Amount::Text(text) => {
                BigUint::parse_bytes(text.as_bytes(), 10).ok_or(Error::InvalidAmount(text))
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenesisBlock {
    total_amount: Amount,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkFile {
    genesis_block: GenesisBlock,
    milestones: Vec<PersistedMilestone>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedMilestone {
    height: u64,
    active_validators: Option<u32>,
    block_time: Option<u32>,
    reward: Option<Amount>,
    epoch: Option<String>,
}

impl PersistedMilestone {
    fn parse(self) -> Result<RawMilestone, Error> {
        let epoch = match self.epoch {
            Some(epoch) => {
                let parsed = DateTime::parse_from_rfc3339(&epoch)
                    .map_err(|err| Error::InvalidEpoch(format!("{epoch}: {err}")))?;
                let seconds = u64::try_from(parsed.timestamp())
                    .map_err(|_| Error::InvalidEpoch(format!("{epoch}: before 1970")))?;
                Some(seconds)
            }
            None => None,
        };
        Ok(RawMilestone {
            height: self.height,
            active_validators: self.active_validators,
            block_time: self.block_time,
            reward: self.reward.map(Amount::parse).transpose()?,
            epoch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genesis() -> RawMilestone {
        RawMilestone::at(0)
            .active_validators(4)
            .block_time(8)
            .reward(0u32)
            .epoch(0)
    }

    #[test]
    fn test_merge_inherits_fields() {
        let config = MilestoneConfig::new(
            BigUint::from(1000u32),
            vec![
                genesis(),
                RawMilestone::at(5).reward(2u32),
                RawMilestone::at(9).block_time(4),
            ],
        )
        .unwrap();

        let milestones = config.milestones();
        assert_eq!(milestones.len(), 3);
        assert_eq!(milestones[1].active_validators, 4);
        assert_eq!(milestones[1].block_time, 8);
        assert_eq!(milestones[1].reward, BigUint::from(2u32));
        assert_eq!(milestones[2].block_time, 4);
        assert_eq!(milestones[2].reward, BigUint::from(2u32));
    }

    #[test]
    fn test_same_height_folds() {
        let config = MilestoneConfig::new(
            BigUint::from(0u32),
            vec![
                genesis(),
                RawMilestone::at(5).reward(2u32),
                RawMilestone::at(5).block_time(6),
            ],
        )
        .unwrap();
        assert_eq!(config.milestones().len(), 2);
        assert_eq!(config.milestone(5).reward, BigUint::from(2u32));
        assert_eq!(config.milestone(5).block_time, 6);
    }

    #[test]
    fn test_milestone_lookup() {
        let config = MilestoneConfig::new(
            BigUint::from(0u32),
            vec![genesis(), RawMilestone::at(10).active_validators(8)],
        )
        .unwrap();
        assert_eq!(config.milestone(0).active_validators, 4);
        assert_eq!(config.milestone(9).active_validators, 4);
        assert_eq!(config.milestone(10).active_validators, 8);
        assert_eq!(config.milestone(u64::MAX).active_validators, 8);
    }

    #[test]
    fn test_structural_errors() {
        let zero = BigUint::from(0u32);

        // Test case 0: empty
        assert!(matches!(
            MilestoneConfig::new(zero.clone(), vec![]),
            Err(Error::NoMilestones)
        ));

        // Test case 1: does not start at genesis
        let late = RawMilestone {
            height: 1,
            ..genesis()
        };
        assert!(matches!(
            MilestoneConfig::new(zero.clone(), vec![late]),
            Err(Error::MissingGenesisMilestone(1))
        ));

        // Test case 2: genesis missing a field
        let partial = RawMilestone::at(0).active_validators(4);
        assert!(matches!(
            MilestoneConfig::new(zero.clone(), vec![partial]),
            Err(Error::MissingField("blockTime"))
        ));

        // Test case 3: unsorted
        assert!(matches!(
            MilestoneConfig::new(
                zero.clone(),
                vec![genesis(), RawMilestone::at(10), RawMilestone::at(5)]
            ),
            Err(Error::UnsortedMilestones {
                previous: 10,
                next: 5
            })
        ));

        // Test case 4: zero validators
        assert!(matches!(
            MilestoneConfig::new(
                zero.clone(),
                vec![genesis(), RawMilestone::at(3).active_validators(0)]
            ),
            Err(Error::ZeroActiveValidators(3))
        ));

        // Test case 5: zero block time
        assert!(matches!(
            MilestoneConfig::new(zero, vec![genesis().block_time(0)]),
            Err(Error::ZeroBlockTime(0))
        ));
    }

    #[test]
    fn test_later_epoch_keeps_origin() {
        let config = MilestoneConfig::new(
            BigUint::from(0u32),
            vec![genesis(), RawMilestone::at(5).epoch(1_000)],
        )
        .unwrap();
        assert_eq!(config.milestone(5).epoch, 1_000);
        assert_eq!(config.epoch(), 0);
    }

    #[test]
    fn test_transitions_collapse_repeats() {
        let config = MilestoneConfig::new(
            BigUint::from(0u32),
            vec![
                genesis(),
                RawMilestone::at(5).active_validators(4),
                RawMilestone::at(9).active_validators(8),
                RawMilestone::at(15).active_validators(8).block_time(3),
            ],
        )
        .unwrap();
        assert_eq!(
            config.transitions(1, |m| m.active_validators),
            vec![(1, 4), (9, 8)]
        );
        assert_eq!(
            config.transitions(1, |m| m.block_time),
            vec![(1, 8), (15, 3)]
        );
        assert_eq!(
            config.transitions(10, |m| m.active_validators),
            vec![(10, 8)]
        );
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "network": "ignored",
            "genesisBlock": { "totalAmount": "12500000000000000", "timestamp": 0 },
            "milestones": [
                { "height": 0, "activeValidators": 53, "blockTime": 8, "reward": "0", "epoch": "2017-03-21T13:00:00.000Z" },
                { "height": 75600, "reward": 200000000 }
            ]
        }"#;
        let config = MilestoneConfig::from_json(json).unwrap();
        assert_eq!(
            config.genesis_total_amount(),
            &BigUint::from(12_500_000_000_000_000u64)
        );
        assert_eq!(config.epoch(), 1_490_101_200);
        assert_eq!(config.milestone(75_599).reward, BigUint::from(0u32));
        assert_eq!(
            config.milestone(75_600).reward,
            BigUint::from(200_000_000u32)
        );
        assert_eq!(config.milestone(75_600).active_validators, 53);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        // Test case 0: malformed reward
        let json = r#"{
            "genesisBlock": { "totalAmount": "1" },
            "milestones": [{ "height": 0, "activeValidators": 4, "blockTime": 8, "reward": "lots", "epoch": "2017-03-21T13:00:00Z" }]
        }"#;
        assert!(matches!(
            MilestoneConfig::from_json(json),
            Err(Error::InvalidAmount(_))
        ));

        // Test case 1: malformed epoch
        let json = r#"{
            "genesisBlock": { "totalAmount": "1" },
            "milestones": [{ "height": 0, "activeValidators": 4, "blockTime": 8, "reward": "0", "epoch": "yesterday" }]
        }"#;
        assert!(matches!(
            MilestoneConfig::from_json(json),
            Err(Error::InvalidEpoch(_))
        ));

        // Test case 2: not JSON
        assert!(matches!(
            MilestoneConfig::from_json("milestones"),
            Err(Error::Json(_))
        ));

        // Test case 3: validator count changed mid-round
        let json = r#"{
            "genesisBlock": { "totalAmount": "1" },
            "milestones": [
                { "height": 0, "activeValidators": 3, "blockTime": 8, "reward": "0", "epoch": "2017-03-21T13:00:00Z" },
                { "height": 5, "activeValidators": 4 }
            ]
        }"#;
        assert!(matches!(
            MilestoneConfig::from_json(json),
            Err(Error::InvalidMilestoneConfiguration { height: 5, .. })
        ));
    }
}
