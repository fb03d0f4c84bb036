//! Token supply and validator approval.
//!
//! Supply starts at the genesis amount and grows by the milestone reward for every block forged
//! from height 1 onward. Approval is a validator's vote balance as a share of supply, expressed as
//! a percentage with two decimal places computed by exact integer division.

use crate::{
    milestone::{serialize_amount, MilestoneConfig},
    Error,
};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};
use serde::{Serialize, Serializer};
use std::{
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
};
use tracing::debug;

/// Returns the total supply after the block at `height` was forged.
///
/// Runs in time proportional to the number of milestones, not to `height`.
pub fn calculate_supply(height: u64, config: &MilestoneConfig) -> BigUint {
    let mut supply = config.genesis_total_amount().clone();
    let milestones = config.milestones();
    for (index, milestone) in milestones.iter().enumerate() {
        let start = milestone.height.max(1);
        let end = milestones
            .get(index + 1)
            .map_or(height, |next| (next.height - 1).min(height));
        if start > height {
            break;
        }
        if end < start {
            continue;
        }
        supply += &milestone.reward * (end - start + 1);
    }
    supply
}

/// A non-negative percentage with two decimal places.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percentage {
    hundredths: u64,
}

impl Percentage {
    /// Creates a percentage from hundredths of a percent (`1234` is `12.34%`).
    pub const fn from_hundredths(hundredths: u64) -> Self {
        Self { hundredths }
    }

    /// Returns the percentage in hundredths of a percent.
    pub const fn hundredths(&self) -> u64 {
        self.hundredths
    }

    /// Returns the nearest floating-point value (for display only).
    pub fn as_f64(&self) -> f64 {
        self.hundredths as f64 / 100.0
    }
}

impl Display for Percentage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let (whole, fraction) = self.hundredths.div_rem(&100);
        write!(f, "{whole}.{fraction:02}")
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// Returns `vote_balance` as a percentage of `total_supply`, rounded half up to two decimals.
///
/// A zero supply yields zero. Percentages too large to represent saturate.
pub fn calculate_approval(vote_balance: &BigUint, total_supply: &BigUint) -> Percentage {
    if total_supply.is_zero() {
        return Percentage::default();
    }

    // hundredths = round(vote * 10_000 / total) = floor((2 * vote * 10_000 + total) / (2 * total))
    let numerator = vote_balance * 20_000u32 + total_supply;
    let denominator = total_supply * 2u32;
    let hundredths = numerator.div_floor(&denominator);
    Percentage::from_hundredths(hundredths.to_u64().unwrap_or(u64::MAX))
}

/// A validator's position in the vote-weighted ranking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedValidator<K> {
    /// Identifier of the validator.
    pub key: K,

    /// Stake voting for the validator.
    #[serde(serialize_with = "serialize_amount")]
    pub vote_balance: BigUint,

    /// 1-based position, highest vote balance first.
    pub rank: u32,

    /// Vote balance as a share of total supply.
    pub approval: Percentage,
}

/// Ranks validators by vote balance (highest first, ties broken by ascending key) and computes
/// each one's approval against `total_supply`.
///
/// Fails with [Error::DuplicateValidator] if a key appears more than once.
pub fn rank_validators<K, I>(
    validators: I,
    total_supply: &BigUint,
) -> Result<Vec<RankedValidator<K>>, Error>
where
    K: Ord + Display,
    I: IntoIterator<Item = (K, BigUint)>,
{
    let mut validators: Vec<(K, BigUint)> = validators.into_iter().collect();
    {
        let mut seen = BTreeSet::new();
        for (key, _) in &validators {
            if !seen.insert(key) {
                return Err(Error::DuplicateValidator(key.to_string()));
            }
        }
    }
    validators.sort_by(|(a_key, a_balance), (b_key, b_balance)| {
        b_balance.cmp(a_balance).then_with(|| a_key.cmp(b_key))
    });
    debug!(count = validators.len(), %total_supply, "ranked validators");

    Ok(validators
        .into_iter()
        .zip(1u32..)
        .map(|((key, vote_balance), rank)| {
            let approval = calculate_approval(&vote_balance, total_supply);
            RankedValidator {
                key,
                vote_balance,
                rank,
                approval,
            }
        })
        .collect())
}
