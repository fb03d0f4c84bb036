//! Answer questions about a network configuration.
//!
//! Every [Query] is evaluated against a loaded [MilestoneConfig] and answered with a JSON value.
//! The inspector has no access to chain history, so slot and forging queries assume no slot was
//! missed since the epoch (see [Scheduled]).

use meridian_consensus::{
    forging::calculate_forging_info,
    milestone::MilestoneConfig,
    round::{calculate_round, is_new_round},
    slots::{block_time, is_new_block_time, slot_info, time_until_next_slot, Scheduled},
    supply::{calculate_approval, calculate_supply},
    Timestamp,
};
use meridian_utils::{is_majority, is_minority, majority_threshold, minority_threshold, quorum};
use num_bigint::BigUint;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while answering a query.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration rejected: {0}")]
    Config(#[from] meridian_consensus::Error),
    #[error("Invalid vote balance: {0}")]
    InvalidVoteBalance(String),
}

/// A question about the configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    /// Check that validator-count changes fall on round boundaries.
    Validate,

    /// The round a height belongs to.
    Round { height: u64 },

    /// The forging schedule at a timestamp.
    Forging { height: u64, timestamp: Timestamp },

    /// The slot a timestamp falls in.
    Slot { height: u64, timestamp: Timestamp },

    /// Total supply after a height.
    Supply { height: u64 },

    /// A vote balance as a share of supply at a height.
    Approval { vote_balance: String, height: u64 },

    /// Whether a number of votes reaches the majority and minority thresholds.
    Quorum { validators: u32, votes: u32 },
}

/// Evaluates `query` against `config`.
pub fn execute(config: &MilestoneConfig, query: &Query) -> Result<Value, Error> {
    debug!(?query, "executing query");
    let lookup = Scheduled::new(config);
    let result = match *query {
        Query::Validate => {
            config.validate()?;
            json!({
                "valid": true,
                "config": config,
            })
        }
        Query::Round { height } => {
            let round = calculate_round(height, config)?;
            json!({
                "height": height,
                "round": round,
                "isNewRound": is_new_round(height, config),
            })
        }
        Query::Forging { height, timestamp } => {
            let info = calculate_forging_info(&lookup, timestamp, height, config);
            json!({
                "height": height,
                "timestamp": timestamp,
                "forging": info,
            })
        }
        Query::Slot { height, timestamp } => {
            let slot = slot_info(&lookup, timestamp, height, config);
            let until = time_until_next_slot(&lookup, timestamp, height, config);
            json!({
                "height": height,
                "timestamp": timestamp,
                "slot": slot,
                "blockTime": block_time(height, config),
                "isNewBlockTime": is_new_block_time(height, config),
                "secondsUntilNextSlot": until.as_secs(),
            })
        }
        Query::Supply { height } => json!({
            "height": height,
            "supply": calculate_supply(height, config).to_string(),
        }),
        Query::Approval {
            ref vote_balance,
            height,
        } => {
            let vote = vote_balance
                .parse::<BigUint>()
                .map_err(|_| Error::InvalidVoteBalance(vote_balance.clone()))?;
            let supply = calculate_supply(height, config);
            let approval = calculate_approval(&vote, &supply);
            json!({
                "height": height,
                "voteBalance": vote.to_string(),
                "supply": supply.to_string(),
                "approval": approval,
                "display": approval.to_string(),
            })
        }
        Query::Quorum { validators, votes } => json!({
            "validators": validators,
            "votes": votes,
            "majorityThreshold": majority_threshold(validators),
            "minorityThreshold": minority_threshold(validators),
            "isMajority": is_majority(votes, validators),
            "isMinority": is_minority(votes, validators),
            "bftQuorum": quorum(validators),
        }),
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETWORK: &str = r#"{
        "genesisBlock": { "totalAmount": "1000" },
        "milestones": [
            { "height": 0, "activeValidators": 4, "blockTime": 8, "reward": "0", "epoch": "1970-01-01T00:00:00.000Z" },
            { "height": 1, "reward": 2 },
            { "height": 9, "activeValidators": 2 }
        ]
    }"#;

    fn config() -> MilestoneConfig {
        MilestoneConfig::from_json(NETWORK).unwrap()
    }

    #[test]
    fn test_round() {
        let result = execute(&config(), &Query::Round { height: 10 }).unwrap();
        assert_eq!(result["round"]["round"], 3);
        assert_eq!(result["round"]["roundHeight"], 9);
        assert_eq!(result["round"]["maxValidators"], 2);
        assert_eq!(result["isNewRound"], false);
    }

    #[test]
    fn test_forging_and_slot() {
        let config = config();
        let result = execute(
            &config,
            &Query::Forging {
                height: 10,
                timestamp: 72,
            },
        )
        .unwrap();
        assert_eq!(result["forging"]["currentForger"], 1);
        assert_eq!(result["forging"]["nextForger"], 0);
        assert_eq!(result["forging"]["canForge"], true);

        let result = execute(
            &config,
            &Query::Slot {
                height: 10,
                timestamp: 77,
            },
        )
        .unwrap();
        assert_eq!(result["slot"]["slotNumber"], 9);
        assert_eq!(result["slot"]["forgingStatus"], false);
        assert_eq!(result["secondsUntilNextSlot"], 3);
    }

    #[test]
    fn test_supply_and_approval() {
        let config = config();
        let result = execute(&config, &Query::Supply { height: 5 }).unwrap();
        assert_eq!(result["supply"], "1010");

        let result = execute(
            &config,
            &Query::Approval {
                vote_balance: "101".to_string(),
                height: 5,
            },
        )
        .unwrap();
        assert_eq!(result["display"], "10.00");

        let result = execute(
            &config,
            &Query::Approval {
                vote_balance: "ten".to_string(),
                height: 5,
            },
        );
        assert!(matches!(result, Err(Error::InvalidVoteBalance(_))));
    }

    #[test]
    fn test_quorum() {
        let result = execute(
            &config(),
            &Query::Quorum {
                validators: 53,
                votes: 36,
            },
        )
        .unwrap();
        assert_eq!(result["majorityThreshold"], 36);
        assert_eq!(result["minorityThreshold"], 18);
        assert_eq!(result["isMajority"], true);
        assert_eq!(result["bftQuorum"], 36);
    }

    #[test]
    fn test_validate() {
        let result = execute(&config(), &Query::Validate).unwrap();
        assert_eq!(result["valid"], true);
        assert_eq!(result["config"]["genesisTotalAmount"], "1000");
    }
}
