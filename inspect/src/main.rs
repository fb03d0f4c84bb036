//! Inspect a network configuration from the command line.
//!
//! # Usage
//!
//! ```sh
//! meridian-inspect --config network.json validate
//! meridian-inspect --config network.json round --height 75600
//! meridian-inspect --config network.json forging --height 75600 --timestamp 1490706000
//! meridian-inspect --config network.json slot --height 75600 --timestamp 1490706000
//! meridian-inspect --config network.json supply --height 75600
//! meridian-inspect --config network.json approval --vote-balance 300000000000000 --height 75600
//! meridian-inspect --config network.json quorum --validators 53 --votes 36
//! ```
//!
//! Results are printed to stdout as JSON. The process exits with a non-zero status if the
//! configuration cannot be loaded or is rejected.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use inspect::{execute, Query};
use meridian_consensus::milestone::MilestoneConfig;
use std::process::exit;
use tracing::{error, Level};

fn height() -> Arg {
    Arg::new("height")
        .long("height")
        .required(true)
        .value_parser(value_parser!(u64))
        .help("Block height")
}

fn timestamp() -> Arg {
    Arg::new("timestamp")
        .long("timestamp")
        .required(true)
        .value_parser(value_parser!(u64))
        .help("Seconds since the Unix epoch")
}

fn query(matches: &ArgMatches) -> Option<Query> {
    let (name, args) = matches.subcommand()?;
    let height = || args.get_one::<u64>("height").copied();
    let timestamp = || args.get_one::<u64>("timestamp").copied();
    let query = match name {
        "validate" => Query::Validate,
        "round" => Query::Round { height: height()? },
        "forging" => Query::Forging {
            height: height()?,
            timestamp: timestamp()?,
        },
        "slot" => Query::Slot {
            height: height()?,
            timestamp: timestamp()?,
        },
        "supply" => Query::Supply { height: height()? },
        "approval" => Query::Approval {
            vote_balance: args.get_one::<String>("vote-balance")?.clone(),
            height: height()?,
        },
        "quorum" => Query::Quorum {
            validators: *args.get_one::<u32>("validators")?,
            votes: *args.get_one::<u32>("votes")?,
        },
        _ => return None,
    };
    Some(query)
}

fn main() {
    // Parse arguments
    let matches = Command::new("meridian-inspect")
        .about("inspect rounds, slots, forging assignments, and supply of a network configuration")
        .arg(
            Arg::new("config")
                .long("config")
                .required(true)
                .value_parser(value_parser!(String))
                .help("Path to the network configuration (JSON)"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log milestone resolution and query evaluation"),
        )
        .subcommand_required(true)
        .subcommand(Command::new("validate").about("check the configuration"))
        .subcommand(
            Command::new("round")
                .about("round a height belongs to")
                .arg(height()),
        )
        .subcommand(
            Command::new("forging")
                .about("forging schedule at a timestamp")
                .arg(height())
                .arg(timestamp()),
        )
        .subcommand(
            Command::new("slot")
                .about("slot a timestamp falls in")
                .arg(height())
                .arg(timestamp()),
        )
        .subcommand(
            Command::new("supply")
                .about("total supply after a height")
                .arg(height()),
        )
        .subcommand(
            Command::new("approval")
                .about("vote balance as a share of supply")
                .arg(
                    Arg::new("vote-balance")
                        .long("vote-balance")
                        .required(true)
                        .value_parser(value_parser!(String))
                        .help("Stake voting for the validator"),
                )
                .arg(height()),
        )
        .subcommand(
            Command::new("quorum")
                .about("whether a number of votes reaches majority and minority")
                .arg(
                    Arg::new("validators")
                        .long("validators")
                        .required(true)
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("votes")
                        .long("votes")
                        .required(true)
                        .value_parser(value_parser!(u32)),
                ),
        )
        .get_matches();

    // Create logger
    let level = if matches.get_flag("verbose") {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let Some(path) = matches.get_one::<String>("config") else {
        error!("missing configuration path");
        exit(2);
    };
    let config = match MilestoneConfig::load(path) {
        Ok(config) => config,
        Err(err) => {
            error!(path = %path, %err, "configuration rejected");
            exit(1);
        }
    };

    // Answer query
    let Some(query) = query(&matches) else {
        error!("unknown command");
        exit(2);
    };
    let result = match execute(&config, &query) {
        Ok(result) => result,
        Err(err) => {
            error!(%err, "query failed");
            exit(1);
        }
    };
    match serde_json::to_string_pretty(&result) {
        Ok(output) => println!("{output}"),
        Err(err) => {
            error!(%err, "unable to encode result");
            exit(1);
        }
    }
}
