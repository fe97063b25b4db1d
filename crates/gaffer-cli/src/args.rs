// Command-line interface: `gaffer [--refresh] [--horizon N] <command> ...`.

use clap::{Args, Parser, Subcommand};

use gaffer_core::model::{Chip, PlayerId, Position};

/// Fantasy football decisions from the current game snapshot
#[derive(Debug, Parser)]
#[command(name = "gaffer")]
#[command(about = "Squad, lineup, transfer, captain and chip decisions for fantasy football")]
pub struct Cli {
    /// Ignore the snapshot cache and fetch fresh data
    #[arg(long, global = true)]
    pub refresh: bool,

    /// Rounds to look ahead (each command has its own default)
    #[arg(long, global = true)]
    pub horizon: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the user's squad comes from: explicit ids or an entry at the data source.
#[derive(Debug, Clone, PartialEq, Args)]
#[group(required = true, multiple = false)]
pub struct SquadSource {
    /// Fifteen player ids, comma separated
    #[arg(long, value_delimiter = ',')]
    pub squad: Option<Vec<PlayerId>>,

    /// Read squad, bank and used chips for this entry from the data source
    #[arg(long)]
    pub entry: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Best 15 within a budget
    Squad {
        /// Budget in tenths (1000 = 100.0m); defaults to the configured budget
        #[arg(long)]
        budget: Option<u32>,
    },
    /// Best starting eleven and bench order
    Lineup {
        #[command(flatten)]
        source: SquadSource,
    },
    /// Greedy transfer plan
    Transfers {
        #[command(flatten)]
        source: SquadSource,
        /// Transfers to make
        #[arg(long, default_value = "1")]
        transfers: u32,
        /// Free transfers available
        #[arg(long, default_value = "1")]
        free: u32,
        /// Money in the bank, in tenths
        #[arg(long)]
        bank: Option<u32>,
        /// Squad value the plan may spend; defaults to the current squad cost
        #[arg(long)]
        budget: Option<u32>,
    },
    /// Rebuild-versus-keep wildcard evaluation
    Wildcard {
        #[command(flatten)]
        source: SquadSource,
        /// Money in the bank, in tenths
        #[arg(long)]
        bank: Option<u32>,
    },
    /// Captain, vice-captain and differential pick
    Captain {
        #[command(flatten)]
        source: SquadSource,
    },
    /// Triple captain decision for the current round
    TripleCaptain {
        #[command(flatten)]
        source: SquadSource,
    },
    /// Recommendations for every chip, with at most one primary
    Chips {
        #[command(flatten)]
        source: SquadSource,
        /// Money in the bank, in tenths
        #[arg(long)]
        bank: Option<u32>,
        /// Chips already played, comma separated (e.g. wildcard,bench_boost)
        #[arg(long, value_delimiter = ',', value_parser = parse_chip)]
        used: Option<Vec<Chip>>,
    },
    /// Value rankings as CSV
    Values {
        /// Only this position (GK, DEF, MID, FWD)
        #[arg(long, value_parser = parse_position)]
        position: Option<Position>,
        /// Rows to print
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Head-to-head comparison of two players
    Compare {
        first: PlayerId,
        second: PlayerId,
    },
    /// Dump the snapshot as a document the file provider can read
    Snapshot,
}

impl Command {
    /// The squad the command operates on, if it takes one.
    pub fn squad_source(&self) -> Option<&SquadSource> {
        match self {
            Command::Lineup { source }
            | Command::Transfers { source, .. }
            | Command::Wildcard { source, .. }
            | Command::Captain { source }
            | Command::TripleCaptain { source }
            | Command::Chips { source, .. } => Some(source),
            Command::Squad { .. }
            | Command::Values { .. }
            | Command::Compare { .. }
            | Command::Snapshot => None,
        }
    }

    /// Bank override given on the command line.
    pub fn bank(&self) -> Option<u32> {
        match self {
            Command::Transfers { bank, .. }
            | Command::Wildcard { bank, .. }
            | Command::Chips { bank, .. } => *bank,
            _ => None,
        }
    }

    /// Used-chips override given on the command line.
    pub fn used_chips(&self) -> Option<&[Chip]> {
        match self {
            Command::Chips { used, .. } => used.as_deref(),
            _ => None,
        }
    }
}

fn parse_chip(s: &str) -> Result<Chip, String> {
    let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
    match normalized.as_str() {
        "free_hit" => Ok(Chip::FreeHit),
        "bench_boost" => Ok(Chip::BenchBoost),
        "triple_captain" => Ok(Chip::TripleCaptain),
        other => Chip::from_api_name(other).ok_or_else(|| format!("unknown chip `{s}`")),
    }
}

fn parse_position(s: &str) -> Result<Position, String> {
    Position::from_str_pos(s).ok_or_else(|| format!("unknown position `{s}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(line: &str) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("gaffer").chain(line.split_whitespace()))
    }

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_transfers_with_globals() {
        let cli = parse("transfers --squad 1,2,3 --transfers 2 --refresh --bank 15").unwrap();
        assert!(cli.refresh);
        assert_eq!(cli.horizon, None);
        let source = cli.command.squad_source().unwrap();
        assert_eq!(source.squad, Some(vec![1, 2, 3]));
        assert_eq!(cli.command.bank(), Some(15));
        match cli.command {
            Command::Transfers {
                transfers,
                free,
                budget,
                ..
            } => {
                assert_eq!(transfers, 2);
                assert_eq!(free, 1);
                assert_eq!(budget, None);
            }
            other => panic!("expected transfers, got {other:?}"),
        }
    }

    #[test]
    fn squad_commands_need_exactly_one_source() {
        assert!(parse("lineup").is_err());
        assert!(parse("lineup --squad 1,2 --entry 7").is_err());
        let cli = parse("lineup --entry 7 --horizon 3").unwrap();
        assert_eq!(cli.horizon, Some(3));
        assert_eq!(cli.command.squad_source().unwrap().entry, Some(7));
        assert!(parse("squad").unwrap().command.squad_source().is_none());
        assert!(parse("snapshot").unwrap().command.squad_source().is_none());
    }

    #[test]
    fn rejects_unknown_commands_and_bad_values() {
        assert!(parse("draft").is_err());
        assert!(parse("").is_err());
        assert!(parse("squad --budget").is_err());
        assert!(parse("squad --budget lots").is_err());
        assert!(parse("compare 10").is_err());
    }

    #[test]
    fn parses_chips_in_either_spelling() {
        let cli = parse("chips --entry 1 --used wildcard,bboost,free-hit,3xc").unwrap();
        assert_eq!(
            cli.command.used_chips(),
            Some(
                &[
                    Chip::Wildcard,
                    Chip::BenchBoost,
                    Chip::FreeHit,
                    Chip::TripleCaptain
                ][..]
            )
        );
        assert!(parse("chips --entry 1 --used joker").is_err());
    }

    #[test]
    fn parses_positions_and_defaults_the_limit() {
        match parse("values --position mid").unwrap().command {
            Command::Values { position, limit } => {
                assert_eq!(position, Some(Position::Midfielder));
                assert_eq!(limit, 20);
            }
            other => panic!("expected values, got {other:?}"),
        }
        assert!(parse("values --position keeper").is_err());
    }
}
