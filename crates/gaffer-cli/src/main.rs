// Gaffer command-line entry point.
//
// 1. Initialize tracing (stderr, so stdout stays machine-readable)
// 2. Load config
// 3. Acquire a snapshot through the cache
// 4. Resolve the user's squad (flag or data source)
// 5. Run one engine operation and print the result

mod args;

use std::io;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use gaffer_core::cache::SnapshotCache;
use gaffer_core::config::{self, Config};
use gaffer_core::model::{Chip, PlayerId, Snapshot};
use gaffer_core::provider;
use gaffer_engine::chips::RoundContext;
use gaffer_engine::transfers::TransferRequest;
use gaffer_engine::Engine;

use args::{Cli, Command, SquadSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cli = Cli::parse();

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: provider={:?}, budget={}, cache ttl {}s",
        config.source.provider, config.engine.squad.budget, config.source.cache_ttl_secs
    );

    let cache = SnapshotCache::new(
        provider::from_config(&config.source),
        Duration::from_secs(config.source.cache_ttl_secs),
    );
    let snapshot = if cli.refresh {
        cache.force_refresh().await
    } else {
        cache.get().await
    }
    .context("failed to acquire a snapshot")?;
    info!(
        "Snapshot: round {}, {} players, {} fixtures",
        snapshot.current_round(),
        snapshot.players().len(),
        snapshot.fixtures().len()
    );

    let user = match cli.command.squad_source() {
        Some(source) => Some(resolve_user_squad(&cli.command, source, &cache, &snapshot).await?),
        None => None,
    };

    run(&cli, &config, &snapshot, user)
}

/// The squad an operation runs on, with the money and chips that go with it.
struct UserSquad {
    ids: Vec<PlayerId>,
    bank: u32,
    chips_used: Vec<Chip>,
}

/// Explicit ids win; an entry supplies bank and used chips unless the command
/// line overrides them.
async fn resolve_user_squad(
    command: &Command,
    source: &SquadSource,
    cache: &SnapshotCache,
    snapshot: &Snapshot,
) -> anyhow::Result<UserSquad> {
    let bank = command.bank();
    let used = command.used_chips().map(<[Chip]>::to_vec);

    if let Some(ids) = &source.squad {
        return Ok(UserSquad {
            ids: ids.clone(),
            bank: bank.unwrap_or(0),
            chips_used: used.unwrap_or_default(),
        });
    }

    let Some(entry_id) = source.entry else {
        bail!("this command needs --squad or --entry");
    };
    let entry = cache
        .fetch_entry(entry_id, snapshot.current_round())
        .await
        .with_context(|| format!("failed to fetch entry {entry_id}"))?;
    info!(
        "Entry {}: {} players, bank {}, {} chips used",
        entry.entry_id,
        entry.player_ids.len(),
        entry.bank,
        entry.chips_used.len()
    );
    Ok(UserSquad {
        ids: entry.player_ids,
        bank: bank.unwrap_or(entry.bank),
        chips_used: used.unwrap_or(entry.chips_used),
    })
}

fn run(
    cli: &Cli,
    config: &Config,
    snapshot: &Snapshot,
    user: Option<UserSquad>,
) -> anyhow::Result<()> {
    let engine_config = &config.engine;
    let engine = Engine::new(snapshot, engine_config);
    // Lineup and captaincy are per-round decisions.
    let default_horizon = match cli.command {
        Command::Lineup { .. } | Command::Captain { .. } => 1,
        Command::Transfers { .. } => engine_config.transfers.default_horizon,
        _ => engine_config.model.default_horizon,
    };
    let horizon = cli.horizon.unwrap_or(default_horizon);

    let user = user.as_ref();
    let squad = || user.context("this command needs --squad or --entry");

    match &cli.command {
        Command::Squad { budget } => {
            let budget = budget.unwrap_or(engine_config.squad.budget);
            print_json(&engine.optimize_squad(budget, horizon)?)
        }
        Command::Lineup { .. } => print_json(&engine.optimize_lineup(&squad()?.ids, horizon)?),
        Command::Transfers {
            transfers,
            free,
            budget,
            ..
        } => {
            let user = squad()?;
            let request = TransferRequest {
                squad: user.ids.clone(),
                budget: *budget,
                bank: user.bank,
                horizon,
                num_transfers: *transfers,
                free_transfers: *free,
            };
            print_json(&engine.suggest_transfers(&request)?)
        }
        Command::Wildcard { .. } => {
            let user = squad()?;
            print_json(&engine.evaluate_wildcard(&user.ids, user.bank, horizon)?)
        }
        Command::Captain { .. } => print_json(&engine.suggest_captain(&squad()?.ids, horizon)?),
        Command::TripleCaptain { .. } => {
            print_json(&engine.evaluate_triple_captain(&squad()?.ids)?)
        }
        Command::Chips { .. } => {
            let user = squad()?;
            let context = RoundContext {
                bank: user.bank,
                chips_used: user.chips_used.clone(),
            };
            print_json(&engine.chip_recommendations(&user.ids, &context)?)
        }
        Command::Values { position, limit } => {
            let entries = engine.value_players(*position, *limit);
            let mut writer = csv::Writer::from_writer(io::stdout());
            for entry in &entries {
                writer.serialize(entry).context("failed to write CSV row")?;
            }
            writer.flush().context("failed to flush CSV output")?;
            Ok(())
        }
        Command::Compare { first, second } => {
            print_json(&engine.compare_players(*first, *second, horizon)?)
        }
        Command::Snapshot => print_json(&snapshot.to_document()),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize result")?;
    println!("{text}");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gaffer=info,warn")),
        )
        .with_writer(io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
