use super::{parse_identity, short_id, Session};
use comfy_table::{presets::UTF8_FULL, Table};
use rps_core::storage::ArenaStore;
use rps_core::{Amount, ArenaConfig, Storage};
use rps_game::create_arena;
use std::time::Duration;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

pub async fn init_arena(
    storage: &Storage,
    arena: &str,
    bet: u64,
    reveal_span: u64,
    commit_span: Option<u64>,
) -> anyhow::Result<()> {
    let mut config = ArenaConfig::new(Amount::from_units(bet), Duration::from_secs(reveal_span));
    if let Some(span) = commit_span {
        config = config.with_commit_span(Duration::from_secs(span));
    }

    let state = create_arena(config.clone())?.to_snapshot()?;
    ArenaStore::new(storage)
        .create_arena(arena, &config, &state)
        .await?;

    println!("Arena '{}' created", arena);
    println!("Fixed bet: {}", config.fixed_bet);
    println!("Reveal span: {}s", config.reveal_span.as_secs());
    match config.commit_span {
        Some(span) => println!("Commit span: {}s", span.as_secs()),
        None => println!("Commit span: none"),
    }
    Ok(())
}

pub async fn show_status(storage: &Storage, arena: &str, player: Option<&str>) -> anyhow::Result<()> {
    let session = Session::open(storage, arena).await?;
    let (state, _) = session.service().snapshot();

    let player = player.map(parse_identity).transpose()?;

    if let Some(identity) = &player {
        println!("Player: {}", identity);
        println!("Balance: {}", session.service().balance(identity));
        if let Some(challenger) = state.challenger_of(identity) {
            println!("Challenged by: {}", challenger);
        }
        if let Some(target) = state.target_of(identity) {
            println!("Challenging: {}", target);
        }
        match state.pairing_of(identity) {
            Some(match_id) => println!("Active match: {}", short_id(&match_id)),
            None => {
                if let Some(last) = state.last_resolution_of(identity) {
                    let result = match &last.winner {
                        Some(winner) if winner == identity => "won",
                        Some(_) => "lost",
                        None => "refunded",
                    };
                    println!("Last match: {} ({})", short_id(&last.match_id), result);
                }
            }
        }
        println!();
    }

    let matches: Vec<_> = state
        .matches()
        .filter(|m| player.as_ref().map_or(true, |p| m.pairing().includes(p)))
        .collect();

    if matches.is_empty() {
        println!("No active matches.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Match ID",
        "Challenger",
        "Acceptor",
        "Stage",
        "Escrow",
        "Reveal Deadline",
    ]);

    for game in matches {
        let pairing = game.pairing();
        table.add_row(vec![
            short_id(&game.id()),
            pairing.challenger.to_string(),
            pairing.acceptor.to_string(),
            game.stage().to_string(),
            state.escrowed(game.id())?.to_string(),
            game.reveal_deadline()
                .map(|d| d.format(TIME_FORMAT).to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }

    println!("Active Matches:");
    println!("{}", table);
    Ok(())
}

pub async fn show_history(
    storage: &Storage,
    arena: &str,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let store = ArenaStore::new(storage);
    // Surface a missing arena instead of an empty history
    store.load_arena(arena).await?;
    let settlements = store.list_settlements(arena, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settlements)?);
        return Ok(());
    }

    if settlements.is_empty() {
        println!("No settled matches.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Match ID",
        "Players",
        "Winner",
        "Pot",
        "Reason",
        "Settled At",
    ]);

    for record in &settlements {
        table.add_row(vec![
            short_id(&record.match_id),
            format!("{} vs {}", record.player_a, record.player_b),
            record
                .winner
                .as_ref()
                .map(|w| w.to_string())
                .unwrap_or_else(|| "-".to_string()),
            record.pot.to_string(),
            record.reason.clone(),
            record.settled_at.format(TIME_FORMAT).to_string(),
        ]);
    }

    println!("Settled Matches:");
    println!("{}", table);
    Ok(())
}
