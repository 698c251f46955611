use super::{parse_identity, settlement_record, short_id, Session};
use anyhow::Context;
use chrono::Utc;
use comfy_table::{presets::UTF8_FULL, Table};
use rps_core::storage::{ArenaUpdate, RevealNote};
use rps_core::{Amount, Storage};
use rps_game::commitment::generate_secret;
use rps_game::{commit_hash, GameError, Move, Stage};

fn decode_secret(secret: &str) -> anyhow::Result<Vec<u8>> {
    hex::decode(secret.trim()).context("Secret must be hex encoded")
}

pub fn print_hash(player: &str, choice: &str, secret: Option<&str>) -> anyhow::Result<()> {
    let identity = parse_identity(player)?;
    let mv: Move = choice.parse()?;
    let secret = secret.map(decode_secret).transpose()?;

    let commitment = commit_hash(&identity, mv, secret.as_deref());
    println!("{}", commitment);
    Ok(())
}

pub async fn commit(
    storage: &Storage,
    arena: &str,
    player: &str,
    choice: &str,
    stake: Option<u64>,
    no_secret: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let identity = parse_identity(player)?;
    let mv: Move = choice.parse()?;
    let session = Session::open(storage, arena).await?;

    let match_id = session
        .service()
        .pairing_of(&identity)
        .ok_or(GameError::NotChallenged)?;
    let stake = stake
        .map(Amount::from_units)
        .unwrap_or(session.service().config().fixed_bet);

    if !yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Stake {} on {} in match {}?",
                stake,
                mv,
                short_id(&match_id)
            ))
            .default(true)
            .interact()?;
        if !confirmed {
            println!("Commit cancelled");
            return Ok(());
        }
    }

    let secret = if no_secret {
        Vec::new()
    } else {
        generate_secret()
    };
    let commitment = commit_hash(&identity, mv, Some(secret.as_slice()));

    let stage = session.service().commit(&identity, commitment, stake)?;

    // Stored with the commitment so `rps reveal` can replay the move
    let note = RevealNote {
        match_id,
        identity: identity.clone(),
        choice: mv.code(),
        secret: secret.clone(),
        created_at: Utc::now(),
    };
    let service = session.save(ArenaUpdate {
        notes: vec![note],
        ..Default::default()
    })?;

    println!("Commitment submitted for match {}", short_id(&match_id));
    println!("Commitment: {}", commitment);
    if !secret.is_empty() {
        println!("Secret: {}", hex::encode(&secret));
        println!("Keep the secret until you reveal");
    }
    println!("Remaining balance: {}", service.balance(&identity));
    println!();

    match stage {
        Stage::BothCommitted => {
            println!("Both players committed. Reveal with:");
            println!("rps reveal {}", identity);
        }
        _ => println!("Waiting for the other player to commit..."),
    }
    Ok(())
}

pub async fn reveal(
    storage: &Storage,
    arena: &str,
    player: &str,
    choice: Option<&str>,
    secret: Option<&str>,
) -> anyhow::Result<()> {
    let identity = parse_identity(player)?;
    let session = Session::open(storage, arena).await?;

    let match_id = session
        .service()
        .pairing_of(&identity)
        .ok_or(GameError::NotChallenged)?;
    let note = session.note(match_id, &identity)?;

    let code = match (choice, &note) {
        (Some(choice), _) => choice.parse::<Move>()?.code(),
        (None, Some(note)) => note.choice,
        (None, None) => anyhow::bail!("No remembered move for {}, pass --choice", identity),
    };
    let secret = match (secret, &note) {
        (Some(secret), _) => decode_secret(secret)?,
        (None, Some(note)) => note.secret.clone(),
        (None, None) => Vec::new(),
    };

    let stage = session.service().reveal(&identity, code, &secret)?;
    session.save(ArenaUpdate::default())?;

    let mv = Move::from_code(code)?;
    println!("{} revealed {} in match {}", identity, mv, short_id(&match_id));
    println!();

    match stage {
        Stage::Resolved => {
            println!("Both moves are public. Settle with:");
            println!("rps settle {}", identity);
        }
        _ => println!("Waiting for the other player to reveal..."),
    }
    Ok(())
}

pub async fn settle(storage: &Storage, arena: &str, player: &str) -> anyhow::Result<()> {
    let identity = parse_identity(player)?;
    let session = Session::open(storage, arena).await?;

    let resolution = session.service().declare_winner(&identity)?;
    session.save(ArenaUpdate {
        settlements: vec![settlement_record(&resolution)],
        cleared_notes: vec![resolution.match_id],
        ..Default::default()
    })?;

    println!("------ MATCH {} SETTLED ------", short_id(&resolution.match_id));
    match &resolution.winner {
        Some(winner) => println!("Winner: {} ({})", winner, resolution.reason),
        None => println!("No winner, stakes returned ({})", resolution.reason),
    }
    println!("Pot: {}", resolution.pot);
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Player", "Move", "Paid out"]);
    for (player, mv) in &resolution.moves {
        let paid: u64 = resolution
            .transfers
            .iter()
            .filter(|t| t.to == *player)
            .map(|t| t.amount.to_units())
            .sum();
        table.add_row(vec![
            player.to_string(),
            mv.map(|m| m.to_string()).unwrap_or_else(|| "hidden".to_string()),
            Amount::from_units(paid).to_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}
