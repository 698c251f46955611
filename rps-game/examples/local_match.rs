use rps_core::storage::{AccountStore, ArenaStore, ArenaUpdate};
use rps_core::{Amount, ArenaConfig, Identity, ManualClock, Storage};
use rps_game::commitment::generate_secret;
use rps_game::{commit_hash, create_arena, ArenaEvent, ArenaService, Balances, Move};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Create temp dir
    let temp_dir = tempdir()?;
    println!("Using temporary directory: {:?}", temp_dir.path());

    let storage = Storage::new(&temp_dir.path().join("rps.db")).await?;
    let config = ArenaConfig::new(Amount::from_units(1), Duration::from_secs(60));
    let arena = create_arena(config.clone())?;
    ArenaStore::new(&storage)
        .create_arena("example", &config, &arena.to_snapshot()?)
        .await?;

    let alice = Identity::new("alice")?;
    let bob = Identity::new("bob")?;
    let accounts = AccountStore::new(&storage);
    accounts.deposit(&alice, Amount::from_units(10)).await?;
    accounts.deposit(&bob, Amount::from_units(10)).await?;

    let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
    let balances = Balances::from_accounts(accounts.list_accounts().await?);
    let service = ArenaService::new(arena, balances, clock.clone());
    let mut events = service.subscribe();

    println!("Pairing up...");
    service.challenge(&alice, &bob)?;
    let pairing = service.accept_challenge(&bob, &alice)?;
    println!("Match {}", pairing.match_id);

    let alice_secret = generate_secret();
    let bob_secret = generate_secret();
    service.commit(
        &alice,
        commit_hash(&alice, Move::Paper, Some(alice_secret.as_slice())),
        Amount::from_units(3),
    )?;
    service.commit(
        &bob,
        commit_hash(&bob, Move::Rock, Some(bob_secret.as_slice())),
        Amount::from_units(3),
    )?;

    // Bob never reveals
    service.reveal(&alice, Move::Paper.code(), &alice_secret)?;
    clock.advance(chrono::Duration::seconds(61));
    let resolution = service.declare_winner(&bob)?;

    println!("\nSettled ({}):", resolution.reason);
    println!("Winner: {:?}", resolution.winner.as_ref().map(|w| w.to_string()));
    println!("Pot: {}", resolution.pot);

    let (arena, balances) = service.snapshot();
    ArenaStore::new(&storage)
        .apply_update(
            "example",
            &ArenaUpdate {
                state: arena.to_snapshot()?,
                balances: balances.accounts(),
                ..Default::default()
            },
        )
        .await?;

    println!("\nBalances:");
    for (identity, balance) in accounts.list_accounts().await? {
        println!("{}: {}", identity, balance);
    }

    println!("\nEvents:");
    while let Ok(event) = events.try_recv() {
        match event {
            ArenaEvent::MatchResolved(r) => println!("resolved {}", r.match_id),
            other => println!("{:?}", other),
        }
    }

    println!("\nExample completed successfully!");

    Ok(())
}
