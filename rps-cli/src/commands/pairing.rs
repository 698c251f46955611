use super::{parse_identity, short_id, Session};
use rps_core::storage::ArenaUpdate;
use rps_core::Storage;

pub async fn challenge(
    storage: &Storage,
    arena: &str,
    player: &str,
    opponent: &str,
) -> anyhow::Result<()> {
    let (caller, target) = (parse_identity(player)?, parse_identity(opponent)?);
    let session = Session::open(storage, arena).await?;

    session.service().challenge(&caller, &target)?;
    session.save(ArenaUpdate::default())?;

    println!("{} challenged {}", caller, target);
    println!();
    println!("{} can accept with:", target);
    println!("rps accept {} {}", target, caller);
    Ok(())
}

pub async fn accept(
    storage: &Storage,
    arena: &str,
    player: &str,
    challenger: &str,
) -> anyhow::Result<()> {
    let (caller, challenger) = (parse_identity(player)?, parse_identity(challenger)?);
    let session = Session::open(storage, arena).await?;

    let pairing = session.service().accept_challenge(&caller, &challenger)?;
    let service = session.save(ArenaUpdate::default())?;

    let bet = service.config().fixed_bet;
    println!(
        "Match {} opened: {} vs {}",
        short_id(&pairing.match_id),
        pairing.challenger,
        pairing.acceptor
    );
    println!("Stake at least {} each:", bet);
    println!("rps commit <player> <rock|paper|scissors>");
    Ok(())
}

pub async fn reject(storage: &Storage, arena: &str, player: &str) -> anyhow::Result<()> {
    let caller = parse_identity(player)?;
    let session = Session::open(storage, arena).await?;

    let challenger = session.service().reject_challenge(&caller)?;
    session.save(ArenaUpdate::default())?;

    println!("{} rejected the challenge from {}", caller, challenger);
    Ok(())
}
