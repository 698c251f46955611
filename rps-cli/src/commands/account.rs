use super::parse_identity;
use comfy_table::{presets::UTF8_FULL, Table};
use rps_core::storage::AccountStore;
use rps_core::{Amount, Storage};

pub async fn fund(storage: &Storage, player: &str, amount: u64) -> anyhow::Result<()> {
    let identity = parse_identity(player)?;
    if amount == 0 {
        anyhow::bail!("Amount must be greater than zero");
    }

    let balance = AccountStore::new(storage)
        .deposit(&identity, Amount::from_units(amount))
        .await?;

    println!("Funded {} with {} units", identity, amount);
    println!("New balance: {}", balance);
    Ok(())
}

pub async fn show_balance(storage: &Storage, player: Option<&str>) -> anyhow::Result<()> {
    let accounts = AccountStore::new(storage);

    if let Some(player) = player {
        let identity = parse_identity(player)?;
        let balance = accounts.balance(&identity).await?;
        println!("Balance for '{}': {}", identity, balance);
        return Ok(());
    }

    let all = accounts.list_accounts().await?;
    if all.is_empty() {
        println!("No funded players.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Player", "Balance"]);
    for (identity, balance) in &all {
        table.add_row(vec![identity.to_string(), balance.to_string()]);
    }

    println!("{}", table);
    Ok(())
}
