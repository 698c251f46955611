use crate::Result;
use rps_core::{Amount, Identity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where released escrow goes. Implemented by whatever holds player funds.
pub trait Treasury {
    fn transfer(&mut self, to: &Identity, amount: Amount) -> Result<()>;
}

/// In-memory spendable balances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    accounts: HashMap<Identity, Amount>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_accounts(accounts: impl IntoIterator<Item = (Identity, Amount)>) -> Self {
        Self {
            accounts: accounts.into_iter().collect(),
        }
    }

    pub fn balance(&self, identity: &Identity) -> Amount {
        self.accounts.get(identity).copied().unwrap_or_default()
    }

    pub fn credit(&mut self, identity: &Identity, amount: Amount) -> Result<Amount> {
        let updated = self.balance(identity).checked_add(amount)?;
        self.accounts.insert(identity.clone(), updated);
        Ok(updated)
    }

    pub fn debit(&mut self, identity: &Identity, amount: Amount) -> Result<Amount> {
        let updated = self.balance(identity).checked_sub(amount)?;
        self.accounts.insert(identity.clone(), updated);
        Ok(updated)
    }

    /// Accounts sorted by identity.
    pub fn accounts(&self) -> Vec<(Identity, Amount)> {
        let mut accounts: Vec<_> = self
            .accounts
            .iter()
            .map(|(id, amount)| (id.clone(), *amount))
            .collect();
        accounts.sort();
        accounts
    }

    /// Accounts whose balance differs from `before`, sorted by identity.
    pub fn changed_since(&self, before: &Balances) -> Vec<(Identity, Amount)> {
        let mut changed: Vec<_> = self
            .accounts
            .iter()
            .filter(|(id, amount)| before.accounts.get(*id) != Some(*amount))
            .map(|(id, amount)| (id.clone(), *amount))
            .collect();
        changed.sort();
        changed
    }
}

impl Treasury for Balances {
    fn transfer(&mut self, to: &Identity, amount: Amount) -> Result<()> {
        self.credit(to, amount)?;
        Ok(())
    }
}
