use crate::game::Award;
use crate::treasury::Treasury;
use crate::{GameError, Result};
use rps_core::{Amount, Identity, MatchId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    pub identity: Identity,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub to: Identity,
    pub amount: Amount,
}

/// Stakes held per match until settlement.
///
/// Does not look at match stage: the arena only asks for a payout once per match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Escrow {
    pools: HashMap<MatchId, Vec<Hold>>,
}

impl Escrow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute `amount` to `identity` in the match pool. Returns the new pool total.
    pub fn hold(&mut self, match_id: MatchId, identity: &Identity, amount: Amount) -> Result<Amount> {
        let total = self.total(match_id)?.checked_add(amount)?;

        self.pools.entry(match_id).or_default().push(Hold {
            identity: identity.clone(),
            amount,
        });

        tracing::debug!("Escrow for match {} now holds {}", match_id, total);
        Ok(total)
    }

    pub fn holds(&self, match_id: MatchId) -> &[Hold] {
        self.pools.get(&match_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total(&self, match_id: MatchId) -> Result<Amount> {
        self.holds(match_id)
            .iter()
            .try_fold(Amount::ZERO, |acc, hold| acc.checked_add(hold.amount))
            .map_err(GameError::from)
    }

    /// Work out the transfers for `award` without touching any state.
    pub fn plan_payout(&self, match_id: MatchId, award: &Award) -> Result<Vec<Transfer>> {
        let holds = self.holds(match_id);

        let transfers = match award {
            Award::Refund => holds
                .iter()
                .filter(|hold| hold.amount > Amount::ZERO)
                .map(|hold| Transfer {
                    to: hold.identity.clone(),
                    amount: hold.amount,
                })
                .collect(),
            Award::Winner(winner) => {
                let pot = self.total(match_id)?;
                if pot == Amount::ZERO {
                    Vec::new()
                } else {
                    vec![Transfer {
                        to: winner.clone(),
                        amount: pot,
                    }]
                }
            }
        };

        Ok(transfers)
    }

    /// Release the pool. The pool is removed before any transfer is made.
    pub fn payout(
        &mut self,
        match_id: MatchId,
        award: &Award,
        treasury: &mut dyn Treasury,
    ) -> Result<Vec<Transfer>> {
        let transfers = self.plan_payout(match_id, award)?;
        self.pools.remove(&match_id);

        for transfer in &transfers {
            treasury.transfer(&transfer.to, transfer.amount)?;
            tracing::info!(
                "Paid {} to {} from match {}",
                transfer.amount,
                transfer.to,
                match_id
            );
        }

        Ok(transfers)
    }
}
