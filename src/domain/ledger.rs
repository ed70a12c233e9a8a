use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::Cents;

/// A positive debt: `debtor` owes `creditor` `amount` cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub debtor: String,
    pub creditor: String,
    pub amount: Cents,
}

impl BalanceEntry {
    pub fn new(debtor: impl Into<String>, creditor: impl Into<String>, amount: Cents) -> Self {
        Self {
            debtor: debtor.into(),
            creditor: creditor.into(),
            amount,
        }
    }
}

/// Outcome of registering a participant. Re-registering is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    AlreadyExists,
}

/// How an expense was divided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseSplit {
    pub payer: String,
    pub amount: Cents,
    /// One entry per valid participant, in the order given (payer included if listed).
    pub shares: Vec<(String, Cents)>,
    /// Names that were not registered and took no part in the split.
    pub skipped: Vec<String>,
}

/// A successful settlement and what is still owed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub from: String,
    pub to: String,
    pub amount: Cents,
    pub remaining: Cents,
}

/// Pairwise debt table between registered participants.
///
/// At most one direction of any pair holds a positive amount; every
/// mutation nets the pair before returning. Failed operations leave the
/// table untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    participants: BTreeSet<String>,
    // debtor -> creditor -> amount
    balances: BTreeMap<String, BTreeMap<String, Cents>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from stored participants and balance rows.
    ///
    /// Rows are sanitized on the way in: non-positive amounts and self-debts
    /// are dropped, unknown names are registered, and rows for both
    /// directions of a pair are netted.
    pub fn hydrate(
        participants: impl IntoIterator<Item = String>,
        balances: impl IntoIterator<Item = BalanceEntry>,
    ) -> Self {
        let mut ledger = Self::new();
        for name in participants {
            if ledger.register_participant(&name).is_err() {
                warn!(participant = %name, "dropping stored participant with invalid name");
            }
        }

        for entry in balances {
            if entry.amount <= 0
                || entry.debtor == entry.creditor
                || entry.debtor.is_empty()
                || entry.creditor.is_empty()
            {
                warn!(
                    debtor = %entry.debtor,
                    creditor = %entry.creditor,
                    amount = entry.amount,
                    "dropping invalid stored balance"
                );
                continue;
            }
            ledger.register_participant(&entry.debtor).ok();
            ledger.register_participant(&entry.creditor).ok();

            match ledger.net_after_shift(&entry.debtor, &entry.creditor, entry.amount) {
                Some(net) => ledger.store_net(&entry.debtor, &entry.creditor, net),
                None => warn!(
                    debtor = %entry.debtor,
                    creditor = %entry.creditor,
                    "dropping stored balance that overflows its pair"
                ),
            }
        }

        ledger
    }

    // ========================
    // Participants
    // ========================

    pub fn register_participant(&mut self, name: &str) -> Result<Registration, LedgerError> {
        if name.is_empty() {
            return Err(LedgerError::InvalidName);
        }
        if self.participants.contains(name) {
            return Ok(Registration::AlreadyExists);
        }

        self.participants.insert(name.to_string());
        self.balances.entry(name.to_string()).or_default();
        Ok(Registration::Added)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.participants.contains(name)
    }

    /// Registered names in lexicographic order.
    pub fn list_participants(&self) -> Vec<String> {
        self.participants.iter().cloned().collect()
    }

    // ========================
    // Mutations
    // ========================

    /// Split `amount` evenly between the registered names in `participants`,
    /// making each of them owe `payer` their share.
    pub fn add_expense(
        &mut self,
        payer: &str,
        amount: Cents,
        participants: &[String],
    ) -> Result<ExpenseSplit, LedgerError> {
        self.require_registered(payer)?;
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let (valid, skipped): (Vec<&String>, Vec<&String>) = participants
            .iter()
            .partition(|name| self.is_registered(name));
        let skipped: Vec<String> = skipped.into_iter().cloned().collect();

        if valid.iter().all(|name| name.as_str() == payer) {
            return Err(LedgerError::EmptySplitSet { skipped });
        }

        let shares = split_evenly(amount, &valid);

        // Sum per debtor first so a name listed twice shifts its pair once.
        let mut owed_by: BTreeMap<&str, Cents> = BTreeMap::new();
        for (name, share) in &shares {
            if name != payer {
                let total = owed_by.entry(name.as_str()).or_insert(0);
                *total = total.checked_add(*share).ok_or(LedgerError::AmountOverflow)?;
            }
        }

        // Compute every new net before writing anything.
        let mut plan = Vec::with_capacity(owed_by.len());
        for (debtor, share) in owed_by {
            let net = self
                .net_after_shift(debtor, payer, share)
                .ok_or(LedgerError::AmountOverflow)?;
            plan.push((debtor, net));
        }
        for (debtor, net) in plan {
            self.store_net(debtor, payer, net);
        }

        Ok(ExpenseSplit {
            payer: payer.to_string(),
            amount,
            shares,
            skipped,
        })
    }

    /// Pay back part or all of what `from` owes `to`.
    pub fn settle(
        &mut self,
        from: &str,
        to: &str,
        amount: Cents,
    ) -> Result<Settlement, LedgerError> {
        self.require_registered(from)?;
        self.require_registered(to)?;
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let owed = self.owed(from, to);
        if owed <= 0 {
            return Err(LedgerError::NothingOwed {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        if amount > owed {
            return Err(LedgerError::OverSettlement {
                from: from.to_string(),
                to: to.to_string(),
                owed,
                requested: amount,
            });
        }

        // owes(to, from) is zero here, so the net is simply what is left.
        let remaining = owed - amount;
        self.store_net(from, to, remaining);

        Ok(Settlement {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            remaining,
        })
    }

    // ========================
    // Queries
    // ========================

    /// Amount `debtor` currently owes `creditor` (0 when absent).
    pub fn owed(&self, debtor: &str, creditor: &str) -> Cents {
        self.balances
            .get(debtor)
            .and_then(|row| row.get(creditor))
            .copied()
            .unwrap_or(0)
    }

    /// Every positive debt, ordered by debtor then creditor.
    pub fn list_net_balances(&self) -> Vec<BalanceEntry> {
        self.balances
            .iter()
            .flat_map(|(debtor, row)| {
                row.iter()
                    .filter(|(_, amount)| **amount > 0)
                    .map(move |(creditor, amount)| BalanceEntry::new(debtor, creditor, *amount))
            })
            .collect()
    }

    /// Debts where `name` is the debtor.
    pub fn debts_of(&self, name: &str) -> Vec<BalanceEntry> {
        self.list_net_balances()
            .into_iter()
            .filter(|entry| entry.debtor == name)
            .collect()
    }

    /// Debts where `name` is the creditor.
    pub fn credits_of(&self, name: &str) -> Vec<BalanceEntry> {
        self.list_net_balances()
            .into_iter()
            .filter(|entry| entry.creditor == name)
            .collect()
    }

    /// Total owed to `name` minus total `name` owes.
    ///
    /// Each pair fits in [`Cents`] but several pairs together may not, so
    /// this fails with [`LedgerError::AmountOverflow`] when the sum doesn't.
    pub fn net_position(&self, name: &str) -> Result<Cents, LedgerError> {
        self.list_net_balances()
            .iter()
            .try_fold(0 as Cents, |position, entry| {
                if entry.creditor == name {
                    position.checked_add(entry.amount)
                } else if entry.debtor == name {
                    position.checked_sub(entry.amount)
                } else {
                    Some(position)
                }
            })
            .ok_or(LedgerError::AmountOverflow)
    }

    /// Sum of every outstanding debt.
    pub fn total_outstanding(&self) -> Result<Cents, LedgerError> {
        self.list_net_balances()
            .iter()
            .try_fold(0 as Cents, |total, entry| total.checked_add(entry.amount))
            .ok_or(LedgerError::AmountOverflow)
    }

    // ========================
    // Internals
    // ========================

    fn require_registered(&self, name: &str) -> Result<(), LedgerError> {
        if self.is_registered(name) {
            Ok(())
        } else {
            Err(LedgerError::UnregisteredParticipant(name.to_string()))
        }
    }

    /// Signed amount `debtor` would owe `creditor` after adding `delta`.
    /// Positive: debtor owes creditor. Negative: creditor owes debtor.
    fn net_after_shift(&self, debtor: &str, creditor: &str, delta: Cents) -> Option<Cents> {
        self.owed(debtor, creditor)
            .checked_sub(self.owed(creditor, debtor))?
            .checked_add(delta)
    }

    /// Replace both directions of a pair with the single signed net.
    fn store_net(&mut self, a: &str, b: &str, net: Cents) {
        self.remove_entry(a, b);
        self.remove_entry(b, a);
        if net > 0 {
            self.insert_entry(a, b, net);
        } else if net < 0 {
            self.insert_entry(b, a, -net);
        }
    }

    fn insert_entry(&mut self, debtor: &str, creditor: &str, amount: Cents) {
        self.balances
            .entry(debtor.to_string())
            .or_default()
            .insert(creditor.to_string(), amount);
    }

    fn remove_entry(&mut self, debtor: &str, creditor: &str) {
        if let Some(row) = self.balances.get_mut(debtor) {
            row.remove(creditor);
        }
    }
}

/// Divide `amount` between `names`. The first `amount % n` names carry one
/// extra cent, so the shares always add up to `amount`.
fn split_evenly(amount: Cents, names: &[&String]) -> Vec<(String, Cents)> {
    let count = names.len() as Cents;
    let base = amount / count;
    let remainder = amount % count;

    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let extra = if (i as Cents) < remainder { 1 } else { 0 };
            ((*name).clone(), base + extra)
        })
        .collect()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Participant name must not be empty")]
    InvalidName,

    #[error("Participant not registered: {0}")]
    UnregisteredParticipant(String),

    /// `skipped` holds the unregistered names that were dropped on the way.
    #[error("No valid participants to split the expense with")]
    EmptySplitSet { skipped: Vec<String> },

    #[error("{from} does not owe {to}")]
    NothingOwed { from: String, to: String },

    #[error("Cannot settle more than owed: {from} owes {to} {owed} cents, requested {requested}")]
    OverSettlement {
        from: String,
        to: String,
        owed: Cents,
        requested: Cents,
    },

    #[error("Invalid amount: {0} cents (must be positive)")]
    InvalidAmount(Cents),

    #[error("Amount overflow")]
    AmountOverflow,
}
