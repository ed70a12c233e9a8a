use tracing::{debug, info, warn};

use crate::domain::{
    BalanceEntry, Cents, ExpenseSplit, Ledger, LedgerError, Registration, Settlement,
};
use crate::storage::Repository;

use super::AppError;

/// Application service wrapping the ledger and its storage.
/// This is the primary interface for any client (CLI, menu, tests).
///
/// Every mutation runs against the in-memory ledger first. Storage is then
/// brought in step with it; a storage failure is logged and counted but never
/// undoes or blocks the in-memory change.
pub struct LedgerService {
    ledger: Ledger,
    repo: Option<Repository>,
    sync_failures: u64,
}

/// Everything known about one participant.
pub struct ParticipantSummary {
    pub name: String,
    pub owes: Vec<BalanceEntry>,
    pub owed_by: Vec<BalanceEntry>,
    pub net: Cents,
}

impl LedgerService {
    pub fn new(ledger: Ledger, repo: Option<Repository>) -> Self {
        Self {
            ledger,
            repo,
            sync_failures: 0,
        }
    }

    /// A service with no storage behind it.
    pub fn in_memory() -> Self {
        Self::new(Ledger::new(), None)
    }

    /// Open (creating if needed) the database at the given path and load the ledger from it.
    pub async fn open(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Self::hydrate(repo).await
    }

    /// Like [`LedgerService::open`], but keeps running in memory when the
    /// database cannot be opened.
    pub async fn open_or_memory(database_path: &str) -> Self {
        match Self::open(database_path).await {
            Ok(service) => service,
            Err(err) => {
                warn!(
                    database = database_path,
                    error = %err,
                    "could not open database, running without persistence"
                );
                Self::in_memory()
            }
        }
    }

    async fn hydrate(repo: Repository) -> Result<Self, AppError> {
        let stored_participants = repo.load_participants().await?;
        let balances = repo.load_balances().await?;
        let loaded_rows = balances.len();

        let ledger = Ledger::hydrate(stored_participants.clone(), balances);
        let mut service = Self::new(ledger, Some(repo));

        // Balance rows may name people missing from the users table.
        for name in service.ledger.list_participants() {
            if !stored_participants.contains(&name) {
                service.sync_participant(&name).await;
            }
        }

        let kept_rows = service.ledger.list_net_balances().len();
        if kept_rows != loaded_rows {
            warn!(
                loaded = loaded_rows,
                kept = kept_rows,
                "stored balances were inconsistent and have been normalized"
            );
            service.sync_balances().await;
        }

        info!(
            participants = service.ledger.list_participants().len(),
            balances = kept_rows,
            "ledger loaded"
        );
        Ok(service)
    }

    /// Release the database connections.
    pub async fn shutdown(self) {
        if let Some(repo) = &self.repo {
            repo.close().await;
            debug!("database closed");
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn is_persistent(&self) -> bool {
        self.repo.is_some()
    }

    /// Number of storage writes that failed since the service started.
    pub fn sync_failures(&self) -> u64 {
        self.sync_failures
    }

    // ========================
    // Participant operations
    // ========================

    pub async fn register_participant(&mut self, name: &str) -> Result<Registration, AppError> {
        let registration = self.ledger.register_participant(name)?;

        match registration {
            Registration::Added => {
                info!(participant = name, "participant registered");
                self.sync_participant(name).await;
            }
            Registration::AlreadyExists => {
                debug!(participant = name, "participant already registered");
            }
        }

        Ok(registration)
    }

    pub fn list_participants(&self) -> Vec<String> {
        self.ledger.list_participants()
    }

    pub fn participant_summary(&self, name: &str) -> Result<ParticipantSummary, AppError> {
        if !self.ledger.is_registered(name) {
            return Err(AppError::ParticipantNotFound(name.to_string()));
        }

        Ok(ParticipantSummary {
            name: name.to_string(),
            owes: self.ledger.debts_of(name),
            owed_by: self.ledger.credits_of(name),
            net: self.ledger.net_position(name)?,
        })
    }

    // ========================
    // Balance operations
    // ========================

    pub async fn add_expense(
        &mut self,
        payer: &str,
        amount: Cents,
        participants: &[String],
    ) -> Result<ExpenseSplit, AppError> {
        let split = match self.ledger.add_expense(payer, amount, participants) {
            Ok(split) => split,
            Err(err) => {
                if let LedgerError::EmptySplitSet { skipped } = &err {
                    warn_skipped(skipped);
                }
                return Err(err.into());
            }
        };

        warn_skipped(&split.skipped);
        info!(
            payer,
            amount,
            participants = split.shares.len(),
            "expense added"
        );

        self.sync_balances().await;
        Ok(split)
    }

    pub async fn settle(
        &mut self,
        from: &str,
        to: &str,
        amount: Cents,
    ) -> Result<Settlement, AppError> {
        let settlement = self.ledger.settle(from, to, amount)?;
        info!(
            from,
            to,
            amount,
            remaining = settlement.remaining,
            "payment settled"
        );

        self.sync_balances().await;
        Ok(settlement)
    }

    pub fn list_net_balances(&self) -> Vec<BalanceEntry> {
        self.ledger.list_net_balances()
    }

    // ========================
    // Storage sync
    // ========================

    async fn sync_participant(&mut self, name: &str) {
        let Some(repo) = &self.repo else {
            return;
        };

        if let Err(err) = repo.save_participant(name).await {
            self.sync_failures += 1;
            warn!(participant = name, error = %err, "failed to persist participant");
        }
    }

    async fn sync_balances(&mut self) {
        let Some(repo) = &self.repo else {
            return;
        };

        let entries = self.ledger.list_net_balances();
        match repo.save_all_balances(&entries).await {
            Ok(()) => debug!(rows = entries.len(), "balances persisted"),
            Err(err) => {
                self.sync_failures += 1;
                warn!(error = %err, "failed to persist balances");
            }
        }
    }
}

fn warn_skipped(names: &[String]) {
    for name in names {
        warn!(participant = %name, "skipping unknown participant");
    }
}
