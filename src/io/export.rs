use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::BalanceEntry;

/// Full ledger state for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub participants: Vec<String>,
    pub balances: Vec<BalanceEntry>,
}

/// Exporter for writing the ledger out in various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export net balances to CSV format
    pub fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let balances = self.service.list_net_balances();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["debtor", "creditor", "amount_cents"])?;
        for entry in &balances {
            csv_writer.write_record([
                entry.debtor.as_str(),
                entry.creditor.as_str(),
                entry.amount.to_string().as_str(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(balances.len())
    }

    /// Export participants to CSV format
    pub fn export_participants_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let participants = self.service.list_participants();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["name"])?;
        for name in &participants {
            csv_writer.write_record([name])?;
        }

        csv_writer.flush()?;
        Ok(participants.len())
    }

    /// Export participants and balances as one JSON document
    pub fn export_full_json<W: Write>(&self, mut writer: W) -> Result<Snapshot> {
        let snapshot = Snapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            participants: self.service.list_participants(),
            balances: self.service.list_net_balances(),
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(snapshot)
    }
}
