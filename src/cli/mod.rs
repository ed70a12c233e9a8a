mod menu;

pub use menu::Menu;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::LedgerService;
use crate::domain::{BalanceEntry, Registration, format_cents, parse_cents};

/// Tallyup - shared expense splitter
#[derive(Parser)]
#[command(name = "tallyup")]
#[command(about = "Split shared expenses and keep track of who owes whom")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "expenses.db", global = true)]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Participant management commands
    #[command(subcommand)]
    User(UserCommands),

    /// Split an expense between participants
    Expense {
        /// Amount paid (e.g., "90.00" or "90")
        amount: String,

        /// Participant who paid
        #[arg(long)]
        payer: String,

        /// Participants sharing the expense (the payer may be included)
        #[arg(short, long = "split", num_args = 1.., required = true)]
        split: Vec<String>,
    },

    /// Pay back money owed to another participant
    Settle {
        /// Amount paid back (e.g., "30.00" or "30")
        amount: String,

        /// Participant paying back
        #[arg(long)]
        from: String,

        /// Participant being paid
        #[arg(long)]
        to: String,
    },

    /// Show who owes whom
    Balances {
        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: balances, participants, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Interactive menu
    Menu,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a participant
    Add {
        /// Participant name (case-sensitive)
        name: String,
    },

    /// List all participants
    List,

    /// Show what a participant owes and is owed
    Show {
        /// Participant name
        name: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        // The menu keeps working without storage; one-shot commands must not.
        let mut service = if matches!(self.command, Commands::Menu) {
            let service = LedgerService::open_or_memory(&self.database).await;
            if !service.is_persistent() {
                eprintln!("Warning: could not open database. Running without persistence.");
            }
            service
        } else {
            LedgerService::open(&self.database)
                .await
                .with_context(|| format!("Failed to open database: {}", self.database))?
        };

        let outcome = run_command(&mut service, self.command, &self.database).await;
        service.shutdown().await;
        outcome
    }
}

async fn run_command(
    service: &mut LedgerService,
    command: Commands,
    database: &str,
) -> Result<()> {
    match command {
        Commands::Init => {
            println!("Database initialized: {}", database);
        }

        Commands::User(user_cmd) => {
            run_user_command(service, user_cmd).await?;
        }

        Commands::Expense {
            amount,
            payer,
            split,
        } => {
            let amount_cents = parse_amount(&amount)?;
            let split: Vec<String> = split.iter().map(|name| name.trim().to_string()).collect();
            let result = match service.add_expense(payer.trim(), amount_cents, &split).await {
                Ok(result) => result,
                Err(err) => {
                    for name in err.skipped_participants() {
                        println!("Skipping unknown participant: {}", name);
                    }
                    return Err(err.into());
                }
            };

            for name in &result.skipped {
                println!("Skipping unknown participant: {}", name);
            }
            println!(
                "Recorded expense: {} paid by {}",
                format_cents(result.amount),
                result.payer
            );
            for (name, share) in &result.shares {
                if name == &result.payer {
                    println!("  {:<20} {:>12} (own share)", name, format_cents(*share));
                } else {
                    println!("  {:<20} {:>12}", name, format_cents(*share));
                }
            }
        }

        Commands::Settle { amount, from, to } => {
            let amount_cents = parse_amount(&amount)?;
            let result = service.settle(from.trim(), to.trim(), amount_cents).await?;

            println!(
                "Settled: {} paid {} {}",
                result.from,
                result.to,
                format_cents(result.amount)
            );
            if result.remaining > 0 {
                println!("  Still owed: {}", format_cents(result.remaining));
            } else {
                println!("  Debt cleared");
            }
        }

        Commands::Balances { format } => {
            run_balances_command(service, &format)?;
        }

        Commands::Export {
            export_type,
            output,
        } => {
            run_export_command(service, &export_type, output.as_deref())?;
        }

        Commands::Menu => {
            let stdin = std::io::stdin();
            let mut menu = Menu::new(stdin.lock(), std::io::stdout());
            menu.run(service).await?;
        }
    }

    Ok(())
}

async fn run_user_command(service: &mut LedgerService, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::Add { name } => {
            let name = name.trim();
            match service.register_participant(name).await? {
                Registration::Added => println!("Added participant: {}", name),
                Registration::AlreadyExists => println!("Participant already exists: {}", name),
            }
        }

        UserCommands::List => {
            let participants = service.list_participants();
            if participants.is_empty() {
                println!("No participants found.");
            } else {
                for name in participants {
                    println!("- {}", name);
                }
            }
        }

        UserCommands::Show { name } => {
            let summary = service.participant_summary(name.trim())?;

            println!("Participant: {}", summary.name);
            if summary.owes.is_empty() {
                println!("  Owes nobody");
            } else {
                println!("  Owes:");
                for entry in &summary.owes {
                    println!(
                        "    {:<20} {:>12}",
                        entry.creditor,
                        format_cents(entry.amount)
                    );
                }
            }
            if summary.owed_by.is_empty() {
                println!("  Is owed nothing");
            } else {
                println!("  Is owed by:");
                for entry in &summary.owed_by {
                    println!(
                        "    {:<20} {:>12}",
                        entry.debtor,
                        format_cents(entry.amount)
                    );
                }
            }
            println!();
            println!("  Net position:   {}", format_cents(summary.net));
        }
    }
    Ok(())
}

fn run_balances_command(service: &LedgerService, format: &str) -> Result<()> {
    use crate::io::Exporter;

    match format {
        "json" => {
            let balances = service.list_net_balances();
            println!("{}", serde_json::to_string_pretty(&balances)?);
        }
        "csv" => {
            Exporter::new(service).export_balances_csv(std::io::stdout())?;
        }
        "table" => print_balance_table(
            &service.list_net_balances(),
            service.ledger().total_outstanding().ok(),
        ),
        _ => {
            anyhow::bail!(
                "Invalid format '{}'. Valid formats: table, json, csv",
                format
            );
        }
    }
    Ok(())
}

fn print_balance_table(balances: &[BalanceEntry], total: Option<i64>) {
    if balances.is_empty() {
        println!("No pending balances.");
        return;
    }

    println!("{:<20} {:<20} {:>12}", "DEBTOR", "CREDITOR", "AMOUNT");
    println!("{}", "-".repeat(54));
    for entry in balances {
        println!(
            "{:<20} {:<20} {:>12}",
            truncate(&entry.debtor, 20),
            truncate(&entry.creditor, 20),
            format_cents(entry.amount)
        );
    }
    println!("{}", "-".repeat(54));
    let total = total.map_or_else(|| "overflow".to_string(), format_cents);
    println!("{:<41} {:>12}", "TOTAL OUTSTANDING", total);
}

fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "balances" => {
            let count = exporter.export_balances_csv(writer)?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        "participants" => {
            let count = exporter.export_participants_csv(writer)?;
            if output.is_some() {
                eprintln!("Exported {} participants", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer)?;
            if output.is_some() {
                eprintln!(
                    "Exported full ledger: {} participants, {} balances",
                    snapshot.participants.len(),
                    snapshot.balances.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: balances, participants, full",
                export_type
            );
        }
    }

    Ok(())
}

fn parse_amount(amount: &str) -> Result<i64> {
    parse_cents(amount).context("Invalid amount format. Use '30.00' or '30'")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expense_args() {
        let cli = Cli::try_parse_from([
            "tallyup", "expense", "90", "--payer", "A", "--split", "A", "B", "C",
        ])
        .unwrap();

        match cli.command {
            Commands::Expense {
                amount,
                payer,
                split,
            } => {
                assert_eq!(amount, "90");
                assert_eq!(payer, "A");
                assert_eq!(split, vec!["A", "B", "C"]);
            }
            _ => panic!("expected expense command"),
        }
        assert_eq!(cli.database, "expenses.db");
    }

    #[test]
    fn test_expense_requires_split() {
        let result = Cli::try_parse_from(["tallyup", "expense", "90", "--payer", "A"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_database_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["tallyup", "balances", "-d", "trip.db"]).unwrap();
        assert_eq!(cli.database, "trip.db");
    }

    #[test]
    fn test_parse_amount_context() {
        assert_eq!(parse_amount("12.5").unwrap(), 1250);
        let err = parse_amount("twelve").unwrap_err();
        assert!(err.to_string().contains("Invalid amount format"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("alice", 20), "alice");
        assert_eq!(truncate("bartholomew", 8), "barth...");
    }
}
