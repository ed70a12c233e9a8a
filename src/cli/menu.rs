use std::collections::VecDeque;
use std::io::{BufRead, Write};

use anyhow::Result;

use crate::application::LedgerService;
use crate::domain::{Registration, format_cents, parse_cents};

enum Step {
    Continue,
    Quit,
}

/// Numbered text menu driving a [`LedgerService`].
///
/// Input is read as whitespace-separated tokens, so answers may be typed one
/// per line or several on one line. End of input quits.
pub struct Menu<R, W> {
    input: R,
    output: W,
    pending: VecDeque<String>,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            pending: VecDeque::new(),
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub async fn run(&mut self, service: &mut LedgerService) -> Result<()> {
        loop {
            self.print_menu()?;
            let Some(choice) = self.prompt("Choice: ")? else {
                break;
            };

            let step = match choice.as_str() {
                "1" => self.add_user(service).await?,
                "2" => self.show_users(service)?,
                "3" => self.add_expense(service).await?,
                "4" => self.settle(service).await?,
                "5" => self.show_balances(service)?,
                "6" => Step::Quit,
                _ => {
                    writeln!(self.output, "Invalid choice.")?;
                    Step::Continue
                }
            };

            if let Step::Quit = step {
                break;
            }
        }
        Ok(())
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "===== EXPENSE SPLITTER =====")?;
        writeln!(self.output, "1. Add User")?;
        writeln!(self.output, "2. Show Users")?;
        writeln!(self.output, "3. Add Expense")?;
        writeln!(self.output, "4. Settle Payment")?;
        writeln!(self.output, "5. Show Balances")?;
        writeln!(self.output, "6. Exit")?;
        Ok(())
    }

    async fn add_user(&mut self, service: &mut LedgerService) -> Result<Step> {
        let Some(name) = self.prompt("Enter user: ")? else {
            return Ok(Step::Quit);
        };

        match service.register_participant(&name).await {
            Ok(Registration::Added) => writeln!(self.output, "User added: {}", name)?,
            Ok(Registration::AlreadyExists) => {
                writeln!(self.output, "User already exists: {}", name)?
            }
            Err(err) => writeln!(self.output, "Error: {}", err)?,
        }
        Ok(Step::Continue)
    }

    fn show_users(&mut self, service: &LedgerService) -> Result<Step> {
        writeln!(self.output, "\n--- Users ---")?;
        let participants = service.list_participants();
        if participants.is_empty() {
            writeln!(self.output, "No users added yet.")?;
        }
        for name in participants {
            writeln!(self.output, "- {}", name)?;
        }
        Ok(Step::Continue)
    }

    async fn add_expense(&mut self, service: &mut LedgerService) -> Result<Step> {
        let Some(payer) = self.prompt("Payer: ")? else {
            return Ok(Step::Quit);
        };
        let Some(amount) = self.prompt("Amount: ")? else {
            return Ok(Step::Quit);
        };
        let Some(count) = self.prompt("How many users shared? ")? else {
            return Ok(Step::Quit);
        };

        let count: usize = match count.parse() {
            Ok(count) => count,
            Err(_) => {
                writeln!(self.output, "Invalid number of users: {}", count)?;
                return Ok(Step::Continue);
            }
        };

        writeln!(self.output, "Enter names:")?;
        let mut shared = Vec::with_capacity(count);
        for _ in 0..count {
            let Some(name) = self.next_token()? else {
                return Ok(Step::Quit);
            };
            shared.push(name);
        }

        let amount = match parse_cents(&amount) {
            Ok(cents) => cents,
            Err(err) => {
                writeln!(self.output, "Invalid amount: {}", err)?;
                return Ok(Step::Continue);
            }
        };

        match service.add_expense(&payer, amount, &shared).await {
            Ok(split) => {
                for name in &split.skipped {
                    writeln!(self.output, "Skipping unknown user: {}", name)?;
                }
                writeln!(self.output, "Expense added.")?;
            }
            Err(err) => {
                for name in err.skipped_participants() {
                    writeln!(self.output, "Skipping unknown user: {}", name)?;
                }
                writeln!(self.output, "Error: {}", err)?;
            }
        }
        Ok(Step::Continue)
    }

    async fn settle(&mut self, service: &mut LedgerService) -> Result<Step> {
        let Some(from) = self.prompt("From: ")? else {
            return Ok(Step::Quit);
        };
        let Some(to) = self.prompt("To: ")? else {
            return Ok(Step::Quit);
        };
        let Some(amount) = self.prompt("Amount: ")? else {
            return Ok(Step::Quit);
        };

        let amount = match parse_cents(&amount) {
            Ok(cents) => cents,
            Err(err) => {
                writeln!(self.output, "Invalid amount: {}", err)?;
                return Ok(Step::Continue);
            }
        };

        match service.settle(&from, &to, amount).await {
            Ok(_) => writeln!(self.output, "Payment settled.")?,
            Err(err) => writeln!(self.output, "Invalid: {}", err)?,
        }
        Ok(Step::Continue)
    }

    fn show_balances(&mut self, service: &LedgerService) -> Result<Step> {
        writeln!(self.output, "\n---- Net Balances ----")?;
        let balances = service.list_net_balances();
        if balances.is_empty() {
            writeln!(self.output, "No pending balances.")?;
        }
        for entry in balances {
            writeln!(
                self.output,
                "{} owes {}: {}",
                entry.debtor,
                entry.creditor,
                format_cents(entry.amount)
            )?;
        }
        Ok(Step::Continue)
    }

    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;
        self.next_token()
    }

    fn next_token(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.pending.extend(line.split_whitespace().map(str::to_string));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    async fn run_script(service: &mut LedgerService, script: &str) -> String {
        let mut menu = Menu::new(Cursor::new(script.to_string()), Vec::new());
        menu.run(service).await.unwrap();
        String::from_utf8(menu.into_output()).unwrap()
    }

    #[tokio::test]
    async fn test_menu_split_and_settle() {
        let mut service = LedgerService::in_memory();
        let script = "1 A\n1 B\n1 C\n3\nA\n90\n3\nA B C\n4 B A 30\n5\n6\n";

        let output = run_script(&mut service, script).await;

        assert!(output.contains("User added: C"));
        assert!(output.contains("Expense added."));
        assert!(output.contains("Payment settled."));
        assert!(output.contains("C owes A: 30.00"));
        assert!(!output.contains("B owes A"));
    }

    #[tokio::test]
    async fn test_menu_reports_problems_and_keeps_going() {
        let mut service = LedgerService::in_memory();
        let script = "1 A\n1 A\n9\n3 A 50 2 A ghost\n4 A A 10\n3 A lots 1 A\n2\n";

        let output = run_script(&mut service, script).await;

        assert!(output.contains("User already exists: A"));
        assert!(output.contains("Invalid choice."));
        let skipped = output.find("Skipping unknown user: ghost").unwrap();
        let error = output
            .find("Error: No valid participants to split the expense with")
            .unwrap();
        assert!(skipped < error);
        assert!(output.contains("Invalid: A does not owe A"));
        assert!(output.contains("Invalid amount"));
        assert!(output.contains("- A"));
        assert!(service.list_net_balances().is_empty());
    }

    #[tokio::test]
    async fn test_menu_quits_on_end_of_input_mid_prompt() {
        let mut service = LedgerService::in_memory();
        let output = run_script(&mut service, "3\nA\n").await;

        assert!(output.contains("Amount: "));
        assert!(service.list_participants().is_empty());
    }
}
