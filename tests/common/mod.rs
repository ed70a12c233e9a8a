// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use tallyup::application::LedgerService;
use tempfile::TempDir;

/// Path of the test database inside `temp_dir`
pub fn db_path(temp_dir: &TempDir) -> String {
    temp_dir.path().join("test.db").to_str().unwrap().to_string()
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = LedgerService::open(&db_path(&temp_dir)).await?;
    Ok((service, temp_dir))
}

/// Close the service and load a fresh one from the same database
pub async fn reopen(service: LedgerService, temp_dir: &TempDir) -> Result<LedgerService> {
    service.shutdown().await;
    Ok(LedgerService::open(&db_path(temp_dir)).await?)
}

/// Owned names for split lists
pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|name| name.to_string()).collect()
}

/// Test fixture: a group of friends sharing costs
pub struct Group;

impl Group {
    /// Register every name in `members`
    pub async fn register(service: &mut LedgerService, members: &[&str]) -> Result<()> {
        for name in members {
            service.register_participant(name).await?;
        }
        Ok(())
    }

    /// Register the usual trio: Alice, Bob, Carol
    pub async fn trio(service: &mut LedgerService) -> Result<()> {
        Self::register(service, &["Alice", "Bob", "Carol"]).await
    }
}
