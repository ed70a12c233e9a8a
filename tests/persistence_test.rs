mod common;

use anyhow::Result;
use common::{Group, db_path, names, reopen, test_service};
use tallyup::application::LedgerService;
use tallyup::domain::BalanceEntry;
use tallyup::storage::Repository;
use tempfile::TempDir;

#[tokio::test]
async fn test_state_survives_reopen() -> Result<()> {
    let (mut service, temp) = test_service().await?;
    Group::trio(&mut service).await?;
    service
        .add_expense("Alice", 9000, &names(&["Alice", "Bob", "Carol"]))
        .await?;
    service.settle("Bob", "Alice", 1000).await?;
    let expected = service.list_net_balances();

    let service = reopen(service, &temp).await?;

    assert!(service.is_persistent());
    assert_eq!(service.list_participants(), names(&["Alice", "Bob", "Carol"]));
    assert_eq!(service.list_net_balances(), expected);
    assert_eq!(service.ledger().owed("Bob", "Alice"), 2000);
    assert_eq!(service.sync_failures(), 0);

    Ok(())
}

#[tokio::test]
async fn test_participants_without_balances_are_stored() -> Result<()> {
    let (mut service, temp) = test_service().await?;
    Group::register(&mut service, &["zoe", "Zed"]).await?;

    let service = reopen(service, &temp).await?;
    assert_eq!(service.list_participants(), names(&["Zed", "zoe"]));
    assert!(service.list_net_balances().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_settled_debts_are_removed_from_storage() -> Result<()> {
    let (mut service, temp) = test_service().await?;
    Group::trio(&mut service).await?;
    service
        .add_expense("Alice", 2000, &names(&["Alice", "Bob"]))
        .await?;
    service.settle("Bob", "Alice", 1000).await?;
    service.shutdown().await;

    let repo = Repository::init(&format!("sqlite:{}", db_path(&temp))).await?;
    assert!(repo.load_balances().await?.is_empty());
    assert_eq!(repo.load_participants().await?.len(), 3);
    repo.close().await;

    Ok(())
}

#[tokio::test]
async fn test_save_all_balances_replaces_previous_rows() -> Result<()> {
    let temp = TempDir::new()?;
    let repo = Repository::init(&format!("sqlite:{}?mode=rwc", db_path(&temp))).await?;

    repo.save_all_balances(&[
        BalanceEntry::new("A", "B", 100),
        BalanceEntry::new("C", "B", 200),
    ])
    .await?;
    repo.save_all_balances(&[BalanceEntry::new("B", "A", 50)])
        .await?;

    assert_eq!(
        repo.load_balances().await?,
        vec![BalanceEntry::new("B", "A", 50)]
    );
    repo.close().await;

    Ok(())
}

#[tokio::test]
async fn test_save_participant_ignores_duplicates() -> Result<()> {
    let temp = TempDir::new()?;
    let repo = Repository::init(&format!("sqlite:{}?mode=rwc", db_path(&temp))).await?;

    repo.save_participant("Alice").await?;
    repo.save_participant("Alice").await?;

    assert_eq!(repo.load_participants().await?, names(&["Alice"]));
    repo.close().await;

    Ok(())
}

#[tokio::test]
async fn test_inconsistent_rows_are_normalized_on_load() -> Result<()> {
    let temp = TempDir::new()?;
    let repo = Repository::init(&format!("sqlite:{}?mode=rwc", db_path(&temp))).await?;
    repo.save_participant("A").await?;
    repo.save_all_balances(&[
        BalanceEntry::new("A", "B", 500),
        BalanceEntry::new("B", "A", 200),
    ])
    .await?;
    repo.close().await;

    let service = LedgerService::open(&db_path(&temp)).await?;

    assert_eq!(service.list_participants(), names(&["A", "B"]));
    assert_eq!(
        service.list_net_balances(),
        vec![BalanceEntry::new("A", "B", 300)]
    );
    service.shutdown().await;

    // The normalized state was written back
    let repo = Repository::init(&format!("sqlite:{}", db_path(&temp))).await?;
    assert_eq!(repo.load_participants().await?, names(&["A", "B"]));
    assert_eq!(
        repo.load_balances().await?,
        vec![BalanceEntry::new("A", "B", 300)]
    );
    repo.close().await;

    Ok(())
}

#[tokio::test]
async fn test_falls_back_to_memory_when_database_is_unavailable() -> Result<()> {
    let temp = TempDir::new()?;
    let unreachable = temp.path().join("missing").join("dir").join("test.db");

    let mut service = LedgerService::open_or_memory(unreachable.to_str().unwrap()).await;
    assert!(!service.is_persistent());

    Group::trio(&mut service).await?;
    service
        .add_expense("Alice", 3000, &names(&["Alice", "Bob", "Carol"]))
        .await?;
    assert_eq!(service.ledger().total_outstanding()?, 2000);
    assert_eq!(service.sync_failures(), 0);

    Ok(())
}

#[tokio::test]
async fn test_open_fails_for_unreachable_path() {
    let temp = TempDir::new().unwrap();
    let unreachable = temp.path().join("missing").join("test.db");

    let result = LedgerService::open(unreachable.to_str().unwrap()).await;
    assert!(result.is_err());
}
