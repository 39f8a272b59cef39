// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordering and content of published vault events.

use coffer_test_utils::TestHarness;
use coffer_vault::VaultEvent;
use tokio::sync::broadcast;

fn drain(rx: &mut broadcast::Receiver<VaultEvent>) -> Vec<VaultEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_sign_in_publishes_session_then_configs() {
    let harness = TestHarness::new().await.unwrap();
    let user_id = harness.sign_up_and_in("alice", "pw1").await.unwrap();
    harness.add_memory_config(user_id, None, "main").await.unwrap();
    harness.vault.sign_out().await.unwrap();

    let mut rx = harness.vault.subscribe().await;
    harness.sign_in("alice", "pw1").await.unwrap();
    let events = drain(&mut rx);

    assert_eq!(events.len(), 2);
    match &events[0] {
        VaultEvent::SessionChanged(Some(summary)) => assert_eq!(summary.user_id, user_id),
        other => panic!("expected session change, got {other:?}"),
    }
    match &events[1] {
        VaultEvent::AvailableDataStorageConfigsChanged(diff) => {
            assert_eq!(diff.added.len(), 1);
            assert!(diff.removed.is_empty());
        }
        other => panic!("expected config diff, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_sign_in_publishes_nothing() {
    let harness = TestHarness::new().await.unwrap();
    harness.sign_up_and_in("alice", "pw1").await.unwrap();
    let mut rx = harness.vault.subscribe().await;
    assert!(!harness.sign_in("alice", "wrong").await.unwrap());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_sign_out_publishes_removals_before_session_change() {
    let harness = TestHarness::new().await.unwrap();
    let user_id = harness.sign_up_and_in("alice", "pw1").await.unwrap();
    let finance = harness.create_group(user_id, "Finance", "gp1").await.unwrap();
    harness.open_groups(user_id, "gp1").await.unwrap();
    harness.add_memory_config(user_id, Some(finance), "finance").await.unwrap();

    let mut rx = harness.vault.subscribe().await;
    harness.vault.sign_out().await.unwrap();
    let events = drain(&mut rx);

    assert_eq!(events.len(), 3);
    match &events[0] {
        VaultEvent::OpenVisibilityGroupsChanged(diff) => {
            assert_eq!(diff.removed.len(), 1);
            assert_eq!(diff.removed[0].id, finance);
        }
        other => panic!("expected group diff, got {other:?}"),
    }
    assert!(matches!(
        &events[1],
        VaultEvent::AvailableDataStorageConfigsChanged(diff) if diff.removed.len() == 1
    ));
    assert_eq!(events[2], VaultEvent::SessionChanged(None));
}

#[tokio::test]
async fn test_opening_groups_publishes_group_then_configs() {
    let harness = TestHarness::new().await.unwrap();
    let user_id = harness.sign_up_and_in("alice", "pw1").await.unwrap();
    let finance = harness.create_group(user_id, "Finance", "gp1").await.unwrap();
    harness.open_groups(user_id, "gp1").await.unwrap();
    harness.add_memory_config(user_id, Some(finance), "finance").await.unwrap();
    harness.vault.close_visibility_groups(&[finance]).await;

    let mut rx = harness.vault.subscribe().await;
    assert_eq!(harness.open_groups(user_id, "wrong").await.unwrap(), 0);
    assert!(drain(&mut rx).is_empty());

    assert_eq!(harness.open_groups(user_id, "gp1").await.unwrap(), 1);
    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        VaultEvent::OpenVisibilityGroupsChanged(diff) if diff.added.len() == 1
    ));
    assert!(matches!(
        &events[1],
        VaultEvent::AvailableDataStorageConfigsChanged(diff) if diff.added.len() == 1
    ));
}

#[tokio::test]
async fn test_closing_unopened_group_publishes_nothing() {
    let harness = TestHarness::new().await.unwrap();
    let user_id = harness.sign_up_and_in("alice", "pw1").await.unwrap();
    let finance = harness.create_group(user_id, "Finance", "gp1").await.unwrap();

    let mut rx = harness.vault.subscribe().await;
    assert_eq!(harness.vault.close_visibility_groups(&[finance]).await, 0);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_storage_open_publishes_open_flag_and_records() {
    let harness = TestHarness::new().await.unwrap();
    let user_id = harness.sign_up_and_in("alice", "pw1").await.unwrap();
    let storage = harness.add_memory_config(user_id, None, "main").await.unwrap();
    harness.open_storage(storage).await.unwrap();
    harness
        .vault
        .add_box(coffer_vault::NewBox::new(storage, "Work", ""))
        .await
        .unwrap();
    harness.vault.close_data_storage(storage).await.unwrap();

    let mut rx = harness.vault.subscribe().await;
    harness.vault.open_data_storage(storage).await.unwrap();
    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        VaultEvent::DataStorageOpenChanged {
            id: storage,
            open: true
        }
    );
    assert!(matches!(
        &events[1],
        VaultEvent::AvailableBoxesChanged(diff) if diff.added.len() == 1
    ));
}

#[tokio::test]
async fn test_setting_same_account_storage_only_announces() {
    let harness = TestHarness::new().await.unwrap();
    harness.sign_up_and_in("alice", "pw1").await.unwrap();

    let mut rx = harness.vault.subscribe().await;
    let same: std::sync::Arc<dyn coffer_core::CredentialStore> = harness.credentials.clone();
    harness.vault.set_account_storage(Some(same)).await.unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![VaultEvent::AccountStorageChanged { present: true }]
    );
    assert!(harness.vault.signed_in_user().await.is_some());
}

#[test]
fn test_events_serialize_for_transport() {
    let event = VaultEvent::AccountStorageChanged { present: false };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event"], "account_storage_changed");
    assert_eq!(json["data"]["present"], false);
}
