// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data storage lifecycle and nested record tests.

use std::collections::BTreeMap;

use coffer_core::{CofferError, RecordKind};
use coffer_test_utils::TestHarness;
use coffer_vault::{FieldKind, NewBox, NewEntry, NewTemplate, TemplateField};
use uuid::Uuid;

struct Fixture {
    harness: TestHarness,
    user_id: Uuid,
    storage_id: Uuid,
}

async fn open_primary_storage() -> Fixture {
    let harness = TestHarness::new().await.unwrap();
    let user_id = harness.sign_up_and_in("alice", "pw1").await.unwrap();
    let storage_id = harness.add_memory_config(user_id, None, "main").await.unwrap();
    harness.open_storage(storage_id).await.unwrap();
    Fixture {
        harness,
        user_id,
        storage_id,
    }
}

fn login_template(storage_id: Uuid) -> NewTemplate {
    NewTemplate::new(
        storage_id,
        "Login",
        vec![
            TemplateField::new("username", FieldKind::Text, true),
            TemplateField::new("password", FieldKind::Secret, true),
            TemplateField::new("url", FieldKind::Url, false),
        ],
    )
}

fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A storage holding one box, one template and one entry.
async fn populated() -> (Fixture, Uuid, Uuid, Uuid) {
    let fx = open_primary_storage().await;
    let vault = &fx.harness.vault;

    let new_box = NewBox::new(fx.storage_id, "Work", "work accounts");
    let box_id = new_box.id;
    assert!(vault.add_box(new_box).await.unwrap());

    let template = login_template(fx.storage_id);
    let template_id = template.id;
    assert!(vault.add_template(template).await.unwrap());

    let entry = NewEntry::new(
        box_id,
        template_id,
        "GitHub",
        values(&[("username", "alice"), ("password", "s3cret")]),
    );
    let entry_id = entry.id;
    assert!(vault.add_entry(entry).await.unwrap());

    (fx, box_id, template_id, entry_id)
}

// ---- Lifecycle ----

#[tokio::test]
async fn test_initialise_requires_available_config() {
    let harness = TestHarness::new().await.unwrap();
    harness.sign_up_and_in("alice", "pw1").await.unwrap();
    let err = harness
        .vault
        .initialise_data_storage(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, CofferError::Precondition(_)));
}

#[tokio::test]
async fn test_initialise_twice_returns_false() {
    let harness = TestHarness::new().await.unwrap();
    let user_id = harness.sign_up_and_in("alice", "pw1").await.unwrap();
    let config = harness.add_memory_config(user_id, None, "main").await.unwrap();

    assert!(harness.vault.initialise_data_storage(config).await.unwrap());
    assert!(!harness.vault.initialise_data_storage(config).await.unwrap());
    let storages = harness.vault.list_initialised_data_storages().await;
    assert_eq!(storages.len(), 1);
    assert_eq!(storages[0].name, "main");
    assert!(!storages[0].open);
}

#[tokio::test]
async fn test_connector_failure_surfaces_as_error() {
    let harness = TestHarness::new().await.unwrap();
    let user_id = harness.sign_up_and_in("alice", "pw1").await.unwrap();
    let config = harness.add_memory_config(user_id, None, "main").await.unwrap();
    harness.connector.fail_connect(true);

    let err = harness.vault.initialise_data_storage(config).await.unwrap_err();
    assert!(matches!(err, CofferError::Storage(_)));
    assert!(harness.vault.list_initialised_data_storages().await.is_empty());
}

#[tokio::test]
async fn test_open_and_close_storage() {
    let fx = open_primary_storage().await;
    let vault = &fx.harness.vault;

    assert!(vault.list_initialised_data_storages().await[0].open);
    assert!(!vault.open_data_storage(fx.storage_id).await.unwrap());

    assert!(vault.close_data_storage(fx.storage_id).await.unwrap());
    assert!(!vault.list_initialised_data_storages().await[0].open);
    assert!(!vault.close_data_storage(fx.storage_id).await.unwrap());
}

#[tokio::test]
async fn test_terminate_counts_only_initialised_storages() {
    let fx = open_primary_storage().await;
    let vault = &fx.harness.vault;

    assert_eq!(
        vault
            .terminate_data_storages(&[fx.storage_id, Uuid::new_v4()])
            .await,
        1
    );
    assert!(vault.list_initialised_data_storages().await.is_empty());
    assert_eq!(vault.terminate_data_storages(&[fx.storage_id]).await, 0);

    let storage = fx.harness.connector.storage(fx.storage_id).await.unwrap();
    assert!(!coffer_core::StorageLifecycle::is_open(storage.as_ref()));
}

// ---- Nested records ----

#[tokio::test]
async fn test_nested_records_survive_close_and_reopen() {
    let (fx, box_id, template_id, entry_id) = populated().await;
    let vault = &fx.harness.vault;

    let boxes = vault.list_available_boxes().await;
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].id, box_id);
    assert_eq!(boxes[0].storage_id, fx.storage_id);
    assert_eq!(vault.list_available_templates().await[0].id, template_id);
    let entries = vault.list_available_entries().await;
    assert_eq!(entries[0].id, entry_id);
    assert_eq!(entries[0].box_id, box_id);
    assert_eq!(entries[0].values["password"], "s3cret");

    vault.close_data_storage(fx.storage_id).await.unwrap();
    assert!(vault.list_available_boxes().await.is_empty());
    assert!(vault.list_available_templates().await.is_empty());
    assert!(vault.list_available_entries().await.is_empty());

    assert!(vault.open_data_storage(fx.storage_id).await.unwrap());
    assert_eq!(vault.list_available_boxes().await.len(), 1);
    assert_eq!(vault.list_available_templates().await.len(), 1);
    assert_eq!(vault.list_available_entries().await, entries);
}

#[tokio::test]
async fn test_nested_records_are_sealed_at_rest() {
    let (fx, _, _, _) = populated().await;
    let storage = fx.harness.connector.storage(fx.storage_id).await.unwrap();
    let records = storage.records().await;
    assert_eq!(records.len(), 3);
    for record in &records {
        assert_eq!(record.user_id, fx.user_id);
        assert!(!String::from_utf8_lossy(&record.ciphertext.data).contains("s3cret"));
    }
    let entry = records.iter().find(|r| r.kind == RecordKind::Entry).unwrap();
    assert!(entry.parent_id.is_some());
}

#[tokio::test]
async fn test_add_box_requires_open_storage() {
    let fx = open_primary_storage().await;
    let vault = &fx.harness.vault;
    vault.close_data_storage(fx.storage_id).await.unwrap();

    let err = vault
        .add_box(NewBox::new(fx.storage_id, "Work", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, CofferError::Precondition(_)));
}

#[tokio::test]
async fn test_template_rejects_duplicate_fields() {
    let fx = open_primary_storage().await;
    let template = NewTemplate::new(
        fx.storage_id,
        "Broken",
        vec![
            TemplateField::new("pin", FieldKind::Number, true),
            TemplateField::new("pin", FieldKind::Text, false),
        ],
    );
    let err = fx.harness.vault.add_template(template).await.unwrap_err();
    assert!(matches!(err, CofferError::Validation(_)));
}

#[tokio::test]
async fn test_entry_must_match_template() {
    let (fx, box_id, template_id, _) = populated().await;
    let vault = &fx.harness.vault;

    let missing = NewEntry::new(box_id, template_id, "Partial", values(&[("username", "bob")]));
    assert!(matches!(
        vault.add_entry(missing).await.unwrap_err(),
        CofferError::Validation(_)
    ));

    let unknown = NewEntry::new(
        box_id,
        template_id,
        "Extra",
        values(&[("username", "bob"), ("password", "x"), ("pin", "1234")]),
    );
    assert!(matches!(
        vault.add_entry(unknown).await.unwrap_err(),
        CofferError::Validation(_)
    ));

    let blank = NewEntry::new(
        box_id,
        template_id,
        "Blank",
        values(&[("username", "bob"), ("password", "")]),
    );
    assert!(matches!(
        vault.add_entry(blank).await.unwrap_err(),
        CofferError::Validation(_)
    ));

    assert_eq!(vault.list_available_entries().await.len(), 1);
}

#[tokio::test]
async fn test_entry_requires_available_box_and_template() {
    let (fx, box_id, _, _) = populated().await;
    let vault = &fx.harness.vault;

    let no_box = NewEntry::new(Uuid::new_v4(), Uuid::new_v4(), "x", BTreeMap::new());
    assert!(matches!(
        vault.add_entry(no_box).await.unwrap_err(),
        CofferError::Precondition(_)
    ));

    let no_template = NewEntry::new(box_id, Uuid::new_v4(), "x", BTreeMap::new());
    assert!(matches!(
        vault.add_entry(no_template).await.unwrap_err(),
        CofferError::Precondition(_)
    ));
}

#[tokio::test]
async fn test_template_from_other_storage_is_rejected() {
    let (fx, box_id, _, _) = populated().await;
    let harness = &fx.harness;
    let other = harness.add_memory_config(fx.user_id, None, "other").await.unwrap();
    harness.open_storage(other).await.unwrap();
    let template = login_template(other);
    let foreign_template = template.id;
    harness.vault.add_template(template).await.unwrap();

    let entry = NewEntry::new(
        box_id,
        foreign_template,
        "Cross",
        values(&[("username", "a"), ("password", "b")]),
    );
    assert!(matches!(
        harness.vault.add_entry(entry).await.unwrap_err(),
        CofferError::Precondition(_)
    ));
}

#[tokio::test]
async fn test_tampered_box_keeps_storage_closed() {
    let (fx, box_id, _, _) = populated().await;
    let vault = &fx.harness.vault;
    vault.close_data_storage(fx.storage_id).await.unwrap();

    let storage = fx.harness.connector.storage(fx.storage_id).await.unwrap();
    assert!(storage.tamper(RecordKind::Box, box_id).await);

    let err = vault.open_data_storage(fx.storage_id).await.unwrap_err();
    assert!(matches!(err, CofferError::Corruption(_)));
    assert!(!vault.list_initialised_data_storages().await[0].open);
    assert!(vault.list_available_boxes().await.is_empty());
}

#[tokio::test]
async fn test_unreadable_storage_fails_open() {
    let fx = open_primary_storage().await;
    let vault = &fx.harness.vault;
    vault.close_data_storage(fx.storage_id).await.unwrap();
    let storage = fx.harness.connector.storage(fx.storage_id).await.unwrap();
    storage.fail_reads(true);

    let err = vault.open_data_storage(fx.storage_id).await.unwrap_err();
    assert!(matches!(err, CofferError::Storage(_)));
}

// ---- Cascades ----

#[tokio::test]
async fn test_closing_group_terminates_its_storages() {
    let harness = TestHarness::new().await.unwrap();
    let user_id = harness.sign_up_and_in("alice", "pw1").await.unwrap();
    let finance = harness.create_group(user_id, "Finance", "gp1").await.unwrap();
    harness.open_groups(user_id, "gp1").await.unwrap();

    let primary = harness.add_memory_config(user_id, None, "primary").await.unwrap();
    let grouped = harness.add_memory_config(user_id, Some(finance), "grouped").await.unwrap();
    harness.open_storage(primary).await.unwrap();
    harness.open_storage(grouped).await.unwrap();

    let new_box = NewBox::new(grouped, "Bank", "");
    harness.vault.add_box(new_box).await.unwrap();
    let boxes = harness.vault.list_available_boxes().await;
    assert_eq!(boxes[0].visibility_group_id, Some(finance));

    assert_eq!(harness.vault.close_visibility_groups(&[finance]).await, 1);
    let storages = harness.vault.list_initialised_data_storages().await;
    assert_eq!(storages.len(), 1);
    assert_eq!(storages[0].id, primary);
    assert!(harness.vault.list_available_boxes().await.is_empty());

    let grouped_storage = harness.connector.storage(grouped).await.unwrap();
    assert!(!coffer_core::StorageLifecycle::is_open(grouped_storage.as_ref()));
}

#[tokio::test]
async fn test_sign_out_clears_whole_tree() {
    let (fx, _, _, _) = populated().await;
    let vault = &fx.harness.vault;
    vault.sign_out().await.unwrap();

    assert!(vault.list_available_data_storage_configs().await.is_empty());
    assert!(vault.list_initialised_data_storages().await.is_empty());
    assert!(vault.list_available_boxes().await.is_empty());
    assert!(vault.list_available_templates().await.is_empty());
    assert!(vault.list_available_entries().await.is_empty());

    let storage = fx.harness.connector.storage(fx.storage_id).await.unwrap();
    assert!(!coffer_core::StorageLifecycle::is_open(storage.as_ref()));
}
