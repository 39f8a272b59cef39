// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The vault running on SQLite-backed account and data storages.

use std::collections::BTreeMap;
use std::sync::Arc;

use coffer_core::{CredentialStore, DataStorageBackend, StorageLifecycle};
use coffer_storage::{SqliteConnector, SqliteCredentialStore};
use coffer_test_utils::fast_kdf;
use coffer_test_utils::harness::secret;
use coffer_vault::{
    ConfigListFilter, FieldKind, NewBox, NewDataStorageConfig, NewEntry, NewTemplate,
    NewVisibilityGroup, OpenVisibilityGroups, SignIn, SignUp, TemplateField, Vault,
};
use tempfile::TempDir;

async fn vault_at(dir: &TempDir) -> Vault {
    let store = SqliteCredentialStore::new(dir.path().join("account.db").to_string_lossy());
    assert!(store.open().await);
    let store: Arc<dyn CredentialStore> = Arc::new(store);
    let vault = Vault::new(Arc::new(fast_kdf()), 16, Arc::new(SqliteConnector));
    vault.set_account_storage(Some(store)).await.unwrap();
    vault
}

async fn sign_in(vault: &Vault) -> uuid::Uuid {
    assert!(
        vault
            .sign_in(SignIn {
                username: "alice".to_string(),
                password: secret("pw1"),
            })
            .await
            .unwrap()
    );
    vault.signed_in_user().await.unwrap().user_id
}

#[tokio::test]
async fn test_groups_and_configs_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("data.db").to_string_lossy().into_owned();

    let (config_id, box_id) = {
        let vault = vault_at(&dir).await;
        assert!(
            vault
                .sign_up(SignUp {
                    username: "alice".to_string(),
                    password: secret("pw1"),
                })
                .await
                .unwrap()
        );
        let user_id = sign_in(&vault).await;

        let group = NewVisibilityGroup::new(user_id, "Finance", "bank logins", secret("gp1"));
        let group_id = group.id;
        assert!(vault.create_visibility_group(group).await.unwrap());
        assert_eq!(
            vault
                .open_visibility_groups(OpenVisibilityGroups {
                    user_id,
                    password: secret("gp1"),
                })
                .await
                .unwrap(),
            1
        );

        let config = NewDataStorageConfig::new(
            user_id,
            Some(group_id),
            "bank",
            DataStorageBackend::Sqlite {
                path: data_path.clone(),
            },
        );
        let config_id = config.id;
        assert!(vault.add_data_storage_config(config).await.unwrap());
        assert!(vault.initialise_data_storage(config_id).await.unwrap());
        assert!(vault.open_data_storage(config_id).await.unwrap());

        let new_box = NewBox::new(config_id, "Checking", "");
        let box_id = new_box.id;
        assert!(vault.add_box(new_box).await.unwrap());
        let template = NewTemplate::new(
            config_id,
            "Card",
            vec![TemplateField::new("number", FieldKind::Number, true)],
        );
        let template_id = template.id;
        assert!(vault.add_template(template).await.unwrap());
        let values = BTreeMap::from([("number".to_string(), "4111".to_string())]);
        assert!(
            vault
                .add_entry(NewEntry::new(box_id, template_id, "Visa", values))
                .await
                .unwrap()
        );

        vault.sign_out().await.unwrap();
        (config_id, box_id)
    };

    let vault = vault_at(&dir).await;
    let user_id = sign_in(&vault).await;
    assert!(vault.list_available_data_storage_configs().await.is_empty());

    vault
        .open_visibility_groups(OpenVisibilityGroups {
            user_id,
            password: secret("gp1"),
        })
        .await
        .unwrap();
    let configs = vault
        .list_data_storage_configs(ConfigListFilter::default())
        .await
        .unwrap();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].id, config_id);
    assert_eq!(configs[0].name, "bank");

    assert!(vault.initialise_data_storage(config_id).await.unwrap());
    assert!(vault.open_data_storage(config_id).await.unwrap());
    assert_eq!(vault.list_available_boxes().await[0].id, box_id);
    let entries = vault.list_available_entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].values["number"], "4111");
}

#[tokio::test]
async fn test_wrong_password_against_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let vault = vault_at(&dir).await;
    vault
        .sign_up(SignUp {
            username: "alice".to_string(),
            password: secret("pw1"),
        })
        .await
        .unwrap();
    assert!(
        !vault
            .sign_in(SignIn {
                username: "alice".to_string(),
                password: secret("pw2"),
            })
            .await
            .unwrap()
    );
    assert_eq!(vault.user_count().await.unwrap(), 1);
}
