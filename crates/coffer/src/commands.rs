// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault subcommands: `sign-up`, `create-group`, `add-config`, `list-configs`.

use std::sync::Arc;

use coffer_config::CofferConfig;
use coffer_core::{CofferError, CredentialStore, DataStorageBackend, StorageLifecycle};
use coffer_storage::{SqliteConnector, SqliteCredentialStore};
use coffer_vault::prompt::{GROUP_PASSWORD_ENV_VAR, PASSWORD_ENV_VAR};
use coffer_vault::{
    ConfigListFilter, DataStorageConfigInfo, NewDataStorageConfig, NewVisibilityGroup,
    OpenVisibilityGroups, SignIn, SignUp, Vault, get_password, get_password_with_confirm,
};
use tracing::debug;
use uuid::Uuid;

/// A vault attached to the configured account database.
pub struct Session {
    pub vault: Vault,
    store: Arc<SqliteCredentialStore>,
}

impl Session {
    pub async fn open(config: &CofferConfig) -> Result<Self, CofferError> {
        let store = Arc::new(SqliteCredentialStore::new(config.storage.database_path.clone()));
        if !store.open().await {
            return Err(CofferError::Storage(format!(
                "could not open account database at {}",
                config.storage.database_path
            )));
        }
        let vault = Vault::from_config(&config.vault, Arc::new(SqliteConnector));
        let account: Arc<dyn CredentialStore> = store.clone();
        vault.set_account_storage(Some(account)).await?;
        Ok(Self { vault, store })
    }

    /// Sign in with the password from `COFFER_PASSWORD` or a prompt.
    pub async fn sign_in(&self, username: &str) -> Result<Uuid, CofferError> {
        let password = get_password(PASSWORD_ENV_VAR, "Password")?;
        let accepted = self
            .vault
            .sign_in(SignIn {
                username: username.to_string(),
                password,
            })
            .await?;
        if !accepted {
            return Err(CofferError::Precondition(
                "sign-in failed: unknown username or wrong password".to_string(),
            ));
        }
        self.vault
            .signed_in_user()
            .await
            .map(|session| session.user_id)
            .ok_or_else(CofferError::no_session)
    }

    /// Open every group matching the password from `COFFER_GROUP_PASSWORD` or a prompt.
    pub async fn open_groups(&self, user_id: Uuid) -> Result<usize, CofferError> {
        let password = get_password(GROUP_PASSWORD_ENV_VAR, "Group password")?;
        self.vault
            .open_visibility_groups(OpenVisibilityGroups { user_id, password })
            .await
    }

    /// Sign out and close the account database.
    async fn finish(self) -> Result<(), CofferError> {
        self.vault.sign_out().await?;
        self.vault.set_account_storage(None).await?;
        if !self.store.close().await {
            debug!("account database did not close cleanly");
        }
        Ok(())
    }

    /// Close the session whatever `outcome` is, then return it.
    ///
    /// An error in `outcome` takes precedence over one from closing.
    pub async fn finish_with<T>(self, outcome: Result<T, CofferError>) -> Result<T, CofferError> {
        let finished = self.finish().await;
        let value = outcome?;
        finished?;
        Ok(value)
    }
}

pub async fn run_sign_up(config: &CofferConfig, username: &str) -> Result<(), CofferError> {
    let session = Session::open(config).await?;
    let outcome = async {
        let password = get_password_with_confirm(PASSWORD_ENV_VAR, "Password")?;
        session
            .vault
            .sign_up(SignUp {
                username: username.to_string(),
                password,
            })
            .await
    }
    .await;
    if !session.finish_with(outcome).await? {
        return Err(CofferError::Validation(format!(
            "username `{username}` is not available"
        )));
    }
    println!("created user `{username}`");
    Ok(())
}

pub async fn run_create_group(
    config: &CofferConfig,
    username: &str,
    name: &str,
    description: &str,
) -> Result<(), CofferError> {
    let session = Session::open(config).await?;
    let outcome = async {
        let user_id = session.sign_in(username).await?;
        let password = get_password_with_confirm(GROUP_PASSWORD_ENV_VAR, "Group password")?;
        let request = NewVisibilityGroup::new(user_id, name, description, password);
        let id = request.id;
        let created = session.vault.create_visibility_group(request).await?;
        Ok::<_, CofferError>((id, created))
    }
    .await;
    let (id, created) = session.finish_with(outcome).await?;
    if !created {
        return Err(CofferError::Storage(format!(
            "account database rejected visibility group `{name}`"
        )));
    }
    println!("created visibility group `{name}` ({id})");
    Ok(())
}

pub async fn run_add_config(
    config: &CofferConfig,
    username: &str,
    name: &str,
    group: Option<&str>,
    backend: DataStorageBackend,
) -> Result<(), CofferError> {
    let session = Session::open(config).await?;
    let outcome = async {
        let user_id = session.sign_in(username).await?;
        let visibility_group_id = match group {
            Some(group_name) => Some(find_open_group(&session, user_id, group_name).await?),
            None => None,
        };
        let request = NewDataStorageConfig::new(user_id, visibility_group_id, name, backend);
        let id = request.id;
        let added = session.vault.add_data_storage_config(request).await?;
        Ok::<_, CofferError>((id, added))
    }
    .await;
    let (id, added) = session.finish_with(outcome).await?;
    if !added {
        return Err(CofferError::Storage(format!(
            "account database rejected data storage config `{name}`"
        )));
    }
    println!("added data storage config `{name}` ({id})");
    Ok(())
}

/// Open groups with the group password and resolve `group_name` among them.
async fn find_open_group(
    session: &Session,
    user_id: Uuid,
    group_name: &str,
) -> Result<Uuid, CofferError> {
    session.open_groups(user_id).await?;
    session
        .vault
        .list_open_visibility_groups()
        .await
        .into_iter()
        .find(|g| g.name == group_name)
        .map(|g| g.id)
        .ok_or_else(|| {
            CofferError::Precondition(format!(
                "visibility group `{group_name}` did not open with the given password"
            ))
        })
}

pub async fn run_list_configs(
    config: &CofferConfig,
    username: &str,
    open_group: bool,
    json: bool,
) -> Result<(), CofferError> {
    let session = Session::open(config).await?;
    let outcome = async {
        let user_id = session.sign_in(username).await?;
        if open_group {
            let opened = session.open_groups(user_id).await?;
            debug!(opened, "visibility groups opened for listing");
        }
        let configs = session
            .vault
            .list_data_storage_configs(ConfigListFilter::default())
            .await?;
        let groups = session.vault.list_open_visibility_groups().await;
        Ok::<_, CofferError>((configs, groups))
    }
    .await;
    let (configs, groups) = session.finish_with(outcome).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&configs)
            .map_err(|e| CofferError::Internal(format!("failed to render configs: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    if configs.is_empty() {
        println!("no data storage configs available");
        return Ok(());
    }
    for config in &configs {
        let scope = match config.visibility_group_id {
            Some(id) => groups
                .iter()
                .find(|g| g.id == id)
                .map(|g| g.name.clone())
                .unwrap_or_else(|| id.to_string()),
            None => "-".to_string(),
        };
        println!("{}", format_config_line(config, &scope));
    }
    Ok(())
}

fn format_config_line(config: &DataStorageConfigInfo, scope: &str) -> String {
    let backend = match &config.backend {
        DataStorageBackend::Sqlite { path } => format!("sqlite:{path}"),
        DataStorageBackend::Memory => "memory".to_string(),
    };
    let lock = if config.has_access_password { " [locked]" } else { "" };
    format!("{}  {:<24} {:<16} {backend}{lock}", config.id, config.name, scope)
}
