// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication service: sign-up, sign-in, sign-out and account storage.
//!
//! Wrong usernames and wrong passwords are both reported as `Ok(false)` after
//! the same amount of hashing work.

use std::sync::Arc;

use coffer_core::{CofferError, CredentialStore, KeyScope, RecordFilter, RecordKind, SecuredSignUp};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::crypto;
use crate::events::VaultEvent;
use crate::kdf;
use crate::keyscope::Session;
use crate::model::{self, DataStorageConfigPayload, SessionSummary, SignIn, SignUp};
use crate::state::{VaultState, fetch_records, open_records};

impl VaultState {
    /// Replace or clear the account storage. The session is cleared first.
    pub(crate) async fn set_account_storage(
        &mut self,
        store: Option<Arc<dyn CredentialStore>>,
    ) -> Result<(), CofferError> {
        let unchanged = match (&self.account_storage, &store) {
            (None, None) => true,
            (Some(current), Some(new)) => Arc::ptr_eq(current, new),
            _ => false,
        };
        if unchanged {
            debug!("account storage set to its current value");
        } else {
            self.replace_session(None, Vec::new()).await?;
            self.account_storage = store;
            info!(present = self.account_storage.is_some(), "account storage changed");
        }
        self.events.queue(VaultEvent::AccountStorageChanged {
            present: self.account_storage.is_some(),
        });
        Ok(())
    }

    pub(crate) async fn sign_up(&mut self, request: SignUp) -> Result<bool, CofferError> {
        request.validate()?;
        let store = self.account()?;

        let password = request.password.expose_secret().as_bytes();
        let password_salt = kdf::generate_salt(self.salt_len)?;
        let password_hash = self.kdf.hash_password(password, &password_salt)?;
        let primary_key_salt = kdf::generate_salt(self.salt_len)?;

        let user_id = Uuid::new_v4();
        let added = store
            .add_user(SecuredSignUp {
                user_id,
                username: request.username,
                password_hash,
                password_salt,
                primary_key_salt,
            })
            .await;
        if added {
            info!(user_id = %user_id, "user signed up");
        } else {
            warn!("account storage rejected sign-up");
        }
        Ok(added)
    }

    pub(crate) async fn sign_in(&mut self, request: SignIn) -> Result<bool, CofferError> {
        model::validate_name("username", &request.username)?;
        if request.password.expose_secret().is_empty() {
            return Err(CofferError::Validation("password must not be empty".to_string()));
        }
        let store = self.account()?;
        let password = request.password.expose_secret().as_bytes();

        let Some(user_id) = store.get_user_id(&request.username).await else {
            // Same hashing cost as a wrong password.
            let dummy_salt = vec![0u8; self.salt_len];
            let _ = self.kdf.hash_password(password, &dummy_salt)?;
            info!("sign-in rejected");
            return Ok(false);
        };

        let stored = store.get_password_hash_salt(user_id).await.ok_or_else(|| {
            CofferError::Internal(format!("user {user_id} has no stored password hash"))
        })?;
        let attempt = self.kdf.hash_password(password, &stored.salt)?;
        if !crypto::constant_time_eq(&attempt, &stored.hash) {
            info!("sign-in rejected");
            return Ok(false);
        }

        let key_salt = store.get_primary_key_salt(user_id).await.ok_or_else(|| {
            CofferError::Internal(format!("user {user_id} has no stored primary key salt"))
        })?;
        let primary_key = self.kdf.derive_key(password, &key_salt)?;

        let filter =
            RecordFilter::new(RecordKind::DataStorageConfig, user_id).in_scopes([KeyScope::Primary]);
        let records = fetch_records(store.as_ref(), &filter).await?;
        let configs = open_records::<DataStorageConfigPayload>(&records, |scope| {
            (scope == KeyScope::Primary).then_some(&primary_key)
        })?;

        if let Some(current) = self.keys.session() {
            warn!(
                current_user_id = %current.user_id(),
                "signing in while a session is active, replacing it"
            );
        }
        self.replace_session(Some(Session::new(user_id, request.username, primary_key)), configs)
            .await?;
        info!(user_id = %user_id, "signed in");
        Ok(true)
    }

    pub(crate) async fn sign_out(&mut self) -> Result<Option<SessionSummary>, CofferError> {
        let Some(summary) = self.keys.session().map(Session::summary) else {
            debug!("sign-out without a session");
            return Ok(None);
        };
        self.replace_session(None, Vec::new()).await?;
        info!(user_id = %summary.user_id, "signed out");
        Ok(Some(summary))
    }

    pub(crate) fn signed_in_user(&self) -> Option<SessionSummary> {
        self.keys.session().map(Session::summary)
    }

    pub(crate) async fn user_count(&self) -> Result<u64, CofferError> {
        self.account()?
            .get_user_count()
            .await
            .ok_or_else(|| CofferError::Storage("failed to count users".to_string()))
    }

    pub(crate) async fn username_available(&self, username: &str) -> Result<bool, CofferError> {
        model::validate_name("username", username)?;
        Ok(self.account()?.get_user_id(username).await.is_none())
    }
}
