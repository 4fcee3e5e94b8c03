//! Dashboard accounts stored as JSON under `dashboard:user:{username}`.

use super::{keys, DynamicConfigError, DynamicConfigManager};
use crate::store::KvStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// A dashboard account as persisted.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardAccount {
    pub username: String,
    pub secret: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl DashboardAccount {
    pub fn new(
        username: impl Into<String>,
        secret: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
            role: role.into(),
            created_at: Utc::now(),
        }
    }
}

impl fmt::Debug for DashboardAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardAccount")
            .field("username", &self.username)
            .field("secret", &"[redacted]")
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Account listing entry without the secret.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<&DashboardAccount> for AccountSummary {
    fn from(account: &DashboardAccount) -> Self {
        Self {
            username: account.username.clone(),
            role: account.role.clone(),
            created_at: account.created_at,
        }
    }
}

impl DynamicConfigManager {
    fn bootstrap_account(&self) -> DashboardAccount {
        let d = &self.defaults.dashboard;
        DashboardAccount::new(&d.admin_username, &d.admin_secret, &d.admin_role)
    }

    /// All accounts sorted by username.
    ///
    /// The first listing against an empty store persists the bootstrap admin.
    /// Without a store the bootstrap admin is returned but not persisted.
    pub async fn get_users(&self) -> Vec<DashboardAccount> {
        let Some(store) = self.store.backend() else {
            return vec![self.bootstrap_account()];
        };
        match self.read_users(store.as_ref()).await {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, "Failed to list dashboard accounts, using bootstrap account");
                vec![self.bootstrap_account()]
            }
        }
    }

    async fn read_users(
        &self,
        store: &dyn KvStore,
    ) -> Result<Vec<DashboardAccount>, DynamicConfigError> {
        let user_keys = store.keys(keys::USER_PATTERN).await?;

        if user_keys.is_empty() {
            let admin = self.bootstrap_account();
            store
                .set(
                    &keys::user(&admin.username),
                    &serde_json::to_string(&admin)?,
                    None,
                )
                .await?;
            info!(username = %admin.username, "Bootstrapped dashboard admin account");
            return Ok(vec![admin]);
        }

        let mut users = Vec::with_capacity(user_keys.len());
        for key in user_keys {
            // Deleted between KEYS and GET
            let Some(raw) = store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<DashboardAccount>(&raw) {
                Ok(account) => users.push(account),
                Err(e) => warn!(key = %key, error = %e, "Skipping malformed dashboard account"),
            }
        }
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    /// Create an account. Existing usernames are rejected.
    pub async fn add_user(&self, account: &DashboardAccount) -> Result<(), DynamicConfigError> {
        let username = account.username.as_str();
        if username.is_empty() || username.contains(char::is_whitespace) {
            return Err(DynamicConfigError::invalid(
                "username",
                "must be non-empty without whitespace",
            ));
        }
        if account.secret.is_empty() {
            return Err(DynamicConfigError::invalid("secret", "cannot be empty"));
        }
        let store = self.require_store()?;

        let key = keys::user(username);
        if store.get(&key).await?.is_some() {
            return Err(DynamicConfigError::DuplicateUser(username.to_string()));
        }

        store
            .set(&key, &serde_json::to_string(account)?, None)
            .await?;
        info!(username = %username, role = %account.role, "Dashboard account created");
        Ok(())
    }

    /// Delete an account. Returns `false` when nothing was removed, which
    /// includes any attempt to delete the bootstrap admin.
    pub async fn delete_user(&self, username: &str) -> Result<bool, DynamicConfigError> {
        if username == self.defaults.dashboard.admin_username {
            warn!(username = %username, "Refusing to delete bootstrap admin account");
            return Ok(false);
        }
        let store = self.require_store()?;

        let removed = store.del(&keys::user(username)).await?;
        if removed {
            info!(username = %username, "Dashboard account deleted");
        }
        Ok(removed)
    }
}
