//! Session state: the signed-in user and the authentication flag.
//!
//! Both fields are mirrored to the store on every change. The store writes
//! happen before the in-memory fields move, so a failed write leaves the
//! session as it was.

use serde_json::Value;

use crate::error::StoreError;
use crate::model::User;
use crate::store::{keys, JsonStore};

#[derive(Debug)]
pub struct Session {
    current_user: Option<User>,
    is_authenticated: bool,
}

impl Session {
    /// Restore session state from the store.
    ///
    /// Earlier deployments persisted the auth flag as the strings
    /// `"true"` / `"false"`; both forms are accepted on load, and the native
    /// boolean is written back on the next change.
    pub fn load(store: &JsonStore) -> Self {
        let current_user: Option<User> = store.load(keys::CURRENT_USER, None);
        let flag = match store.load(keys::IS_AUTHENTICATED, Value::Bool(false)) {
            Value::Bool(b) => b,
            Value::String(s) => s == "true",
            _ => false,
        };
        // An auth flag with no stored user is stale state from a partial
        // write; treat it as signed out.
        let is_authenticated = flag && current_user.is_some();
        Self {
            current_user,
            is_authenticated,
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Set (or clear) the signed-in user and persist both fields.
    pub fn set(&mut self, store: &JsonStore, user: Option<User>) -> Result<(), StoreError> {
        store.save(keys::CURRENT_USER, &user)?;
        store.save(keys::IS_AUTHENTICATED, &user.is_some())?;
        self.is_authenticated = user.is_some();
        self.current_user = user;
        Ok(())
    }

    /// Sign out: drop the stored user and persist a false flag.
    pub fn clear(&mut self, store: &JsonStore) -> Result<(), StoreError> {
        store.remove(keys::CURRENT_USER)?;
        store.save(keys::IS_AUTHENTICATED, &false)?;
        self.current_user = None;
        self.is_authenticated = false;
        Ok(())
    }

    /// Refresh the cached copy after the user's profile record changed.
    /// No-op unless `user` is the signed-in user.
    pub(crate) fn refresh(&mut self, store: &JsonStore, user: &User) -> Result<(), StoreError> {
        if self.current_user.as_ref().is_some_and(|u| u.id == user.id) {
            store.save(keys::CURRENT_USER, &Some(user))?;
            self.current_user = Some(user.clone());
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
