//! In-crate fake backend shared by the repository tests.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::backend::{AuthBackend, BlobStorage, DocumentStore, Functions, StoredDocument};
use crate::models::AuthSession;

#[derive(Debug, Clone, PartialEq)]
pub struct FakeError(pub String);

impl fmt::Display for FakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for FakeError {}

#[derive(Default)]
pub struct FakeBackend {
    accounts: RefCell<HashMap<String, (String, String)>>,
    docs: RefCell<BTreeMap<(String, String), Map<String, Value>>>,
    pub uploads: RefCell<Vec<(String, PathBuf)>>,
    pub calls: RefCell<Vec<(String, Value)>>,
    pub function_response: RefCell<Value>,
    pub auth_log: RefCell<Vec<String>>,
    fail_next: RefCell<Option<(usize, FakeError)>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, uid: &str, email: &str, password: &str) -> Self {
        self.accounts
            .borrow_mut()
            .insert(email.to_string(), (uid.to_string(), password.to_string()));
        self
    }

    /// Makes the next backend call fail with `message`.
    pub fn fail_next(&self, message: &str) {
        self.fail_after(0, message);
    }

    /// Lets `calls` backend calls succeed, then fails the one after with `message`.
    pub fn fail_after(&self, calls: usize, message: &str) {
        *self.fail_next.borrow_mut() = Some((calls, FakeError(message.to_string())));
    }

    pub fn stored(&self, collection: &str, id: &str) -> Option<Map<String, Value>> {
        self.docs
            .borrow()
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.docs.borrow().keys().filter(|(c, _)| c == collection).count()
    }

    fn check(&self) -> Result<()> {
        let mut pending = self.fail_next.borrow_mut();
        match pending.take() {
            Some((0, err)) => Err(err.into()),
            Some((n, err)) => {
                *pending = Some((n - 1, err));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn session_for(uid: &str, email: &str) -> AuthSession {
        session(uid, email)
    }
}

pub fn session(uid: &str, email: &str) -> AuthSession {
    AuthSession {
        uid: uid.to_string(),
        email: email.to_string(),
        display_name: None,
        id_token: format!("token-{}", uid),
        refresh_token: format!("refresh-{}", uid),
        expires_at: Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap(),
    }
}

impl AuthBackend for FakeBackend {
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.check()?;
        self.auth_log.borrow_mut().push(format!("sign_in {}", email));
        match self.accounts.borrow().get(email) {
            Some((uid, pw)) if pw == password => Ok(Self::session_for(uid, email)),
            _ => Err(FakeError("INVALID_LOGIN_CREDENTIALS".to_string()).into()),
        }
    }

    fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.check()?;
        let mut accounts = self.accounts.borrow_mut();
        if accounts.contains_key(email) {
            return Err(FakeError("EMAIL_EXISTS".to_string()).into());
        }
        let uid = format!("uid-{}", accounts.len() + 1);
        accounts.insert(email.to_string(), (uid.clone(), password.to_string()));
        Ok(Self::session_for(&uid, email))
    }

    fn refresh(&self, session: &AuthSession) -> Result<AuthSession> {
        self.check()?;
        self.auth_log.borrow_mut().push("refresh".to_string());
        Ok(AuthSession {
            id_token: format!("{}-refreshed", session.id_token),
            ..session.clone()
        })
    }

    fn send_password_reset(&self, email: &str) -> Result<()> {
        self.check()?;
        self.auth_log.borrow_mut().push(format!("reset {}", email));
        Ok(())
    }

    fn send_email_verification(&self, session: &AuthSession) -> Result<()> {
        self.check()?;
        self.auth_log.borrow_mut().push(format!("verify {}", session.email));
        Ok(())
    }

    fn update_email(&self, session: &AuthSession, new_email: &str) -> Result<AuthSession> {
        self.check()?;
        let mut accounts = self.accounts.borrow_mut();
        if let Some(entry) = accounts.remove(&session.email) {
            accounts.insert(new_email.to_string(), entry);
        }
        Ok(AuthSession {
            email: new_email.to_string(),
            ..session.clone()
        })
    }

    fn update_password(&self, session: &AuthSession, new_password: &str) -> Result<AuthSession> {
        self.check()?;
        if let Some(entry) = self.accounts.borrow_mut().get_mut(&session.email) {
            entry.1 = new_password.to_string();
        }
        Ok(session.clone())
    }

    fn update_display_name(&self, session: &AuthSession, name: &str) -> Result<AuthSession> {
        self.check()?;
        Ok(AuthSession {
            display_name: Some(name.to_string()),
            ..session.clone()
        })
    }

    fn delete_account(&self, session: &AuthSession) -> Result<()> {
        self.check()?;
        self.accounts.borrow_mut().remove(&session.email);
        Ok(())
    }
}

impl DocumentStore for FakeBackend {
    fn get(&self, _session: &AuthSession, collection: &str, id: &str) -> Result<Option<StoredDocument>> {
        self.check()?;
        Ok(self.stored(collection, id).map(|fields| StoredDocument {
            id: id.to_string(),
            fields,
        }))
    }

    fn set(&self, _session: &AuthSession, collection: &str, id: &str, fields: &Map<String, Value>) -> Result<()> {
        self.check()?;
        self.docs
            .borrow_mut()
            .insert((collection.to_string(), id.to_string()), fields.clone());
        Ok(())
    }

    fn delete(&self, _session: &AuthSession, collection: &str, id: &str) -> Result<()> {
        self.check()?;
        self.docs
            .borrow_mut()
            .remove(&(collection.to_string(), id.to_string()));
        Ok(())
    }

    fn list(&self, _session: &AuthSession, collection: &str) -> Result<Vec<StoredDocument>> {
        self.check()?;
        Ok(self
            .docs
            .borrow()
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|((_, id), fields)| StoredDocument {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect())
    }

    fn query_eq(
        &self,
        session: &AuthSession,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>> {
        Ok(self
            .list(session, collection)?
            .into_iter()
            .filter(|doc| doc.fields.get(field) == Some(value))
            .collect())
    }
}

impl BlobStorage for FakeBackend {
    fn upload(&self, _session: &AuthSession, remote_path: &str, local: &Path) -> Result<String> {
        self.check()?;
        self.uploads
            .borrow_mut()
            .push((remote_path.to_string(), local.to_path_buf()));
        Ok(format!("https://files.example/{}", remote_path))
    }
}

impl Functions for FakeBackend {
    fn call(&self, _session: &AuthSession, name: &str, payload: &Value) -> Result<Value> {
        self.check()?;
        self.calls
            .borrow_mut()
            .push((name.to_string(), payload.clone()));
        Ok(self.function_response.borrow().clone())
    }
}
