use anyhow::{anyhow, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::backend::{from_document, to_fields, AuthBackend, DocumentStore};
use crate::models::{AuthSession, User, UserRole};

pub const USERS: &str = "users";

pub struct AuthRepository<'a> {
    auth: &'a dyn AuthBackend,
    session: Option<AuthSession>,
}

impl<'a> AuthRepository<'a> {
    pub fn new(auth: &'a dyn AuthBackend, session: Option<AuthSession>) -> Self {
        Self { auth, session }
    }

    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    pub fn require_session(&self) -> Result<&AuthSession> {
        self.session
            .as_ref()
            .ok_or_else(|| anyhow!("Not signed in. Run 'jobtrack login' first."))
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<&AuthSession> {
        let session = self.auth.sign_in(email, password).inspect_err(|e| {
            warn!(email, error = %e, "sign in failed");
        })?;
        info!(uid = %session.uid, "signed in");
        Ok(self.session.insert(session))
    }

    /// Creates the account, and when a display name is given, records it on
    /// the account and writes a `users/{uid}` profile. The new session is
    /// held even if those follow-up calls fail.
    pub fn sign_up(
        &mut self,
        store: &dyn DocumentStore,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<&AuthSession> {
        let created = self.auth.sign_up(email, password)?;
        info!(uid = %created.uid, "account created");
        let session = self.session.insert(created);

        if let Some(name) = display_name {
            let named = self.auth.update_display_name(session, name).inspect_err(|e| {
                warn!(uid = %session.uid, error = %e, "failed to set display name");
            })?;
            let session = self.session.insert(named);
            let profile = User {
                id: session.uid.clone(),
                email: session.email.clone(),
                display_name: name.to_string(),
                role: UserRole::User,
            };
            store
                .set(session, USERS, &session.uid, &to_fields(&profile)?)
                .inspect_err(|e| warn!(uid = %session.uid, error = %e, "failed to write profile"))?;
        }

        self.require_session()
    }

    pub fn sign_out(&mut self) -> Option<AuthSession> {
        let previous = self.session.take();
        if let Some(session) = &previous {
            info!(uid = %session.uid, "signed out");
        }
        previous
    }

    pub fn send_password_reset(&self, email: &str) -> Result<()> {
        self.auth.send_password_reset(email)
    }

    pub fn send_email_verification(&self) -> Result<()> {
        self.auth.send_email_verification(self.require_session()?)
    }

    /// Signs in again with the current email. Sensitive account changes
    /// require a fresh token.
    pub fn reauthenticate(&mut self, password: &str) -> Result<&AuthSession> {
        let current = self.require_session()?;
        let fresh = self.auth.sign_in(&current.email, password)?;
        if fresh.uid != current.uid {
            return Err(anyhow!(
                "Reauthentication returned a different account ({} != {})",
                fresh.uid,
                current.uid
            ));
        }
        Ok(self.session.insert(fresh))
    }

    pub fn update_email(&mut self, new_email: &str) -> Result<&AuthSession> {
        let updated = self.auth.update_email(self.require_session()?, new_email)?;
        Ok(self.session.insert(updated))
    }

    pub fn update_password(&mut self, new_password: &str) -> Result<&AuthSession> {
        let updated = self.auth.update_password(self.require_session()?, new_password)?;
        Ok(self.session.insert(updated))
    }

    pub fn update_display_name(&mut self, name: &str) -> Result<&AuthSession> {
        let updated = self.auth.update_display_name(self.require_session()?, name)?;
        Ok(self.session.insert(updated))
    }

    pub fn delete_account(&mut self) -> Result<()> {
        self.auth.delete_account(self.require_session()?)?;
        if let Some(session) = self.session.take() {
            info!(uid = %session.uid, "account deleted");
        }
        Ok(())
    }

    /// Swaps an expired token for a fresh one. A session that cannot be
    /// refreshed is dropped. Returns true when the held session changed.
    pub fn refresh_if_expired(&mut self) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        if !session.is_expired(Utc::now()) {
            return false;
        }
        match self.auth.refresh(session) {
            Ok(refreshed) => self.session = Some(refreshed),
            Err(e) => {
                warn!(uid = %session.uid, error = %e, "session refresh failed, signing out");
                self.session = None;
            }
        }
        true
    }

    pub fn current_user(&self, store: &dyn DocumentStore) -> Result<User> {
        let session = self.require_session()?;
        match store.get(session, USERS, &session.uid)? {
            Some(doc) => from_document(doc),
            None => Ok(User {
                id: session.uid.clone(),
                email: session.email.clone(),
                display_name: session.display_name.clone().unwrap_or_default(),
                role: UserRole::User,
            }),
        }
    }
}
