use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use super::Firebase;
use crate::backend::AuthBackend;
use crate::models::AuthSession;

/// Reply shape shared by the Identity Toolkit account endpoints. Tokens are
/// only present when the call mints new ones.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

fn expiry(now: DateTime<Utc>, expires_in: &str) -> Result<DateTime<Utc>> {
    let secs: i64 = expires_in
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid token lifetime '{}'", expires_in))?;
    Ok(now + Duration::seconds(secs))
}

impl AccountResponse {
    fn into_session(self, now: DateTime<Utc>) -> Result<AuthSession> {
        let id_token = self
            .id_token
            .ok_or_else(|| anyhow!("Auth response did not include an id token"))?;
        let refresh_token = self
            .refresh_token
            .ok_or_else(|| anyhow!("Auth response did not include a refresh token"))?;
        let expires_at = expiry(now, self.expires_in.as_deref().unwrap_or("3600"))?;
        Ok(AuthSession {
            uid: self.local_id,
            email: self.email.unwrap_or_default(),
            display_name: self.display_name.filter(|n| !n.is_empty()),
            id_token,
            refresh_token,
            expires_at,
        })
    }

    /// Folds an update reply into the existing session, keeping the old
    /// tokens when none were issued.
    fn merge_into(self, session: &AuthSession, now: DateTime<Utc>) -> Result<AuthSession> {
        let expires_at = match (&self.id_token, &self.expires_in) {
            (Some(_), Some(expires_in)) => expiry(now, expires_in)?,
            _ => session.expires_at,
        };
        Ok(AuthSession {
            uid: self.local_id,
            email: self.email.unwrap_or_else(|| session.email.clone()),
            display_name: self
                .display_name
                .filter(|n| !n.is_empty())
                .or_else(|| session.display_name.clone()),
            id_token: self.id_token.unwrap_or_else(|| session.id_token.clone()),
            refresh_token: self
                .refresh_token
                .unwrap_or_else(|| session.refresh_token.clone()),
            expires_at,
        })
    }
}

impl Firebase {
    fn account_call(&self, method: &str, body: serde_json::Value) -> Result<AccountResponse> {
        let request = self.client.post(self.identity_url(method)).json(&body);
        self.send_json(method, request)
    }

    fn update_account(&self, session: &AuthSession, mut body: serde_json::Value) -> Result<AuthSession> {
        body["idToken"] = json!(session.id_token);
        body["returnSecureToken"] = json!(true);
        self.account_call("update", body)?.merge_into(session, Utc::now())
    }
}

impl AuthBackend for Firebase {
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.account_call(
            "signInWithPassword",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )?
        .into_session(Utc::now())
    }

    fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.account_call(
            "signUp",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )?
        .into_session(Utc::now())
    }

    fn refresh(&self, session: &AuthSession) -> Result<AuthSession> {
        let request = self.client.post(self.secure_token_url()).form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", session.refresh_token.as_str()),
        ]);
        let token: TokenResponse = self.send_json("token refresh", request)?;
        if token.user_id != session.uid {
            return Err(anyhow!("Token refresh returned a different user"));
        }
        Ok(AuthSession {
            id_token: token.id_token,
            refresh_token: token.refresh_token,
            expires_at: expiry(Utc::now(), &token.expires_in)?,
            ..session.clone()
        })
    }

    fn send_password_reset(&self, email: &str) -> Result<()> {
        let request = self
            .client
            .post(self.identity_url("sendOobCode"))
            .json(&json!({ "requestType": "PASSWORD_RESET", "email": email }));
        self.send("sendOobCode", request)?;
        Ok(())
    }

    fn send_email_verification(&self, session: &AuthSession) -> Result<()> {
        let request = self
            .client
            .post(self.identity_url("sendOobCode"))
            .json(&json!({ "requestType": "VERIFY_EMAIL", "idToken": session.id_token }));
        self.send("sendOobCode", request)?;
        Ok(())
    }

    fn update_email(&self, session: &AuthSession, new_email: &str) -> Result<AuthSession> {
        self.update_account(session, json!({ "email": new_email }))
    }

    fn update_password(&self, session: &AuthSession, new_password: &str) -> Result<AuthSession> {
        self.update_account(session, json!({ "password": new_password }))
    }

    fn update_display_name(&self, session: &AuthSession, name: &str) -> Result<AuthSession> {
        self.update_account(session, json!({ "displayName": name }))
    }

    fn delete_account(&self, session: &AuthSession) -> Result<()> {
        let request = self
            .client
            .post(self.identity_url("delete"))
            .json(&json!({ "idToken": session.id_token }));
        self.send("delete", request)?;
        Ok(())
    }
}
