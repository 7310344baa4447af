//! Sign-in and the session gate in front of workflow pages.
//!
//! Identity is delegated: `Authenticator` is the seam for a real provider,
//! and `LocalAuthenticator` checks a configured account list.

use crate::config::Account;
use crate::error::{CommandResult, FlowCanvasError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub const TRACING_TARGET: &str = "flowcanvas::auth";

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub email: String,
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn issue(email: &str, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            email: email.to_string(),
            token: uuid::Uuid::new_v4().to_string(),
            issued_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

pub trait Authenticator {
    fn sign_in(&self, email: &str, password: &str) -> CommandResult<Session>;
}

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct LocalAuthenticator {
    accounts: Vec<Account>,
    ttl: Duration,
}

impl LocalAuthenticator {
    pub fn new(accounts: Vec<Account>, ttl: Duration) -> Self {
        Self { accounts, ttl }
    }
}

impl Authenticator for LocalAuthenticator {
    fn sign_in(&self, email: &str, password: &str) -> CommandResult<Session> {
        let email = email.trim();
        let digest = hash_password(password);
        let known = self.accounts.iter().any(|account| {
            account.email.eq_ignore_ascii_case(email)
                && account.password_sha256.eq_ignore_ascii_case(&digest)
        });

        if !known {
            tracing::warn!(target: TRACING_TARGET, email = %email, "rejected sign-in");
            return Err(FlowCanvasError::Auth("Invalid email or password".to_string()));
        }

        tracing::info!(target: TRACING_TARGET, email = %email, "signed in");
        Ok(Session::issue(email, self.ttl, Utc::now()))
    }
}

/// Lets a protected action through only with an unexpired session.
pub fn require_session(session: Option<&Session>, now: DateTime<Utc>) -> CommandResult<&Session> {
    match session {
        Some(session) if session.is_valid_at(now) => Ok(session),
        Some(_) => Err(FlowCanvasError::Auth(
            "Session expired, please sign in again".to_string(),
        )),
        None => Err(FlowCanvasError::Auth("Please sign in first".to_string())),
    }
}

/// Rules for the password a first-time social sign-in must set.
pub fn validate_new_password(password: &str, confirm: &str) -> CommandResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FlowCanvasError::Validation(
            "Password must be at least 6 characters long".to_string(),
        ));
    }
    if password != confirm {
        return Err(FlowCanvasError::Validation("Passwords do not match".to_string()));
    }
    Ok(())
}

pub fn validate_reset_email(email: &str) -> CommandResult<()> {
    if email.trim().is_empty() {
        return Err(FlowCanvasError::Validation(
            "Please enter your email address".to_string(),
        ));
    }
    Ok(())
}

/// Replaces the stored password hash of the account registered for `email`.
pub fn set_account_password(
    accounts: &mut [Account],
    email: &str,
    password: &str,
    confirm: &str,
) -> CommandResult<()> {
    validate_new_password(password, confirm)?;
    let email = email.trim();
    let account = accounts
        .iter_mut()
        .find(|account| account.email.eq_ignore_ascii_case(email))
        .ok_or_else(|| FlowCanvasError::NotFound(format!("No account for {}", email)))?;

    account.password_sha256 = hash_password(password);
    tracing::info!(target: TRACING_TARGET, email = %email, "password changed");
    Ok(())
}

/// Session persisted between CLI invocations.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn load(&self) -> CommandResult<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let session = serde_json::from_str::<Session>(&raw)
            .map_err(|error| FlowCanvasError::Auth(format!("unreadable session: {}", error)))?;
        Ok(Some(session))
    }

    pub fn store(&self, session: &Session) -> CommandResult<()> {
        let payload = serde_json::to_string_pretty(session)
            .map_err(|error| FlowCanvasError::Io(error.to_string()))?;
        std::fs::write(&self.path, payload)?;
        Ok(())
    }

    pub fn clear(&self) -> CommandResult<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
