//! # lf-auth-simple
//!
//! Argon2-based implementation of `Authenticator` and `IdentityProvider`.
//! Accounts and sessions live in memory and vanish on restart. Sessions
//! expire after a fixed lifetime; expired ones are swept whenever a new
//! session opens.

use std::time::{Duration, Instant};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::Engine;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lf_core::error::{AppError, Result};
use lf_core::models::Identity;
use lf_core::traits::{Authenticator, IdentityProvider, Session};
use lf_core::validation::validate_reporter_email;
use log::{debug, info};
use tokio::sync::watch;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

struct SessionEntry {
    email: String,
    issued_at: Instant,
}

pub struct SimpleAuthProvider {
    /// email -> Argon2 PHC string
    accounts: DashMap<String, String>,
    /// bearer token -> session
    sessions: DashMap<String, SessionEntry>,
    session_ttl: Duration,
    current: watch::Sender<Option<Identity>>,
}

impl Default for SimpleAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleAuthProvider {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            accounts: DashMap::new(),
            sessions: DashMap::new(),
            session_ttl: DEFAULT_SESSION_TTL,
            current,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    fn is_live(&self, entry: &SessionEntry) -> bool {
        entry.issued_at.elapsed() < self.session_ttl
    }

    fn open_session(&self, email: &str) -> Result<Session> {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| self.is_live(entry));
        let swept = before.saturating_sub(self.sessions.len());
        if swept > 0 {
            debug!("swept {} expired sessions", swept);
        }

        let token = new_token()?;
        self.sessions.insert(
            token.clone(),
            SessionEntry { email: email.to_string(), issued_at: Instant::now() },
        );
        let identity = Identity::new(email);
        self.current.send_replace(Some(identity.clone()));
        Ok(Session { token, identity })
    }
}

/// 32 random bytes, URL-safe base64 without padding.
fn new_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| AppError::Collaborator(anyhow::anyhow!("no randomness for session token: {e}")))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Collaborator(anyhow::anyhow!("password hashing failed: {e}")))
}

/// Verifies if a provided password matches a stored Argon2 hash.
fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

impl IdentityProvider for SimpleAuthProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}

impl Authenticator for SimpleAuthProvider {
    /// Registers a new account and signs it in.
    fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        let email = validate_reporter_email(email)
            .map_err(|e| AppError::InvalidInput(format!("email {e}")))?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidInput(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        // Refuse known accounts before paying for a hash; the entry check
        // below still settles concurrent sign-ups for the same email.
        if self.accounts.contains_key(&email) {
            return Err(AppError::Conflict(format!("an account already exists for {email}")));
        }
        let hash = hash_password(password)?;
        match self.accounts.entry(email.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::Conflict(format!("an account already exists for {email}")))
            }
            Entry::Vacant(slot) => {
                slot.insert(hash);
            }
        }

        info!("account created for {}", email);
        self.open_session(&email)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim();
        let verified = self
            .accounts
            .get(email)
            .map(|hash| verify_password(password, hash.value()))
            .unwrap_or(false);
        if !verified {
            return Err(AppError::Unauthenticated("invalid email or password".into()));
        }
        self.open_session(email)
    }

    /// Ends the session. The current identity is cleared only if it belongs
    /// to that session's account.
    fn sign_out(&self, token: &str) {
        if let Some((_, session)) = self.sessions.remove(token) {
            self.current.send_if_modified(|current| match current {
                Some(identity) if identity.email == session.email => {
                    *current = None;
                    true
                }
                _ => false,
            });
        }
    }

    fn identity_for_token(&self, token: &str) -> Option<Identity> {
        let live = self
            .sessions
            .get(token)
            .map(|entry| self.is_live(entry.value()).then(|| Identity::new(entry.email.clone())))?;
        if live.is_none() {
            self.sessions.remove(token);
        }
        live
    }
}
