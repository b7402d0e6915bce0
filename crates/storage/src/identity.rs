//! Session and credential management delegated to the identity provider.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use async_trait::async_trait;
use course_core::Clock;
use course_core::model::{Profile, UserId};
use thiserror::Error;
use uuid::Uuid;

use crate::repository::ProfileRepository;

/// Minimum password length accepted by the provider.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,

    #[error("password reset token is invalid or expired")]
    InvalidResetToken,

    #[error("no user is signed in")]
    NotSignedIn,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// The signed-in account as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `IdentityError::Unavailable` if the provider cannot be reached.
    async fn current_user(&self) -> Result<Option<AuthUser>, IdentityError>;

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` for malformed input or a taken email.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError>;

    /// # Errors
    ///
    /// Returns `IdentityError::InvalidCredentials` on mismatch.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError>;

    /// # Errors
    ///
    /// Returns `IdentityError::Unavailable` if the provider cannot be reached.
    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Send a reset link. Unknown emails succeed silently.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidEmail` for malformed input.
    async fn request_password_reset(&self, email: &str) -> Result<(), IdentityError>;

    /// # Errors
    ///
    /// Returns `IdentityError::InvalidResetToken` or `IdentityError::WeakPassword`.
    async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), IdentityError>;

    /// Change the password of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::NotSignedIn` or `IdentityError::WeakPassword`.
    async fn update_password(&self, new_password: &str) -> Result<(), IdentityError>;
}

fn normalize_email(email: &str) -> Result<String, IdentityError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(IdentityError::InvalidEmail),
    }
}

fn check_password(password: &str) -> Result<(), IdentityError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(IdentityError::WeakPassword);
    }
    Ok(())
}

/// Argon2id PHC string with a fresh random salt.
fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| IdentityError::Hashing(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| IdentityError::Hashing(e.to_string()))
}

fn verify_password(password: &str, stored: &str) -> Result<bool, IdentityError> {
    let parsed = PasswordHash::new(stored).map_err(|e| IdentityError::Hashing(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(IdentityError::Hashing(e.to_string())),
    }
}

struct Account {
    id: UserId,
    password_hash: String,
}

#[derive(Default)]
struct IdentityState {
    accounts: HashMap<String, Account>,
    session: Option<AuthUser>,
    reset_tokens: HashMap<String, String>,
}

/// In-process identity provider for tests and local runs.
///
/// Keeps an Argon2 hash per account and never the password itself. When built
/// with a profile repository it creates a blank profile on sign-up, as the
/// hosted backend does.
#[derive(Clone, Default)]
pub struct InMemoryIdentity {
    state: Arc<Mutex<IdentityState>>,
    profiles: Option<Arc<dyn ProfileRepository>>,
    clock: Clock,
}

impl InMemoryIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileRepository>, clock: Clock) -> Self {
        self.profiles = Some(profiles);
        self.clock = clock;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, IdentityState>, IdentityError> {
        self.state
            .lock()
            .map_err(|e| IdentityError::Unavailable(e.to_string()))
    }

    /// The most recent reset token issued for `email`, standing in for the
    /// link the hosted provider would mail out.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unavailable` if the state lock is poisoned.
    pub fn last_reset_token(&self, email: &str) -> Result<Option<String>, IdentityError> {
        let email = normalize_email(email)?;
        let guard = self.lock()?;
        Ok(guard
            .reset_tokens
            .iter()
            .find(|(_, e)| **e == email)
            .map(|(token, _)| token.clone()))
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn current_user(&self) -> Result<Option<AuthUser>, IdentityError> {
        Ok(self.lock()?.session.clone())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError> {
        let email = normalize_email(email)?;
        check_password(password)?;
        let password_hash = hash_password(password)?;

        let user = {
            let mut guard = self.lock()?;
            if guard.accounts.contains_key(&email) {
                return Err(IdentityError::EmailTaken);
            }
            let id = UserId::random();
            guard.accounts.insert(
                email.clone(),
                Account { id, password_hash },
            );
            let user = AuthUser { id, email };
            guard.session = Some(user.clone());
            user
        };

        if let Some(profiles) = &self.profiles {
            profiles
                .upsert_profile(&Profile::blank(user.id, self.clock.now()))
                .await
                .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        }

        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError> {
        let email = normalize_email(email).map_err(|_| IdentityError::InvalidCredentials)?;
        let (id, stored) = {
            let guard = self.lock()?;
            let account = guard
                .accounts
                .get(&email)
                .ok_or(IdentityError::InvalidCredentials)?;
            (account.id, account.password_hash.clone())
        };
        if !verify_password(password, &stored)? {
            return Err(IdentityError::InvalidCredentials);
        }
        let user = AuthUser { id, email };
        self.lock()?.session = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.lock()?.session = None;
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let email = normalize_email(email)?;
        let mut guard = self.lock()?;
        if guard.accounts.contains_key(&email) {
            guard.reset_tokens.retain(|_, e| *e != email);
            guard
                .reset_tokens
                .insert(Uuid::new_v4().simple().to_string(), email);
        }
        Ok(())
    }

    async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        check_password(new_password)?;
        let password_hash = hash_password(new_password)?;
        let mut guard = self.lock()?;
        let email = guard
            .reset_tokens
            .remove(token)
            .ok_or(IdentityError::InvalidResetToken)?;
        let account = guard
            .accounts
            .get_mut(&email)
            .ok_or(IdentityError::InvalidResetToken)?;
        account.password_hash = password_hash;
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> Result<(), IdentityError> {
        check_password(new_password)?;
        let password_hash = hash_password(new_password)?;
        let mut guard = self.lock()?;
        let email = guard
            .session
            .as_ref()
            .map(|u| u.email.clone())
            .ok_or(IdentityError::NotSignedIn)?;
        let account = guard
            .accounts
            .get_mut(&email)
            .ok_or(IdentityError::NotSignedIn)?;
        account.password_hash = password_hash;
        Ok(())
    }
}
