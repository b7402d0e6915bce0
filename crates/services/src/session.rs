use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use course_core::Clock;
use course_core::model::{Profile, ProfileUpdate, UserId};
use storage::identity::{AuthUser, IdentityProvider};
use storage::repository::{AVATAR_BUCKET, BlobStore, ProfileRepository, Storage, public_url};

use crate::error::SessionContextError;

/// Attempts made to fill in the profile after sign-up.
pub const PROFILE_RETRY_ATTEMPTS: u32 = 5;
/// Pause before each attempt.
pub const PROFILE_RETRY_DELAY: Duration = Duration::from_millis(500);
/// Largest accepted profile picture.
pub const AVATAR_MAX_BYTES: usize = 2 * 1024 * 1024;

/// Who is signed in and their profile, as seen by consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<AuthUser>,
    pub profile: Option<Profile>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| p.is_admin)
    }

    /// The learner's preferred professional field, if set.
    #[must_use]
    pub fn professional_field(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| p.professional_field.as_deref())
    }
}

/// Session and profile state built once and shared with consumers.
///
/// Every mutation publishes a new snapshot to `subscribe()` receivers.
pub struct SessionContext {
    clock: Clock,
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileRepository>,
    blobs: Arc<dyn BlobStore>,
    tx: watch::Sender<SessionSnapshot>,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl SessionContext {
    #[must_use]
    pub fn new(
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileRepository>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self {
            clock,
            identity,
            profiles,
            blobs,
            tx,
            retry_attempts: PROFILE_RETRY_ATTEMPTS,
            retry_delay: PROFILE_RETRY_DELAY,
        }
    }

    #[must_use]
    pub fn from_storage(
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
        storage: &Storage,
    ) -> Self {
        Self::new(
            clock,
            identity,
            Arc::clone(&storage.profiles),
            Arc::clone(&storage.blobs),
        )
    }

    /// Override the sign-up profile retry policy.
    #[must_use]
    pub fn with_profile_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn user(&self) -> Option<AuthUser> {
        self.tx.borrow().user.clone()
    }

    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.tx.borrow().profile.clone()
    }

    /// Pick up an existing provider session.
    ///
    /// # Errors
    ///
    /// Returns `SessionContextError` if the provider or profile lookup fails.
    pub async fn restore(&self) -> Result<SessionSnapshot, SessionContextError> {
        let user = self.identity.current_user().await?;
        self.publish_for(user).await
    }

    /// Create an account, then fill in its profile.
    ///
    /// The backend creates the profile row asynchronously, so the update is
    /// retried with a pause before each attempt. If the row never shows up the
    /// account is still signed in, with no profile in the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SessionContextError::Identity` if the account cannot be
    /// created, or `SessionContextError::Storage` when the last attempt failed
    /// on a storage error.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        details: ProfileUpdate,
    ) -> Result<SessionSnapshot, SessionContextError> {
        let user = self.identity.sign_up(email, password).await?;

        let mut last_error = None;
        for attempt in 1..=self.retry_attempts {
            tokio::time::sleep(self.retry_delay).await;
            match self.profiles.get_profile(user.id).await {
                Ok(Some(mut profile)) => {
                    profile.apply(details.clone(), self.clock.now());
                    match self.profiles.upsert_profile(&profile).await {
                        Ok(()) => {
                            debug!(user_id = %user.id, attempt, "profile completed after sign-up");
                            return self.publish_for(Some(user)).await;
                        }
                        Err(e) => last_error = Some(e),
                    }
                }
                Ok(None) => debug!(user_id = %user.id, attempt, "profile not created yet"),
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(e) => {
                warn!(user_id = %user.id, error = %e, "profile update failed after sign-up");
                Err(e.into())
            }
            None => {
                warn!(user_id = %user.id, "profile never appeared after sign-up");
                self.publish_for(Some(user)).await
            }
        }
    }

    /// # Errors
    ///
    /// Returns `SessionContextError::Identity` on bad credentials.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionSnapshot, SessionContextError> {
        let user = self.identity.sign_in(email, password).await?;
        self.publish_for(Some(user)).await
    }

    /// # Errors
    ///
    /// Returns `SessionContextError::Identity` if the provider fails.
    pub async fn sign_out(&self) -> Result<(), SessionContextError> {
        self.identity.sign_out().await?;
        self.tx.send_replace(SessionSnapshot::default());
        Ok(())
    }

    /// Apply `update` to the signed-in learner's profile and reload it.
    ///
    /// # Errors
    ///
    /// Returns `SessionContextError::NotSignedIn` without a user, or
    /// `SessionContextError::Storage` if the profile cannot be written.
    pub async fn update_profile(
        &self,
        update: ProfileUpdate,
    ) -> Result<Profile, SessionContextError> {
        let user = self.user().ok_or(SessionContextError::NotSignedIn)?;
        let now = self.clock.now();
        let mut profile = self
            .profiles
            .get_profile(user.id)
            .await?
            .unwrap_or_else(|| Profile::blank(user.id, now));
        profile.apply(update, now);
        self.profiles.upsert_profile(&profile).await?;

        self.tx.send_modify(|snapshot| snapshot.profile = Some(profile.clone()));
        Ok(profile)
    }

    /// Store a new profile picture and point the profile at it.
    ///
    /// The file lands at `{user_id}/avatar.{ext}`, replacing any earlier upload
    /// with the same extension.
    ///
    /// # Errors
    ///
    /// Returns `SessionContextError::NotSignedIn` without a user,
    /// `SessionContextError::AvatarTooLarge` above `AVATAR_MAX_BYTES`,
    /// `SessionContextError::AvatarNameInvalid` when `file_name` has no
    /// extension, or `SessionContextError::Storage` if a write fails.
    pub async fn upload_avatar(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Profile, SessionContextError> {
        let user = self.user().ok_or(SessionContextError::NotSignedIn)?;
        if bytes.len() > AVATAR_MAX_BYTES {
            return Err(SessionContextError::AvatarTooLarge(bytes.len()));
        }
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| SessionContextError::AvatarNameInvalid(file_name.to_owned()))?;

        let path = format!("{}/avatar.{}", user.id, ext.to_lowercase());
        self.blobs.put_object(AVATAR_BUCKET, &path, bytes).await?;
        info!(user_id = %user.id, %path, size = bytes.len(), "avatar uploaded");

        self.update_profile(ProfileUpdate {
            avatar_url: Some(public_url(AVATAR_BUCKET, &path)),
            ..ProfileUpdate::default()
        })
        .await
    }

    /// Remove the stored picture and clear `avatar_url`. Without an avatar
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `SessionContextError::NotSignedIn` without a user, or
    /// `SessionContextError::Storage` if a delete or write fails.
    pub async fn delete_avatar(&self) -> Result<(), SessionContextError> {
        let user = self.user().ok_or(SessionContextError::NotSignedIn)?;
        let Some(mut profile) = self.profiles.get_profile(user.id).await? else {
            return Ok(());
        };
        let Some(file) = profile
            .avatar_url
            .as_deref()
            .and_then(|url| url.rsplit('/').next())
        else {
            return Ok(());
        };

        let path = format!("{}/{file}", user.id);
        self.blobs.remove_object(AVATAR_BUCKET, &path).await?;

        profile.avatar_url = None;
        profile.updated_at = self.clock.now();
        self.profiles.upsert_profile(&profile).await?;
        info!(user_id = %user.id, %path, "avatar removed");

        self.tx.send_modify(|snapshot| snapshot.profile = Some(profile));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionContextError::Identity` for a malformed email.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), SessionContextError> {
        self.identity.request_password_reset(email).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionContextError::Identity` for a bad token or weak password.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), SessionContextError> {
        self.identity
            .confirm_password_reset(token, new_password)
            .await?;
        Ok(())
    }

    async fn publish_for(
        &self,
        user: Option<AuthUser>,
    ) -> Result<SessionSnapshot, SessionContextError> {
        let profile = match &user {
            Some(u) => self.profiles.get_profile(u.id).await?,
            None => None,
        };
        let snapshot = SessionSnapshot { user, profile };
        self.tx.send_replace(snapshot.clone());
        Ok(snapshot)
    }
}
