//! Credential checks and account registration
//!
//! [`Authenticator`] looks users up through the generic repository, checks
//! Argon2 hashes off the async runtime and hands out tokens from any
//! [`TokenIssuer`]. A wrong password, an unknown email and a locked account
//! fail the same way and take roughly the same time.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::auth::config::BootstrapAdmin;
use crate::auth::lockout::LoginLockout;
use crate::auth::password::PasswordHasher;
use crate::auth::tokens::{Identity, TokenIssuer};
use crate::entities::{User, UserField, ADMIN_ROLE, SYSTEM_ACTOR, USER_ROLE};
use crate::error::Error;
use crate::repository::{
    Filter, GenericRepository, Repository, RepositoryError, RepositoryErrorKind, Store,
    UpdateSet,
};

/// One failed validation rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Input rejected before any credential check
    #[error("{} validation error(s)", .0.len())]
    Validation(Vec<ValidationIssue>),

    /// Unknown email, wrong password or locked account
    #[error("Invalid email or password")]
    Unauthorized,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Internal(String),
}

impl From<Error> for AuthError {
    fn from(err: Error) -> Self {
        match err {
            Error::ValidationError(message) => {
                Self::Validation(vec![ValidationIssue::new("PasswordTooShort", message)])
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Body of the login and register routes
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: i32,
    pub token: String,
}

/// Successful registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub user_id: i32,
    pub email: String,
}

/// Login and registration over the `users` table
pub struct Authenticator<S, T> {
    users: GenericRepository<User, S>,
    hasher: Arc<PasswordHasher>,
    issuer: T,
    lockout: LoginLockout,
}

impl<S: Clone, T: Clone> Clone for Authenticator<S, T> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            hasher: Arc::clone(&self.hasher),
            issuer: self.issuer.clone(),
            lockout: self.lockout.clone(),
        }
    }
}

impl<S, T> std::fmt::Debug for Authenticator<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

impl<S: Store, T: TokenIssuer> Authenticator<S, T> {
    /// Lockout starts disabled; see [`Authenticator::with_lockout`].
    pub fn new(store: S, hasher: PasswordHasher, issuer: T) -> Self {
        Self {
            users: GenericRepository::new(store),
            hasher: Arc::new(hasher),
            issuer,
            lockout: LoginLockout::disabled(),
        }
    }

    /// Lock accounts after repeated wrong passwords
    #[must_use]
    pub fn with_lockout(mut self, lockout: LoginLockout) -> Self {
        self.lockout = lockout;
        self
    }

    /// Check credentials and issue a token.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<AuthResponse, AuthError> {
        let mut issues = Vec::new();
        check_email(email, &mut issues);
        if password.is_empty() {
            issues.push(ValidationIssue::new(
                "PasswordRequired",
                "Password is required.",
            ));
        }
        if !issues.is_empty() {
            return Err(AuthError::Validation(issues));
        }

        let identity = normalize_email(email);
        let user = self.find_by_email(&identity, cancel).await?;
        // only registered accounts are tracked
        let locked = match &user {
            Some(_) => self.lockout.check(&identity).await.locked,
            None => false,
        };

        let hasher = Arc::clone(&self.hasher);
        let candidate = password.to_string();
        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let verified = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&candidate, &hash),
            None => Ok(hasher.verify_dummy(&candidate)),
        })
        .await
        .map_err(|e| AuthError::Internal(format!("Password verification task failed: {}", e)))?;

        let user = match (user, verified) {
            (Some(user), _) if locked => {
                tracing::warn!(user_id = user.id, "login rejected, account locked");
                return Err(AuthError::Unauthorized);
            }
            (Some(user), Ok(true)) => user,
            (Some(user), Ok(false)) => {
                let status = self.lockout.record_failure(&identity).await;
                tracing::info!(
                    user_id = user.id,
                    attempt_count = status.attempt_count,
                    "login rejected"
                );
                return Err(AuthError::Unauthorized);
            }
            (Some(user), Err(e)) => {
                tracing::error!(user_id = user.id, error = %e, "stored password hash is unreadable");
                return Err(AuthError::Unauthorized);
            }
            _ => {
                tracing::info!("login rejected");
                return Err(AuthError::Unauthorized);
            }
        };

        self.lockout.record_success(&identity).await;

        if self.hasher.needs_rehash(&user.password_hash) {
            self.upgrade_hash(user.id, password, cancel).await;
        }

        let issued = self
            .issuer
            .issue(&Identity {
                user_id: user.id,
                email: user.email.clone(),
                roles: user.roles(),
            })
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        tracing::info!(user_id = user.id, "login succeeded");

        Ok(AuthResponse {
            user_id: user.id,
            token: issued.token,
        })
    }

    /// Create a `User` account.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<RegisteredUser, AuthError> {
        let user = self.create_user(email, password, USER_ROLE, cancel).await?;
        tracing::info!(user_id = user.id, "user registered");
        Ok(RegisteredUser {
            user_id: user.id,
            email: user.email,
        })
    }

    /// Create the configured administrator unless the email is taken.
    ///
    /// Returns whether an account was created.
    #[instrument(skip_all, fields(email = %admin.email))]
    pub async fn ensure_bootstrap_admin(
        &self,
        admin: &BootstrapAdmin,
        cancel: &CancellationToken,
    ) -> Result<bool, AuthError> {
        if self
            .find_by_email(&normalize_email(&admin.email), cancel)
            .await?
            .is_some()
        {
            tracing::debug!("bootstrap admin already present");
            return Ok(false);
        }

        let user = self
            .create_user(&admin.email, &admin.password, ADMIN_ROLE, cancel)
            .await?;
        tracing::info!(user_id = user.id, "bootstrap admin created");
        Ok(true)
    }

    /// Store a hash made with the current parameters. A failure is logged
    /// and the login still succeeds.
    async fn upgrade_hash(&self, user_id: i32, password: &str, cancel: &CancellationToken) {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let password_hash = match tokio::task::spawn_blocking(move || hasher.hash(&password)).await
        {
            Ok(Ok(hash)) => hash,
            Ok(Err(e)) => {
                tracing::warn!(user_id, error = %e, "password rehash failed");
                return;
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "password rehash task failed");
                return;
            }
        };

        let setters = UpdateSet::new()
            .set(UserField::PasswordHash, password_hash)
            .touch::<User>(Utc::now(), SYSTEM_ACTOR);
        match self
            .users
            .update_where(vec![Filter::eq(UserField::Id, user_id)], setters, cancel)
            .await
        {
            Ok(_) => tracing::info!(user_id, "password hash upgraded"),
            Err(e) => tracing::warn!(user_id, error = %e, "failed to store upgraded hash"),
        }
    }

    async fn find_by_email(
        &self,
        email: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<User>, AuthError> {
        Ok(self
            .users
            .query()
            .filter(Filter::eq(UserField::Email, email))
            .first(cancel)
            .await?)
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
        role: &str,
        cancel: &CancellationToken,
    ) -> Result<User, AuthError> {
        let mut issues = Vec::new();
        check_email(email, &mut issues);
        if password.chars().count() < self.hasher.min_password_length() {
            issues.push(ValidationIssue::new(
                "PasswordTooShort",
                format!(
                    "Passwords must be at least {} characters.",
                    self.hasher.min_password_length()
                ),
            ));
        }
        if !issues.is_empty() {
            return Err(AuthError::Validation(issues));
        }

        let email = normalize_email(email);
        if self.find_by_email(&email, cancel).await?.is_some() {
            return Err(duplicate_email(&email));
        }

        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task failed: {}", e)))??;

        match self
            .users
            .add(User::new(&email, password_hash, role, Utc::now()), cancel)
            .await
        {
            Ok(user) => Ok(user),
            // lost a race with a concurrent registration
            Err(e) if e.kind == RepositoryErrorKind::ConstraintViolation => {
                Err(duplicate_email(&email))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn duplicate_email(email: &str) -> AuthError {
    AuthError::Validation(vec![ValidationIssue::new(
        "DuplicateEmail",
        format!("Email '{}' is already taken.", email),
    )])
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(email: &str, issues: &mut Vec<ValidationIssue>) {
    let email = email.trim();
    if email.is_empty() {
        issues.push(ValidationIssue::new("EmailRequired", "Email is required."));
    } else if !is_email_shaped(email) {
        issues.push(ValidationIssue::new(
            "InvalidEmail",
            format!("Email '{}' is invalid.", email),
        ));
    }
}

fn is_email_shaped(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}
