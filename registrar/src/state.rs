//! Application state management

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::{Authenticator, JwtIssuer, LoginLockout, PasswordHasher};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::repository::{Entity, GenericRepository, PagingConfig};
use crate::store::Backend;

/// Application state shared across handlers
///
/// Built once at startup and cloned into every request. Everything inside
/// is a cheap handle: the store wraps a pool (or `Arc`ed tables), the rest
/// is behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    backend: Backend,
    issuer: JwtIssuer,
    authenticator: Authenticator<Backend, JwtIssuer>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.backend.kind())
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Connect the configured store and build the auth services.
    ///
    /// Seeds `auth.bootstrap_admin` when configured. `shutdown` is the root
    /// token every request token is derived from.
    pub async fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let backend = Backend::connect(&config.database).await?;
        Self::with_backend(config, backend, shutdown).await
    }

    /// Like [`AppState::new`] over an already connected store
    pub async fn with_backend(
        config: Config,
        backend: Backend,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let issuer = JwtIssuer::new(&config.auth.jwt)?;
        let hasher = PasswordHasher::new(config.auth.password.clone())?;
        let lockout = LoginLockout::new(config.auth.lockout.clone())?;
        let authenticator =
            Authenticator::new(backend.clone(), hasher, issuer.clone()).with_lockout(lockout);

        if let Some(admin) = &config.auth.bootstrap_admin {
            authenticator
                .ensure_bootstrap_admin(admin, &shutdown)
                .await
                .map_err(|e| Error::Auth(format!("Failed to seed bootstrap admin: {}", e)))?;
        }

        tracing::info!(backend = backend.kind(), "Application state ready");

        Ok(Self {
            config: Arc::new(config),
            backend,
            issuer,
            authenticator,
            shutdown,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn paging(&self) -> &PagingConfig {
        &self.config.paging
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// A repository for `E` over the shared store
    pub fn repository<E: Entity>(&self) -> GenericRepository<E, Backend> {
        GenericRepository::new(self.backend.clone())
    }

    pub fn issuer(&self) -> &JwtIssuer {
        &self.issuer
    }

    pub fn authenticator(&self) -> &Authenticator<Backend, JwtIssuer> {
        &self.authenticator
    }

    /// Root token; cancelled when the server begins shutting down
    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::auth::password::cheap_config;
    use crate::auth::tokens::test_config;
    use crate::auth::BootstrapAdmin;
    use crate::store::MemoryStore;

    pub(crate) const ADMIN_EMAIL: &str = "admin@example.com";
    pub(crate) const ADMIN_PASSWORD: &str = "admin-password";

    pub(crate) fn test_config_with_admin() -> Config {
        let mut config = Config::default();
        config.auth.jwt = test_config();
        config.auth.password = cheap_config();
        config.auth.bootstrap_admin = Some(BootstrapAdmin {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        });
        config
    }

    pub(crate) async fn memory_state() -> AppState {
        match AppState::with_backend(
            test_config_with_admin(),
            MemoryStore::new().into(),
            CancellationToken::new(),
        )
        .await
        {
            Ok(state) => state,
            Err(e) => panic!("test state: {}", e),
        }
    }
}
