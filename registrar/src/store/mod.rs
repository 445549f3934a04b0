//! Storage backends behind the [`Store`] seam
//!
//! - [`PgStore`]: Postgres via a `sqlx` pool
//! - [`MemoryStore`]: process-local tables, selected with
//!   `database.url = "memory://"`
//!
//! [`Backend`] picks one at startup so handlers stay monomorphic.

mod memory;
mod postgres;
mod sql;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::DatabaseConfig;
use crate::database;
use crate::error::Result;
use crate::repository::{
    Entity, Filter, QuerySpec, Record, RepositoryResult, Store, UpdateSet,
};

/// URL scheme that selects the in-memory store
pub const MEMORY_URL_SCHEME: &str = "memory://";

/// The store chosen by configuration
#[derive(Debug, Clone)]
pub enum Backend {
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Backend {
    /// Connect according to `config`.
    ///
    /// A `memory://` URL never fails; Postgres connects with the retry
    /// policy from the config.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if config.url.starts_with(MEMORY_URL_SCHEME) {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            return Ok(Self::Memory(MemoryStore::new()));
        }
        let pool = database::create_pool(config).await?;
        Ok(Self::Postgres(PgStore::new(pool)))
    }

    /// Name of the backend for logs and readiness output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

impl From<MemoryStore> for Backend {
    fn from(store: MemoryStore) -> Self {
        Self::Memory(store)
    }
}

impl From<PgStore> for Backend {
    fn from(store: PgStore) -> Self {
        Self::Postgres(store)
    }
}

impl Store for Backend {
    async fn fetch<E: Entity>(&self, spec: &QuerySpec<E::Field>) -> RepositoryResult<Vec<E>> {
        match self {
            Self::Postgres(store) => store.fetch::<E>(spec).await,
            Self::Memory(store) => store.fetch::<E>(spec).await,
        }
    }

    async fn count<E: Entity>(&self, filters: &[Filter<E::Field>]) -> RepositoryResult<u64> {
        match self {
            Self::Postgres(store) => store.count::<E>(filters).await,
            Self::Memory(store) => store.count::<E>(filters).await,
        }
    }

    async fn insert<E: Entity>(&self, record: Record) -> RepositoryResult<E> {
        match self {
            Self::Postgres(store) => store.insert::<E>(record).await,
            Self::Memory(store) => store.insert::<E>(record).await,
        }
    }

    async fn update_where<E: Entity>(
        &self,
        filters: &[Filter<E::Field>],
        setters: &UpdateSet<E::Field>,
    ) -> RepositoryResult<u64> {
        match self {
            Self::Postgres(store) => store.update_where::<E>(filters, setters).await,
            Self::Memory(store) => store.update_where::<E>(filters, setters).await,
        }
    }

    async fn delete_where<E: Entity>(&self, filters: &[Filter<E::Field>]) -> RepositoryResult<u64> {
        match self {
            Self::Postgres(store) => store.delete_where::<E>(filters).await,
            Self::Memory(store) => store.delete_where::<E>(filters).await,
        }
    }

    async fn ping(&self) -> RepositoryResult<()> {
        match self {
            Self::Postgres(store) => store.ping().await,
            Self::Memory(store) => store.ping().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_url_selects_memory_store() {
        let config = DatabaseConfig {
            url: "memory://".to_string(),
            ..DatabaseConfig::default()
        };
        let backend = Backend::connect(&config).await.unwrap();
        assert_eq!(backend.kind(), "memory");
        backend.ping().await.unwrap();
    }
}
