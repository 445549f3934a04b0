//! The one [`Repository`] implementation shared by every entity

use std::fmt;
use std::marker::PhantomData;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::cancel::cancellable;
use super::entity::{Entity, Field};
use super::error::{RepositoryError, RepositoryOperation};
use super::filter::Filter;
use super::query::Query;
use super::setters::UpdateSet;
use super::traits::{Repository, RepositoryResult, Store};

/// Stateless repository for entity `E` over store `S`.
///
/// Cheap to construct and clone; it holds only a store handle. There is no
/// identity map: every call goes to the store.
pub struct GenericRepository<E, S> {
    store: S,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, S: Store> GenericRepository<E, S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<E, S: Clone> Clone for GenericRepository<E, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, S> fmt::Debug for GenericRepository<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericRepository")
            .field("entity", &E::NAME)
            .finish_non_exhaustive()
    }
}

impl<E: Entity, S: Store> Repository<E> for GenericRepository<E, S> {
    type Store = S;

    fn query(&self) -> Query<'_, S, E> {
        Query::new(&self.store)
    }

    #[instrument(skip_all, fields(entity = E::NAME))]
    async fn add(&self, entity: E, cancel: &CancellationToken) -> RepositoryResult<E> {
        let mut record = entity.to_record();
        record.remove(E::ID.column());

        let created = cancellable(
            cancel,
            RepositoryOperation::Add,
            self.store.insert::<E>(record),
        )
        .await
        .map_err(|e| e.for_entity(E::NAME))?;

        tracing::info!(entity = E::NAME, id = created.id(), "entity added");
        Ok(created)
    }

    #[instrument(skip_all, fields(entity = E::NAME, setters = setters.len()))]
    async fn update_where(
        &self,
        predicate: Vec<Filter<E::Field>>,
        setters: UpdateSet<E::Field>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<u64> {
        if setters.is_empty() {
            return Err(RepositoryError::invalid_update("No fields to update").for_entity(E::NAME));
        }
        if setters.contains(E::ID) {
            return Err(
                RepositoryError::invalid_update("The identity column cannot be updated")
                    .for_entity(E::NAME),
            );
        }

        let affected = cancellable(
            cancel,
            RepositoryOperation::UpdateWhere,
            self.store.update_where::<E>(&predicate, &setters),
        )
        .await
        .map_err(|e| e.for_entity(E::NAME))?;

        tracing::debug!(entity = E::NAME, affected, "update_where applied");
        Ok(affected)
    }

    #[instrument(skip(self, cancel), fields(entity = E::NAME))]
    async fn delete_by_id(&self, id: i32, cancel: &CancellationToken) -> RepositoryResult<u64> {
        let predicate = [Filter::eq(E::ID, id)];
        let affected = cancellable(
            cancel,
            RepositoryOperation::DeleteById,
            self.store.delete_where::<E>(&predicate),
        )
        .await
        .map_err(|e| e.with_entity(E::NAME, id.to_string()))?;

        tracing::debug!(entity = E::NAME, id, affected, "delete_by_id applied");
        Ok(affected)
    }
}
