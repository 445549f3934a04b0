//! Lazy, composable query descriptors
//!
//! A [`Query`] records filters, ordering and a projection without touching
//! the store. Nothing executes until [`Query::materialize`],
//! [`Query::first`], [`Query::count`] or [`Query::paginate`] is awaited,
//! and each of those is a fresh round trip, so the same descriptor can be
//! materialized again later.
//!
//! # Example
//!
//! ```rust,ignore
//! let page = repo
//!     .query()
//!     .filter(Filter::gte(CourseField::Credits, 3))
//!     .order_by(CourseField::Id, OrderDirection::Ascending)
//!     .project(CourseDto::from)
//!     .paginate(PageRequest::new(Some(2), Some(10)), &paging, &cancel)
//!     .await?;
//! ```

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::cancel::cancellable;
use super::entity::Entity;
use super::error::RepositoryOperation;
use super::filter::{Filter, OrderDirection};
use super::paging::{self, PageRequest, PagedResult, PagingConfig};
use super::traits::{RepositoryResult, Store};

/// Rows to skip and take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

impl Window {
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }
}

/// The store-facing part of a query: what to select and in which order.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec<F> {
    pub filters: Vec<Filter<F>>,
    pub order: Vec<(F, OrderDirection)>,
    pub window: Option<Window>,
}

impl<F> Default for QuerySpec<F> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            order: Vec::new(),
            window: None,
        }
    }
}

type Projection<E, P> = Arc<dyn Fn(E) -> P + Send + Sync>;

/// Unevaluated query over entity `E`, yielding `P` per row.
pub struct Query<'s, S, E: Entity, P = E> {
    store: &'s S,
    spec: QuerySpec<E::Field>,
    projection: Projection<E, P>,
}

impl<'s, S, E: Entity> Query<'s, S, E, E> {
    pub(crate) fn new(store: &'s S) -> Self {
        Self {
            store,
            spec: QuerySpec::default(),
            projection: Arc::new(|entity| entity),
        }
    }
}

impl<S, E: Entity, P> Clone for Query<'_, S, E, P> {
    fn clone(&self) -> Self {
        Self {
            store: self.store,
            spec: self.spec.clone(),
            projection: Arc::clone(&self.projection),
        }
    }
}

impl<S, E: Entity, P> fmt::Debug for Query<'_, S, E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("entity", &E::NAME)
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl<'s, S, E, P> Query<'s, S, E, P>
where
    S: Store,
    E: Entity,
    P: 'static,
{
    /// Narrow the result set. Multiple filters are conjoined.
    #[must_use]
    pub fn filter(mut self, filter: Filter<E::Field>) -> Self {
        self.spec.filters.push(filter);
        self
    }

    /// Replace the ordering with `field` as the primary sort key.
    #[must_use]
    pub fn order_by(mut self, field: E::Field, direction: OrderDirection) -> Self {
        self.spec.order.clear();
        self.spec.order.push((field, direction));
        self
    }

    /// Append a tie-breaking sort key.
    #[must_use]
    pub fn then_by(mut self, field: E::Field, direction: OrderDirection) -> Self {
        self.spec.order.push((field, direction));
        self
    }

    /// Map every row through `map` on materialization.
    ///
    /// The store still selects and decodes whole rows into `E`; `map` runs
    /// afterwards, so projecting narrows the result but not the read.
    #[must_use]
    pub fn project<Q, M>(self, map: M) -> Query<'s, S, E, Q>
    where
        M: Fn(P) -> Q + Send + Sync + 'static,
        Q: 'static,
    {
        let previous = self.projection;
        Query {
            store: self.store,
            spec: self.spec,
            projection: Arc::new(move |entity| map(previous(entity))),
        }
    }

    /// Whether a deterministic order has been requested
    pub fn is_ordered(&self) -> bool {
        !self.spec.order.is_empty()
    }

    /// The filters, order and window that will be sent to the store
    pub fn spec(&self) -> &QuerySpec<E::Field> {
        &self.spec
    }

    pub(crate) fn windowed(&self, window: Window) -> Self {
        let mut query = self.clone();
        query.spec.window = Some(window);
        query
    }

    /// Execute the query in one round trip.
    pub async fn materialize(&self, cancel: &CancellationToken) -> RepositoryResult<Vec<P>> {
        let rows = cancellable(
            cancel,
            RepositoryOperation::Query,
            self.store.fetch::<E>(&self.spec),
        )
        .await
        .map_err(|e| e.for_entity(E::NAME))?;

        Ok(rows.into_iter().map(|row| (self.projection)(row)).collect())
    }

    /// First row in query order, if any.
    pub async fn first(&self, cancel: &CancellationToken) -> RepositoryResult<Option<P>> {
        let offset = self.spec.window.map_or(0, |w| w.offset);
        let rows = self
            .windowed(Window::new(offset, 1))
            .materialize(cancel)
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Count rows matching the filters; order and window are ignored.
    pub async fn count(&self, cancel: &CancellationToken) -> RepositoryResult<u64> {
        cancellable(
            cancel,
            RepositoryOperation::Count,
            self.store.count::<E>(&self.spec.filters),
        )
        .await
        .map_err(|e| e.for_entity(E::NAME))
    }

    /// Fetch one page plus the total count. See [`paging::paginate`].
    pub async fn paginate(
        &self,
        request: PageRequest,
        config: &PagingConfig,
        cancel: &CancellationToken,
    ) -> RepositoryResult<PagedResult<P>> {
        paging::paginate(self, request, config, cancel).await
    }
}
