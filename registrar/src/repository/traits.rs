//! Repository and store trait definitions
//!
//! Both traits use RPITIT (return-position `impl Trait` in traits), so
//! implementations are plain `async fn`s and no `async_trait` boxing is
//! involved.
//!
//! - [`Store`]: the backend seam. One implementation per storage engine
//!   (`PgStore`, `MemoryStore`), each executing exactly one statement per
//!   call.
//! - [`Repository`]: the uniform data-access surface over one entity type.
//!   [`GenericRepository`](super::GenericRepository) implements it once for
//!   every entity.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use super::entity::{Entity, Record};
use super::error::RepositoryError;
use super::filter::Filter;
use super::query::{Query, QuerySpec};
use super::setters::UpdateSet;

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Storage backend executing single statements.
///
/// Each method is one round trip and is atomic at statement level. Stores
/// hold no per-request state; connections are acquired per call.
pub trait Store: Clone + Send + Sync + 'static {
    /// `SELECT` rows matching `spec` in its order and window
    fn fetch<E: Entity>(
        &self,
        spec: &QuerySpec<E::Field>,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// `SELECT COUNT(*)` over rows matching `filters`
    fn count<E: Entity>(
        &self,
        filters: &[Filter<E::Field>],
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// `INSERT` the given columns and return the stored row with its new id
    fn insert<E: Entity>(&self, record: Record)
        -> impl Future<Output = RepositoryResult<E>> + Send;

    /// `UPDATE ... SET` the given fields on every row matching `filters`
    fn update_where<E: Entity>(
        &self,
        filters: &[Filter<E::Field>],
        setters: &UpdateSet<E::Field>,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// `DELETE` every row matching `filters`
    fn delete_where<E: Entity>(
        &self,
        filters: &[Filter<E::Field>],
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Cheap liveness probe
    fn ping(&self) -> impl Future<Output = RepositoryResult<()>> + Send;
}

/// Uniform data access for one entity type.
///
/// Every operation takes a [`CancellationToken`]; a fired token surfaces as
/// [`RepositoryErrorKind::Cancelled`](super::RepositoryErrorKind::Cancelled).
/// Nothing is retried and nothing is cached between calls.
///
/// # Example
///
/// ```rust,ignore
/// let repo = GenericRepository::<Course, _>::new(store);
/// let cancel = CancellationToken::new();
///
/// let course = repo.add(Course::new("Algebra", 3, Utc::now()), &cancel).await?;
/// let renamed = repo
///     .update_where(
///         vec![Filter::eq(CourseField::Id, course.id)],
///         UpdateSet::new().set(CourseField::Title, "Linear Algebra"),
///         &cancel,
///     )
///     .await?;
/// assert_eq!(renamed, 1);
/// ```
pub trait Repository<E: Entity>: Send + Sync {
    /// Backend the composed queries run against
    type Store: Store;

    /// Start an unevaluated query over all rows of `E`.
    ///
    /// Composing performs no I/O; see [`Query`].
    fn query(&self) -> Query<'_, Self::Store, E>;

    /// Persist `entity` and return it with the store-assigned id.
    ///
    /// The incoming id is ignored. Uniqueness and foreign-key failures
    /// surface as `ConstraintViolation`.
    fn add(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Apply `setters` to every row matching `predicate` in one statement.
    ///
    /// Rows are not loaded first and no concurrency token is checked: the
    /// last writer wins. Returns the number of rows updated (0 if none
    /// matched).
    fn update_where(
        &self,
        predicate: Vec<Filter<E::Field>>,
        setters: UpdateSet<E::Field>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Delete the row with `id`. Returns 1 if a row was removed, 0 otherwise.
    ///
    /// A row another row still points at is kept and the call fails with
    /// `StillReferenced`.
    fn delete_by_id(
        &self,
        id: i32,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;
}
