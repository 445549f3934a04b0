//! Generic data access for every persisted entity
//!
//! One [`GenericRepository`] implementation serves courses, students,
//! enrollments and users alike. Reads are composed as lazy [`Query`]
//! descriptors and executed against a [`Store`]; writes are single
//! set-based statements.
//!
//! - **Composition**: [`Query::filter`], [`Query::order_by`],
//!   [`Query::then_by`] and [`Query::project`] perform no I/O
//! - **Paging**: [`Query::paginate`] counts, then fetches one clamped page
//! - **Set-based writes**: [`Repository::update_where`] and
//!   [`Repository::delete_by_id`] never load rows first
//! - **Cancellation**: every operation takes a `CancellationToken`
//!
//! # Example
//!
//! ```rust,ignore
//! use registrar::entities::{Course, CourseField};
//! use registrar::repository::{
//!     Filter, GenericRepository, OrderDirection, PageRequest, PagingConfig, Repository,
//! };
//!
//! let repo = GenericRepository::<Course, _>::new(store);
//! let page = repo
//!     .query()
//!     .filter(Filter::gte(CourseField::Credits, 3))
//!     .order_by(CourseField::Id, OrderDirection::Ascending)
//!     .paginate(PageRequest::new(Some(1), Some(20)), &PagingConfig::default(), &cancel)
//!     .await?;
//! ```

mod cancel;
mod entity;
mod error;
mod filter;
mod generic;
mod paging;
mod query;
mod setters;
mod traits;

pub use entity::{Audited, Constraint, Entity, Field, Record};
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use filter::{FieldValue, Filter, FilterOperator, OrderDirection};
pub use generic::GenericRepository;
pub use paging::{
    paginate, total_pages, PageRequest, PageWindow, PagedResult, PagingConfig,
    DEFAULT_PAGE_NUMBER,
};
pub use query::{Query, QuerySpec, Window};
pub use setters::UpdateSet;
pub use traits::{Repository, RepositoryResult, Store};
