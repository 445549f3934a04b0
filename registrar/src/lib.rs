//! # registrar
//!
//! Student, course and enrollment records behind a REST API.
//!
//! ## Features
//!
//! - **Generic repository**: one implementation of lazy, composable queries
//!   (filter, order, project) with clamped paging for every entity
//! - **Set-based writes**: updates and deletes run as single statements,
//!   with audit columns stamped on every write
//! - **Storage**: Postgres via `sqlx`, or an in-memory store for tests and demos
//! - **Auth**: Argon2id password hashing and HMAC-signed JWT bearer tokens;
//!   writes require the `Admin` role
//! - **Cancellation**: every repository call honors a per-request token
//!   that fires on shutdown or when the client goes away
//! - **Health checks**: liveness and readiness probes
//!
//! ## Example
//!
//! ```rust,no_run
//! use registrar::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let shutdown = CancellationToken::new();
//!     let state = AppState::new(config.clone(), shutdown.clone()).await?;
//!
//!     Server::new(config).serve(router(state), shutdown).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod database;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod observability;
pub mod repository;
pub mod server;
pub mod state;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::auth::{
        AuthConfig, AuthError, Authenticator, Claims, Credentials, JwtIssuer, PasswordHasher,
        TokenIssuer, TokenValidator,
    };
    pub use crate::config::Config;
    pub use crate::entities::{
        Course, CourseCreateDto, CourseDto, Enrollment, EnrollmentCreateDto, EnrollmentDto,
        Student, StudentCreateDto, StudentDto, User, ADMIN_ROLE, USER_ROLE,
    };
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{router, ApiError, ApiErrorKind, RequestCancellation};
    pub use crate::health::{health, readiness};
    pub use crate::middleware::RequireAdmin;
    pub use crate::observability::init_tracing;
    pub use crate::repository::{
        Filter, GenericRepository, OrderDirection, PageRequest, PagedResult, PagingConfig,
        Repository, RepositoryError, Store, UpdateSet,
    };
    pub use crate::server::Server;
    pub use crate::state::AppState;
    pub use crate::store::{Backend, MemoryStore, PgStore};

    pub use tokio_util::sync::CancellationToken;
}
