//! Authentication: password hashing, bearer tokens and the login flow
//!
//! The repository core does not depend on anything in here; the
//! [`Authenticator`] is just another client of [`GenericRepository`]
//! over the `users` table.
//!
//! [`GenericRepository`]: crate::repository::GenericRepository
//!
//! # Example
//!
//! ```rust,ignore
//! use registrar::auth::{Authenticator, JwtIssuer, PasswordHasher};
//!
//! let hasher = PasswordHasher::new(config.auth.password.clone())?;
//! let issuer = JwtIssuer::new(&config.auth.jwt)?;
//! let auth = Authenticator::new(store, hasher, issuer);
//!
//! let response = auth.authenticate("ada@example.com", "correct horse", &cancel).await?;
//! println!("Bearer {}", response.token);
//! ```

pub mod config;
pub mod lockout;
pub mod manager;
pub mod password;
pub mod tokens;

pub use config::{AuthConfig, BootstrapAdmin, JwtConfig, LockoutConfig, PasswordConfig};
pub use lockout::{LockoutStatus, LoginLockout};
pub use manager::{
    AuthError, AuthResponse, Authenticator, Credentials, RegisteredUser, ValidationIssue,
};
pub use password::PasswordHasher;
pub use tokens::{
    extract_token, Claims, Identity, IssuedToken, JwtIssuer, TokenIssuer, TokenValidator,
};
