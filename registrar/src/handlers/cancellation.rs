//! Per-request cancellation tokens

use std::convert::Infallible;
use std::ops::Deref;

use axum::{extract::FromRequestParts, http::request::Parts};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::state::AppState;

/// Cancellation token scoped to one request.
///
/// A child of the server's shutdown token, so it fires when shutdown
/// begins. It also fires when the handler future is dropped, e.g. when the
/// timeout layer gives up on the request.
pub struct RequestCancellation {
    token: CancellationToken,
    _guard: DropGuard,
}

impl RequestCancellation {
    pub fn new(parent: &CancellationToken) -> Self {
        let token = parent.child_token();
        let guard = token.clone().drop_guard();
        Self {
            token,
            _guard: guard,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Deref for RequestCancellation {
    type Target = CancellationToken;

    fn deref(&self) -> &CancellationToken {
        &self.token
    }
}

impl FromRequestParts<AppState> for RequestCancellation {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::new(state.shutdown()))
    }
}
