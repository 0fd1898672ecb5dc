// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant authentication middleware.
//!
//! The token is read from the `token` header, falling back to the `token`
//! query parameter, and resolved through the [`AuthCache`](hookwire_auth::AuthCache).
//! The resolved [`TenantInfo`] is attached to the request extensions.

use axum::extract::{Query, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::warn;

use hookwire_core::{HookwireError, TenantInfo};

use crate::envelope::ApiError;
use crate::server::GatewayState;

/// Header carrying the tenant token.
pub const TOKEN_HEADER: &str = "token";

#[derive(Debug, Deserialize)]
struct TokenQuery {
    #[serde(default)]
    token: String,
}

/// Extracts the tenant token from a request.
pub fn token_from(request: &Request) -> String {
    if let Some(token) = request
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return token.to_string();
    }
    Query::<TokenQuery>::try_from_uri(request.uri())
        .map(|Query(q)| q.token)
        .unwrap_or_default()
}

/// Rejects requests whose token does not resolve to a tenant.
pub async fn auth_middleware(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = token_from(&request);
    match state.auth.resolve(&token).await {
        Ok(info) => {
            request.extensions_mut().insert::<TenantInfo>(info);
            next.run(request).await
        }
        Err(HookwireError::Unauthorized) => {
            ApiError::from(HookwireError::Unauthorized).into_response()
        }
        Err(e) => {
            warn!(error = %e, "token lookup failed");
            ApiError::from(e).into_response()
        }
    }
}
