use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Query},
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use super::helpers::{TokenValidationError, extract_token_from_header, validate_token};
use crate::server::AppState;
use crate::tenancy::{CenterOverride, Scope, SessionState, TenantResolver};
use crate::types::{Token, User};

/// Extractor that requires an authenticated, active user.
pub struct RequireUser {
    pub token: Token,
    pub user: User,
}

/// Authenticated user plus the tenant scope resolved for this request.
///
/// Founders and admins may pass `?center_id=<id>` (or `all`) to switch the
/// active center; the choice is remembered on the token's session.
pub struct RequestScope {
    pub token: Token,
    pub user: User,
    pub scope: Scope,
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    UserInactive,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::UserInactive => (StatusCode::UNAUTHORIZED, "Account disabled"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                HeaderValue::from_static("Bearer realm=\"cfpa-gate\""),
            );
        }

        response
    }
}

impl From<TokenValidationError> for AuthError {
    fn from(e: TokenValidationError) -> Self {
        match e {
            TokenValidationError::InvalidScheme => AuthError::InvalidScheme,
            TokenValidationError::InvalidToken => AuthError::InvalidToken,
            TokenValidationError::TokenExpired => AuthError::TokenExpired,
            TokenValidationError::UserInactive => AuthError::UserInactive,
            TokenValidationError::InternalError => AuthError::InternalError,
        }
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let raw_token = extract_token_from_header(auth_header)?.ok_or(AuthError::MissingAuth)?;
        let validated = validate_token(state.store.as_ref(), &raw_token)?;

        Ok(RequireUser {
            token: validated.token,
            user: validated.user,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct CenterParam {
    center_id: Option<String>,
}

impl FromRequestParts<Arc<AppState>> for RequestScope {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser { mut token, user } = RequireUser::from_request_parts(parts, state).await?;

        let param = Query::<CenterParam>::try_from_uri(&parts.uri)
            .map(|Query(p)| p)
            .unwrap_or_default();

        let session = SessionState {
            current_center_id: token.session_center_id.clone(),
        };

        let resolver = TenantResolver::new(state.store.as_ref());
        let resolution = resolver
            .resolve_scope(&user, &session, CenterOverride::from_param(param.center_id.as_deref()))
            .map_err(|e| {
                tracing::error!(user_id = %user.id, "failed to resolve tenant scope: {e}");
                AuthError::InternalError
            })?;

        if resolution.session_changed(&session) {
            let center_id = resolution.session.current_center_id.as_deref();
            state
                .store
                .set_session_center(&token.id, center_id)
                .map_err(|_| AuthError::InternalError)?;
            token.session_center_id = resolution.session.current_center_id.clone();
        }

        Ok(RequestScope {
            token,
            user,
            scope: resolution.scope,
        })
    }
}
