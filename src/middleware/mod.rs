use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

use crate::error::ServiceError;
use crate::models::Principal;
use crate::repository::Repository;
use crate::AppState;

/// Bearer token extractor. Any authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Principal);

/// Same as [`AuthUser`], but only for admins.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub Principal);

impl<R: Repository> FromRequestParts<Arc<AppState<R>>> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<R>>,
    ) -> Result<Self, Self::Rejection> {
        // Получаем заголовок Authorization
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ServiceError::Unauthorized)?;

        let principal = state.users.tokens().verify(token)?;
        Ok(AuthUser(principal))
    }
}

impl<R: Repository> FromRequestParts<Arc<AppState<R>>> for AdminUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<R>>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
        if !principal.is_admin() {
            tracing::debug!(user_id = principal.user_id, "admin route refused");
            return Err(ServiceError::Forbidden);
        }
        Ok(AdminUser(principal))
    }
}
