use axum::{extract::FromRequestParts, http::request::Parts};

use crate::db;
use crate::errors::AppError;
use crate::models::User;
use crate::AppState;

/// Identity of the request. Authentication itself lives in front of this
/// service; we only resolve the forwarded `X-User-Id` header against the
/// users table.
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.0.is_admin {
            Ok(())
        } else {
            Err(AppError::Permission)
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok())
            .ok_or(AppError::Unauthorized)?;

        let user = db::get_user(&state.pool, user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser(user))
    }
}
