//! JWT authentication middleware.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::api::AppState;
use crate::config::BEARER_TOKEN_PREFIX;
use crate::domain::User;
use crate::errors::AppError;

/// Authenticated user, re-loaded from the database on every request
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub is_admin: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// JWT authentication middleware.
///
/// Validates the bearer token, loads its user and injects both the
/// `CurrentUser` and the full `User` into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix(BEARER_TOKEN_PREFIX)
        .ok_or(AppError::Unauthorized)?;

    let user = state.auth_service.authenticate(token).await?;

    request.extensions_mut().insert(CurrentUser::from(&user));
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Require admin rights, returns Forbidden error otherwise.
pub fn require_admin(user: &CurrentUser) -> Result<(), AppError> {
    if user.is_admin {
        Ok(())
    } else {
        Err(AppError::forbidden("Administrator access required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_admin() {
        let admin = CurrentUser {
            id: 1,
            username: "admin".to_string(),
            is_admin: true,
        };
        let user = CurrentUser {
            id: 2,
            username: "bob".to_string(),
            is_admin: false,
        };
        assert!(require_admin(&admin).is_ok());
        assert!(matches!(require_admin(&user), Err(AppError::Forbidden(_))));
    }
}
