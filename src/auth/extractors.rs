use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::{repo::User, services};
use crate::{error::AppError, state::AppState};

/// The caller resolved from `Authorization: Bearer <access token>`.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        let token = bearer_token(auth)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        let user = services::resolve_identity(state, token).await?;
        Ok(CurrentUser(user))
    }
}

/// Token part of a `Bearer` header value; the scheme is case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn parses_bearer_scheme() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("BEARER  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer "), None);
    }

    async fn extract(header: Option<&str>) -> Result<CurrentUser, AppError> {
        let state = AppState::fake();
        let mut req = Request::builder().uri("/contacts/");
        if let Some(h) = header {
            req = req.header("authorization", h);
        }
        let (mut parts, _) = req.body(()).unwrap().into_parts();
        CurrentUser::from_request_parts(&mut parts, &state).await
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        assert!(matches!(extract(None).await, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        assert!(matches!(
            extract(Some("Bearer not-a-token")).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            extract(Some("Token abc")).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
