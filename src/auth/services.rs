use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};

use super::claims::TokenKind;
use super::dto::TokenPair;
use super::password::{hash_password, verify_password};
use super::repo::User;
use crate::error::AppError;
use crate::images::services::{ext_from_mime, upload_avatar, UploadItem};
use crate::mailer::OutgoingMail;
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".into())
}

fn credentials_rejected() -> AppError {
    AppError::Unauthorized("Could not validate credentials".into())
}

/// Creates an unverified user and mails a verification link.
/// A mail transport failure is logged, not returned.
pub async fn register(state: &AppState, email: &str, password: &str) -> Result<User, AppError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest("Password too short".into()));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(password)?;
    let user = state
        .users
        .create(&email, &hash)
        .await?
        .ok_or_else(|| AppError::Conflict("Email already registered".into()))?;
    info!(user_id = user.id, email = %user.email, "user registered");

    send_verification(state, &user).await;
    Ok(user)
}

async fn send_verification(state: &AppState, user: &User) {
    let token = match state.jwt.sign_verify(&user.email) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, user_id = user.id, "sign verification token failed");
            return;
        }
    };
    let link = format!("{}/verify/{}", state.config.base_url.trim_end_matches('/'), token);
    match state.mailer.send(OutgoingMail::verification(&user.email, &link)).await {
        Ok(()) => info!(user_id = user.id, "verification email sent"),
        Err(e) => error!(error = ?e, user_id = user.id, "verification email failed"),
    }
}

pub async fn login(state: &AppState, email: &str, password: &str) -> Result<TokenPair, AppError> {
    let email = normalize_email(email);

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid_credentials());
    };

    if !verify_password(password, &user.hashed_password)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(invalid_credentials());
    }

    let access_token = state.jwt.sign_access(&user.email).map_err(anyhow::Error::from)?;
    let refresh_token = state.jwt.sign_refresh(&user.email).map_err(anyhow::Error::from)?;
    info!(user_id = user.id, "user logged in");
    Ok(TokenPair::bearer(access_token, refresh_token))
}

/// New access token for a valid refresh token. The refresh token is echoed, not rotated.
pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<TokenPair, AppError> {
    let claims = state
        .jwt
        .verify_kind(refresh_token, TokenKind::Refresh)
        .map_err(|_| AppError::Unauthorized("Invalid refresh token".into()))?;

    let access_token = state.jwt.sign_access(&claims.sub).map_err(anyhow::Error::from)?;
    Ok(TokenPair::bearer(access_token, refresh_token.to_string()))
}

/// Marks the token's subject verified. An unknown subject is a silent no-op.
pub async fn verify_email(state: &AppState, token: &str) -> Result<(), AppError> {
    let claims = state
        .jwt
        .verify_kind(token, TokenKind::Verify)
        .map_err(|_| AppError::BadRequest("Invalid verification token".into()))?;

    if state.users.mark_verified(&claims.sub).await? {
        info!(email = %claims.sub, "email verified");
    } else {
        warn!(email = %claims.sub, "verification token for unknown user");
    }
    Ok(())
}

/// Validates an access token and loads its user.
pub async fn resolve_identity(state: &AppState, token: &str) -> Result<User, AppError> {
    let claims = state.jwt.verify_kind(token, TokenKind::Access).map_err(|_| {
        warn!("invalid or expired token");
        credentials_rejected()
    })?;

    state.users.find_by_email(&claims.sub).await?.ok_or_else(|| {
        warn!(email = %claims.sub, "token subject no longer exists");
        credentials_rejected()
    })
}

/// Uploads the image, stores its URL, then drops the previous avatar object.
pub async fn update_avatar(
    state: &AppState,
    user: &User,
    image: UploadItem,
) -> Result<User, AppError> {
    if ext_from_mime(&image.content_type).is_none() {
        return Err(AppError::BadRequest(format!(
            "Unsupported image type: {}",
            image.content_type
        )));
    }
    if image.body.is_empty() {
        return Err(AppError::BadRequest("Empty file".into()));
    }

    let url = upload_avatar(state.storage.as_ref(), user.id, image).await?;
    let updated = state.users.set_avatar(user.id, &url).await?;
    info!(user_id = user.id, url = %url, "avatar updated");

    if let Some(old_key) = user.avatar_url.as_deref().and_then(|u| state.storage.key_for_url(u)) {
        if let Err(e) = state.storage.delete_object(&old_key).await {
            warn!(error = ?e, key = %old_key, "failed to delete previous avatar");
        }
    }
    Ok(updated)
}
