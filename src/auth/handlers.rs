use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{instrument, warn};

use super::dto::{
    AvatarResponse, LoginRequest, MessageResponse, PublicUser, RefreshRequest, RegisterRequest,
    TokenPair,
};
use super::extractors::CurrentUser;
use super::services;
use crate::{
    error::AppError,
    extract::{ApiJson, ApiPath},
    images::services::UploadItem,
    state::AppState,
};

pub const AVATAR_MAX_BYTES: usize = 5 * 1024 * 1024;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register/", post(register))
        .route("/login/", post(login))
        .route("/token/refresh/", post(refresh))
        .route("/verify/:token", get(verify_email))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me/", get(get_me))
        .route(
            "/users/avatar/",
            put(update_avatar).layer(DefaultBodyLimit::max(AVATAR_MAX_BYTES)),
        )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = services::register(&state, &payload.email, &payload.password).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    Ok(Json(services::login(&state, &payload.email, &payload.password).await?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    Ok(Json(services::refresh(&state, &payload.refresh_token).await?))
}

#[instrument(skip(state, token))]
pub async fn verify_email(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Result<Json<MessageResponse>, AppError> {
    services::verify_email(&state, &token).await?;
    Ok(Json(MessageResponse {
        msg: "Email verified successfully".into(),
    }))
}

#[instrument(skip(user), fields(user_id = user.id))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user.into())
}

/// PUT /users/avatar/ (multipart, field `file`)
#[instrument(skip(state, user, mp), fields(user_id = user.id))]
pub async fn update_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut mp: Multipart,
) -> Result<Json<AvatarResponse>, AppError> {
    let mut image = None;
    loop {
        let field = match mp.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "bad multipart body");
                return Err(e.into());
            }
        };
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field.bytes().await.map_err(|e| {
            warn!(error = %e, "failed to read avatar file");
            AppError::from(e)
        })?;
        image = Some(UploadItem { body, content_type });
        break;
    }
    let image = image.ok_or_else(|| AppError::BadRequest("file is required".into()))?;

    let updated = services::update_avatar(&state, &user, image).await?;
    let url = updated.avatar_url.unwrap_or_default();
    Ok(Json(AvatarResponse {
        msg: "Avatar updated".into(),
        url,
    }))
}
