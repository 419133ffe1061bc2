use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{BirthdayQuery, ContactInput, DeletedResponse, Pagination, SearchQuery};
use super::repo::Contact;
use super::services;
use crate::{
    auth::extractors::CurrentUser,
    error::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
};

pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/contacts/", get(list_contacts).post(create_contact))
        .route("/contacts/search/", get(search_contacts))
        .route("/contacts/birthday/soon/", get(upcoming_birthdays))
        .route(
            "/contacts/:id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
}

#[instrument(skip(state, user, body), fields(owner_id = user.id))]
pub async fn create_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<ContactInput>,
) -> Result<impl IntoResponse, AppError> {
    let contact = services::create(state.contacts.as_ref(), &user, body).await?;
    let location = HeaderValue::from_str(&format!("/contacts/{}", contact.id))
        .map_err(anyhow::Error::from)?;
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(contact)))
}

#[instrument(skip(state, user), fields(owner_id = user.id))]
pub async fn list_contacts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(p): ApiQuery<Pagination>,
) -> Result<Json<Vec<Contact>>, AppError> {
    let contacts = services::list(state.contacts.as_ref(), &user, p.skip, p.limit).await?;
    Ok(Json(contacts))
}

#[instrument(skip(state, user), fields(owner_id = user.id))]
pub async fn get_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Contact>, AppError> {
    Ok(Json(services::get(state.contacts.as_ref(), &user, id).await?))
}

#[instrument(skip(state, user, body), fields(owner_id = user.id))]
pub async fn update_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ContactInput>,
) -> Result<Json<Contact>, AppError> {
    Ok(Json(services::update(state.contacts.as_ref(), &user, id, body).await?))
}

#[instrument(skip(state, user), fields(owner_id = user.id))]
pub async fn delete_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<DeletedResponse>, AppError> {
    services::delete(state.contacts.as_ref(), &user, id).await?;
    Ok(Json(DeletedResponse {
        detail: "Contact deleted",
    }))
}

#[instrument(skip(state, user), fields(owner_id = user.id))]
pub async fn search_contacts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(q): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<Contact>>, AppError> {
    let contacts = services::search(state.contacts.as_ref(), &user, q.name, q.email).await?;
    Ok(Json(contacts))
}

#[instrument(skip(state, user), fields(owner_id = user.id))]
pub async fn upcoming_birthdays(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(q): ApiQuery<BirthdayQuery>,
) -> Result<Json<Vec<Contact>>, AppError> {
    let contacts = services::upcoming_birthdays(state.contacts.as_ref(), &user, q.days).await?;
    Ok(Json(contacts))
}
