use time::{Date, OffsetDateTime};
use tracing::{debug, info};

use super::birthdays;
use super::dto::ContactInput;
use super::repo::{Contact, ContactFilter, ContactRepo};
use crate::auth::repo::User;
use crate::error::AppError;

pub const MAX_PAGE: i64 = 100;

fn not_found() -> AppError {
    AppError::NotFound("Contact not found".into())
}

pub async fn create(
    repo: &dyn ContactRepo,
    owner: &User,
    input: ContactInput,
) -> Result<Contact, AppError> {
    let contact = repo.create(owner.id, &input).await?;
    info!(owner_id = owner.id, contact_id = contact.id, "contact created");
    Ok(contact)
}

pub async fn get(repo: &dyn ContactRepo, owner: &User, id: i64) -> Result<Contact, AppError> {
    repo.get(owner.id, id).await?.ok_or_else(not_found)
}

pub async fn list(
    repo: &dyn ContactRepo,
    owner: &User,
    skip: i64,
    limit: i64,
) -> Result<Vec<Contact>, AppError> {
    if skip < 0 {
        return Err(AppError::BadRequest("skip must not be negative".into()));
    }
    if !(1..=MAX_PAGE).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_PAGE}"
        )));
    }
    Ok(repo.list(owner.id, skip, limit).await?)
}

pub async fn update(
    repo: &dyn ContactRepo,
    owner: &User,
    id: i64,
    input: ContactInput,
) -> Result<Contact, AppError> {
    let contact = repo.update(owner.id, id, &input).await?.ok_or_else(not_found)?;
    info!(owner_id = owner.id, contact_id = id, "contact updated");
    Ok(contact)
}

pub async fn delete(repo: &dyn ContactRepo, owner: &User, id: i64) -> Result<(), AppError> {
    if !repo.delete(owner.id, id).await? {
        return Err(not_found());
    }
    info!(owner_id = owner.id, contact_id = id, "contact deleted");
    Ok(())
}

pub async fn search(
    repo: &dyn ContactRepo,
    owner: &User,
    name: Option<String>,
    email: Option<String>,
) -> Result<Vec<Contact>, AppError> {
    let filter = ContactFilter {
        name: name.filter(|s| !s.trim().is_empty()),
        email: email.filter(|s| !s.trim().is_empty()),
    };
    debug!(?filter, "contact search");
    Ok(repo.search(owner.id, &filter).await?)
}

/// Contacts whose next birthday falls within `[today, today + days]`,
/// soonest first.
pub async fn upcoming_birthdays(
    repo: &dyn ContactRepo,
    owner: &User,
    days: i64,
) -> Result<Vec<Contact>, AppError> {
    upcoming_birthdays_from(repo, owner, days, OffsetDateTime::now_utc().date()).await
}

pub(crate) async fn upcoming_birthdays_from(
    repo: &dyn ContactRepo,
    owner: &User,
    days: i64,
    today: Date,
) -> Result<Vec<Contact>, AppError> {
    if days < 0 {
        return Err(AppError::BadRequest("days must not be negative".into()));
    }
    let mut upcoming: Vec<(i64, Contact)> = repo
        .list_with_birthday(owner.id)
        .await?
        .into_iter()
        .filter_map(|c| {
            let birthday = c.birthday?;
            if !birthdays::is_upcoming(birthday, today, days) {
                return None;
            }
            Some((birthdays::days_until(birthday, today)?, c))
        })
        .collect();
    upcoming.sort_by_key(|(n, c)| (*n, c.id));
    Ok(upcoming.into_iter().map(|(_, c)| c).collect())
}
