use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::Date;

use super::dto::ContactInput;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Contact {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub birthday: Option<Date>,
    pub additional_data: Option<String>,
    #[serde(skip_serializing)]
    pub owner_id: i64,
}

/// Substring filters; both optional, conjunctive when both set.
#[derive(Debug, Default, Clone)]
pub struct ContactFilter {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Contact storage. Every method is scoped to `owner_id`; rows owned by
/// someone else behave exactly like missing rows.
#[async_trait]
pub trait ContactRepo: Send + Sync {
    async fn create(&self, owner_id: i64, input: &ContactInput) -> anyhow::Result<Contact>;
    async fn get(&self, owner_id: i64, id: i64) -> anyhow::Result<Option<Contact>>;
    async fn list(&self, owner_id: i64, skip: i64, limit: i64) -> anyhow::Result<Vec<Contact>>;
    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &ContactInput,
    ) -> anyhow::Result<Option<Contact>>;
    async fn delete(&self, owner_id: i64, id: i64) -> anyhow::Result<bool>;
    async fn search(&self, owner_id: i64, filter: &ContactFilter) -> anyhow::Result<Vec<Contact>>;
    /// Contacts that have a birthday set.
    async fn list_with_birthday(&self, owner_id: i64) -> anyhow::Result<Vec<Contact>>;
}

/// `%needle%` with LIKE wildcards in the needle escaped by `\`.
pub fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

const COLUMNS: &str =
    "id, first_name, last_name, email, phone, birthday, additional_data, owner_id";

#[derive(Clone)]
pub struct PgContactRepo {
    db: PgPool,
}

impl PgContactRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContactRepo for PgContactRepo {
    async fn create(&self, owner_id: i64, input: &ContactInput) -> anyhow::Result<Contact> {
        let sql = format!(
            r#"
            INSERT INTO contacts (first_name, last_name, email, phone, birthday, additional_data, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        );
        let contact = sqlx::query_as::<_, Contact>(&sql)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(input.birthday)
            .bind(&input.additional_data)
            .bind(owner_id)
            .fetch_one(&self.db)
            .await
            .context("insert contact")?;
        Ok(contact)
    }

    async fn get(&self, owner_id: i64, id: i64) -> anyhow::Result<Option<Contact>> {
        let sql = format!("SELECT {COLUMNS} FROM contacts WHERE id = $1 AND owner_id = $2");
        let contact = sqlx::query_as::<_, Contact>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.db)
            .await
            .context("get contact")?;
        Ok(contact)
    }

    async fn list(&self, owner_id: i64, skip: i64, limit: i64) -> anyhow::Result<Vec<Contact>> {
        let sql = format!(
            r#"
            SELECT {COLUMNS}
            FROM contacts
            WHERE owner_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, Contact>(&sql)
            .bind(owner_id)
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.db)
            .await
            .context("list contacts")?;
        Ok(rows)
    }

    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &ContactInput,
    ) -> anyhow::Result<Option<Contact>> {
        let sql = format!(
            r#"
            UPDATE contacts
               SET first_name = $3, last_name = $4, email = $5, phone = $6,
                   birthday = $7, additional_data = $8
             WHERE id = $1 AND owner_id = $2
            RETURNING {COLUMNS}
            "#
        );
        let contact = sqlx::query_as::<_, Contact>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(input.birthday)
            .bind(&input.additional_data)
            .fetch_optional(&self.db)
            .await
            .context("update contact")?;
        Ok(contact)
    }

    async fn delete(&self, owner_id: i64, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM contacts WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.db)
            .await
            .context("delete contact")?;
        Ok(res.rows_affected() > 0)
    }

    async fn search(&self, owner_id: i64, filter: &ContactFilter) -> anyhow::Result<Vec<Contact>> {
        let sql = format!(
            r#"
            SELECT {COLUMNS}
            FROM contacts
            WHERE owner_id = $1
              AND ($2::text IS NULL OR first_name ILIKE $2 ESCAPE '\' OR last_name ILIKE $2 ESCAPE '\')
              AND ($3::text IS NULL OR email ILIKE $3 ESCAPE '\')
            ORDER BY id
            "#
        );
        let rows = sqlx::query_as::<_, Contact>(&sql)
            .bind(owner_id)
            .bind(filter.name.as_deref().map(like_pattern))
            .bind(filter.email.as_deref().map(like_pattern))
            .fetch_all(&self.db)
            .await
            .context("search contacts")?;
        Ok(rows)
    }

    async fn list_with_birthday(&self, owner_id: i64) -> anyhow::Result<Vec<Contact>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM contacts WHERE owner_id = $1 AND birthday IS NOT NULL ORDER BY id"
        );
        let rows = sqlx::query_as::<_, Contact>(&sql)
            .bind(owner_id)
            .fetch_all(&self.db)
            .await
            .context("list contacts with birthday")?;
        Ok(rows)
    }
}
