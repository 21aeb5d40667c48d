use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::access::{self, Actor, Capability};
use crate::database::models::Person;
use crate::sensitive::{self, PersonView};
use crate::services::{AuditService, ServiceError};

#[derive(Debug, Clone, Deserialize)]
pub struct NewPerson {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub focus: String,
    #[serde(default)]
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonUpdate {
    pub name: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub focus: Option<String>,
    pub bio: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
}

#[derive(Clone)]
pub struct PersonService {
    pool: SqlitePool,
    audit: AuditService,
}

impl PersonService {
    pub fn new(pool: SqlitePool, audit: AuditService) -> Self {
        Self { pool, audit }
    }

    /// Everyone the actor may see, projected. Holders of `people.view.all`
    /// see the whole archive; a self-scoped viewer sees only their own
    /// record; anyone else is forbidden.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<PersonView>, ServiceError> {
        if access::has_capability(actor, Capability::PeopleViewAll) {
            let persons = sqlx::query_as::<_, Person>("SELECT * FROM people ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
            return Ok(persons.iter().map(|p| sensitive::project_person(p, actor)).collect());
        }

        if access::has_capability(actor, Capability::PeopleViewSelf) {
            if let Some(person_id) = actor.linked_person_id {
                let person = self.person_or_404(person_id).await?;
                return Ok(vec![sensitive::project_person(&person, actor)]);
            }
        }

        Err(ServiceError::Forbidden)
    }

    pub async fn get(&self, actor: &Actor, person_id: i64) -> Result<PersonView, ServiceError> {
        if !access::can_view_person(actor, person_id) {
            return Err(ServiceError::Forbidden);
        }
        let person = self.person_or_404(person_id).await?;
        Ok(sensitive::project_person(&person, actor))
    }

    pub async fn create(&self, actor: &Actor, new: NewPerson) -> Result<PersonView, ServiceError> {
        if !access::has_capability(actor, Capability::PeopleCreate) {
            return Err(ServiceError::Forbidden);
        }
        if new.name.trim().is_empty() {
            return Err(ServiceError::Validation(vec!["name must not be blank".into()]));
        }

        let mut conn = self.pool.acquire().await?;
        let person = insert_person_conn(&mut conn, &new).await?;
        drop(conn);

        info!(person_id = person.id, "created person");
        self.audit
            .record(Some(actor.account_id), "person.create", "person", Some(person.id), &person.name)
            .await;
        Ok(sensitive::project_person(&person, actor))
    }

    pub async fn update(
        &self,
        actor: &Actor,
        person_id: i64,
        update: PersonUpdate,
    ) -> Result<PersonView, ServiceError> {
        if !access::can_edit_person(actor, person_id) {
            return Err(ServiceError::Forbidden);
        }
        let current = self.person_or_404(person_id).await?;

        let mut conn = self.pool.acquire().await?;
        let person = update_person_conn(&mut conn, &current, &update).await?;
        drop(conn);

        self.audit
            .record(Some(actor.account_id), "person.update", "person", Some(person_id), &person.name)
            .await;
        Ok(sensitive::project_person(&person, actor))
    }

    /// Delete a person: their dimension rows go with them, linked accounts
    /// are detached (not deleted). One transaction.
    pub async fn delete(&self, actor: &Actor, person_id: i64) -> Result<(), ServiceError> {
        if !access::has_capability(actor, Capability::PeopleDelete) {
            return Err(ServiceError::Forbidden);
        }
        let person = self.person_or_404(person_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM dimension_records WHERE person_id = ?")
            .bind(person_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE accounts SET linked_person_id = NULL, updated_at = ? WHERE linked_person_id = ?")
            .bind(Utc::now())
            .bind(person_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM people WHERE id = ?")
            .bind(person_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(person_id, "deleted person");
        self.audit
            .record(Some(actor.account_id), "person.delete", "person", Some(person_id), &person.name)
            .await;
        Ok(())
    }

    pub async fn person_or_404(&self, person_id: i64) -> Result<Person, ServiceError> {
        sqlx::query_as::<_, Person>("SELECT * FROM people WHERE id = ?")
            .bind(person_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("person {} not found", person_id)))
    }
}

/// Insert on a caller-provided connection so the importer can create persons
/// inside its batch transaction.
pub async fn insert_person_conn(
    conn: &mut SqliteConnection,
    new: &NewPerson,
) -> Result<Person, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Person>(
        r#"
        INSERT INTO people (name, title, department, focus, bio, birth_date, phone, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new.name.trim())
    .bind(&new.title)
    .bind(&new.department)
    .bind(&new.focus)
    .bind(&new.bio)
    .bind(new.birth_date)
    .bind(&new.phone)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

/// Merge-and-write on a caller-provided connection; shared with the importer.
pub async fn update_person_conn(
    conn: &mut SqliteConnection,
    current: &Person,
    update: &PersonUpdate,
) -> Result<Person, sqlx::Error> {
    sqlx::query_as::<_, Person>(
        r#"
        UPDATE people
        SET name = ?, title = ?, department = ?, focus = ?, bio = ?,
            birth_date = ?, phone = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(update.name.as_deref().unwrap_or(&current.name))
    .bind(update.title.as_deref().unwrap_or(&current.title))
    .bind(update.department.as_deref().unwrap_or(&current.department))
    .bind(update.focus.as_deref().unwrap_or(&current.focus))
    .bind(update.bio.as_deref().unwrap_or(&current.bio))
    .bind(update.birth_date.or(current.birth_date))
    .bind(update.phone.as_deref().or(current.phone.as_deref()))
    .bind(Utc::now())
    .bind(current.id)
    .fetch_one(&mut *conn)
    .await
}
