use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use relata_types::{NewUser, User, UserChanges};

use crate::db::mapping::{Entity, UserColumn};
use crate::db::query::{self, Assignment, Query};
use crate::db::unit_of_work::atomically;
use crate::error::{StoreError, StoreResult};

pub struct UserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> UserRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a user unless one already uses the same email (compared
    /// case-insensitively). A duplicate is reported as `Conflict` and nothing
    /// is written.
    pub fn create(&self, user: &NewUser) -> StoreResult<User> {
        let email = require_email(&user.email)?;

        let created = atomically(self.conn, |conn| {
            if let Some(existing) = find_by_email(conn, &email)? {
                return Err(StoreError::Conflict(format!(
                    "email {} already belongs to user {}",
                    email, existing.id
                )));
            }

            let created = User {
                id: Uuid::new_v4(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                profile_name: user.profile_name.clone(),
                email,
            };
            conn.execute(
                "INSERT INTO users (id, first_name, last_name, profile_name, email)
                 VALUES (?, ?, ?, ?, ?)",
                (
                    created.id.to_string(),
                    &created.first_name,
                    &created.last_name,
                    &created.profile_name,
                    &created.email,
                ),
            )?;
            Ok(created)
        })?;
        tracing::info!(id = %created.id, profile = %created.profile_name, "Created user");

        Ok(created)
    }

    pub fn find_by_id(&self, id: &Uuid) -> StoreResult<Option<User>> {
        query::find(self.conn, id)
    }

    pub fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        find_by_email(self.conn, email.trim())
    }

    pub fn list_all(&self) -> StoreResult<Vec<User>> {
        query::select(self.conn, &Query::all())
    }

    pub fn select(&self, query: &Query<User>) -> StoreResult<Vec<User>> {
        query::select(self.conn, query)
    }

    /// Apply `changes`. A new email goes through the same uniqueness check as create.
    pub fn update(&self, id: &Uuid, changes: &UserChanges) -> StoreResult<Option<User>> {
        let mut assignments = Vec::new();
        if let Some(first_name) = &changes.first_name {
            assignments.push(Assignment::new(UserColumn::FirstName, first_name.clone()));
        }
        if let Some(last_name) = &changes.last_name {
            assignments.push(Assignment::new(UserColumn::LastName, last_name.clone()));
        }
        if let Some(profile_name) = &changes.profile_name {
            assignments.push(Assignment::new(UserColumn::ProfileName, profile_name.clone()));
        }
        let new_email = match &changes.email {
            Some(email) => Some(require_email(email)?),
            None => None,
        };
        if let Some(email) = &new_email {
            assignments.push(Assignment::new(UserColumn::Email, email.clone()));
        }
        if assignments.is_empty() {
            return self.find_by_id(id);
        }

        atomically(self.conn, |conn| {
            if let Some(email) = &new_email {
                if let Some(existing) = find_by_email(conn, email)? {
                    if existing.id != *id {
                        return Err(StoreError::Conflict(format!(
                            "email {} already belongs to user {}",
                            email, existing.id
                        )));
                    }
                }
            }

            let updated = query::update_where(conn, &Query::<User>::by_key(id), &assignments)?;
            if updated == 0 {
                return Ok(None);
            }
            tracing::info!(id = %id, "Updated user");
            query::find(conn, id)
        })
    }

    /// Delete a user together with their posts and likes
    pub fn delete(&self, id: &Uuid) -> StoreResult<bool> {
        let deleted = atomically(self.conn, |conn| {
            query::delete_where(conn, &Query::<User>::by_key(id))
        })?;
        if deleted > 0 {
            tracing::info!(id = %id, "Deleted user");
        }
        Ok(deleted > 0)
    }
}

fn require_email(email: &str) -> StoreResult<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(StoreError::MissingField {
            entity: "user",
            field: "email",
        });
    }
    Ok(email.to_string())
}

fn find_by_email(conn: &Connection, email: &str) -> StoreResult<Option<User>> {
    let sql = format!(
        "SELECT {} FROM users WHERE email = ? COLLATE NOCASE LIMIT 1",
        User::select_list(None)
    );
    let user = conn
        .query_row(&sql, [email], |row| User::from_row(row, 0))
        .optional()?;
    Ok(user)
}
