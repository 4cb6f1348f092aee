//! Table descriptions for the record types.
//!
//! Every record type is a plain struct from `relata-types`; the [`Entity`]
//! impls here tell the query layer which table it lives in, which columns it
//! has and how to rebuild it from a row. [`BelongsTo`] names the column that
//! links a child table to its parent.

use std::fmt;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use uuid::Uuid;

use relata_types::{Like, Person, Post, Thing, User};

pub trait Column: Copy + PartialEq + fmt::Debug + 'static {
    fn name(&self) -> &'static str;
}

pub trait Entity: Sized {
    type Column: Column;
    type Key;

    /// Table name
    const TABLE: &'static str;
    /// Singular name used in error messages
    const NAME: &'static str;
    /// All columns in row order. The primary key must come first.
    const COLUMNS: &'static [Self::Column];
    const PRIMARY_KEY: Self::Column;

    fn key_value(key: &Self::Key) -> Value;

    /// Build the record from `COLUMNS.len()` columns starting at `offset`
    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self>;

    /// Comma separated column list, optionally qualified with a table alias
    fn select_list(alias: Option<&str>) -> String {
        Self::COLUMNS
            .iter()
            .map(|c| match alias {
                Some(alias) => format!("{}.{}", alias, c.name()),
                None => c.name().to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A child entity whose `FOREIGN_KEY` column references the parent's primary key
pub trait BelongsTo<P: Entity>: Entity {
    const FOREIGN_KEY: Self::Column;
}

macro_rules! columns {
    ($name:ident { $($variant:ident => $sql:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl Column for $name {
            fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $sql),+
                }
            }
        }
    };
}

columns!(PersonColumn { Id => "id", Name => "name", Age => "age" });
columns!(ThingColumn { Id => "id", Description => "description", Value => "value", Owner => "owner" });
columns!(UserColumn {
    Id => "id",
    FirstName => "first_name",
    LastName => "last_name",
    ProfileName => "profile_name",
    Email => "email",
});
columns!(PostColumn { Id => "id", UserId => "user_id", Content => "content", CreatedAt => "created_at" });
columns!(LikeColumn { Id => "id", UserId => "user_id", PostId => "post_id", CreatedAt => "created_at" });

impl Entity for Person {
    type Column = PersonColumn;
    type Key = i64;

    const TABLE: &'static str = "people";
    const NAME: &'static str = "person";
    const COLUMNS: &'static [PersonColumn] = &[PersonColumn::Id, PersonColumn::Name, PersonColumn::Age];
    const PRIMARY_KEY: PersonColumn = PersonColumn::Id;

    fn key_value(key: &i64) -> Value {
        Value::Integer(*key)
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Person {
            id: row.get(offset)?,
            name: row.get(offset + 1)?,
            age: row.get(offset + 2)?,
        })
    }
}

impl Entity for Thing {
    type Column = ThingColumn;
    type Key = i64;

    const TABLE: &'static str = "things";
    const NAME: &'static str = "thing";
    const COLUMNS: &'static [ThingColumn] = &[
        ThingColumn::Id,
        ThingColumn::Description,
        ThingColumn::Value,
        ThingColumn::Owner,
    ];
    const PRIMARY_KEY: ThingColumn = ThingColumn::Id;

    fn key_value(key: &i64) -> Value {
        Value::Integer(*key)
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Thing {
            id: row.get(offset)?,
            description: row.get(offset + 1)?,
            value: row.get(offset + 2)?,
            owner: row.get(offset + 3)?,
        })
    }
}

impl BelongsTo<Person> for Thing {
    const FOREIGN_KEY: ThingColumn = ThingColumn::Owner;
}

impl Entity for User {
    type Column = UserColumn;
    type Key = Uuid;

    const TABLE: &'static str = "users";
    const NAME: &'static str = "user";
    const COLUMNS: &'static [UserColumn] = &[
        UserColumn::Id,
        UserColumn::FirstName,
        UserColumn::LastName,
        UserColumn::ProfileName,
        UserColumn::Email,
    ];
    const PRIMARY_KEY: UserColumn = UserColumn::Id;

    fn key_value(key: &Uuid) -> Value {
        Value::Text(key.to_string())
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(User {
            id: uuid_at(row, offset)?,
            first_name: row.get(offset + 1)?,
            last_name: row.get(offset + 2)?,
            profile_name: row.get(offset + 3)?,
            email: row.get(offset + 4)?,
        })
    }
}

impl Entity for Post {
    type Column = PostColumn;
    type Key = Uuid;

    const TABLE: &'static str = "posts";
    const NAME: &'static str = "post";
    const COLUMNS: &'static [PostColumn] = &[
        PostColumn::Id,
        PostColumn::UserId,
        PostColumn::Content,
        PostColumn::CreatedAt,
    ];
    const PRIMARY_KEY: PostColumn = PostColumn::Id;

    fn key_value(key: &Uuid) -> Value {
        Value::Text(key.to_string())
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Post {
            id: uuid_at(row, offset)?,
            user_id: uuid_at(row, offset + 1)?,
            content: row.get(offset + 2)?,
            created_at: timestamp_at(row, offset + 3)?,
        })
    }
}

impl BelongsTo<User> for Post {
    const FOREIGN_KEY: PostColumn = PostColumn::UserId;
}

impl Entity for Like {
    type Column = LikeColumn;
    type Key = Uuid;

    const TABLE: &'static str = "likes";
    const NAME: &'static str = "like";
    const COLUMNS: &'static [LikeColumn] = &[
        LikeColumn::Id,
        LikeColumn::UserId,
        LikeColumn::PostId,
        LikeColumn::CreatedAt,
    ];
    const PRIMARY_KEY: LikeColumn = LikeColumn::Id;

    fn key_value(key: &Uuid) -> Value {
        Value::Text(key.to_string())
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Like {
            id: uuid_at(row, offset)?,
            user_id: uuid_at(row, offset + 1)?,
            post_id: uuid_at(row, offset + 2)?,
            created_at: timestamp_at(row, offset + 3)?,
        })
    }
}

impl BelongsTo<User> for Like {
    const FOREIGN_KEY: LikeColumn = LikeColumn::UserId;
}

impl BelongsTo<Post> for Like {
    const FOREIGN_KEY: LikeColumn = LikeColumn::PostId;
}

/// Read a TEXT column holding a UUID
pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a TEXT column holding an RFC3339 timestamp
pub(crate) fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    raw.parse::<DateTime<Utc>>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Current time at the precision timestamps are stored with
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC3339 so stored timestamps sort as text
pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_is_first_column() {
        assert_eq!(Person::COLUMNS[0], Person::PRIMARY_KEY);
        assert_eq!(Thing::COLUMNS[0], Thing::PRIMARY_KEY);
        assert_eq!(User::COLUMNS[0], User::PRIMARY_KEY);
        assert_eq!(Post::COLUMNS[0], Post::PRIMARY_KEY);
        assert_eq!(Like::COLUMNS[0], Like::PRIMARY_KEY);
    }

    #[test]
    fn test_select_list() {
        assert_eq!(Person::select_list(None), "id, name, age");
        assert_eq!(
            Thing::select_list(Some("t")),
            "t.id, t.description, t.value, t.owner"
        );
    }

    #[test]
    fn test_timestamps_sort_as_text() {
        let earlier: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        let later: DateTime<Utc> = "2024-01-01T00:00:00.5Z".parse().unwrap();
        assert!(format_timestamp(&earlier) < format_timestamp(&later));
        assert_eq!(format_timestamp(&earlier), "2024-01-01T00:00:00.000000Z");
    }
}
