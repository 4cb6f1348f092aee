use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// RFC3339 strings on the wire, matching how timestamps are stored
mod datetime_format {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<DateTime<Utc>>().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// People and the things they own
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub age: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPerson {
    pub name: String,
    #[serde(default)]
    pub age: Option<i64>,
}

impl NewPerson {
    pub fn new(name: impl Into<String>, age: Option<i64>) -> Self {
        Self {
            name: name.into(),
            age,
        }
    }
}

/// Partial update for a person. `age: Some(None)` clears the age.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<Option<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    pub id: i64,
    pub description: String,
    #[serde(default)]
    pub value: Option<f64>,
    /// Owning person's id
    pub owner: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewThing {
    pub description: String,
    #[serde(default)]
    pub value: Option<f64>,
    pub owner: i64,
}

impl NewThing {
    pub fn new(description: impl Into<String>, value: Option<f64>, owner: i64) -> Self {
        Self {
            description: description.into(),
            value,
            owner,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThingChanges {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub value: Option<Option<f64>>,
    /// Move the thing to another owner
    #[serde(default)]
    pub owner: Option<i64>,
}

/// One row of the people/things join. Thing columns are empty for people
/// without things under a left outer join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonThing {
    pub person_id: i64,
    pub name: String,
    pub thing_id: Option<i64>,
    pub description: Option<String>,
    pub value: Option<f64>,
}

/// Sum of thing values per owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerTotal {
    pub owner: i64,
    pub total: f64,
}

// ---------------------------------------------------------------------------
// Social: users, posts, likes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub profile_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub profile_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserChanges {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub profile_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub user_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostChanges {
    #[serde(default)]
    pub content: Option<String>,
}

/// A post together with its author's profile name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredPost {
    pub post: Post,
    pub profile_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLike {
    pub user_id: Uuid,
    pub post_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLikeCount {
    pub post_id: Uuid,
    pub likes: i64,
}
