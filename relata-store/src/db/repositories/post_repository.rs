use rusqlite::Connection;
use uuid::Uuid;

use relata_types::{AuthoredPost, Comparison, JoinKind, NewPost, Post, PostChanges, SortDirection, User};

use crate::db::mapping::{format_timestamp, now, PostColumn};
use crate::db::query::{self, Assignment, Query};
use crate::db::unit_of_work::atomically;
use crate::error::{StoreError, StoreResult};

pub struct PostRepository<'a> {
    conn: &'a Connection,
}

impl<'a> PostRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a post for an existing user
    pub fn create(&self, post: &NewPost) -> StoreResult<Post> {
        require_content(&post.content)?;

        let created = Post {
            id: Uuid::new_v4(),
            user_id: post.user_id,
            content: post.content.clone(),
            created_at: now(),
        };
        atomically(self.conn, |conn| {
            conn.execute(
                "INSERT INTO posts (id, user_id, content, created_at) VALUES (?, ?, ?, ?)",
                (
                    created.id.to_string(),
                    created.user_id.to_string(),
                    &created.content,
                    format_timestamp(&created.created_at),
                ),
            )?;
            Ok(())
        })
        .map_err(|e| match e {
            StoreError::ForeignKey(_) => {
                StoreError::ForeignKey(format!("no user with id {}", post.user_id))
            }
            other => other,
        })?;
        tracing::info!(id = %created.id, user_id = %created.user_id, "Created post");

        Ok(created)
    }

    pub fn find_by_id(&self, id: &Uuid) -> StoreResult<Option<Post>> {
        query::find(self.conn, id)
    }

    pub fn list_all(&self) -> StoreResult<Vec<Post>> {
        query::select(self.conn, &Query::all())
    }

    /// Newest first
    pub fn recent(&self, limit: u32) -> StoreResult<Vec<Post>> {
        query::select(
            self.conn,
            &Query::<Post>::all()
                .order_by(PostColumn::CreatedAt, SortDirection::Desc)
                .limit(limit),
        )
    }

    /// A user's posts, oldest first
    pub fn by_user(&self, user_id: &Uuid) -> StoreResult<Vec<Post>> {
        query::select(
            self.conn,
            &Query::<Post>::all()
                .filter(PostColumn::UserId, Comparison::Eq, user_id.to_string())
                .order_by(PostColumn::CreatedAt, SortDirection::Asc),
        )
    }

    /// Every post paired with its author's profile name
    pub fn with_authors(&self) -> StoreResult<Vec<AuthoredPost>> {
        let rows = query::join::<User, Post>(self.conn, JoinKind::Inner, &Query::all())?;
        Ok(rows
            .into_iter()
            .filter_map(|(user, post)| {
                post.map(|post| AuthoredPost {
                    post,
                    profile_name: user.profile_name,
                })
            })
            .collect())
    }

    pub fn update(&self, id: &Uuid, changes: &PostChanges) -> StoreResult<Option<Post>> {
        let content = match &changes.content {
            Some(content) => {
                require_content(content)?;
                content.clone()
            }
            None => return self.find_by_id(id),
        };

        atomically(self.conn, |conn| {
            let updated = query::update_where(
                conn,
                &Query::<Post>::by_key(id),
                &[Assignment::new(PostColumn::Content, content)],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            tracing::info!(id = %id, "Updated post");
            query::find(conn, id)
        })
    }

    /// Delete a post and its likes
    pub fn delete(&self, id: &Uuid) -> StoreResult<bool> {
        let deleted = atomically(self.conn, |conn| {
            query::delete_where(conn, &Query::<Post>::by_key(id))
        })?;
        if deleted > 0 {
            tracing::info!(id = %id, "Deleted post");
        }
        Ok(deleted > 0)
    }
}

fn require_content(content: &str) -> StoreResult<()> {
    if content.trim().is_empty() {
        return Err(StoreError::MissingField {
            entity: "post",
            field: "content",
        });
    }
    Ok(())
}
