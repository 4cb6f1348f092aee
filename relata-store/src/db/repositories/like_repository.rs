use rusqlite::types::Type;
use rusqlite::Connection;
use uuid::Uuid;

use relata_types::{Aggregate, Comparison, Like, NewLike, PostLikeCount};

use crate::db::mapping::{format_timestamp, now, LikeColumn};
use crate::db::query::{self, GroupBy, Query};
use crate::db::unit_of_work::atomically;
use crate::error::{StoreError, StoreResult};

pub struct LikeRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LikeRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Record that a user likes a post. Liking the same post twice is a `Conflict`.
    pub fn create(&self, like: &NewLike) -> StoreResult<Like> {
        let created = Like {
            id: Uuid::new_v4(),
            user_id: like.user_id,
            post_id: like.post_id,
            created_at: now(),
        };
        atomically(self.conn, |conn| {
            conn.execute(
                "INSERT INTO likes (id, user_id, post_id, created_at) VALUES (?, ?, ?, ?)",
                (
                    created.id.to_string(),
                    created.user_id.to_string(),
                    created.post_id.to_string(),
                    format_timestamp(&created.created_at),
                ),
            )?;
            Ok(())
        })
        .map_err(|e| match e {
            StoreError::Conflict(_) => StoreError::Conflict(format!(
                "user {} already likes post {}",
                like.user_id, like.post_id
            )),
            StoreError::ForeignKey(_) => StoreError::ForeignKey(format!(
                "user {} or post {} does not exist",
                like.user_id, like.post_id
            )),
            other => other,
        })?;
        tracing::info!(post_id = %created.post_id, user_id = %created.user_id, "Created like");

        Ok(created)
    }

    pub fn find_by_id(&self, id: &Uuid) -> StoreResult<Option<Like>> {
        query::find(self.conn, id)
    }

    pub fn list_all(&self) -> StoreResult<Vec<Like>> {
        query::select(self.conn, &Query::all())
    }

    pub fn for_post(&self, post_id: &Uuid) -> StoreResult<Vec<Like>> {
        query::select(
            self.conn,
            &Query::<Like>::all().filter(LikeColumn::PostId, Comparison::Eq, post_id.to_string()),
        )
    }

    pub fn by_user(&self, user_id: &Uuid) -> StoreResult<Vec<Like>> {
        query::select(
            self.conn,
            &Query::<Like>::all().filter(LikeColumn::UserId, Comparison::Eq, user_id.to_string()),
        )
    }

    /// Number of likes per liked post. Posts without likes are absent.
    pub fn count_by_post(&self) -> StoreResult<Vec<PostLikeCount>> {
        let group_by = GroupBy {
            group: LikeColumn::PostId,
            aggregate: Aggregate::Count,
            target: LikeColumn::Id,
            having: None,
        };
        query::group_aggregate::<Like, String>(self.conn, &group_by)?
            .into_iter()
            .map(|(post_id, likes)| {
                let post_id = Uuid::parse_str(&post_id).map_err(|e| {
                    StoreError::from(rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
                })?;
                Ok(PostLikeCount {
                    post_id,
                    likes: likes as i64,
                })
            })
            .collect()
    }

    /// Remove a user's like from a post; returns whether one existed
    pub fn unlike(&self, user_id: &Uuid, post_id: &Uuid) -> StoreResult<bool> {
        let deleted = atomically(self.conn, |conn| {
            query::delete_where(
                conn,
                &Query::<Like>::all()
                    .filter(LikeColumn::UserId, Comparison::Eq, user_id.to_string())
                    .filter(LikeColumn::PostId, Comparison::Eq, post_id.to_string()),
            )
        })?;
        Ok(deleted > 0)
    }

    pub fn delete(&self, id: &Uuid) -> StoreResult<bool> {
        let deleted = atomically(self.conn, |conn| {
            query::delete_where(conn, &Query::<Like>::by_key(id))
        })?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{PostRepository, UserRepository};
    use crate::db::Database;
    use anyhow::Result;
    use relata_types::{NewPost, NewUser, Post, User};

    struct Fixture {
        db: Database,
        alice: User,
        bob: User,
        post: Post,
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            first_name: name.to_string(),
            last_name: "Tester".to_string(),
            profile_name: name.to_lowercase(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    fn setup() -> Result<Fixture> {
        let db = Database::in_memory()?;
        db.initialize()?;
        let (alice, bob, post) = db.run(|uow| {
            let users = UserRepository::new(uow);
            let alice = users.create(&new_user("Alice"))?;
            let bob = users.create(&new_user("Bob"))?;
            let post = PostRepository::new(uow).create(&NewPost {
                user_id: alice.id,
                content: "first!".to_string(),
            })?;
            Ok((alice, bob, post))
        })?;
        Ok(Fixture { db, alice, bob, post })
    }

    #[test]
    fn test_like_and_count() -> Result<()> {
        let f = setup()?;
        let uow = f.db.begin()?;
        let likes = LikeRepository::new(&uow);

        likes.create(&NewLike { user_id: f.alice.id, post_id: f.post.id })?;
        likes.create(&NewLike { user_id: f.bob.id, post_id: f.post.id })?;

        assert_eq!(likes.for_post(&f.post.id)?.len(), 2);
        assert_eq!(likes.by_user(&f.bob.id)?.len(), 1);
        assert_eq!(
            likes.count_by_post()?,
            vec![PostLikeCount { post_id: f.post.id, likes: 2 }]
        );
        Ok(())
    }

    #[test]
    fn test_double_like_is_conflict() -> Result<()> {
        let f = setup()?;
        let uow = f.db.begin()?;
        let likes = LikeRepository::new(&uow);

        likes.create(&NewLike { user_id: f.bob.id, post_id: f.post.id })?;
        let err = likes
            .create(&NewLike { user_id: f.bob.id, post_id: f.post.id })
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(likes.list_all()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_like_requires_existing_post() -> Result<()> {
        let f = setup()?;
        let uow = f.db.begin()?;
        let err = LikeRepository::new(&uow)
            .create(&NewLike { user_id: f.bob.id, post_id: Uuid::new_v4() })
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey(_)));
        Ok(())
    }

    #[test]
    fn test_unlike() -> Result<()> {
        let f = setup()?;
        let uow = f.db.begin()?;
        let likes = LikeRepository::new(&uow);

        likes.create(&NewLike { user_id: f.bob.id, post_id: f.post.id })?;
        assert!(likes.unlike(&f.bob.id, &f.post.id)?);
        assert!(!likes.unlike(&f.bob.id, &f.post.id)?);
        assert!(likes.count_by_post()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_deletes_cascade_to_likes() -> Result<()> {
        let f = setup()?;
        let uow = f.db.begin()?;
        let likes = LikeRepository::new(&uow);
        likes.create(&NewLike { user_id: f.bob.id, post_id: f.post.id })?;
        likes.create(&NewLike { user_id: f.alice.id, post_id: f.post.id })?;

        // Removing Bob drops his like only
        assert!(UserRepository::new(&uow).delete(&f.bob.id)?);
        assert_eq!(likes.list_all()?.len(), 1);

        // Removing the post drops the rest
        assert!(PostRepository::new(&uow).delete(&f.post.id)?);
        assert!(likes.list_all()?.is_empty());
        Ok(())
    }
}
