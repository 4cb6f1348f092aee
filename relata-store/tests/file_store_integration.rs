use anyhow::Result;
use tempfile::TempDir;

use relata_store::config::{self, Settings};
use relata_store::db::repositories::{PersonRepository, PostRepository, UserRepository};
use relata_store::db::Database;
use relata_types::{NewPerson, NewPost, NewUser};

fn file_settings(dir: &TempDir) -> config::Database {
    config::Database {
        path: dir.path().join("relata.db").to_string_lossy().into_owned(),
        pool_size: 2,
    }
}

#[test]
fn test_schema_created_on_first_open() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = file_settings(&dir);

    let db = Database::open(&settings)?;
    db.initialize()?;
    assert!(dir.path().join("relata.db").exists());

    let conn = db.connection()?;
    let tables: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('people','things','users','posts','likes')",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(tables, 5);
    Ok(())
}

#[test]
fn test_committed_data_survives_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = file_settings(&dir);

    {
        let db = Database::open(&settings)?;
        db.initialize()?;
        db.run(|uow| {
            PersonRepository::new(uow).create(&NewPerson::new("Chris", Some(48)))?;
            let user = UserRepository::new(uow).create(&NewUser {
                first_name: "chris".to_string(),
                last_name: "Adams".to_string(),
                profile_name: "chrisadams".to_string(),
                email: "chris@example.com".to_string(),
            })?;
            PostRepository::new(uow).create(&NewPost {
                user_id: user.id,
                content: "persisted".to_string(),
            })?;
            Ok(())
        })?;

        // Uncommitted work must not reach the file
        let uow = db.begin()?;
        PersonRepository::new(&uow).create(&NewPerson::new("Dropped", None))?;
        drop(uow);
    }

    let db = Database::open(&settings)?;
    db.initialize()?;
    let conn = db.connection()?;
    let names = PersonRepository::new(&conn).names()?;
    assert_eq!(names, vec!["Chris"]);

    let user = UserRepository::new(&conn)
        .find_by_email("CHRIS@example.com")?
        .expect("user persisted");
    let posts = PostRepository::new(&conn).by_user(&user.id)?;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].content, "persisted");
    Ok(())
}

#[test]
fn test_in_memory_settings_open() -> Result<()> {
    let settings = Settings::in_memory();
    let db = Database::open(&settings.database)?;
    db.initialize()?;
    db.seed_sample_data()?;
    let conn = db.connection()?;
    assert_eq!(PersonRepository::new(&conn).older_than(45)?.len(), 1);
    Ok(())
}
