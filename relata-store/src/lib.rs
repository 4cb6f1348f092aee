//! Typed SQLite access for people/things and users/posts/likes.
//!
//! Open a [`Database`], call [`Database::initialize`], then do all reads and
//! writes through repositories built on a [`UnitOfWork`]:
//!
//! ```no_run
//! use relata_store::db::{repositories::PersonRepository, Database};
//! use relata_types::NewPerson;
//!
//! # fn main() -> relata_store::error::StoreResult<()> {
//! let db = Database::new("relata.db")?;
//! db.initialize()?;
//!
//! let uow = db.begin()?;
//! let karen = PersonRepository::new(&uow).create(&NewPerson::new("Karen", Some(44)))?;
//! uow.commit()?;
//! # let _ = karen;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod telemetry;

pub use db::{Database, UnitOfWork};
pub use error::{StoreError, StoreResult};
