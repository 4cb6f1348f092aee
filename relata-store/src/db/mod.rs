pub mod schema;
pub mod connection;
pub mod unit_of_work;
pub mod mapping;
pub mod query;
pub mod repositories;

pub use connection::{Database, DbConnection, DbPool};
pub use mapping::{BelongsTo, Column, Entity};
pub use query::{Assignment, Filter, GroupBy, Query};
pub use unit_of_work::UnitOfWork;
