use rusqlite::Connection;

use relata_types::{Aggregate, Comparison, NewThing, OwnerTotal, Person, Thing, ThingChanges};

use crate::db::mapping::ThingColumn;
use crate::db::query::{self, Assignment, GroupBy, Query};
use crate::db::unit_of_work::atomically;
use crate::error::{StoreError, StoreResult};

pub struct ThingRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ThingRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a thing for an existing owner
    pub fn create(&self, thing: &NewThing) -> StoreResult<Thing> {
        require_description(&thing.description)?;

        let id = atomically(self.conn, |conn| {
            conn.execute(
                "INSERT INTO things (description, value, owner) VALUES (?, ?, ?)",
                (&thing.description, thing.value, thing.owner),
            )?;
            Ok(conn.last_insert_rowid())
        })
        .map_err(|e| unknown_owner(e, thing.owner))?;
        tracing::info!(id, owner = thing.owner, "Created thing");

        Ok(Thing {
            id,
            description: thing.description.clone(),
            value: thing.value,
            owner: thing.owner,
        })
    }

    pub fn find_by_id(&self, id: i64) -> StoreResult<Option<Thing>> {
        query::find(self.conn, &id)
    }

    pub fn list_all(&self) -> StoreResult<Vec<Thing>> {
        query::select(self.conn, &Query::all())
    }

    pub fn select(&self, query: &Query<Thing>) -> StoreResult<Vec<Thing>> {
        query::select(self.conn, query)
    }

    /// Things with a value strictly below `value`
    pub fn cheaper_than(&self, value: f64) -> StoreResult<Vec<Thing>> {
        query::select(
            self.conn,
            &Query::<Thing>::all().filter(ThingColumn::Value, Comparison::Lt, value),
        )
    }

    pub fn owned_by(&self, owner: i64) -> StoreResult<Vec<Thing>> {
        query::select(
            self.conn,
            &Query::<Thing>::all().filter(ThingColumn::Owner, Comparison::Eq, owner),
        )
    }

    pub fn owner_of(&self, thing: &Thing) -> StoreResult<Option<Person>> {
        query::find(self.conn, &thing.owner)
    }

    /// Sum of thing values per owner, optionally keeping only owners whose
    /// total is strictly above `min_total`
    pub fn total_value_by_owner(&self, min_total: Option<f64>) -> StoreResult<Vec<OwnerTotal>> {
        let group_by = GroupBy {
            group: ThingColumn::Owner,
            aggregate: Aggregate::Sum,
            target: ThingColumn::Value,
            having: min_total.map(|threshold| (Comparison::Gt, threshold)),
        };
        let rows = query::group_aggregate::<Thing, i64>(self.conn, &group_by)?;
        Ok(rows
            .into_iter()
            .map(|(owner, total)| OwnerTotal { owner, total })
            .collect())
    }

    pub fn update(&self, id: i64, changes: &ThingChanges) -> StoreResult<Option<Thing>> {
        let mut assignments = Vec::new();
        if let Some(description) = &changes.description {
            require_description(description)?;
            assignments.push(Assignment::new(ThingColumn::Description, description.clone()));
        }
        if let Some(value) = changes.value {
            assignments.push(Assignment::new(ThingColumn::Value, value));
        }
        if let Some(owner) = changes.owner {
            assignments.push(Assignment::new(ThingColumn::Owner, owner));
        }
        if assignments.is_empty() {
            return self.find_by_id(id);
        }

        atomically(self.conn, |conn| {
            let updated = query::update_where(conn, &Query::<Thing>::by_key(&id), &assignments)?;
            if updated == 0 {
                return Ok(None);
            }
            tracing::info!(id, "Updated thing");
            query::find(conn, &id)
        })
        .map_err(|e| match changes.owner {
            Some(owner) => unknown_owner(e, owner),
            None => e,
        })
    }

    pub fn delete(&self, id: i64) -> StoreResult<bool> {
        let deleted = atomically(self.conn, |conn| {
            query::delete_where(conn, &Query::<Thing>::by_key(&id))
        })?;
        if deleted > 0 {
            tracing::info!(id, "Deleted thing");
        }
        Ok(deleted > 0)
    }
}

fn require_description(description: &str) -> StoreResult<()> {
    if description.trim().is_empty() {
        return Err(StoreError::MissingField {
            entity: "thing",
            field: "description",
        });
    }
    Ok(())
}

fn unknown_owner(err: StoreError, owner: i64) -> StoreError {
    match err {
        StoreError::ForeignKey(_) => StoreError::ForeignKey(format!("no person with id {}", owner)),
        other => other,
    }
}
