use rusqlite::Connection;

use relata_types::{Comparison, JoinKind, NewPerson, Person, PersonChanges, PersonThing, Thing};

use crate::db::mapping::{PersonColumn, ThingColumn};
use crate::db::query::{self, Assignment, Query};
use crate::db::unit_of_work::atomically;
use crate::error::{StoreError, StoreResult};

pub struct PersonRepository<'a> {
    conn: &'a Connection,
}

impl<'a> PersonRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a person and return it with its generated id
    pub fn create(&self, person: &NewPerson) -> StoreResult<Person> {
        require_name(&person.name)?;

        let id = atomically(self.conn, |conn| {
            conn.execute(
                "INSERT INTO people (name, age) VALUES (?, ?)",
                (&person.name, person.age),
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        tracing::info!(id, name = %person.name, "Created person");

        Ok(Person {
            id,
            name: person.name.clone(),
            age: person.age,
        })
    }

    pub fn find_by_id(&self, id: i64) -> StoreResult<Option<Person>> {
        query::find(self.conn, &id)
    }

    /// Every person, in storage order
    pub fn list_all(&self) -> StoreResult<Vec<Person>> {
        query::select(self.conn, &Query::all())
    }

    pub fn select(&self, query: &Query<Person>) -> StoreResult<Vec<Person>> {
        query::select(self.conn, query)
    }

    /// Just the names, in storage order
    pub fn names(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM people")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// People strictly older than `age`. People without an age never match.
    pub fn older_than(&self, age: i64) -> StoreResult<Vec<Person>> {
        query::select(
            self.conn,
            &Query::<Person>::all().filter(PersonColumn::Age, Comparison::Gt, age),
        )
    }

    /// Things owned by `person_id`
    pub fn things(&self, person_id: i64) -> StoreResult<Vec<Thing>> {
        query::select(
            self.conn,
            &Query::<Thing>::all().filter(ThingColumn::Owner, Comparison::Eq, person_id),
        )
    }

    /// People joined to their things on `things.owner = people.id`
    pub fn with_things(&self, kind: JoinKind) -> StoreResult<Vec<PersonThing>> {
        let rows = query::join::<Person, Thing>(self.conn, kind, &Query::all())?;
        Ok(rows
            .into_iter()
            .map(|(person, thing)| PersonThing {
                person_id: person.id,
                name: person.name,
                thing_id: thing.as_ref().map(|t| t.id),
                value: thing.as_ref().and_then(|t| t.value),
                description: thing.map(|t| t.description),
            })
            .collect())
    }

    /// Apply `changes` and return the updated person, or `None` if `id` is unknown
    pub fn update(&self, id: i64, changes: &PersonChanges) -> StoreResult<Option<Person>> {
        let mut assignments = Vec::new();
        if let Some(name) = &changes.name {
            require_name(name)?;
            assignments.push(Assignment::new(PersonColumn::Name, name.clone()));
        }
        if let Some(age) = changes.age {
            assignments.push(Assignment::new(PersonColumn::Age, age));
        }
        if assignments.is_empty() {
            return self.find_by_id(id);
        }

        atomically(self.conn, |conn| {
            let updated = query::update_where(conn, &Query::<Person>::by_key(&id), &assignments)?;
            if updated == 0 {
                return Ok(None);
            }
            tracing::info!(id, "Updated person");
            query::find(conn, &id)
        })
    }

    /// Delete a person. Fails with `Restricted` while they still own things.
    pub fn delete(&self, id: i64) -> StoreResult<bool> {
        let deleted = atomically(self.conn, |conn| {
            let owned = query::count(
                conn,
                &Query::<Thing>::all().filter(ThingColumn::Owner, Comparison::Eq, id),
            )?;
            if owned > 0 {
                return Err(StoreError::Restricted(format!(
                    "person {} still owns {} things",
                    id, owned
                )));
            }
            query::delete_where(conn, &Query::<Person>::by_key(&id))
        })?;

        if deleted > 0 {
            tracing::info!(id, "Deleted person");
        }
        Ok(deleted > 0)
    }
}

fn require_name(name: &str) -> StoreResult<()> {
    if name.trim().is_empty() {
        return Err(StoreError::MissingField {
            entity: "person",
            field: "name",
        });
    }
    Ok(())
}
