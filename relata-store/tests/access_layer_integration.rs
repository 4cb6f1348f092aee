use anyhow::Result;
use proptest::prelude::*;

use relata_store::db::mapping::{PersonColumn, ThingColumn};
use relata_store::db::repositories::{PersonRepository, ThingRepository, UserRepository};
use relata_store::db::{query, Database, Query};
use relata_store::StoreError;
use relata_types::{Comparison, JoinKind, NewPerson, NewThing, NewUser, Person, SortDirection, Thing};

fn fresh_db() -> Result<Database> {
    relata_store::telemetry::init("relata_store=debug");
    let db = Database::in_memory()?;
    db.initialize()?;
    Ok(db)
}

/// Person then thing in one unit of work, read back by owner after commit
#[test]
fn test_person_then_thing_round_trip() -> Result<()> {
    let db = fresh_db()?;

    let (person, thing) = db.run(|uow| {
        let person = PersonRepository::new(uow).create(&NewPerson::new("Karen", Some(44)))?;
        let thing = ThingRepository::new(uow).create(&NewThing::new("Ipod", Some(10.0), person.id))?;
        Ok((person, thing))
    })?;

    let conn = db.connection()?;
    let owned = ThingRepository::new(&conn).owned_by(person.id)?;
    assert_eq!(owned, vec![thing]);
    Ok(())
}

/// A duplicate email leaves the users table untouched
#[test]
fn test_duplicate_email_leaves_store_unchanged() -> Result<()> {
    let db = fresh_db()?;
    let user = NewUser {
        first_name: "chris".to_string(),
        last_name: "Adams".to_string(),
        profile_name: "chrisadams".to_string(),
        email: "chrismichaeladams@gmail.com".to_string(),
    };

    let created = db.run(|uow| UserRepository::new(uow).create(&user))?;
    let result = db.run(|uow| UserRepository::new(uow).create(&user));
    assert!(matches!(result, Err(StoreError::Conflict(_))));

    let conn = db.connection()?;
    assert_eq!(UserRepository::new(&conn).list_all()?, vec![created]);
    Ok(())
}

/// A failing insert inside a unit of work keeps the work done before it
#[test]
fn test_failure_mid_unit_keeps_earlier_writes() -> Result<()> {
    let db = fresh_db()?;

    let uow = db.begin()?;
    let people = PersonRepository::new(&uow);
    let things = ThingRepository::new(&uow);
    let anna = people.create(&NewPerson::new("Anna", Some(38)))?;
    assert!(things.create(&NewThing::new("Ghost", None, anna.id + 100)).is_err());
    things.create(&NewThing::new("Book", Some(30.0), anna.id))?;
    uow.commit()?;

    let conn = db.connection()?;
    assert_eq!(PersonRepository::new(&conn).list_all()?.len(), 1);
    assert_eq!(ThingRepository::new(&conn).list_all()?.len(), 1);
    Ok(())
}

/// Nothing survives a unit of work that is dropped on an error path
#[test]
fn test_error_path_releases_and_discards() -> Result<()> {
    let db = fresh_db()?;

    fn failing(db: &Database) -> relata_store::StoreResult<()> {
        let uow = db.begin()?;
        PersonRepository::new(&uow).create(&NewPerson::new("Temp", None))?;
        ThingRepository::new(&uow).create(&NewThing::new("x", None, 9999))?;
        uow.commit()
    }
    assert!(matches!(failing(&db), Err(StoreError::ForeignKey(_))));

    // The pool has one in-memory connection: getting it again proves it was released
    let conn = db.connection()?;
    assert!(PersonRepository::new(&conn).list_all()?.is_empty());
    Ok(())
}

#[test]
fn test_generic_query_composition() -> Result<()> {
    let db = fresh_db()?;
    db.seed_sample_data()?;
    let conn = db.connection()?;

    let pricey_of_bob = Query::<Thing>::all()
        .filter(ThingColumn::Owner, Comparison::Eq, 2)
        .filter(ThingColumn::Value, Comparison::Ge, 100.0)
        .order_by(ThingColumn::Value, SortDirection::Asc);
    let names: Vec<_> = query::select(&conn, &pricey_of_bob)?
        .into_iter()
        .map(|t| t.description)
        .collect();
    assert_eq!(names, vec!["Keyboard", "laptop"]);

    let joined = query::join::<Person, Thing>(
        &conn,
        JoinKind::LeftOuter,
        &Query::<Person>::all().filter(PersonColumn::Name, Comparison::Eq, "Mike".to_string()),
    )?;
    assert_eq!(joined.len(), 1);
    assert!(joined[0].1.is_none());
    Ok(())
}

fn insert_people(db: &Database, ages: &[Option<i64>]) -> Result<()> {
    db.run(|uow| {
        let people = PersonRepository::new(uow);
        for (i, age) in ages.iter().enumerate() {
            people.create(&NewPerson::new(format!("p{}", i), *age))?;
        }
        Ok(())
    })?;
    Ok(())
}

proptest! {
    #[test]
    fn prop_older_than_matches_manual_filter(
        ages in prop::collection::vec(prop::option::of(0i64..120), 0..20),
        threshold in 0i64..120,
    ) {
        let db = fresh_db().unwrap();
        insert_people(&db, &ages).unwrap();

        let conn = db.connection().unwrap();
        let found: Vec<Option<i64>> = PersonRepository::new(&conn)
            .older_than(threshold)
            .unwrap()
            .into_iter()
            .map(|p| p.age)
            .collect();
        let expected: Vec<Option<i64>> = ages
            .iter()
            .copied()
            .filter(|age| matches!(age, Some(a) if *a > threshold))
            .collect();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn prop_group_sum_matches_arithmetic(
        values in prop::collection::vec((0usize..4, 0u32..10_000), 0..30),
    ) {
        let db = fresh_db().unwrap();
        let owners = db.run(|uow| {
            let people = PersonRepository::new(uow);
            let things = ThingRepository::new(uow);
            let mut owners = Vec::new();
            for i in 0..4 {
                owners.push(people.create(&NewPerson::new(format!("owner{}", i), None))?.id);
            }
            for (idx, cents) in &values {
                let value = f64::from(*cents) / 100.0;
                things.create(&NewThing::new("item", Some(value), owners[*idx]))?;
            }
            Ok(owners)
        }).unwrap();

        let conn = db.connection().unwrap();
        let things = ThingRepository::new(&conn);

        let mut expected: Vec<(i64, f64)> = Vec::new();
        for (i, owner) in owners.iter().enumerate() {
            let cents: Vec<u32> = values.iter().filter(|(idx, _)| *idx == i).map(|(_, c)| *c).collect();
            if !cents.is_empty() {
                expected.push((*owner, cents.iter().map(|c| f64::from(*c) / 100.0).sum()));
            }
        }

        let totals = things.total_value_by_owner(None).unwrap();
        prop_assert_eq!(totals.len(), expected.len());
        for (total, (owner, sum)) in totals.iter().zip(&expected) {
            prop_assert_eq!(total.owner, *owner);
            prop_assert!((total.total - sum).abs() < 1e-6);
        }

        let over_fifty: Vec<i64> = things
            .total_value_by_owner(Some(50.0))
            .unwrap()
            .into_iter()
            .map(|t| t.owner)
            .collect();
        // Leave a margin around the threshold for float summation order
        for (owner, sum) in &expected {
            if *sum > 50.0 + 1e-6 {
                prop_assert!(over_fifty.contains(owner));
            } else if *sum < 50.0 - 1e-6 {
                prop_assert!(!over_fifty.contains(owner));
            }
        }
    }
}
