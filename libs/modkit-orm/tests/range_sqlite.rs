#![allow(clippy::unwrap_used, clippy::expect_used)]
#![cfg(all(feature = "sqlite", feature = "macros"))]

mod common;

use common::{Country, Person, sqlite_db, sqlite_db_with};
use futures::{StreamExt, TryStreamExt};
use modkit_orm::{Criteria, CriteriaArg, DbError, Order, Where};

#[tokio::test]
async fn range_streams_every_match() {
    let (db, _dir) = sqlite_db().await;
    for (name, age) in [("A", 20), ("B", 25), ("C", 30)] {
        db.save(&mut Person::new(name, age)).await.unwrap();
    }

    let people: Vec<Person> = db
        .range(Order::desc("Age"))
        .try_collect()
        .await
        .unwrap();
    let names: Vec<_> = people.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["C", "B", "A"]);

    let older: Vec<Person> = db
        .range::<Person>(Where::greater("Age", 21))
        .try_collect()
        .await
        .unwrap();
    assert_eq!(older.len(), 2);
}

#[tokio::test]
async fn range_can_be_abandoned_early() {
    let (db, _dir) = sqlite_db().await;
    for i in 0..10 {
        db.save(&mut Person::new(&format!("P{i}"), i)).await.unwrap();
    }

    let mut stream = db.range::<Person>(Order::asc("Age"));
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.age, 0);
    drop(stream);

    assert_eq!(db.count::<Person>(()).await.unwrap(), 10);
}

#[tokio::test]
async fn range_runs_restore_hooks_and_creates_tables() {
    let (db, _dir) = sqlite_db().await;

    let countries: Vec<Country> = db.range(()).try_collect().await.unwrap();
    assert_eq!(countries.len(), 2);
    assert!(countries.iter().all(|c| !c.summary.is_empty()));
}

#[tokio::test]
async fn range_yields_errors_as_items() {
    let (db, _dir) = sqlite_db().await;

    let mut stream = db.range::<Person>(CriteriaArg::dynamic(&7_i16));
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, DbError::InvalidCriteria(_)));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn range_yields_rows_read_before_a_failing_row() {
    let (db, _dir) = sqlite_db().await;
    for i in 0..10 {
        db.save(&mut Person::new(&format!("P{i}"), i)).await.unwrap();
    }

    // abs() of the smallest 64-bit integer overflows, so the scan fails on the tenth row.
    let criteria = Criteria::new().with_raw_filter(
        "CASE WHEN \"Age\" = 9 THEN abs(-9223372036854775807 - 1) ELSE 1 END = 1",
    );
    let items: Vec<_> = db.range::<Person>(criteria).collect().await;

    assert_eq!(items.len(), 10);
    let ages: Vec<u32> = items[..9]
        .iter()
        .map(|item| item.as_ref().unwrap().age)
        .collect();
    assert_eq!(ages, (0..9).collect::<Vec<_>>());
    assert!(matches!(items[9], Err(DbError::Sqlx(_))));
}

#[tokio::test]
async fn range_streams_without_transactions() {
    let (db, _dir) = sqlite_db_with(|cfg| cfg.disable_transactions = true).await;
    for (name, age) in [("A", 1), ("B", 2)] {
        db.save(&mut Person::new(name, age)).await.unwrap();
    }

    let people: Vec<Person> = db.range(Order::asc("Name")).try_collect().await.unwrap();
    let names: Vec<_> = people.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["A", "B"]);
}

#[tokio::test]
async fn range_pages_with_offset_only() {
    let (db, _dir) = sqlite_db().await;
    for i in 0..5 {
        db.save(&mut Person::new(&format!("P{i}"), i)).await.unwrap();
    }

    let rest: Vec<Person> = db
        .range(Criteria::new().with_order(Order::asc("Age")).with_offset(3))
        .try_collect()
        .await
        .unwrap();
    let ages: Vec<_> = rest.iter().map(|p| p.age).collect();
    assert_eq!(ages, [3, 4]);
}
