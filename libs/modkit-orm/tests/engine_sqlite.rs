#![allow(clippy::unwrap_used, clippy::expect_used)]
#![cfg(all(feature = "sqlite", feature = "macros"))]

mod common;

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use common::{Address, Country, Counter, Person, sqlite_db, sqlite_db_with};
use modkit_orm::{
    Criteria, CriteriaArg, DbError, Dialect, Entity, Model, Order, StandingData, Updatable, Where,
};
use rust_decimal::Decimal;
use tracing_test::traced_test;

static LOCALE_READY: AtomicBool = AtomicBool::new(false);

/// Standing data whose `locale` row cannot be saved until `LOCALE_READY` is set.
#[derive(Debug, Default, Clone, Entity)]
#[entity(table = "Setting", updatable, standing_data)]
struct Setting {
    #[orm(model)]
    model: Model,
    #[orm(column = "Name", "size:32")]
    name: String,
}

impl Updatable for Setting {
    fn update_command(&self, dialect: &dyn Dialect) -> modkit_orm::Result<String> {
        if self.name == "locale" && !LOCALE_READY.load(Ordering::SeqCst) {
            return Err(DbError::Schema("locale is not configured".to_owned()));
        }
        Ok(format!(
            "INSERT INTO {} ({}, {}, {}, {}) VALUES ('{}', '2024-01-01 00:00:00.000', \
             '2024-01-01 00:00:00.000', '{}')",
            dialect.identity(Self::TABLE),
            dialect.identity("ID"),
            dialect.identity("CreateDate"),
            dialect.identity("LastUpdate"),
            dialect.identity("Name"),
            uuid::Uuid::new_v4(),
            self.name,
        ))
    }
}

impl StandingData for Setting {
    fn standing_data() -> Vec<Self> {
        ["theme", "locale"]
            .into_iter()
            .map(|name| Setting {
                name: name.to_owned(),
                ..Default::default()
            })
            .collect()
    }
}

#[tokio::test]
async fn save_then_fetch_by_id_round_trips() {
    let (db, _dir) = sqlite_db().await;

    let mut alex = Person {
        nickname: Some("Al".to_owned()),
        active: true,
        balance: Decimal::from_str("19.99").unwrap(),
        address: Address {
            street: "O'Connell St".to_owned(),
            zip: None,
        },
        scratch: "not persisted".to_owned(),
        ..Person::new("Alex", 30)
    };
    db.save(&mut alex).await.unwrap();

    let id = alex.model.id().expect("id assigned on insert").to_owned();
    assert!(!alex.model.is_deleted());

    let loaded: Person = db.first(id.as_str()).await.unwrap();
    assert_eq!(loaded.model, alex.model);
    assert_eq!(loaded.name, "Alex");
    assert_eq!(loaded.age, 30);
    assert_eq!(loaded.nickname.as_deref(), Some("Al"));
    assert!(loaded.active);
    assert_eq!(loaded.balance, Decimal::from_str("19.99").unwrap());
    assert_eq!(loaded.address, alex.address);
    assert!(loaded.scratch.is_empty());
}

#[tokio::test]
async fn update_rewrites_columns_and_last_update() {
    let (db, _dir) = sqlite_db().await;

    let mut p = Person {
        nickname: Some("Sam".to_owned()),
        ..Person::new("Samantha", 41)
    };
    db.save(&mut p).await.unwrap();
    let created = p.model.create_date;
    let id = p.model.id.clone();

    p.age = 42;
    p.nickname = None;
    db.save(&mut p).await.unwrap();
    assert_eq!(p.model.id, id);
    assert_eq!(p.model.create_date, created);
    assert!(p.model.last_update >= created);

    let loaded: Person = db.first(Where::equal("Name", "Samantha")).await.unwrap();
    assert_eq!(loaded.age, 42);
    assert_eq!(loaded.nickname, None);
    assert_eq!(loaded.model.create_date, created);
    assert_eq!(db.count::<Person>(()).await.unwrap(), 1);
}

#[tokio::test]
async fn first_without_match_is_no_results() {
    let (db, _dir) = sqlite_db().await;

    let err = db
        .first::<Person>(Where::equal("Name", "Nobody"))
        .await
        .unwrap_err();
    assert!(err.is_no_results(), "unexpected error: {err}");
}

#[tokio::test]
async fn remove_many_soft_deletes_matching_rows() {
    let (db, _dir) = sqlite_db().await;
    db.save(&mut Person::new("Thirty", 30)).await.unwrap();
    db.save(&mut Person::new("Forty", 40)).await.unwrap();

    let removed = db.remove_many::<Person>(Where::equal("Age", 30)).await.unwrap();
    assert_eq!(removed, 1);

    let live: Vec<Person> = db.fetch(Where::equal("Age", 30)).await.unwrap();
    assert!(live.is_empty());

    let all: Vec<Person> = db
        .fetch(Criteria::new().with_filter(Where::equal("Age", 30)).with_deleted(true))
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].model.is_deleted());

    assert_eq!(db.count::<Person>(()).await.unwrap(), 1);
    assert_eq!(db.remove_many::<Person>(Where::equal("Age", 30)).await.unwrap(), 0);
}

#[tokio::test]
async fn remove_many_hard_deletes_when_deletable() {
    let (db, _dir) = sqlite_db_with(|cfg| cfg.deletable = true).await;
    db.save(&mut Person::new("Thirty", 30)).await.unwrap();
    db.save(&mut Person::new("Forty", 40)).await.unwrap();

    assert_eq!(db.remove_many::<Person>(Where::less("Age", 35)).await.unwrap(), 1);

    let all: Vec<Person> = db.fetch(Criteria::new().with_deleted(true)).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Forty");
}

#[tokio::test]
async fn remove_soft_deletes_one_entity() {
    let (db, _dir) = sqlite_db().await;

    let mut unsaved = Person::new("Ghost", 1);
    db.remove(&mut unsaved).await.unwrap();
    assert!(!unsaved.model.is_deleted());

    let mut p = Person::new("Gone", 50);
    db.save(&mut p).await.unwrap();
    db.remove(&mut p).await.unwrap();
    assert!(p.model.is_deleted());

    assert_eq!(db.count::<Person>(()).await.unwrap(), 0);
    let kept: Person = db
        .first(Criteria::new().with_deleted(true))
        .await
        .unwrap();
    assert_eq!(kept.model.delete_date, p.model.delete_date);
}

#[tokio::test]
async fn remove_hard_deletes_when_deletable() {
    let (db, _dir) = sqlite_db_with(|cfg| cfg.deletable = true).await;

    let mut p = Person::new("Gone", 50);
    db.save(&mut p).await.unwrap();
    db.remove(&mut p).await.unwrap();
    assert!(!p.model.is_deleted());

    let all: Vec<Person> = db.fetch(Criteria::new().with_deleted(true)).await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn count_reports_missing_table_and_bad_criteria() {
    let (db, _dir) = sqlite_db().await;

    assert_eq!(db.count::<Person>(()).await.unwrap(), 0);
    assert_eq!(
        db.count::<Person>(CriteriaArg::dynamic(&42_u8)).await.unwrap(),
        -1
    );

    for (name, age) in [("A", 20), ("B", 25), ("C", 30)] {
        db.save(&mut Person::new(name, age)).await.unwrap();
    }
    assert_eq!(db.count::<Person>(()).await.unwrap(), 3);
    assert_eq!(db.count::<Person>(Where::greater("Age", 21)).await.unwrap(), 2);
    assert_eq!(db.count::<Person>("\"Age\" >= 25").await.unwrap(), 2);
}

#[tokio::test]
async fn fetch_orders_and_pages() {
    let (db, _dir) = sqlite_db().await;
    for (name, age) in [("A", 20), ("B", 25), ("C", 30), ("D", 35)] {
        db.save(&mut Person::new(name, age)).await.unwrap();
    }

    let page: Vec<Person> = db
        .fetch(
            Criteria::new()
                .with_filter(Where::not_equal("Name", "D"))
                .with_order(Order::desc("Age"))
                .with_limit(2)
                .with_offset(1),
        )
        .await
        .unwrap();
    let names: Vec<_> = page.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["B", "A"]);

    let ordered: Vec<Person> = db.fetch(Order::asc("Name")).await.unwrap();
    assert_eq!(ordered.len(), 4);
    assert_eq!(ordered[0].name, "A");

    let between: Vec<Person> = db.fetch(Where::between("Age", 30, 20)).await.unwrap();
    assert_eq!(between.len(), 3);

    let none: Vec<Person> = db.fetch(Where::in_list("Age", Vec::<i32>::new())).await.unwrap();
    assert_eq!(none.len(), 4);
}

#[tokio::test]
async fn fetch_with_offset_and_no_limit() {
    let (db, _dir) = sqlite_db().await;
    for (name, age) in [("A", 20), ("B", 25), ("C", 30)] {
        db.save(&mut Person::new(name, age)).await.unwrap();
    }

    let rest: Vec<Person> = db
        .fetch(Criteria::new().with_order(Order::asc("Age")).with_offset(1))
        .await
        .unwrap();
    let names: Vec<_> = rest.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["B", "C"]);
}

#[tokio::test]
async fn invalid_criteria_is_rejected() {
    let (db, _dir) = sqlite_db().await;

    let err = db
        .fetch::<Person>(CriteriaArg::dynamic(&1.5_f64))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidCriteria(_)));
}

#[tokio::test]
async fn refresh_reloads_in_place() {
    let (db, _dir) = sqlite_db().await;

    let mut fresh = Person::new("New", 1);
    assert!(matches!(
        db.refresh(&mut fresh).await,
        Err(DbError::NoId("Person"))
    ));

    let mut p = Person::new("Kim", 20);
    db.save(&mut p).await.unwrap();
    let affected = db
        .raw_execute("UPDATE \"Person\" SET \"Age\" = 21")
        .await
        .unwrap();
    assert_eq!(affected, 1);

    p.scratch = "dropped on refresh".to_owned();
    db.refresh(&mut p).await.unwrap();
    assert_eq!(p.age, 21);
    assert!(p.scratch.is_empty());
}

#[tokio::test]
async fn table_is_created_once_per_engine() {
    let (db, _dir) = sqlite_db().await;

    let none: Vec<Person> = db.fetch(()).await.unwrap();
    assert!(none.is_empty());
    let indexes = db
        .raw_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = 'Person'")
        .await
        .unwrap();
    // ID, CreateDate, LastUpdate and the `key` annotated Name
    assert_eq!(indexes.as_deref(), Some("4"));

    db.raw_execute("DROP TABLE \"Person\"").await.unwrap();
    let err = db.fetch::<Person>(()).await.unwrap_err();
    assert!(matches!(err, DbError::Sqlx(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn standing_data_and_restore_hook() {
    let (db, _dir) = sqlite_db().await;

    let countries: Vec<Country> = db.fetch(Order::asc("Code")).await.unwrap();
    let summaries: Vec<_> = countries.iter().map(|c| c.summary.as_str()).collect();
    assert_eq!(summaries, ["Germany (DE)", "France (FR)"]);

    let fr: Country = db.first(Where::equal("Code", "FR")).await.unwrap();
    assert_eq!(fr.summary, "France (FR)");

    assert_eq!(db.count::<Country>(()).await.unwrap(), 2);
}

#[tokio::test]
async fn failed_standing_data_is_rolled_back_and_retried() {
    let (db, _dir) = sqlite_db().await;

    let err = db.fetch::<Setting>(()).await.unwrap_err();
    assert!(
        matches!(err, DbError::Schema(ref m) if m.contains("cannot seed table Setting")),
        "unexpected error: {err}"
    );
    let stored = db.raw_scalar("SELECT COUNT(*) FROM \"Setting\"").await.unwrap();
    assert_eq!(stored.as_deref(), Some("0"));

    LOCALE_READY.store(true, Ordering::SeqCst);
    let settings: Vec<Setting> = db.fetch(Order::asc("Name")).await.unwrap();
    let names: Vec<_> = settings.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["locale", "theme"]);
}

#[tokio::test]
async fn updatable_entities_run_their_own_command() {
    let (db, _dir) = sqlite_db().await;
    let _: Vec<Counter> = db.fetch(()).await.unwrap();
    db.raw_execute(
        "INSERT INTO \"Counter\" (\"ID\", \"CreateDate\", \"LastUpdate\", \"Label\", \"Hits\") \
         VALUES ('7d1c4a56-2f1e-4f0f-8a51-3d6f5e0b9c21', '2024-01-01 00:00:00.000', \
         '2024-01-01 00:00:00.000', 'home', 0)",
    )
    .await
    .unwrap();

    let mut counter = Counter {
        label: "home".to_owned(),
        ..Default::default()
    };
    db.save(&mut counter).await.unwrap();
    db.save(&mut counter).await.unwrap();
    assert!(counter.model.is_new());

    let stored: Counter = db.first("7d1c4a56-2f1e-4f0f-8a51-3d6f5e0b9c21").await.unwrap();
    assert_eq!(stored.hits, 2);
    assert_eq!(Counter::TABLE, "Counter");
}

#[tokio::test]
async fn raw_select_returns_named_cells() {
    let (db, _dir) = sqlite_db().await;
    db.save(&mut Person::new("Lee", 33)).await.unwrap();

    let rows = db
        .raw_select("SELECT \"Name\", \"Nickname\", \"Age\" FROM \"Person\"")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some("Lee"));
    assert!(rows[0].contains("Nickname"));
    assert_eq!(rows[0].get("Nickname"), None);
    assert_eq!(rows[0].get("AGE"), Some("33"));

    assert_eq!(db.raw_scalar("SELECT 1 WHERE 0").await.unwrap(), None);
}

#[tokio::test]
async fn statements_run_without_transactions_when_disabled() {
    let (db, _dir) = sqlite_db_with(|cfg| cfg.disable_transactions = true).await;
    assert!(db.config().disable_transactions);

    let mut p = Person::new("Solo", 60);
    db.save(&mut p).await.unwrap();
    let loaded: Person = db.first(Where::equal("Age", 60)).await.unwrap();
    assert_eq!(loaded.model.id, p.model.id);
    db.close().await;
}

#[tokio::test]
#[traced_test]
async fn table_creation_and_statements_are_logged() {
    let (db, _dir) = sqlite_db().await;
    db.save(&mut Person::new("Logged", 18)).await.unwrap();

    assert!(logs_contain("Created table"));
    assert!(logs_contain("INSERT INTO \"Person\""));
}
