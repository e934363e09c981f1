#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]

use modkit_orm::{Database, Dialect, Entity, Fields, Model, OrmConfig, Restorable, StandingData, Updatable};
use rust_decimal::Decimal;
use tempfile::TempDir;

/// An on-disk `SQLite` database living as long as the returned directory.
pub async fn sqlite_db() -> (Database, TempDir) {
    sqlite_db_with(|_| {}).await
}

/// Like [`sqlite_db`], with a chance to adjust the configuration first.
pub async fn sqlite_db_with(adjust: impl FnOnce(&mut OrmConfig)) -> (Database, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut cfg = OrmConfig {
        engine: "sqlite".to_owned(),
        database: Some(dir.path().join("orm.db").to_string_lossy().into_owned()),
        ..Default::default()
    };
    adjust(&mut cfg);
    let db = Database::connect(&cfg).await.expect("connect sqlite");
    (db, dir)
}

#[derive(Debug, Default, Clone, PartialEq, Fields)]
pub struct Address {
    #[orm(column = "Street", "size:128")]
    pub street: String,
    #[orm(column = "Zip")]
    pub zip: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "Person")]
pub struct Person {
    #[orm(model)]
    pub model: Model,
    #[orm(column = "Name", "size:64,key:true")]
    pub name: String,
    #[orm(column = "Age")]
    pub age: u32,
    #[orm(column = "Nickname")]
    pub nickname: Option<String>,
    #[orm(column = "Active")]
    pub active: bool,
    #[orm(column = "Balance", "size:10,2")]
    pub balance: Decimal,
    #[orm(embed)]
    pub address: Address,
    pub scratch: String,
}

impl Person {
    pub fn new(name: &str, age: u32) -> Self {
        Self {
            name: name.to_owned(),
            age,
            ..Default::default()
        }
    }
}

/// Seeded on table creation; `summary` is rebuilt after every load.
#[derive(Debug, Default, Clone, Entity)]
#[entity(table = "Country", restorable, standing_data)]
pub struct Country {
    #[orm(model)]
    pub model: Model,
    #[orm(column = "Code", "size:2")]
    pub code: String,
    #[orm(column = "Name", "size:64")]
    pub name: String,
    pub summary: String,
}

impl Restorable for Country {
    fn restore(&mut self, _dialect: &dyn Dialect) {
        self.summary = format!("{} ({})", self.name, self.code);
    }
}

impl StandingData for Country {
    fn standing_data() -> Vec<Self> {
        [("DE", "Germany"), ("FR", "France")]
            .into_iter()
            .map(|(code, name)| Country {
                code: code.to_owned(),
                name: name.to_owned(),
                ..Default::default()
            })
            .collect()
    }
}

/// Saves through its own statement.
#[derive(Debug, Default, Clone, Entity)]
#[entity(table = "Counter", updatable)]
pub struct Counter {
    #[orm(model)]
    pub model: Model,
    #[orm(column = "Label", "size:32")]
    pub label: String,
    #[orm(column = "Hits")]
    pub hits: i64,
}

impl Updatable for Counter {
    fn update_command(&self, dialect: &dyn Dialect) -> modkit_orm::Result<String> {
        Ok(format!(
            "UPDATE {} SET {} = {} + 1 WHERE {} = '{}'",
            dialect.identity(Self::TABLE),
            dialect.identity("Hits"),
            dialect.identity("Hits"),
            dialect.identity("Label"),
            self.label.replace('\'', "''"),
        ))
    }
}
