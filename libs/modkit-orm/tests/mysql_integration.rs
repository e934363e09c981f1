#![allow(clippy::unwrap_used, clippy::expect_used)]
#![cfg(all(feature = "mysql", feature = "macros", feature = "integration"))]

mod common;

use std::time::Duration;

use anyhow::Result;
use common::{Country, Person};
use modkit_orm::{Criteria, Database, Dialect, DialectKind, Order, OrmConfig, Where};
use testcontainers::{ContainerAsync, ContainerRequest, ImageExt, runners::AsyncRunner};
use testcontainers_modules::mysql::Mysql;

struct MySqlUnderTest {
    db: Database,
    _container: ContainerAsync<Mysql>,
}

async fn bring_up_mysql() -> Result<MySqlUnderTest> {
    let container = ContainerRequest::from(Mysql::default())
        .with_env_var("MYSQL_ROOT_PASSWORD", "root")
        .with_env_var("MYSQL_USER", "user")
        .with_env_var("MYSQL_PASSWORD", "pass")
        .with_env_var("MYSQL_DATABASE", "app")
        .start()
        .await?;
    let port = container.get_host_port_ipv4(3306).await?;
    wait_for_tcp("127.0.0.1", port, Duration::from_secs(30)).await?;

    let cfg = OrmConfig {
        engine: "mysql".to_owned(),
        host: Some(format!("127.0.0.1:{port}")),
        database: Some("app".to_owned()),
        user: Some("user".to_owned()),
        password: Some("pass".to_owned()),
        ..Default::default()
    };
    let db = Database::connect(&cfg).await?;
    Ok(MySqlUnderTest {
        db,
        _container: container,
    })
}

async fn wait_for_tcp(host: &str, port: u16, timeout: Duration) -> Result<()> {
    use tokio::{
        net::TcpStream,
        time::{Instant, sleep},
    };
    let deadline = Instant::now() + timeout;
    loop {
        if TcpStream::connect((host, port)).await.is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            anyhow::bail!("Timeout waiting for {host}:{port}");
        }
        sleep(Duration::from_millis(200)).await;
    }
}

#[tokio::test]
async fn mysql_entity_lifecycle() -> Result<()> {
    let dut = bring_up_mysql().await?;
    let db = &dut.db;
    assert_eq!(Dialect::kind(db.dialect()), DialectKind::MySql);

    for (name, age) in [("Ann", 20), ("Bob", 30), ("Cid", 40)] {
        db.save(&mut Person::new(name, age)).await?;
    }

    let page: Vec<Person> = db
        .fetch(
            Criteria::new()
                .with_order(Order::desc("Age"))
                .with_limit(2)
                .with_offset(1),
        )
        .await?;
    let names: Vec<_> = page.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Bob", "Ann"]);

    let mut bob: Person = db.first(Where::equal("Name", "Bob")).await?;
    bob.nickname = Some("Bobby".to_owned());
    db.save(&mut bob).await?;
    db.refresh(&mut bob).await?;
    assert_eq!(bob.nickname.as_deref(), Some("Bobby"));

    assert_eq!(db.remove_many::<Person>(Where::less("Age", 35)).await?, 2);
    assert_eq!(db.count::<Person>(()).await?, 1);

    let countries: Vec<Country> = db.fetch(Order::asc("Code")).await?;
    assert_eq!(countries.len(), 2);
    Ok(())
}

#[tokio::test]
async fn mysql_explicit_transaction_rolls_back() -> Result<()> {
    let dut = bring_up_mysql().await?;
    let db = &dut.db;
    db.save(&mut Person::new("Keep", 1)).await?;

    let mut tx = db.begin().await?;
    db.raw_execute_in(&mut tx, "UPDATE `Person` SET `Age` = 99").await?;
    tx.rollback().await?;

    let kept: Person = db.first(Where::equal("Name", "Keep")).await?;
    assert_eq!(kept.age, 1);
    Ok(())
}
