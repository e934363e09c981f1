use modkit_orm::{Dialect, Entity, Model, Restorable, StandingData, Updatable};

#[derive(Default, Entity)]
#[entity(updatable, restorable, standing_data)]
struct Counter {
    #[orm(model)]
    model: Model,
    #[orm]
    hits: i64,
    label: String,
}

impl Updatable for Counter {
    fn update_command(&self, dialect: &dyn Dialect) -> modkit_orm::Result<String> {
        Ok(format!("UPDATE {} SET hits = hits + 1", dialect.identity("Counter")))
    }
}

impl Restorable for Counter {
    fn restore(&mut self, _dialect: &dyn Dialect) {
        self.label = format!("{} hits", self.hits);
    }
}

impl StandingData for Counter {
    fn standing_data() -> Vec<Self> {
        vec![Counter::default()]
    }
}

fn main() {
    assert_eq!(Counter::TABLE, "Counter");
    assert_eq!(<Counter as Entity>::standing_data().len(), 1);
    let mut c = Counter::default();
    assert!(c.as_updatable().is_some());
    assert!(c.as_restorable().is_some());
}
