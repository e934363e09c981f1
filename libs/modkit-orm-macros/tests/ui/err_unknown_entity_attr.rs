use modkit_orm::{Entity, Model};

#[derive(Default, Entity)]
#[entity(table = "people", deletable)]
struct Person {
    #[orm(model)]
    model: Model,
}

fn main() {}
