use modkit_orm::{Entity, Model};

#[derive(Default, Entity)]
struct Person {
    #[orm(model)]
    model: Model,
    #[orm(primary)]
    name: String,
}

fn main() {}
