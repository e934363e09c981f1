use modkit_orm::{Entity, Model};

#[derive(Default, Entity)]
struct Person {
    #[orm(model)]
    model: Model,
    #[orm(model)]
    other: Model,
}

fn main() {}
