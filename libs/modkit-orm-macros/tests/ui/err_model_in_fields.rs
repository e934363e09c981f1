use modkit_orm::{Fields, Model};

#[derive(Default, Fields)]
struct Address {
    #[orm(model)]
    model: Model,
    #[orm]
    street: String,
}

fn main() {}
