// Bookkeeping columns come from the model and cannot be mapped again.

use modkit_orm::{Entity, Model};

#[derive(Default, Entity)]
struct Person {
    #[orm(model)]
    model: Model,
    #[orm(column = "id")]
    legacy_id: String,
}

fn main() {}
