// Entities need exactly one #[orm(model)] field.

use modkit_orm::Entity;

#[derive(Default, Entity)]
struct Person {
    #[orm]
    name: String,
}

fn main() {}
