// Derive macro applied to a non-struct should abort.

use modkit_orm::Entity;

#[derive(Entity)]
enum NotAStruct {
    A,
    B,
}

fn main() {}
