use modkit_orm::{Entity, FieldType, Fields, Model};

#[derive(Default, Fields)]
struct Address {
    #[orm("size:128")]
    street: String,
    #[orm]
    zip: Option<String>,
}

#[derive(Default, Entity)]
#[entity(table = "people")]
struct Person {
    #[orm(model)]
    model: Model,
    #[orm("size:64,key:true")]
    name: String,
    #[orm(column = "Age")]
    age: u32,
    #[orm(embed)]
    address: Address,
    display_name: String,
}

fn main() {
    assert_eq!(Person::TABLE, "people");
    let d = Person::descriptors();
    let names: Vec<_> = d.iter().map(|f| f.name).collect();
    assert_eq!(
        names,
        ["ID", "CreateDate", "LastUpdate", "DeleteDate", "name", "Age", "street", "zip"]
    );
    assert_eq!(d[5].field_type, FieldType::Int);
    assert!(d[5].unsigned);
    assert!(d[7].nullable);

    let columns = <Person as Fields>::COLUMNS;
    assert_eq!(columns.len(), 4);
    assert_eq!(columns.get(2), Some("street"));
    assert_eq!(columns.first_conflict(), None);

    let p = Person::default();
    assert!(p.model().is_new());
    assert!(p.display_name.is_empty());
}
