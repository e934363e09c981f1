use super::field::{DEFAULT_STRING_SIZE, FieldDescriptor, FieldSize, FieldType};
use crate::dialect::{Dialect, render_template};

/// Column definition: `<ident> TYPE[(size)] [UNSIGNED] [NOT NULL]`.
///
/// Identity, uuid and char columns never carry a size.
#[must_use]
pub fn column_definition(dialect: &dyn Dialect, field: &FieldDescriptor) -> String {
    let sized = !field.identity && !matches!(field.field_type, FieldType::Uuid | FieldType::Char);
    let size = match field.field_type {
        _ if !sized => None,
        FieldType::String if !field.size.is_set() => Some(FieldSize::new(DEFAULT_STRING_SIZE, 0)),
        _ => Some(field.size).filter(FieldSize::is_set),
    };
    let mut def = format!(
        "{} {}",
        dialect.identity(field.name),
        dialect.column_type(field.field_type)
    );
    if let Some(size) = size {
        def = format!("{def}({size})");
    }
    if field.unsigned && dialect.supports_unsigned() {
        def.push_str(" UNSIGNED");
    }
    if !field.nullable {
        def.push_str(" NOT NULL");
    }
    def
}

/// `CREATE TABLE` followed by one `CREATE INDEX` per key field.
#[must_use]
pub fn table_definition(dialect: &dyn Dialect, table: &str, fields: &[FieldDescriptor]) -> Vec<String> {
    let columns = fields
        .iter()
        .map(|f| column_definition(dialect, f))
        .collect::<Vec<_>>()
        .join(", ");

    let mut statements = vec![render_template(dialect.table_create(), &[
        ("table", table),
        ("columns", &columns),
    ])];

    let prefix = table.replace('.', "_");
    statements.extend(fields.iter().filter(|f| f.key).map(|f| {
        render_template(dialect.index_create(), &[
            ("prefix", &prefix),
            ("field", f.name),
            ("table", table),
        ])
    }));
    statements
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::dialect::{MsSqlDialect, MySqlDialect, SqliteDialect};
    use crate::schema::field::reserved_fields;

    fn fields() -> Vec<FieldDescriptor> {
        let mut out = reserved_fields().to_vec();
        out.push(FieldDescriptor {
            size: FieldSize::new(64, 0),
            key: true,
            ..FieldDescriptor::new("Name", FieldType::String)
        });
        out.push(FieldDescriptor {
            unsigned: true,
            nullable: true,
            ..FieldDescriptor::new("Age", FieldType::Int)
        });
        out.push(FieldDescriptor {
            size: FieldSize::new(10, 2),
            ..FieldDescriptor::new("Price", FieldType::Decimal)
        });
        out.push(FieldDescriptor {
            size: FieldSize::new(8, 0),
            ..FieldDescriptor::new("Tag", FieldType::Uuid)
        });
        out.push(FieldDescriptor::new("Notes", FieldType::String));
        out
    }

    #[test]
    fn mysql_table_definition() {
        let stmts = table_definition(&MySqlDialect::new("shop"), "Person", &fields());
        assert_eq!(
            stmts[0],
            "CREATE TABLE IF NOT EXISTS `Person` (`ID` VARCHAR(36) NOT NULL, \
             `CreateDate` DATETIME NOT NULL, `LastUpdate` DATETIME NOT NULL, `DeleteDate` DATETIME, \
             `Name` VARCHAR(64) NOT NULL, `Age` INT UNSIGNED, `Price` DECIMAL(10,2) NOT NULL, \
             `Tag` VARCHAR(36) NOT NULL, `Notes` VARCHAR(256) NOT NULL);"
        );
        assert_eq!(&stmts[1..], [
            "CREATE INDEX `Person_ID_Idx` ON `Person`(`ID`);",
            "CREATE INDEX `Person_CreateDate_Idx` ON `Person`(`CreateDate`);",
            "CREATE INDEX `Person_LastUpdate_Idx` ON `Person`(`LastUpdate`);",
            "CREATE INDEX `Person_Name_Idx` ON `Person`(`Name`);",
        ]);
    }

    #[test]
    fn index_prefix_replaces_dots() {
        let stmts = table_definition(&SqliteDialect, "crm.Person", &reserved_fields());
        assert_eq!(
            stmts[1],
            "CREATE INDEX IF NOT EXISTS \"crm_Person_ID_Idx\" ON \"crm.Person\"(\"ID\");"
        );
    }

    #[test]
    fn sql_server_drops_unsigned_and_maps_double() {
        let age = FieldDescriptor {
            unsigned: true,
            ..FieldDescriptor::new("Score", FieldType::Double)
        };
        assert_eq!(column_definition(&MsSqlDialect, &age), "[Score] FLOAT NOT NULL");
    }

    #[test]
    fn char_never_gets_a_size() {
        let c = FieldDescriptor {
            size: FieldSize::new(4, 0),
            ..FieldDescriptor::new("Grade", FieldType::Char)
        };
        assert_eq!(column_definition(&SqliteDialect, &c), "\"Grade\" VARCHAR(1) NOT NULL");
    }

    #[test]
    fn identity_fields_never_get_a_size() {
        let code = FieldDescriptor {
            size: FieldSize::new(12, 0),
            identity: true,
            ..FieldDescriptor::new("Code", FieldType::String)
        };
        assert_eq!(column_definition(&MySqlDialect::new("shop"), &code), "`Code` VARCHAR NOT NULL");

        let number = FieldDescriptor {
            size: FieldSize::new(10, 2),
            identity: true,
            ..FieldDescriptor::new("Number", FieldType::Decimal)
        };
        assert_eq!(column_definition(&SqliteDialect, &number), "\"Number\" DECIMAL NOT NULL");
    }
}
