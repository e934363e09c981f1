//! Field descriptors and the `#[orm("...")]` annotation mini-language.

use std::fmt;

/// Name of the reserved identifier column.
pub const ID: &str = "ID";
/// Name of the reserved creation timestamp column.
pub const CREATE_DATE: &str = "CreateDate";
/// Name of the reserved last-update timestamp column.
pub const LAST_UPDATE: &str = "LastUpdate";
/// Name of the reserved soft-delete timestamp column.
pub const DELETE_DATE: &str = "DeleteDate";

/// Width used for string columns declared without a size.
pub const DEFAULT_STRING_SIZE: u32 = 256;

/// Semantic column type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Long,
    Bool,
    Decimal,
    Float,
    Double,
    DateTime,
    Char,
    String,
    Uuid,
}

impl FieldType {
    /// Parse an annotation type name. `time` is accepted for `datetime`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.trim() {
            "int" => FieldType::Int,
            "long" => FieldType::Long,
            "bool" => FieldType::Bool,
            "decimal" => FieldType::Decimal,
            "float" => FieldType::Float,
            "double" => FieldType::Double,
            "datetime" | "time" => FieldType::DateTime,
            "char" => FieldType::Char,
            "string" => FieldType::String,
            "uuid" => FieldType::Uuid,
            _ => return None,
        })
    }

    /// Native column type shared by all dialects.
    #[must_use]
    pub fn column_type(self) -> &'static str {
        match self {
            FieldType::Int => "INT",
            FieldType::Long => "BIGINT",
            FieldType::Bool => "SMALLINT",
            FieldType::Decimal => "DECIMAL",
            FieldType::Float => "REAL",
            FieldType::Double => "DOUBLE",
            FieldType::DateTime => "DATETIME",
            FieldType::Char => "VARCHAR(1)",
            FieldType::String => "VARCHAR",
            FieldType::Uuid => "VARCHAR(36)",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldType::Int => "int",
            FieldType::Long => "long",
            FieldType::Bool => "bool",
            FieldType::Decimal => "decimal",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::DateTime => "datetime",
            FieldType::Char => "char",
            FieldType::String => "string",
            FieldType::Uuid => "uuid",
        })
    }
}

/// Column precision: `size` (width or total digits) and `decimals`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FieldSize {
    pub size: u32,
    pub decimals: u32,
}

impl FieldSize {
    #[must_use]
    pub const fn new(size: u32, decimals: u32) -> Self {
        Self { size, decimals }
    }

    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.size > 0
    }
}

impl fmt::Display for FieldSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.decimals > 0 {
            write!(f, "{},{}", self.size, self.decimals)
        } else {
            write!(f, "{}", self.size)
        }
    }
}

/// Metadata for one persisted attribute.
#[allow(clippy::struct_excessive_bools)] // column flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub field_type: FieldType,
    pub size: FieldSize,
    pub identity: bool,
    pub key: bool,
    pub unsigned: bool,
    pub nullable: bool,
}

impl FieldDescriptor {
    #[must_use]
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            size: FieldSize::new(0, 0),
            identity: false,
            key: false,
            unsigned: false,
            nullable: false,
        }
    }

    /// Build a descriptor from the inferred Rust-side shape and an annotation string.
    ///
    /// The annotation is a comma-separated list of `key:value` pairs:
    /// `type` (semantic type name), `size` (`major[,minor]`), `identity`, `key` and `unsigned`
    /// (`true`/`false`). Unknown keys and unknown type names are ignored.
    ///
    /// ```
    /// use modkit_orm::{FieldDescriptor, FieldType};
    ///
    /// let d = FieldDescriptor::from_annotation("Price", "type:decimal,size:10,2,key:true", FieldType::Double, false, false);
    /// assert_eq!(d.field_type, FieldType::Decimal);
    /// assert_eq!((d.size.size, d.size.decimals), (10, 2));
    /// assert!(d.key);
    /// ```
    #[must_use]
    pub fn from_annotation(
        name: &'static str,
        annotation: &str,
        inferred: FieldType,
        unsigned: bool,
        nullable: bool,
    ) -> Self {
        let mut d = Self::new(name, inferred);
        d.unsigned = unsigned;
        d.nullable = nullable;

        let mut last_key_was_size = false;
        for token in annotation.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let Some((key, value)) = token.split_once(':') else {
                // `size:10,2` splits into `size:10` and a bare `2`
                if last_key_was_size && let Ok(minor) = token.parse() {
                    d.size.decimals = minor;
                }
                last_key_was_size = false;
                continue;
            };
            let value = value.trim();
            last_key_was_size = false;
            match key.trim() {
                "type" => {
                    if let Some(t) = FieldType::from_name(value) {
                        d.field_type = t;
                    }
                }
                "size" => {
                    let mut parts = value.split(',');
                    if let Some(Ok(major)) = parts.next().map(|p| p.trim().parse()) {
                        d.size.size = major;
                        last_key_was_size = true;
                    }
                }
                "identity" => d.identity = value == "true",
                "key" => d.key = value == "true",
                "unsigned" => d.unsigned = value == "true",
                other => tracing::trace!(field = name, key = other, "ignoring unknown annotation key"),
            }
        }
        d
    }

    #[must_use]
    pub fn is_reserved(&self) -> bool {
        is_reserved(self.name)
    }
}

/// The four bookkeeping descriptors every entity starts with.
#[must_use]
pub const fn reserved_fields() -> [FieldDescriptor; 4] {
    let mut id = FieldDescriptor::new(ID, FieldType::Uuid);
    id.identity = true;
    id.key = true;
    let mut create = FieldDescriptor::new(CREATE_DATE, FieldType::DateTime);
    create.key = true;
    let mut update = FieldDescriptor::new(LAST_UPDATE, FieldType::DateTime);
    update.key = true;
    let mut delete = FieldDescriptor::new(DELETE_DATE, FieldType::DateTime);
    delete.nullable = true;
    [id, create, update, delete]
}

/// True for the bookkeeping column names (case-insensitive).
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    [ID, CREATE_DATE, LAST_UPDATE, DELETE_DATE]
        .iter()
        .any(|r| r.eq_ignore_ascii_case(name))
}
