//! Type schemas for the write state.
//!
//! Only the shapes the write path needs: object types (the leaves that map
//! keys and values reference) and map types (the one encoder this crate
//! ships). The seam in [`crate::type_state`] leaves room for list and set
//! encoders without touching these definitions.

/// Field types an object schema may declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Long,
    Str,
    /// Ordinal reference into the named sibling type.
    Reference(String),
}

#[derive(Debug, Clone)]
pub struct ObjectField {
    pub name: String,
    pub field_type: FieldType,
}

#[derive(Debug, Clone)]
pub struct ObjectSchema {
    pub name: String,
    pub fields: Vec<ObjectField>,
}

impl ObjectSchema {
    pub fn new(name: impl Into<String>, fields: Vec<(&str, FieldType)>) -> Self {
        Self {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(name, field_type)| ObjectField {
                    name: name.to_string(),
                    field_type,
                })
                .collect(),
        }
    }

    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Hash key: one or more `.`-separated field paths resolved against a map's
/// key type. When bound, the derived hash overrides staged bucket hints so
/// encoded tables are probing-compatible with content-hashing readers.
#[derive(Debug, Clone)]
pub struct HashKey {
    pub field_paths: Vec<String>,
}

impl HashKey {
    pub fn new(field_paths: &[&str]) -> Self {
        Self {
            field_paths: field_paths.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapSchema {
    pub name: String,
    pub key_type: String,
    pub value_type: String,
    pub hash_key: Option<HashKey>,
}

impl MapSchema {
    pub fn new(
        name: impl Into<String>,
        key_type: impl Into<String>,
        value_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            key_type: key_type.into(),
            value_type: value_type.into(),
            hash_key: None,
        }
    }

    pub fn with_hash_key(mut self, hash_key: HashKey) -> Self {
        self.hash_key = Some(hash_key);
        self
    }
}

#[derive(Debug, Clone)]
pub enum Schema {
    Object(ObjectSchema),
    Map(MapSchema),
}

impl Schema {
    pub fn name(&self) -> &str {
        match self {
            Schema::Object(s) => &s.name,
            Schema::Map(s) => &s.name,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            Schema::Object(s) => Some(s),
            _ => None,
        }
    }
}
