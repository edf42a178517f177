//! Late binding of hash-key field paths against the live write state.
//!
//! A path like `"region.code"` is resolved segment by segment: every
//! intermediate segment must be a reference field whose target type is
//! registered, and the final segment must land on a primitive field. Paths
//! are bound fresh each encode call so a type registered mid-stream is
//! picked up the next cycle.

use strata_result::{Error, FieldPathErrorKind, Result};

use crate::schema::FieldType;
use crate::state_engine::WriteContext;

/// One resolved segment: which field of which type, and how to read it.
#[derive(Debug, Clone)]
pub struct PathSegment {
    pub type_name: String,
    pub field_position: usize,
    pub field_type: FieldType,
}

/// A fully resolved field path, ready for record traversal.
#[derive(Debug, Clone)]
pub struct BoundFieldPath {
    pub segments: Vec<PathSegment>,
}

impl BoundFieldPath {
    /// Resolve `path` starting at object type `root_type`.
    ///
    /// Missing types and missing fields are [`FieldPathErrorKind::NotBindable`]
    /// (the state may simply not carry them); a structurally broken path is
    /// [`FieldPathErrorKind::Malformed`]; a leaf that cannot be hashed is
    /// [`FieldPathErrorKind::TypeMismatch`].
    pub fn bind(ctx: &WriteContext<'_>, root_type: &str, path: &str) -> Result<Self> {
        let names: Vec<&str> = path.split('.').collect();
        if path.is_empty() || names.iter().any(|n| n.is_empty()) {
            return Err(err(FieldPathErrorKind::Malformed, path, "empty path segment"));
        }

        let mut segments = Vec::with_capacity(names.len());
        let mut current_type = root_type.to_string();
        for (i, name) in names.iter().enumerate() {
            let schema = ctx.object_schema(&current_type).ok_or_else(|| {
                err(
                    FieldPathErrorKind::NotBindable,
                    path,
                    &format!("no object type \"{current_type}\" in the bound state"),
                )
            })?;
            let position = schema.field_position(name).ok_or_else(|| {
                err(
                    FieldPathErrorKind::NotBindable,
                    path,
                    &format!("type \"{current_type}\" has no field \"{name}\""),
                )
            })?;
            let field_type = schema.fields[position].field_type.clone();

            let reference_target = match &field_type {
                FieldType::Reference(target) => Some(target.clone()),
                _ => None,
            };

            let last = i == names.len() - 1;
            if last {
                if reference_target.is_some() {
                    return Err(err(
                        FieldPathErrorKind::TypeMismatch,
                        path,
                        &format!("leaf field \"{name}\" is a reference, not a hashable value"),
                    ));
                }
                segments.push(PathSegment {
                    type_name: current_type.clone(),
                    field_position: position,
                    field_type,
                });
            } else {
                let Some(next_type) = reference_target else {
                    return Err(err(
                        FieldPathErrorKind::Malformed,
                        path,
                        &format!("path traverses non-reference field \"{name}\""),
                    ));
                };
                segments.push(PathSegment {
                    type_name: current_type,
                    field_position: position,
                    field_type,
                });
                current_type = next_type;
            }
        }
        Ok(Self { segments })
    }
}

fn err(kind: FieldPathErrorKind, path: &str, detail: &str) -> Error {
    Error::FieldPath {
        kind,
        path: path.to_string(),
        detail: detail.to_string(),
    }
}
