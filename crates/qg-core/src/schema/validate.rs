//! The validation walker.
//!
//! Recursive descent over a `serde_json::Value`, guided by a
//! [`Definition`]. Stops at the first mismatch. The instance path is kept
//! as a segment stack and only rendered into a string when an error is
//! actually raised.

use serde_json::Value;

use super::{Definition, Primitive, PropertiesDef, Schema, SchemaError};

/// Maximum number of refs followed on one descent path.
///
/// The qg table is acyclic, so this bound is never hit in practice; it
/// keeps a malformed table from recursing forever.
const MAX_REF_DEPTH: usize = 200;

/// One segment of the instance path.
pub(super) enum PathSeg {
    Field(String),
    Index(usize),
}

/// Renders the segment stack as a dotted path rooted at `$`.
fn render_path(path: &[PathSeg]) -> String {
    let mut out = String::from("$");
    for seg in path {
        out.push('.');
        match seg {
            PathSeg::Field(name) => out.push_str(name),
            PathSeg::Index(i) => out.push_str(&i.to_string()),
        }
    }
    out
}

fn mismatch(path: &[PathSeg]) -> SchemaError {
    SchemaError::Validation {
        path: render_path(path),
    }
}

/// A mismatch at a field of the object at `path`, without touching the
/// segment stack.
fn field_mismatch(path: &[PathSeg], field: &str) -> SchemaError {
    SchemaError::Validation {
        path: format!("{}.{field}", render_path(path)),
    }
}

/// Validates `value` against `definition`, resolving refs through `schema`.
///
/// `depth` counts followed refs only; structural recursion into arrays and
/// objects is bounded by the input size.
pub(super) fn validate(
    schema: &Schema,
    definition: &Definition,
    value: &Value,
    path: &mut Vec<PathSeg>,
    depth: usize,
) -> Result<(), SchemaError> {
    match definition {
        Definition::Type(primitive) => validate_primitive(*primitive, value, path),

        Definition::Ref(name) => {
            if depth >= MAX_REF_DEPTH {
                return Err(SchemaError::MaxDepth {
                    path: render_path(path),
                });
            }
            let target = schema
                .definition(name)
                .ok_or_else(|| SchemaError::UnknownType {
                    name: (*name).to_string(),
                })?;
            validate(schema, target, value, path, depth + 1)
        }

        Definition::Elements(inner) => {
            let items = value.as_array().ok_or_else(|| mismatch(path))?;
            for (i, item) in items.iter().enumerate() {
                path.push(PathSeg::Index(i));
                let result = validate(schema, inner, item, path, depth);
                path.pop();
                result?;
            }
            Ok(())
        }

        Definition::Properties(properties) => {
            validate_properties(schema, properties, value, path, depth, None)
        }

        Definition::Discriminator { tag, mapping } => {
            let object = value.as_object().ok_or_else(|| mismatch(path))?;

            // The tag must be present, a string, and mapped. All three
            // failures point at the tag field itself.
            let variant = object
                .get(*tag)
                .and_then(|tag_value| tag_value.as_str())
                .ok_or_else(|| field_mismatch(path, tag))?;
            let properties = mapping
                .iter()
                .find(|(name, _)| *name == variant)
                .map(|(_, p)| p)
                .ok_or_else(|| field_mismatch(path, tag))?;

            validate_properties(schema, properties, value, path, depth, Some(tag))
        }
    }
}

fn validate_primitive(
    primitive: Primitive,
    value: &Value,
    path: &[PathSeg],
) -> Result<(), SchemaError> {
    let ok = match primitive {
        Primitive::String => value.is_string(),
        Primitive::Boolean => value.is_boolean(),
        Primitive::Float64 => value.is_number(),
        Primitive::Int32 => is_int32(value),
    };
    if ok {
        Ok(())
    } else {
        Err(mismatch(path))
    }
}

/// int32 accepts any JSON number with an integral value in `i32` range,
/// including floats like `3.0`.
fn is_int32(value: &Value) -> bool {
    if let Some(i) = value.as_i64() {
        return i32::try_from(i).is_ok();
    }
    if let Some(f) = value.as_f64() {
        return f.fract() == 0.0 && f >= f64::from(i32::MIN) && f <= f64::from(i32::MAX);
    }
    false
}

/// Validates an object against a properties form.
///
/// `exempt` names the discriminator tag of the enclosing union, which is
/// part of the object but not of the mapped properties.
fn validate_properties(
    schema: &Schema,
    properties: &PropertiesDef,
    value: &Value,
    path: &mut Vec<PathSeg>,
    depth: usize,
    exempt: Option<&str>,
) -> Result<(), SchemaError> {
    let object = value.as_object().ok_or_else(|| mismatch(path))?;

    for (name, definition) in &properties.required {
        path.push(PathSeg::Field((*name).to_string()));
        let result = match object.get(*name) {
            Some(field) => validate(schema, definition, field, path, depth),
            // Report the missing field at its own path, not at the parent.
            None => Err(mismatch(path)),
        };
        path.pop();
        result?;
    }

    for (name, definition) in &properties.optional {
        if let Some(field) = object.get(*name) {
            path.push(PathSeg::Field((*name).to_string()));
            let result = validate(schema, definition, field, path, depth);
            path.pop();
            result?;
        }
    }

    if !properties.additional {
        let known = |key: &str| {
            exempt == Some(key)
                || properties.required.iter().any(|(name, _)| *name == key)
                || properties.optional.iter().any(|(name, _)| *name == key)
        };
        for key in object.keys() {
            if !known(key) {
                path.push(PathSeg::Field(key.clone()));
                let err = mismatch(path);
                path.pop();
                return Err(err);
            }
        }
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
