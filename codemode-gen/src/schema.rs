//! JSON Schema → named Rust type declarations.
//!
//! Every object shape in a schema becomes a named struct — no anonymous
//! types appear in generated source. Naming is deterministic: nested
//! objects are `{Parent}{Field}`, array items `{Parent}{Field}Item`,
//! and fields are emitted in lexicographic order of their JSON names.
//! Nested types are declared before the types that reference them.

use serde_json::Value;

use crate::GenError;
use crate::naming::{snake_case, upper_camel};

/// The shape of a lowered root type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    /// A named struct; tool responses decode from JSON.
    Struct,
    /// `pub type X = String;` — tool responses are raw text.
    StringAlias,
    /// `pub type X = serde_json::Value;` — schema was `{}`.
    ValueAlias,
    /// `pub type X = serde_json::Map<...>;` — untyped object.
    MapAlias,
}

/// A lowered schema: the root type name, its shape, and the full
/// declaration text (nested types first).
#[derive(Debug, Clone)]
pub struct LoweredType {
    /// Name of the root type.
    pub root: String,
    /// Shape of the root type.
    pub kind: RootKind,
    /// Declaration source text.
    pub decls: String,
}

/// Lower an input schema.
///
/// Returns `Some` iff the schema is an object with at least one
/// property; tools without input properties get no input type and no
/// input parameter.
pub fn lower_input(
    schema: Option<&Value>,
    root: &str,
    context: &str,
) -> Result<Option<LoweredType>, GenError> {
    let Some(schema) = schema else {
        return Ok(None);
    };
    let obj = require_object(schema, context)?;
    match properties_of(obj) {
        Some(props) if !props.is_empty() => {
            let mut decls = String::new();
            emit_struct(root, obj, &mut decls, context)?;
            Ok(Some(LoweredType {
                root: root.to_string(),
                kind: RootKind::Struct,
                decls,
            }))
        }
        _ => Ok(None),
    }
}

/// Lower an output schema.
///
/// - `None` → `pub type Root = String;` (raw text output)
/// - `{}` → `pub type Root = serde_json::Value;`
/// - object without properties → map alias
/// - object with properties → struct
pub fn lower_output(
    schema: Option<&Value>,
    root: &str,
    context: &str,
) -> Result<LoweredType, GenError> {
    let Some(schema) = schema else {
        return Ok(LoweredType {
            root: root.to_string(),
            kind: RootKind::StringAlias,
            decls: format!("pub type {root} = String;\n"),
        });
    };
    let obj = require_object(schema, context)?;
    if obj.is_empty() {
        return Ok(LoweredType {
            root: root.to_string(),
            kind: RootKind::ValueAlias,
            decls: format!("pub type {root} = serde_json::Value;\n"),
        });
    }
    match properties_of(obj) {
        Some(props) if !props.is_empty() => {
            let mut decls = String::new();
            emit_struct(root, obj, &mut decls, context)?;
            Ok(LoweredType {
                root: root.to_string(),
                kind: RootKind::Struct,
                decls,
            })
        }
        _ => {
            let mut decls = String::new();
            if let Some(desc) = description_of(obj) {
                push_doc(&mut decls, "", &desc);
            }
            decls.push_str(&format!(
                "pub type {root} = serde_json::Map<String, serde_json::Value>;\n"
            ));
            Ok(LoweredType {
                root: root.to_string(),
                kind: RootKind::MapAlias,
                decls,
            })
        }
    }
}

fn require_object<'a>(
    schema: &'a Value,
    context: &str,
) -> Result<&'a serde_json::Map<String, Value>, GenError> {
    schema.as_object().ok_or_else(|| GenError::Schema {
        context: context.to_string(),
        message: format!("schema must be a JSON object, got {schema}"),
    })
}

fn properties_of(obj: &serde_json::Map<String, Value>) -> Option<&serde_json::Map<String, Value>> {
    obj.get("properties").and_then(Value::as_object)
}

fn description_of(obj: &serde_json::Map<String, Value>) -> Option<String> {
    obj.get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn push_doc(out: &mut String, indent: &str, text: &str) {
    for line in text.lines() {
        if line.is_empty() {
            out.push_str(&format!("{indent}///\n"));
        } else {
            out.push_str(&format!("{indent}/// {line}\n"));
        }
    }
}

/// Emit `name` as a struct declaration (nested types first) into `out`.
fn emit_struct(
    name: &str,
    obj: &serde_json::Map<String, Value>,
    out: &mut String,
    context: &str,
) -> Result<(), GenError> {
    let props = properties_of(obj).cloned().unwrap_or_default();
    // Lexicographic field order: serde_json::Map preserves insertion
    // order, so sort the names explicitly.
    let mut names: Vec<&String> = props.keys().collect();
    names.sort();

    let mut body = String::new();
    for json_name in &names {
        let field_schema = &props[json_name.as_str()];
        let field_obj = require_object(field_schema, context)?;
        let camel = upper_camel(json_name);
        let resolved = resolve_type(name, &camel, field_obj, out, context)?;

        if let Some(desc) = description_of(field_obj) {
            push_doc(&mut body, "    ", &desc);
        }
        if let Some(values) = enum_values(field_obj) {
            push_doc(&mut body, "    ", &format!("Must be one of {values}"));
        }
        let ident = snake_case(json_name);
        if resolved.optional {
            body.push_str(&format!(
                "    #[serde(rename = \"{json_name}\", default, skip_serializing_if = \"Option::is_none\")]\n"
            ));
            body.push_str(&format!("    pub {ident}: Option<{}>,\n", resolved.ty));
        } else {
            body.push_str(&format!("    #[serde(rename = \"{json_name}\", default)]\n"));
            body.push_str(&format!("    pub {ident}: {},\n", resolved.ty));
        }
    }

    if let Some(desc) = description_of(obj) {
        push_doc(out, "", &desc);
    }
    out.push_str("#[derive(Debug, Clone, Default, Serialize, Deserialize)]\n");
    out.push_str(&format!("pub struct {name} {{\n{body}}}\n"));
    Ok(())
}

fn enum_values(obj: &serde_json::Map<String, Value>) -> Option<String> {
    let list = obj.get("enum")?.as_array()?;
    if list.is_empty() {
        return None;
    }
    let rendered: Vec<String> = list
        .iter()
        .map(|v| match v {
            Value::String(s) => format!("\"{s}\""),
            other => other.to_string(),
        })
        .collect();
    Some(rendered.join(", "))
}

struct ResolvedField {
    ty: String,
    optional: bool,
}

impl ResolvedField {
    fn required(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            optional: false,
        }
    }
}

/// Resolve a field schema to a Rust type, emitting any induced named
/// types into `out` before the enclosing struct is emitted.
fn resolve_type(
    parent: &str,
    field_camel: &str,
    obj: &serde_json::Map<String, Value>,
    out: &mut String,
    context: &str,
) -> Result<ResolvedField, GenError> {
    let (type_name, nullable) = primary_type(obj);

    let resolved = match type_name.as_deref() {
        Some("string") => ResolvedField::required("String"),
        Some("integer") => ResolvedField::required("i64"),
        Some("number") => ResolvedField::required("f64"),
        Some("boolean") => ResolvedField::required("bool"),
        Some("null") => ResolvedField::required("serde_json::Value"),
        Some("array") => {
            let item_ty = match obj.get("items").and_then(Value::as_object) {
                Some(items) => {
                    let nested = resolve_type(
                        parent,
                        &format!("{field_camel}Item"),
                        items,
                        out,
                        context,
                    )?;
                    nested.ty
                }
                None => "serde_json::Value".to_string(),
            };
            ResolvedField::required(format!("Vec<{item_ty}>"))
        }
        Some("object") | None => match properties_of(obj) {
            Some(props) if !props.is_empty() => {
                let nested_name = format!("{parent}{field_camel}");
                emit_struct(&nested_name, obj, out, context)?;
                ResolvedField {
                    ty: nested_name,
                    optional: nullable,
                }
            }
            _ if type_name.is_some() => ResolvedField::required(
                "serde_json::Map<String, serde_json::Value>",
            ),
            _ => ResolvedField::required("serde_json::Value"),
        },
        Some(other) => {
            return Err(GenError::Schema {
                context: context.to_string(),
                message: format!("unsupported type \"{other}\""),
            });
        }
    };

    // A nullable union makes the field optional unless the resolved
    // type is already dynamic (any/map).
    let dynamic = resolved.ty.starts_with("serde_json::");
    Ok(ResolvedField {
        optional: resolved.optional || (nullable && !dynamic),
        ty: resolved.ty,
    })
}

/// The effective type of a schema plus whether `"null"` appears in a
/// union position (`type: ["null", T]`).
fn primary_type(obj: &serde_json::Map<String, Value>) -> (Option<String>, bool) {
    match obj.get("type") {
        Some(Value::String(s)) => (Some(s.clone()), false),
        Some(Value::Array(variants)) => {
            let mut nullable = false;
            let mut primary = None;
            for v in variants {
                match v.as_str() {
                    Some("null") => nullable = true,
                    Some(other) if primary.is_none() => primary = Some(other.to_string()),
                    _ => {}
                }
            }
            (primary, nullable)
        }
        _ => (None, false),
    }
}
