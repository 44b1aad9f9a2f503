//! Identifier normalization and name-collision checking.
//!
//! Tool and property names arrive as free-form JSON strings; everything
//! generated from them derives deterministically from two
//! transformations: UpperCamelCase (types, collision keys) and
//! snake_case (functions, struct fields).

use codemode_types::ToolDescriptor;

use crate::{GenError, META_TOOL_NAME};

/// UpperCamelCase form of a source name.
///
/// Segments are split on `_`, `-`, spaces, and any other
/// non-alphanumeric byte; the first character of each segment is
/// uppercased and the rest preserved, so `read_file`, `read-file`, and
/// `readFile` all normalize to `ReadFile`.
pub fn upper_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for segment in name.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars);
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'N');
    }
    out
}

/// snake_case form of a source name, usable as a Rust field or function
/// identifier. Keywords are escaped as raw identifiers.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if !c.is_ascii_alphanumeric() {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            prev_lower = false;
            continue;
        }
        if c.is_ascii_uppercase() {
            if prev_lower && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            out.push(c);
        }
    }
    let out = out.trim_matches('_').to_string();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("n{out}");
    }
    if is_rust_keyword(&out) {
        return format!("r#{out}");
    }
    out
}

fn is_rust_keyword(s: &str) -> bool {
    matches!(
        s,
        "as" | "break" | "const" | "continue" | "crate" | "dyn" | "else" | "enum" | "extern"
            | "false" | "fn" | "for" | "if" | "impl" | "in" | "let" | "loop" | "match" | "mod"
            | "move" | "mut" | "pub" | "ref" | "return" | "self" | "static" | "struct" | "super"
            | "trait" | "true" | "type" | "unsafe" | "use" | "where" | "while" | "async"
            | "await" | "box" | "try" | "union"
    )
}

/// Reject tool sets whose names collide after normalization or shadow
/// the reserved meta-tool.
///
/// Both checks are fail-fast: the first violation found is returned.
/// Collision detection is complete — the set is accepted iff no two
/// distinct names share a normalized identifier (the UpperCamel type
/// prefix or the snake_case wrapper name; either collapsing makes the
/// generated file ambiguous) and no name equals [`META_TOOL_NAME`]
/// exactly.
pub fn check_collisions<'a, I>(tools: I) -> Result<(), GenError>
where
    I: IntoIterator<Item = &'a ToolDescriptor>,
{
    let mut seen: Vec<(String, String, &str)> = Vec::new();
    for tool in tools {
        if tool.name == META_TOOL_NAME {
            return Err(GenError::ReservedName(tool.name.clone()));
        }
        let camel = upper_camel(&tool.name);
        let snake = snake_case(&tool.name);
        if let Some((prior_camel, _, first)) = seen
            .iter()
            .find(|(c, s, _)| *c == camel || *s == snake)
        {
            return Err(GenError::NameCollision {
                first: (*first).to_string(),
                second: tool.name.clone(),
                identifier: prior_camel.clone(),
            });
        }
        seen.push((camel, snake, tool.name.as_str()));
    }
    Ok(())
}
