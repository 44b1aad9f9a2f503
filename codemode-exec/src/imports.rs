//! Source-level import auto-correction for the user file.
//!
//! Rust has no goimports: nothing can add a missing `use` from source
//! inspection alone, so this pass is removal-only. It drops top-level
//! single-name `use` declarations whose bound identifier never occurs in
//! the rest of the file, and reports what it removed. Anything it cannot
//! parse with confidence — grouped imports, globs, multi-line items — is
//! left untouched and the build surfaces the error.

/// The result of one auto-correction pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportFix {
    /// The possibly-rewritten source.
    pub source: String,
    /// Paths of the `use` declarations that were removed.
    pub removed: Vec<String>,
}

impl ImportFix {
    /// Whether the pass changed the file.
    pub fn changed(&self) -> bool {
        !self.removed.is_empty()
    }

    /// The advisory note for this fix, naming the user file.
    /// Empty when nothing changed.
    pub fn note(&self, file_name: &str) -> Option<String> {
        if !self.changed() {
            return None;
        }
        Some(format!(
            "note: imports in {file_name} were auto-corrected; added: none; removed: {}",
            self.removed.join(", ")
        ))
    }
}

/// Run the unused-import removal pass over `source`.
pub fn fix_imports(source: &str) -> ImportFix {
    let lines: Vec<&str> = source.lines().collect();
    let mut removed_lines = vec![false; lines.len()];
    let mut removed = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(bound) = single_use_binding(line) else {
            continue;
        };
        let rest_uses_it = lines
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .any(|(_, other)| contains_ident(other, &bound));
        if !rest_uses_it {
            removed_lines[i] = true;
            removed.push(use_path(line));
        }
    }

    if removed.is_empty() {
        return ImportFix {
            source: source.to_string(),
            removed,
        };
    }

    let mut out = String::with_capacity(source.len());
    for (i, line) in lines.iter().enumerate() {
        if removed_lines[i] {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    ImportFix {
        source: out,
        removed,
    }
}

/// The identifier a single-line, single-name `use` declaration binds,
/// or `None` when the line is not one we can safely reason about.
fn single_use_binding(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let body = trimmed.strip_prefix("use ")?.strip_suffix(';')?;
    if body.contains('{') || body.contains('*') {
        return None;
    }
    if let Some((_, alias)) = body.rsplit_once(" as ") {
        return Some(alias.trim().to_string());
    }
    let last = body.rsplit("::").next()?.trim();
    if last.is_empty() {
        return None;
    }
    Some(last.to_string())
}

/// The imported path of a `use` line, for the advisory note.
fn use_path(line: &str) -> String {
    line.trim()
        .trim_start_matches("use ")
        .trim_end_matches(';')
        .trim()
        .to_string()
}

/// Whether `text` contains `ident` as a standalone identifier token.
fn contains_ident(text: &str, ident: &str) -> bool {
    let bytes = text.as_bytes();
    let mut start = 0;
    while let Some(pos) = text[start..].find(ident) {
        let begin = start + pos;
        let end = begin + ident.len();
        let before_ok = begin == 0 || !is_ident_byte(bytes[begin - 1]);
        let after_ok = end == bytes.len() || !is_ident_byte(bytes[end]);
        if before_ok && after_ok {
            return true;
        }
        start = begin + 1;
    }
    false
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unused_single_import_is_removed() {
        let src = "use std::collections::HashMap;\nuse std::fmt::Write;\n\npub async fn run() {\n    let mut s = String::new();\n    let _ = Write::write_str(&mut s, \"x\");\n}\n";
        let fix = fix_imports(src);
        assert_eq!(fix.removed, vec!["std::collections::HashMap".to_string()]);
        assert!(!fix.source.contains("HashMap"));
        assert!(fix.source.contains("use std::fmt::Write;"));
    }

    #[test]
    fn used_imports_survive() {
        let src = "use std::collections::HashMap;\n\nfn f() { let _m: HashMap<u8, u8> = HashMap::new(); }\n";
        let fix = fix_imports(src);
        assert!(!fix.changed());
        assert_eq!(fix.source, src);
    }

    #[test]
    fn groups_and_globs_are_left_alone() {
        let src = "use crate::*;\nuse std::io::{Read, Write};\n\nfn f() {}\n";
        let fix = fix_imports(src);
        assert!(!fix.changed());
        assert_eq!(fix.source, src);
    }

    #[test]
    fn alias_binding_is_what_counts() {
        let src = "use std::collections::BTreeMap as Map;\n\nfn f() { let _m: Map<u8, u8> = Map::new(); }\n";
        let fix = fix_imports(src);
        assert!(!fix.changed());
    }

    #[test]
    fn substring_matches_do_not_count_as_usage() {
        let src = "use std::fs::File;\n\nfn f() { let _ = \"Filename\"; }\n";
        let fix = fix_imports(src);
        assert_eq!(fix.removed, vec!["std::fs::File".to_string()]);
    }

    #[test]
    fn note_shape() {
        let src = "use std::fs::File;\nuse std::fs::OpenOptions;\n\nfn f() {}\n";
        let fix = fix_imports(src);
        let note = fix.note("run.rs").unwrap();
        assert_eq!(
            note,
            "note: imports in run.rs were auto-corrected; added: none; removed: std::fs::File, std::fs::OpenOptions"
        );
        assert!(fix_imports("fn f() {}\n").note("run.rs").is_none());
    }
}
