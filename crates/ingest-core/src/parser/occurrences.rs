//! Identifier-occurrence extraction feeding the resolver.
//!
//! `resolver::resolve_references` only line-matches `RawOccurrence`s it is
//! given; this module is what produces them. For every definition in a
//! changed file, it walks that file's parse tree collecting identifier-like
//! tokens inside the definition's line span, then resolves each token
//! against a repository-wide name index built from the currently stored
//! definitions. A name that identifies exactly one definition elsewhere in
//! the repository becomes an occurrence targeting that definition's
//! declaration line; anything ambiguous or unknown is left for
//! `resolve_references` to skip, same as the original's SCIP-backed
//! resolution would leave an unresolved symbol.

use std::collections::HashMap;

use tree_sitter::{Node, Parser};

use crate::error::Result;
use crate::model::Definition;
use crate::storage::Store;

use super::languages::Language;
use super::resolver::RawOccurrence;

/// Node kinds treated as identifier-like across the supported grammars:
/// plain identifiers, type names, and field/method/property names.
const IDENTIFIER_NODE_KINDS: &[&str] =
    &["identifier", "type_identifier", "field_identifier", "property_identifier"];

/// `name -> every (file_path, start_line) a definition with that name is
/// declared at`, across `file_paths`. Built once per extraction pass so
/// ambiguous names can be dropped before any occurrence is proposed.
fn build_name_index(store: &Store, file_paths: &[String]) -> Result<HashMap<String, Vec<(String, u32)>>> {
    let mut index: HashMap<String, Vec<(String, u32)>> = HashMap::new();
    for path in file_paths {
        let Some(file) = store.get_file_by_path(path)? else { continue };
        for def in store.get_definitions_for_file(file.id)? {
            index.entry(def.name).or_default().push((path.clone(), def.start_line));
        }
    }
    Ok(index)
}

/// 1-based `(line, identifier text)` for every identifier-like node under
/// `root`, found with an explicit stack rather than recursion.
fn collect_identifiers(root: Node, source: &[u8]) -> Vec<(u32, String)> {
    let mut found = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if IDENTIFIER_NODE_KINDS.contains(&node.kind()) {
            if let Ok(text) = node.utf8_text(source) {
                found.push((node.start_position().row as u32 + 1, text.to_string()));
            }
        }
        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }

    found
}

/// Extracts `RawOccurrence`s for every definition currently stored under
/// `changed_files`, by re-walking each changed file's parse tree. Targets
/// are resolved against the name index built from `index_files` (normally
/// the whole repository, so a changed file can reference an unchanged
/// one).
pub fn extract_occurrences(
    store: &Store,
    changed_files: &[String],
    index_files: &[String],
) -> Result<Vec<RawOccurrence>> {
    let index = build_name_index(store, index_files)?;
    let mut occurrences = Vec::new();

    for path in changed_files {
        let Some(file) = store.get_file_by_path(path)? else { continue };
        let extension = std::path::Path::new(path).extension().and_then(|e| e.to_str()).unwrap_or_default();
        let Some(language) = Language::from_extension(extension) else { continue };
        let Ok(grammar) = language.grammar() else { continue };

        let mut parser = Parser::new();
        if parser.set_language(&grammar).is_err() {
            continue;
        }
        let Some(tree) = parser.parse(&file.file_content, None) else { continue };

        let identifiers = collect_identifiers(tree.root_node(), file.file_content.as_bytes());
        let definitions = store.get_definitions_for_file(file.id)?;

        for def in &definitions {
            occurrences.extend(occurrences_for_definition(def, path, &identifiers, &index));
        }
    }

    Ok(occurrences)
}

fn occurrences_for_definition(
    def: &Definition,
    file_path: &str,
    identifiers: &[(u32, String)],
    index: &HashMap<String, Vec<(String, u32)>>,
) -> Vec<RawOccurrence> {
    let mut out = Vec::new();

    for (line, name) in identifiers {
        if *line < def.start_line || *line > def.end_line {
            continue;
        }
        if *line == def.start_line && name == &def.name {
            continue; // the declaration token itself, not a use
        }
        let Some(candidates) = index.get(name) else { continue };
        let [(target_file, target_line)] = candidates.as_slice() else {
            continue; // no candidate, or ambiguous across the repo
        };
        if target_file == file_path && *target_line == def.start_line {
            continue; // a definition naming itself somewhere in its own body
        }

        out.push(RawOccurrence {
            source_definition_id: def.id,
            reference_name: name.clone(),
            target_file: target_file.clone(),
            target_line: *target_line,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::delta::full_parse;
    use crate::parser::resolver::resolve_references;

    fn write_file(dir: &std::path::Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn same_file_call_is_extracted_and_resolves() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "a.py", "def callee():\n    return 1\n\n\ndef caller():\n    return callee()\n");

        let store = Store::open_in_memory().unwrap();
        full_parse(&store, tmp.path()).unwrap();

        let files = vec!["a.py".to_string()];
        let occurrences = extract_occurrences(&store, &files, &files).unwrap();
        assert!(occurrences.iter().any(|o| o.reference_name == "callee"));

        let inserted = resolve_references(&store, &files, &occurrences).unwrap();
        assert_eq!(inserted, 1);
    }

    #[test]
    fn cross_file_call_resolves_against_the_wider_index() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "lib.py", "def helper():\n    return 1\n");
        write_file(tmp.path(), "main.py", "def run():\n    return helper()\n");

        let store = Store::open_in_memory().unwrap();
        full_parse(&store, tmp.path()).unwrap();

        let all_files = vec!["lib.py".to_string(), "main.py".to_string()];
        let changed = vec!["main.py".to_string()];
        let occurrences = extract_occurrences(&store, &changed, &all_files).unwrap();
        assert!(occurrences.iter().any(|o| o.reference_name == "helper" && o.target_file == "lib.py"));

        let inserted = resolve_references(&store, &all_files, &occurrences).unwrap();
        assert_eq!(inserted, 1);
    }

    #[test]
    fn ambiguous_name_across_repo_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "a.py", "def helper():\n    return 1\n");
        write_file(tmp.path(), "b.py", "def helper():\n    return 2\n");
        write_file(tmp.path(), "main.py", "def run():\n    return helper()\n");

        let store = Store::open_in_memory().unwrap();
        full_parse(&store, tmp.path()).unwrap();

        let all_files = vec!["a.py".to_string(), "b.py".to_string(), "main.py".to_string()];
        let occurrences = extract_occurrences(&store, &all_files, &all_files).unwrap();
        assert!(!occurrences.iter().any(|o| o.reference_name == "helper"));
    }
}
