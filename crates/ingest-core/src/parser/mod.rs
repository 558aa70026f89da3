//! Per-file definition extraction.
//!
//! Grounded on the original implementation's `_parse_file_to_json`: run the
//! grammar's query, pick out `def_<kind>`/`name_<kind>` (fallback `name`)
//! captures, assign "anonymous" to definitions with no name capture, then
//! deduplicate by start line and by containment.

pub mod delta;
pub mod languages;
pub mod manifest;
pub mod occurrences;
pub mod resolver;

use std::collections::HashSet;

use tree_sitter::{Parser, Query, QueryCursor, StreamingIterator};

use crate::error::{CoreError, Result};
use crate::hash::{hash_source_code, strip_comments};
use crate::model::DefinitionKind;
use languages::Language;

/// One definition extracted from a single file, before it is written to the
/// store (no id yet).
#[derive(Debug, Clone, PartialEq)]
pub struct RawDefinition {
    pub name: String,
    pub kind: DefinitionKind,
    pub start_line: u32,
    pub end_line: u32,
    pub source_code: String,
    pub docstring: Option<String>,
    pub source_code_hash: String,
}

pub struct FileParseResult {
    pub language: Language,
    pub definitions: Vec<RawDefinition>,
}

pub fn parse_file(extension: &str, source: &str) -> Result<FileParseResult> {
    let language = languages::require_language(extension)?;
    let definitions = extract_definitions(language, source)?;
    Ok(FileParseResult { language, definitions })
}

fn extract_definitions(language: Language, source: &str) -> Result<Vec<RawDefinition>> {
    let grammar = language.grammar()?;
    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|e| CoreError::GrammarInit {
            language: language.name().to_string(),
            message: e.to_string(),
        })?;
    let tree = parser.parse(source, None).ok_or_else(|| CoreError::GrammarInit {
        language: language.name().to_string(),
        message: "parser returned no tree".to_string(),
    })?;

    let query = Query::new(&grammar, language.query_source()).map_err(|e| CoreError::GrammarInit {
        language: language.name().to_string(),
        message: e.to_string(),
    })?;

    let mut cursor = QueryCursor::new();
    let source_bytes = source.as_bytes();
    let mut matches = cursor.matches(&query, tree.root_node(), source_bytes);

    let mut candidates: Vec<(u32, RawDefinition)> = Vec::new(); // (byte_len, def) for containment checks

    while let Some(m) = matches.next() {
        let mut def_kind: Option<DefinitionKind> = None;
        let mut def_node: Option<tree_sitter::Node> = None;
        let mut name: Option<String> = None;
        let mut docstring: Option<String> = None;

        for capture in m.captures {
            let capture_name = query.capture_names()[capture.index as usize];
            if let Some(kind_str) = capture_name.strip_prefix("def_") {
                def_kind = DefinitionKind::from_str(kind_str);
                def_node = Some(capture.node);
            } else if capture_name.starts_with("name_") || capture_name == "name" {
                name = capture.node.utf8_text(source_bytes).ok().map(str::to_string);
            } else if capture_name == "doc" {
                docstring = capture.node.utf8_text(source_bytes).ok().map(str::to_string);
            }
        }

        let (Some(kind), Some(node)) = (def_kind, def_node) else {
            continue;
        };

        let start_line = node.start_position().row as u32 + 1;
        let end_line = node.end_position().row as u32 + 1;
        let raw_source = node.utf8_text(source_bytes).unwrap_or_default().to_string();
        let name = name.unwrap_or_else(|| "anonymous".to_string());

        let cleaned = strip_comments(language.name(), &raw_source);
        let source_code_hash = hash_source_code(&name, &cleaned);
        let span_len = (node.end_byte() - node.start_byte()) as u32;

        candidates.push((
            span_len,
            RawDefinition {
                name,
                kind,
                start_line,
                end_line,
                source_code: raw_source,
                docstring,
                source_code_hash,
            },
        ));
    }

    Ok(dedup_definitions(candidates))
}

/// Suppress definitions sharing a start line with an earlier (larger) one,
/// and suppress anonymous/variable definitions whose span is fully
/// contained in an already-emitted definition. Candidates are processed
/// widest-span first so containers are emitted before what they contain.
fn dedup_definitions(mut candidates: Vec<(u32, RawDefinition)>) -> Vec<RawDefinition> {
    candidates.sort_by(|a, b| b.0.cmp(&a.0));

    let mut seen_start_lines: HashSet<u32> = HashSet::new();
    let mut emitted: Vec<RawDefinition> = Vec::new();

    for (_, def) in candidates {
        if seen_start_lines.contains(&def.start_line) {
            continue;
        }

        let is_suppressible = matches!(def.kind, DefinitionKind::Variable) || def.name == "anonymous";
        if is_suppressible {
            let contained = emitted
                .iter()
                .any(|e| e.start_line <= def.start_line && def.end_line <= e.end_line);
            if contained {
                continue;
            }
        }

        seen_start_lines.insert(def.start_line);
        emitted.push(def);
    }

    emitted.sort_by_key(|d| d.start_line);
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_python_function_and_class() {
        let source = "def foo():\n    return 1\n\n\nclass Bar:\n    pass\n";
        let result = parse_file("py", source).unwrap();
        let names: Vec<&str> = result.definitions.iter().map(|d| d.name.as_str()).collect();
        assert!(names.contains(&"foo"));
        assert!(names.contains(&"Bar"));
    }

    #[test]
    fn dedup_suppresses_contained_anonymous_definitions() {
        let outer = RawDefinition {
            name: "outer".into(),
            kind: DefinitionKind::Function,
            start_line: 1,
            end_line: 10,
            source_code: "".into(),
            docstring: None,
            source_code_hash: "h1".into(),
        };
        let inner_anonymous = RawDefinition {
            name: "anonymous".into(),
            kind: DefinitionKind::Variable,
            start_line: 2,
            end_line: 3,
            source_code: "".into(),
            docstring: None,
            source_code_hash: "h2".into(),
        };
        let candidates = vec![(100, outer), (5, inner_anonymous)];
        let result = dedup_definitions(candidates);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "outer");
    }

    #[test]
    fn dedup_keeps_only_one_definition_per_start_line() {
        let a = RawDefinition {
            name: "a".into(),
            kind: DefinitionKind::Function,
            start_line: 5,
            end_line: 6,
            source_code: "".into(),
            docstring: None,
            source_code_hash: "h1".into(),
        };
        let b = RawDefinition {
            name: "b".into(),
            kind: DefinitionKind::Function,
            start_line: 5,
            end_line: 7,
            source_code: "".into(),
            docstring: None,
            source_code_hash: "h2".into(),
        };
        let result = dedup_definitions(vec![(10, a), (20, b)]);
        assert_eq!(result.len(), 1);
    }
}
