//! `ParseDelta` computation: reconciling stored Files/Definitions against a
//! freshly parsed snapshot, grounded on the original implementation's
//! `ASTParser._process_file_with_comparison` (hash-diff by
//! `source_code_hash`) and `DAGBuilder`'s `RenamedFile`/`ParseDelta` shapes.

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::model::Id;
use crate::storage::{NewDefinition, Store};

use super::{languages, RawDefinition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedFile {
    pub old: String,
    pub new: String,
}

/// Per-file definition-id changes recorded by one parse pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDefinitionDelta {
    pub added: HashSet<Id>,
    pub removed: HashSet<Id>,
    pub unchanged: HashSet<Id>,
}

/// What changed between the previously stored commit and the new one.
#[derive(Debug, Clone, Default)]
pub struct ParseDelta {
    pub files_added: Vec<String>,
    pub files_modified: Vec<String>,
    pub files_deleted: Vec<String>,
    pub files_renamed: Vec<RenamedFile>,
    pub definitions_added: HashSet<Id>,
    pub definitions_removed: HashSet<Id>,
    pub definitions_unchanged: HashSet<Id>,
    pub files_to_definitions: HashMap<String, FileDefinitionDelta>,
}

impl ParseDelta {
    pub fn is_empty(&self) -> bool {
        self.files_added.is_empty()
            && self.files_modified.is_empty()
            && self.files_deleted.is_empty()
            && self.files_renamed.is_empty()
            && self.definitions_added.is_empty()
            && self.definitions_removed.is_empty()
    }

    fn record_file_definition_delta(&mut self, file_path: &str, delta: FileDefinitionDelta) {
        self.definitions_added.extend(&delta.added);
        self.definitions_removed.extend(&delta.removed);
        self.definitions_unchanged.extend(&delta.unchanged);
        self.files_to_definitions.insert(file_path.to_string(), delta);
    }
}

/// Changes discovered by the clone utility between two commits (see
/// SPEC_FULL.md §6's collaborator contract). Only extensions recognized by
/// `languages::Language` participate.
#[derive(Debug, Clone, Default)]
pub struct GitChanges {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    pub renamed: Vec<RenamedFile>,
}

fn supported(path: &str) -> bool {
    std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| languages::Language::from_extension(ext).is_some())
}

/// Full parse of every supported file under `repo_root`. Used when the
/// repository has no prior commit hash.
pub fn full_parse(store: &Store, repo_root: &std::path::Path) -> Result<ParseDelta> {
    let mut delta = ParseDelta::default();
    let files = discover_source_files(repo_root);

    for rel_path in files {
        let abs_path = repo_root.join(&rel_path);
        let content = match std::fs::read_to_string(&abs_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(file = %rel_path, error = %e, "skipping unreadable file");
                continue;
            }
        };
        process_new_or_full_file(store, &rel_path, &content, &mut delta)?;
        delta.files_added.push(rel_path);
    }

    Ok(delta)
}

/// Incremental parse driven by a `GitChanges` record.
pub fn incremental_parse(
    store: &Store,
    repo_root: &std::path::Path,
    changes: &GitChanges,
) -> Result<ParseDelta> {
    let mut delta = ParseDelta::default();

    // Deletions and renames are applied before changed files are processed.
    for path in &changes.deleted {
        if !supported(path) {
            continue;
        }
        store.delete_file_by_path(path)?;
        delta.files_deleted.push(path.clone());
    }
    for rename in &changes.renamed {
        if !supported(&rename.new) {
            continue;
        }
        store.rename_file(&rename.old, &rename.new)?;
        delta.files_renamed.push(rename.clone());
    }

    for path in changes.added.iter().chain(changes.modified.iter()) {
        if !supported(path) {
            continue;
        }
        let abs_path = repo_root.join(path);
        let content = match std::fs::read_to_string(&abs_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(file = %path, error = %e, "skipping unreadable file");
                continue;
            }
        };

        let is_new = store.get_file_by_path(path)?.is_none();
        if is_new {
            process_new_or_full_file(store, path, &content, &mut delta)?;
            delta.files_added.push(path.clone());
        } else {
            process_modified_file(store, path, &content, &mut delta)?;
            delta.files_modified.push(path.clone());
        }
    }

    Ok(delta)
}

fn process_new_or_full_file(
    store: &Store,
    rel_path: &str,
    content: &str,
    delta: &mut ParseDelta,
) -> Result<()> {
    let ext = std::path::Path::new(rel_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let parsed = super::parse_file(ext, content)?;
    let file_id = store.insert_file(None, rel_path, parsed.language.name(), content)?;

    let mut file_delta = FileDefinitionDelta::default();
    for def in &parsed.definitions {
        let id = insert_definition(store, file_id, def)?;
        file_delta.added.insert(id);
    }
    delta.record_file_definition_delta(rel_path, file_delta);
    Ok(())
}

/// The core hash-diff: compare freshly parsed definitions against the
/// stored ones by `source_code_hash`; remove stale rows, insert new ones,
/// keep unchanged ones untouched.
fn process_modified_file(
    store: &Store,
    rel_path: &str,
    content: &str,
    delta: &mut ParseDelta,
) -> Result<()> {
    let ext = std::path::Path::new(rel_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let parsed = super::parse_file(ext, content)?;

    let file = store
        .get_file_by_path(rel_path)?
        .expect("process_modified_file called for a file not yet in the store");

    let existing = store.get_definitions_for_file(file.id)?;
    let existing_by_hash: HashMap<String, Id> =
        existing.iter().map(|d| (d.source_code_hash.clone(), d.id)).collect();
    let new_by_hash: HashMap<String, &RawDefinition> =
        parsed.definitions.iter().map(|d| (d.source_code_hash.clone(), d)).collect();

    let existing_hashes: HashSet<&String> = existing_by_hash.keys().collect();
    let new_hashes: HashSet<&String> = new_by_hash.keys().collect();

    let mut file_delta = FileDefinitionDelta::default();

    for hash in existing_hashes.difference(&new_hashes) {
        let id = existing_by_hash[*hash];
        store.delete_definition(id)?;
        file_delta.removed.insert(id);
    }
    for hash in new_hashes.difference(&existing_hashes) {
        let def = new_by_hash[*hash];
        let id = insert_definition(store, file.id, def)?;
        file_delta.added.insert(id);
    }
    for hash in existing_hashes.intersection(&new_hashes) {
        file_delta.unchanged.insert(existing_by_hash[*hash]);
    }

    delta.record_file_definition_delta(rel_path, file_delta);
    Ok(())
}

fn insert_definition(store: &Store, file_id: Id, def: &RawDefinition) -> Result<Id> {
    store.insert_definition(&NewDefinition {
        file_id,
        name: def.name.clone(),
        kind: def.kind,
        start_line: def.start_line,
        end_line: def.end_line,
        source_code: def.source_code.clone(),
        source_code_hash: def.source_code_hash.clone(),
        docstring: def.docstring.clone(),
        is_exported: false,
        is_default_export: false,
    })
}

fn discover_source_files(repo_root: &std::path::Path) -> Vec<String> {
    let mut paths = Vec::new();
    for entry in ignore::WalkBuilder::new(repo_root).hidden(false).build().flatten() {
        if entry.file_type().is_some_and(|t| t.is_file()) {
            if let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) {
                if languages::Language::from_extension(ext).is_some() {
                    if let Ok(rel) = entry.path().strip_prefix(repo_root) {
                        paths.push(rel.to_string_lossy().replace('\\', "/"));
                    }
                }
            }
        }
    }
    paths.sort();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &std::path::Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn full_parse_then_noop_reparse_yields_empty_delta() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "a.py", "def foo():\n    return 1\n");

        let store = Store::open_in_memory().unwrap();
        let delta = full_parse(&store, tmp.path()).unwrap();
        assert!(!delta.is_empty());

        // Re-running "full_parse" semantics on the same store would
        // duplicate inserts (full_parse is only valid for a fresh
        // repository); the no-op case is exercised at the commit-hash
        // level by the orchestrator, not by calling full_parse twice.
        assert_eq!(delta.definitions_added.len(), 1);
    }

    #[test]
    fn rename_only_change_keeps_definition_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "a.js", "function foo() { return 1; }\n");
        let store = Store::open_in_memory().unwrap();
        let initial = full_parse(&store, tmp.path()).unwrap();
        assert_eq!(initial.definitions_added.len(), 1);

        write_file(tmp.path(), "a.js", "function bar() { return 1; }\n");
        let changes = GitChanges {
            modified: vec!["a.js".to_string()],
            ..Default::default()
        };
        let delta = incremental_parse(&store, tmp.path(), &changes).unwrap();

        assert!(delta.definitions_added.is_empty());
        assert!(delta.definitions_removed.is_empty());
        assert_eq!(delta.definitions_unchanged.len(), 1);
    }

    #[test]
    fn body_change_produces_added_and_removed_definition() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "a.js", "function foo() { return 1; }\n");
        let store = Store::open_in_memory().unwrap();
        full_parse(&store, tmp.path()).unwrap();

        write_file(tmp.path(), "a.js", "function foo() { return 2; }\n");
        let changes = GitChanges {
            modified: vec!["a.js".to_string()],
            ..Default::default()
        };
        let delta = incremental_parse(&store, tmp.path(), &changes).unwrap();

        assert_eq!(delta.definitions_added.len(), 1);
        assert_eq!(delta.definitions_removed.len(), 1);
    }
}
