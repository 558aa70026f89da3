//! Materializes the definition and file dependency graphs from the store's
//! resolved references, and persists the derived edge tables.
//!
//! Both tables are treated as caches rebuilt from `References` on every run
//! (truncate-then-rebuild, per the Open Question resolution this system
//! settled on rather than incremental edge maintenance).

use std::collections::HashSet;

use crate::error::Result;
use crate::model::Id;
use crate::storage::Store;

use super::{DefinitionGraph, FileGraph};

/// Builds the definition graph from every resolved reference in the store
/// and persists the edge set into `definition_dependencies`.
pub fn build_definition_graph(store: &Store) -> Result<DefinitionGraph> {
    let definitions = store.list_definitions()?;
    let definition_ids: Vec<Id> = definitions.iter().map(|d| d.id).collect();

    let edges: Vec<(Id, Id)> = store
        .list_resolved_references()?
        .into_iter()
        .filter_map(|r| r.target_definition_id.map(|target| (r.source_definition_id, target)))
        .filter(|(from, to)| from != to)
        .collect();

    store.rebuild_definition_dependencies(&edges)?;

    Ok(DefinitionGraph::new(&definition_ids, &edges))
}

/// Builds the file graph by projecting definition-level edges onto their
/// owning files (`F != G`), and persists the edge set into `file_dependencies`.
pub fn build_file_graph(store: &Store) -> Result<FileGraph> {
    let files = store.list_files()?;
    let file_ids: Vec<Id> = files.iter().map(|f| f.id).collect();

    let definitions = store.list_definitions()?;
    let file_of: std::collections::HashMap<Id, Id> =
        definitions.iter().map(|d| (d.id, d.file_id)).collect();

    let mut seen = HashSet::new();
    let edges: Vec<(Id, Id)> = store
        .list_definition_dependencies()?
        .into_iter()
        .filter_map(|dep| {
            let from_file = *file_of.get(&dep.from_definition_id)?;
            let to_file = *file_of.get(&dep.to_definition_id)?;
            (from_file != to_file).then_some((from_file, to_file))
        })
        .filter(|edge| seen.insert(*edge))
        .collect();

    store.rebuild_file_dependencies(&edges)?;

    Ok(FileGraph::new(&file_ids, &edges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DefinitionKind;
    use crate::storage::NewDefinition;

    fn def(store: &Store, file_id: Id, name: &str) -> Id {
        store
            .insert_definition(&NewDefinition {
                file_id,
                name: name.into(),
                kind: DefinitionKind::Function,
                start_line: 1,
                end_line: 2,
                source_code: "fn f() {}".into(),
                source_code_hash: format!("hash-{name}"),
                docstring: None,
                is_exported: true,
                is_default_export: false,
            })
            .unwrap()
    }

    #[test]
    fn definition_graph_reflects_resolved_references() {
        let store = Store::open_in_memory().unwrap();
        let file_a = store.insert_file(None, "a.rs", "rust", "").unwrap();
        let file_b = store.insert_file(None, "b.rs", "rust", "").unwrap();
        let caller = def(&store, file_a, "caller");
        let callee = def(&store, file_b, "callee");

        store
            .insert_reference(caller, Some(callee), "callee", crate::model::ReferenceType::Local)
            .unwrap();

        let graph = build_definition_graph(&store).unwrap();
        assert_eq!(graph.edge_count(), 1);

        let persisted = store.list_definition_dependencies().unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].from_definition_id, caller);
        assert_eq!(persisted[0].to_definition_id, callee);
    }

    #[test]
    fn file_graph_drops_same_file_edges() {
        let store = Store::open_in_memory().unwrap();
        let file_a = store.insert_file(None, "a.rs", "rust", "").unwrap();
        let d1 = def(&store, file_a, "one");
        let d2 = def(&store, file_a, "two");
        store
            .insert_reference(d1, Some(d2), "two", crate::model::ReferenceType::Local)
            .unwrap();

        build_definition_graph(&store).unwrap();
        build_file_graph(&store).unwrap();
        assert_eq!(store.list_file_dependencies().unwrap().len(), 0);
    }
}
