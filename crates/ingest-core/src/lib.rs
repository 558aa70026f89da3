//! Core ingestion primitives: tree-sitter parsing, the relational store and
//! its colocated full-text/vector indexes, dependency graph construction,
//! and the rate-limited level-execution runtime the summarizer and embedder
//! schedule work through.

pub mod concurrency;
pub mod error;
pub mod graph;
pub mod hash;
pub mod model;
pub mod parser;
pub mod storage;

pub use concurrency::{run_level, run_levels, BatchError, LevelError, RateBudget};
pub use error::{CoreError, Result};
pub use graph::{
    ancestor_closure, build_definition_graph, build_file_graph, DefinitionGraph, FileGraph, Levels,
};
pub use model::{
    Definition, DefinitionDependency, DefinitionKind, Embedding, EntityType, File,
    FileDependency, Id, Package, Reference, ReferenceType, Repository,
};
pub use parser::delta::{full_parse, incremental_parse, GitChanges, ParseDelta, RenamedFile};
pub use parser::languages::Language;
pub use parser::manifest::{assign_file_to_package, discover_packages, persist_packages};
pub use parser::occurrences::extract_occurrences;
pub use parser::resolver::{resolve_references, RawOccurrence};
pub use parser::{parse_file, FileParseResult, RawDefinition};
pub use storage::{NewDefinition, Store};
