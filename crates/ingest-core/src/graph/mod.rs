//! Dependency graphs over `Definition`s and `File`s, and the batched
//! traversal order the summarizer and embedder schedule work from.
//!
//! Grounded on the teacher's `PetCodeGraph` (a `petgraph::StableGraph` over
//! `Node`/`Edge` types) generalized to the two concrete entities this system
//! tracks, plus `petgraph::algo`'s own Tarjan SCC and condensation.

pub mod build;
pub mod delta_subgraph;
pub mod traversal;

pub use build::{build_definition_graph, build_file_graph};
pub use delta_subgraph::ancestor_closure;
pub use traversal::{DefinitionGraph, FileGraph, Levels};
