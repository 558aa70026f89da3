//! Data model for the ingestion store.
//!
//! Mirrors the relational schema 1:1: each struct here is a row, each enum a
//! constrained text column. Enums serialize to/from their lowercase SQL text
//! representation via `as_str`/`from_str`, following the same idiom the
//! dependency graph types use for `EdgeType`/`NodeType`.

use std::fmt;

/// Opaque row id, unique within the store for the entity it identifies.
pub type Id = i64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Copy)]
pub enum DefinitionKind {
    Function,
    Method,
    Class,
    Interface,
    TypeAlias,
    Enum,
    Module,
    Constant,
    Variable,
}

impl DefinitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionKind::Function => "function",
            DefinitionKind::Method => "method",
            DefinitionKind::Class => "class",
            DefinitionKind::Interface => "interface",
            DefinitionKind::TypeAlias => "type_alias",
            DefinitionKind::Enum => "enum",
            DefinitionKind::Module => "module",
            DefinitionKind::Constant => "constant",
            DefinitionKind::Variable => "variable",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "function" => DefinitionKind::Function,
            "method" => DefinitionKind::Method,
            "class" => DefinitionKind::Class,
            "interface" => DefinitionKind::Interface,
            "type_alias" => DefinitionKind::TypeAlias,
            "enum" => DefinitionKind::Enum,
            "module" => DefinitionKind::Module,
            "constant" => DefinitionKind::Constant,
            "variable" => DefinitionKind::Variable,
            _ => return None,
        })
    }
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    Local,
    Imported,
    Unknown,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Local => "local",
            ReferenceType::Imported => "imported",
            ReferenceType::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "local" => ReferenceType::Local,
            "imported" => ReferenceType::Imported,
            "unknown" => ReferenceType::Unknown,
            _ => return None,
        })
    }
}

/// Either side of the polymorphic summarization/embedding surface (see
/// `Entity` in the summarizer crate, which carries the same tag plus the
/// entity's data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    File,
    Definition,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::File => "file",
            EntityType::Definition => "definition",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "file" => EntityType::File,
            "definition" => EntityType::Definition,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Repository {
    pub id: Id,
    pub remote_url: String,
    pub slug: String,
    pub commit_hash: Option<String>,
    pub default_branch: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub id: Id,
    pub repository_id: Id,
    pub name: String,
    pub path: String,
    pub entry_point: Option<String>,
    pub is_workspace_root: bool,
    pub workspace_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub id: Id,
    pub package_id: Option<Id>,
    pub file_path: String,
    pub language: String,
    pub file_content: String,
    pub ai_summary: Option<String>,
    pub ai_short_summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub id: Id,
    pub file_id: Id,
    pub name: String,
    pub kind: DefinitionKind,
    pub start_line: u32,
    pub end_line: u32,
    pub source_code: String,
    pub source_code_hash: String,
    pub docstring: Option<String>,
    pub is_exported: bool,
    pub is_default_export: bool,
    pub ai_summary: Option<String>,
    pub ai_short_summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub id: Id,
    pub source_definition_id: Id,
    pub target_definition_id: Option<Id>,
    pub reference_name: String,
    pub reference_type: ReferenceType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinitionDependency {
    pub from_definition_id: Id,
    pub to_definition_id: Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDependency {
    pub from_file_id: Id,
    pub to_file_id: Id,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub id: Id,
    pub entity_type: EntityType,
    pub entity_id: Id,
    pub embedding: Vec<u8>,
    pub embedding_model: String,
    pub embedding_dims: u32,
    pub entity_name: String,
    pub file_path: String,
    pub language: Option<String>,
    pub definition_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_kind_round_trips() {
        for kind in [
            DefinitionKind::Function,
            DefinitionKind::Method,
            DefinitionKind::Class,
            DefinitionKind::Interface,
            DefinitionKind::TypeAlias,
            DefinitionKind::Enum,
            DefinitionKind::Module,
            DefinitionKind::Constant,
            DefinitionKind::Variable,
        ] {
            assert_eq!(DefinitionKind::from_str(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn reference_type_rejects_unknown_text() {
        assert_eq!(ReferenceType::from_str("bogus"), None);
    }
}
