//! Extension-to-grammar registry and the query set each grammar exposes.
//!
//! The grammar queries themselves are assumed input per SPEC_FULL.md §1/§6
//! ("the tree-sitter grammar queries themselves" are an external
//! collaborator); the queries embedded here are a representative working
//! set covering the kinds in `DefinitionKind`, following the same
//! `def_<kind>` / `name_<kind>` (fallback `name`) / `doc` capture-naming
//! contract the parser is specified to rely on.

use crate::error::{CoreError, Result};
use crate::model::DefinitionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Rust,
    Go,
    C,
    Cpp,
    CSharp,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        Some(match ext {
            "py" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" => Language::TypeScript,
            "tsx" => Language::Tsx,
            "rs" => Language::Rust,
            "go" => Language::Go,
            "c" | "h" => Language::C,
            "cc" | "cpp" | "cxx" | "hpp" => Language::Cpp,
            "cs" => Language::CSharp,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
        }
    }

    pub fn grammar(&self) -> Result<tree_sitter::Language> {
        let lang = match self {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::C => tree_sitter_c::LANGUAGE.into(),
            Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Language::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
        };
        Ok(lang)
    }

    /// The grammar's query set, naming captures `def_<kind>` / `name_<kind>`
    /// (or a bare `name` fallback) / optional `doc`, per the parser's
    /// capture-name contract.
    pub fn query_source(&self) -> &'static str {
        match self {
            Language::Python => PYTHON_QUERY,
            Language::JavaScript | Language::Tsx => JAVASCRIPT_QUERY,
            Language::TypeScript => TYPESCRIPT_QUERY,
            Language::Rust => RUST_QUERY,
            Language::Go => GO_QUERY,
            Language::C | Language::Cpp => C_FAMILY_QUERY,
            Language::CSharp => C_SHARP_QUERY,
        }
    }
}

/// The query-set `KINDS` that a `def_<kind>` capture may legally name; kept
/// in lockstep with `DefinitionKind`.
pub const KINDS: &[DefinitionKind] = &[
    DefinitionKind::Function,
    DefinitionKind::Method,
    DefinitionKind::Class,
    DefinitionKind::Interface,
    DefinitionKind::TypeAlias,
    DefinitionKind::Enum,
    DefinitionKind::Module,
    DefinitionKind::Constant,
    DefinitionKind::Variable,
];

pub(crate) const PYTHON_QUERY: &str = r#"
(function_definition
  name: (identifier) @name_function) @def_function

(class_definition
  name: (identifier) @name_class) @def_class

(assignment
  left: (identifier) @name_variable) @def_variable
"#;

pub(crate) const JAVASCRIPT_QUERY: &str = r#"
(function_declaration
  name: (identifier) @name_function) @def_function

(method_definition
  name: (property_identifier) @name_method) @def_method

(class_declaration
  name: (identifier) @name_class) @def_class

(lexical_declaration
  (variable_declarator
    name: (identifier) @name_variable)) @def_variable
"#;

pub(crate) const TYPESCRIPT_QUERY: &str = r#"
(function_declaration
  name: (identifier) @name_function) @def_function

(method_definition
  name: (property_identifier) @name_method) @def_method

(class_declaration
  name: (type_identifier) @name_class) @def_class

(interface_declaration
  name: (type_identifier) @name_interface) @def_interface

(type_alias_declaration
  name: (type_identifier) @name_type_alias) @def_type_alias

(enum_declaration
  name: (identifier) @name_enum) @def_enum

(lexical_declaration
  (variable_declarator
    name: (identifier) @name_variable)) @def_variable
"#;

pub(crate) const RUST_QUERY: &str = r#"
(function_item
  name: (identifier) @name_function) @def_function

(struct_item
  name: (type_identifier) @name_class) @def_class

(enum_item
  name: (type_identifier) @name_enum) @def_enum

(trait_item
  name: (type_identifier) @name_interface) @def_interface

(type_item
  name: (type_identifier) @name_type_alias) @def_type_alias

(mod_item
  name: (identifier) @name_module) @def_module

(const_item
  name: (identifier) @name_constant) @def_constant
"#;

pub(crate) const GO_QUERY: &str = r#"
(function_declaration
  name: (identifier) @name_function) @def_function

(method_declaration
  name: (field_identifier) @name_method) @def_method

(type_declaration
  (type_spec
    name: (type_identifier) @name_class)) @def_class

(const_declaration) @def_constant
"#;

pub(crate) const C_FAMILY_QUERY: &str = r#"
(function_definition
  declarator: (function_declarator
    declarator: (identifier) @name_function)) @def_function

(struct_specifier
  name: (type_identifier) @name_class) @def_class

(enum_specifier
  name: (type_identifier) @name_enum) @def_enum
"#;

pub(crate) const C_SHARP_QUERY: &str = r#"
(method_declaration
  name: (identifier) @name_method) @def_method

(class_declaration
  name: (identifier) @name_class) @def_class

(interface_declaration
  name: (identifier) @name_interface) @def_interface

(enum_declaration
  name: (identifier) @name_enum) @def_enum
"#;

pub fn require_language(ext: &str) -> Result<Language> {
    Language::from_extension(ext).ok_or_else(|| CoreError::UnsupportedExtension(ext.to_string()))
}
