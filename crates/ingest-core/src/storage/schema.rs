//! SQLite schema definitions for the ingestion store.
//!
//! One self-contained database per repository slug (`W/S.db`). Tables cover
//! the relational data model; `definitions_name_fts`/`files_path_fts` are
//! FTS5 virtual tables kept in sync via triggers; `embeddings_vec` holds the
//! packed vectors scanned for k-NN (see `storage::vector` for the scan
//! strategy — this workspace has no `sqlite-vec` extension available, so the
//! "vector index" is an ordinary table scored in-process rather than a
//! virtual table, per the Open Question resolution in SPEC_FULL.md §9).

/// Schema version for repository databases.
pub const SCHEMA_VERSION: &str = "1.0";

pub const SCHEMA_CREATE_REPOSITORIES: &str = r#"
CREATE TABLE IF NOT EXISTS repositories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_url TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    commit_hash TEXT,
    default_branch TEXT NOT NULL
)
"#;

pub const SCHEMA_CREATE_PACKAGES: &str = r#"
CREATE TABLE IF NOT EXISTS packages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repository_id INTEGER NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    path TEXT NOT NULL,
    entry_point TEXT,
    is_workspace_root INTEGER NOT NULL DEFAULT 0,
    workspace_type TEXT,
    UNIQUE(repository_id, path)
)
"#;

pub const SCHEMA_CREATE_FILES: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    package_id INTEGER REFERENCES packages(id) ON DELETE SET NULL,
    file_path TEXT NOT NULL UNIQUE,
    language TEXT NOT NULL,
    file_content TEXT NOT NULL,
    ai_summary TEXT,
    ai_short_summary TEXT
)
"#;

pub const SCHEMA_CREATE_DEFINITIONS: &str = r#"
CREATE TABLE IF NOT EXISTS definitions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    source_code TEXT NOT NULL,
    source_code_hash TEXT NOT NULL,
    docstring TEXT,
    is_exported INTEGER NOT NULL DEFAULT 0,
    is_default_export INTEGER NOT NULL DEFAULT 0,
    ai_summary TEXT,
    ai_short_summary TEXT,
    UNIQUE(file_id, name, start_line, kind),
    CHECK(start_line <= end_line)
)
"#;

pub const SCHEMA_CREATE_REFERENCES: &str = r#"
CREATE TABLE IF NOT EXISTS "references" (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_definition_id INTEGER NOT NULL REFERENCES definitions(id) ON DELETE CASCADE,
    target_definition_id INTEGER REFERENCES definitions(id) ON DELETE SET NULL,
    reference_name TEXT NOT NULL,
    reference_type TEXT NOT NULL CHECK(reference_type IN ('local', 'imported', 'unknown')),
    UNIQUE(source_definition_id, target_definition_id)
)
"#;

pub const SCHEMA_CREATE_DEFINITION_DEPENDENCIES: &str = r#"
CREATE TABLE IF NOT EXISTS definition_dependencies (
    from_definition_id INTEGER NOT NULL REFERENCES definitions(id) ON DELETE CASCADE,
    to_definition_id INTEGER NOT NULL REFERENCES definitions(id) ON DELETE CASCADE,
    PRIMARY KEY (from_definition_id, to_definition_id)
)
"#;

pub const SCHEMA_CREATE_FILE_DEPENDENCIES: &str = r#"
CREATE TABLE IF NOT EXISTS file_dependencies (
    from_file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    to_file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    PRIMARY KEY (from_file_id, to_file_id)
)
"#;

pub const SCHEMA_CREATE_EMBEDDINGS: &str = r#"
CREATE TABLE IF NOT EXISTS embeddings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_type TEXT NOT NULL CHECK(entity_type IN ('file', 'definition')),
    entity_id INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    embedding_model TEXT NOT NULL,
    embedding_dims INTEGER NOT NULL,
    entity_name TEXT NOT NULL,
    file_path TEXT NOT NULL,
    language TEXT,
    definition_type TEXT,
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    UNIQUE(entity_type, entity_id)
)
"#;

pub const SCHEMA_CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_definitions_file ON definitions(file_id);
CREATE INDEX IF NOT EXISTS idx_definitions_hash ON definitions(source_code_hash);
CREATE INDEX IF NOT EXISTS idx_references_source ON "references"(source_definition_id);
CREATE INDEX IF NOT EXISTS idx_references_target ON "references"(target_definition_id);
CREATE INDEX IF NOT EXISTS idx_definition_deps_from ON definition_dependencies(from_definition_id);
CREATE INDEX IF NOT EXISTS idx_definition_deps_to ON definition_dependencies(to_definition_id);
CREATE INDEX IF NOT EXISTS idx_file_deps_from ON file_dependencies(from_file_id);
CREATE INDEX IF NOT EXISTS idx_file_deps_to ON file_dependencies(to_file_id);
CREATE INDEX IF NOT EXISTS idx_embeddings_entity ON embeddings(entity_type, entity_id);
"#;

/// FTS5 index over definition names, content-synced from `definitions` via
/// triggers (same `content=`/`content_rowid=` pattern as the reference
/// implementation's `definitions_name_fts`).
pub const SCHEMA_CREATE_DEFINITIONS_FTS: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS definitions_name_fts USING fts5(
    name,
    content='definitions',
    content_rowid='id',
    tokenize="unicode61 remove_diacritics 2"
);

CREATE TRIGGER IF NOT EXISTS definitions_name_fts_ai AFTER INSERT ON definitions BEGIN
    INSERT INTO definitions_name_fts(rowid, name) VALUES (new.id, new.name);
END;

CREATE TRIGGER IF NOT EXISTS definitions_name_fts_ad AFTER DELETE ON definitions BEGIN
    INSERT INTO definitions_name_fts(definitions_name_fts, rowid, name) VALUES ('delete', old.id, old.name);
END;

CREATE TRIGGER IF NOT EXISTS definitions_name_fts_au AFTER UPDATE ON definitions BEGIN
    INSERT INTO definitions_name_fts(definitions_name_fts, rowid, name) VALUES ('delete', old.id, old.name);
    INSERT INTO definitions_name_fts(rowid, name) VALUES (new.id, new.name);
END;
"#;

pub const SCHEMA_CREATE_FILES_FTS: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS files_path_fts USING fts5(
    file_path,
    content='files',
    content_rowid='id',
    tokenize="unicode61 remove_diacritics 2"
);

CREATE TRIGGER IF NOT EXISTS files_path_fts_ai AFTER INSERT ON files BEGIN
    INSERT INTO files_path_fts(rowid, file_path) VALUES (new.id, new.file_path);
END;

CREATE TRIGGER IF NOT EXISTS files_path_fts_ad AFTER DELETE ON files BEGIN
    INSERT INTO files_path_fts(files_path_fts, rowid, file_path) VALUES ('delete', old.id, old.file_path);
END;

CREATE TRIGGER IF NOT EXISTS files_path_fts_au AFTER UPDATE ON files BEGIN
    INSERT INTO files_path_fts(files_path_fts, rowid, file_path) VALUES ('delete', old.id, old.file_path);
    INSERT INTO files_path_fts(rowid, file_path) VALUES (new.id, new.file_path);
END;
"#;

pub const SCHEMA_CREATE_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS store_metadata (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)
"#;

/// Every DDL statement, in dependency order, for a fresh database.
pub const ALL_SCHEMA_STATEMENTS: &[&str] = &[
    SCHEMA_CREATE_REPOSITORIES,
    SCHEMA_CREATE_PACKAGES,
    SCHEMA_CREATE_FILES,
    SCHEMA_CREATE_DEFINITIONS,
    SCHEMA_CREATE_REFERENCES,
    SCHEMA_CREATE_DEFINITION_DEPENDENCIES,
    SCHEMA_CREATE_FILE_DEPENDENCIES,
    SCHEMA_CREATE_EMBEDDINGS,
    SCHEMA_CREATE_INDEXES,
    SCHEMA_CREATE_DEFINITIONS_FTS,
    SCHEMA_CREATE_FILES_FTS,
    SCHEMA_CREATE_METADATA,
];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        for stmt in ALL_SCHEMA_STATEMENTS {
            conn.execute_batch(stmt).unwrap();
        }

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for expected in [
            "repositories",
            "packages",
            "files",
            "definitions",
            "references",
            "definition_dependencies",
            "file_dependencies",
            "embeddings",
            "store_metadata",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table {expected}");
        }
    }

    #[test]
    fn fts_tables_stay_in_sync_with_base_tables() {
        let conn = Connection::open_in_memory().unwrap();
        for stmt in ALL_SCHEMA_STATEMENTS {
            conn.execute_batch(stmt).unwrap();
        }

        conn.execute(
            "INSERT INTO repositories (remote_url, slug, default_branch) VALUES ('u', 's', 'main')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO files (file_path, language, file_content) VALUES ('a.py', 'python', 'x = 1')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO definitions (file_id, name, kind, start_line, end_line, source_code, source_code_hash)
             VALUES (1, 'foo', 'function', 1, 1, 'def foo(): pass', 'h1')",
            [],
        )
        .unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM definitions_name_fts WHERE definitions_name_fts MATCH 'foo'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);

        conn.execute("DELETE FROM definitions WHERE id = 1", []).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM definitions_name_fts WHERE definitions_name_fts MATCH 'foo'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }
}
