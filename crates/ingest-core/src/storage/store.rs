//! The relational store: one SQLite connection per repository database,
//! tuned the way the reference implementation's `DatabaseManager` tunes its
//! connection (WAL journaling, foreign keys on, a sane cache size).

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::model::{
    Definition, DefinitionDependency, DefinitionKind, EntityType, File, FileDependency, Id,
    Package, Reference, ReferenceType, Repository,
};

use super::schema::ALL_SCHEMA_STATEMENTS;
use super::vector::{squared_euclidean_distance, unpack_vector, NearestNeighbor};

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Self::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Self::migrate(&conn)?;
        Ok(Self { conn })
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "cache_size", -10_000)?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        Ok(())
    }

    fn migrate(conn: &Connection) -> Result<()> {
        for stmt in ALL_SCHEMA_STATEMENTS {
            conn.execute_batch(stmt)?;
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    // ---- Repository -----------------------------------------------------

    pub fn get_repository_by_slug(&self, slug: &str) -> Result<Option<Repository>> {
        self.conn
            .query_row(
                "SELECT id, remote_url, slug, commit_hash, default_branch FROM repositories WHERE slug = ?1",
                params![slug],
                |row| {
                    Ok(Repository {
                        id: row.get(0)?,
                        remote_url: row.get(1)?,
                        slug: row.get(2)?,
                        commit_hash: row.get(3)?,
                        default_branch: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn create_repository(&self, remote_url: &str, slug: &str, default_branch: &str) -> Result<Id> {
        self.conn.execute(
            "INSERT INTO repositories (remote_url, slug, default_branch) VALUES (?1, ?2, ?3)",
            params![remote_url, slug, default_branch],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn set_commit_hash(&self, repository_id: Id, commit_hash: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE repositories SET commit_hash = ?1 WHERE id = ?2",
            params![commit_hash, repository_id],
        )?;
        Ok(())
    }

    // ---- Package ----------------------------------------------------------

    pub fn upsert_package(&self, pkg: &Package) -> Result<Id> {
        self.conn.execute(
            "INSERT INTO packages (repository_id, name, path, entry_point, is_workspace_root, workspace_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(repository_id, path) DO UPDATE SET
                name = excluded.name,
                entry_point = excluded.entry_point,
                is_workspace_root = excluded.is_workspace_root,
                workspace_type = excluded.workspace_type",
            params![
                pkg.repository_id,
                pkg.name,
                pkg.path,
                pkg.entry_point,
                pkg.is_workspace_root,
                pkg.workspace_type,
            ],
        )?;
        self.conn
            .query_row(
                "SELECT id FROM packages WHERE repository_id = ?1 AND path = ?2",
                params![pkg.repository_id, pkg.path],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    // ---- File ---------------------------------------------------------

    pub fn get_file_by_path(&self, file_path: &str) -> Result<Option<File>> {
        self.conn
            .query_row(
                "SELECT id, package_id, file_path, language, file_content, ai_summary, ai_short_summary
                 FROM files WHERE file_path = ?1",
                params![file_path],
                Self::row_to_file,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn get_file(&self, id: Id) -> Result<Option<File>> {
        self.conn
            .query_row(
                "SELECT id, package_id, file_path, language, file_content, ai_summary, ai_short_summary
                 FROM files WHERE id = ?1",
                params![id],
                Self::row_to_file,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_files(&self) -> Result<Vec<File>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, package_id, file_path, language, file_content, ai_summary, ai_short_summary FROM files",
        )?;
        let rows = stmt.query_map([], Self::row_to_file)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn insert_file(&self, package_id: Option<Id>, file_path: &str, language: &str, content: &str) -> Result<Id> {
        self.conn.execute(
            "INSERT INTO files (package_id, file_path, language, file_content) VALUES (?1, ?2, ?3, ?4)",
            params![package_id, file_path, language, content],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn rename_file(&self, old_path: &str, new_path: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE files SET file_path = ?1 WHERE file_path = ?2",
            params![new_path, old_path],
        )?;
        Ok(())
    }

    pub fn delete_file_by_path(&self, file_path: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM files WHERE file_path = ?1", params![file_path])?;
        Ok(())
    }

    pub fn set_file_summary(&self, file_id: Id, short: &str, full: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE files SET ai_short_summary = ?1, ai_summary = ?2 WHERE id = ?3",
            params![short, full, file_id],
        )?;
        Ok(())
    }

    fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<File> {
        Ok(File {
            id: row.get(0)?,
            package_id: row.get(1)?,
            file_path: row.get(2)?,
            language: row.get(3)?,
            file_content: row.get(4)?,
            ai_summary: row.get(5)?,
            ai_short_summary: row.get(6)?,
        })
    }

    // ---- Definition -----------------------------------------------------

    pub fn get_definitions_for_file(&self, file_id: Id) -> Result<Vec<Definition>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_id, name, kind, start_line, end_line, source_code, source_code_hash,
                    docstring, is_exported, is_default_export, ai_summary, ai_short_summary
             FROM definitions WHERE file_id = ?1",
        )?;
        let rows = stmt.query_map(params![file_id], Self::row_to_definition)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// All definitions currently in the store, across every file.
    pub fn list_definitions(&self) -> Result<Vec<Definition>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_id, name, kind, start_line, end_line, source_code, source_code_hash,
                    docstring, is_exported, is_default_export, ai_summary, ai_short_summary
             FROM definitions",
        )?;
        let rows = stmt.query_map([], Self::row_to_definition)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn get_definition(&self, id: Id) -> Result<Option<Definition>> {
        self.conn
            .query_row(
                "SELECT id, file_id, name, kind, start_line, end_line, source_code, source_code_hash,
                        docstring, is_exported, is_default_export, ai_summary, ai_short_summary
                 FROM definitions WHERE id = ?1",
                params![id],
                Self::row_to_definition,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn insert_definition(&self, def: &NewDefinition) -> Result<Id> {
        self.conn.execute(
            "INSERT INTO definitions
                (file_id, name, kind, start_line, end_line, source_code, source_code_hash,
                 docstring, is_exported, is_default_export)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                def.file_id,
                def.name,
                def.kind.as_str(),
                def.start_line,
                def.end_line,
                def.source_code,
                def.source_code_hash,
                def.docstring,
                def.is_exported,
                def.is_default_export,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn delete_definition(&self, id: Id) -> Result<()> {
        self.conn.execute("DELETE FROM definitions WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn set_definition_summary(&self, definition_id: Id, short: &str, full: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE definitions SET ai_short_summary = ?1, ai_summary = ?2 WHERE id = ?3",
            params![short, full, definition_id],
        )?;
        Ok(())
    }

    fn row_to_definition(row: &rusqlite::Row) -> rusqlite::Result<Definition> {
        let kind_str: String = row.get(3)?;
        let kind = DefinitionKind::from_str(&kind_str).unwrap_or(DefinitionKind::Variable);
        Ok(Definition {
            id: row.get(0)?,
            file_id: row.get(1)?,
            name: row.get(2)?,
            kind,
            start_line: row.get(4)?,
            end_line: row.get(5)?,
            source_code: row.get(6)?,
            source_code_hash: row.get(7)?,
            docstring: row.get(8)?,
            is_exported: row.get(9)?,
            is_default_export: row.get(10)?,
            ai_summary: row.get(11)?,
            ai_short_summary: row.get(12)?,
        })
    }

    // ---- Reference ------------------------------------------------------

    pub fn insert_reference(
        &self,
        source_definition_id: Id,
        target_definition_id: Option<Id>,
        reference_name: &str,
        reference_type: ReferenceType,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO \"references\" (source_definition_id, target_definition_id, reference_name, reference_type)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(source_definition_id, target_definition_id) DO NOTHING",
            params![source_definition_id, target_definition_id, reference_name, reference_type.as_str()],
        )?;
        Ok(())
    }

    pub fn list_resolved_references(&self) -> Result<Vec<Reference>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source_definition_id, target_definition_id, reference_name, reference_type
             FROM \"references\" WHERE target_definition_id IS NOT NULL",
        )?;
        let rows = stmt.query_map([], |row| {
            let ref_type: String = row.get(4)?;
            Ok(Reference {
                id: row.get(0)?,
                source_definition_id: row.get(1)?,
                target_definition_id: row.get(2)?,
                reference_name: row.get(3)?,
                reference_type: ReferenceType::from_str(&ref_type).unwrap_or(ReferenceType::Unknown),
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    // ---- Dependency edges (rebuilt from scratch each run; see SPEC_FULL §9) ----

    pub fn rebuild_definition_dependencies(&self, edges: &[(Id, Id)]) -> Result<()> {
        self.conn.execute("DELETE FROM definition_dependencies", [])?;
        for (from, to) in edges {
            self.conn.execute(
                "INSERT OR IGNORE INTO definition_dependencies (from_definition_id, to_definition_id) VALUES (?1, ?2)",
                params![from, to],
            )?;
        }
        Ok(())
    }

    pub fn rebuild_file_dependencies(&self, edges: &[(Id, Id)]) -> Result<()> {
        self.conn.execute("DELETE FROM file_dependencies", [])?;
        for (from, to) in edges {
            self.conn.execute(
                "INSERT OR IGNORE INTO file_dependencies (from_file_id, to_file_id) VALUES (?1, ?2)",
                params![from, to],
            )?;
        }
        Ok(())
    }

    pub fn list_definition_dependencies(&self) -> Result<Vec<DefinitionDependency>> {
        let mut stmt = self
            .conn
            .prepare("SELECT from_definition_id, to_definition_id FROM definition_dependencies")?;
        let rows = stmt.query_map([], |row| {
            Ok(DefinitionDependency {
                from_definition_id: row.get(0)?,
                to_definition_id: row.get(1)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn list_file_dependencies(&self) -> Result<Vec<FileDependency>> {
        let mut stmt = self
            .conn
            .prepare("SELECT from_file_id, to_file_id FROM file_dependencies")?;
        let rows = stmt.query_map([], |row| {
            Ok(FileDependency {
                from_file_id: row.get(0)?,
                to_file_id: row.get(1)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    // ---- Embeddings -------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn upsert_embedding(
        &self,
        entity_type: EntityType,
        entity_id: Id,
        vector_bytes: &[u8],
        embedding_model: &str,
        embedding_dims: u32,
        entity_name: &str,
        file_path: &str,
        language: Option<&str>,
        definition_type: Option<&str>,
    ) -> Result<Id> {
        self.conn.execute(
            "INSERT INTO embeddings
                (entity_type, entity_id, embedding, embedding_model, embedding_dims,
                 entity_name, file_path, language, definition_type, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
             ON CONFLICT(entity_type, entity_id) DO UPDATE SET
                embedding = excluded.embedding,
                embedding_model = excluded.embedding_model,
                embedding_dims = excluded.embedding_dims,
                entity_name = excluded.entity_name,
                file_path = excluded.file_path,
                language = excluded.language,
                definition_type = excluded.definition_type,
                updated_at = excluded.updated_at",
            params![
                entity_type.as_str(),
                entity_id,
                vector_bytes,
                embedding_model,
                embedding_dims,
                entity_name,
                file_path,
                language,
                definition_type,
            ],
        )?;
        self.conn
            .query_row(
                "SELECT id FROM embeddings WHERE entity_type = ?1 AND entity_id = ?2",
                params![entity_type.as_str(), entity_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Brute-force k-NN scan over the embeddings table, ascending by
    /// distance, optionally filtered to one entity type.
    pub fn nearest_neighbors(
        &self,
        query_vector: &[f32],
        top_k: usize,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<NearestNeighbor>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, entity_type, entity_id, embedding FROM embeddings")?;
        let rows = stmt.query_map([], |row| {
            let et: String = row.get(1)?;
            let bytes: Vec<u8> = row.get(3)?;
            Ok((row.get::<_, Id>(0)?, et, row.get::<_, Id>(2)?, bytes))
        })?;

        let mut candidates = Vec::new();
        for row in rows {
            let (embedding_id, et_str, entity_id, bytes) = row?;
            let et = EntityType::from_str(&et_str).unwrap_or(EntityType::File);
            if let Some(filter) = entity_type {
                if et != filter {
                    continue;
                }
            }
            let vector = unpack_vector(&bytes);
            let distance = squared_euclidean_distance(query_vector, &vector);
            candidates.push(NearestNeighbor {
                embedding_id,
                entity_type: et,
                entity_id,
                distance,
            });
        }

        candidates.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(top_k);
        Ok(candidates)
    }

    /// BM25-ranked full-text search over definition names.
    pub fn fts_search_definitions(&self, query: &str, top_k: usize) -> Result<Vec<(Id, f32)>> {
        let mut stmt = self.conn.prepare(
            "SELECT rowid, bm25(definitions_name_fts) AS rank FROM definitions_name_fts
             WHERE definitions_name_fts MATCH ?1 ORDER BY rank LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![query, top_k as i64], |row| {
            Ok((row.get::<_, Id>(0)?, row.get::<_, f64>(1)? as f32))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// BM25-ranked full-text search over file paths.
    pub fn fts_search_files(&self, query: &str, top_k: usize) -> Result<Vec<(Id, f32)>> {
        let mut stmt = self.conn.prepare(
            "SELECT rowid, bm25(files_path_fts) AS rank FROM files_path_fts
             WHERE files_path_fts MATCH ?1 ORDER BY rank LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![query, top_k as i64], |row| {
            Ok((row.get::<_, Id>(0)?, row.get::<_, f64>(1)? as f32))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }
}

/// Fields needed to insert a brand-new definition row (no id yet).
pub struct NewDefinition {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let id = store.create_repository("https://example.com/r.git", "r", "main").unwrap();
        let repo = store.get_repository_by_slug("r").unwrap().unwrap();
        assert_eq!(repo.id, id);
        assert_eq!(repo.commit_hash, None);

        store.set_commit_hash(id, "abc123").unwrap();
        let repo = store.get_repository_by_slug("r").unwrap().unwrap();
        assert_eq!(repo.commit_hash, Some("abc123".to_string()));
    }

    #[test]
    fn file_cascade_deletes_definitions() {
        let store = Store::open_in_memory().unwrap();
        let file_id = store.insert_file(None, "a.py", "python", "def foo(): pass").unwrap();
        store
            .insert_definition(&NewDefinition {
                file_id,
                name: "foo".into(),
                kind: DefinitionKind::Function,
                start_line: 1,
                end_line: 1,
                source_code: "def foo(): pass".into(),
                source_code_hash: "h".into(),
                docstring: None,
                is_exported: false,
                is_default_export: false,
            })
            .unwrap();

        assert_eq!(store.get_definitions_for_file(file_id).unwrap().len(), 1);
        store.delete_file_by_path("a.py").unwrap();
        assert_eq!(store.get_definitions_for_file(file_id).unwrap().len(), 0);
    }

    #[test]
    fn embedding_upsert_is_idempotent_on_conflict() {
        let store = Store::open_in_memory().unwrap();
        let file_id = store.insert_file(None, "a.py", "python", "x = 1").unwrap();
        let id1 = store
            .upsert_embedding(EntityType::File, file_id, &[1, 2, 3, 4], "m", 1, "a.py", "a.py", Some("python"), None)
            .unwrap();
        let id2 = store
            .upsert_embedding(EntityType::File, file_id, &[5, 6, 7, 8], "m", 1, "a.py", "a.py", Some("python"), None)
            .unwrap();
        assert_eq!(id1, id2, "upsert on the same (entity_type, entity_id) must not create a new row");
    }
}
