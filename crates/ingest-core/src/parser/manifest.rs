//! Package and workspace discovery (supplemented per SPEC_FULL.md §4.1):
//! walk a checkout for manifest files, create one `Package` row per manifest
//! found, and associate each source file to the innermost package whose
//! directory contains it.

use std::path::Path;

use crate::error::Result;
use crate::model::{Id, Package};
use crate::storage::Store;

const MANIFEST_NAMES: &[(&str, &str)] = &[
    ("package.json", "node"),
    ("Cargo.toml", "cargo"),
    ("pyproject.toml", "python"),
    ("setup.py", "python"),
    ("go.mod", "go"),
];

/// One discovered package, before it is written to the store.
#[derive(Debug, Clone)]
pub struct DiscoveredPackage {
    pub name: String,
    /// Directory the manifest lives in, relative to the repository root.
    pub path: String,
    pub entry_point: Option<String>,
    pub is_workspace_root: bool,
    pub workspace_type: String,
}

/// Walks `repo_root` for manifest files and returns one `DiscoveredPackage`
/// per manifest found, innermost-first not required: callers associate files
/// by longest-prefix match, so discovery order doesn't matter.
pub fn discover_packages(repo_root: &Path) -> Vec<DiscoveredPackage> {
    let mut packages = Vec::new();

    for entry in ignore::WalkBuilder::new(repo_root).hidden(false).build().flatten() {
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        let Some((_, workspace_type)) = MANIFEST_NAMES.iter().find(|(name, _)| *name == file_name)
        else {
            continue;
        };

        let manifest_dir = entry.path().parent().unwrap_or(repo_root);
        let Ok(rel_dir) = manifest_dir.strip_prefix(repo_root) else {
            continue;
        };
        let rel_dir_str = rel_dir.to_string_lossy().replace('\\', "/");
        let is_workspace_root = rel_dir_str.is_empty();
        let name = package_name(entry.path(), manifest_dir, is_workspace_root);

        packages.push(DiscoveredPackage {
            name,
            path: rel_dir_str,
            entry_point: None,
            is_workspace_root,
            workspace_type: workspace_type.to_string(),
        });
    }

    packages
}

/// Best-effort package name: the containing directory name, or the
/// repository root's own directory name for a root-level manifest.
fn package_name(manifest_path: &Path, manifest_dir: &Path, is_root: bool) -> String {
    if is_root {
        manifest_path
            .parent()
            .and_then(|p| p.canonicalize().ok())
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "root".to_string())
    } else {
        manifest_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "package".to_string())
    }
}

/// Persists `discovered` packages under `repository_id` and returns them
/// paired with their assigned ids, sorted longest-path-first so
/// `assign_file_to_package` can do a simple linear longest-prefix scan.
pub fn persist_packages(
    store: &Store,
    repository_id: Id,
    discovered: Vec<DiscoveredPackage>,
) -> Result<Vec<(Package, Id)>> {
    let mut result = Vec::with_capacity(discovered.len());
    for pkg in discovered {
        let mut record = Package {
            id: 0,
            repository_id,
            name: pkg.name,
            path: pkg.path,
            entry_point: pkg.entry_point,
            is_workspace_root: pkg.is_workspace_root,
            workspace_type: Some(pkg.workspace_type),
        };
        let id = store.upsert_package(&record)?;
        record.id = id;
        result.push((record, id));
    }
    result.sort_by(|a, b| b.0.path.len().cmp(&a.0.path.len()));
    Ok(result)
}

/// Finds the innermost package whose directory contains `file_path`
/// (a repository-relative path), given `packages` sorted longest-path-first.
pub fn assign_file_to_package(file_path: &str, packages: &[(Package, Id)]) -> Option<Id> {
    packages
        .iter()
        .find(|(pkg, _)| {
            pkg.path.is_empty() || file_path.starts_with(&format!("{}/", pkg.path))
        })
        .map(|(_, id)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn discovers_root_and_nested_manifests() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "Cargo.toml", "[workspace]\n");
        write_file(tmp.path(), "crates/sub/Cargo.toml", "[package]\nname=\"sub\"\n");

        let found = discover_packages(tmp.path());
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|p| p.is_workspace_root));
        assert!(found.iter().any(|p| p.path == "crates/sub"));
    }

    #[test]
    fn assigns_file_to_innermost_package() {
        let store = Store::open_in_memory().unwrap();
        let repo_id = store.create_repository("https://example.com/r.git", "r", "main").unwrap();

        let discovered = vec![
            DiscoveredPackage {
                name: "root".into(),
                path: "".into(),
                entry_point: None,
                is_workspace_root: true,
                workspace_type: "cargo".into(),
            },
            DiscoveredPackage {
                name: "sub".into(),
                path: "crates/sub".into(),
                entry_point: None,
                is_workspace_root: false,
                workspace_type: "cargo".into(),
            },
        ];
        let packages = persist_packages(&store, repo_id, discovered).unwrap();

        let root_pkg_id = packages.iter().find(|(p, _)| p.path.is_empty()).unwrap().1;
        let sub_pkg_id = packages.iter().find(|(p, _)| p.path == "crates/sub").unwrap().1;

        assert_eq!(assign_file_to_package("crates/sub/src/lib.rs", &packages), Some(sub_pkg_id));
        assert_eq!(assign_file_to_package("src/main.rs", &packages), Some(root_pkg_id));
    }
}
