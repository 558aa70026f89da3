//! Definition and file summarization, scheduled level-by-level over the
//! dependency graphs the store already persists.
//!
//! Each level is a list of groups (strongly connected components); a group's
//! cross-group dependencies must already carry a summary before it can be
//! sent to the model, so a definition's or file's dependencies are always
//! summarized first. Dependencies within the same group are tolerated as
//! unresolved, because a group of size > 1 (a dependency cycle) is sent to
//! the model as a single joint prompt covering every member at once, so each
//! member is visible to the others regardless of which one calls which.
//!
//! Per level: pre-fetch the data the level needs, run the model calls
//! concurrently (no `Store` access from inside the spawned tasks, since
//! `rusqlite::Connection` is `!Sync`), then drain the results and persist
//! them serially once the level completes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ingest_core::{
    ancestor_closure, DefinitionGraph, FileGraph, Id, Levels, ParseDelta, RateBudget, Store,
};
use ingest_core::{Definition, File};

use crate::client::LlmClient;
use crate::error::{Result, SummarizerError};
use crate::gist::{parse_gist, parse_joint_gist};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryCounts {
    pub definitions: usize,
    pub files: usize,
    /// Ids of definitions that received a fresh summary this run, in the
    /// order they were written. Callers use this to know what now needs a
    /// fresh embedding, rather than re-embedding the whole store.
    pub definition_ids: Vec<Id>,
    pub file_ids: Vec<Id>,
}

/// Summarizes every definition, then every file, in dependency order.
pub async fn summarize_full(
    store: &Store,
    client: Arc<dyn LlmClient>,
    def_budget: RateBudget,
    file_budget: RateBudget,
) -> Result<SummaryCounts> {
    let definitions = store.list_definitions()?;
    let def_edges = definition_edges(store)?;
    let definition_levels = definition_graph(&definitions, &def_edges).levels();

    let mut definition_cache = seed_definition_cache(&definitions);
    let (definitions_done, definition_ids) = run_definition_levels(
        store,
        client.clone(),
        definition_levels,
        def_budget,
        &mut definition_cache,
    )
    .await?;

    let files = store.list_files()?;
    let file_edges = file_edges(store)?;
    let file_levels = file_graph(&files, &file_edges).levels();

    let mut file_cache = seed_file_cache(&files);
    let (files_done, file_ids) = run_file_levels(
        store,
        client,
        file_levels,
        file_budget,
        &mut file_cache,
        &definition_cache,
    )
    .await?;

    Ok(SummaryCounts { definitions: definitions_done, files: files_done, definition_ids, file_ids })
}

/// Summarizes only what a [`ParseDelta`] says changed, plus everything
/// downstream of that change, in four phases: changed definitions,
/// ancestor definitions, changed files, ancestor files.
pub async fn summarize_incremental(
    store: &Store,
    client: Arc<dyn LlmClient>,
    delta: &ParseDelta,
    def_budget: RateBudget,
    file_budget: RateBudget,
) -> Result<SummaryCounts> {
    let definitions = store.list_definitions()?;
    let def_edges = definition_edges(store)?;
    let definition_levels = definition_graph(&definitions, &def_edges).levels();
    let mut definition_cache = seed_definition_cache(&definitions);

    let mut definition_ids = Vec::new();

    let changed_defs = &delta.definitions_added;
    let phase1 = filter_levels(&definition_levels, changed_defs);
    let (mut definitions_done, ids1) =
        run_definition_levels(store, client.clone(), phase1, def_budget, &mut definition_cache)
            .await?;
    definition_ids.extend(ids1);

    let def_ancestors = ancestor_closure(changed_defs, &def_edges);
    let def_rest: HashSet<Id> = def_ancestors
        .difference(changed_defs)
        .copied()
        .filter(|id| !delta.definitions_removed.contains(id))
        .collect();
    let phase2 = filter_levels(&definition_levels, &def_rest);
    let (done2, ids2) =
        run_definition_levels(store, client.clone(), phase2, def_budget, &mut definition_cache)
            .await?;
    definitions_done += done2;
    definition_ids.extend(ids2);

    let files = store.list_files()?;
    let file_edges = file_edges(store)?;
    let file_levels = file_graph(&files, &file_edges).levels();
    let mut file_cache = seed_file_cache(&files);
    let mut file_ids = Vec::new();

    let changed_files = changed_file_ids(store, delta)?;
    let phase3 = filter_levels(&file_levels, &changed_files);
    let (mut files_done, ids3) = run_file_levels(
        store,
        client.clone(),
        phase3,
        file_budget,
        &mut file_cache,
        &definition_cache,
    )
    .await?;
    file_ids.extend(ids3);

    let file_ancestors = ancestor_closure(&changed_files, &file_edges);
    let file_rest: HashSet<Id> = file_ancestors.difference(&changed_files).copied().collect();
    let phase4 = filter_levels(&file_levels, &file_rest);
    let (done4, ids4) = run_file_levels(
        store,
        client,
        phase4,
        file_budget,
        &mut file_cache,
        &definition_cache,
    )
    .await?;
    files_done += done4;
    file_ids.extend(ids4);

    Ok(SummaryCounts { definitions: definitions_done, files: files_done, definition_ids, file_ids })
}

fn definition_edges(store: &Store) -> Result<Vec<(Id, Id)>> {
    Ok(store
        .list_definition_dependencies()?
        .into_iter()
        .map(|d| (d.from_definition_id, d.to_definition_id))
        .collect())
}

fn file_edges(store: &Store) -> Result<Vec<(Id, Id)>> {
    Ok(store
        .list_file_dependencies()?
        .into_iter()
        .map(|d| (d.from_file_id, d.to_file_id))
        .collect())
}

fn definition_graph(definitions: &[Definition], edges: &[(Id, Id)]) -> DefinitionGraph {
    let ids: Vec<Id> = definitions.iter().map(|d| d.id).collect();
    DefinitionGraph::new(&ids, edges)
}

fn file_graph(files: &[File], edges: &[(Id, Id)]) -> FileGraph {
    let ids: Vec<Id> = files.iter().map(|f| f.id).collect();
    FileGraph::new(&ids, edges)
}

fn seed_definition_cache(definitions: &[Definition]) -> HashMap<Id, String> {
    definitions
        .iter()
        .filter_map(|d| d.ai_short_summary.clone().map(|s| (d.id, s)))
        .collect()
}

fn seed_file_cache(files: &[File]) -> HashMap<Id, String> {
    files
        .iter()
        .filter_map(|f| f.ai_short_summary.clone().map(|s| (f.id, s)))
        .collect()
}

fn changed_file_ids(store: &Store, delta: &ParseDelta) -> Result<HashSet<Id>> {
    let mut paths: Vec<&str> = Vec::new();
    paths.extend(delta.files_added.iter().map(String::as_str));
    paths.extend(delta.files_modified.iter().map(String::as_str));
    paths.extend(delta.files_renamed.iter().map(|r| r.new.as_str()));

    let mut ids = HashSet::new();
    for path in paths {
        if let Some(file) = store.get_file_by_path(path)? {
            ids.insert(file.id);
        }
    }
    Ok(ids)
}

/// Intersects each group in `levels` with `allowed`, dropping groups and
/// levels that become empty.
fn filter_levels(levels: &Levels, allowed: &HashSet<Id>) -> Levels {
    levels
        .iter()
        .filter_map(|level| {
            let groups: Vec<Vec<Id>> = level
                .iter()
                .filter_map(|group| {
                    let filtered: Vec<Id> =
                        group.iter().copied().filter(|id| allowed.contains(id)).collect();
                    (!filtered.is_empty()).then_some(filtered)
                })
                .collect();
            (!groups.is_empty()).then_some(groups)
        })
        .collect()
}

async fn run_definition_levels(
    store: &Store,
    client: Arc<dyn LlmClient>,
    levels: Levels,
    budget: RateBudget,
    cache: &mut HashMap<Id, String>,
) -> Result<(usize, Vec<Id>)> {
    let defs_by_id: Arc<HashMap<Id, Definition>> =
        Arc::new(store.list_definitions()?.into_iter().map(|d| (d.id, d)).collect());
    let mut adjacency: HashMap<Id, Vec<Id>> = HashMap::new();
    for dep in store.list_definition_dependencies()? {
        adjacency.entry(dep.from_definition_id).or_default().push(dep.to_definition_id);
    }
    let adjacency = Arc::new(adjacency);

    let mut total = 0usize;
    let mut touched = Vec::new();
    for level in levels {
        let level_cache = Arc::new(tokio::sync::Mutex::new(cache.clone()));
        let pending: Arc<tokio::sync::Mutex<Vec<(Id, String, String)>>> =
            Arc::new(tokio::sync::Mutex::new(Vec::new()));

        let defs_by_id = defs_by_id.clone();
        let adjacency = adjacency.clone();
        let client = client.clone();
        let level_cache_for_op = level_cache.clone();
        let pending_for_op = pending.clone();

        ingest_core::run_level(level, budget, move |group: Vec<Id>| {
            let defs_by_id = defs_by_id.clone();
            let adjacency = adjacency.clone();
            let client = client.clone();
            let cache = level_cache_for_op.clone();
            let pending = pending_for_op.clone();
            let group_set: HashSet<Id> = group.iter().copied().collect();

            async move {
                if group.len() == 1 {
                    let id = group[0];
                    let Some(def) = defs_by_id.get(&id) else { return Ok(true) };

                    let (dep_summaries, missing) =
                        gather_dependencies(&id, &adjacency, &defs_by_id, &group_set, &cache, |d| {
                            d.name.clone()
                        })
                        .await;
                    if !missing.is_empty() {
                        return Err(SummarizerError::MissingDependencies { entity_id: id, names: missing });
                    }

                    let (system, user) = definition_prompt(def, &dep_summaries);
                    let response = client.chat(&system, &user).await?;
                    let (short, full) = parse_gist(&response)?;

                    cache.lock().await.insert(id, short.clone());
                    pending.lock().await.push((id, short, full));
                    return Ok(true);
                }

                let mut members = Vec::new();
                let mut dep_summaries_by_id = HashMap::new();
                for id in &group {
                    let Some(def) = defs_by_id.get(id) else { continue };
                    let (dep_summaries, missing) =
                        gather_dependencies(id, &adjacency, &defs_by_id, &group_set, &cache, |d| {
                            d.name.clone()
                        })
                        .await;
                    if !missing.is_empty() {
                        return Err(SummarizerError::MissingDependencies { entity_id: *id, names: missing });
                    }
                    dep_summaries_by_id.insert(*id, dep_summaries);
                    members.push(def);
                }
                if members.is_empty() {
                    return Ok(true);
                }

                let ids: Vec<Id> = members.iter().map(|d| d.id).collect();
                let (system, user) = joint_definition_prompt(&members, &dep_summaries_by_id);
                let response = client.chat(&system, &user).await?;
                let parsed = parse_joint_gist(&response, &ids)?;

                let mut cache = cache.lock().await;
                let mut pending = pending.lock().await;
                for (id, (short, full)) in parsed {
                    cache.insert(id, short.clone());
                    pending.push((id, short, full));
                }
                Ok(true)
            }
        })
        .await
        .map_err(|e| SummarizerError::LevelFailed(e.to_string()))?;

        let mut written = pending.lock().await;
        for (id, short, full) in written.drain(..) {
            store.set_definition_summary(id, &short, &full)?;
            cache.insert(id, short);
            total += 1;
            touched.push(id);
        }
    }

    Ok((total, touched))
}

async fn run_file_levels(
    store: &Store,
    client: Arc<dyn LlmClient>,
    levels: Levels,
    budget: RateBudget,
    file_cache: &mut HashMap<Id, String>,
    definition_cache: &HashMap<Id, String>,
) -> Result<(usize, Vec<Id>)> {
    let files_by_id: Arc<HashMap<Id, File>> =
        Arc::new(store.list_files()?.into_iter().map(|f| (f.id, f)).collect());
    let mut adjacency: HashMap<Id, Vec<Id>> = HashMap::new();
    for dep in store.list_file_dependencies()? {
        adjacency.entry(dep.from_file_id).or_default().push(dep.to_file_id);
    }
    let adjacency = Arc::new(adjacency);

    let mut defs_by_file: HashMap<Id, Vec<Id>> = HashMap::new();
    for def in store.list_definitions()? {
        defs_by_file.entry(def.file_id).or_default().push(def.id);
    }
    let defs_by_file = Arc::new(defs_by_file);
    let definition_cache = Arc::new(definition_cache.clone());

    let mut total = 0usize;
    let mut touched = Vec::new();
    for level in levels {
        let level_cache = Arc::new(tokio::sync::Mutex::new(file_cache.clone()));
        let pending: Arc<tokio::sync::Mutex<Vec<(Id, String, String)>>> =
            Arc::new(tokio::sync::Mutex::new(Vec::new()));

        let files_by_id = files_by_id.clone();
        let adjacency = adjacency.clone();
        let defs_by_file = defs_by_file.clone();
        let definition_cache = definition_cache.clone();
        let client = client.clone();
        let level_cache_for_op = level_cache.clone();
        let pending_for_op = pending.clone();

        ingest_core::run_level(level, budget, move |group: Vec<Id>| {
            let files_by_id = files_by_id.clone();
            let adjacency = adjacency.clone();
            let defs_by_file = defs_by_file.clone();
            let definition_cache = definition_cache.clone();
            let client = client.clone();
            let cache = level_cache_for_op.clone();
            let pending = pending_for_op.clone();
            let group_set: HashSet<Id> = group.iter().copied().collect();

            async move {
                if group.len() == 1 {
                    let id = group[0];
                    let Some(file) = files_by_id.get(&id) else { return Ok(true) };

                    let (dep_summaries, missing) =
                        gather_dependencies(&id, &adjacency, &files_by_id, &group_set, &cache, |f| {
                            f.file_path.clone()
                        })
                        .await;
                    if !missing.is_empty() {
                        return Err(SummarizerError::MissingDependencies { entity_id: id, names: missing });
                    }

                    let def_summaries: Vec<String> = defs_by_file
                        .get(&id)
                        .into_iter()
                        .flatten()
                        .filter_map(|def_id| definition_cache.get(def_id).cloned())
                        .collect();

                    let (system, user) = file_prompt(file, &def_summaries, &dep_summaries);
                    let response = client.chat(&system, &user).await?;
                    let (short, full) = parse_gist(&response)?;

                    cache.lock().await.insert(id, short.clone());
                    pending.lock().await.push((id, short, full));
                    return Ok(true);
                }

                let mut members = Vec::new();
                let mut dep_summaries_by_id = HashMap::new();
                let mut def_summaries_by_id = HashMap::new();
                for id in &group {
                    let Some(file) = files_by_id.get(id) else { continue };
                    let (dep_summaries, missing) =
                        gather_dependencies(id, &adjacency, &files_by_id, &group_set, &cache, |f| {
                            f.file_path.clone()
                        })
                        .await;
                    if !missing.is_empty() {
                        return Err(SummarizerError::MissingDependencies { entity_id: *id, names: missing });
                    }
                    let def_summaries: Vec<String> = defs_by_file
                        .get(id)
                        .into_iter()
                        .flatten()
                        .filter_map(|def_id| definition_cache.get(def_id).cloned())
                        .collect();

                    dep_summaries_by_id.insert(*id, dep_summaries);
                    def_summaries_by_id.insert(*id, def_summaries);
                    members.push(file);
                }
                if members.is_empty() {
                    return Ok(true);
                }

                let ids: Vec<Id> = members.iter().map(|f| f.id).collect();
                let (system, user) =
                    joint_file_prompt(&members, &def_summaries_by_id, &dep_summaries_by_id);
                let response = client.chat(&system, &user).await?;
                let parsed = parse_joint_gist(&response, &ids)?;

                let mut cache = cache.lock().await;
                let mut pending = pending.lock().await;
                for (id, (short, full)) in parsed {
                    cache.insert(id, short.clone());
                    pending.push((id, short, full));
                }
                Ok(true)
            }
        })
        .await
        .map_err(|e| SummarizerError::LevelFailed(e.to_string()))?;

        let mut written = pending.lock().await;
        for (id, short, full) in written.drain(..) {
            store.set_file_summary(id, &short, &full)?;
            file_cache.insert(id, short);
            total += 1;
            touched.push(id);
        }
    }

    Ok((total, touched))
}

/// Looks up cached summaries for `id`'s cross-group dependencies, returning
/// `(found_summaries, names_still_missing)`. Same-group dependencies and
/// dangling edges (the target no longer exists) are skipped, not reported
/// missing.
async fn gather_dependencies<T>(
    id: &Id,
    adjacency: &HashMap<Id, Vec<Id>>,
    entities_by_id: &HashMap<Id, T>,
    group: &HashSet<Id>,
    cache: &tokio::sync::Mutex<HashMap<Id, String>>,
    name_of: impl Fn(&T) -> String,
) -> (Vec<String>, Vec<String>) {
    let dep_ids = adjacency.get(id).cloned().unwrap_or_default();
    let mut found = Vec::new();
    let mut missing = Vec::new();

    let cache = cache.lock().await;
    for dep_id in &dep_ids {
        if group.contains(dep_id) {
            continue;
        }
        let Some(entity) = entities_by_id.get(dep_id) else { continue };
        match cache.get(dep_id) {
            Some(summary) => found.push(summary.clone()),
            None => missing.push(name_of(entity)),
        }
    }

    (found, missing)
}

fn definition_prompt(def: &Definition, dep_summaries: &[String]) -> (String, String) {
    let system = "You write concise technical summaries of individual code definitions \
        for a developer knowledge base. Reply with a one-line gist wrapped in \
        <gist></gist> tags, followed by a longer markdown explanation."
        .to_string();

    let mut user = format!(
        "Definition `{}` ({:?}), lines {}-{}:\n\n```\n{}\n```\n",
        def.name, def.kind, def.start_line, def.end_line, def.source_code
    );
    if let Some(doc) = &def.docstring {
        user.push_str(&format!("\nExisting docstring:\n{doc}\n"));
    }
    if !dep_summaries.is_empty() {
        user.push_str("\nWhat this definition depends on:\n");
        for summary in dep_summaries {
            user.push_str(&format!("- {summary}\n"));
        }
    }
    (system, user)
}

/// Builds one prompt covering every member of a dependency-cycle group. Each
/// member's full source is included, so mutually recursive definitions see
/// each other's bodies even though `gather_dependencies` leaves same-group
/// edges unresolved. The model is asked for one `<entity id="ID">` section
/// per member, parsed back with [`parse_joint_gist`].
fn joint_definition_prompt(
    members: &[&Definition],
    dep_summaries_by_id: &HashMap<Id, Vec<String>>,
) -> (String, String) {
    let system = "You write concise technical summaries of individual code definitions \
        for a developer knowledge base. The definitions below form one mutually \
        dependent group, so you can see every member's source. Reply with one \
        <entity id=\"ID\"> section per definition listed, each containing a \
        one-line gist wrapped in <gist></gist> tags followed by a longer markdown \
        explanation, then a closing </entity> tag."
        .to_string();

    let mut user = String::from(
        "These definitions depend on each other and must be summarized together:\n\n",
    );
    for def in members {
        user.push_str(&format!(
            "### id={} — `{}` ({:?}), lines {}-{}:\n```\n{}\n```\n",
            def.id, def.name, def.kind, def.start_line, def.end_line, def.source_code
        ));
        if let Some(doc) = &def.docstring {
            user.push_str(&format!("Existing docstring:\n{doc}\n"));
        }
        if let Some(deps) = dep_summaries_by_id.get(&def.id).filter(|d| !d.is_empty()) {
            user.push_str("Depends on, outside this group:\n");
            for summary in deps {
                user.push_str(&format!("- {summary}\n"));
            }
        }
        user.push('\n');
    }
    user.push_str("Respond with one <entity id=\"ID\">...</entity> section per id above.\n");

    (system, user)
}

fn file_prompt(file: &File, def_summaries: &[String], dep_summaries: &[String]) -> (String, String) {
    let system = "You write concise technical summaries of source files for a developer \
        knowledge base. Reply with a one-line gist wrapped in <gist></gist> tags, followed \
        by a longer markdown explanation."
        .to_string();

    let mut user = format!("File `{}` ({}):\n", file.file_path, file.language);
    if !def_summaries.is_empty() {
        user.push_str("\nDefinitions in this file:\n");
        for summary in def_summaries {
            user.push_str(&format!("- {summary}\n"));
        }
    }
    if !dep_summaries.is_empty() {
        user.push_str("\nFiles this one depends on:\n");
        for summary in dep_summaries {
            user.push_str(&format!("- {summary}\n"));
        }
    }
    (system, user)
}

/// Joint counterpart of [`file_prompt`] for a file-level dependency cycle.
fn joint_file_prompt(
    members: &[&File],
    def_summaries_by_id: &HashMap<Id, Vec<String>>,
    dep_summaries_by_id: &HashMap<Id, Vec<String>>,
) -> (String, String) {
    let system = "You write concise technical summaries of source files for a developer \
        knowledge base. The files below import each other in a cycle, so you can see \
        every member at once. Reply with one <entity id=\"ID\"> section per file listed, \
        each containing a one-line gist wrapped in <gist></gist> tags followed by a \
        longer markdown explanation, then a closing </entity> tag."
        .to_string();

    let mut user = String::from("These files depend on each other and must be summarized together:\n\n");
    for file in members {
        user.push_str(&format!("### id={} — `{}` ({}):\n", file.id, file.file_path, file.language));
        if let Some(defs) = def_summaries_by_id.get(&file.id).filter(|d| !d.is_empty()) {
            user.push_str("Definitions in this file:\n");
            for summary in defs {
                user.push_str(&format!("- {summary}\n"));
            }
        }
        if let Some(deps) = dep_summaries_by_id.get(&file.id).filter(|d| !d.is_empty()) {
            user.push_str("Depends on, outside this group:\n");
            for summary in deps {
                user.push_str(&format!("- {summary}\n"));
            }
        }
        user.push('\n');
    }
    user.push_str("Respond with one <entity id=\"ID\">...</entity> section per id above.\n");

    (system, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    use ingest_core::{build_definition_graph, DefinitionKind, NewDefinition, ReferenceType};

    #[test]
    fn filter_levels_drops_empty_groups_and_levels() {
        let levels: Levels = vec![vec![vec![1, 2], vec![3]], vec![vec![4]]];
        let allowed: HashSet<Id> = [1, 4].into_iter().collect();
        let filtered = filter_levels(&levels, &allowed);
        assert_eq!(filtered, vec![vec![vec![1]], vec![vec![4]]]);
    }

    #[test]
    fn filter_levels_drops_wholly_excluded_levels() {
        let levels: Levels = vec![vec![vec![1]], vec![vec![2]]];
        let allowed: HashSet<Id> = [2].into_iter().collect();
        let filtered = filter_levels(&levels, &allowed);
        assert_eq!(filtered, vec![vec![vec![2]]]);
    }

    /// Returns one canned joint response regardless of the prompt, so the
    /// test only needs to check that a single call covered the whole group.
    struct JointEchoClient {
        calls: std::sync::Mutex<u32>,
    }

    #[async_trait::async_trait]
    impl LlmClient for JointEchoClient {
        async fn chat(&self, _system: &str, user: &str) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            let mut response = String::new();
            for line in user.lines() {
                if let Some(rest) = line.strip_prefix("### id=") {
                    let id = rest.split(['—', ' ']).next().unwrap_or_default();
                    response.push_str(&format!(
                        "<entity id=\"{id}\"><gist>gist for {id}</gist>body for {id}</entity>\n"
                    ));
                }
            }
            Ok(response)
        }
    }

    #[tokio::test]
    async fn mutually_recursive_group_is_summarized_with_one_joint_call() {
        let store = Store::open_in_memory().unwrap();
        let file_id = store.insert_file(None, "a.py", "python", "def a(): b()\ndef b(): a()\n").unwrap();

        let a_id = store
            .insert_definition(&NewDefinition {
                file_id,
                name: "a".into(),
                kind: DefinitionKind::Function,
                start_line: 1,
                end_line: 1,
                source_code: "def a(): b()".into(),
                source_code_hash: "h1".into(),
                docstring: None,
                is_exported: false,
                is_default_export: false,
            })
            .unwrap();
        let b_id = store
            .insert_definition(&NewDefinition {
                file_id,
                name: "b".into(),
                kind: DefinitionKind::Function,
                start_line: 2,
                end_line: 2,
                source_code: "def b(): a()".into(),
                source_code_hash: "h2".into(),
                docstring: None,
                is_exported: false,
                is_default_export: false,
            })
            .unwrap();

        store.insert_reference(a_id, Some(b_id), "b", ReferenceType::Local).unwrap();
        store.insert_reference(b_id, Some(a_id), "a", ReferenceType::Local).unwrap();
        let graph = build_definition_graph(&store).unwrap();
        let levels = graph.levels();
        assert!(levels.iter().any(|level| level.iter().any(|group| group.len() == 2)));

        let client = Arc::new(JointEchoClient { calls: std::sync::Mutex::new(0) });
        let mut cache = HashMap::new();
        let (done, ids) = run_definition_levels(
            &store,
            client.clone(),
            levels,
            RateBudget::summaries_default(),
            &mut cache,
        )
        .await
        .unwrap();

        assert_eq!(done, 2);
        assert_eq!(*client.calls.lock().unwrap(), 1);
        assert!(ids.contains(&a_id) && ids.contains(&b_id));

        let stored_a = store.get_definition(a_id).unwrap().unwrap();
        assert_eq!(stored_a.ai_short_summary.as_deref(), Some(format!("gist for {a_id}").as_str()));
    }
}
