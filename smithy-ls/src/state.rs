//! Top-level server state and its lifecycle transitions.
//!
//! All mutations happen on the request-dispatching path through one writer;
//! background tasks only re-enter through [`ServerState::commit_rebuild`].
//! The transitions here keep the global invariants: a URI lives in at most
//! one project, a detached project exists only for an open file with no
//! attached owner, and reload failures never discard open-document state.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};

use crate::deps::{DependencyResolver, MavenResolver};
use crate::document::Document;
use crate::lifecycle::DocumentLifecycleManager;
use crate::project::file::BuildFileKind;
use crate::project::{
    BuildFile, ConfigError, Project, ProjectFile, ProjectLoader, ProjectType, RebuildPlan,
};

type ResolverFactory = Box<dyn Fn() -> Box<dyn DependencyResolver> + Send + Sync>;

/// Identifies a project inside the state, for handing rebuild results back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectKey {
    Attached(PathBuf),
    Detached(Url),
}

/// A project/file pair a request resolves to.
pub struct ProjectAndFile<'a> {
    pub key: ProjectKey,
    pub project: &'a Project,
    pub file: &'a ProjectFile,
}

pub struct ServerState {
    workspace_roots: HashSet<PathBuf>,
    attached_projects: HashMap<PathBuf, Project>,
    detached_projects: HashMap<Url, Project>,
    managed_uris: HashSet<Url>,
    lifecycle: DocumentLifecycleManager,
    resolver_factory: ResolverFactory,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerState {
    #[must_use]
    pub fn new() -> Self {
        Self::with_resolver_factory(Box::new(|| Box::<MavenResolver>::default()))
    }

    /// State with a substituted dependency resolver, for tests.
    #[must_use]
    pub fn with_resolver_factory(resolver_factory: ResolverFactory) -> Self {
        Self {
            workspace_roots: HashSet::new(),
            attached_projects: HashMap::new(),
            detached_projects: HashMap::new(),
            managed_uris: HashSet::new(),
            lifecycle: DocumentLifecycleManager::new(),
            resolver_factory,
        }
    }

    #[must_use]
    pub fn lifecycle(&self) -> &DocumentLifecycleManager {
        &self.lifecycle
    }

    #[must_use]
    pub fn workspace_roots(&self) -> &HashSet<PathBuf> {
        &self.workspace_roots
    }

    #[must_use]
    pub fn is_managed(&self, uri: &Url) -> bool {
        self.managed_uris.contains(uri)
    }

    pub fn all_projects(&self) -> impl Iterator<Item = &Project> {
        self.attached_projects
            .values()
            .chain(self.detached_projects.values())
    }

    #[must_use]
    pub fn project(&self, key: &ProjectKey) -> Option<&Project> {
        match key {
            ProjectKey::Attached(root) => self.attached_projects.get(root),
            ProjectKey::Detached(uri) => self.detached_projects.get(uri),
        }
    }

    /// Find the project and file serving `uri`. Attached projects win over
    /// detached ones.
    #[must_use]
    pub fn find_project_and_file(&self, uri: &Url) -> Option<ProjectAndFile<'_>> {
        let path = to_path(uri)?;
        for (root, project) in &self.attached_projects {
            if let Some(file) = project.get_file(&path) {
                return Some(ProjectAndFile {
                    key: ProjectKey::Attached(root.clone()),
                    project,
                    file,
                });
            }
        }
        let project = self.detached_projects.get(uri)?;
        let file = project.get_file(&path)?;
        Some(ProjectAndFile {
            key: ProjectKey::Detached(uri.clone()),
            project,
            file,
        })
    }

    /// The document for a managed URI.
    #[must_use]
    pub fn get_managed_document(&self, uri: &Url) -> Option<&Document> {
        if !self.managed_uris.contains(uri) {
            return None;
        }
        self.find_project_and_file(uri)
            .map(|found| found.file.document())
    }

    /// `didOpen`: start managing the URI, updating its document in place
    /// when a project already tracks it, synthesising a project otherwise.
    pub fn open(&mut self, uri: Url, text: &str) {
        self.managed_uris.insert(uri.clone());
        let Some(path) = to_path(&uri) else {
            tracing::warn!(%uri, "opened uri with no file path");
            return;
        };

        if let Some(root) = self.attached_owner(&path) {
            // Open editor text wins over whatever was read from disk. Also
            // clears any detached project left from opening the file before
            // its project loaded.
            self.detached_projects.remove(&uri);
            if let Some(file) = self
                .attached_projects
                .get_mut(&root)
                .and_then(|project| project.get_file_mut(&path))
            {
                file.document_mut().apply_edit(None, text);
            }
            return;
        }

        if let Some(project) = self.detached_projects.get_mut(&uri) {
            if let Some(file) = project.get_file_mut(&path) {
                file.document_mut().apply_edit(None, text);
            }
            return;
        }

        if let Some(kind) = BuildFileKind::of(&path) {
            // A build file opened before its root was recognised.
            let root = path
                .parent()
                .map_or_else(|| PathBuf::from("/"), Path::to_path_buf);
            let build_file = BuildFile::new(path.clone(), kind, Document::of(text));
            match self.attached_projects.get_mut(&root) {
                Some(project) => {
                    project.files.insert(path, ProjectFile::Build(build_file));
                }
                None => {
                    self.attached_projects
                        .insert(root.clone(), Project::unresolved(root, build_file));
                }
            }
            return;
        }

        self.create_detached_project(&uri, text.to_string());
    }

    /// `didClose`: stop managing the URI; a detached project dies with it.
    pub fn close(&mut self, uri: &Url) {
        self.managed_uris.remove(uri);
        if self.detached_projects.contains_key(uri) {
            self.lifecycle.cancel_task(uri);
            self.detached_projects.remove(uri);
        }
    }

    /// `didChange`: apply edits to the managed document.
    pub fn apply_changes(&mut self, uri: &Url, changes: &[TextDocumentContentChangeEvent]) {
        if !self.managed_uris.contains(uri) {
            tracing::warn!(%uri, "change for unmanaged uri");
            return;
        }
        let Some(path) = to_path(uri) else {
            return;
        };
        let file = match self.attached_owner(&path) {
            Some(root) => self
                .attached_projects
                .get_mut(&root)
                .and_then(|project| project.get_file_mut(&path)),
            None => self
                .detached_projects
                .get_mut(uri)
                .and_then(|project| project.get_file_mut(&path)),
        };
        let Some(file) = file else {
            tracing::warn!(%uri, "change for unknown file");
            return;
        };
        let document = file.document_mut();
        for change in changes {
            document.apply_edit(change.range, &change.text);
        }
    }

    /// Snapshot a rebuild plan for the project owning `uri`: the incremental
    /// no-validation plan for edits, the full validating plan for saves.
    #[must_use]
    pub fn plan_rebuild(&self, uri: &Url, validate: bool) -> Option<(ProjectKey, RebuildPlan)> {
        let path = to_path(uri)?;
        let found = self.find_project_and_file(uri)?;
        let plan = if validate {
            Some(found.project.full_plan(true))
        } else {
            found.project.file_update_plan(&path)
        }?;
        Some((found.key, plan))
    }

    /// Hand a completed rebuild back to its project. The single mutation
    /// point for background tasks.
    ///
    /// `planned_generation` is the generation the plan was snapshotted at
    /// ([`RebuildPlan::generation`]); if another rebuild committed in the
    /// meantime the project has moved on and the result is refused, since
    /// its carry-over would silently revert the newer model. Refused (and
    /// unknown-key) commits return `false`; the caller replans against the
    /// fresh model.
    pub fn commit_rebuild(
        &mut self,
        key: &ProjectKey,
        planned_generation: u64,
        result: smithy_model::ValidatedResult<smithy_model::Model>,
    ) -> bool {
        let project = match key {
            ProjectKey::Attached(root) => self.attached_projects.get_mut(root),
            ProjectKey::Detached(uri) => self.detached_projects.get_mut(uri),
        };
        match project {
            Some(project) if project.generation() == planned_generation => {
                project.apply_rebuild(result);
                true
            }
            Some(project) => {
                tracing::debug!(
                    planned = planned_generation,
                    current = project.generation(),
                    "discarding stale rebuild result"
                );
                false
            }
            None => false,
        }
    }

    /// Load or reload the project rooted at `root`. On failure the previous
    /// project is retained (overwriting it would lose open-document state)
    /// and the errors are returned for diagnostics.
    pub fn try_init_project(&mut self, root: &Path) -> Vec<ConfigError> {
        tracing::debug!(root = %root.display(), "initializing project");
        self.lifecycle.cancel_all_tasks();

        let managed = self.managed_documents();
        let mut resolver = (self.resolver_factory)();
        match ProjectLoader::load(root, &managed, resolver.as_mut()) {
            Ok(updated) => {
                if updated.config().has_build_files() {
                    self.attach_project(root, updated);
                } else {
                    // No config files: the project is empty now and goes away.
                    self.remove_project_and_resolve_detached(root);
                }
                Vec::new()
            }
            Err(errors) => {
                tracing::error!(root = %root.display(), "project load failed");
                let project = self
                    .attached_projects
                    .entry(root.to_path_buf())
                    .or_insert_with(|| Project::empty(root.to_path_buf()));
                project.config_errors = errors.clone();
                errors
            }
        }
    }

    /// `didChangeWorkspaceFolders` (added): discover and initialise every
    /// project under the new root.
    pub fn load_workspace(&mut self, workspace_root: &Path) -> Vec<ConfigError> {
        self.workspace_roots.insert(workspace_root.to_path_buf());
        let mut errors = Vec::new();
        for root in find_project_roots(workspace_root) {
            errors.extend(self.try_init_project(&root));
        }
        errors
    }

    /// `didChangeWorkspaceFolders` (removed): drop every attached project
    /// under the root, recreating detached projects for still-open files.
    pub fn remove_workspace(&mut self, workspace_root: &Path) {
        self.workspace_roots.remove(workspace_root);
        let to_remove: Vec<PathBuf> = self
            .attached_projects
            .keys()
            .filter(|root| root.starts_with(workspace_root))
            .cloned()
            .collect();
        for root in to_remove {
            self.remove_project_and_resolve_detached(&root);
        }
    }

    /// A watched file appeared.
    pub fn handle_created(&mut self, uri: &Url) {
        let Some(path) = to_path(uri) else {
            return;
        };
        if let Some(root) = self.attached_owner(&path) {
            // A build file opened ahead of this event sits in an unresolved
            // project; the event promotes it to a real one.
            let unresolved = self
                .attached_projects
                .get(&root)
                .is_some_and(|project| project.project_type() == ProjectType::Unresolved);
            if unresolved {
                self.try_init_project(&root);
            }
            return;
        }
        if BuildFileKind::of(&path).is_some() {
            let Some(root) = path.parent().map(Path::to_path_buf) else {
                return;
            };
            self.try_init_project(&root);
        } else if let Some(root) = self.covering_project_root(&path) {
            // An IDL file landed inside a project's sources; reload to pick
            // it up.
            self.try_init_project(&root);
        }
    }

    /// A watched file disappeared.
    pub fn handle_deleted(&mut self, uri: &Url) {
        let Some(path) = to_path(uri) else {
            return;
        };
        let Some(root) = self.attached_owner(&path) else {
            return;
        };

        if BuildFileKind::of(&path).is_some() {
            self.try_init_project(&root);
            return;
        }

        let preserved = self
            .managed_uris
            .contains(uri)
            .then(|| {
                self.attached_projects
                    .get(&root)
                    .and_then(|project| project.get_file(&path))
                    .map(|file| file.document().copy_text())
            })
            .flatten();

        if let Some(project) = self.attached_projects.get_mut(&root) {
            project.remove_file(&path);
        }

        // A managed file that lost its project keeps its in-memory text in a
        // fresh detached project.
        if let Some(text) = preserved {
            self.create_detached_project(uri, text);
        }
    }

    /// A watched build file changed on disk: reload the config and migrate
    /// URIs between the attached and detached sets accordingly.
    pub fn handle_build_file_changed(&mut self, uri: &Url) {
        let Some(path) = to_path(uri) else {
            return;
        };
        if BuildFileKind::of(&path).is_none() {
            return;
        }
        let root = self
            .attached_owner(&path)
            .or_else(|| path.parent().map(Path::to_path_buf));
        if let Some(root) = root {
            self.try_init_project(&root);
        }
    }

    /// Clones of every managed document keyed by path, for adoption during
    /// project loads.
    #[must_use]
    pub fn managed_documents(&self) -> HashMap<PathBuf, Document> {
        let mut documents = HashMap::new();
        for uri in &self.managed_uris {
            let Some(path) = to_path(uri) else {
                continue;
            };
            if let Some(found) = self.find_project_and_file(uri) {
                documents.insert(path, found.file.document().clone());
            }
        }
        documents
    }

    /// Diagnostics for every managed file served by the given project.
    #[must_use]
    pub fn project_diagnostics(
        &self,
        key: &ProjectKey,
        minimum: smithy_model::Severity,
    ) -> Vec<(Url, Vec<tower_lsp::lsp_types::Diagnostic>)> {
        let Some(project) = self.project(key) else {
            return Vec::new();
        };
        let mut published = Vec::new();
        for file in project.files() {
            let Some(uri) = to_uri(file.path()) else {
                continue;
            };
            if !self.managed_uris.contains(&uri) {
                continue;
            }
            published.push((
                uri,
                crate::capabilities::diagnostics::file_diagnostics(project, file.path(), minimum),
            ));
        }
        published
    }

    /// Diagnostics for every managed file, across all projects.
    #[must_use]
    pub fn all_managed_diagnostics(
        &self,
        minimum: smithy_model::Severity,
    ) -> Vec<(Url, Vec<tower_lsp::lsp_types::Diagnostic>)> {
        let mut published = Vec::new();
        for uri in &self.managed_uris {
            let Some(found) = self.find_project_and_file(uri) else {
                continue;
            };
            published.push((
                uri.clone(),
                crate::capabilities::diagnostics::file_diagnostics(
                    found.project,
                    found.file.path(),
                    minimum,
                ),
            ));
        }
        published
    }

    /// Check the global invariants; used by tests after every transition.
    #[must_use]
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        let mut seen: HashMap<PathBuf, usize> = HashMap::new();
        for project in self.all_projects() {
            for file in project.files() {
                *seen.entry(file.path().to_path_buf()).or_default() += 1;
            }
        }
        for (path, count) in &seen {
            if *count > 1 {
                violations.push(format!("{} appears in {count} projects", path.display()));
            }
        }

        for uri in self.detached_projects.keys() {
            if !self.managed_uris.contains(uri) {
                violations.push(format!("detached project for unmanaged uri {uri}"));
            }
        }

        for uri in &self.managed_uris {
            let Some(path) = to_path(uri) else {
                continue;
            };
            let attached = self.attached_owner(&path).is_some();
            let detached = self.detached_projects.contains_key(uri);
            if attached && detached {
                violations.push(format!("{uri} is both attached and detached"));
            }
        }

        violations
    }

    fn attached_owner(&self, path: &Path) -> Option<PathBuf> {
        self.attached_projects
            .iter()
            .find_map(|(root, project)| project.contains(path).then(|| root.clone()))
    }

    /// The attached project whose config covers `path`, preferring the
    /// deepest root.
    fn covering_project_root(&self, path: &Path) -> Option<PathBuf> {
        self.attached_projects
            .iter()
            .filter(|(_, project)| project.config().covers(path))
            .max_by_key(|(root, _)| root.components().count())
            .map(|(root, _)| root.clone())
    }

    fn create_detached_project(&mut self, uri: &Url, text: String) {
        let Some(path) = to_path(uri) else {
            return;
        };
        let project = ProjectLoader::load_detached(path, text);
        self.detached_projects.insert(uri.clone(), project);
    }

    fn attach_project(&mut self, root: &Path, updated: Project) {
        let old = self.attached_projects.remove(root);
        self.resolve_detached_projects(old.as_ref(), &updated);
        self.attached_projects.insert(root.to_path_buf(), updated);
    }

    fn remove_project_and_resolve_detached(&mut self, root: &Path) {
        if let Some(old) = self.attached_projects.remove(root) {
            let empty = Project::empty(old.root().to_path_buf());
            self.resolve_detached_projects(Some(&old), &empty);
        }
    }

    /// After a reload, diff the old and new model file sets: newly covered
    /// paths drop their detached projects, no-longer-covered paths that are
    /// still open become detached again with their in-memory text.
    fn resolve_detached_projects(&mut self, old: Option<&Project>, updated: &Project) {
        let Some(old) = old else {
            // A fresh project may still cover files that were opened
            // detached before it loaded.
            let added: Vec<Url> = updated.model_file_paths().filter_map(to_uri).collect();
            for uri in added {
                self.detached_projects.remove(&uri);
            }
            return;
        };

        let old_paths: HashSet<&Path> = old.model_file_paths().collect();
        let new_paths: HashSet<&Path> = updated.model_file_paths().collect();

        for added in new_paths.difference(&old_paths) {
            if let Some(uri) = to_uri(added) {
                self.detached_projects.remove(&uri);
            }
        }

        let mut to_detach = Vec::new();
        for removed in old_paths.difference(&new_paths) {
            let Some(uri) = to_uri(removed) else {
                continue;
            };
            if self.managed_uris.contains(&uri) {
                if let Some(file) = old.get_file(removed) {
                    to_detach.push((uri, file.document().copy_text()));
                }
            }
        }
        for (uri, text) in to_detach {
            self.create_detached_project(&uri, text);
        }
    }
}

/// Directories under `workspace_root` that hold build files. The walk does
/// not follow symlinks, which keeps cyclic layouts from looping.
fn find_project_roots(workspace_root: &Path) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    let walk = WalkBuilder::new(workspace_root)
        .standard_filters(false)
        .follow_links(false)
        .build();
    for entry in walk.flatten() {
        if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
            continue;
        }
        let dir = entry.path();
        if BuildFileKind::ALL
            .iter()
            .any(|kind| dir.join(kind.filename()).is_file())
        {
            roots.push(dir.to_path_buf());
        }
    }
    roots.sort();
    roots
}

fn to_path(uri: &Url) -> Option<PathBuf> {
    uri.to_file_path().ok()
}

fn to_uri(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::test_support::StubResolver;

    fn state() -> ServerState {
        ServerState::with_resolver_factory(Box::new(|| Box::<StubResolver>::default()))
    }

    fn uri_of(path: &Path) -> Url {
        Url::from_file_path(path).unwrap()
    }

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, text).unwrap();
    }

    fn assert_invariants(state: &ServerState) {
        let violations = state.invariant_violations();
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn open_unowned_file_creates_detached_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lone.smithy");
        let uri = uri_of(&path);

        let mut state = state();
        state.open(uri.clone(), "namespace com.foo\nstring Foo\n");

        let found = state.find_project_and_file(&uri).unwrap();
        assert_eq!(found.project.project_type(), ProjectType::Detached);
        assert!(found
            .project
            .model_result()
            .unwrap()
            .get_shape(&"com.foo#Foo".parse().unwrap())
            .is_some());
        assert_invariants(&state);

        state.close(&uri);
        assert!(state.find_project_and_file(&uri).is_none());
        assert!(!state.is_managed(&uri));
        assert_invariants(&state);
    }

    #[test]
    fn open_file_in_attached_project_updates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "smithy-build.json", r#"{"version": "1.0", "sources": ["main.smithy"]}"#);
        write(root, "main.smithy", "namespace com.foo\nstring OnDisk\n");

        let mut state = state();
        state.load_workspace(root);

        let uri = uri_of(&root.join("main.smithy"));
        state.open(uri.clone(), "namespace com.foo\nstring Edited\n");

        let found = state.find_project_and_file(&uri).unwrap();
        assert_eq!(found.project.project_type(), ProjectType::Normal);
        assert_eq!(
            found.file.document().text(),
            "namespace com.foo\nstring Edited\n"
        );
        assert_invariants(&state);
    }

    #[test]
    fn detached_is_dropped_when_project_attaches() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "main.smithy", "namespace com.foo\nstring Foo\n");

        let mut state = state();
        let uri = uri_of(&root.join("main.smithy"));
        state.open(uri.clone(), "namespace com.foo\nstring Edited\n");
        assert_eq!(
            state
                .find_project_and_file(&uri)
                .unwrap()
                .project
                .project_type(),
            ProjectType::Detached
        );

        // Project config appears afterwards.
        write(root, "smithy-build.json", r#"{"version": "1.0", "sources": ["main.smithy"]}"#);
        state.handle_created(&uri_of(&root.join("smithy-build.json")));

        let found = state.find_project_and_file(&uri).unwrap();
        assert_eq!(found.project.project_type(), ProjectType::Normal);
        // In-memory edits survived attachment.
        assert_eq!(
            found.file.document().text(),
            "namespace com.foo\nstring Edited\n"
        );
        assert_invariants(&state);
    }

    #[test]
    fn config_shrink_detaches_managed_file_with_edits() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "smithy-build.json", r#"{"version": "1.0", "sources": ["main.smithy"]}"#);
        write(root, "main.smithy", "namespace com.foo\nstring Foo\n");

        let mut state = state();
        state.load_workspace(root);

        let uri = uri_of(&root.join("main.smithy"));
        state.open(uri.clone(), "namespace com.foo\nstring Edited\n");

        write(root, "smithy-build.json", r#"{"version": "1.0", "sources": []}"#);
        state.handle_build_file_changed(&uri_of(&root.join("smithy-build.json")));

        let found = state.find_project_and_file(&uri).unwrap();
        assert_eq!(found.project.project_type(), ProjectType::Detached);
        assert_eq!(
            found.file.document().text(),
            "namespace com.foo\nstring Edited\n"
        );
        assert_invariants(&state);
    }

    #[test]
    fn build_file_open_before_watch_event_is_unresolved() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let build_path = root.join("smithy-build.json");
        let build_uri = uri_of(&build_path);

        let mut state = state();
        state.open(build_uri.clone(), r#"{"version": "1.0", "sources": ["main.smithy"]}"#);

        let found = state.find_project_and_file(&build_uri).unwrap();
        assert_eq!(found.project.project_type(), ProjectType::Unresolved);
        assert_invariants(&state);

        // Watch event arrives after the file is written out.
        write(root, "smithy-build.json", r#"{"version": "1.0", "sources": ["main.smithy"]}"#);
        write(root, "main.smithy", "namespace com.foo\nstring Foo\n");
        state.handle_created(&build_uri);

        let found = state.find_project_and_file(&build_uri).unwrap();
        assert_eq!(found.project.project_type(), ProjectType::Normal);
        assert_invariants(&state);
    }

    #[test]
    fn deleting_watched_file_preserves_managed_text_as_detached() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "smithy-build.json", r#"{"version": "1.0", "sources": ["model"]}"#);
        write(root, "model/a.smithy", "namespace com.foo\nstring A\n");
        write(root, "model/b.smithy", "namespace com.foo\nstring B\n");

        let mut state = state();
        state.load_workspace(root);

        let a_uri = uri_of(&root.join("model/a.smithy"));
        state.open(a_uri.clone(), "namespace com.foo\nstring Edited\n");

        std::fs::remove_file(root.join("model/a.smithy")).unwrap();
        state.handle_deleted(&a_uri);

        let found = state.find_project_and_file(&a_uri).unwrap();
        assert_eq!(found.project.project_type(), ProjectType::Detached);
        assert_eq!(
            found.file.document().text(),
            "namespace com.foo\nstring Edited\n"
        );

        // The surviving file still assembles in the attached project.
        let b_uri = uri_of(&root.join("model/b.smithy"));
        let b = state.find_project_and_file(&b_uri).unwrap();
        assert!(b
            .project
            .model_result()
            .unwrap()
            .get_shape(&"com.foo#B".parse().unwrap())
            .is_some());
        assert_invariants(&state);
    }

    #[test]
    fn workspace_removal_detaches_open_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "proj/smithy-build.json", r#"{"version": "1.0", "sources": ["main.smithy"]}"#);
        write(root, "proj/main.smithy", "namespace com.foo\nstring Foo\n");

        let mut state = state();
        state.load_workspace(root);
        assert_eq!(state.all_projects().count(), 1);

        let uri = uri_of(&root.join("proj/main.smithy"));
        state.open(uri.clone(), "namespace com.foo\nstring Foo\n");

        state.remove_workspace(root);
        assert!(state.workspace_roots().is_empty());

        let found = state.find_project_and_file(&uri).unwrap();
        assert_eq!(found.project.project_type(), ProjectType::Detached);
        assert_invariants(&state);
    }

    #[test]
    fn failed_reload_retains_previous_project() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "smithy-build.json", r#"{"version": "1.0", "sources": ["main.smithy"]}"#);
        write(root, "main.smithy", "namespace com.foo\nstring Foo\n");

        let mut state = state();
        state.load_workspace(root);

        write(root, "smithy-build.json", "{ broken");
        let errors = state.try_init_project(root);
        assert!(!errors.is_empty());

        // The previous project, files included, is still there.
        let uri = uri_of(&root.join("main.smithy"));
        let found = state.find_project_and_file(&uri).unwrap();
        assert_eq!(found.project.project_type(), ProjectType::Normal);
        assert_invariants(&state);
    }

    #[test]
    fn discovers_nested_project_roots() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "a/smithy-build.json", "{}");
        write(root, "b/nested/.smithy-project.json", "{}");
        write(root, "c/readme.md", "");

        let roots = find_project_roots(root);
        assert_eq!(roots, vec![root.join("a"), root.join("b/nested")]);
    }
}
