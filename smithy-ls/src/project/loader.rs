//! Building [`Project`] values from a root directory.
//!
//! The loader reads the effective config, gathers build and model files,
//! adopts any document the caller already manages (so in-memory edits are
//! not lost across reloads), and runs a full assembly. A load that cannot
//! produce a usable config fails whole, letting the caller keep the previous
//! project value.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use smithy_model::ValidatedResult;
use tokio_util::sync::CancellationToken;

use crate::deps::DependencyResolver;
use crate::document::Document;
use crate::project::config::{ConfigError, ProjectConfig};
use crate::project::file::{BuildFile, BuildFileKind, IdlFile, ProjectFile};
use crate::project::{Project, ProjectType, RebuildIndex};

pub struct ProjectLoader;

impl ProjectLoader {
    /// Load the project rooted at `root`.
    ///
    /// `managed` maps paths to documents the caller holds open; their text
    /// is adopted in place of a fresh disk read.
    ///
    /// # Errors
    ///
    /// Fails when a build file is unparseable or a Maven dependency does not
    /// resolve. The caller retains its previous project in that case.
    pub fn load(
        root: &Path,
        managed: &HashMap<PathBuf, Document>,
        resolver: &mut dyn DependencyResolver,
    ) -> Result<Project, Vec<ConfigError>> {
        let (config, errors) =
            ProjectConfig::load(root, |path| managed.get(path).map(Document::copy_text));
        if !errors.is_empty() {
            return Err(errors);
        }
        if !config.has_build_files() {
            return Ok(Project::empty(root.to_path_buf()));
        }

        for repository in &config.maven.repositories {
            resolver.add_repository(&repository.url);
        }
        for dependency in &config.maven.dependencies {
            resolver.add_dependency(dependency);
        }
        match resolver.resolve() {
            Ok(artifacts) => {
                if !artifacts.is_empty() {
                    tracing::debug!(count = artifacts.len(), "resolved maven dependencies");
                }
            }
            Err(err) => {
                let path = config
                    .build_files
                    .first()
                    .cloned()
                    .unwrap_or_else(|| root.join(BuildFileKind::SmithyBuild.filename()));
                return Err(vec![ConfigError {
                    path,
                    message: err.to_string(),
                }]);
            }
        }

        let mut files = HashMap::new();
        for path in &config.build_files {
            let Some(kind) = BuildFileKind::of(path) else {
                continue;
            };
            match load_document(path, managed) {
                Some(document) => {
                    files.insert(
                        path.clone(),
                        ProjectFile::Build(BuildFile::new(path.clone(), kind, document)),
                    );
                }
                None => tracing::warn!(path = %path.display(), "build file vanished during load"),
            }
        }

        for path in config.resolve_model_paths() {
            match load_document(&path, managed) {
                Some(document) => {
                    files.insert(
                        path.clone(),
                        ProjectFile::Idl(IdlFile::new(path.clone(), document)),
                    );
                }
                // Declared but unreadable files are dropped, not fatal.
                None => tracing::warn!(path = %path.display(), "skipping unreadable model file"),
            }
        }

        let mut project = Project {
            root: root.to_path_buf(),
            project_type: ProjectType::Normal,
            config,
            config_errors: Vec::new(),
            files,
            model_result: ValidatedResult::default(),
            rebuild_index: RebuildIndex::default(),
            generation: 0,
        };
        let plan = project.full_plan(true);
        if let Some(result) = plan.assemble(&CancellationToken::new()) {
            project.apply_rebuild(result);
        }
        Ok(project)
    }

    /// Build a detached project for one open file.
    #[must_use]
    pub fn load_detached(path: PathBuf, text: String) -> Project {
        crate::project::detached(path, text)
    }
}

fn load_document(path: &Path, managed: &HashMap<PathBuf, Document>) -> Option<Document> {
    if let Some(document) = managed.get(path) {
        return Some(document.clone());
    }
    match std::fs::read_to_string(path) {
        Ok(text) => Some(Document::of(text)),
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "read failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::test_support::StubResolver;

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn loads_project_with_sources() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "smithy-build.json", r#"{"version": "1.0", "sources": ["model"]}"#);
        write(
            root,
            "model/main.smithy",
            "$version: \"2\"\nnamespace com.foo\nstring Foo\n",
        );

        let project =
            ProjectLoader::load(root, &HashMap::new(), &mut StubResolver::default()).unwrap();
        assert_eq!(project.project_type(), ProjectType::Normal);
        assert_eq!(project.model_file_paths().count(), 1);
        assert!(project
            .model_result()
            .unwrap()
            .get_shape(&"com.foo#Foo".parse().unwrap())
            .is_some());
    }

    #[test]
    fn no_build_files_is_an_empty_project() {
        let dir = tempfile::tempdir().unwrap();
        let project =
            ProjectLoader::load(dir.path(), &HashMap::new(), &mut StubResolver::default())
                .unwrap();
        assert_eq!(project.project_type(), ProjectType::Empty);
        assert!(project.model_result().value().is_none());
    }

    #[test]
    fn malformed_build_file_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "smithy-build.json", "{ nope");
        let result =
            ProjectLoader::load(dir.path(), &HashMap::new(), &mut StubResolver::default());
        assert!(result.is_err());
    }

    #[test]
    fn unresolvable_dependency_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "smithy-build.json",
            r#"{"version": "1.0", "maven": {"dependencies": ["a:b:1"]}}"#,
        );
        let mut resolver = StubResolver {
            fail_with: Some("a:b:1".to_string()),
            ..StubResolver::default()
        };
        let errors =
            ProjectLoader::load(dir.path(), &HashMap::new(), &mut resolver).unwrap_err();
        assert!(errors[0].message.contains("a:b:1"));
    }

    #[test]
    fn adopts_managed_documents_over_disk_state() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "smithy-build.json", r#"{"version": "1.0", "sources": ["main.smithy"]}"#);
        write(root, "main.smithy", "namespace com.foo\nstring OnDisk\n");

        let mut managed = HashMap::new();
        managed.insert(
            root.join("main.smithy"),
            Document::of("namespace com.foo\nstring InMemory\n"),
        );

        let project = ProjectLoader::load(root, &managed, &mut StubResolver::default()).unwrap();
        let model = project.model_result().unwrap();
        assert!(model.get_shape(&"com.foo#InMemory".parse().unwrap()).is_some());
        assert!(model.get_shape(&"com.foo#OnDisk".parse().unwrap()).is_none());
    }

    #[test]
    fn missing_declared_source_is_dropped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "smithy-build.json",
            r#"{"version": "1.0", "sources": ["main.smithy", "ghost.smithy"]}"#,
        );
        write(root, "main.smithy", "namespace com.foo\nstring Foo\n");

        let project =
            ProjectLoader::load(root, &HashMap::new(), &mut StubResolver::default()).unwrap();
        assert_eq!(project.model_file_paths().count(), 1);
    }
}
