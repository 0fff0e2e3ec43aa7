//! Project configuration.
//!
//! The effective configuration of a project merges `smithy-build.json` and
//! `.smithy-project.json` found under the project root. Declared sources and
//! imports are normalised, resolved against the root, and expanded to the
//! `.smithy` and `.json` files underneath. Config parse errors are collected
//! for reporting as diagnostics on the offending build file, never thrown.

use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;
use serde::Deserialize;

use crate::project::file::BuildFileKind;

/// `smithy-build.json` subset the server reads. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmithyBuildJson {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub maven: MavenConfig,
}

/// `.smithy-project.json` subset the server reads. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmithyProjectJson {
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MavenConfig {
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub repositories: Vec<MavenRepository>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MavenRepository {
    #[serde(default)]
    pub url: String,
}

/// A config problem tied to the build file it came from.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub path: PathBuf,
    pub message: String,
}

/// The effective configuration of one project.
///
/// An empty config (no build files found) is distinct from a config whose
/// build files declare nothing: [`ProjectConfig::has_build_files`].
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
    pub version: String,
    /// Declared source paths, absolute and normalised.
    pub sources: Vec<PathBuf>,
    /// Declared import paths, absolute and normalised.
    pub imports: Vec<PathBuf>,
    pub maven: MavenConfig,
    /// The build files that contributed to this config.
    pub build_files: Vec<PathBuf>,
}

impl ProjectConfig {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_build_files(&self) -> bool {
        !self.build_files.is_empty()
    }

    /// Load the effective config for `root`, reading `smithy-build.json`
    /// then `.smithy-project.json`. Either, both, or neither may exist.
    ///
    /// Managed build-file text can be supplied through `text_of` so unsaved
    /// editor state takes precedence over the file on disk.
    pub fn load(
        root: &Path,
        text_of: impl Fn(&Path) -> Option<String>,
    ) -> (ProjectConfig, Vec<ConfigError>) {
        let mut config = ProjectConfig::empty();
        let mut errors = Vec::new();

        for kind in BuildFileKind::ALL {
            let path = root.join(kind.filename());
            let text = match text_of(&path) {
                Some(text) => text,
                None => match std::fs::read_to_string(&path) {
                    Ok(text) => text,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        errors.push(ConfigError {
                            path,
                            message: err.to_string(),
                        });
                        continue;
                    }
                },
            };

            match kind {
                BuildFileKind::SmithyBuild => match serde_json::from_str::<SmithyBuildJson>(&text)
                {
                    Ok(parsed) => {
                        config.version = parsed.version;
                        config
                            .sources
                            .extend(parsed.sources.iter().map(|s| resolve_path(root, s)));
                        config
                            .imports
                            .extend(parsed.imports.iter().map(|s| resolve_path(root, s)));
                        config.maven = parsed.maven;
                        config.build_files.push(path);
                    }
                    Err(err) => errors.push(ConfigError {
                        path,
                        message: err.to_string(),
                    }),
                },
                BuildFileKind::SmithyProject => {
                    match serde_json::from_str::<SmithyProjectJson>(&text) {
                        Ok(parsed) => {
                            config
                                .sources
                                .extend(parsed.sources.iter().map(|s| resolve_path(root, s)));
                            config.build_files.push(path);
                        }
                        Err(err) => errors.push(ConfigError {
                            path,
                            message: err.to_string(),
                        }),
                    }
                }
            }
        }

        (config, errors)
    }

    /// All model file paths this config covers: declared files plus the
    /// `.smithy` and `.json` files under declared directories, recursively.
    /// Declared entries missing from disk are skipped, not errors.
    #[must_use]
    pub fn resolve_model_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for declared in self.sources.iter().chain(&self.imports) {
            if declared.is_dir() {
                expand_directory(declared, &mut paths);
            } else if declared.is_file() && is_model_file(declared) {
                paths.push(declared.clone());
            }
        }
        paths.sort();
        paths.dedup();
        paths
    }

    /// Whether `path` is equal to or under any declared source or import.
    #[must_use]
    pub fn covers(&self, path: &Path) -> bool {
        self.sources
            .iter()
            .chain(&self.imports)
            .any(|declared| path == declared || path.starts_with(declared))
    }
}

fn is_model_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "smithy" || ext == "json")
}

fn expand_directory(dir: &Path, paths: &mut Vec<PathBuf>) {
    let walk = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .build();
    for entry in walk.flatten() {
        let path = entry.path();
        if entry.file_type().is_some_and(|ft| ft.is_file()) && is_model_file(path) {
            paths.push(path.to_path_buf());
        }
    }
}

/// Resolve a declared path against the project root, collapsing `.` and `..`
/// components without touching the filesystem.
#[must_use]
pub fn resolve_path(root: &Path, declared: &str) -> PathBuf {
    let declared = Path::new(declared);
    let joined = if declared.is_absolute() {
        declared.to_path_buf()
    } else {
        root.join(declared)
    };
    normalize(&joined)
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(Component::ParentDir);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
