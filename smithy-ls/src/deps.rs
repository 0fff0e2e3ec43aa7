//! Maven dependency resolution.
//!
//! The server never talks to the network itself: dependencies resolve
//! against a process-wide artifact cache that is initialised lazily and
//! immutable afterwards. The resolver sits behind a trait so tests can
//! substitute their own.

use std::path::PathBuf;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub coordinate: String,
    pub path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
pub enum ResolverError {
    #[error("Invalid Maven coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Unresolvable Maven dependency: {0}")]
    Unresolvable(String),
}

pub trait DependencyResolver: Send {
    fn add_repository(&mut self, url: &str);

    fn add_dependency(&mut self, coordinate: &str);

    /// Resolve everything added so far.
    ///
    /// # Errors
    ///
    /// Returns the first coordinate that could not be resolved. The caller
    /// reports it as a config error on the build file.
    fn resolve(&mut self) -> Result<Vec<ResolvedArtifact>, ResolverError>;
}

/// The process-wide artifact cache root, initialised on first use.
fn cache_root() -> &'static PathBuf {
    static CACHE: OnceLock<PathBuf> = OnceLock::new();
    CACHE.get_or_init(|| {
        let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from);
        home.join(".m2").join("repository")
    })
}

/// Resolves coordinates against the local Maven repository layout.
#[derive(Debug, Default)]
pub struct MavenResolver {
    repositories: Vec<String>,
    dependencies: Vec<String>,
}

impl DependencyResolver for MavenResolver {
    fn add_repository(&mut self, url: &str) {
        self.repositories.push(url.to_string());
    }

    fn add_dependency(&mut self, coordinate: &str) {
        self.dependencies.push(coordinate.to_string());
    }

    fn resolve(&mut self) -> Result<Vec<ResolvedArtifact>, ResolverError> {
        let mut artifacts = Vec::new();
        for coordinate in &self.dependencies {
            let mut parts = coordinate.split(':');
            let (Some(group), Some(artifact), Some(version)) =
                (parts.next(), parts.next(), parts.next())
            else {
                return Err(ResolverError::InvalidCoordinate(coordinate.clone()));
            };

            let mut path = cache_root().clone();
            for segment in group.split('.') {
                path.push(segment);
            }
            path.push(artifact);
            path.push(version);
            path.push(format!("{artifact}-{version}.jar"));

            if !path.is_file() {
                return Err(ResolverError::Unresolvable(coordinate.clone()));
            }
            artifacts.push(ResolvedArtifact {
                coordinate: coordinate.clone(),
                path,
            });
        }
        Ok(artifacts)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A resolver that answers from a fixed table, for tests.
    #[derive(Debug, Default)]
    pub struct StubResolver {
        pub artifacts: Vec<ResolvedArtifact>,
        pub dependencies: Vec<String>,
        pub fail_with: Option<String>,
    }

    impl DependencyResolver for StubResolver {
        fn add_repository(&mut self, _url: &str) {}

        fn add_dependency(&mut self, coordinate: &str) {
            self.dependencies.push(coordinate.to_string());
        }

        fn resolve(&mut self) -> Result<Vec<ResolvedArtifact>, ResolverError> {
            match &self.fail_with {
                Some(coordinate) => Err(ResolverError::Unresolvable(coordinate.clone())),
                None => Ok(self.artifacts.clone()),
            }
        }
    }
}
