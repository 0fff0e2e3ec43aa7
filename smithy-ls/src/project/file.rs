//! Files tracked by a project.
//!
//! A [`ProjectFile`] is either an IDL file or a build file. The IDL variant
//! caches its parse tree and the set of shapes it defines; both are
//! invalidated together whenever the document is edited, and re-parse is
//! lazy and idempotent.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use smithy_model::{ParsedIdl, ShapeId};

use crate::document::Document;

#[derive(Debug)]
pub enum ProjectFile {
    Idl(IdlFile),
    Build(BuildFile),
}

impl ProjectFile {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Idl(file) => &file.path,
            Self::Build(file) => &file.path,
        }
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        match self {
            Self::Idl(file) => &file.document,
            Self::Build(file) => &file.document,
        }
    }

    /// Mutable access to the document. Invalidates any cached parse.
    pub fn document_mut(&mut self) -> &mut Document {
        match self {
            Self::Idl(file) => {
                file.parse_cache = OnceLock::new();
                &mut file.document
            }
            Self::Build(file) => &mut file.document,
        }
    }

    #[must_use]
    pub fn as_idl(&self) -> Option<&IdlFile> {
        match self {
            Self::Idl(file) => Some(file),
            Self::Build(_) => None,
        }
    }

    #[must_use]
    pub fn is_build(&self) -> bool {
        matches!(self, Self::Build(_))
    }
}

/// An IDL file (or a `.json` model file) belonging to a project.
#[derive(Debug)]
pub struct IdlFile {
    path: PathBuf,
    document: Document,
    parse_cache: OnceLock<Arc<ParseOutcome>>,
}

/// The cached result of one lazy parse.
#[derive(Debug)]
pub struct ParseOutcome {
    /// `None` when the text failed to parse (or is a JSON model file).
    pub parsed: Option<ParsedIdl>,
    pub defined_shapes: HashSet<ShapeId>,
}

impl IdlFile {
    #[must_use]
    pub fn new(path: PathBuf, document: Document) -> Self {
        Self {
            path,
            document,
            parse_cache: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Whether this is a JSON model file rather than IDL text.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.path.extension().is_some_and(|ext| ext == "json")
    }

    /// The cached parse, computed on first use after an edit.
    #[must_use]
    pub fn parse(&self) -> Arc<ParseOutcome> {
        self.parse_cache
            .get_or_init(|| {
                if self.is_json() {
                    return Arc::new(ParseOutcome {
                        parsed: None,
                        defined_shapes: HashSet::new(),
                    });
                }
                let filename = self.path.to_string_lossy();
                match ParsedIdl::parse(&filename, self.document.text()) {
                    Ok(parsed) => {
                        let defined_shapes = parsed.defined_shape_ids().into_iter().collect();
                        Arc::new(ParseOutcome {
                            parsed: Some(parsed),
                            defined_shapes,
                        })
                    }
                    Err(err) => {
                        tracing::debug!(path = %self.path.display(), %err, "parse failed");
                        Arc::new(ParseOutcome {
                            parsed: None,
                            defined_shapes: HashSet::new(),
                        })
                    }
                }
            })
            .clone()
    }
}

/// The build file kinds a project is configured by, in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildFileKind {
    SmithyBuild,
    SmithyProject,
}

impl BuildFileKind {
    pub const ALL: [BuildFileKind; 2] = [Self::SmithyBuild, Self::SmithyProject];

    #[must_use]
    pub fn filename(&self) -> &'static str {
        match self {
            Self::SmithyBuild => "smithy-build.json",
            Self::SmithyProject => ".smithy-project.json",
        }
    }

    /// The kind matching a path's file name, when it is a build file.
    #[must_use]
    pub fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        Self::ALL.into_iter().find(|kind| kind.filename() == name)
    }
}

/// A `smithy-build.json` or `.smithy-project.json` tracked by a project.
#[derive(Debug)]
pub struct BuildFile {
    path: PathBuf,
    kind: BuildFileKind,
    document: Document,
}

impl BuildFile {
    #[must_use]
    pub fn new(path: PathBuf, kind: BuildFileKind, document: Document) -> Self {
        Self {
            path,
            kind,
            document,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn kind(&self) -> BuildFileKind {
        self.kind
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Parse the current text as JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error message on malformed content.
    pub fn ast(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(self.document.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::Range;

    #[test]
    fn idl_parse_is_cached_until_edit() {
        let mut file = ProjectFile::Idl(IdlFile::new(
            PathBuf::from("/p/a.smithy"),
            Document::of("namespace com.foo\nstring Foo\n"),
        ));

        let idl = file.as_idl().unwrap();
        let first = idl.parse();
        assert!(first
            .defined_shapes
            .contains(&ShapeId::new("com.foo", "Foo")));
        assert!(Arc::ptr_eq(&first, &idl.parse()));

        let end = file.document().end();
        file.document_mut()
            .apply_edit(Some(Range::new(end, end)), "string Bar\n");

        let reparsed = file.as_idl().unwrap().parse();
        assert!(!Arc::ptr_eq(&first, &reparsed));
        assert!(reparsed
            .defined_shapes
            .contains(&ShapeId::new("com.foo", "Bar")));
    }

    #[test]
    fn broken_idl_has_empty_shape_set() {
        let file = IdlFile::new(
            PathBuf::from("/p/bad.smithy"),
            Document::of("namespace com.foo\nstring\n"),
        );
        let outcome = file.parse();
        assert!(outcome.parsed.is_none());
        assert!(outcome.defined_shapes.is_empty());
    }

    #[test]
    fn build_file_kind_from_path() {
        assert_eq!(
            BuildFileKind::of(Path::new("/p/smithy-build.json")),
            Some(BuildFileKind::SmithyBuild)
        );
        assert_eq!(
            BuildFileKind::of(Path::new("/p/.smithy-project.json")),
            Some(BuildFileKind::SmithyProject)
        );
        assert_eq!(BuildFileKind::of(Path::new("/p/other.json")), None);
    }

    #[test]
    fn build_file_ast_round_trip() {
        let file = BuildFile::new(
            PathBuf::from("/p/smithy-build.json"),
            BuildFileKind::SmithyBuild,
            Document::of(r#"{"version": "1.0", "sources": ["model"]}"#),
        );
        let ast = file.ast().unwrap();
        assert_eq!(ast["version"], "1.0");

        let broken = BuildFile::new(
            PathBuf::from("/p/smithy-build.json"),
            BuildFileKind::SmithyBuild,
            Document::of("{"),
        );
        assert!(broken.ast().is_err());
    }
}
