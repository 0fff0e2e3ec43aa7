//! Language feature handlers.
//!
//! Each handler is invoked with the owning project and file plus the request
//! params, reads the project's current model result, and tolerates staleness:
//! an answer against a slightly old model is acceptable, the next completed
//! rebuild refreshes it.

pub mod completion;
pub mod definition;
pub mod diagnostics;
pub mod formatting;
pub mod hover;
pub mod symbols;

use smithy_model::{Model, Shape, ShapeId};

use crate::project::ProjectFile;

/// Resolve a shape-id token to a shape in the model.
///
/// Absolute tokens resolve directly. Relative ones prefer the file's own
/// namespace, then fall back to any namespace with a matching name.
fn resolve_token<'a>(model: &'a Model, file: &ProjectFile, token: &str) -> Option<&'a Shape> {
    let token = token.trim_end_matches('$');
    if token.contains('#') {
        let id: ShapeId = token.parse().ok()?;
        return model.get_shape(&id.without_member());
    }

    let name = token.split('$').next()?;
    if let Some(namespace) = file
        .as_idl()
        .and_then(|idl| idl.parse().parsed.as_ref().and_then(|p| p.namespace().map(String::from)))
    {
        if let Some(shape) = model.get_shape(&ShapeId::new(namespace, name)) {
            return Some(shape);
        }
    }
    model.shapes.values().find(|shape| shape.id.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::project::IdlFile;
    use std::path::PathBuf;

    fn fixture() -> (Model, ProjectFile) {
        let text = "namespace com.foo\nstring Foo\n";
        let mut assembler = smithy_model::ModelAssembler::new();
        assembler.add_idl("/p/a.smithy", text);
        assembler.add_idl("/p/b.smithy", "namespace com.bar\nstring Only\n");
        let model = assembler.assemble().unwrap().clone();
        let file = ProjectFile::Idl(IdlFile::new(
            PathBuf::from("/p/a.smithy"),
            Document::of(text),
        ));
        (model, file)
    }

    #[test]
    fn resolves_absolute_and_relative_tokens() {
        let (model, file) = fixture();
        assert_eq!(
            resolve_token(&model, &file, "com.foo#Foo").unwrap().id.name,
            "Foo"
        );
        assert_eq!(resolve_token(&model, &file, "Foo").unwrap().id.namespace, "com.foo");
        // Falls back across namespaces when the local one has no match.
        assert_eq!(
            resolve_token(&model, &file, "Only").unwrap().id.namespace,
            "com.bar"
        );
        assert!(resolve_token(&model, &file, "Missing").is_none());
    }
}
