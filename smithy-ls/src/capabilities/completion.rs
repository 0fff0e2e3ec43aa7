//! Completion: prefix matches over the model's shape ids.

use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind, Position};

use smithy_model::ShapeType;

use crate::project::{Project, ProjectFile};

#[must_use]
pub fn completion(
    project: &Project,
    file: &ProjectFile,
    position: Position,
) -> Vec<CompletionItem> {
    let Some(model) = project.model_result().value() else {
        return Vec::new();
    };
    // Only the part of the token before the cursor narrows the match.
    let document = file.document();
    let prefix = match (
        document.index_of_position(position),
        document.copy_document_id(position),
    ) {
        (Some(offset), Some(token)) => token.text[..offset - token.span.start].to_string(),
        _ => String::new(),
    };

    let mut items: Vec<CompletionItem> = model
        .shapes
        .values()
        .filter(|shape| {
            shape.id.name.starts_with(&prefix) || shape.id.to_string().starts_with(&prefix)
        })
        .map(|shape| CompletionItem {
            label: shape.id.name.clone(),
            detail: Some(shape.id.to_string()),
            kind: Some(item_kind(shape.shape_type)),
            ..CompletionItem::default()
        })
        .collect();
    items.sort_by(|a, b| a.label.cmp(&b.label));
    items
}

fn item_kind(shape_type: ShapeType) -> CompletionItemKind {
    match shape_type {
        ShapeType::Structure | ShapeType::Union => CompletionItemKind::STRUCT,
        ShapeType::Enum | ShapeType::IntEnum => CompletionItemKind::ENUM,
        ShapeType::Service | ShapeType::Resource => CompletionItemKind::MODULE,
        ShapeType::Operation => CompletionItemKind::FUNCTION,
        _ => CompletionItemKind::VALUE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project;
    use std::path::PathBuf;

    #[test]
    fn completion_matches_by_prefix() {
        let text = "namespace com.foo\nstring Foo\nstring Fob\nstring Bar\n";
        let project = project::detached(PathBuf::from("/p/a.smithy"), text.to_string());
        let file = project.get_file(&PathBuf::from("/p/a.smithy")).unwrap();

        // Cursor after `Fo` in `Foo`.
        let items = completion(&project, file, Position::new(1, 9));
        let labels: Vec<_> = items.iter().map(|item| item.label.as_str()).collect();
        assert_eq!(labels, vec!["Fob", "Foo"]);
    }

    #[test]
    fn empty_prefix_lists_everything() {
        let text = "namespace com.foo\nstring Foo\nstring Bar\n";
        let project = project::detached(PathBuf::from("/p/a.smithy"), text.to_string());
        let file = project.get_file(&PathBuf::from("/p/a.smithy")).unwrap();

        let items = completion(&project, file, Position::new(0, 0));
        assert!(items.len() >= 2);
    }
}
