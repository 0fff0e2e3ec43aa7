//! Hover: a markdown summary of the shape under the cursor.

use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position};

use smithy_model::Shape;

use crate::project::{Project, ProjectFile};

#[must_use]
pub fn hover(project: &Project, file: &ProjectFile, position: Position) -> Option<Hover> {
    let token = file.document().copy_document_id(position)?;
    let model = project.model_result().value()?;
    let shape = super::resolve_token(model, file, &token.text)?;

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: render(shape),
        }),
        range: None,
    })
}

fn render(shape: &Shape) -> String {
    let mut out = String::new();
    out.push_str("```smithy\n");
    for (trait_id, value) in &shape.traits {
        if trait_id.name == "documentation" {
            continue;
        }
        // Annotation traits render bare, valued ones with their node.
        match &value.value {
            smithy_model::NodeValue::Null => out.push_str(&format!("@{}\n", trait_id.name)),
            _ => out.push_str(&format!("@{}({})\n", trait_id.name, value)),
        }
    }
    out.push_str(&format!("{} {}", shape.shape_type, shape.id));
    if !shape.members.is_empty() {
        out.push_str(" {\n");
        for member in &shape.members {
            out.push_str(&format!("    {}: {}\n", member.name, member.target.name));
        }
        out.push('}');
    }
    out.push_str("\n```");

    if let Some(docs) = shape.get_trait("documentation").and_then(|node| node.as_str()) {
        out.push_str("\n\n");
        out.push_str(docs);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::project;
    use std::path::PathBuf;

    #[test]
    fn hover_renders_shape_and_documentation() {
        let text = "$version: \"2\"\nnamespace com.foo\n@documentation(\"A thing.\")\n@length(min: 1)\nstring Foo\n";
        let project = project::detached(PathBuf::from("/p/a.smithy"), text.to_string());
        let file = project.get_file(&PathBuf::from("/p/a.smithy")).unwrap();

        let hover = hover(&project, file, Position::new(4, 8)).unwrap();
        let HoverContents::Markup(markup) = hover.contents else {
            panic!("expected markup");
        };
        assert!(markup.value.contains("string com.foo#Foo"));
        assert!(markup.value.contains("@length"));
        assert!(markup.value.contains("A thing."));
    }

    #[test]
    fn hover_on_nothing_is_none() {
        let project = project::detached(
            PathBuf::from("/p/a.smithy"),
            "namespace com.foo\n\nstring Foo\n".to_string(),
        );
        let file = project.get_file(&PathBuf::from("/p/a.smithy")).unwrap();
        assert!(hover(&project, file, Position::new(1, 0)).is_none());
    }

    #[test]
    fn hover_serves_broken_but_present_models() {
        let text = "namespace com.foo\nstring Foo\napply Missing @length(min: 1)\n";
        let project = project::detached(PathBuf::from("/p/a.smithy"), text.to_string());
        assert!(project.model_result().is_broken());
        let file = project.get_file(&PathBuf::from("/p/a.smithy")).unwrap();
        let document = Document::of(text);
        let position = document.position_of_index(text.find("Foo").unwrap()).unwrap();
        assert!(hover(&project, file, position).is_some());
    }
}
