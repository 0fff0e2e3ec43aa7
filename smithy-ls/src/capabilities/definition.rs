//! Go-to-definition: shape-id token to the shape's source location.

use tower_lsp::lsp_types::{Location, Position};

use crate::convert::location_to_lsp;
use crate::project::{Project, ProjectFile};

#[must_use]
pub fn definition(project: &Project, file: &ProjectFile, position: Position) -> Option<Location> {
    let token = file.document().copy_document_id(position)?;
    let model = project.model_result().value()?;
    let shape = super::resolve_token(model, file, &token.text)?;
    location_to_lsp(&shape.source)
}
