//! Document symbols: the shapes a file defines.

use tower_lsp::lsp_types::{DocumentSymbol, SymbolKind};

use smithy_model::ShapeType;

use crate::convert::location_to_range;
use crate::project::{Project, ProjectFile};

#[must_use]
#[allow(deprecated)] // `DocumentSymbol::deprecated` must still be filled.
pub fn document_symbols(project: &Project, file: &ProjectFile) -> Vec<DocumentSymbol> {
    let Some(model) = project.model_result().value() else {
        return Vec::new();
    };
    let filename = file.path().to_string_lossy();

    let mut shapes: Vec<_> = model.shapes_in_file(&filename).collect();
    shapes.sort_by_key(|shape| (shape.source.line, shape.source.column));

    shapes
        .into_iter()
        .map(|shape| {
            let range = location_to_range(&shape.source);
            DocumentSymbol {
                name: shape.id.name.clone(),
                detail: Some(shape.shape_type.to_string()),
                kind: symbol_kind(shape.shape_type),
                tags: None,
                deprecated: None,
                range,
                selection_range: range,
                children: None,
            }
        })
        .collect()
}

fn symbol_kind(shape_type: ShapeType) -> SymbolKind {
    match shape_type {
        ShapeType::Structure | ShapeType::Union => SymbolKind::STRUCT,
        ShapeType::Enum | ShapeType::IntEnum => SymbolKind::ENUM,
        ShapeType::Service | ShapeType::Resource => SymbolKind::MODULE,
        ShapeType::Operation => SymbolKind::FUNCTION,
        ShapeType::Boolean => SymbolKind::BOOLEAN,
        ShapeType::Byte
        | ShapeType::Short
        | ShapeType::Integer
        | ShapeType::Long
        | ShapeType::Float
        | ShapeType::Double
        | ShapeType::BigInteger
        | ShapeType::BigDecimal => SymbolKind::NUMBER,
        ShapeType::List | ShapeType::Map => SymbolKind::ARRAY,
        _ => SymbolKind::STRING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project;
    use std::path::PathBuf;

    #[test]
    fn symbols_appear_in_source_order() {
        let text = "namespace com.foo\nstring Zeta\nstructure Alpha {\n    x: Integer\n}\n";
        let project = project::detached(PathBuf::from("/p/a.smithy"), text.to_string());
        let file = project.get_file(&PathBuf::from("/p/a.smithy")).unwrap();

        let symbols = document_symbols(&project, file);
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
        assert_eq!(symbols[1].kind, SymbolKind::STRUCT);
        assert_eq!(symbols[0].range.start.line, 1);
    }
}
