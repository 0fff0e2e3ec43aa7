//! The `smithy.api` prelude subset known to the assembler.

use crate::{ShapeId, ShapeType};

pub const NAMESPACE: &str = "smithy.api";

/// Prelude simple shapes, resolvable as bare member targets.
const SIMPLE_SHAPES: &[(&str, ShapeType)] = &[
    ("Blob", ShapeType::Blob),
    ("Boolean", ShapeType::Boolean),
    ("String", ShapeType::String),
    ("Byte", ShapeType::Byte),
    ("Short", ShapeType::Short),
    ("Integer", ShapeType::Integer),
    ("Long", ShapeType::Long),
    ("Float", ShapeType::Float),
    ("Double", ShapeType::Double),
    ("BigInteger", ShapeType::BigInteger),
    ("BigDecimal", ShapeType::BigDecimal),
    ("Timestamp", ShapeType::Timestamp),
    ("Document", ShapeType::Document),
    ("Unit", ShapeType::Structure),
    ("PrimitiveBoolean", ShapeType::Boolean),
    ("PrimitiveInteger", ShapeType::Integer),
    ("PrimitiveLong", ShapeType::Long),
];

/// Prelude traits, resolvable as bare trait names.
const TRAITS: &[&str] = &[
    "length",
    "pattern",
    "range",
    "tags",
    "documentation",
    "required",
    "readonly",
    "idempotent",
    "error",
    "default",
    "deprecated",
    "internal",
    "sensitive",
    "since",
    "title",
    "trait",
    "enumValue",
    "uniqueItems",
    "sparse",
    "mixin",
    "private",
    "externalDocumentation",
];

/// Resolve a bare name against the prelude's simple shapes.
#[must_use]
pub fn resolve_simple_shape(name: &str) -> Option<ShapeId> {
    SIMPLE_SHAPES
        .iter()
        .find(|(shape_name, _)| *shape_name == name)
        .map(|_| ShapeId::new(NAMESPACE, name))
}

/// Resolve a bare trait name against the prelude.
#[must_use]
pub fn resolve_trait(name: &str) -> Option<ShapeId> {
    TRAITS
        .contains(&name)
        .then(|| ShapeId::new(NAMESPACE, name))
}

/// Whether `id` names a prelude trait.
#[must_use]
pub fn is_trait(id: &ShapeId) -> bool {
    id.namespace == NAMESPACE && TRAITS.contains(&id.name.as_str())
}

/// Whether `id` names a prelude shape (simple shape or trait definition).
#[must_use]
pub fn is_shape(id: &ShapeId) -> bool {
    id.namespace == NAMESPACE
        && (TRAITS.contains(&id.name.as_str())
            || SIMPLE_SHAPES.iter().any(|(name, _)| *name == id.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_simple_shapes_and_traits() {
        assert_eq!(
            resolve_simple_shape("String").map(|id| id.to_string()),
            Some("smithy.api#String".to_string())
        );
        assert!(resolve_simple_shape("length").is_none());
        assert_eq!(
            resolve_trait("tags").map(|id| id.to_string()),
            Some("smithy.api#tags".to_string())
        );
        assert!(resolve_trait("String").is_none());
    }
}
