use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{prelude, Node, Shape, ShapeId};

/// An assembled, possibly partial, Smithy model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub shapes: BTreeMap<ShapeId, Shape>,
    /// Metadata entries in merge order. Array values carry per-element
    /// source locations.
    pub metadata: Vec<(String, Node)>,
}

impl Model {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get_shape(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    /// The shape with the given id.
    ///
    /// # Panics
    ///
    /// Panics when the shape is absent. Test helper; production paths use
    /// [`Model::get_shape`].
    #[must_use]
    pub fn expect_shape(&self, id: &str) -> &Shape {
        let id: ShapeId = id.parse().expect("valid shape id");
        self.shapes
            .get(&id)
            .unwrap_or_else(|| panic!("shape not found: {id}"))
    }

    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&Node> {
        self.metadata
            .iter()
            .find_map(|(k, node)| (k == key).then_some(node))
    }

    /// Shapes whose definition originates in `filename`.
    pub fn shapes_in_file<'a>(&'a self, filename: &'a str) -> impl Iterator<Item = &'a Shape> {
        self.shapes
            .values()
            .filter(move |shape| shape.source.filename == filename)
    }

    /// Whether `id` resolves to a trait definition, in the prelude or in
    /// this model.
    #[must_use]
    pub fn is_known_trait(&self, id: &ShapeId) -> bool {
        if prelude::is_trait(id) {
            return true;
        }
        self.shapes
            .get(id)
            .is_some_and(|shape| shape.has_trait("trait"))
    }
}
