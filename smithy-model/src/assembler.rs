//! The model assembler.
//!
//! Takes a stream of (path, text) sources plus optional seed models, and
//! produces a [`ValidatedResult<Model>`]. Assembly is deterministic: the same
//! sources added in the same order always produce the same model and events.
//!
//! Seed models make partial rebuilds possible: shapes and metadata from a
//! seed survive untouched (including traits with [`SourceLocation::NONE`]),
//! and new sources merge into them under the same rules as a full build.

use std::collections::BTreeMap;

use crate::idl::{ParsedIdl, TraitApplication};
use crate::validation::validate;
use crate::{
    json, prelude, Member, Model, Node, NodeValue, Severity, Shape, ShapeId, SourceLocation,
    ValidatedResult, ValidationEvent,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum SourceKind {
    Idl,
    Json,
}

#[derive(Debug)]
struct Source {
    path: String,
    kind: SourceKind,
    text: String,
}

/// Assembles models from IDL and JSON sources.
#[derive(Debug, Default)]
pub struct ModelAssembler {
    sources: Vec<Source>,
    seeds: Vec<Model>,
    validation_disabled: bool,
}

impl ModelAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an IDL source. Sources assemble in the order they are added.
    pub fn add_idl(&mut self, path: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.sources.push(Source {
            path: path.into(),
            kind: SourceKind::Idl,
            text: text.into(),
        });
        self
    }

    /// Queue a JSON AST model file.
    pub fn add_json(&mut self, path: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.sources.push(Source {
            path: path.into(),
            kind: SourceKind::Json,
            text: text.into(),
        });
        self
    }

    /// Seed assembly with an existing model. Seeded shapes keep their traits
    /// verbatim; sources merge into them.
    pub fn add_model(&mut self, model: Model) -> &mut Self {
        self.seeds.push(model);
        self
    }

    /// Skip the validation pass: the result's events are then parse,
    /// shape-construction, and resolution events only.
    pub fn disable_validation(&mut self) -> &mut Self {
        self.validation_disabled = true;
        self
    }

    /// Run assembly.
    #[must_use]
    pub fn assemble(&self) -> ValidatedResult<Model> {
        tracing::debug!(
            sources = self.sources.len(),
            seeds = self.seeds.len(),
            validate = !self.validation_disabled,
            "assembling model"
        );
        let mut events = Vec::new();
        let mut model = Model::new();

        for seed in &self.seeds {
            for (id, shape) in &seed.shapes {
                model.shapes.insert(id.clone(), shape.clone());
            }
            model.metadata.extend(seed.metadata.iter().cloned());
        }

        // Parse everything up front; files that fail to parse contribute an
        // event and nothing else.
        let mut idl_files = Vec::new();
        let mut json_files = Vec::new();
        for source in &self.sources {
            match source.kind {
                SourceKind::Idl => match ParsedIdl::parse(&source.path, &source.text) {
                    Ok(parsed) => idl_files.push(parsed),
                    Err(err) => events.push(parse_event(&source.path, &err)),
                },
                SourceKind::Json => match json::parse(&source.path, &source.text) {
                    Ok(file) => json_files.push(file),
                    Err(err) => events.push(parse_event(&source.path, &err)),
                },
            }
        }

        // Definitions first so applies and member targets can reference
        // shapes from any file.
        for file in &json_files {
            for shape in &file.shapes {
                define_shape(&mut model, shape.clone(), &mut events);
            }
        }
        for parsed in &idl_files {
            let Some(namespace) = parsed.namespace() else {
                if !parsed.shapes.is_empty() {
                    events.push(ValidationEvent::error(
                        "Model",
                        "File defines shapes without a namespace",
                        SourceLocation::new(&parsed.filename, 1, 1),
                    ));
                }
                continue;
            };
            for statement in &parsed.shapes {
                let id = ShapeId::new(namespace, statement.name.clone());
                let mut shape = Shape::new(id, statement.shape_type, statement.source.clone());
                for member in &statement.members {
                    shape.members.push(Member {
                        name: member.name.clone(),
                        // Resolved in the second pass once every definition
                        // is known.
                        target: ShapeId::new("smithy.api", "Unit"),
                        traits: BTreeMap::new(),
                        source: member.source.clone(),
                    });
                }
                define_shape(&mut model, shape, &mut events);
            }
        }

        // Second pass: member targets, inline traits, applies, metadata.
        for parsed in &idl_files {
            self.resolve_file(parsed, &mut model, &mut events);
        }
        for file in &json_files {
            for (key, node) in &file.metadata {
                merge_metadata(&mut model, key, node.clone(), &mut events);
            }
        }

        if !self.validation_disabled {
            events.extend(validate(&model));
        }

        ValidatedResult::new(Some(model), events)
    }

    fn resolve_file(
        &self,
        parsed: &ParsedIdl,
        model: &mut Model,
        events: &mut Vec<ValidationEvent>,
    ) {
        for statement in &parsed.metadata {
            merge_metadata(model, &statement.key, statement.value.clone(), events);
        }

        let Some(namespace) = parsed.namespace().map(str::to_string) else {
            return;
        };

        for statement in &parsed.shapes {
            let id = ShapeId::new(&namespace, statement.name.clone());

            for (idx, member) in statement.members.iter().enumerate() {
                let Some(target_text) = &member.target else {
                    continue;
                };
                match resolve_shape_ref(parsed, &namespace, target_text, model) {
                    Ok(target) => {
                        if let Some(shape) = model.shapes.get_mut(&id) {
                            if let Some(slot) = shape.members.get_mut(idx) {
                                slot.target = target;
                            }
                        }
                    }
                    Err(()) => events.push(ValidationEvent::error(
                        "UnresolvedShape",
                        format!("Unable to resolve member target `{target_text}`"),
                        member.source.clone(),
                    )),
                }
                for applied in &member.traits {
                    let trait_id = resolve_trait_ref(parsed, &namespace, &applied.name);
                    apply_member_trait(model, &id, &member.name, trait_id, applied, events);
                }
            }

            for applied in &statement.traits {
                let trait_id = resolve_trait_ref(parsed, &namespace, &applied.name);
                apply_trait(model, &id, trait_id, applied, events);
            }
        }

        for statement in &parsed.applies {
            let (base, member) = match statement.target.split_once('$') {
                Some((base, member)) => (base, Some(member)),
                None => (statement.target.as_str(), None),
            };
            let Ok(target) = resolve_shape_ref(parsed, &namespace, base, model) else {
                events.push(ValidationEvent::error(
                    "UnresolvedShape",
                    format!("Unable to resolve apply target `{}`", statement.target),
                    statement.source.clone(),
                ));
                continue;
            };
            if !model.shapes.contains_key(&target) {
                events.push(ValidationEvent::error(
                    "UnresolvedShape",
                    format!("Cannot apply trait to unknown shape `{target}`"),
                    statement.source.clone(),
                ));
                continue;
            }
            let trait_id = resolve_trait_ref(parsed, &namespace, &statement.applied.name);
            match member {
                Some(member_name) => {
                    apply_member_trait(model, &target, member_name, trait_id, &statement.applied, events);
                }
                None => apply_trait(model, &target, trait_id, &statement.applied, events),
            }
        }
    }
}

fn parse_event(path: &str, err: &crate::Error) -> ValidationEvent {
    let location = err
        .location()
        .cloned()
        .unwrap_or_else(|| SourceLocation::new(path, 1, 1));
    ValidationEvent::new(Severity::Error, "Model", err.to_string(), location)
}

fn define_shape(model: &mut Model, shape: Shape, events: &mut Vec<ValidationEvent>) {
    if let Some(existing) = model.shapes.get(&shape.id) {
        events.push(ValidationEvent::error(
            "ConflictingShape",
            format!(
                "Shape `{}` is already defined at {}",
                shape.id, existing.source
            ),
            shape.source.clone(),
        ));
        return;
    }
    model.shapes.insert(shape.id.clone(), shape);
}

/// Resolve a shape reference: absolute, `use`-imported, defined in the file's
/// namespace, or a prelude simple shape.
fn resolve_shape_ref(
    parsed: &ParsedIdl,
    namespace: &str,
    text: &str,
    model: &Model,
) -> Result<ShapeId, ()> {
    if text.contains('#') {
        return text.parse().map_err(|_| ());
    }
    if let Some(target) = parsed.use_target(text) {
        return Ok(target.clone());
    }
    let local = ShapeId::new(namespace, text);
    if model.shapes.contains_key(&local) {
        return Ok(local);
    }
    if let Some(id) = prelude::resolve_simple_shape(text) {
        return Ok(id);
    }
    // Forward references to shapes from files that failed to parse end up
    // here; report them unresolved rather than guessing.
    Err(())
}

/// Resolve a trait name. Best-effort: an unresolvable name falls back to the
/// file's namespace and the validation pass reports it as an unknown trait.
fn resolve_trait_ref(parsed: &ParsedIdl, namespace: &str, text: &str) -> ShapeId {
    if text.contains('#') {
        if let Ok(id) = text.parse() {
            return id;
        }
    }
    if let Some(target) = parsed.use_target(text) {
        return target.clone();
    }
    if let Some(id) = prelude::resolve_trait(text) {
        return id;
    }
    ShapeId::new(namespace, text)
}

fn apply_trait(
    model: &mut Model,
    target: &ShapeId,
    trait_id: ShapeId,
    applied: &TraitApplication,
    events: &mut Vec<ValidationEvent>,
) {
    let Some(shape) = model.shapes.get_mut(target) else {
        events.push(ValidationEvent::error(
            "UnresolvedShape",
            format!("Cannot apply trait to unknown shape `{target}`"),
            applied.source.clone(),
        ));
        return;
    };
    let mut value = applied.value.clone();
    if value.source.is_none() {
        value.source = applied.source.clone();
    }
    merge_trait(&mut shape.traits, trait_id, value, target, events);
}

fn apply_member_trait(
    model: &mut Model,
    target: &ShapeId,
    member_name: &str,
    trait_id: ShapeId,
    applied: &TraitApplication,
    events: &mut Vec<ValidationEvent>,
) {
    let Some(member) = model
        .shapes
        .get_mut(target)
        .and_then(|shape| shape.members.iter_mut().find(|m| m.name == member_name))
    else {
        events.push(ValidationEvent::error(
            "UnresolvedShape",
            format!("Cannot apply trait to unknown member `{target}${member_name}`"),
            applied.source.clone(),
        ));
        return;
    };
    let mut value = applied.value.clone();
    if value.source.is_none() {
        value.source = applied.source.clone();
    }
    let member_id = target.clone().with_member(member_name);
    merge_trait(&mut member.traits, trait_id, value, &member_id, events);
}

/// Merge one trait value into a trait map. Array values concatenate in
/// contribution order; conflicting non-array duplicates keep the first value
/// and produce an event, except when the values are structurally equal.
fn merge_trait(
    traits: &mut BTreeMap<ShapeId, Node>,
    trait_id: ShapeId,
    value: Node,
    target: &ShapeId,
    events: &mut Vec<ValidationEvent>,
) {
    match traits.get_mut(&trait_id) {
        None => {
            traits.insert(trait_id, value);
        }
        Some(existing) => match (&mut existing.value, value.value) {
            (NodeValue::Array(existing_elements), NodeValue::Array(new_elements)) => {
                existing_elements.extend(new_elements);
            }
            (_, new_value) => {
                let new_node = Node::new(new_value, value.source.clone());
                if !existing.value_eq(&new_node) {
                    events.push(ValidationEvent::error(
                        "ConflictingTrait",
                        format!("Conflicting `{trait_id}` trait on `{target}`"),
                        value.source,
                    ));
                }
            }
        },
    }
}

/// Merge one metadata entry. Same rules as traits, keyed by name.
fn merge_metadata(
    model: &mut Model,
    key: &str,
    value: Node,
    events: &mut Vec<ValidationEvent>,
) {
    let existing = model
        .metadata
        .iter_mut()
        .find_map(|(k, node)| (k == key).then_some(node));
    match existing {
        None => model.metadata.push((key.to_string(), value)),
        Some(existing) => match (&mut existing.value, value.value) {
            (NodeValue::Array(existing_elements), NodeValue::Array(new_elements)) => {
                existing_elements.extend(new_elements);
            }
            (_, new_value) => {
                let new_node = Node::new(new_value, value.source.clone());
                if !existing.value_eq(&new_node) {
                    events.push(ValidationEvent::error(
                        "ConflictingMetadata",
                        format!("Conflicting metadata key `{key}`"),
                        value.source,
                    ));
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(sources: &[(&str, &str)]) -> ValidatedResult<Model> {
        let mut assembler = ModelAssembler::new();
        assembler.disable_validation();
        for (path, text) in sources {
            assembler.add_idl(*path, *text);
        }
        assembler.assemble()
    }

    #[test]
    fn applies_trait_across_files() {
        let result = assemble(&[
            (
                "m0.smithy",
                "$version: \"2\"\nnamespace com.foo\nstring Foo\napply Bar @length(min: 1)\n",
            ),
            ("m1.smithy", "$version: \"2\"\nnamespace com.foo\nstring Bar\n"),
        ]);
        assert!(!result.is_broken());
        let bar = result.unwrap().expect_shape("com.foo#Bar");
        let length = bar.get_trait("length").unwrap();
        assert_eq!(length.get("min").and_then(Node::as_integer), Some(1));
        assert_eq!(length.source.filename, "m0.smithy");
    }

    #[test]
    fn merges_array_traits_in_file_order() {
        let result = assemble(&[
            (
                "m0.smithy",
                "namespace com.foo\napply Bar @tags([\"foo\"])\n",
            ),
            ("m1.smithy", "namespace com.foo\nstring Bar\n"),
            (
                "m2.smithy",
                "namespace com.foo\napply Bar @tags([\"bar\"])\n",
            ),
        ]);
        let bar = result.unwrap().expect_shape("com.foo#Bar");
        let tags: Vec<_> = bar
            .get_trait("tags")
            .and_then(Node::as_array)
            .unwrap()
            .iter()
            .filter_map(Node::as_str)
            .collect();
        assert_eq!(tags, vec!["foo", "bar"]);
    }

    #[test]
    fn apply_to_unknown_shape_is_an_event() {
        let result = assemble(&[(
            "m0.smithy",
            "namespace com.foo\napply Missing @length(min: 1)\n",
        )]);
        assert!(result.is_broken());
        assert_eq!(result.events()[0].id, "UnresolvedShape");
        assert_eq!(result.events()[0].location.filename, "m0.smithy");
    }

    #[test]
    fn duplicate_definition_keeps_first() {
        let result = assemble(&[
            ("m0.smithy", "namespace com.foo\nstring Foo\n"),
            ("m1.smithy", "namespace com.foo\ninteger Foo\n"),
        ]);
        assert!(result.is_broken());
        let foo = result.unwrap().expect_shape("com.foo#Foo");
        assert_eq!(foo.source.filename, "m0.smithy");
    }

    #[test]
    fn seeded_shapes_survive_with_none_source_traits() {
        let mut seed = Model::new();
        let id = ShapeId::new("com.foo", "Kept");
        let mut shape = Shape::new(
            id.clone(),
            crate::ShapeType::String,
            SourceLocation::new("kept.smithy", 3, 1),
        );
        shape.traits.insert(
            ShapeId::new("smithy.api", "length"),
            Node::new(
                NodeValue::Object(vec![(
                    "min".to_string(),
                    Node::new(NodeValue::Integer(1), SourceLocation::NONE),
                )]),
                SourceLocation::NONE,
            ),
        );
        seed.shapes.insert(id, shape);

        let mut assembler = ModelAssembler::new();
        assembler
            .disable_validation()
            .add_model(seed)
            .add_idl("new.smithy", "namespace com.foo\nstring Fresh\n");
        let result = assembler.assemble();

        let kept = result.unwrap().expect_shape("com.foo#Kept");
        assert!(kept.get_trait("length").unwrap().source.is_none());
        assert!(result.unwrap().get_shape(&"com.foo#Fresh".parse().unwrap()).is_some());
    }

    #[test]
    fn metadata_arrays_concatenate() {
        let result = assemble(&[
            ("m0.smithy", "metadata tags = [\"a\"]\nnamespace com.foo\n"),
            ("m1.smithy", "metadata tags = [\"b\"]\nnamespace com.foo\n"),
        ]);
        let model = result.unwrap();
        let tags = model.metadata_value("tags").unwrap().as_array().unwrap();
        let values: Vec<_> = tags.iter().filter_map(Node::as_str).collect();
        assert_eq!(values, vec!["a", "b"]);
        assert_eq!(tags[0].source.filename, "m0.smithy");
        assert_eq!(tags[1].source.filename, "m1.smithy");
    }

    #[test]
    fn conflicting_metadata_is_an_event() {
        let result = assemble(&[
            ("m0.smithy", "metadata v = \"a\"\nnamespace com.foo\n"),
            ("m1.smithy", "metadata v = \"b\"\nnamespace com.foo\n"),
        ]);
        assert!(result.is_broken());
        assert_eq!(result.unwrap().metadata_value("v").unwrap().as_str(), Some("a"));
    }

    #[test]
    fn parse_failure_is_contained() {
        let result = assemble(&[
            ("bad.smithy", "namespace com.foo\nstring\n"),
            ("ok.smithy", "namespace com.foo\nstring Foo\n"),
        ]);
        assert!(result.is_broken());
        // The good file still assembled.
        assert!(result.unwrap().get_shape(&"com.foo#Foo".parse().unwrap()).is_some());
    }

    #[test]
    fn member_targets_resolve_through_use_and_prelude() {
        let result = assemble(&[
            (
                "m0.smithy",
                "namespace com.foo\nuse com.bar#Name\nstructure S {\n    a: Name\n    b: String\n    c: Local\n}\nstring Local\n",
            ),
            ("m1.smithy", "namespace com.bar\nstring Name\n"),
        ]);
        assert!(!result.is_broken());
        let s = result.unwrap().expect_shape("com.foo#S");
        assert_eq!(s.member("a").unwrap().target.to_string(), "com.bar#Name");
        assert_eq!(s.member("b").unwrap().target.to_string(), "smithy.api#String");
        assert_eq!(s.member("c").unwrap().target.to_string(), "com.foo#Local");
    }

    #[test]
    fn validation_pass_flags_unknown_traits() {
        let mut assembler = ModelAssembler::new();
        assembler.add_idl("m0.smithy", "namespace com.foo\n@mystery\nstring Foo\n");
        let result = assembler.assemble();
        assert!(result
            .events()
            .iter()
            .any(|event| event.id == "UnknownTrait" && event.severity == Severity::Warning));
    }

    #[test]
    fn assembly_is_deterministic() {
        let sources = [
            ("m0.smithy", "namespace com.foo\napply Bar @tags([\"x\"])\n"),
            ("m1.smithy", "namespace com.foo\nstring Bar\n"),
        ];
        let first = assemble(&sources);
        let second = assemble(&sources);
        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(first.events(), second.events());
    }
}
