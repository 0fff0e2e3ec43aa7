//! Smithy model types, IDL parsing, and model assembly.
//!
//! This crate provides the model side of the language server: a parser for
//! the Smithy IDL statement subset, the shape/node/model types, and a
//! deterministic [`ModelAssembler`] that turns sources into a
//! [`ValidatedResult<Model>`]. Seed models let callers rebuild a model
//! partially: see [`ModelAssembler::add_model`].

mod assembler;
mod error;
pub mod idl;
mod json;
mod location;
mod model;
mod node;
pub mod prelude;
mod shapes;
mod validation;

pub use assembler::ModelAssembler;
pub use error::Error;
pub use idl::ParsedIdl;
pub use location::SourceLocation;
pub use model::Model;
pub use node::{Node, NodeValue};
pub use shapes::{Member, Shape, ShapeId, ShapeType};
pub use validation::{Severity, ValidatedResult, ValidationEvent};
