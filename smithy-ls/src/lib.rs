//! smithy-ls: a language server for the Smithy IDL.
//!
//! The server discovers projects from `smithy-build.json` and
//! `.smithy-project.json` files under the workspace roots, keeps a live
//! assembled model per project, re-assembles incrementally as documents
//! change, and answers hover, definition, completion, symbol, and formatting
//! requests over the current model.

pub mod backend;
pub mod capabilities;
pub mod convert;
pub mod deps;
pub mod document;
pub mod lifecycle;
pub mod project;
pub mod registrations;
pub mod state;

pub use backend::Backend;
