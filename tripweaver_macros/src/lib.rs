//! Procedural macros for tripweaver.
//!
//! `#[completion_schema]` turns a model-facing response struct into a
//! `tripweaver::schema::CompletionSchema`, so every prompted stage can show the
//! model the JSON shape it expects and validate the reply against it.

mod completion_schema;
mod schema_extraction;

use proc_macro::TokenStream;

/// Attach a cached JSON schema to a named-field struct.
///
/// Optional arguments: `name = "..."` overrides the schema title and
/// `description = "..."` overrides the struct doc comment.
#[proc_macro_attribute]
pub fn completion_schema(attr: TokenStream, item: TokenStream) -> TokenStream {
    completion_schema::completion_schema(attr, item)
}
