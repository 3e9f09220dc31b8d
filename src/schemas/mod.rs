//! JSON schemas for model-facing response types.

pub mod schema;
pub mod validation;

pub use schema::{CompletionSchema, ResponseDocs, SchemaHandle};
pub use validation::{decode_structured, schema_instructions, validate_structured_payload};
