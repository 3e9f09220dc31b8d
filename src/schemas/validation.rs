use std::any::type_name;

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use crate::{
    error::{PlannerError, Result},
    schemas::{CompletionSchema, SchemaHandle},
};

const MAX_SCHEMA_ERRORS: usize = 3;

/// Check a parsed model payload against a response schema.
pub fn validate_structured_payload(schema: &SchemaHandle, payload: &Value) -> Result<()> {
    let validator = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema.schema_json())
        .map_err(|err| {
            PlannerError::Validation(format!(
                "Failed to prepare `{}` schema for validation: {}",
                schema.schema_name(),
                err
            ))
        })?;

    if let Err(errors) = validator.validate(payload) {
        let mut details = Vec::new();
        let mut truncated = false;

        for (idx, error) in errors.enumerate() {
            if idx == MAX_SCHEMA_ERRORS {
                truncated = true;
                break;
            }
            let mut path = error.instance_path.to_string();
            if path.is_empty() {
                path = "<root>".to_string();
            }
            details.push(format!("{}: {}", path, error));
        }

        let mut detail_str = if details.is_empty() {
            "payload failed schema validation".to_string()
        } else {
            details.join("; ")
        };
        if truncated {
            detail_str.push_str("; additional errors truncated");
        }

        return Err(PlannerError::Validation(format!(
            "Response does not match `{}` schema: {}",
            schema.schema_name(),
            detail_str
        )));
    }

    Ok(())
}

/// Validate then deserialize a payload into its response type.
///
/// Deserialization failures name the offending path, e.g. `itinerary[2].activities`.
pub fn decode_structured<T: CompletionSchema>(payload: &Value) -> Result<T> {
    let schema = T::schema();
    ensure_schema_matches::<T>(schema)?;
    validate_structured_payload(schema, payload)?;

    let raw = payload.to_string();
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        let location = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        PlannerError::Format(format!(
            "failed to deserialize `{}` at {}: {}",
            schema.schema_name(),
            location,
            err.inner()
        ))
    })
}

/// Instructions appended to a stage prompt so the model answers in the expected shape.
pub fn schema_instructions(schema: &SchemaHandle) -> String {
    format!(
        "Structured response requirement: respond with ONLY a JSON object that conforms to the `{}` schema below. Do not add commentary outside the JSON.\n\nTop-level fields:\n{}\n\n{}",
        schema.schema_name(),
        schema.field_summary(),
        schema.to_prompt_string()
    )
}

fn ensure_schema_matches<T: 'static>(schema: &SchemaHandle) -> Result<()> {
    if !schema.describes::<T>() {
        return Err(PlannerError::Validation(format!(
            "schema `{}` does not match target type `{}`",
            schema.schema_name(),
            type_name::<T>(),
        )));
    }
    Ok(())
}
