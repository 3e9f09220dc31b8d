use std::{any::TypeId, sync::Arc};

use schemars::schema::{RootSchema, Schema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Doc text lifted off a response struct by `#[completion_schema]`.
///
/// `fields` is keyed by the JSON name, so `#[serde(rename)]` fields line up
/// with the generated properties.
#[derive(Debug)]
pub struct ResponseDocs {
    pub title: &'static str,
    pub summary: Option<&'static str>,
    pub fields: &'static [(&'static str, &'static str)],
}

impl ResponseDocs {
    /// Fill in missing titles and descriptions; anything schemars already
    /// set is kept.
    pub fn stamp(&self, root: &mut RootSchema) {
        let metadata = root.schema.metadata();
        metadata.title.get_or_insert_with(|| self.title.to_string());
        if let Some(summary) = self.summary {
            metadata
                .description
                .get_or_insert_with(|| summary.to_string());
        }

        let Some(object) = root.schema.object.as_mut() else {
            return;
        };
        for (key, doc) in self.fields {
            if let Some(Schema::Object(property)) = object.properties.get_mut(*key) {
                property
                    .metadata()
                    .description
                    .get_or_insert_with(|| (*doc).to_string());
            }
        }
    }
}

/// The JSON shape one stage asks the model for, built once per type.
#[derive(Clone, Debug)]
pub struct SchemaHandle {
    name: &'static str,
    rust_type: &'static str,
    target: TypeId,
    required: Arc<[String]>,
    json: Arc<Value>,
}

impl SchemaHandle {
    pub fn for_response<T: 'static>(
        docs: &ResponseDocs,
        rust_type: &'static str,
        mut root: RootSchema,
    ) -> Self {
        docs.stamp(&mut root);
        let required: Arc<[String]> = match root.schema.object.as_ref() {
            Some(object) => object.required.iter().cloned().collect(),
            None => Arc::from(Vec::new()),
        };
        // RootSchema is plain data; serializing it cannot fail.
        let json = serde_json::to_value(root).unwrap_or(Value::Null);

        Self {
            name: docs.title,
            rust_type,
            target: TypeId::of::<T>(),
            required,
            json: Arc::new(json),
        }
    }

    pub fn schema_name(&self) -> &'static str {
        self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.rust_type
    }

    /// True when this handle was built for `T`.
    pub fn describes<T: 'static>(&self) -> bool {
        self.target == TypeId::of::<T>()
    }

    pub fn schema_json(&self) -> &Value {
        &self.json
    }

    /// Top-level keys a reply must carry.
    pub fn required_fields(&self) -> &[String] {
        &self.required
    }

    /// One line per top-level key, e.g.
    /// `- itinerary (required, array): one entry per trip day`.
    pub fn field_summary(&self) -> String {
        let Some(properties) = self.json.get("properties").and_then(Value::as_object) else {
            return String::new();
        };

        properties
            .iter()
            .map(|(key, property)| {
                let mut tags = Vec::new();
                if self.required.iter().any(|field| field == key) {
                    tags.push("required".to_string());
                }
                if let Some(kind) = property_kind(property) {
                    tags.push(kind);
                }
                let mut line = format!("- {key}");
                if !tags.is_empty() {
                    line.push_str(&format!(" ({})", tags.join(", ")));
                }
                if let Some(description) = property.get("description").and_then(Value::as_str) {
                    line.push_str(&format!(": {description}"));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full schema, pretty-printed for a prompt.
    pub fn to_prompt_string(&self) -> String {
        serde_json::to_string_pretty(self.schema_json()).unwrap_or_default()
    }
}

/// `string`, `integer/null`, or the referenced definition's name.
fn property_kind(property: &Value) -> Option<String> {
    match property.get("type") {
        Some(Value::String(kind)) => Some(kind.clone()),
        Some(Value::Array(kinds)) => Some(
            kinds
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("/"),
        ),
        _ => property
            .get("$ref")
            .or_else(|| property.pointer("/allOf/0/$ref"))
            .and_then(Value::as_str)
            .and_then(|reference| reference.rsplit('/').next())
            .map(str::to_string),
    }
}

/// Implemented by `#[completion_schema]` for every structure a stage asks the model for.
pub trait CompletionSchema: DeserializeOwned + Send + Sync + 'static {
    fn schema() -> &'static SchemaHandle;
}
