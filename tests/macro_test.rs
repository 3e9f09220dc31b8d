use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tripweaver::{completion_schema, schema::decode_structured, CompletionSchema};

/// A single sight worth a detour
#[derive(Debug, Deserialize, JsonSchema)]
#[completion_schema]
struct SightPick {
    /// Name as it appears on local signage
    name: String,
    #[serde(default)]
    rating: Option<f64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[completion_schema(name = "DayOutline", description = "Outline of one day")]
struct Outline {
    theme: String,
}

/// One stop on a walking route
#[derive(Debug, Deserialize, JsonSchema)]
#[completion_schema]
struct RouteStop {
    /// Kind of stop, such as cafe or viewpoint
    #[serde(rename = "type", default)]
    kind: String,
    /// Minutes spent at the stop
    minutes: u32,
}

#[test]
fn test_macro_uses_struct_name_and_docs() {
    let handle = SightPick::schema();

    assert_eq!(handle.schema_name(), "SightPick");
    assert_eq!(handle.type_name(), "SightPick");

    let schema = handle.schema_json();
    assert_eq!(schema["description"], "A single sight worth a detour");
    assert_eq!(
        schema["properties"]["name"]["description"],
        "Name as it appears on local signage"
    );
}

#[test]
fn test_macro_explicit_name_and_description() {
    let handle = Outline::schema();

    assert_eq!(handle.schema_name(), "DayOutline");
    assert_eq!(handle.type_name(), "Outline");
    assert_eq!(handle.schema_json()["description"], "Outline of one day");
}

#[test]
fn test_renamed_fields_keep_their_docs() {
    let handle = RouteStop::schema();
    let schema = handle.schema_json();

    assert_eq!(
        schema["properties"]["type"]["description"],
        "Kind of stop, such as cafe or viewpoint"
    );
    assert!(schema["properties"].get("kind").is_none());
    assert_eq!(handle.required_fields(), ["minutes".to_string()]);

    let summary = handle.field_summary();
    assert!(summary.contains("- minutes (required, integer): Minutes spent at the stop"));
    assert!(summary.contains("- type (string): Kind of stop"));
}

#[test]
fn test_schema_handle_is_cached() {
    assert!(std::ptr::eq(SightPick::schema(), SightPick::schema()));
}

#[test]
fn test_decode_accepts_optional_fields() {
    let pick: SightPick = decode_structured(&json!({"name": "Lello bookshop"})).unwrap();
    assert_eq!(pick.name, "Lello bookshop");
    assert!(pick.rating.is_none());
}

#[test]
fn test_decode_rejects_missing_required() {
    let err = decode_structured::<SightPick>(&json!({"rating": 4.5})).unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
}
