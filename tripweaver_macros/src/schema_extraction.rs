use proc_macro2::Span;
use syn::{
    parse::Parser, punctuated::Punctuated, spanned::Spanned, Attribute, Expr, ExprLit, Field, Fields,
    ItemStruct, Lit, LitStr, Meta, MetaNameValue, Token,
};

#[derive(Default)]
pub struct CompletionSchemaArgs {
    pub name: Option<LitStr>,
    pub description: Option<LitStr>,
}

pub fn parse_completion_schema_args(
    attr: proc_macro::TokenStream,
) -> syn::Result<CompletionSchemaArgs> {
    let mut result = CompletionSchemaArgs::default();
    if attr.is_empty() {
        return Ok(result);
    }

    let args = Punctuated::<MetaNameValue, Token![,]>::parse_terminated.parse(attr)?;

    for arg in args {
        let ident = arg
            .path
            .get_ident()
            .ok_or_else(|| syn::Error::new_spanned(&arg.path, "expected identifier"))?;
        let value = string_literal(&arg.value)
            .ok_or_else(|| syn::Error::new_spanned(&arg.value, "expected string literal value"))?;

        let slot = match ident.to_string().as_str() {
            "name" => &mut result.name,
            "description" => &mut result.description,
            other => {
                return Err(syn::Error::new(
                    ident.span(),
                    format!("unsupported argument `{other}`"),
                ))
            }
        };

        if slot.is_some() {
            return Err(syn::Error::new(
                ident.span(),
                format!("duplicate `{ident}` argument"),
            ));
        }
        *slot = Some(value);
    }

    Ok(result)
}

fn string_literal(expr: &Expr) -> Option<LitStr> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(lit), ..
        }) => Some(lit.clone()),
        _ => None,
    }
}

pub fn ensure_named_struct(item: &ItemStruct) -> syn::Result<()> {
    if matches!(item.fields, Fields::Named(_)) {
        return Ok(());
    }
    Err(syn::Error::new(
        item.struct_token.span(),
        "`#[completion_schema]` only supports structs with named fields",
    ))
}

/// Joins `///` lines; they arrive as `#[doc = "..."]` name-value attributes.
pub fn collect_doc_comments(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(name_value) => string_literal(&name_value.value),
            _ => None,
        })
        .map(|lit| lit.value().trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" "))
    }
}

pub fn collect_field_docs(item: &ItemStruct) -> Vec<(String, String)> {
    let Fields::Named(fields) = &item.fields else {
        return Vec::new();
    };

    fields
        .named
        .iter()
        .filter_map(|field| {
            let doc = collect_doc_comments(&field.attrs)?;
            Some((json_key(field)?, doc))
        })
        .collect()
}

/// The key a field is written under: its `#[serde(rename = "...")]` value,
/// else its identifier.
fn json_key(field: &Field) -> Option<String> {
    let mut renamed = None;
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        // Shapes this walk does not understand just leave the identifier in place.
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                renamed = Some(value.value());
            } else if meta.input.peek(Token![=]) {
                meta.value()?.parse::<Expr>()?;
            }
            Ok(())
        });
    }
    renamed.or_else(|| field.ident.as_ref().map(ToString::to_string))
}

pub fn infer_schema_name(item: &ItemStruct, explicit: Option<&LitStr>) -> LitStr {
    explicit
        .cloned()
        .unwrap_or_else(|| LitStr::new(&item.ident.to_string(), Span::call_site()))
}

pub fn infer_description(explicit: Option<&LitStr>, doc: Option<String>) -> Option<LitStr> {
    explicit
        .cloned()
        .or_else(|| doc.map(|text| LitStr::new(&text, Span::call_site())))
}
