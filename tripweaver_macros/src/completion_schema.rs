use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{spanned::Spanned, ItemStruct, LitStr};

use crate::schema_extraction::{
    collect_doc_comments, collect_field_docs, ensure_named_struct, infer_description,
    infer_schema_name, parse_completion_schema_args, CompletionSchemaArgs,
};

pub fn completion_schema(attr: TokenStream, item: TokenStream) -> TokenStream {
    let expanded = parse_completion_schema_args(attr).and_then(|args| {
        let item_struct = syn::parse::<ItemStruct>(item)?;
        expand(args, item_struct)
    });

    match expanded {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(args: CompletionSchemaArgs, item_struct: ItemStruct) -> syn::Result<TokenStream2> {
    ensure_named_struct(&item_struct)?;
    // One static handle per type; a generic struct would need one per instantiation.
    if !item_struct.generics.params.is_empty() {
        return Err(syn::Error::new(
            item_struct.generics.span(),
            "`#[completion_schema]` response types cannot be generic",
        ));
    }

    let ident = &item_struct.ident;
    let rust_type = LitStr::new(&ident.to_string(), Span::call_site());
    let title = infer_schema_name(&item_struct, args.name.as_ref());
    let summary = match infer_description(
        args.description.as_ref(),
        collect_doc_comments(&item_struct.attrs),
    ) {
        Some(lit) => quote! { Some(#lit) },
        None => quote! { None },
    };
    let fields = collect_field_docs(&item_struct).into_iter().map(|(key, doc)| {
        let key = LitStr::new(&key, Span::call_site());
        let doc = LitStr::new(&doc, Span::call_site());
        quote! { (#key, #doc) }
    });

    Ok(quote! {
        #item_struct

        impl tripweaver::schema::CompletionSchema for #ident {
            fn schema() -> &'static tripweaver::schema::SchemaHandle {
                static DOCS: tripweaver::schema::ResponseDocs = tripweaver::schema::ResponseDocs {
                    title: #title,
                    summary: #summary,
                    fields: &[#(#fields),*],
                };
                static HANDLE: std::sync::OnceLock<tripweaver::schema::SchemaHandle> =
                    std::sync::OnceLock::new();
                HANDLE.get_or_init(|| {
                    tripweaver::schema::SchemaHandle::for_response::<Self>(
                        &DOCS,
                        #rust_type,
                        schemars::schema_for!(Self),
                    )
                })
            }
        }
    })
}
