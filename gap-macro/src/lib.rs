//! Derive macros declaring the binding schema of gap structures.
//!
//! - `#[derive(Input)]` with `#[request("...")]` field attributes
//! - `#[derive(Output)]` with `#[response("...")]` field attributes
//! - `#[derive(IntoFailure)]`, structured when any field carries `#[response]`
//!
//! The tags are only collected here; they are parsed when the endpoint is
//! registered, so a malformed tag surfaces as a configuration error.
//!
//! # Example
//!
//! ```ignore
//! use gap::prelude::*;
//!
//! #[derive(Input)]
//! struct Login {
//!     #[request("header,authorization")]
//!     token: String,
//!     #[request("query,redirect")]
//!     redirect: Option<String>,
//! }
//!
//! #[derive(IntoFailure)]
//! struct AuthError {
//!     #[response("status")]
//!     status: u16,
//!     #[response("json,message")]
//!     message: String,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident, LitStr};

/// One named field and its raw tag, if any.
struct Field {
    ident: Ident,
    name: String,
    tag: Option<String>,
}

/// Collect the named fields of a struct with their `attr` tags.
///
/// Unit structs have no fields; tuple structs, enums and unions are refused.
fn struct_fields(input: &DeriveInput, attr: &str, derive: &str) -> syn::Result<Vec<Field>> {
    let data = match &input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                format!("{} can only be derived for structs", derive),
            ))
        }
    };

    let named = match &data.fields {
        Fields::Named(named) => named,
        Fields::Unit => return Ok(Vec::new()),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                &data.fields,
                format!("{} requires named fields", derive),
            ))
        }
    };

    named
        .named
        .iter()
        .map(|field| {
            let mut tag = None;
            for attribute in field.attrs.iter().filter(|a| a.path().is_ident(attr)) {
                if tag.is_some() {
                    return Err(syn::Error::new_spanned(
                        attribute,
                        format!("duplicate #[{}] attribute", attr),
                    ));
                }
                tag = Some(attribute.parse_args::<LitStr>()?.value());
            }

            // Fields always come from `Fields::Named`.
            let ident = field
                .ident
                .clone()
                .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
            Ok(Field {
                name: ident.unraw().to_string(),
                ident,
                tag,
            })
        })
        .collect()
}

/// `&[FieldSchema]` literal for the fields.
fn schema(fields: &[Field]) -> TokenStream2 {
    let entries = fields.iter().map(|field| {
        let name = &field.name;
        let tag = match &field.tag {
            Some(tag) => quote!(::std::option::Option::Some(#tag)),
            None => quote!(::std::option::Option::None),
        };
        quote!(::gap::binding::FieldSchema::new(#name, #tag))
    });
    quote!(&[#(#entries),*])
}

/// `Result<Vec<Emit>, BindError>` built from `self`'s fields.
fn emits(fields: &[Field]) -> TokenStream2 {
    let entries = fields.iter().map(|field| {
        let ident = &field.ident;
        let name = &field.name;
        quote!(::gap::binding::emit_field(self.#ident, #name))
    });
    quote! {{
        let emits: ::std::vec::Vec<
            ::std::result::Result<::gap::binding::Emit, ::gap::binding::BindError>,
        > = ::std::vec![#(#entries),*];
        ::std::iter::Iterator::collect(::std::iter::IntoIterator::into_iter(emits))
    }}
}

/// Derive `gap::Input` for a struct whose fields carry `#[request("...")]`.
///
/// Each field's type must implement `gap::binding::FromBound`.
#[proc_macro_derive(Input, attributes(request))]
pub fn derive_input(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate_input(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_input(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let fields = struct_fields(input, "request", "Input")?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let schema = schema(&fields);
    let assigns = fields.iter().map(|field| {
        let ident = &field.ident;
        let name = &field.name;
        quote!(#ident: ::gap::binding::next_field(&mut values, #name)?)
    });

    Ok(quote! {
        impl #impl_generics ::gap::function::Input for #name #ty_generics #where_clause {
            fn slot() -> ::gap::function::Slot {
                const FIELDS: &[::gap::binding::FieldSchema] = #schema;
                ::gap::function::Slot::Structured(FIELDS)
            }

            #[allow(unused_mut, unused_variables)]
            fn assemble(
                values: ::std::vec::Vec<::gap::binding::Bound>,
            ) -> ::std::result::Result<Self, ::gap::binding::BindError> {
                let mut values = ::std::iter::IntoIterator::into_iter(values);
                ::std::result::Result::Ok(Self { #(#assigns),* })
            }
        }
    })
}

/// Derive `gap::Output` for a struct whose fields carry `#[response("...")]`.
///
/// Also makes the struct a valid return type on its own. Each field's type
/// must implement `gap::binding::IntoEmit`.
#[proc_macro_derive(Output, attributes(response))]
pub fn derive_output(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate_output(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_output(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let fields = struct_fields(input, "response", "Output")?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let schema = schema(&fields);
    let emits = emits(&fields);

    Ok(quote! {
        impl #impl_generics ::gap::function::Output for #name #ty_generics #where_clause {
            const FIELDS: &'static [::gap::binding::FieldSchema] = #schema;

            fn into_emits(
                self,
            ) -> ::std::result::Result<::std::vec::Vec<::gap::binding::Emit>, ::gap::binding::BindError> {
                #emits
            }
        }

        impl #impl_generics ::gap::function::Returns for #name #ty_generics #where_clause {
            fn slots() -> ::std::vec::Vec<::gap::function::Slot> {
                ::std::vec![::gap::function::Slot::Structured(
                    <Self as ::gap::function::Output>::FIELDS,
                )]
            }

            fn into_returned(self) -> ::gap::function::Returned {
                ::gap::function::Returned::Output(::gap::function::Output::into_emits(self))
            }
        }
    })
}

/// Derive `gap::IntoFailure`.
///
/// A struct with at least one `#[response("...")]` field is a structured
/// failure: every field is bound like an output. Any other type, enums
/// included, is written as `{"error": self.to_string()}` and must implement
/// `Display`.
#[proc_macro_derive(IntoFailure, attributes(response))]
pub fn derive_into_failure(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate_into_failure(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_into_failure(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) if matches!(data.fields, Fields::Named(_)) => {
            struct_fields(input, "response", "IntoFailure")?
        }
        _ => Vec::new(),
    };

    let body = if fields.iter().any(|field| field.tag.is_some()) {
        let schema = schema(&fields);
        let emits = emits(&fields);
        quote! {
            fn kind() -> ::gap::function::FailureKind {
                const FIELDS: &[::gap::binding::FieldSchema] = #schema;
                ::gap::function::FailureKind::Structured(FIELDS)
            }

            fn into_failure(self) -> ::gap::function::Failure {
                ::gap::function::Failure::Structured(#emits)
            }
        }
    } else {
        quote! {
            fn kind() -> ::gap::function::FailureKind {
                ::gap::function::FailureKind::Message
            }

            fn into_failure(self) -> ::gap::function::Failure {
                ::gap::function::Failure::Message(::std::string::ToString::to_string(&self))
            }
        }
    };

    Ok(quote! {
        impl #impl_generics ::gap::function::IntoFailure for #name #ty_generics #where_clause {
            #body
        }
    })
}
