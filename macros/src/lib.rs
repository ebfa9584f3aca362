//! Derive macros for Courier requests
//!
//! Every Courier request needs the same boilerplate: a `Request` impl that
//! exposes its metadata field, plus the marker impl of its kind. These
//! derives generate both.
//!
//! # Available Macros
//!
//! - `#[derive(Command)]`
//! - `#[derive(DomainEvent)]`
//! - `#[derive(IntegrationEvent)]`
//! - `#[derive(Query)]` with `#[query(output = T)]`
//!
//! The metadata field is the one named `metadata`, or the one marked with
//! `#[metadata]`.
//!
//! # Example
//!
//! ```ignore
//! use courier_core::metadata::Metadata;
//! use courier_macros::{Command, Query};
//!
//! #[derive(Command, Clone, Debug)]
//! struct CreateAccount {
//!     id: u64,
//!     name: String,
//!     metadata: Metadata,
//! }
//!
//! #[derive(Query, Clone, Debug)]
//! #[query(output = Option<AccountProjection>)]
//! struct GetAccount {
//!     id: u64,
//!     #[metadata]
//!     meta: Metadata,
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, Type, parse_macro_input};

/// Derive macro for commands
///
/// Implements `courier_core::request::Request` and
/// `courier_core::command::Command`.
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-struct type
/// - The struct has no metadata field
#[proc_macro_derive(Command, attributes(metadata))]
pub fn derive_command(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_kind(&input, "Command", &quote!(::courier_core::command::Command))
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derive macro for domain events
///
/// Implements `courier_core::request::Request` and
/// `courier_core::domain::DomainEvent`.
#[proc_macro_derive(DomainEvent, attributes(metadata))]
pub fn derive_domain_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_kind(
        &input,
        "DomainEvent",
        &quote!(::courier_core::domain::DomainEvent),
    )
    .unwrap_or_else(syn::Error::into_compile_error)
    .into()
}

/// Derive macro for integration events
///
/// Implements `courier_core::request::Request` and
/// `courier_core::integration::IntegrationEvent`.
#[proc_macro_derive(IntegrationEvent, attributes(metadata))]
pub fn derive_integration_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_kind(
        &input,
        "IntegrationEvent",
        &quote!(::courier_core::integration::IntegrationEvent),
    )
    .unwrap_or_else(syn::Error::into_compile_error)
    .into()
}

/// Derive macro for queries
///
/// Implements `courier_core::request::Request` and
/// `courier_core::query::Query`, taking the output type from the required
/// `#[query(output = T)]` attribute.
///
/// # Example
///
/// ```ignore
/// #[derive(Query, Clone, Debug)]
/// #[query(output = AccountProjection)]
/// struct GetAccount {
///     id: u64,
///     metadata: Metadata,
/// }
/// ```
#[proc_macro_derive(Query, attributes(metadata, query))]
pub fn derive_query(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_query(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_kind(
    input: &DeriveInput,
    derive: &str,
    kind: &TokenStream2,
) -> syn::Result<TokenStream2> {
    let request = expand_request(input, derive)?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #request

        impl #impl_generics #kind for #name #ty_generics #where_clause {}
    })
}

fn expand_query(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let request = expand_request(input, "Query")?;
    let output = query_output(input)?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #request

        impl #impl_generics ::courier_core::query::Query for #name #ty_generics #where_clause {
            type Output = #output;
        }
    })
}

fn expand_request(input: &DeriveInput, derive: &str) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let field = metadata_field(input, derive)?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::courier_core::request::Request for #name #ty_generics #where_clause {
            fn metadata(&self) -> &::courier_core::metadata::Metadata {
                &self.#field
            }

            fn metadata_mut(&mut self) -> &mut ::courier_core::metadata::Metadata {
                &mut self.#field
            }
        }
    })
}

/// Finds the metadata field: the one marked `#[metadata]`, else the one
/// named `metadata`.
fn metadata_field<'a>(input: &'a DeriveInput, derive: &str) -> syn::Result<&'a Ident> {
    let Data::Struct(data_struct) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            format!("#[derive({derive})] can only be used on structs"),
        ));
    };

    let Fields::Named(fields) = &data_struct.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            format!("#[derive({derive})] requires a struct with named fields"),
        ));
    };

    let marked = fields
        .named
        .iter()
        .find(|field| has_attribute(&field.attrs, "metadata"));
    let named = || {
        fields
            .named
            .iter()
            .find(|field| field.ident.as_ref().is_some_and(|ident| ident == "metadata"))
    };

    marked
        .or_else(named)
        .and_then(|field| field.ident.as_ref())
        .ok_or_else(|| {
            syn::Error::new_spanned(
                &input.ident,
                format!(
                    "#[derive({derive})] needs a `metadata: Metadata` field or a field marked #[metadata]"
                ),
            )
        })
}

fn query_output(input: &DeriveInput) -> syn::Result<Type> {
    let mut output = None;

    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("query")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("output") {
                output = Some(meta.value()?.parse::<Type>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported query attribute, expected `output = Type`"))
            }
        })?;
    }

    output.ok_or_else(|| {
        syn::Error::new_spanned(
            &input.ident,
            "#[derive(Query)] requires #[query(output = Type)]",
        )
    })
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
