//! Derive macros for the `Encode`, `Decode` and `Describe` traits.
//!
//! This crate provides derive macros for automatically implementing the
//! [`Encode`], [`Decode`] and [`Describe`] traits from the `borsh_wire`
//! crate.
//!
//! # Supported Types
//!
//! The derive macros support:
//! - Structs with named fields
//! - Tuple structs
//! - Unit structs
//!
//! Enums and unions are rejected with a compile error: tagged unions are
//! not part of the wire format.
//!
//! # Examples
//!
//! ## Struct with Named Fields
//!
//! ```ignore
//! use borsh_wire_derive::{Decode, Describe, Encode};
//!
//! #[derive(Encode, Decode, Describe)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//! ```
//!
//! ## Tuple Struct
//!
//! ```ignore
//! #[derive(Encode, Decode, Describe)]
//! struct Id(u64);
//! ```
//!
//! # Attributes
//!
//! ## `#[borsh(skip)]`
//!
//! Skip a field during serialization and use `Default::default()` during
//! deserialization. The field is also left out of the described shape.
//!
//! ```ignore
//! #[derive(Encode, Decode, Describe)]
//! struct Entry {
//!     name: String,
//!     #[borsh(skip)]
//!     cache: Vec<u8>, // Uses Default::default() when decoding
//! }
//! ```
//!
//! ## `#[borsh(crate = "...")]`
//!
//! Container attribute naming the path of the `borsh_wire` crate, for
//! when it is re-exported under another name.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DataStruct, DeriveInput, Field, Index, Member, Path, Type,
    ext::IdentExt, parse_macro_input, parse_quote,
};

/// A struct field as seen by the generated code.
struct FieldInfo<'a> {
    member: Member,
    name: String,
    ty: &'a Type,
    skip: bool,
}

/// Checks if a field has the `#[borsh(skip)]` attribute.
fn should_skip(field: &Field) -> syn::Result<bool> {
    let mut skip = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("borsh") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("unknown borsh field attribute"))
            }
        })?;
    }

    Ok(skip)
}

/// Reads the `#[borsh(crate = "...")]` container attribute, defaulting to
/// `::borsh_wire`.
fn crate_path(input: &DeriveInput) -> syn::Result<Path> {
    let mut path = parse_quote!(::borsh_wire);

    for attr in &input.attrs {
        if !attr.path().is_ident("borsh") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let value: syn::LitStr = meta.value()?.parse()?;
                path = value.parse()?;
                Ok(())
            } else {
                Err(meta.error("unknown borsh container attribute"))
            }
        })?;
    }

    Ok(path)
}

fn struct_data<'a>(
    input: &'a DeriveInput,
    trait_name: &str,
) -> syn::Result<&'a DataStruct> {
    match &input.data {
        Data::Struct(data_struct) => Ok(data_struct),
        Data::Enum(_) => Err(syn::Error::new_spanned(
            &input.ident,
            format!(
                "{trait_name} cannot be derived for enums: tagged unions are \
                 not supported by the borsh wire format"
            ),
        )),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            format!(
                "{trait_name} cannot be derived for unions: untagged unions \
                 are not supported by the borsh wire format"
            ),
        )),
    }
}

fn fields(data_struct: &DataStruct) -> syn::Result<Vec<FieldInfo<'_>>> {
    data_struct
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let (member, name) = match &field.ident {
                Some(ident) => {
                    (Member::Named(ident.clone()), ident.unraw().to_string())
                }
                None => {
                    (Member::Unnamed(Index::from(index)), index.to_string())
                }
            };

            Ok(FieldInfo {
                member,
                name,
                ty: &field.ty,
                skip: should_skip(field)?,
            })
        })
        .collect()
}

/// Adds `T: #bound` for every type parameter.
fn bounded_generics(input: &DeriveInput, bound: &Path) -> syn::Generics {
    let mut generics = input.generics.clone();
    let where_clause = generics.make_where_clause();

    for param in &input.generics.params {
        if let syn::GenericParam::Type(type_param) = param {
            let ident = &type_param.ident;
            where_clause.predicates.push(parse_quote!(#ident: #bound));
        }
    }

    generics
}

/// Derive macro for `Encode`.
///
/// All non-skipped fields are encoded in declaration order with no
/// framing of their own.
///
/// ```ignore
/// #[derive(Encode)]
/// struct Person {
///     name: String,
///     age: u32,
/// }
/// ```
#[proc_macro_derive(Encode, attributes(borsh))]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_encode(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_encode(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let krate = crate_path(input)?;
    let fields = fields(struct_data(input, "Encode")?)?;

    let name = &input.ident;
    let generics = bounded_generics(input, &parse_quote!(#krate::Encode));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let field_encodes =
        fields.iter().filter(|field| !field.skip).map(|field| {
            let member = &field.member;
            quote! {
                #krate::Encode::encode(&self.#member, encoder)?;
            }
        });

    Ok(quote! {
        #[allow(clippy::trait_duplication_in_bounds)]
        impl #impl_generics #krate::Encode for #name #ty_generics #where_clause {
            fn encode<__E: #krate::Encoder + ?Sized>(
                &self,
                encoder: &mut __E,
            ) -> #krate::Result<()> {
                #(#field_encodes)*
                Ok(())
            }
        }
    })
}

/// Derive macro for `Decode`.
///
/// Fields are decoded in declaration order; skipped fields use
/// `Default::default()`.
#[proc_macro_derive(Decode, attributes(borsh))]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_decode(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_decode(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let krate = crate_path(input)?;
    let fields = fields(struct_data(input, "Decode")?)?;

    let name = &input.ident;
    let generics = bounded_generics(input, &parse_quote!(#krate::Decode));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    // `Self { 0: .. }` also builds tuple and unit structs
    let field_decodes = fields.iter().map(|field| {
        let FieldInfo { member, ty, .. } = field;

        if field.skip {
            quote! {
                #member: <#ty as ::std::default::Default>::default(),
            }
        } else {
            quote! {
                #member: <#ty as #krate::Decode>::decode(decoder)?,
            }
        }
    });

    Ok(quote! {
        #[allow(
            clippy::trait_duplication_in_bounds,
            clippy::init_numbered_fields
        )]
        impl #impl_generics #krate::Decode for #name #ty_generics #where_clause {
            fn decode<__D: #krate::Decoder + ?Sized>(
                decoder: &mut __D,
            ) -> #krate::Result<Self> {
                Ok(Self {
                    #(#field_decodes)*
                })
            }
        }
    })
}

/// Derive macro for `Describe`.
///
/// The shape is a record named after the struct, with one field per
/// non-skipped struct field. Tuple struct fields are named by position.
#[proc_macro_derive(Describe, attributes(borsh))]
pub fn derive_describe(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_describe(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_describe(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let krate = crate_path(input)?;
    let fields = fields(struct_data(input, "Describe")?)?;

    let name = &input.ident;
    let record_name = name.unraw().to_string();
    let generics = bounded_generics(input, &parse_quote!(#krate::Describe));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let field_shapes =
        fields.iter().filter(|field| !field.skip).map(|field| {
            let FieldInfo { name: field_name, ty, .. } = field;
            quote! {
                (#field_name, <#ty as #krate::Describe>::describe()),
            }
        });

    Ok(quote! {
        #[allow(clippy::trait_duplication_in_bounds)]
        impl #impl_generics #krate::Describe for #name #ty_generics #where_clause {
            fn describe() -> #krate::Shape {
                let fields: ::std::vec::Vec<(&'static str, #krate::Shape)> =
                    ::std::vec![#(#field_shapes)*];

                #krate::Shape::record(#record_name, fields)
            }
        }
    })
}
