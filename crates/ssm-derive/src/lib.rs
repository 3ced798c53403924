//! Derive macro for annotated structures
//!
//! `#[derive(Structure)]` emits the static field table and index based
//! accessors the walker in `ssm-reflect` navigates. Field annotations:
//!
//! ```rust,ignore
//! use serde::{Deserialize, Serialize};
//! use ssm_reflect::Structure;
//!
//! #[derive(Structure, Serialize, Deserialize, Default)]
//! pub struct Config {
//!     #[pms("test, prefix=simple")]
//!     pub name: String,
//!     #[asm("password, keyid=default")]
//!     pub password: String,
//!     #[ssm(vault = "token")]
//!     pub token: String,
//!     #[ssm(skip)]
//!     pub cache: Vec<u8>,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, Data, DataStruct, DeriveInput, Fields, Ident, LitStr};

/// Derive `ssm_reflect::Structure` and `ssm_reflect::Field`
///
/// The type must also implement `serde::Serialize` and
/// `serde::Deserialize`; annotated sub-structures are stored as JSON.
#[proc_macro_derive(Structure, attributes(pms, asm, ssm))]
pub fn derive_structure(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct FieldSpec {
    ident: Ident,
    name: String,
    annotations: Vec<(String, LitStr)>,
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Structure cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(named),
            ..
        }) => &named.named,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Structure can only be derived for structs with named fields",
            ))
        }
    };

    let mut specs = Vec::new();
    for field in fields {
        if let Some(spec) = field_spec(field)? {
            specs.push(spec);
        }
    }

    let type_name = name.to_string();
    let descriptors = specs.iter().map(|spec| {
        let field_name = &spec.name;
        let annotations = spec.annotations.iter().map(|(namespace, literal)| {
            quote! {
                ::ssm_reflect::Annotation { namespace: #namespace, literal: #literal }
            }
        });
        quote! {
            ::ssm_reflect::FieldDescriptor::new(#field_name, &[#(#annotations),*])
        }
    });
    let indices: Vec<usize> = (0..specs.len()).collect();
    let idents: Vec<&Ident> = specs.iter().map(|s| &s.ident).collect();

    Ok(quote! {
        impl ::ssm_reflect::Structure for #name {
            fn type_name(&self) -> &'static str {
                #type_name
            }

            fn fields(&self) -> &'static [::ssm_reflect::FieldDescriptor] {
                const FIELDS: &[::ssm_reflect::FieldDescriptor] = &[#(#descriptors),*];
                FIELDS
            }

            fn field(&self, index: usize) -> ::core::option::Option<&dyn ::ssm_reflect::Field> {
                match index {
                    #(#indices => ::core::option::Option::Some(&self.#idents),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_mut(
                &mut self,
                index: usize,
            ) -> ::core::option::Option<&mut dyn ::ssm_reflect::Field> {
                match index {
                    #(#indices => ::core::option::Option::Some(&mut self.#idents),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn to_json(
                &self,
            ) -> ::core::result::Result<
                ::std::string::String,
                ::ssm_reflect::__private::serde_json::Error,
            > {
                ::ssm_reflect::__private::serde_json::to_string(self)
            }

            fn merge_json(
                &mut self,
                raw: &str,
            ) -> ::core::result::Result<(), ::ssm_reflect::__private::serde_json::Error> {
                *self = ::ssm_reflect::__private::serde_json::from_str(raw)?;
                ::core::result::Result::Ok(())
            }
        }

        impl ::ssm_reflect::Field for #name {
            fn as_field(&self) -> ::ssm_reflect::FieldRef<'_> {
                ::ssm_reflect::FieldRef::Struct(self)
            }

            fn as_field_mut(&mut self) -> ::ssm_reflect::FieldMut<'_> {
                ::ssm_reflect::FieldMut::Struct(self)
            }
        }
    })
}

fn field_spec(field: &syn::Field) -> syn::Result<Option<FieldSpec>> {
    let Some(ident) = field.ident.clone() else {
        return Err(syn::Error::new_spanned(field, "expected a named field"));
    };

    let mut annotations: Vec<(String, LitStr)> = Vec::new();
    let mut skip = false;

    for attr in &field.attrs {
        let path = attr.path();
        if path.is_ident("pms") || path.is_ident("asm") {
            let namespace = path
                .get_ident()
                .map(ToString::to_string)
                .unwrap_or_default();
            let literal: LitStr = attr.parse_args()?;
            push_annotation(&mut annotations, namespace, literal)?;
        } else if path.is_ident("ssm") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                    return Ok(());
                }
                let namespace = meta
                    .path
                    .get_ident()
                    .ok_or_else(|| meta.error("expected a namespace name"))?
                    .to_string();
                let literal: LitStr = meta.value()?.parse()?;
                push_annotation(&mut annotations, namespace, literal)
            })?;
        }
    }

    if skip {
        return Ok(None);
    }

    Ok(Some(FieldSpec {
        name: ident.unraw().to_string(),
        ident,
        annotations,
    }))
}

fn push_annotation(
    annotations: &mut Vec<(String, LitStr)>,
    namespace: String,
    literal: LitStr,
) -> syn::Result<()> {
    if annotations.iter().any(|(ns, _)| *ns == namespace) {
        return Err(syn::Error::new_spanned(
            &literal,
            format!("duplicate `{namespace}` annotation"),
        ));
    }
    annotations.push((namespace, literal));
    Ok(())
}
