extern crate proc_macro;

use itertools::izip;
use proc_macro::TokenStream;
use quote::quote;
use std::collections::HashSet;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, LitStr};

/// Field attributes parsed from `#[polybin(...)]` annotations
///
/// * `key` - Property key (field name unless renamed)
/// * `readonly` - Property is non-writable and therefore never written to the wire
/// * `hidden` - Property is non-enumerable and therefore never written to the wire
#[derive(Debug, Clone)]
struct FieldAttributes {
    key: String,
    readonly: bool,
    hidden: bool,
}

/// Extract the wire type name from `#[polybin(name = "...")]` on the container.
fn get_type_name(attrs: &[Attribute], default: String) -> syn::Result<String> {
    let mut name = default;
    for attr in attrs {
        if !attr.path().is_ident("polybin") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                name = lit.value();
                Ok(())
            } else {
                Err(meta.error("Unknown container attribute, expected `name = \"...\"`"))
            }
        })?;
    }
    if name.is_empty() || name.len() > 255 {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "Type name must be between 1 and 255 characters",
        ));
    }
    Ok(name)
}

/// Extract and parse `#[polybin(...)]` attribute values from field attributes
///
/// # Supported Attributes
///
/// * `#[polybin(rename = "key")]` - Alternative property key
/// * `#[polybin(readonly)]` - Non-writable property
/// * `#[polybin(hidden)]` - Non-enumerable property
///
/// Multiple attributes can be combined: `#[polybin(rename = "k", readonly)]`
fn get_field_attributes(attrs: &[Attribute], field_name: &str) -> syn::Result<FieldAttributes> {
    let mut key = field_name.to_string();
    let mut readonly = false;
    let mut hidden = false;

    for attr in attrs {
        if !attr.path().is_ident("polybin") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                key = lit.value();
            } else if meta.path.is_ident("readonly") {
                readonly = true;
            } else if meta.path.is_ident("hidden") {
                hidden = true;
            } else {
                return Err(meta.error("Unknown field attribute"));
            }
            Ok(())
        })?;
    }

    Ok(FieldAttributes {
        key,
        readonly,
        hidden,
    })
}

/// Derive macro for implementing the `Record` trait
///
/// Generates `Record`, `ToValue` and `FromValue` for a struct with named
/// fields. Every field type must implement `ToValue` and `FromValue`;
/// `readonly` and `hidden` fields must also implement `Default`.
///
/// # Examples
///
/// ```rust,ignore
/// #[derive(Record)]
/// #[polybin(name = "Player")]
/// struct Player {
///     #[polybin(rename = "displayName")]
///     name: String,
///     #[polybin(readonly)]
///     id: u32,
///     score: Option<f64>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(polybin))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_record(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_record(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let type_name = get_type_name(&input.attrs, name.to_string())?;

    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record can only be derived for structs",
            ))
        }
    };

    let mut idents = Vec::new();
    let mut attrs = Vec::new();
    let mut used_keys = HashSet::new();
    for f in fields {
        let ident = f.ident.as_ref().ok_or_else(|| {
            syn::Error::new_spanned(f, "Record fields must be named")
        })?;
        let field_attrs = get_field_attributes(&f.attrs, &ident.to_string())?;
        if !used_keys.insert(field_attrs.key.clone()) {
            return Err(syn::Error::new_spanned(
                f,
                format!(
                    "Property key '{}' is duplicated for struct '{}'",
                    field_attrs.key, name
                ),
            ));
        }
        idents.push(ident);
        attrs.push(field_attrs);
    }
    let keys: Vec<_> = attrs.iter().map(|a| a.key.as_str()).collect();
    let field_count = idents.len();

    let define_fields = izip!(&idents, &keys, &attrs).map(|(ident, key, a)| {
        let writable = !a.readonly;
        let enumerable = !a.hidden;
        quote! {
            object.define(
                #key,
                polybin::ToValue::to_value(&self.#ident),
                polybin::PropertyFlags { writable: #writable, enumerable: #enumerable },
            );
        }
    });

    let read_fields = izip!(&idents, &keys, &attrs).map(|(ident, key, a)| {
        if a.readonly || a.hidden {
            quote! {
                #ident: polybin::record::field_or_default(object, #key, #type_name)?,
            }
        } else {
            quote! {
                #ident: polybin::record::field(object, #key, #type_name)?,
            }
        }
    });

    Ok(quote! {
        impl #impl_generics polybin::Record for #name #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;

            fn to_object(&self) -> polybin::Object {
                let mut object = polybin::Object::with_capacity(#field_count);
                #(#define_fields)*
                object
            }

            fn from_object(object: &polybin::Object) -> polybin::Result<Self> {
                Ok(Self {
                    #(#read_fields)*
                })
            }
        }

        impl #impl_generics polybin::ToValue for #name #ty_generics #where_clause {
            fn to_value(&self) -> polybin::Value {
                polybin::record::record_to_value(self)
            }
        }

        impl #impl_generics polybin::FromValue for #name #ty_generics #where_clause {
            fn from_value(value: &polybin::Value) -> polybin::Result<Self> {
                polybin::record::record_from_value(value)
            }
        }
    })
}
