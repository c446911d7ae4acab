//! Derive macro for oxide-pg record types.
//!
//! This crate provides the `#[derive(Record)]` macro, which generates the
//! static field descriptor and the path-based field accessors the table
//! builder, the query builders and the row scanner work with.

use proc_macro::TokenStream;
use proc_macro2::{Literal, TokenStream as TokenStream2};
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, Ident, Lit, LitStr, Type};

/// Derives `oxide_pg_core::Record` for a struct with named fields.
///
/// # Attributes
///
/// - `#[table(name = "table_name")]` - Default table name (optional, defaults
///   to the snake_case struct name)
///
/// # Field Attributes
///
/// - `#[pg("name=id,type=uuid,primary")]` - Column annotation
/// - `#[pg("-")]` - Field is ignored, like a field without the attribute
/// - `#[pg(embed)]` - Embedded record whose columns are promoted into the
///   parent table
/// - `#[pg(embed = "type=jsonb")]` - Embedded record stored as one JSON column
///
/// Fields without a `pg` attribute are ignored. Value fields must implement
/// `oxide_pg_core::SqlField`; embedded fields must implement `Record`.
#[proc_macro_derive(Record, attributes(table, pg))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_record_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_record_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let table_name = get_table_name(&input.attrs, struct_name)?;
    let type_name = struct_name.to_string();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record derive only supports structs",
            ));
        }
    };

    let mut infos: Vec<FieldInfo> = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        if let Some(attrs) = parse_pg_attrs(&field.attrs)? {
            if attrs.annotation.trim() == "-" {
                continue;
            }
            infos.push(FieldInfo {
                ident,
                ty: field.ty.clone(),
                annotation: attrs.annotation,
                embed: attrs.embed,
            });
        }
    }

    let descriptors: Vec<TokenStream2> = infos.iter().map(FieldInfo::descriptor).collect();

    let mut getters = Vec::new();
    let mut setters = Vec::new();
    for (i, info) in infos.iter().enumerate() {
        let index = Literal::usize_unsuffixed(i);
        let ident = &info.ident;
        if info.embed {
            getters.push(quote! {
                [#index] => Some(::oxide_pg_core::record::composite_value(&self.#ident)),
                [#index, rest @ ..] => ::oxide_pg_core::Record::field_value(&self.#ident, rest),
            });
            setters.push(quote! {
                [#index] => ::oxide_pg_core::record::set_composite_value(&mut self.#ident, value)?,
                [#index, rest @ ..] => {
                    ::oxide_pg_core::Record::set_field_value(&mut self.#ident, rest, value)?;
                }
            });
        } else {
            getters.push(quote! {
                [#index] => Some(::oxide_pg_core::SqlField::to_sql_value(&self.#ident)),
            });
            setters.push(quote! {
                [#index] => self.#ident = ::oxide_pg_core::SqlField::from_sql_value(value)?,
            });
        }
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::oxide_pg_core::Record for #struct_name #ty_generics #where_clause {
            const TABLE_NAME: &'static str = #table_name;

            fn descriptor() -> ::oxide_pg_core::RecordDescriptor {
                ::oxide_pg_core::RecordDescriptor::new(#type_name, vec![#(#descriptors),*])
            }

            fn field_value(&self, path: &[usize]) -> Option<::oxide_pg_core::SqlValue> {
                match path {
                    #(#getters)*
                    _ => None,
                }
            }

            fn set_field_value(
                &mut self,
                path: &[usize],
                value: ::oxide_pg_core::SqlValue,
            ) -> ::std::result::Result<(), ::oxide_pg_core::ScanError> {
                match path {
                    #(#setters)*
                    _ => {
                        return Err(::oxide_pg_core::ScanError::UnknownField {
                            path: path.to_vec(),
                        });
                    }
                }
                Ok(())
            }
        }
    };

    Ok(expanded)
}

struct FieldInfo {
    ident: Ident,
    ty: Type,
    annotation: String,
    embed: bool,
}

impl FieldInfo {
    fn descriptor(&self) -> TokenStream2 {
        let name = self.ident.to_string();
        let annotation = &self.annotation;
        let ty = &self.ty;
        if self.embed {
            quote! {
                ::oxide_pg_core::FieldDescriptor::composite(
                    #name,
                    #annotation,
                    <#ty as ::oxide_pg_core::Record>::descriptor,
                )
            }
        } else {
            quote! {
                ::oxide_pg_core::FieldDescriptor::value(
                    #name,
                    #annotation,
                    <#ty as ::oxide_pg_core::SqlField>::HOST,
                    <#ty as ::oxide_pg_core::SqlField>::OPTIONAL,
                )
            }
        }
    }
}

struct PgAttrs {
    annotation: String,
    embed: bool,
}

fn get_table_name(attrs: &[Attribute], struct_name: &Ident) -> syn::Result<String> {
    for attr in attrs {
        if attr.path().is_ident("table") {
            let mut table_name = None;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: Expr = meta.value()?.parse()?;
                    if let Expr::Lit(lit) = value {
                        if let Lit::Str(s) = lit.lit {
                            table_name = Some(s.value());
                        }
                    }
                    Ok(())
                } else {
                    Err(meta.error("unsupported table attribute"))
                }
            })?;
            if let Some(name) = table_name {
                return Ok(name);
            }
        }
    }
    Ok(to_snake_case(&struct_name.to_string()))
}

/// Returns `None` for fields without a `pg` attribute.
fn parse_pg_attrs(attrs: &[Attribute]) -> syn::Result<Option<PgAttrs>> {
    let mut result: Option<PgAttrs> = None;

    for attr in attrs {
        if !attr.path().is_ident("pg") {
            continue;
        }
        let parsed = result.get_or_insert(PgAttrs {
            annotation: String::new(),
            embed: false,
        });

        if let Ok(annotation) = attr.parse_args::<LitStr>() {
            parsed.annotation = annotation.value();
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("embed") {
                parsed.embed = true;
                if meta.input.peek(syn::Token![=]) {
                    let value: LitStr = meta.value()?.parse()?;
                    parsed.annotation = value.value();
                }
                Ok(())
            } else {
                Err(meta.error("expected an annotation string or `embed`"))
            }
        })?;
    }

    Ok(result)
}

/// Keeps acronyms together: `APIKey` becomes `api_key`.
fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 && !result.ends_with('_') {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
                if prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase() && next_is_lower)
                {
                    result.push('_');
                }
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
