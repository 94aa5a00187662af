use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    DeriveInput, Field, Fields, GenericArgument, LitStr, Path, PathArguments, Token, Type,
    WherePredicate, punctuated::Punctuated, spanned::Spanned,
};

/// Extracts `I` and `O` from a field typed `ModuleState<I, O>`.
fn state_arguments(field: &Field) -> syn::Result<(Type, Type)> {
    let error = || {
        syn::Error::new(
            field.ty.span(),
            "state field must be of type `ModuleState<Input, Output>`",
        )
    };
    let Type::Path(path) = &field.ty else {
        return Err(error());
    };
    let segment = path.path.segments.last().ok_or_else(error)?;
    if segment.ident != "ModuleState" {
        return Err(error());
    }
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return Err(error());
    };
    let types: Vec<_> = arguments
        .args
        .iter()
        .filter_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty.clone()),
            _ => None,
        })
        .collect();
    match <[Type; 2]>::try_from(types) {
        Ok([input, output]) => Ok((input, output)),
        Err(_) => Err(error()),
    }
}

/// Picks the field holding the `ModuleState`: the single field of a tuple struct, or the one
/// marked `#[state]`.
fn state_field(input: &DeriveInput) -> syn::Result<(&Field, TokenStream)> {
    let syn::Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "`Stateful` can only be derived for structs",
        ));
    };
    match &data.fields {
        Fields::Unnamed(fields) => match fields.unnamed.len() {
            1 => Ok((&fields.unnamed[0], quote! { 0 })),
            _ => Err(syn::Error::new(
                fields.span(),
                "tuple structs must have exactly one field",
            )),
        },
        Fields::Named(fields) => {
            let marked: Vec<_> = fields
                .named
                .iter()
                .filter(|f| f.attrs.iter().any(|a| a.path().is_ident("state")))
                .collect();
            match marked[..] {
                [field] => {
                    let ident = &field.ident;
                    Ok((field, quote! { #ident }))
                }
                [] => Err(syn::Error::new(fields.span(), "no field marked with #[state]")),
                _ => Err(syn::Error::new(
                    fields.span(),
                    "multiple fields marked with #[state]",
                )),
            }
        }
        Fields::Unit => Err(syn::Error::new(
            input.span(),
            "unit structs are not supported by `Stateful` derive",
        )),
    }
}

/// Reads `#[stateful(crate = "..", bound = "..")]`.
fn stateful_attributes(
    input: &DeriveInput,
) -> syn::Result<(Option<Path>, Punctuated<WherePredicate, Token![,]>)> {
    let mut crate_path = None;
    let mut bounds = Punctuated::new();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("stateful")) {
        attr.parse_nested_meta(|meta| {
            let value: LitStr = meta.value()?.parse()?;
            if meta.path.is_ident("crate") {
                crate_path = Some(value.parse::<Path>()?);
            } else if meta.path.is_ident("bound") {
                bounds.extend(value.parse_with(
                    Punctuated::<WherePredicate, Token![,]>::parse_terminated,
                )?);
            } else {
                return Err(meta.error("expected `crate` or `bound`"));
            }
            Ok(())
        })?;
    }
    Ok((crate_path, bounds))
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let (field, access) = state_field(input)?;
    let (input_type, output_type) = state_arguments(field)?;
    let (crate_path, bounds) = stateful_attributes(input)?;

    let base_path = match crate_path {
        Some(path) => quote!(#path::nn),
        None => quote!(::spindle::nn),
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, _) = input.generics.split_for_impl();
    let mut generics = input.generics.clone();
    let where_clause = generics.make_where_clause();
    where_clause.predicates.extend(bounds);

    Ok(quote! {
        impl #impl_generics #base_path::Stateful for #name #ty_generics #where_clause {
            type Input = #input_type;
            type Output = #output_type;

            #[inline]
            fn state(&self) -> &#base_path::ModuleState<#input_type, #output_type> {
                &self.#access
            }

            #[inline]
            fn state_mut(&mut self) -> &mut #base_path::ModuleState<#input_type, #output_type> {
                &mut self.#access
            }
        }
    })
}

pub fn derive_stateful(input: DeriveInput) -> TokenStream {
    expand(&input).unwrap_or_else(syn::Error::into_compile_error)
}
