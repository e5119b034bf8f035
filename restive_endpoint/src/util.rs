// Copyright 2025 Oxide Computer Company

use quote::ToTokens;

const RESTIVE: &str = "restive";

/// Given an optional string, returns the crate name as a token stream.
pub(crate) fn get_crate(var: Option<String>) -> proc_macro2::TokenStream {
    if let Some(s) = var {
        if let Ok(ts) = syn::parse_str(s.as_str()) {
            return ts;
        }
    }
    syn::Ident::new(RESTIVE, proc_macro2::Span::call_site()).to_token_stream()
}

/// Name recorded for methods that return nothing.
pub(crate) const VOID_TYPE: &str = "void";

/// Renders a type the way it would be written in source, e.g.
/// `HashMap<String, Vec<u8>>` rather than the token stream's
/// `HashMap < String , Vec < u8 > >`.
pub(crate) fn type_string(ty: &syn::Type) -> String {
    if is_unit(ty) {
        return VOID_TYPE.to_string();
    }
    let raw = ty.to_token_stream().to_string();
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    for (i, c) in chars.iter().enumerate() {
        if *c == ' ' {
            let prev = out.chars().last();
            let next = chars.get(i + 1).copied();
            if prev.map_or(true, is_tight) || next.map_or(true, is_tight) {
                continue;
            }
        }
        out.push(*c);
    }
    out.replace(',', ", ")
}

fn is_tight(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '&' | ',' | '(' | ')' | '[' | ']')
}

pub(crate) fn is_unit(ty: &syn::Type) -> bool {
    matches!(ty, syn::Type::Tuple(t) if t.elems.is_empty())
}

/// Returns the generic arguments of `ty` if its last path segment is
/// `name`, as for `Option<T>` or `Result<T, E>`.
pub(crate) fn generic_args<'a>(
    ty: &'a syn::Type,
    name: &str,
) -> Option<Vec<&'a syn::Type>> {
    let syn::Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != name {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => Some(
            args.args
                .iter()
                .filter_map(|arg| match arg {
                    syn::GenericArgument::Type(t) => Some(t),
                    _ => None,
                })
                .collect(),
        ),
        _ => Some(Vec::new()),
    }
}
