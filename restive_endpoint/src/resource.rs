// Copyright 2025 Oxide Computer Company

//! Code generation for `#[resource]`.

use crate::doc::doc_text;
use crate::util::generic_args;
use crate::util::get_crate;
use crate::util::is_unit;
use crate::util::type_string;
use crate::util::VOID_TYPE;
use proc_macro2::TokenStream;
use quote::quote;
use serde::Deserialize;
use serde_tokenstream::from_tokenstream;
use serde_tokenstream::Error;
use std::collections::BTreeSet;
use syn::ext::IdentExt;

/// Name of the helper attribute on methods and parameters.
const HELPER_ATTR: &str = "restive";

/// Methods whose names start with this prefix are not exposed.
const RESERVED_PREFIX: &str = "__";

#[derive(Default, Deserialize, Debug)]
struct ResourceMetadata {
    _restive_crate: Option<String>,
}

/// A method or constructor parameter.
struct Param {
    name: String,
    ty: syn::Type,
    default: Option<syn::Expr>,
}

/// A method that `#[resource]` exposes.
struct Exposed {
    ident: syn::Ident,
    name: String,
    doc: String,
    params: Vec<Param>,
    output: syn::ReturnType,
}

struct Constructor {
    params: Vec<Param>,
    fallible: bool,
}

pub(crate) fn do_resource(
    attr: TokenStream,
    item: TokenStream,
) -> Result<TokenStream, Error> {
    let metadata = if attr.is_empty() {
        ResourceMetadata::default()
    } else {
        from_tokenstream::<ResourceMetadata>(&attr)?
    };
    let restive = get_crate(metadata._restive_crate);

    let mut item_impl: syn::ItemImpl = syn::parse2(item)?;
    if let Some((_, path, _)) = &item_impl.trait_ {
        return Err(Error::new_spanned(
            path,
            "#[resource] must be applied to an inherent impl block",
        ));
    }
    if !item_impl.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &item_impl.generics,
            "#[resource] does not support generic impl blocks",
        ));
    }

    let type_doc = doc_text(&item_impl.attrs);
    let mut constructor = None;
    let mut exposed = Vec::new();
    let mut names = BTreeSet::new();

    for item in &mut item_impl.items {
        let syn::ImplItem::Fn(method) = item else {
            continue;
        };
        let rename = take_method_attrs(&mut method.attrs)?;
        let params = take_params(&mut method.sig)?;

        let is_pub = matches!(method.vis, syn::Visibility::Public(_));
        let ident = method.sig.ident.clone();
        let receiver = method.sig.receiver().map(|r| r.reference.is_some());

        match receiver {
            None if is_pub && ident == "new" => {
                constructor = Some(Constructor {
                    fallible: returns_result(&method.sig.output),
                    params: params.ok_or_else(|| unsupported_params(method))?,
                });
            }
            Some(true) if is_pub => {
                let name = rename
                    .unwrap_or_else(|| ident.unraw().to_string());
                if name.starts_with(RESERVED_PREFIX) {
                    continue;
                }
                if method.sig.asyncness.is_some() {
                    return Err(Error::new_spanned(
                        &method.sig,
                        "exposed methods must not be async",
                    ));
                }
                if !names.insert(name.to_lowercase()) {
                    return Err(Error::new_spanned(
                        &method.sig.ident,
                        format!(
                            "method \"{}\" is exposed twice (names are \
                             compared ignoring case)",
                            name
                        ),
                    ));
                }
                exposed.push(Exposed {
                    params: params.ok_or_else(|| unsupported_params(method))?,
                    ident,
                    name,
                    doc: doc_text(&method.attrs),
                    output: method.sig.output.clone(),
                });
            }
            _ => (),
        }
    }

    let self_ty = &item_impl.self_ty;
    let describe = describe_fn(&restive, &type_doc, &constructor, &exposed);
    let construct = construct_fn(&restive, &constructor);
    let call = call_fn(&restive, &exposed);

    Ok(quote! {
        #item_impl

        impl #restive::Handler for #self_ty {
            #describe
            #construct
            #call
        }
    })
}

fn unsupported_params(method: &syn::ImplItemFn) -> Error {
    Error::new_spanned(
        &method.sig.inputs,
        "parameters of exposed methods must be simple identifiers with \
         owned types",
    )
}

/// Removes `#[restive(...)]` from a method, returning its `rename`.
fn take_method_attrs(
    attrs: &mut Vec<syn::Attribute>,
) -> Result<Option<String>, Error> {
    let mut rename = None;
    for attr in take_helper_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let name: syn::LitStr = meta.value()?.parse()?;
                rename = Some(name.value());
                Ok(())
            } else {
                Err(meta.error("unsupported restive method attribute"))
            }
        })?;
    }
    Ok(rename)
}

/// Removes `#[restive(...)]` from every parameter of `sig`.  Returns the
/// parameters if they can all be bound by name, or `None` if some can't
/// (patterns or borrowed types), which is only an error for methods that
/// are exposed.
fn take_params(sig: &mut syn::Signature) -> Result<Option<Vec<Param>>, Error> {
    let mut params = Vec::new();
    let mut bindable = true;
    for input in sig.inputs.iter_mut() {
        let syn::FnArg::Typed(pat_type) = input else {
            continue;
        };
        let mut default = None;
        for attr in take_helper_attrs(&mut pat_type.attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("default") {
                    default = Some(meta.value()?.parse::<syn::Expr>()?);
                    Ok(())
                } else {
                    Err(meta.error("unsupported restive parameter attribute"))
                }
            })?;
        }
        match (&*pat_type.pat, &*pat_type.ty) {
            (syn::Pat::Ident(pat), ty)
                if !matches!(
                    ty,
                    syn::Type::Reference(_) | syn::Type::ImplTrait(_)
                ) =>
            {
                params.push(Param {
                    name: pat.ident.unraw().to_string(),
                    ty: ty.clone(),
                    default,
                });
            }
            _ => bindable = false,
        }
    }
    Ok(bindable.then_some(params))
}

fn take_helper_attrs(attrs: &mut Vec<syn::Attribute>) -> Vec<syn::Attribute> {
    let (helpers, rest) = std::mem::take(attrs)
        .into_iter()
        .partition(|attr| attr.path().is_ident(HELPER_ATTR));
    *attrs = rest;
    helpers
}

fn returns_result(output: &syn::ReturnType) -> bool {
    match output {
        syn::ReturnType::Type(_, ty) => generic_args(ty, "Result").is_some(),
        syn::ReturnType::Default => false,
    }
}

/// The type documented as a method's result: `T` for `Result<T, E>`.
fn return_type_string(output: &syn::ReturnType) -> String {
    match output {
        syn::ReturnType::Default => VOID_TYPE.to_string(),
        syn::ReturnType::Type(_, ty) => match generic_args(ty, "Result") {
            Some(args) if !args.is_empty() => type_string(args[0]),
            _ => type_string(ty),
        },
    }
}

fn parameter_spec(restive: &TokenStream, param: &Param) -> TokenStream {
    let name = &param.name;
    let type_name = type_string(&param.ty);
    let spec = match &param.default {
        Some(default) => quote! {
            #restive::ParameterSpec::optional(
                #name,
                #restive::__private::to_default(#default),
            )
        },
        None if generic_args(&param.ty, "Option").is_some() => quote! {
            #restive::ParameterSpec::optional(#name, #restive::Value::Null)
        },
        None => quote! { #restive::ParameterSpec::required(#name) },
    };
    quote! { #spec.with_type(#type_name) }
}

/// Arguments for a call, taken from a `BoundParams` named `source`.  A
/// parameter with a declared default falls back to it when unbound.
fn take_args(
    restive: &TokenStream,
    params: &[Param],
    source: &syn::Ident,
) -> Vec<TokenStream> {
    params
        .iter()
        .map(|param| {
            let name = &param.name;
            let ty = &param.ty;
            match &param.default {
                Some(default) => quote! {
                    #source.take_or::<#ty, _>(#name, || {
                        #restive::__private::to_default(#default)
                    })?
                },
                None => quote! { #source.take::<#ty>(#name)? },
            }
        })
        .collect()
}

fn describe_fn(
    restive: &TokenStream,
    type_doc: &str,
    constructor: &Option<Constructor>,
    exposed: &[Exposed],
) -> TokenStream {
    let constructor_specs = constructor
        .iter()
        .flat_map(|c| c.params.iter())
        .map(|param| parameter_spec(restive, param));
    let methods = exposed.iter().map(|method| {
        let name = &method.name;
        let doc = &method.doc;
        let returns = return_type_string(&method.output);
        let params = method.params.iter().map(|p| parameter_spec(restive, p));
        quote! {
            .method(
                #restive::MethodSpec::builder(#name)
                    .doc(#doc)
                    .returns(#returns)
                    #(.param(#params))*
                    .build()
            )
        }
    });

    quote! {
        fn describe() -> #restive::HandlerDescription {
            #restive::HandlerDescription::new(#type_doc)
                .constructor(::std::vec![#(#constructor_specs),*])
                #(#methods)*
        }
    }
}

fn construct_fn(
    restive: &TokenStream,
    constructor: &Option<Constructor>,
) -> TokenStream {
    let args_ident = syn::Ident::new("args", proc_macro2::Span::call_site());
    let body = match constructor {
        Some(Constructor { params, fallible: true }) => {
            let args = take_args(restive, params, &args_ident);
            quote! {
                Self::new(#(#args),*)
                    .map_err(::std::convert::Into::<#restive::HandlerError>::into)
            }
        }
        Some(Constructor { params, fallible: false }) => {
            let args = take_args(restive, params, &args_ident);
            quote! { ::std::result::Result::Ok(Self::new(#(#args),*)) }
        }
        None => quote! {
            let _ = #args_ident;
            ::std::result::Result::Ok(
                <Self as ::std::default::Default>::default()
            )
        },
    };

    quote! {
        #[allow(unused_mut)]
        fn construct(
            mut #args_ident: #restive::BoundParams,
        ) -> ::std::result::Result<Self, #restive::HandlerError> {
            #body
        }
    }
}

fn call_fn(restive: &TokenStream, exposed: &[Exposed]) -> TokenStream {
    let params_ident =
        syn::Ident::new("params", proc_macro2::Span::call_site());
    let arms = exposed.iter().map(|method| {
        let key = method.name.to_lowercase();
        let ident = &method.ident;
        let args = take_args(restive, &method.params, &params_ident);
        let invoke = quote! { self.#ident(#(#args),*) };
        let result = match &method.output {
            syn::ReturnType::Type(_, ty) if is_unit(ty) => quote! {
                #invoke;
                ::std::result::Result::Ok(#restive::Value::Null)
            },
            syn::ReturnType::Default => quote! {
                #invoke;
                ::std::result::Result::Ok(#restive::Value::Null)
            },
            output if returns_result(output) => quote! {
                let result = #invoke
                    .map_err(::std::convert::Into::<#restive::HandlerError>::into)?;
                ::std::result::Result::Ok(
                    #restive::__private::serde_json::to_value(&result)?
                )
            },
            _ => quote! {
                let result = #invoke;
                ::std::result::Result::Ok(
                    #restive::__private::serde_json::to_value(&result)?
                )
            },
        };
        quote! {
            #key => {
                #result
            }
        }
    });

    quote! {
        #[allow(unused_mut)]
        fn call(
            &mut self,
            method: &str,
            mut #params_ident: #restive::BoundParams,
        ) -> ::std::result::Result<#restive::Value, #restive::HandlerError> {
            match method {
                #(#arms)*
                _ => ::std::result::Result::Err(
                    #restive::HandlerError::not_found(
                        ::std::format!("Unknown method ({}).", method)
                    )
                ),
            }
        }
    }
}
