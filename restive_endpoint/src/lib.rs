// Copyright 2025 Oxide Computer Company

//! This macro describes restive resource handlers.  Applied to the inherent
//! `impl` block of a type, it generates the type's `restive::Handler`
//! implementation: the description of its exposed methods and parameters,
//! taken from the signatures and doc comments, along with the code that
//! constructs an instance and dispatches calls to it by name.

extern crate proc_macro;

mod doc;
mod resource;
mod util;

/// Attribute to apply to the `impl` block of a resource handler type.
///
/// Methods and their parameters accept the helper attribute `#[restive]`:
///
/// * `#[restive(rename = "name")]` on a method sets the name it is exposed
///   under;
/// * `#[restive(default = expr)]` on a parameter makes it optional, taking
///   the serialized value of `expr` when omitted.
///
/// The optional `_restive_crate = "path"` argument names the `restive` crate
/// for code that renames it.
#[proc_macro_attribute]
pub fn resource(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    match resource::do_resource(attr.into(), item.into()) {
        Ok(result) => result.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
