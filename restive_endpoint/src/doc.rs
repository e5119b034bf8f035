// Copyright 2025 Oxide Computer Company

/// Collects the text of the `#[doc]` attributes in `attrs`, one line per
/// comment line.  Tags such as `@param` must stay at the start of their line,
/// so lines are joined with newlines rather than reflowed.
pub(crate) fn doc_text(attrs: &[syn::Attribute]) -> String {
    let doc = syn::Ident::new("doc", proc_macro2::Span::call_site());

    let lines: Vec<String> = attrs
        .iter()
        .flat_map(|attr| {
            if let syn::Meta::NameValue(nv) = &attr.meta {
                if nv.path.is_ident(&doc) {
                    if let syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(s),
                        ..
                    }) = &nv.value
                    {
                        return normalize_comment_string(s.value());
                    }
                }
            }
            Vec::new()
        })
        .collect();

    lines.join("\n").trim().to_string()
}

fn normalize_comment_string(s: String) -> Vec<String> {
    s.split('\n')
        .enumerate()
        .map(|(idx, s)| {
            // Rust-style comments are intrinsically single-line. We don't want
            // to trim away formatting such as an initial '*'.
            if idx == 0 {
                s.trim()
            } else {
                let trimmed = s.trim();
                trimmed.strip_prefix("* ").unwrap_or_else(|| {
                    trimmed.strip_prefix('*').unwrap_or(trimmed)
                })
            }
        })
        .map(ToString::to_string)
        .collect()
}
