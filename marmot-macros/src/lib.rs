//! Procedural macros used internally by the Marmot compiler. For the time
//! being this is only the `Diagnostic` derive, a convenience for building
//! error types in the manner of rustc's `SessionDiagnostic`.

use lazy_static::lazy_static;
use proc_macro::TokenStream;
use quote::quote;
use regex::Regex;
use std::collections::HashSet;
use syn::{parse_macro_input, DeriveInput};

/// Derives `Diagnostic` for an error struct.
///
/// The message is given by a struct-level `#[msg = "..."]` attribute, and may
/// interpolate fields with `{field}` braces; such fields are formatted with
/// their `Display` implementations. An optional `#[code = "EXXXX"]` attribute
/// sets the error code. Fields of type `Span` annotated `#[span]` or
/// `#[span(msg = "...")]` become the reported source regions; the first is
/// the main span, the rest are secondaries.
#[proc_macro_derive(Diagnostic, attributes(msg, code, span))]
pub fn diagnostic(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    impl_diagnostic_macro(input)
}

fn impl_diagnostic_macro(ast: DeriveInput) -> TokenStream {
    let name = &ast.ident;
    let DiagnosticData {
        msg,
        code,
        spans,
        fmt_fields,
    } = DiagnosticData::new(&ast);

    let (main_field, main_help) = &spans[0];
    let main_help = option_tokens(main_help);

    // Push every span after the first into the secondaries vector.
    let secondaries = spans[1..].iter().map(|(field, help)| {
        let help = option_tokens(help);
        quote! {
            secondaries.push(crate::marmot_errors::SpanReport {
                span: self.#field,
                help: #help,
            });
        }
    });

    let expanded = quote! {
        impl std::fmt::Debug for #name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "diagnostic [{}]", #code)
            }
        }

        impl crate::marmot_errors::Diagnostic for #name {
            fn message(&self, ctx: &crate::context::Context) -> String {
                let _ = ctx;
                format!(#msg, #(#fmt_fields = self.#fmt_fields,)*)
            }

            fn main_span(&self) -> crate::marmot_errors::SpanReport {
                crate::marmot_errors::SpanReport {
                    span: self.#main_field,
                    help: #main_help,
                }
            }

            fn secondaries(&self) -> Vec<crate::marmot_errors::SpanReport> {
                let mut secondaries = Vec::new();
                #(#secondaries)*
                secondaries
            }

            fn code(&self) -> &str {
                #code
            }
        }
    };

    expanded.into()
}

fn option_tokens(lit: &Option<syn::Lit>) -> proc_macro2::TokenStream {
    match lit {
        Some(lit) => quote! { Some(#lit) },
        None => quote! { None },
    }
}

/// The analyzed input struct, carrying everything needed to build the impl.
struct DiagnosticData<'ast> {
    /// The message reported with the error
    msg: syn::Lit,
    /// The error code, defaulting to the unclassified "E0000"
    code: syn::Lit,
    /// Reported spans, in declaration order, each with an optional help
    /// message. The first one is the main span.
    spans: Vec<(&'ast syn::Ident, Option<syn::Lit>)>,
    /// Fields interpolated in the format string
    fmt_fields: Vec<&'ast syn::Ident>,
}

impl<'ast> DiagnosticData<'ast> {
    fn new(ast: &'ast DeriveInput) -> Self {
        let mut msg = None;
        let mut code = None;

        for attr in &ast.attrs {
            let meta = match attr.parse_meta() {
                Ok(meta) => meta,
                Err(_) => panic!("malformed attribute in diagnostic"),
            };
            if let syn::Meta::NameValue(nv) = meta {
                if nv.path.is_ident("msg") {
                    msg = Some(nv.lit);
                } else if nv.path.is_ident("code") {
                    code = Some(nv.lit);
                }
            }
        }

        let msg = msg.expect("no message in diagnostic");
        let code = code.unwrap_or_else(|| {
            syn::Lit::Str(syn::LitStr::new("E0000", proc_macro2::Span::call_site()))
        });

        let fields = if let syn::Data::Struct(syn::DataStruct {
            fields: syn::Fields::Named(syn::FieldsNamed { named, .. }),
            ..
        }) = &ast.data
        {
            named
        } else {
            panic!("tried to derive Diagnostic on a malformed struct")
        };

        // Collect the `#[span]` fields. A bare path is a span without a help
        // message; a list form carries `msg = "..."`.
        let mut spans = Vec::new();
        for field in fields.iter() {
            for attr in &field.attrs {
                if !attr.path.is_ident("span") {
                    continue;
                }
                let ident = field.ident.as_ref().unwrap();
                match attr.parse_meta().expect("malformed span attribute") {
                    syn::Meta::Path(_) => spans.push((ident, None)),
                    syn::Meta::List(list) => {
                        let help = list.nested.iter().find_map(|nested| match nested {
                            syn::NestedMeta::Meta(syn::Meta::NameValue(nv))
                                if nv.path.is_ident("msg") =>
                            {
                                Some(nv.lit.clone())
                            }
                            _ => None,
                        });
                        spans.push((ident, help));
                    }
                    syn::Meta::NameValue(_) => panic!("malformed span attribute"),
                }
            }
        }

        if spans.is_empty() {
            panic!("diagnostic must report at least one span");
        }

        // Fields named within braces in the message must be interpolated.
        let fmt_names = Self::find_fmt_fields(&msg);
        let fmt_fields = fields
            .iter()
            .filter_map(|field| field.ident.as_ref())
            .filter(|ident| fmt_names.contains(ident.to_string().as_str()))
            .collect();

        Self {
            msg,
            code,
            spans,
            fmt_fields,
        }
    }

    /// Parse the message literal for the set of fields it interpolates.
    fn find_fmt_fields(msg: &syn::Lit) -> HashSet<String> {
        lazy_static! {
            // Matches alphanumeric substrings within literal braces.
            static ref RE: Regex = Regex::new(r"\{(\w+)\}").unwrap();
        }

        let msg = match msg {
            syn::Lit::Str(s) => s.value(),
            _ => panic!("diagnostic message is not a string literal"),
        };
        RE.captures_iter(&msg)
            .map(|grp| grp.get(1).unwrap().as_str().to_owned())
            .collect()
    }
}
