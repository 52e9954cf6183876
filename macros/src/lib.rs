//! Derive macros for Marquee aggregate action enums.
//!
//! Aggregate actions unify commands (requests to change order or
//! inventory state) and events (facts recorded by a transition, including
//! the ones that arrive from the payment gateway). The derive classifies
//! variants so stores and tests can tell the two apart without hand-kept
//! match arms.
//!
//! # Example
//!
//! ```ignore
//! use marquee_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum OrderAction {
//!     #[command]
//!     OpenOrder { selections: Vec<Selection> },
//!
//!     #[event]
//!     OrderOpened { order_id: OrderId },
//! }
//!
//! assert!(OrderAction::OpenOrder { selections: vec![] }.is_command());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, parse_macro_input};

/// Derive macro for aggregate action enums.
///
/// Generates helper methods:
/// - `is_command()` - true for variants marked `#[command]`
/// - `is_event()` - true for variants marked `#[event]`
/// - `event_type()` - stable dotted name for event variants, used when
///   recording transitions in logs and the order archive
///
/// # Attributes
///
/// - `#[command]` - mark a variant as a command
/// - `#[event]` - mark a variant as an event
///
/// # Panics
///
/// Produces a compile error (not a runtime panic) if:
/// - Applied to a non-enum type
/// - A variant carries both `#[command]` and `#[event]`
#[proc_macro_derive(Action, attributes(command, event))]
#[allow(clippy::expect_used)] // Proc macro panics become compile errors, not runtime panics
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(Action)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let mut command_variants = Vec::new();
    let mut event_variants = Vec::new();

    for variant in &data_enum.variants {
        let is_command = has_attribute(&variant.attrs, "command");
        let is_event = has_attribute(&variant.attrs, "event");

        if is_command && is_event {
            return syn::Error::new_spanned(
                variant,
                "Variant cannot be both #[command] and #[event]",
            )
            .to_compile_error()
            .into();
        }

        if is_command {
            command_variants.push(variant);
        }
        if is_event {
            event_variants.push(variant);
        }
    }

    let is_command_arms = command_variants.iter().map(|variant| {
        let ident = &variant.ident;
        match &variant.fields {
            Fields::Named(_) => quote! { Self::#ident { .. } => true, },
            Fields::Unnamed(_) => quote! { Self::#ident(..) => true, },
            Fields::Unit => quote! { Self::#ident => true, },
        }
    });

    let is_event_arms = event_variants.iter().map(|variant| {
        let ident = &variant.ident;
        match &variant.fields {
            Fields::Named(_) => quote! { Self::#ident { .. } => true, },
            Fields::Unnamed(_) => quote! { Self::#ident(..) => true, },
            Fields::Unit => quote! { Self::#ident => true, },
        }
    });

    let event_type_arms = event_variants.iter().map(|variant| {
        let ident = &variant.ident;
        let type_name = dotted_name(&name.to_string(), &ident.to_string());
        match &variant.fields {
            Fields::Named(_) => quote! { Self::#ident { .. } => #type_name, },
            Fields::Unnamed(_) => quote! { Self::#ident(..) => #type_name, },
            Fields::Unit => quote! { Self::#ident => #type_name, },
        }
    });

    let expanded = quote! {
        impl #name {
            /// Returns true if this action is a command
            #[must_use]
            pub const fn is_command(&self) -> bool {
                match self {
                    #(#is_command_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action is an event
            #[must_use]
            pub const fn is_event(&self) -> bool {
                match self {
                    #(#is_event_arms)*
                    _ => false,
                }
            }

            /// Returns the stable event type name for recording.
            ///
            /// Only events have type names. Commands return "unknown".
            #[must_use]
            pub const fn event_type(&self) -> &'static str {
                match self {
                    #(#event_type_arms)*
                    _ => "unknown",
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Builds the dotted event name: `OrderAction` + `OrderOpened` becomes
/// `order.order_opened`.
fn dotted_name(enum_name: &str, variant_name: &str) -> String {
    let prefix = enum_name
        .strip_suffix("Action")
        .unwrap_or(enum_name)
        .to_lowercase();
    format!("{prefix}.{}", to_snake_case(variant_name))
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
