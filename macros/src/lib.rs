//! Derive macro for the accelerator's special-register enum.
//!
//! The original device firmware resolved a special register's printable
//! name to its index with a long hand-written `if`/`else` chain of string
//! compares. `#[derive(SpecRegName)]` generates the two directions of that
//! mapping (`name()` and `from_name()`) from the enum's own variants, so the
//! mnemonic assembler and the enum can never drift out of sync.

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

#[proc_macro_derive(SpecRegName)]
pub fn derive_spec_reg_name(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let ident = &input.ident;

    let variants = match &input.data {
        Data::Enum(data) => &data.variants,
        _ => {
            return syn::Error::new_spanned(&input, "SpecRegName can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    let mut name_arms = Vec::new();
    let mut from_name_arms = Vec::new();
    let mut index_arms = Vec::new();
    let mut from_index_arms = Vec::new();

    for (i, v) in variants.iter().enumerate() {
        if !matches!(v.fields, Fields::Unit) {
            return syn::Error::new_spanned(v, "SpecRegName only supports unit variants")
                .to_compile_error()
                .into();
        }
        let variant_ident = &v.ident;
        let name = variant_ident.to_string();
        let idx = i as u32;
        name_arms.push(quote! { #ident::#variant_ident => #name, });
        from_name_arms.push(quote! { #name => Some(#ident::#variant_ident), });
        index_arms.push(quote! { #ident::#variant_ident => #idx, });
        from_index_arms.push(quote! { #idx => Some(#ident::#variant_ident), });
    }

    let expanded = quote! {
        impl #ident {
            /// The printable mnemonic name for this special register, e.g. `"RET"`.
            pub fn name(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }

            /// Parse a printable special-register name back into its variant.
            pub fn from_name(s: &str) -> Option<Self> {
                match s {
                    #(#from_name_arms)*
                    _ => None,
                }
            }

            /// The flat register-file index this variant occupies.
            pub fn index(&self) -> u32 {
                match self {
                    #(#index_arms)*
                }
            }

            /// Recover a variant from its flat register-file index.
            pub fn from_index(i: u32) -> Option<Self> {
                match i {
                    #(#from_index_arms)*
                    _ => None,
                }
            }
        }
    };

    expanded.into()
}
