//! Derive macro for `jsonreflect::Reflect`.
//!
//! ```ignore
//! #[derive(Reflect)]
//! #[serde(rename_all = "camelCase")]
//! struct Pet {
//!     /// Display name
//!     pet_name: String,
//!     #[schema(required, example = "3", minimum = 0)]
//!     age: Option<u8>,
//! }
//! ```
//!
//! Structs with named fields become object descriptors declared in the
//! invoking module. Newtypes are transparent, unit structs are `null`, enums
//! with only unit variants become string enumerations and other enums become
//! unions of externally tagged alternatives.

mod attrs;
mod codegen;

use proc_macro::TokenStream;

#[proc_macro_derive(Reflect, attributes(schema))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);
    codegen::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
