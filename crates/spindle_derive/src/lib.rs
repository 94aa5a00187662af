use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod state;

#[proc_macro_derive(Stateful, attributes(state, stateful))]
pub fn derive_stateful(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let expanded = state::derive_stateful(input);
    expanded.into()
}
