use proc_macro::TokenStream;
use syn::DeriveInput;

mod decode;
mod from_row;

macro_rules! error {
    ($msg:literal) => {
        return Err(syn::Error::new(proc_macro2::Span::call_site(), $msg))
    };
}
pub(crate) use error;

/// Derive [`FromRow`][::kolon::FromRow] for a struct.
///
/// Named fields are matched by column name; tuple structs are matched by
/// position, in declaration order.
#[proc_macro_derive(FromRow)]
pub fn from_row(input: TokenStream) -> TokenStream {
    match from_row::from_row(syn::parse_macro_input!(input as DeriveInput)) {
        Ok(ok) => ok,
        Err(err) => err.into_compile_error().into(),
    }
}

/// Derive [`Decode`][::kolon::Decode] for a single-field newtype wrapping
/// another [`Decode`] type.
#[proc_macro_derive(Decode)]
pub fn decode(input: TokenStream) -> TokenStream {
    match decode::decode(syn::parse_macro_input!(input as DeriveInput)) {
        Ok(ok) => ok,
        Err(err) => err.into_compile_error().into(),
    }
}
