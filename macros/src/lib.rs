extern crate proc_macro;

macro_rules! bail {
    ($item:expr, $fmt:literal $($tts:tt)*) => {
        return Err(Error::new_spanned(
            &$item,
            format!(concat!("memotable: ", $fmt) $($tts)*)
        ))
    }
}

mod memoize;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_quote, Error, Result};

/// Memoize a function.
///
/// Each distinct tuple of arguments is computed at most once per process, even
/// when the function is called from many threads at once.
///
/// ```ignore
/// #[memoize]
/// fn describe(width: u32, height: u32) -> String {
///     format!("The image is {width}x{height} pixels.")
/// }
/// ```
#[proc_macro_attribute]
pub fn memoize(_: TokenStream, stream: TokenStream) -> TokenStream {
    let func = syn::parse_macro_input!(stream as syn::ItemFn);
    memoize::expand(func)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
