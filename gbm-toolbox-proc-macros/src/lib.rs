extern crate proc_macro;
use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream, Result};
use syn::{bracketed, parse_macro_input, token, Expr, Ident, Token};

struct FitsKeyRead {
    header: Ident,
    variant: Ident,
    key: Expr,
}

impl Parse for FitsKeyRead {
    fn parse(input: ParseStream) -> Result<Self> {
        let content;
        let header: Ident = input.parse()?;
        let _paren: token::Bracket = bracketed!(content in input);
        let key: Expr = content.parse()?;
        input.parse::<Token![as]>()?;
        let variant: Ident = input.parse()?;

        Ok(FitsKeyRead {
            header,
            variant,
            key,
        })
    }
}

// example use
// read_fits_key!(header["NAXIS2"] as Integer);
//
// Expands to a lookup on a `Header` that returns early with `Error::Format`
// when the keyword is absent and `Error::WrongEnumVariant` when the value
// is of a different kind. `HeaderValue` and `Error` must be in scope.
#[proc_macro]
pub fn read_fits_key(input: TokenStream) -> TokenStream {
    let FitsKeyRead {
        header,
        variant,
        key,
    } = parse_macro_input!(input as FitsKeyRead);

    let output = quote! {
        {
            let fits_key = #key;
            match #header
                .get(&fits_key)
                .ok_or_else(|| Error::Format(format!("header is missing {}", fits_key)))?
            {
                HeaderValue::#variant(x) => x.clone(),
                _ => return Err(Error::WrongEnumVariant),
            }
        }
    };
    TokenStream::from(output)
}
