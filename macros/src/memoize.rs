use super::*;

/// Memoize a function.
pub fn expand(mut func: syn::ItemFn) -> Result<proc_macro2::TokenStream> {
    if let Some(asyncness) = &func.sig.asyncness {
        bail!(asyncness, "async functions are not supported")
    }

    if !func.sig.generics.params.is_empty() {
        bail!(func.sig.generics, "generic functions are not supported")
    }

    let mut args = vec![];
    let mut types = vec![];
    for input in &func.sig.inputs {
        let typed = match input {
            syn::FnArg::Typed(typed) => typed,
            syn::FnArg::Receiver(_) => {
                bail!(input, "methods are not supported")
            }
        };

        let name = match typed.pat.as_ref() {
            syn::Pat::Ident(syn::PatIdent {
                by_ref: None,
                mutability: None,
                ident,
                subpat: None,
                ..
            }) => ident,
            pat => bail!(pat, "only simple identifiers are supported"),
        };

        let ty = typed.ty.as_ref();
        match ty {
            syn::Type::Reference(_) => {
                bail!(ty, "reference arguments are not supported, pass owned values")
            }
            syn::Type::ImplTrait(_) => {
                bail!(ty, "`impl Trait` arguments are not supported")
            }
            _ => {}
        }

        args.push(name);
        types.push(ty);
    }

    let output: syn::Type = match &func.sig.output {
        syn::ReturnType::Default => parse_quote! { () },
        syn::ReturnType::Type(_, ty) => match ty.as_ref() {
            syn::Type::ImplTrait(_) => {
                bail!(ty, "`impl Trait` return types are not supported")
            }
            ty => ty.clone(),
        },
    };

    // Construct a tuple from all arguments and one from their types.
    let arg_tuple = quote! { (#(#args,)*) };
    let type_tuple = quote! { (#(#types,)*) };

    // The inner closure receives the arguments back from the table.
    let body = &func.block;
    let closure = quote! { |#arg_tuple: #type_tuple| -> #output #body };

    // Adjust the function's body.
    func.block = parse_quote! { {
        static __TABLE: ::memotable::MemoTable<#type_tuple, #output> =
            ::memotable::MemoTable::new();
        ::memotable::internal::assert_key::<#type_tuple>();
        ::memotable::internal::memoized(&__TABLE, #arg_tuple, #closure)
    } };

    Ok(quote! { #func })
}
