//! Implementation of the #[auto_data] attribute macro

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    Attribute, Expr, FnArg, Ident, ItemFn, Lit, Meta, MetaNameValue, Pat, PatType, Path, Result,
    ReturnType, Token, Type,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
};

/// Configuration for the auto data macro
#[derive(Default)]
struct AutoDataConfig {
    seed: Option<u64>,
    fixture: Option<Path>,
    inline: Vec<Expr>,
}

impl Parse for AutoDataConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut config = AutoDataConfig::default();

        if input.is_empty() {
            return Ok(config);
        }

        let punctuated: Punctuated<Meta, Token![,]> =
            input.parse_terminated(Meta::parse, Token![,])?;

        for meta in punctuated {
            match meta {
                Meta::NameValue(MetaNameValue { path, value, .. }) => {
                    let name = path.get_ident().ok_or_else(|| {
                        syn::Error::new_spanned(&path, "Expected simple identifier")
                    })?;

                    match name.to_string().as_str() {
                        "seed" => {
                            if let Expr::Lit(syn::ExprLit {
                                lit: Lit::Int(lit_int),
                                ..
                            }) = value
                            {
                                config.seed = Some(lit_int.base10_parse()?);
                            } else {
                                return Err(syn::Error::new_spanned(
                                    value,
                                    "Expected integer literal",
                                ));
                            }
                        }
                        "fixture" => {
                            if let Expr::Path(expr_path) = value {
                                config.fixture = Some(expr_path.path);
                            } else {
                                return Err(syn::Error::new_spanned(
                                    value,
                                    "Expected a path to a fixture factory function",
                                ));
                            }
                        }
                        _ => {
                            return Err(syn::Error::new_spanned(
                                name,
                                "Unknown configuration option. Supported: seed, fixture, inline(...)",
                            ));
                        }
                    }
                }
                Meta::List(list) if list.path.is_ident("inline") => {
                    let values = list
                        .parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)?;
                    config.inline.extend(values);
                }
                _ => {
                    return Err(syn::Error::new_spanned(
                        meta,
                        "Expected `seed = N`, `fixture = path` or `inline(values...)`",
                    ));
                }
            }
        }

        if let (Some(_), Some(fixture)) = (config.seed, &config.fixture) {
            return Err(syn::Error::new_spanned(
                fixture,
                "`seed` and `fixture` cannot be combined; seed the fixture inside the factory",
            ));
        }

        Ok(config)
    }
}

/// A customization declared on a parameter
enum ParameterCustomization {
    Frozen,
    Range(Expr, Expr),
    OneOf(Vec<Expr>),
    Inject(Expr),
    Customize(Expr),
}

/// Extract parameter information from function signature
struct ParameterInfo {
    name: Ident,
    ty: Type,
    opaque: bool,
    customizations: Vec<ParameterCustomization>,
}

const PARAMETER_ATTRIBUTES: &[&str] =
    &["frozen", "range", "one_of", "inject", "customize", "opaque"];

fn is_parameter_attribute(attr: &Attribute) -> bool {
    PARAMETER_ATTRIBUTES
        .iter()
        .any(|name| attr.path().is_ident(name))
}

impl ParameterInfo {
    fn from_fn_arg(arg: &FnArg) -> Result<Self> {
        match arg {
            FnArg::Typed(PatType { pat, ty, attrs, .. }) => {
                let Pat::Ident(pat_ident) = pat.as_ref() else {
                    return Err(syn::Error::new_spanned(
                        pat,
                        "Auto data functions must have simple parameter names",
                    ));
                };

                let mut info = ParameterInfo {
                    name: pat_ident.ident.clone(),
                    ty: (**ty).clone(),
                    opaque: false,
                    customizations: Vec::new(),
                };
                for attr in attrs.iter().filter(|attr| is_parameter_attribute(attr)) {
                    info.apply_attribute(attr)?;
                }
                Ok(info)
            }
            FnArg::Receiver(_) => Err(syn::Error::new_spanned(
                arg,
                "Auto data functions cannot have self parameters",
            )),
        }
    }

    fn apply_attribute(&mut self, attr: &Attribute) -> Result<()> {
        let path = attr.path();
        if path.is_ident("frozen") {
            attr.meta.require_path_only()?;
            self.customizations.push(ParameterCustomization::Frozen);
        } else if path.is_ident("opaque") {
            attr.meta.require_path_only()?;
            self.opaque = true;
        } else if path.is_ident("range") {
            let bounds =
                attr.parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)?;
            if bounds.len() != 2 {
                return Err(syn::Error::new_spanned(
                    attr,
                    "Expected `#[range(min, max)]`",
                ));
            }
            let mut bounds = bounds.into_iter();
            if let (Some(min), Some(max)) = (bounds.next(), bounds.next()) {
                self.customizations
                    .push(ParameterCustomization::Range(min, max));
            }
        } else if path.is_ident("one_of") {
            let values =
                attr.parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)?;
            if values.is_empty() {
                return Err(syn::Error::new_spanned(
                    attr,
                    "Expected at least one value in `#[one_of(...)]`",
                ));
            }
            self.customizations
                .push(ParameterCustomization::OneOf(values.into_iter().collect()));
        } else if path.is_ident("inject") {
            self.customizations
                .push(ParameterCustomization::Inject(attr.parse_args()?));
        } else if path.is_ident("customize") {
            self.customizations
                .push(ParameterCustomization::Customize(attr.parse_args()?));
        }
        Ok(())
    }

    /// Expression building the `Parameter` descriptor
    fn descriptor(&self) -> TokenStream2 {
        let name = &self.name;
        let ty = &self.ty;
        let constructor = if self.opaque {
            quote! { ::autotheory::Parameter::opaque::<#ty> }
        } else {
            quote! { ::autotheory::Parameter::new::<#ty> }
        };

        let attributes = self.customizations.iter().map(|customization| match customization {
            ParameterCustomization::Frozen => quote! {
                .with_attribute(::autotheory::Frozen::<#ty>::new())
            },
            ParameterCustomization::Range(min, max) => quote! {
                .with_attribute(::autotheory::InRange::<#ty>::new(#min, #max))
            },
            ParameterCustomization::OneOf(values) => quote! {
                .with_attribute(::autotheory::OneOf::<#ty>::new(::std::vec![#(#values),*]))
            },
            ParameterCustomization::Inject(value) => quote! {
                .with_attribute(::autotheory::Inject::<#ty>::new(::core::convert::Into::into(#value)))
            },
            ParameterCustomization::Customize(source) => quote! {
                .with_attribute(#source)
            },
        });

        quote! {
            #constructor(stringify!(#name)) #(#attributes)*
        }
    }
}

/// Generate the data attribute expression from macro attributes
fn generate_attribute(config: &AutoDataConfig, params: &[ParameterInfo]) -> TokenStream2 {
    let auto = if let Some(fixture) = &config.fixture {
        quote! { ::autotheory::AutoData::new(#fixture) }
    } else if let Some(seed) = config.seed {
        quote! { ::autotheory::AutoData::new(|| ::autotheory::DefaultFixture::seeded(#seed)) }
    } else {
        quote! { ::autotheory::AutoData::default() }
    };

    if config.inline.is_empty() {
        return auto;
    }

    let values = config.inline.iter().zip(params).map(|(value, param)| {
        let ty = &param.ty;
        quote! { .value::<#ty>(::core::convert::Into::into(#value)) }
    });

    quote! {
        ::autotheory::InlineAutoData::new(#auto) #(#values)*
    }
}

/// Attributes that belong on the generated test rather than the original function
fn is_test_attribute(attr: &Attribute) -> bool {
    attr.path().is_ident("should_panic") || attr.path().is_ident("ignore")
}

/// Generate the auto data test implementation
pub fn auto_data_impl(args: TokenStream, input: TokenStream) -> TokenStream {
    let config = parse_macro_input!(args as AutoDataConfig);
    let item_fn = parse_macro_input!(input as ItemFn);

    match expand(config, item_fn) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(config: AutoDataConfig, item_fn: ItemFn) -> Result<TokenStream2> {
    // Validate function signature
    if !item_fn.sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item_fn.sig.generics,
            "Auto data functions cannot have generic parameters",
        ));
    }
    if let Some(asyncness) = &item_fn.sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "Auto data functions cannot be async",
        ));
    }
    if let ReturnType::Type(_, ty) = &item_fn.sig.output {
        return Err(syn::Error::new_spanned(
            ty,
            "Auto data functions must return ()",
        ));
    }

    let params = item_fn
        .sig
        .inputs
        .iter()
        .map(ParameterInfo::from_fn_arg)
        .collect::<Result<Vec<_>>>()?;

    if config.inline.len() > params.len() {
        return Err(syn::Error::new(
            Span::call_site(),
            format!(
                "{} inline values supplied for a function with {} parameters",
                config.inline.len(),
                params.len()
            ),
        ));
    }

    let test_name = &item_fn.sig.ident;
    let original_fn_name = Ident::new(&format!("__{}_original", test_name), Span::call_site());

    // Create the original function under a private name, without the parameter attributes
    let mut original_fn = item_fn.clone();
    original_fn.sig.ident = original_fn_name.clone();
    original_fn
        .attrs
        .retain(|attr| !attr.path().is_ident("test") && !is_test_attribute(attr));
    for input in original_fn.sig.inputs.iter_mut() {
        if let FnArg::Typed(pat_type) = input {
            pat_type.attrs.retain(|attr| !is_parameter_attribute(attr));
        }
    }

    let test_attrs: Vec<_> = item_fn
        .attrs
        .iter()
        .filter(|attr| is_test_attribute(attr))
        .collect();

    let descriptors = params.iter().map(ParameterInfo::descriptor);
    let attribute = generate_attribute(&config, &params);

    let param_names: Vec<_> = params.iter().map(|p| &p.name).collect();
    let param_types: Vec<_> = params.iter().map(|p| &p.ty).collect();
    let indices = 0..params.len();

    let invocation = if params.is_empty() {
        quote! {
            for _row in rows {
                #original_fn_name();
            }
        }
    } else {
        quote! {
            for mut row in rows {
                #(
                    let #param_names: #param_types = row
                        .take(#indices)
                        .unwrap_or_else(|error| panic!("{}", error));
                )*
                #original_fn_name(#(#param_names),*);
            }
        }
    };

    Ok(quote! {
        #original_fn

        #[test]
        #(#test_attrs)*
        fn #test_name() {
            let method = ::autotheory::TestMethod::new(stringify!(#test_name))
                #(.parameter(#descriptors))*;
            let attribute = #attribute;
            let rows = ::autotheory::DataAttribute::get_data(
                &attribute,
                ::core::option::Option::Some(&method),
            )
            .unwrap_or_else(|error| {
                panic!("auto data for `{}` failed: {}", stringify!(#test_name), error)
            });
            #invocation
        }
    })
}
