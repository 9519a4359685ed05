use gates_macro_utils::Manifest;
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{parse_macro_input, DeriveInput, LitStr};

struct ComponentAttrs {
  id: Option<LitStr>,
  destructor: Option<syn::Path>,
}

impl ComponentAttrs {
  fn parse(input: &DeriveInput) -> syn::Result<Self> {
    let mut attrs = ComponentAttrs {
      id: None,
      destructor: None,
    };

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("component")) {
      attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("id") {
          attrs.id = Some(meta.value()?.parse()?);
          Ok(())
        } else if meta.path.is_ident("destructor") {
          attrs.destructor = Some(meta.value()?.parse()?);
          Ok(())
        } else {
          Err(meta.error("expected `id` or `destructor`"))
        }
      })?;
    }

    Ok(attrs)
  }
}

/// Implements `Component` for a type.
///
/// The type id defaults to the type name and can be overridden with
/// `#[component(id = "...")]`. A destructor run when the payload is discarded
/// can be declared with `#[component(destructor = path::to::fn)]`.
#[proc_macro_derive(Component, attributes(component))]
pub fn component(input: TokenStream) -> TokenStream {
  let input = parse_macro_input!(input as DeriveInput);

  match expand_component(&input) {
    Ok(tokens) => tokens.into(),
    Err(err) => err.to_compile_error().into(),
  }
}

fn expand_component(input: &DeriveInput) -> syn::Result<TokenStream2> {
  let attrs = ComponentAttrs::parse(input)?;
  let ecs_path = Manifest::load()
    .map_err(|err| syn::Error::new(Span::call_site(), err))?
    .crate_path("gates_ecs");

  let name = &input.ident;
  let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

  let id = attrs
    .id
    .unwrap_or_else(|| LitStr::new(&name.to_string(), name.span()));
  if id.value().is_empty() {
    return Err(syn::Error::new(id.span(), "component id must not be empty"));
  }

  let ty = match attrs.destructor {
    Some(destructor) => quote! {
      #ecs_path::components::ComponentType::with_destructor(#id, #destructor)
    },
    None => quote! {
      #ecs_path::components::ComponentType::new(#id)
    },
  };

  Ok(quote! {
    impl #impl_generics #ecs_path::components::Component for #name #type_generics #where_clause {
      const TYPE: #ecs_path::components::ComponentType<Self> = #ty;
    }
  })
}
