use proc_macro::TokenStream;
use quote::quote;
use std::sync::OnceLock;
use syn::{
  parse::{Parse, ParseStream},
  ItemFn,
};

static HAS_REMOTE_ENDPOINT: OnceLock<bool> = OnceLock::new();

fn has_remote_endpoint() -> bool {
  *HAS_REMOTE_ENDPOINT.get_or_init(|| {
    // Tests against a real remote automation endpoint only run when one is
    // configured. This value only changes when `benchfleet_test` is rebuilt.
    std::env::var("BENCHFLEET_REMOTE_URL").is_ok()
  })
}

struct Args {
  is_remote: bool,
}

impl Parse for Args {
  fn parse(input: ParseStream) -> syn::Result<Self> {
    match input.parse::<syn::Ident>() {
      Ok(ident) => Ok(Self {
        is_remote: ident == "remote",
      }),
      Err(_) => Ok(Self { is_remote: false }),
    }
  }
}

#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let item_fn = syn::parse_macro_input!(item as ItemFn);
  let args = syn::parse_macro_input!(attr as Args);

  let test_name = item_fn.sig.ident;
  let output = item_fn.sig.output;
  let content = item_fn.block;

  let is_async = item_fn.sig.asyncness.is_some();

  let ignore = if args.is_remote && !has_remote_endpoint() {
    quote! { #[ignore] }
  } else {
    quote! {}
  };

  let content = quote! {
    benchfleet_logger::init_logger_with_level(log::Level::Trace);

    #content
  };

  if is_async {
    return quote! {
      #ignore
      #[tokio::test]
      async fn #test_name() #output {
        #content
      }
    }
    .into();
  }

  quote! {
    #ignore
    #[test]
    fn #test_name() #output {
      #content
    }
  }
  .into()
}
