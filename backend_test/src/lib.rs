use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, ItemFn, Pat, PathArguments,
    Signature, Type,
};

/// Turn an `async` test into a synchronous one that runs against a fresh,
/// prepared database, injecting whatever it asks for and dropping the
/// database however the test ends.
///
/// Parameters may be any of:
/// - [`rocket::local::asynchronous::Client`] (at most one),
/// - [`mongodb::Database`] (at most one),
/// - `crate::model::mongodb::Coll<T>` (any number),
///
/// in any order. The test is ignored unless the `db_tests` feature is enabled.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    if !args.is_empty() {
        return syn::Error::new(
            Span::call_site(),
            "`backend_test` takes no arguments; attach auth cookies per request",
        )
        .into_compile_error()
        .into();
    }

    let mut item_fn = parse_macro_input!(input as ItemFn);
    let params = match injected_params(&item_fn.sig) {
        Ok(params) => params,
        Err(err) => return err.into_compile_error().into(),
    };

    // The wrapper takes the test's name; the body becomes an inner future.
    let name = item_fn.sig.ident.clone();
    let inner = format_ident!("{}_inner", name);
    item_fn.sig.ident = inner.clone();

    let call_args: Vec<TokenStream2> = params.iter().map(Injected::expr).collect();

    quote! {
        #[test]
        #[cfg_attr(not(feature = "db_tests"), ignore = "requires a MongoDB instance")]
        fn #name() {
            async fn setup() -> (rocket::local::asynchronous::Client, mongodb::Database) {
                let db_client = crate::db_client().await;
                let db_name = crate::config::get_database_name();
                let db = db_client.database(&db_name);
                crate::config::prepare_database(&db)
                    .await
                    .expect("failed to prepare test database");
                let client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_db(db_client, &db_name).await,
                )
                .await
                .expect("failed to ignite test rocket");
                (client, db)
            }

            #item_fn

            // Setup and cleanup share one runtime; the test body gets its own
            // so a panic inside it cannot poison the cleanup.
            let build_runtime = |thread_name: &str| {
                rocket::tokio::runtime::Builder::new_multi_thread()
                    .thread_name(thread_name)
                    .worker_threads(1)
                    .enable_all()
                    .build()
                    .expect("failed to build test runtime")
            };
            let harness = build_runtime("backend-test-harness");
            let body_runtime = build_runtime("rocket-worker-test-thread");

            let (client, db) = harness.block_on(setup());

            // `catch_unwind` needs `UnwindSafe` captures; the mutex carries
            // the values across.
            let handed_over = std::sync::Mutex::new((client, db.clone(), body_runtime));
            let outcome = std::panic::catch_unwind(|| {
                #[allow(unused_variables)]
                let (client, db, runtime) = handed_over
                    .into_inner()
                    .expect("test state mutex poisoned");
                runtime.block_on(#inner(#(#call_args),*));
            });

            harness.block_on(async move {
                if let Err(e) = db.drop(None).await {
                    eprintln!("failed to drop test database: {e}");
                }
            });

            if let Err(cause) = outcome {
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// One parameter the harness fills in.
enum Injected {
    Client,
    Database,
    Collection(Type),
}

impl Injected {
    /// The expression passed for this parameter, in terms of the harness's
    /// `client` and `db` bindings.
    fn expr(&self) -> TokenStream2 {
        match self {
            Injected::Client => quote! { client },
            Injected::Database => quote! { db.clone() },
            Injected::Collection(ty) => {
                quote! { crate::model::mongodb::Coll::<#ty>::from_db(&db) }
            }
        }
    }
}

/// Check the test is `async` and classify each of its parameters, in order.
fn injected_params(sig: &Signature) -> Result<Vec<Injected>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut params = Vec::with_capacity(sig.inputs.len());
    for input in &sig.inputs {
        let param = classify(input).ok_or_else(|| {
            syn::Error::new(
                input.span(),
                "Expected one of `_: Client`, `_: Database` or `_: Coll<T>`",
            )
        })?;
        let duplicate = match param {
            Injected::Client => params.iter().any(|p| matches!(p, Injected::Client)),
            Injected::Database => params.iter().any(|p| matches!(p, Injected::Database)),
            Injected::Collection(_) => false,
        };
        if duplicate {
            return Err(syn::Error::new(
                input.span(),
                "Test cannot accept more than one `Client` or `Database`",
            ));
        }
        params.push(param);
    }
    Ok(params)
}

fn classify(input: &FnArg) -> Option<Injected> {
    let FnArg::Typed(pat_type) = input else {
        return None;
    };
    if !matches!(&*pat_type.pat, Pat::Ident(_)) {
        return None;
    }
    let Type::Path(type_path) = &*pat_type.ty else {
        return None;
    };
    let last = type_path.path.segments.last()?;

    match (last.ident.to_string().as_str(), &last.arguments) {
        ("Client", PathArguments::None) => Some(Injected::Client),
        ("Database", PathArguments::None) => Some(Injected::Database),
        ("Coll", PathArguments::AngleBracketed(generics)) => match generics.args.first() {
            Some(GenericArgument::Type(ty)) => Some(Injected::Collection(ty.clone())),
            _ => None,
        },
        _ => None,
    }
}
