use proc_macro::TokenStream;
use syn::DeriveInput;
use syn::parse_macro_input;

mod generate;

/// Derive macro implementing `halyard_config::Node` for a configuration struct.
///
/// The generated `children()` returns the fields tagged `#[node(child)]`,
/// in declaration order. Collections yield their elements in iteration
/// order, so `Vec` and `IndexMap` keep insertion order.
///
/// # Attributes
///
/// On the struct:
///
/// - `#[node(name = "account")]`: the node name used in filters (required)
/// - `#[node(key = "field")]`: the node is keyed by a string field
/// - `#[node(inherit)]`: the node shares its parent's location
///
/// Without `key` or `inherit` the node is a singleton under its parent.
///
/// On fields:
///
/// - `#[node(child)]`: the field holds child nodes. Supported shapes are
///   `T`, `Option<T>`, `Vec<T>` and ordered maps (`IndexMap`, `BTreeMap`)
///   with `T: Node` values. Anything else, `HashMap` included, is rejected
///   at compile time since children must come out in a stable order.
/// - `#[node(local_file)]`: the field holds a path to a local file
///   (`String`, `Option<String>` or `Vec<String>`)
///
/// # Example
///
/// ```ignore
/// use halyard_config::Node;
///
/// #[derive(Debug, Node)]
/// #[node(name = "account", key = "name")]
/// struct Account {
///     name: String,
///     #[node(local_file)]
///     json_path: Option<String>,
/// }
///
/// #[derive(Debug, Node)]
/// #[node(name = "provider", key = "kind")]
/// struct Provider {
///     kind: String,
///     #[node(child)]
///     accounts: Vec<Account>,
/// }
/// ```
#[proc_macro_derive(Node, attributes(node))]
pub fn derive_node(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate::expand_node(input) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
