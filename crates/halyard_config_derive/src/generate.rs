use proc_macro2::TokenStream;
use quote::quote;
use syn::Data;
use syn::DeriveInput;
use syn::Error;
use syn::Field;
use syn::Fields;
use syn::Ident;
use syn::LitStr;
use syn::PathArguments;
use syn::Result;
use syn::Type;
use syn::TypePath;

enum Identity {
    Inherited,
    Singleton,
    Keyed(Ident),
}

struct NodeAttrs {
    name: LitStr,
    identity: Identity,
}

#[derive(Default)]
struct FieldAttrs {
    child: bool,
    local_file: bool,
}

enum Shape {
    Single,
    Optional,
    Sequence,
    Map,
}

pub fn expand_node(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    // Only support structs with named fields
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(Error::new_spanned(
                    name,
                    "Node only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(Error::new_spanned(name, "Node only supports structs"));
        }
    };

    let attrs = parse_node_attrs(&input)?;

    if let Identity::Keyed(key) = &attrs.identity {
        let exists = fields
            .iter()
            .any(|f| f.ident.as_ref().is_some_and(|ident| ident == key));
        if !exists {
            return Err(Error::new_spanned(
                key,
                format!("key field `{}` not found on `{}`", key, name),
            ));
        }
    }

    let mut child_pushes = Vec::new();
    let mut file_pushes = Vec::new();
    for field in fields {
        let field_attrs = parse_field_attrs(field)?;
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };

        if field_attrs.child {
            child_pushes.push(generate_child_push(field_name, child_shape(&field.ty)?));
        }
        if field_attrs.local_file {
            file_pushes.push(generate_file_push(field_name, file_shape(&field.ty)));
        }
    }

    let node_name = &attrs.name;
    let identity = generate_identity(&attrs.identity);
    let children = if child_pushes.is_empty() {
        quote! { ::halyard_config::NodeIterator::empty() }
    } else {
        quote! {
            let mut children: ::std::vec::Vec<&dyn ::halyard_config::Node> = ::std::vec::Vec::new();
            #(#child_pushes)*
            ::halyard_config::NodeIterator::new(children)
        }
    };
    let local_files = if file_pushes.is_empty() {
        None
    } else {
        Some(quote! {
            fn local_files(&self) -> ::std::vec::Vec<&str> {
                let mut files: ::std::vec::Vec<&str> = ::std::vec::Vec::new();
                #(#file_pushes)*
                files
            }
        })
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::halyard_config::Node for #name #ty_generics #where_clause {
            fn node_name(&self) -> &'static str {
                #node_name
            }

            fn identity(&self) -> ::halyard_config::Identity<'_> {
                #identity
            }

            fn children(&self) -> ::halyard_config::NodeIterator<'_> {
                #children
            }

            #local_files

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    })
}

fn parse_node_attrs(input: &DeriveInput) -> Result<NodeAttrs> {
    let mut name: Option<LitStr> = None;
    let mut key: Option<LitStr> = None;
    let mut inherit = false;

    for attr in &input.attrs {
        if !attr.path().is_ident("node") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("key") {
                key = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("inherit") {
                inherit = true;
                Ok(())
            } else {
                Err(meta.error("unsupported node attribute, expected `name`, `key` or `inherit`"))
            }
        })?;
    }

    let name = name.ok_or_else(|| {
        Error::new_spanned(&input.ident, "missing #[node(name = \"...\")] attribute")
    })?;

    let valid_name = !name.value().is_empty()
        && name
            .value()
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !valid_name {
        return Err(Error::new_spanned(
            &name,
            "node names must be lowercase ASCII letters, digits, `_` or `-`",
        ));
    }

    let identity = match (key, inherit) {
        (Some(key), false) => Identity::Keyed(key.parse()?),
        (None, true) => Identity::Inherited,
        (None, false) => Identity::Singleton,
        (Some(key), true) => {
            return Err(Error::new_spanned(
                key,
                "`key` and `inherit` cannot be used together",
            ));
        }
    };

    Ok(NodeAttrs { name, identity })
}

fn parse_field_attrs(field: &Field) -> Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("node") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("child") {
                attrs.child = true;
                Ok(())
            } else if meta.path.is_ident("local_file") {
                attrs.local_file = true;
                Ok(())
            } else {
                Err(meta.error("unsupported field attribute, expected `child` or `local_file`"))
            }
        })?;
    }

    Ok(attrs)
}

/// Classify a `#[node(child)]` field. Unknown containers are rejected so a
/// child can never be silently skipped.
fn child_shape(ty: &Type) -> Result<Shape> {
    let unsupported = || {
        Error::new_spanned(
            ty,
            "unsupported child field type, expected T, Option<T>, Vec<T>, IndexMap<K, T> or BTreeMap<K, T> where T: Node",
        )
    };

    let Type::Path(TypePath { qself: None, path }) = ty else {
        return Err(unsupported());
    };
    let Some(segment) = path.segments.last() else {
        return Err(unsupported());
    };

    let shape = match segment.ident.to_string().as_str() {
        "Option" => Shape::Optional,
        "Vec" => Shape::Sequence,
        "IndexMap" | "BTreeMap" => Shape::Map,
        "HashMap" => {
            return Err(Error::new_spanned(
                ty,
                "HashMap children have no stable order, use IndexMap or BTreeMap",
            ));
        }
        "Box" | "Rc" | "Arc" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet"
        | "IndexSet" => return Err(unsupported()),
        _ => return Ok(Shape::Single),
    };

    if !matches!(segment.arguments, PathArguments::AngleBracketed(_)) {
        return Err(unsupported());
    }
    Ok(shape)
}

fn file_shape(ty: &Type) -> Shape {
    if let Type::Path(TypePath { qself: None, path }) = ty {
        if let Some(segment) = path.segments.last() {
            if segment.ident == "Option" {
                return Shape::Optional;
            }
            if segment.ident == "Vec" {
                return Shape::Sequence;
            }
        }
    }
    Shape::Single
}

fn generate_identity(identity: &Identity) -> TokenStream {
    match identity {
        Identity::Inherited => quote! { ::halyard_config::Identity::Inherited },
        Identity::Singleton => quote! { ::halyard_config::Identity::Singleton },
        Identity::Keyed(field) => quote! {
            ::halyard_config::Identity::Keyed(::std::convert::AsRef::<str>::as_ref(&self.#field))
        },
    }
}

fn generate_child_push(field: &Ident, shape: Shape) -> TokenStream {
    match shape {
        Shape::Single => quote! {
            children.push(&self.#field);
        },
        Shape::Optional => quote! {
            if let ::std::option::Option::Some(child) = &self.#field {
                children.push(child);
            }
        },
        Shape::Sequence => quote! {
            children.extend(self.#field.iter().map(|child| child as &dyn ::halyard_config::Node));
        },
        Shape::Map => quote! {
            children.extend(self.#field.values().map(|child| child as &dyn ::halyard_config::Node));
        },
    }
}

fn generate_file_push(field: &Ident, shape: Shape) -> TokenStream {
    match shape {
        Shape::Optional => quote! {
            if let ::std::option::Option::Some(path) = &self.#field {
                if !path.is_empty() {
                    files.push(::std::convert::AsRef::<str>::as_ref(path));
                }
            }
        },
        Shape::Sequence => quote! {
            files.extend(
                self.#field
                    .iter()
                    .filter(|path| !path.is_empty())
                    .map(|path| ::std::convert::AsRef::<str>::as_ref(path)),
            );
        },
        Shape::Single | Shape::Map => quote! {
            if !self.#field.is_empty() {
                files.push(::std::convert::AsRef::<str>::as_ref(&self.#field));
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;

    #[test]
    fn test_child_shapes() {
        assert!(matches!(child_shape(&parse_quote!(Settings)), Ok(Shape::Single)));
        assert!(matches!(child_shape(&parse_quote!(Option<Settings>)), Ok(Shape::Optional)));
        assert!(matches!(child_shape(&parse_quote!(Vec<Region>)), Ok(Shape::Sequence)));
        assert!(matches!(
            child_shape(&parse_quote!(IndexMap<String, Region>)),
            Ok(Shape::Map)
        ));
        assert!(matches!(
            child_shape(&parse_quote!(std::collections::BTreeMap<String, Region>)),
            Ok(Shape::Map)
        ));
        assert!(child_shape(&parse_quote!(Box<Region>)).is_err());
        assert!(child_shape(&parse_quote!(HashSet<Region>)).is_err());
    }

    #[test]
    fn test_hash_map_children_rejected() {
        let input: DeriveInput = parse_quote! {
            #[node(name = "cluster", inherit)]
            struct Cluster {
                #[node(child)]
                regions: HashMap<String, Region>,
            }
        };
        let err = expand_node(input).unwrap_err();
        assert_eq!(
            err.to_string(),
            "HashMap children have no stable order, use IndexMap or BTreeMap"
        );
    }
}
