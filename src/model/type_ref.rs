//! Type references extracted from annotations and base-class lists.
//!
//! A [`TypeRef`] is the analyzable shape of a type expression. The merge
//! engine never reserializes these; source text is always emitted verbatim.
//! They exist so the dependency analyzer can find which declarations a type
//! mentions without caring how the mention is spelled.

// ---------------------------------------------------------------------------
// TypeRef
// ---------------------------------------------------------------------------

/// A type expression as written in an annotation, a base list, or a quoted
/// forward reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRef {
    /// A bare or dotted name (`Role`, `typing.Optional`).
    Name(String),
    /// A parameterized type (`list[Role]`, `Dict[str, "Message"]`).
    Generic {
        /// The type being parameterized.
        base: Box<Self>,
        /// Type arguments in source order.
        args: Vec<Self>,
    },
    /// `A | B | C`.
    Union(Vec<Self>),
    /// A bracketed or parenthesized list of types, e.g. the parameter list
    /// in `Callable[[A, B], C]`.
    Group(Vec<Self>),
    /// A quoted forward reference, parsed into the type it names.
    Forward(Box<Self>),
    /// Anything that cannot name a declaration (`None`, `...`, literals).
    Opaque(String),
}

impl TypeRef {
    /// Visit every leaf name, unwrapping generics, unions, groups, and
    /// forward references.
    pub fn for_each_name<F: FnMut(&str)>(&self, f: &mut F) {
        match self {
            Self::Name(name) => f(name),
            Self::Generic { base, args } => {
                base.for_each_name(f);
                for arg in args {
                    arg.for_each_name(f);
                }
            }
            Self::Union(items) | Self::Group(items) => {
                for item in items {
                    item.for_each_name(f);
                }
            }
            Self::Forward(inner) => inner.for_each_name(f),
            Self::Opaque(_) => {}
        }
    }

    /// Leaf names in source order (duplicates preserved).
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.for_each_name(&mut |name| out.push(name.to_owned()));
        out
    }

    /// Build a union, flattening nested unions.
    #[must_use]
    pub fn union(items: impl IntoIterator<Item = Self>) -> Self {
        let mut flat = Vec::new();
        for item in items {
            match item {
                Self::Union(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        Self::Union(flat)
    }
}

/// The segment of a dotted name that must be bound before the name can be
/// evaluated: `Outer.Inner` needs `Outer`.
#[must_use]
pub fn root_segment(name: &str) -> &str {
    name.split('.').next().unwrap_or(name).trim()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> TypeRef {
        TypeRef::Name(n.to_owned())
    }

    #[test]
    fn names_unwrap_every_wrapper() {
        let ty = TypeRef::Generic {
            base: Box::new(name("Dict")),
            args: vec![
                name("str"),
                TypeRef::union([
                    TypeRef::Forward(Box::new(name("Message"))),
                    TypeRef::Opaque("None".to_owned()),
                ]),
                TypeRef::Group(vec![name("Role")]),
            ],
        };
        assert_eq!(ty.names(), vec!["Dict", "str", "Message", "Role"]);
    }

    #[test]
    fn union_flattens_nested_unions() {
        let ty = TypeRef::union([TypeRef::union([name("A"), name("B")]), name("C")]);
        assert_eq!(ty, TypeRef::Union(vec![name("A"), name("B"), name("C")]));
    }

    #[test]
    fn root_segment_of_dotted_name() {
        assert_eq!(root_segment("Outer.Inner"), "Outer");
        assert_eq!(root_segment("Role"), "Role");
    }
}
