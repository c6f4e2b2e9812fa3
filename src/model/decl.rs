//! Type, callable, and constant declarations.

use super::type_ref::TypeRef;

// ---------------------------------------------------------------------------
// CallableDeclaration
// ---------------------------------------------------------------------------

/// A function definition (top-level or a method).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallableDeclaration {
    /// Function name.
    pub name: String,
    /// Decorator lines, in source order, each starting with `@`.
    pub attached_modifiers: Vec<String>,
    /// Annotations of the parameters that carry one, in source order.
    pub parameter_type_references: Vec<TypeRef>,
    /// The `-> T` annotation, if any.
    pub return_type_reference: Option<TypeRef>,
    /// The function body (opaque).
    pub body: String,
    /// Verbatim source: leading comments, decorators, and definition.
    pub source: String,
}

impl CallableDeclaration {
    /// Every type reference in the signature.
    pub fn signature_types(&self) -> impl Iterator<Item = &TypeRef> {
        self.parameter_type_references
            .iter()
            .chain(self.return_type_reference.iter())
    }
}

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

/// What a class-body statement is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemberKind {
    /// The class docstring.
    Docstring,
    /// A method (possibly decorated).
    Method(CallableDeclaration),
    /// A field binding, `x = 1` or `x: int = 1`.
    Field {
        /// The annotation, when the binding is annotated.
        annotation: Option<TypeRef>,
    },
    /// A nested class.
    NestedType,
    /// `pass`.
    Pass,
    /// Any other statement.
    Other,
}

/// One statement of a class body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    /// Merge identity. `None` for statements that have no name (docstring,
    /// `pass`, overload stubs, bare expressions).
    pub key: Option<String>,
    /// Statement category.
    pub kind: MemberKind,
    /// Source text. The first line carries no indentation; continuation lines
    /// keep their original indentation.
    pub text: String,
    /// Column the statement started at in its source.
    pub column: usize,
    /// Lines of `text` (0-based) that begin inside a multi-line string
    /// literal. Reindenting never touches them.
    pub literal_lines: Vec<usize>,
}

impl Member {
    /// Methods and nested classes are separated from neighbours by a blank
    /// line when a body is rebuilt.
    #[must_use]
    pub const fn is_definition(&self) -> bool {
        matches!(self.kind, MemberKind::Method(_) | MemberKind::NestedType)
    }
}

// ---------------------------------------------------------------------------
// TypeDeclaration
// ---------------------------------------------------------------------------

/// A class definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDeclaration {
    /// Class name, unique within a merge.
    pub name: String,
    /// Comment lines directly above the declaration.
    pub leading_comments: Vec<String>,
    /// Decorator lines, in source order. Always emitted directly above the
    /// header.
    pub attached_modifiers: Vec<String>,
    /// Comment lines written between the decorators and the header.
    pub modifier_comments: Vec<String>,
    /// Base-class arguments as written (`Base`, `Generic[T]`, `metaclass=M`).
    pub bases: Vec<String>,
    /// Analyzable form of each base argument.
    pub base_types: Vec<TypeRef>,
    /// Header text, `class Name(...):`.
    pub header: String,
    /// Body statements in order.
    pub members: Vec<Member>,
    /// Indentation of the body.
    pub indent: String,
    /// Verbatim source. Cleared once the merger changes the body.
    pub source: Option<String>,
}

impl TypeDeclaration {
    /// Members that are annotated field bindings, with their annotations.
    pub fn annotated_fields(&self) -> impl Iterator<Item = (&Member, &TypeRef)> {
        self.members.iter().filter_map(|m| match &m.kind {
            MemberKind::Field {
                annotation: Some(ann),
            } => Some((m, ann)),
            _ => None,
        })
    }

    /// Methods defined in the body.
    pub fn methods(&self) -> impl Iterator<Item = &CallableDeclaration> {
        self.members.iter().filter_map(|m| match &m.kind {
            MemberKind::Method(callable) => Some(callable),
            _ => None,
        })
    }

    /// Returns the member with the given key.
    #[must_use]
    pub fn member(&self, key: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.key.as_deref() == Some(key))
    }

    /// Render the declaration as source text.
    ///
    /// Unmerged declarations come back byte-for-byte. Merged ones are rebuilt
    /// from comments, decorators, header, and members, with every member
    /// reindented to this declaration's body indentation.
    #[must_use]
    pub fn render(&self) -> String {
        if let Some(source) = &self.source {
            return source.clone();
        }

        let mut out = String::new();
        for line in self
            .leading_comments
            .iter()
            .chain(&self.attached_modifiers)
            .chain(&self.modifier_comments)
        {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&self.header);

        if self.members.is_empty() {
            out.push('\n');
            out.push_str(&self.indent);
            out.push_str("pass");
            return out;
        }

        let mut prev: Option<&Member> = None;
        for member in &self.members {
            out.push('\n');
            if let Some(p) = prev
                && (p.is_definition()
                    || member.is_definition()
                    || matches!(p.kind, MemberKind::Docstring))
            {
                out.push('\n');
            }
            out.push_str(&reindent(
                &member.text,
                member.column,
                &self.indent,
                &member.literal_lines,
            ));
            prev = Some(member);
        }
        out
    }
}

/// Move a block of text from `from_column` to `indent`.
///
/// The first line is prefixed with `indent`; continuation lines that carry at
/// least `from_column` bytes of leading whitespace have that prefix replaced.
/// Lines listed in `literal_lines`, whitespace-only lines, and lines indented
/// less than `from_column` are left alone.
pub(crate) fn reindent(
    text: &str,
    from_column: usize,
    indent: &str,
    literal_lines: &[usize],
) -> String {
    let mut out = String::with_capacity(text.len() + indent.len());
    for (i, line) in text.split('\n').enumerate() {
        if i == 0 {
            out.push_str(indent);
            out.push_str(line);
            continue;
        }
        out.push('\n');
        let leading = line.len() - line.trim_start_matches([' ', '\t']).len();
        if literal_lines.contains(&i) || line.trim().is_empty() || leading < from_column {
            out.push_str(line);
        } else {
            out.push_str(indent);
            out.push_str(&line[from_column..]);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Constant
// ---------------------------------------------------------------------------

/// A module-level binding (`X = 1`, `X: int = 1`, `type X = ...`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constant {
    /// Bound name when the target is a single identifier.
    pub name: Option<String>,
    /// Verbatim source, including leading comments.
    pub text: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
