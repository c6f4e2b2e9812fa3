//! Structural parser: Python source text → [`ParsedFragment`].
//!
//! Parsing uses tree-sitter's Python grammar. tree-sitter never fails
//! outright; it recovers with `ERROR` and `MISSING` nodes. Any such node
//! makes the whole fragment a [`MergeError::Syntax`], so a caller never sees
//! a partially decomposed fragment.
//!
//! Classification walks the module's top-level statements once:
//!
//! | Statement | Bucket |
//! |---|---|
//! | first bare string | documentation |
//! | `from __future__ import ...` | environment declarations |
//! | `import ...` / `from ... import ...` | references |
//! | `if TYPE_CHECKING:` | conditional blocks (verbatim) |
//! | `class` (decorated or not) | type declarations |
//! | `def` / `async def` (decorated or not) | callable declarations |
//! | `__all__ = [...]` | export list |
//! | other assignments, `type X = ...` | constants |
//! | anything else | unclassified |
//!
//! Comments attach to the statement that follows them. Comments above the
//! first statement form the preamble when they start with a shebang, are
//! followed by a blank line, or precede the docstring.

use std::collections::BTreeSet;

use tree_sitter::{Language, Node, Parser, Tree};

use crate::config::ParseConfig;
use crate::error::MergeError;
use crate::model::{
    CallableDeclaration, Constant, Declaration, ImportedName, Member, MemberKind,
    ParsedFragment, ReferenceDeclaration, TypeDeclaration, TypeRef,
};

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse one fragment with default settings.
///
/// # Errors
/// Returns [`MergeError::Syntax`] if the source is not valid Python and
/// [`MergeError::ParserSetup`] if the grammar cannot be loaded.
pub fn parse_fragment(source: &str, origin: &str) -> Result<ParsedFragment, MergeError> {
    parse_fragment_with_config(source, origin, &ParseConfig::default())
}

/// Parse one fragment.
///
/// # Errors
/// Returns [`MergeError::Syntax`] if the source is not valid Python and
/// [`MergeError::ParserSetup`] if the grammar cannot be loaded.
pub fn parse_fragment_with_config(
    source: &str,
    origin: &str,
    config: &ParseConfig,
) -> Result<ParsedFragment, MergeError> {
    let text = if config.strip_code_fences {
        strip_code_fences(source)
    } else {
        source
    };

    let tree = parse_tree(text)?.ok_or_else(|| MergeError::Syntax {
        origin: origin.to_owned(),
        message: "parser produced no tree".to_owned(),
    })?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(MergeError::Syntax {
            origin: origin.to_owned(),
            message: describe_syntax_error(root),
        });
    }

    let extractor = Extractor { src: text, config };
    Ok(extractor.fragment(root, origin))
}

/// Strip a ```` ``` ```` fence wrapped around the whole source.
///
/// Only a fence on the first non-blank line counts, and only a fence on the
/// last non-blank line closes it, so backticks inside docstrings survive.
#[must_use]
pub fn strip_code_fences(source: &str) -> &str {
    let trimmed = source.trim_start();
    if !trimmed.starts_with("```") {
        return source;
    }
    // Drop the opening fence line, info string included.
    let body = trimmed.find('\n').map_or("", |i| &trimmed[i + 1..]);
    let end = body.trim_end();
    let last_line_start = end.rfind('\n').map_or(0, |i| i + 1);
    if end[last_line_start..].trim_start().starts_with("```") {
        &body[..last_line_start]
    } else {
        body
    }
}

fn python_parser() -> Result<Parser, MergeError> {
    let language: Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| MergeError::ParserSetup(format!("{e}")))?;
    Ok(parser)
}

fn parse_tree(source: &str) -> Result<Option<Tree>, MergeError> {
    Ok(python_parser()?.parse(source, None))
}

// ---------------------------------------------------------------------------
// Syntax errors
// ---------------------------------------------------------------------------

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}

fn describe_syntax_error(root: Node<'_>) -> String {
    match first_error(root) {
        Some(node) => {
            let pos = node.start_position();
            let (line, column) = (pos.row + 1, pos.column + 1);
            if node.is_missing() {
                format!("missing `{}` at line {line}, column {column}", node.kind())
            } else {
                format!("invalid syntax at line {line}, column {column}")
            }
        }
        None => "invalid syntax".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Tree helpers
// ---------------------------------------------------------------------------

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// Rows of `node`, counted from its first row, that begin inside a multi-line
/// string literal.
fn literal_rows(node: Node<'_>) -> Vec<usize> {
    let base = node.start_position().row;
    let mut rows = BTreeSet::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if n.kind() == "string" {
            let (start, end) = (n.start_position().row, n.end_position().row);
            rows.extend((start + 1..=end).map(|row| row - base));
        } else {
            stack.extend(named_children(n));
        }
    }
    rows.into_iter().collect()
}

/// The sole named child of an `expression_statement`, if it has exactly one.
fn sole_expression(node: Node<'_>) -> Option<Node<'_>> {
    if node.kind() != "expression_statement" || node.named_child_count() != 1 {
        return None;
    }
    node.named_child(0)
}

fn is_string_statement(node: Node<'_>) -> bool {
    sole_expression(node).is_some_and(|e| matches!(e.kind(), "string" | "concatenated_string"))
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Walks a parsed tree and builds declarations from it.
struct Extractor<'a> {
    src: &'a str,
    config: &'a ParseConfig,
}

impl<'a> Extractor<'a> {
    fn text(&self, node: Node<'_>) -> &'a str {
        &self.src[node.byte_range()]
    }

    /// Whitespace between the start of `node`'s line and `node`.
    fn line_indent(&self, node: Node<'_>) -> &'a str {
        let start = node.start_byte();
        let line_start = self.src[..start].rfind('\n').map_or(0, |i| i + 1);
        &self.src[line_start..start]
    }

    fn fragment(&self, root: Node<'_>, origin: &str) -> ParsedFragment {
        let mut fragment = ParsedFragment::new(origin);
        let mut pending: Vec<Node<'_>> = Vec::new();
        let mut first_statement = true;

        for child in named_children(root) {
            if child.kind() == "comment" {
                pending.push(child);
                continue;
            }

            if first_statement {
                first_statement = false;
                let docstring = is_string_statement(child);
                if let Some(last) = pending.last() {
                    let gap = child.start_position().row > last.end_position().row + 1;
                    let shebang = self.text(pending[0]).starts_with("#!");
                    if docstring || gap || shebang {
                        fragment.preamble = pending.drain(..).map(|c| self.text(c).to_owned()).collect();
                    }
                }
                if docstring {
                    fragment.push(Declaration::Documentation(self.text(child).to_owned()));
                    continue;
                }
            }

            let comments: Vec<&str> = pending.drain(..).map(|c| self.text(c)).collect();
            for declaration in self.classify(child, &comments) {
                fragment.push(declaration);
            }
        }

        if !pending.is_empty() {
            let trailing: Vec<&str> = pending.iter().map(|c| self.text(*c)).collect();
            fragment.push(Declaration::Unclassified(trailing.join("\n")));
        }
        fragment
    }

    /// Prefix `text` with its leading comments, one per line.
    fn with_comments(comments: &[&str], text: &str) -> String {
        if comments.is_empty() {
            return text.to_owned();
        }
        let mut out = comments.join("\n");
        out.push('\n');
        out.push_str(text);
        out
    }

    fn classify(&self, node: Node<'_>, comments: &[&str]) -> Vec<Declaration> {
        let verbatim = || Self::with_comments(comments, self.text(node));
        match node.kind() {
            "future_import_statement" => vec![Declaration::Environment(
                ReferenceDeclaration::grouped("__future__", 0, self.imported_names(node)),
            )],
            "import_statement" => self.module_references(node),
            "import_from_statement" => {
                let reference = self.grouped_reference(node);
                let environment = matches!(
                    &reference,
                    ReferenceDeclaration::Grouped { module, level: 0, .. }
                        if *module == self.config.environment_module
                );
                if environment {
                    vec![Declaration::Environment(reference)]
                } else {
                    vec![Declaration::Reference(reference)]
                }
            }
            "if_statement" => {
                let guarded = node
                    .child_by_field_name("condition")
                    .is_some_and(|c| self.config.is_guard(self.text(c)));
                if guarded {
                    vec![Declaration::Conditional(verbatim())]
                } else {
                    vec![Declaration::Unclassified(verbatim())]
                }
            }
            "class_definition" => vec![Declaration::Type(self.type_declaration(node, node, comments))],
            "function_definition" => {
                vec![Declaration::Callable(self.callable(node, node, comments))]
            }
            "decorated_definition" => match node.child_by_field_name("definition") {
                Some(def) if def.kind() == "class_definition" => {
                    vec![Declaration::Type(self.type_declaration(def, node, comments))]
                }
                Some(def) if def.kind() == "function_definition" => {
                    vec![Declaration::Callable(self.callable(def, node, comments))]
                }
                _ => vec![Declaration::Unclassified(verbatim())],
            },
            "type_alias_statement" => {
                let name = node
                    .child_by_field_name("left")
                    .map(|left| self.text(left).to_owned());
                vec![Declaration::Constant(Constant {
                    name,
                    text: verbatim(),
                })]
            }
            "expression_statement" => vec![self.expression_statement(node, comments)],
            _ => vec![Declaration::Unclassified(verbatim())],
        }
    }

    fn expression_statement(&self, node: Node<'_>, comments: &[&str]) -> Declaration {
        let verbatim = Self::with_comments(comments, self.text(node));
        let Some(expr) = sole_expression(node) else {
            return Declaration::Unclassified(verbatim);
        };
        let target = expr.child_by_field_name("left");
        let target_name = target
            .filter(|t| t.kind() == "identifier")
            .map(|t| self.text(t));

        match (expr.kind(), target_name) {
            ("assignment" | "augmented_assignment", Some("__all__")) => expr
                .child_by_field_name("right")
                .and_then(|value| self.string_list(value))
                .map_or(Declaration::Unclassified(verbatim), Declaration::Exports),
            ("assignment", name) => {
                Declaration::Constant(Constant {
                    name: name.map(str::to_owned),
                    text: verbatim,
                })
            }
            _ => Declaration::Unclassified(verbatim),
        }
    }

    /// `["a", "b"]` / `("a", "b")` → names. `None` if any element is not a
    /// plain string literal.
    fn string_list(&self, node: Node<'_>) -> Option<BTreeSet<String>> {
        if !matches!(node.kind(), "list" | "tuple") {
            return None;
        }
        named_children(node)
            .into_iter()
            .filter(|n| n.kind() != "comment")
            .map(|n| self.string_value(n))
            .collect()
    }

    /// Contents of a non-interpolated string literal.
    fn string_value(&self, node: Node<'_>) -> Option<String> {
        if node.kind() != "string" {
            return None;
        }
        let children = named_children(node);
        if children.iter().any(|c| c.kind() == "interpolation") {
            return None;
        }
        let start = children.iter().find(|c| c.kind() == "string_start")?;
        let end = children.iter().rev().find(|c| c.kind() == "string_end")?;
        Some(self.src[start.end_byte()..end.start_byte()].to_owned())
    }

    // -- references -------------------------------------------------------

    fn imported_names(&self, node: Node<'_>) -> Vec<ImportedName> {
        let mut names: Vec<ImportedName> = field_children(node, "name")
            .into_iter()
            .filter_map(|n| match n.kind() {
                "dotted_name" => Some(ImportedName::plain(self.text(n))),
                "aliased_import" => {
                    let name = n.child_by_field_name("name")?;
                    let alias = n.child_by_field_name("alias")?;
                    Some(ImportedName::aliased(self.text(name), self.text(alias)))
                }
                _ => None,
            })
            .collect();
        if named_children(node)
            .iter()
            .any(|c| c.kind() == "wildcard_import")
        {
            names.push(ImportedName::plain("*"));
        }
        names
    }

    fn module_references(&self, node: Node<'_>) -> Vec<Declaration> {
        self.imported_names(node)
            .into_iter()
            .map(|n| Declaration::Reference(ReferenceDeclaration::module(n.name, n.alias)))
            .collect()
    }

    fn grouped_reference(&self, node: Node<'_>) -> ReferenceDeclaration {
        let (module, level) = match node.child_by_field_name("module_name") {
            Some(m) if m.kind() == "relative_import" => {
                let children = named_children(m);
                let level = children
                    .iter()
                    .find(|c| c.kind() == "import_prefix")
                    .map_or(0, |p| self.text(*p).matches('.').count());
                let module = children
                    .iter()
                    .find(|c| c.kind() == "dotted_name")
                    .map_or("", |d| self.text(*d));
                (module.to_owned(), level)
            }
            Some(m) => (self.text(m).to_owned(), 0),
            None => (String::new(), 0),
        };
        ReferenceDeclaration::grouped(module, level, self.imported_names(node))
    }

    // -- callables --------------------------------------------------------

    fn decorators(&self, outer: Node<'_>) -> Vec<String> {
        if outer.kind() != "decorated_definition" {
            return Vec::new();
        }
        named_children(outer)
            .into_iter()
            .filter(|c| c.kind() == "decorator")
            .map(|c| self.text(c).to_owned())
            .collect()
    }

    /// `def` → [`CallableDeclaration`]. `outer` is the decorated wrapper when
    /// there is one, otherwise `def` itself.
    fn callable(&self, def: Node<'_>, outer: Node<'_>, comments: &[&str]) -> CallableDeclaration {
        let name = def
            .child_by_field_name("name")
            .map(|n| self.text(n).to_owned())
            .unwrap_or_default();

        let parameter_type_references = def
            .child_by_field_name("parameters")
            .map(|params| {
                named_children(params)
                    .into_iter()
                    .filter(|p| matches!(p.kind(), "typed_parameter" | "typed_default_parameter"))
                    .filter_map(|p| p.child_by_field_name("type"))
                    .map(|t| self.type_ref(t))
                    .collect()
            })
            .unwrap_or_default();

        CallableDeclaration {
            name,
            attached_modifiers: self.decorators(outer),
            parameter_type_references,
            return_type_reference: def
                .child_by_field_name("return_type")
                .map(|t| self.type_ref(t)),
            body: def
                .child_by_field_name("body")
                .map(|b| self.text(b).to_owned())
                .unwrap_or_default(),
            source: Self::with_comments(comments, self.text(outer)),
        }
    }

    // -- types ------------------------------------------------------------

    fn type_declaration(
        &self,
        def: Node<'_>,
        outer: Node<'_>,
        comments: &[&str],
    ) -> TypeDeclaration {
        let name = def
            .child_by_field_name("name")
            .map(|n| self.text(n).to_owned())
            .unwrap_or_default();

        let mut bases = Vec::new();
        let mut base_types = Vec::new();
        if let Some(args) = def.child_by_field_name("superclasses") {
            for arg in named_children(args) {
                if arg.kind() == "comment" {
                    continue;
                }
                bases.push(self.text(arg).to_owned());
                let expr = if arg.kind() == "keyword_argument" {
                    arg.child_by_field_name("value")
                } else {
                    Some(arg)
                };
                if let Some(expr) = expr {
                    base_types.push(self.type_ref(expr));
                }
            }
        }

        let body = def.child_by_field_name("body");
        let (header, indent, members) = match body {
            Some(body) => {
                // Comments between the colon and the first body statement are
                // children of the class, not of its body.
                let children: Vec<Node<'_>> = {
                    let mut cursor = def.walk();
                    def.children(&mut cursor).collect()
                };
                let header_end = children
                    .iter()
                    .filter(|c| c.kind() == ":")
                    .map(Node::end_byte)
                    .last()
                    .unwrap_or_else(|| body.start_byte());
                let header = self.src[def.start_byte()..header_end].trim_end();
                let body_comments: Vec<&str> = children
                    .iter()
                    .filter(|c| c.kind() == "comment" && c.start_byte() >= header_end)
                    .map(|c| self.text(*c))
                    .collect();
                let prefix = self.line_indent(body);
                let indent = if prefix.chars().all(char::is_whitespace) && !prefix.is_empty() {
                    prefix.to_owned()
                } else {
                    format!("{}    ", self.line_indent(def))
                };
                let members = self.members(body, body_comments, &indent);
                (header.to_owned(), indent, members)
            }
            None => (self.text(def).to_owned(), "    ".to_owned(), Vec::new()),
        };

        // Comments between the decorators and `class` belong to the wrapper.
        let modifier_comments = if outer.kind() == "decorated_definition" {
            named_children(outer)
                .into_iter()
                .filter(|c| c.kind() == "comment" && c.end_byte() <= def.start_byte())
                .map(|c| self.text(c).to_owned())
                .collect()
        } else {
            Vec::new()
        };

        TypeDeclaration {
            name,
            leading_comments: comments.iter().map(|c| (*c).to_owned()).collect(),
            attached_modifiers: self.decorators(outer),
            modifier_comments,
            bases,
            base_types,
            header,
            members,
            indent,
            source: Some(Self::with_comments(comments, self.text(outer))),
        }
    }

    fn members(&self, body: Node<'_>, mut pending: Vec<&'a str>, indent: &str) -> Vec<Member> {
        let mut members = Vec::new();
        let mut first = true;

        for stmt in named_children(body) {
            if stmt.kind() == "comment" {
                pending.push(self.text(stmt));
                continue;
            }
            let (key, kind) = self.member_identity(stmt, first);
            first = false;
            let literal_lines = literal_rows(stmt)
                .into_iter()
                .map(|row| row + pending.len())
                .collect();
            let mut text = String::new();
            for comment in pending.drain(..) {
                text.push_str(comment);
                text.push('\n');
                text.push_str(indent);
            }
            text.push_str(self.text(stmt));
            members.push(Member {
                key,
                kind,
                text,
                column: stmt.start_position().column,
                literal_lines,
            });
        }

        if !pending.is_empty() {
            members.push(Member {
                key: None,
                kind: MemberKind::Other,
                text: pending.join(&format!("\n{indent}")),
                column: indent.len(),
                literal_lines: Vec::new(),
            });
        }
        members
    }

    /// Merge key and category of one class-body statement. `first` is true
    /// for the first non-comment statement of the body.
    fn member_identity(&self, stmt: Node<'_>, first: bool) -> (Option<String>, MemberKind) {
        match stmt.kind() {
            "expression_statement" if first && is_string_statement(stmt) => {
                (None, MemberKind::Docstring)
            }
            "function_definition" => {
                let callable = self.callable(stmt, stmt, &[]);
                (Some(callable.name.clone()), MemberKind::Method(callable))
            }
            "class_definition" => (
                stmt.child_by_field_name("name")
                    .map(|n| self.text(n).to_owned()),
                MemberKind::NestedType,
            ),
            "decorated_definition" => match stmt.child_by_field_name("definition") {
                Some(def) if def.kind() == "function_definition" => {
                    let callable = self.callable(def, stmt, &[]);
                    let key = method_key(&callable);
                    (key, MemberKind::Method(callable))
                }
                Some(def) => (
                    def.child_by_field_name("name")
                        .map(|n| self.text(n).to_owned()),
                    MemberKind::NestedType,
                ),
                None => (None, MemberKind::Other),
            },
            "pass_statement" => (None, MemberKind::Pass),
            "expression_statement" => match sole_expression(stmt) {
                Some(expr) if expr.kind() == "assignment" => {
                    let key = expr
                        .child_by_field_name("left")
                        .filter(|l| l.kind() == "identifier")
                        .map(|l| self.text(l).to_owned());
                    let annotation = expr.child_by_field_name("type").map(|t| self.type_ref(t));
                    (key, MemberKind::Field { annotation })
                }
                _ => (None, MemberKind::Other),
            },
            _ => (None, MemberKind::Other),
        }
    }

    // -- type references --------------------------------------------------

    fn type_ref(&self, node: Node<'_>) -> TypeRef {
        match node.kind() {
            "type" | "parenthesized_expression" if node.named_child_count() == 1 => node
                .named_child(0)
                .map_or_else(|| TypeRef::Opaque(self.text(node).to_owned()), |inner| self.type_ref(inner)),
            "identifier" => TypeRef::Name(self.text(node).to_owned()),
            "attribute" | "member_type" => {
                TypeRef::Name(self.text(node).split_whitespace().collect())
            }
            "subscript" => {
                let base = node
                    .child_by_field_name("value")
                    .map_or_else(|| TypeRef::Opaque(String::new()), |v| self.type_ref(v));
                let args = field_children(node, "subscript")
                    .into_iter()
                    .map(|a| self.type_ref(a))
                    .collect();
                TypeRef::Generic {
                    base: Box::new(base),
                    args,
                }
            }
            "generic_type" => {
                let children = named_children(node);
                let base = children
                    .first()
                    .map_or_else(|| TypeRef::Opaque(String::new()), |b| self.type_ref(*b));
                let args = children
                    .iter()
                    .skip(1)
                    .flat_map(|params| named_children(*params))
                    .map(|a| self.type_ref(a))
                    .collect();
                TypeRef::Generic {
                    base: Box::new(base),
                    args,
                }
            }
            "union_type" => TypeRef::union(named_children(node).into_iter().map(|c| self.type_ref(c))),
            "binary_operator"
                if node
                    .child_by_field_name("operator")
                    .is_some_and(|op| op.kind() == "|") =>
            {
                let sides = ["left", "right"]
                    .into_iter()
                    .filter_map(|f| node.child_by_field_name(f))
                    .map(|c| self.type_ref(c));
                TypeRef::union(sides)
            }
            "list" | "tuple" | "expression_list" | "type_parameter" | "splat_type"
            | "constrained_type" | "parenthesized_expression" => TypeRef::Group(
                named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() != "comment")
                    .map(|c| self.type_ref(c))
                    .collect(),
            ),
            "string" => self.string_value(node).map_or_else(
                || TypeRef::Opaque(self.text(node).to_owned()),
                |quoted| forward_ref(&quoted, self.config),
            ),
            _ => TypeRef::Opaque(self.text(node).to_owned()),
        }
    }
}

/// Parse the contents of a quoted annotation as a type expression.
fn forward_ref(quoted: &str, config: &ParseConfig) -> TypeRef {
    let opaque = || TypeRef::Opaque(quoted.to_owned());
    let Ok(Some(tree)) = parse_tree(quoted) else {
        return opaque();
    };
    let root = tree.root_node();
    if root.has_error() {
        return opaque();
    }
    let extractor = Extractor {
        src: quoted,
        config,
    };
    root.named_child(0)
        .and_then(sole_expression)
        .map_or_else(opaque, |expr| {
            TypeRef::Forward(Box::new(extractor.type_ref(expr)))
        })
}

/// Merge key of a method. Property accessors are keyed `name.setter` /
/// `name.deleter` so they never collide with the getter; `@overload` stubs
/// have no key and are compared by text.
fn method_key(callable: &CallableDeclaration) -> Option<String> {
    for decorator in &callable.attached_modifiers {
        let target = decorator.trim_start_matches('@').trim();
        if matches!(target, "overload" | "typing.overload") {
            return None;
        }
        if let Some((prop, accessor)) = target.rsplit_once('.')
            && matches!(accessor, "setter" | "deleter" | "getter")
            && !prop.contains('(')
        {
            return Some(format!("{}.{accessor}", callable.name));
        }
    }
    Some(callable.name.clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> ParsedFragment {
        parse_fragment(src, "test.py").unwrap()
    }

    // -- fences -----------------------------------------------------------

    #[test]
    fn strips_surrounding_fence() {
        assert_eq!(strip_code_fences("```python\nx = 1\n```\n"), "x = 1\n");
        assert_eq!(strip_code_fences("```\nx = 1\n```"), "x = 1\n");
        assert_eq!(strip_code_fences("```py\nx = 1\n"), "x = 1\n");
    }

    #[test]
    fn leaves_unfenced_source_alone() {
        let src = "def f():\n    \"\"\"Use ```code``` here.\"\"\"\n";
        assert_eq!(strip_code_fences(src), src);
    }

    #[test]
    fn fenced_fragment_parses() {
        let f = parse("```python\nclass A:\n    pass\n```\n");
        assert!(f.type_declarations.contains_key("A"));
    }

    // -- syntax errors ----------------------------------------------------

    #[test]
    fn invalid_source_is_a_syntax_error() {
        let err = parse_fragment("def broken(:\n    return\n", "bad.py").unwrap_err();
        match err {
            MergeError::Syntax { origin, message } => {
                assert_eq!(origin, "bad.py");
                assert!(message.contains("line 1"), "got: {message}");
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn empty_source_is_empty_fragment() {
        assert!(parse("").is_empty());
    }

    // -- buckets ----------------------------------------------------------

    #[test]
    fn classifies_every_top_level_statement() {
        let src = r#"#!/usr/bin/env python
"""Module docs."""
from __future__ import annotations

import os
import numpy as np, sys
from typing import TYPE_CHECKING, Optional
from . import siblings

if TYPE_CHECKING:
    from .models import Role

MAX = 3
type Alias = list[int]


@dataclass
class Message(Base):
    role: "Role"


def helper(x: int) -> Optional[Message]:
    return None


__all__ = ["Message", "helper"]

print("hello")
"#;
        let f = parse(src);
        assert_eq!(f.preamble, vec!["#!/usr/bin/env python"]);
        assert_eq!(f.documentation.as_deref(), Some("\"\"\"Module docs.\"\"\""));
        assert_eq!(
            f.environment_declarations,
            vec![ReferenceDeclaration::grouped(
                "__future__",
                0,
                [ImportedName::plain("annotations")]
            )]
        );
        assert_eq!(
            f.references,
            vec![
                ReferenceDeclaration::module("os", None),
                ReferenceDeclaration::module("numpy", Some("np".to_owned())),
                ReferenceDeclaration::module("sys", None),
                ReferenceDeclaration::grouped(
                    "typing",
                    0,
                    [
                        ImportedName::plain("TYPE_CHECKING"),
                        ImportedName::plain("Optional")
                    ]
                ),
                ReferenceDeclaration::grouped("", 1, [ImportedName::plain("siblings")]),
            ]
        );
        assert_eq!(f.conditional_blocks.len(), 1);
        assert!(f.conditional_blocks[0].starts_with("if TYPE_CHECKING:"));
        let constants: Vec<_> = f.constants.iter().map(|c| c.name.as_deref()).collect();
        assert_eq!(constants, vec![Some("MAX"), Some("Alias")]);
        assert_eq!(f.type_declarations.len(), 1);
        assert_eq!(f.callable_declarations.len(), 1);
        let exports: Vec<_> = f.export_list.iter().flatten().cloned().collect();
        assert_eq!(exports, vec!["Message", "helper"]);
        assert_eq!(f.unclassified, vec!["print(\"hello\")"]);
    }

    #[test]
    fn docstring_only_counts_as_first_statement() {
        let f = parse("x = 1\n\"\"\"Not docs.\"\"\"\n");
        assert!(f.documentation.is_none());
        assert_eq!(f.unclassified.len(), 1);
    }

    #[test]
    fn future_import_is_environment_wherever_it_appears() {
        let f = parse("import os\nfrom __future__ import annotations\n");
        assert_eq!(f.environment_declarations.len(), 1);
        assert_eq!(f.references.len(), 1);
    }

    #[test]
    fn future_import_keeps_its_module_with_custom_environment() {
        let config = ParseConfig {
            environment_module: "__compat__".to_owned(),
            ..ParseConfig::default()
        };
        let src = "from __future__ import annotations\nfrom __compat__ import shim\nimport os\n";
        let f = parse_fragment_with_config(src, "a.py", &config).unwrap();
        assert_eq!(
            f.environment_declarations,
            vec![
                ReferenceDeclaration::grouped("__future__", 0, [ImportedName::plain("annotations")]),
                ReferenceDeclaration::grouped("__compat__", 0, [ImportedName::plain("shim")]),
            ]
        );
        assert_eq!(f.references, vec![ReferenceDeclaration::module("os", None)]);
    }

    #[test]
    fn attribute_guard_is_conditional() {
        let f = parse("import typing\nif typing.TYPE_CHECKING:\n    import os\n");
        assert_eq!(f.conditional_blocks, vec!["if typing.TYPE_CHECKING:\n    import os"]);
    }

    #[test]
    fn ordinary_if_is_unclassified() {
        let f = parse("if DEBUG:\n    x = 1\n");
        assert!(f.conditional_blocks.is_empty());
        assert_eq!(f.unclassified.len(), 1);
    }

    #[test]
    fn wildcard_and_relative_imports() {
        let f = parse("from ..pkg.mod import *\n");
        assert_eq!(
            f.references,
            vec![ReferenceDeclaration::grouped("pkg.mod", 2, [ImportedName::plain("*")])]
        );
    }

    #[test]
    fn non_literal_all_is_unclassified() {
        let f = parse("__all__ = names()\n");
        assert!(f.export_list.is_none());
        assert_eq!(f.unclassified, vec!["__all__ = names()"]);
    }

    #[test]
    fn augmented_all_extends_exports() {
        let f = parse("__all__ = ['a']\n__all__ += ('b',)\n");
        let exports: Vec<_> = f.export_list.iter().flatten().cloned().collect();
        assert_eq!(exports, vec!["a", "b"]);
    }

    #[test]
    fn comments_attach_to_following_statement() {
        let f = parse("import os\n# the answer\nANSWER = 42\n# trailing\n");
        assert_eq!(f.constants[0].text, "# the answer\nANSWER = 42");
        assert_eq!(f.unclassified, vec!["# trailing"]);
    }

    // -- types ------------------------------------------------------------

    #[test]
    fn decorated_class_keeps_modifiers_and_bases() {
        let src = "@dataclass(frozen=True)\n@register\nclass Foo(Base, Generic[T], metaclass=Meta):\n    x: int = 0\n";
        let f = parse(src);
        let foo = &f.type_declarations["Foo"];
        assert_eq!(foo.attached_modifiers, vec!["@dataclass(frozen=True)", "@register"]);
        assert_eq!(foo.bases, vec!["Base", "Generic[T]", "metaclass=Meta"]);
        assert_eq!(foo.header, "class Foo(Base, Generic[T], metaclass=Meta):");
        assert_eq!(foo.indent, "    ");
        assert_eq!(foo.source.as_deref(), Some(src.trim_end()));
        let base_names: Vec<_> = foo.base_types.iter().flat_map(TypeRef::names).collect();
        assert_eq!(base_names, vec!["Base", "Generic", "T", "Meta"]);
    }

    #[test]
    fn comment_between_decorator_and_class_is_kept() {
        let f = parse("@dataclass\n# note\nclass Foo:\n    a: int = 0\n");
        let foo = &f.type_declarations["Foo"];
        assert_eq!(foo.attached_modifiers, vec!["@dataclass"]);
        assert_eq!(foo.modifier_comments, vec!["# note"]);
        assert!(foo.leading_comments.is_empty());
    }

    #[test]
    fn string_continuation_lines_are_recorded() {
        let src = "class Foo:\n    # doc\n    text: str = \"\"\"a\n  b\n\"\"\"\n    n: int = 0\n";
        let f = parse(src);
        let foo = &f.type_declarations["Foo"];
        assert_eq!(foo.members[0].literal_lines, vec![2, 3]);
        assert!(foo.members[1].literal_lines.is_empty());
    }

    #[test]
    fn class_members_are_keyed() {
        let src = r#"class Foo:
    """Docs."""

    # counter
    count: int = 0
    label = "x"

    def bar(self, other: "Foo") -> None:
        pass

    @property
    def size(self) -> int:
        return 1

    @size.setter
    def size(self, value: int) -> None:
        pass

    @overload
    def get(self, key: int) -> int: ...

    class Meta:
        ordering = 1

    pass
"#;
        let f = parse(src);
        let foo = &f.type_declarations["Foo"];
        let keys: Vec<_> = foo.members.iter().map(|m| m.key.as_deref()).collect();
        assert_eq!(
            keys,
            vec![
                None,
                Some("count"),
                Some("label"),
                Some("bar"),
                Some("size"),
                Some("size.setter"),
                None,
                Some("Meta"),
                None
            ]
        );
        assert!(matches!(foo.members[0].kind, MemberKind::Docstring));
        assert_eq!(foo.members[1].text, "# counter\n    count: int = 0");
        assert!(matches!(foo.members[8].kind, MemberKind::Pass));
        let annotated: Vec<_> = foo.annotated_fields().map(|(m, _)| m.key.clone()).collect();
        assert_eq!(annotated, vec![Some("count".to_owned())]);
    }

    #[test]
    fn one_line_class_gets_default_indent() {
        let f = parse("class Empty: pass\n");
        let empty = &f.type_declarations["Empty"];
        assert_eq!(empty.header, "class Empty:");
        assert_eq!(empty.indent, "    ");
        assert_eq!(empty.members.len(), 1);
    }

    // -- callables --------------------------------------------------------

    #[test]
    fn callable_signature_types() {
        let src = "@app.route('/')\nasync def handle(req: Request, *, limit: int = 10, **kw) -> list[Response]:\n    return []\n";
        let f = parse(src);
        let handle = &f.callable_declarations["handle"];
        assert_eq!(handle.attached_modifiers, vec!["@app.route('/')"]);
        let params: Vec<_> = handle
            .parameter_type_references
            .iter()
            .flat_map(TypeRef::names)
            .collect();
        assert_eq!(params, vec!["Request", "int"]);
        let ret = handle.return_type_reference.as_ref().unwrap().names();
        assert_eq!(ret, vec!["list", "Response"]);
        assert_eq!(handle.source, src.trim_end());
        assert_eq!(handle.body, "return []");
    }

    // -- type references --------------------------------------------------

    fn field_type(src: &str) -> TypeRef {
        let f = parse(src);
        let decl = f.type_declarations.values().next().unwrap();
        decl.annotated_fields().next().unwrap().1.clone()
    }

    #[test]
    fn forward_reference_is_parsed() {
        let ty = field_type("class A:\n    b: \"Optional[B]\"\n");
        assert!(matches!(ty, TypeRef::Forward(_)));
        assert_eq!(ty.names(), vec!["Optional", "B"]);
    }

    #[test]
    fn union_and_nested_generics() {
        let ty = field_type("class A:\n    b: dict[str, list[B]] | C | None\n");
        assert_eq!(ty.names(), vec!["dict", "str", "list", "B", "C"]);
    }

    #[test]
    fn callable_parameter_group() {
        let ty = field_type("class A:\n    cb: Callable[[B, int], C]\n");
        assert_eq!(ty.names(), vec!["Callable", "B", "int", "C"]);
    }

    #[test]
    fn dotted_annotation_is_one_name() {
        let ty = field_type("class A:\n    b: models.B\n");
        assert_eq!(ty.names(), vec!["models.B"]);
    }

    #[test]
    fn method_key_for_accessors() {
        let mut c = CallableDeclaration {
            name: "size".to_owned(),
            attached_modifiers: vec!["@size.deleter".to_owned()],
            parameter_type_references: Vec::new(),
            return_type_reference: None,
            body: String::new(),
            source: String::new(),
        };
        assert_eq!(method_key(&c).as_deref(), Some("size.deleter"));
        c.attached_modifiers = vec!["@typing.overload".to_owned()];
        assert_eq!(method_key(&c), None);
        c.attached_modifiers = vec!["@staticmethod".to_owned()];
        assert_eq!(method_key(&c).as_deref(), Some("size"));
    }
}
