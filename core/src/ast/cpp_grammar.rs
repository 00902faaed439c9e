//! Built-in front-end on the tree-sitter C++ grammar.
//!
//! Needs no external binary and never sees the preprocessor, so macros are
//! parsed as written and compiler flags are ignored. Kinds are decided from
//! syntax alone: a qualified out-of-line definition is always reported as a
//! method, even when the qualifier is a namespace.

use super::{DeclKind, DeclNode, FrontendError, ParseOptions, SourceFrontend};
use std::path::Path;
use tree_sitter::{Node, Parser};

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterFrontend;

impl SourceFrontend for TreeSitterFrontend {
    fn parse(&self, path: &Path, _options: &ParseOptions) -> Result<DeclNode, FrontendError> {
        let bytes = std::fs::read(path)?;
        let source = String::from_utf8_lossy(&bytes);
        let children = extract_decls(&source).ok_or_else(|| FrontendError::Unparsed(path.to_path_buf()))?;
        Ok(DeclNode::root(path.display().to_string(), children))
    }
}

/// Parse C++ source into its declaration tree.
pub fn extract_decls(source: &str) -> Option<Vec<DeclNode>> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_cpp::LANGUAGE.into()).ok()?;
    let tree = parser.parse(source, None)?;

    let mut decls = Vec::new();
    collect(tree.root_node(), source, None, &mut decls);
    Some(decls)
}

/// Walk the named children of `node`. `class` is the name of the enclosing
/// class body, if any.
fn collect(node: Node, source: &str, class: Option<&str>, out: &mut Vec<DeclNode>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match cpp_node_to_decl(child, source, class) {
            Some(mut decl) => {
                let inner_class = match decl.kind {
                    Some(DeclKind::Class | DeclKind::Struct) => Some(decl.name.clone()),
                    _ => None,
                };
                collect(child, source, inner_class.as_deref(), &mut decl.children);
                out.push(decl);
            }
            None => collect(child, source, class, out),
        }
    }
}

fn cpp_node_to_decl(node: Node, source: &str, class: Option<&str>) -> Option<DeclNode> {
    match node.kind() {
        "function_definition" => {
            let declarator = node.child_by_field_name("declarator")?;
            let name = find_function_declarator_name(declarator, source)?;
            Some(name.into_decl(class))
        }
        "declaration" | "field_declaration" => {
            // Prototypes only; variables and members are not reported.
            let mut cursor = node.walk();
            let name = node
                .children_by_field_name("declarator", &mut cursor)
                .find_map(|d| find_function_declarator_name(d, source))?;
            Some(name.into_decl(class))
        }
        "class_specifier" | "struct_specifier" | "enum_specifier" => {
            node.child_by_field_name("body")?;
            let name_node = node.child_by_field_name("name")?;
            let kind = match node.kind() {
                "class_specifier" => DeclKind::Class,
                "struct_specifier" => DeclKind::Struct,
                _ => DeclKind::Enum,
            };
            Some(DeclNode {
                name: type_name(name_node, source)?.to_owned(),
                kind: Some(kind),
                line: line_of(name_node),
                children: vec![],
            })
        }
        _ => None,
    }
}

/// A function's declared name plus the qualifier it was written with.
struct FunctionName {
    name: String,
    scope: Option<String>,
    line: u32,
}

impl FunctionName {
    fn into_decl(self, class: Option<&str>) -> DeclNode {
        let kind = match (&self.scope, class) {
            (Some(scope), _) => {
                let owner = scope.rsplit("::").next().unwrap_or(scope);
                let owner = owner.split('<').next().unwrap_or(owner);
                if owner == self.name {
                    DeclKind::Constructor
                } else {
                    DeclKind::Method
                }
            }
            (None, Some(class)) if class == self.name => DeclKind::Constructor,
            (None, Some(_)) => DeclKind::Method,
            (None, None) => DeclKind::Function,
        };
        DeclNode {
            name: self.name,
            kind: Some(kind),
            line: self.line,
            children: vec![],
        }
    }
}

/// Extract the function name from a C++ function declarator (may be nested
/// in pointer or reference declarators).
fn find_function_declarator_name(node: Node, source: &str) -> Option<FunctionName> {
    match node.kind() {
        "function_declarator" => declared_name(node.child_by_field_name("declarator")?, source, None),
        "pointer_declarator" | "reference_declarator" => {
            let mut cursor = node.walk();
            let inner = node
                .named_children(&mut cursor)
                .find(|c| c.kind().ends_with("declarator"))?;
            find_function_declarator_name(inner, source)
        }
        _ => None,
    }
}

/// Destructors and operators have no plain identifier and yield `None`.
fn declared_name(node: Node, source: &str, scope: Option<String>) -> Option<FunctionName> {
    match node.kind() {
        "identifier" | "field_identifier" => Some(FunctionName {
            name: node_text(node, source).to_owned(),
            scope,
            line: line_of(node),
        }),
        "qualified_identifier" => {
            let inner_scope = node
                .child_by_field_name("scope")
                .map(|s| node_text(s, source).to_owned());
            declared_name(node.child_by_field_name("name")?, source, inner_scope.or(scope))
        }
        "template_function" => declared_name(node.child_by_field_name("name")?, source, scope),
        _ => None,
    }
}

fn type_name<'a>(node: Node<'a>, source: &'a str) -> Option<&'a str> {
    match node.kind() {
        "qualified_identifier" | "template_type" => type_name(node.child_by_field_name("name")?, source),
        _ => Some(node_text(node, source)),
    }
}

/// Get the text content of a node.
fn node_text<'a>(node: Node<'a>, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

fn line_of(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}
