//! Python language extractor using tree-sitter

use crate::extractor::{Extraction, header_text, node_text};
use crate::parser_pool::{self, Grammar};
use sapwood_core::{EntityDetail, ParsedFile, RelationKind, SourceParser, TypeKind};
use std::path::Path;
use tree_sitter::Node;

pub struct PythonParser;

impl SourceParser for PythonParser {
    fn parse(&self, path: &Path, source: &str) -> Option<ParsedFile> {
        let tree = match parser_pool::parse(Grammar::Python, source) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                return None;
            }
        };
        let mut extraction = Extraction::new(path, source);
        let file_id = extraction.file_id().to_string();
        visit_block(&mut extraction, tree.root_node(), &file_id, None);
        Some(extraction.finish())
    }
}

/// Definitions directly under `block`. `class_name` is set inside a class body.
fn visit_block(ex: &mut Extraction<'_>, block: Node, scope: &str, class_name: Option<&str>) {
    let mut cursor = block.walk();
    let children: Vec<Node> = block.named_children(&mut cursor).collect();
    for node in children {
        let definition = if node.kind() == "decorated_definition" {
            match node.child_by_field_name("definition") {
                Some(definition) => definition,
                None => continue,
            }
        } else {
            node
        };
        match definition.kind() {
            "function_definition" => extract_function(ex, definition, node, scope, class_name),
            "class_definition" => extract_class(ex, definition, node, scope),
            "import_statement" | "import_from_statement" if class_name.is_none() => extract_imports(ex, definition),
            _ => {}
        }
    }
}

/// `outer` is the decorated wrapper when present, so entity content
/// includes the decorators.
fn extract_function(ex: &mut Extraction<'_>, node: Node, outer: Node, scope: &str, class_name: Option<&str>) {
    let source = ex.source();
    let Some(name) = node.child_by_field_name("name").map(|n| node_text(n, source)) else {
        return;
    };
    let body = node.child_by_field_name("body");
    let signature = header_text(node, body, source).trim_end_matches(':').trim().to_string();
    let is_async = signature.starts_with("async ");
    let (id, detail) = match class_name {
        Some(owner) => (
            ex.child_id(scope, name),
            EntityDetail::Method {
                owner: owner.to_string(),
                signature: Some(signature),
                is_async,
            },
        ),
        None => (
            ex.child_id(scope, name),
            EntityDetail::Function {
                signature: Some(signature),
                is_async,
            },
        ),
    };
    let docstring = body.and_then(|b| docstring(b, source));
    let id = ex.add_item(scope, id, name, detail, outer, docstring);
    if let Some(body) = body {
        collect_calls(ex, &id, body);
    }
}

fn extract_class(ex: &mut Extraction<'_>, node: Node, outer: Node, scope: &str) {
    let source = ex.source();
    let Some(name) = node.child_by_field_name("name").map(|n| node_text(n, source)) else {
        return;
    };
    let body = node.child_by_field_name("body");
    let fields = body.map(|b| class_attributes(b, source)).unwrap_or_default();
    let id = ex.child_id(scope, name);
    let id = ex.add_item(
        scope,
        id,
        name,
        EntityDetail::Type {
            type_kind: TypeKind::Class,
            fields,
        },
        outer,
        body.and_then(|b| docstring(b, source)),
    );

    if let Some(bases) = node.child_by_field_name("superclasses") {
        let mut cursor = bases.walk();
        let bases: Vec<Node> = bases.named_children(&mut cursor).collect();
        for base in bases {
            if let Some(base_name) = simple_name(base, source) {
                if base_name != "object" {
                    ex.reference(&id, &base_name, RelationKind::Extends);
                }
            }
        }
    }
    if let Some(body) = body {
        visit_block(ex, body, &id, Some(name));
    }
}

fn extract_imports(ex: &mut Extraction<'_>, node: Node) {
    let source = ex.source();
    let file_id = ex.file_id().to_string();
    let mut cursor = node.walk();
    let names: Vec<Node> = if node.kind() == "import_from_statement" {
        node.children_by_field_name("name", &mut cursor).collect()
    } else {
        node.named_children(&mut cursor).collect()
    };
    for imported in names {
        let target = match imported.kind() {
            "aliased_import" => imported.child_by_field_name("name"),
            "dotted_name" => Some(imported),
            _ => None,
        };
        if let Some(target) = target {
            ex.reference(&file_id, node_text(target, source), RelationKind::Imports);
        }
    }
}

fn collect_calls(ex: &mut Extraction<'_>, source_id: &str, body: Node) {
    let source = ex.source();
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if node.kind() == "call" {
            if let Some(callee) = node.child_by_field_name("function").and_then(|f| simple_name(f, source)) {
                ex.reference(source_id, &callee, RelationKind::Calls);
            }
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
}

/// `foo` for `foo`, `self.foo` and `pkg.mod.foo`.
fn simple_name(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "identifier" => Some(node_text(node, source).to_string()),
        "attribute" => node
            .child_by_field_name("attribute")
            .map(|a| node_text(a, source).to_string()),
        _ => None,
    }
}

/// Names assigned at class level (`x = 1`, `y: int`).
fn class_attributes(body: Node, source: &str) -> Vec<String> {
    let mut cursor = body.walk();
    body.named_children(&mut cursor)
        .filter(|statement| statement.kind() == "expression_statement")
        .filter_map(|statement| statement.named_child(0))
        .filter(|expr| expr.kind() == "assignment")
        .filter_map(|assignment| assignment.child_by_field_name("left"))
        .filter(|left| left.kind() == "identifier")
        .map(|left| node_text(left, source).to_string())
        .collect()
}

/// First statement of `body` when it is a string literal.
fn docstring(body: Node, source: &str) -> Option<String> {
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let literal = first.named_child(0).filter(|n| n.kind() == "string")?;
    Some(strip_quotes(node_text(literal, source)))
}

fn strip_quotes(literal: &str) -> String {
    let unprefixed = literal.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let inner = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|q| unprefixed.strip_prefix(q).and_then(|s| s.strip_suffix(q)))
        .unwrap_or(unprefixed);
    inner.trim().to_string()
}
