//! Rust language extractor using tree-sitter

use crate::extractor::{Extraction, header_text, node_text};
use crate::parser_pool::{self, Grammar};
use sapwood_core::{EntityDetail, ParsedFile, RelationKind, SourceParser, TypeKind};
use std::collections::HashMap;
use std::path::Path;
use tree_sitter::Node;

pub struct RustParser;

impl SourceParser for RustParser {
    fn parse(&self, path: &Path, source: &str) -> Option<ParsedFile> {
        let tree = match parser_pool::parse(Grammar::Rust, source) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                return None;
            }
        };
        let mut extraction = Extraction::new(path, source);
        let file_id = extraction.file_id().to_string();
        let mut visitor = Visitor {
            ex: &mut extraction,
            types: HashMap::new(),
        };
        visitor.visit_items(tree.root_node(), &file_id);
        Some(extraction.finish())
    }
}

struct Visitor<'a, 's> {
    ex: &'a mut Extraction<'s>,
    /// `scope::Name` -> final id of types and traits defined in this file.
    types: HashMap<String, String>,
}

impl<'s> Visitor<'_, 's> {
    /// Items directly under `parent`. `scope` is both the id prefix and the
    /// containing entity. Impl blocks go last so their types are known.
    fn visit_items(&mut self, parent: Node, scope: &str) {
        let mut cursor = parent.walk();
        let children: Vec<Node> = parent.named_children(&mut cursor).collect();
        for &node in &children {
            match node.kind() {
                "function_item" => self.function(node, scope, scope, None),
                "struct_item" | "enum_item" | "union_item" => self.type_def(node, scope),
                "trait_item" => self.trait_def(node, scope),
                "type_item" => self.alias(node, scope),
                "const_item" | "static_item" => self.constant(node, scope),
                "mod_item" => self.module(node, scope),
                "use_declaration" => self.imports(node),
                _ => {}
            }
        }
        for &node in &children {
            if node.kind() == "impl_item" {
                self.impl_block(node, scope);
            }
        }
    }

    fn name_of(&self, node: Node) -> Option<&'s str> {
        node.child_by_field_name("name")
            .map(|n| node_text(n, self.ex.source()))
            .filter(|n| !n.is_empty())
    }

    /// Function or method. `owner` is the impl or trait type for methods.
    fn function(&mut self, node: Node, scope: &str, container: &str, owner: Option<&str>) {
        let source = self.ex.source();
        let Some(name) = self.name_of(node) else {
            return;
        };
        let body = node.child_by_field_name("body");
        let signature = header_text(node, body, source).trim_end_matches(';').trim().to_string();
        let is_async = signature
            .split_whitespace()
            .take_while(|w| *w != "fn")
            .any(|w| w == "async");
        let (id, detail) = match owner {
            Some(owner) => (
                self.ex.child_id(scope, &format!("{}::{}", owner, name)),
                EntityDetail::Method {
                    owner: owner.to_string(),
                    signature: Some(signature),
                    is_async,
                },
            ),
            None => (
                self.ex.child_id(scope, name),
                EntityDetail::Function {
                    signature: Some(signature),
                    is_async,
                },
            ),
        };
        let id = self.ex.add_item(container, id, name, detail, node, doc_comment(node, source));
        if let Some(body) = body {
            self.calls(&id, body, owner);
        }
    }

    fn type_def(&mut self, node: Node, scope: &str) {
        let source = self.ex.source();
        let Some(name) = self.name_of(node) else {
            return;
        };
        let type_kind = match node.kind() {
            "enum_item" => TypeKind::Enum,
            "union_item" => TypeKind::Union,
            _ => TypeKind::Struct,
        };
        let body = node.child_by_field_name("body");
        let fields = body.map(|b| member_names(b, source)).unwrap_or_default();
        let key = self.ex.child_id(scope, name);
        let id = self.ex.add_item(
            scope,
            key.clone(),
            name,
            EntityDetail::Type { type_kind, fields },
            node,
            doc_comment(node, source),
        );
        if let Some(body) = body {
            for type_name in type_identifiers(body, source) {
                if type_name != name {
                    self.ex.reference(&id, &type_name, RelationKind::References);
                }
            }
        }
        self.types.insert(key, id);
    }

    fn trait_def(&mut self, node: Node, scope: &str) {
        let source = self.ex.source();
        let Some(name) = self.name_of(node) else {
            return;
        };
        let body = node.child_by_field_name("body");
        let key = self.ex.child_id(scope, name);
        let id = self.ex.add_item(
            scope,
            key.clone(),
            name,
            EntityDetail::Type {
                type_kind: TypeKind::Trait,
                fields: Vec::new(),
            },
            node,
            doc_comment(node, source),
        );
        if let Some(bounds) = node.child_by_field_name("bounds") {
            for supertrait in type_identifiers(bounds, source) {
                self.ex.reference(&id, &supertrait, RelationKind::Extends);
            }
        }
        if let Some(body) = body {
            let mut cursor = body.walk();
            let members: Vec<Node> = body.named_children(&mut cursor).collect();
            for member in members {
                if matches!(member.kind(), "function_item" | "function_signature_item") {
                    self.function(member, scope, &id, Some(name));
                }
            }
        }
        self.types.insert(key, id);
    }

    fn alias(&mut self, node: Node, scope: &str) {
        let source = self.ex.source();
        let Some(name) = self.name_of(node) else {
            return;
        };
        let id = self.ex.child_id(scope, name);
        let id = self.ex.add_item(
            scope,
            id,
            name,
            EntityDetail::Type {
                type_kind: TypeKind::Alias,
                fields: Vec::new(),
            },
            node,
            doc_comment(node, source),
        );
        if let Some(target) = node.child_by_field_name("type") {
            for type_name in type_identifiers(target, source) {
                self.ex.reference(&id, &type_name, RelationKind::References);
            }
        }
    }

    fn constant(&mut self, node: Node, scope: &str) {
        let source = self.ex.source();
        let Some(name) = self.name_of(node) else {
            return;
        };
        let id = self.ex.child_id(scope, name);
        let id = self
            .ex
            .add_item(scope, id, name, EntityDetail::Constant, node, doc_comment(node, source));
        if let Some(value) = node.child_by_field_name("value") {
            self.calls(&id, value, None);
        }
    }

    fn module(&mut self, node: Node, scope: &str) {
        let source = self.ex.source();
        let Some(name) = self.name_of(node) else {
            return;
        };
        // `mod foo;` declarations live in their own file.
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let id = self.ex.child_id(scope, name);
        let id = self
            .ex
            .add_item(scope, id, name, EntityDetail::Module, node, doc_comment(node, source));
        self.visit_items(body, &id);
    }

    fn imports(&mut self, node: Node) {
        let source = self.ex.source();
        let Some(argument) = node.child_by_field_name("argument") else {
            return;
        };
        let file_id = self.ex.file_id().to_string();
        for name in imported_names(node_text(argument, source)) {
            self.ex.reference(&file_id, &name, RelationKind::Imports);
        }
    }

    fn impl_block(&mut self, node: Node, scope: &str) {
        let source = self.ex.source();
        let Some(type_name) = node.child_by_field_name("type").and_then(|t| base_type_name(t, source)) else {
            return;
        };
        let local_type = self.types.get(&self.ex.child_id(scope, &type_name)).cloned();
        let container = local_type.clone().unwrap_or_else(|| scope.to_string());

        if let (Some(type_id), Some(trait_name)) = (
            &local_type,
            node.child_by_field_name("trait").and_then(|t| base_type_name(t, source)),
        ) {
            self.ex.reference(type_id, &trait_name, RelationKind::Implements);
        }

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        let members: Vec<Node> = body.named_children(&mut cursor).collect();
        for member in members {
            match member.kind() {
                "function_item" => self.function(member, scope, &container, Some(&type_name)),
                "const_item" => self.constant(member, scope),
                _ => {}
            }
        }
    }

    /// Record every call inside `body` as a reference from `source_id`.
    fn calls(&mut self, source_id: &str, body: Node, owner: Option<&str>) {
        let source = self.ex.source();
        let mut stack = vec![body];
        while let Some(node) = stack.pop() {
            if node.kind() == "call_expression" {
                if let Some(callee) = node.child_by_field_name("function").and_then(|f| callee_name(f, source)) {
                    let callee = match (owner, callee.strip_prefix("Self::")) {
                        (Some(owner), Some(rest)) => format!("{}::{}", owner, rest),
                        _ => callee,
                    };
                    self.ex.reference(source_id, &callee, RelationKind::Calls);
                }
            }
            let mut cursor = node.walk();
            stack.extend(node.named_children(&mut cursor));
        }
    }
}

fn callee_name(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "identifier" | "scoped_identifier" => Some(node_text(node, source).to_string()),
        "field_expression" => node
            .child_by_field_name("field")
            .map(|f| node_text(f, source).to_string()),
        "generic_function" => node
            .child_by_field_name("function")
            .and_then(|f| callee_name(f, source)),
        _ => None,
    }
}

/// `Foo` for `Foo`, `Foo<T>`, `crate::a::Foo<T>` and `&Foo`.
fn base_type_name(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "type_identifier" | "identifier" => Some(node_text(node, source).to_string()),
        "generic_type" => node
            .child_by_field_name("type")
            .and_then(|t| base_type_name(t, source)),
        "scoped_type_identifier" => node
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string()),
        "reference_type" => node
            .child_by_field_name("type")
            .and_then(|t| base_type_name(t, source)),
        _ => None,
    }
}

/// Distinct type names mentioned under `node`, in source order.
fn type_identifiers(node: Node, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if current.kind() == "type_identifier" {
            let name = node_text(current, source).to_string();
            if !names.contains(&name) {
                names.push(name);
            }
            continue;
        }
        let mut cursor = current.walk();
        let children: Vec<Node> = current.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    names
}

/// Field names of a struct body or variant names of an enum body.
fn member_names(body: Node, source: &str) -> Vec<String> {
    let mut cursor = body.walk();
    body.named_children(&mut cursor)
        .enumerate()
        .filter_map(|(i, member)| match member.kind() {
            "field_declaration" | "enum_variant" => member
                .child_by_field_name("name")
                .map(|n| node_text(n, source).to_string()),
            "attribute_item" | "line_comment" | "block_comment" | "visibility_modifier" => None,
            _ if body.kind() == "ordered_field_declaration_list" => Some(i.to_string()),
            _ => None,
        })
        .collect()
}

/// Names brought in by a `use` argument: `a::b::{C, D as E}` gives `C`, `D`.
pub(crate) fn imported_names(argument: &str) -> Vec<String> {
    argument
        .replace(['{', '}'], ",")
        .split(',')
        .filter_map(|item| {
            let path = item.split(" as ").next()?.trim();
            let name = path.rsplit("::").next()?.trim();
            (!name.is_empty() && !matches!(name, "self" | "super" | "crate" | "*")).then(|| name.to_string())
        })
        .collect()
}

/// `///` and `/** */` comments directly above `node`, skipping attributes.
fn doc_comment(node: Node, source: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut prev = node.prev_sibling();
    while let Some(sibling) = prev {
        let text = node_text(sibling, source).trim();
        match sibling.kind() {
            "attribute_item" => {}
            "line_comment" => match text.strip_prefix("///") {
                Some(doc) if !doc.starts_with('/') => lines.push(doc.trim().to_string()),
                _ => break,
            },
            "block_comment" => match text.strip_prefix("/**") {
                Some(doc) => lines.push(doc.trim_end_matches("*/").trim().to_string()),
                None => break,
            },
            _ => break,
        }
        prev = sibling.prev_sibling();
    }
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}
