//! Shared building blocks for language extractors

use sapwood_core::{Entity, EntityDetail, Location, ParsedFile, RawReference, Relation, RelationKind};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

/// Source text of `node`.
pub(crate) fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

/// 1-based inclusive line range of `node`.
pub(crate) fn line_span(node: Node) -> (u32, u32) {
    (node.start_position().row as u32 + 1, node.end_position().row as u32 + 1)
}

/// Text of `node` up to where `body` starts, trimmed. Used as a signature.
pub(crate) fn header_text(node: Node, body: Option<Node>, source: &str) -> String {
    let end = body.map_or(node.end_byte(), |b| b.start_byte());
    source
        .get(node.start_byte()..end)
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Entity id of a file: its path relative to the repository root, with `/`.
pub fn file_id(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Accumulates the entities, relations and references of one file.
pub struct Extraction<'s> {
    path: PathBuf,
    source: &'s str,
    file_id: String,
    seen: HashSet<String>,
    references: HashSet<(String, String, RelationKind)>,
    parsed: ParsedFile,
}

impl<'s> Extraction<'s> {
    /// Start an extraction; the file entity is added immediately.
    pub fn new(path: &Path, source: &'s str) -> Self {
        let file_id = file_id(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_id.clone());
        let line_count = source.lines().count() as u32;
        let file = Entity::new(
            file_id.clone(),
            name,
            EntityDetail::File { line_count },
            Location::new(path, 1, line_count.max(1)),
        )
        .with_content(source);

        let mut parsed = ParsedFile::default();
        parsed.entities.push(file);
        Extraction {
            path: path.to_path_buf(),
            source,
            seen: HashSet::from([file_id.clone()]),
            file_id,
            references: HashSet::new(),
            parsed,
        }
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    /// Id for `name` nested under `scope`.
    pub fn child_id(&self, scope: &str, name: &str) -> String {
        format!("{}::{}", scope, name)
    }

    /// Add an entity for `node` and a `contains` relation from `container`.
    /// Returns the final id, made unique within the file if needed.
    pub fn add_item(
        &mut self,
        container: &str,
        id: String,
        name: &str,
        detail: EntityDetail,
        node: Node,
        docstring: Option<String>,
    ) -> String {
        let (line_start, line_end) = line_span(node);
        let id = if self.seen.contains(&id) {
            let mut candidate = format!("{}#L{}", id, line_start);
            let mut n = 2;
            while self.seen.contains(&candidate) {
                candidate = format!("{}#L{}.{}", id, line_start, n);
                n += 1;
            }
            candidate
        } else {
            id
        };
        self.seen.insert(id.clone());

        let mut entity = Entity::new(
            id.clone(),
            name,
            detail,
            Location::new(&self.path, line_start, line_end),
        )
        .with_content(node_text(node, self.source));
        if let Some(doc) = docstring.filter(|d| !d.trim().is_empty()) {
            entity = entity.with_docstring(doc);
        }
        self.parsed.entities.push(entity);
        self.parsed.relations.push(
            Relation::new(container, id.clone(), RelationKind::Contains)
                .with_weight(RelationKind::Contains.suggested_weight()),
        );
        id
    }

    /// Record a by-name reference. Repeats of the same reference are dropped.
    pub fn reference(&mut self, source_id: &str, target_name: &str, kind: RelationKind) {
        let target_name = target_name.trim();
        if target_name.is_empty() {
            return;
        }
        let key = (source_id.to_string(), target_name.to_string(), kind);
        if self.references.insert(key) {
            self.parsed
                .references
                .push(RawReference::new(source_id, target_name, kind));
        }
    }

    /// Add a relation whose both ends are in this file.
    pub fn relation(&mut self, source_id: &str, target_id: &str, kind: RelationKind) {
        self.parsed
            .relations
            .push(Relation::new(source_id, target_id, kind).with_weight(kind.suggested_weight()));
    }

    pub fn finish(self) -> ParsedFile {
        self.parsed
    }
}
