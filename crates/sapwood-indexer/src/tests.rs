//! Unit tests for sapwood-indexer

use crate::*;
use sapwood_core::{EntityDetail, EntityKind, Language, ParsedFile, RelationKind, SourceParser, TypeKind};
use std::fs;
use std::path::{Path, PathBuf};

fn parse(path: &str, source: &str) -> ParsedFile {
    let path = PathBuf::from(path);
    get_parser(&path).unwrap().parse(&path, source).unwrap()
}

fn ids(parsed: &ParsedFile) -> Vec<&str> {
    let mut ids: Vec<&str> = parsed.entities.iter().map(|e| e.id.as_str()).collect();
    ids.sort();
    ids
}

fn has_reference(parsed: &ParsedFile, source: &str, target: &str, kind: RelationKind) -> bool {
    parsed
        .references
        .iter()
        .any(|r| r.source_id == source && r.target_name == target && r.kind == kind)
}

fn has_relation(parsed: &ParsedFile, source: &str, target: &str, kind: RelationKind) -> bool {
    parsed
        .relations
        .iter()
        .any(|r| r.source_id == source && r.target_id == target && r.kind == kind)
}

#[test]
fn test_parser_detection() {
    assert!(get_parser(Path::new("main.rs")).is_some());
    assert!(get_parser(Path::new("lib.py")).is_some());
    assert!(get_parser(Path::new("app.ts")).is_none());
    assert!(get_parser(Path::new("unknown.xyz")).is_none());

    let registry = LanguageRegistry::new(&[Language::Python]);
    assert!(registry.supports(Path::new("pkg/app.py")));
    assert!(!registry.supports(Path::new("src/lib.rs")));
    assert_eq!(LanguageRegistry::default().languages(), SUPPORTED_LANGUAGES.to_vec());
}

#[test]
fn test_rust_extraction() {
    let rust_code = r#"use crate::store::Store;

/// Adds two numbers.
pub fn add(a: i32, b: i32) -> i32 {
    a + b
}

fn helper() -> i32 {
    add(1, 2)
}

#[derive(Debug)]
pub struct User {
    name: String,
    store: Store,
}

impl User {
    pub fn new(name: String) -> Self {
        Self::validate(&name);
        User { name, store: Store::default() }
    }

    fn validate(name: &str) {}
}

impl Display for User {
    fn fmt(&self) {}
}
"#;
    let parsed = parse("src/user.rs", rust_code);
    assert_eq!(
        ids(&parsed),
        vec![
            "src/user.rs",
            "src/user.rs::User",
            "src/user.rs::User::fmt",
            "src/user.rs::User::new",
            "src/user.rs::User::validate",
            "src/user.rs::add",
            "src/user.rs::helper",
        ]
    );

    let add = parsed.entities.iter().find(|e| e.name == "add").unwrap();
    assert_eq!(add.kind(), EntityKind::Function);
    assert_eq!(add.docstring.as_deref(), Some("Adds two numbers."));
    assert_eq!(add.detail.signature(), Some("pub fn add(a: i32, b: i32) -> i32"));
    assert_eq!(add.location.line_start, 4);
    assert!(add.content.starts_with("pub fn add"));

    let user = parsed.entities.iter().find(|e| e.name == "User").unwrap();
    assert_eq!(
        user.detail,
        EntityDetail::Type {
            type_kind: TypeKind::Struct,
            fields: vec!["name".to_string(), "store".to_string()],
        }
    );
    assert!(user.docstring.is_none());

    let new = parsed.entities.iter().find(|e| e.name == "new").unwrap();
    assert_eq!(new.kind(), EntityKind::Method);

    assert!(has_relation(&parsed, "src/user.rs", "src/user.rs::add", RelationKind::Contains));
    assert!(has_relation(&parsed, "src/user.rs::User", "src/user.rs::User::new", RelationKind::Contains));
    assert!(!has_relation(&parsed, "src/user.rs", "src/user.rs::User::new", RelationKind::Contains));

    assert!(has_reference(&parsed, "src/user.rs::helper", "add", RelationKind::Calls));
    assert!(has_reference(&parsed, "src/user.rs::User::new", "User::validate", RelationKind::Calls));
    assert!(has_reference(&parsed, "src/user.rs::User::new", "Store::default", RelationKind::Calls));
    assert!(has_reference(&parsed, "src/user.rs::User", "Store", RelationKind::References));
    assert!(has_reference(&parsed, "src/user.rs::User", "Display", RelationKind::Implements));
    assert!(has_reference(&parsed, "src/user.rs", "Store", RelationKind::Imports));
}

#[test]
fn test_rust_duplicate_ids_are_made_unique() {
    let parsed = parse("src/a.rs", "impl Foo for Ext {\n    fn f() {}\n}\nimpl Bar for Ext {\n    fn f() {}\n}\n");
    assert_eq!(ids(&parsed), vec!["src/a.rs", "src/a.rs::Ext::f", "src/a.rs::Ext::f#L5"]);
    assert!(has_relation(&parsed, "src/a.rs", "src/a.rs::Ext::f#L5", RelationKind::Contains));
}

#[test]
fn test_rust_inline_module_and_trait() {
    let rust_code = r#"mod inner {
    pub trait Shape: Named {
        fn area(&self) -> f64;
    }
}
"#;
    let parsed = parse("src/geo.rs", rust_code);
    assert_eq!(
        ids(&parsed),
        vec!["src/geo.rs", "src/geo.rs::inner", "src/geo.rs::inner::Shape", "src/geo.rs::inner::Shape::area"]
    );
    assert!(has_relation(&parsed, "src/geo.rs::inner", "src/geo.rs::inner::Shape", RelationKind::Contains));
    assert!(has_reference(&parsed, "src/geo.rs::inner::Shape", "Named", RelationKind::Extends));
    let area = parsed.entities.iter().find(|e| e.name == "area").unwrap();
    assert_eq!(area.detail.signature(), Some("fn area(&self) -> f64"));
}

#[test]
fn test_python_extraction() {
    let python_code = r#"import os
from app.store import Store, load as load_store

class Base:
    pass

class User(Base):
    """A user record."""
    kind = "user"

    def __init__(self, name):
        self.name = name
        self.validate()

    def validate(self):
        return helper(self.name)

@cache
def helper(value):
    """Check a value."""
    return os.path.exists(value)
"#;
    let parsed = parse("app/models.py", python_code);
    assert_eq!(
        ids(&parsed),
        vec![
            "app/models.py",
            "app/models.py::Base",
            "app/models.py::User",
            "app/models.py::User::__init__",
            "app/models.py::User::validate",
            "app/models.py::helper",
        ]
    );

    let user = parsed.entities.iter().find(|e| e.name == "User").unwrap();
    assert_eq!(user.docstring.as_deref(), Some("A user record."));
    assert_eq!(
        user.detail,
        EntityDetail::Type {
            type_kind: TypeKind::Class,
            fields: vec!["kind".to_string()],
        }
    );

    let helper = parsed.entities.iter().find(|e| e.name == "helper").unwrap();
    assert_eq!(helper.kind(), EntityKind::Function);
    assert_eq!(helper.docstring.as_deref(), Some("Check a value."));
    assert_eq!(helper.detail.signature(), Some("def helper(value)"));
    assert!(helper.content.starts_with("@cache"));

    let init = parsed.entities.iter().find(|e| e.name == "__init__").unwrap();
    assert_eq!(init.kind(), EntityKind::Method);

    assert!(has_relation(&parsed, "app/models.py::User", "app/models.py::User::validate", RelationKind::Contains));
    assert!(has_reference(&parsed, "app/models.py::User", "Base", RelationKind::Extends));
    assert!(has_reference(&parsed, "app/models.py::User::__init__", "validate", RelationKind::Calls));
    assert!(has_reference(&parsed, "app/models.py::User::validate", "helper", RelationKind::Calls));
    assert!(has_reference(&parsed, "app/models.py::helper", "exists", RelationKind::Calls));
    assert!(has_reference(&parsed, "app/models.py", "os", RelationKind::Imports));
    assert!(has_reference(&parsed, "app/models.py", "Store", RelationKind::Imports));
    assert!(has_reference(&parsed, "app/models.py", "load", RelationKind::Imports));
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sample_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/lib.rs", "pub mod util;\nuse crate::util::helper;\n\npub fn run() {\n    helper();\n}\n");
    write(root, "src/util.rs", "pub fn helper() {}\n");
    write(root, "src/skip_me.rs", "pub fn skipped() {}\n");
    write(root, "tools/report.py", "def report():\n    return 1\n");
    write(root, "target/debug/build.rs", "fn built() {}\n");
    write(root, "ignored/gen.rs", "fn generated() {}\n");
    write(root, "notes.txt", "not code\n");
    write(root, ".gitignore", "ignored/\n");
    dir
}

#[test]
fn test_collect_files_honours_excludes() {
    let dir = sample_repo();
    let options = IndexOptions {
        exclude: vec!["**/skip_*.rs".to_string()],
        ..IndexOptions::default()
    };
    let files = walker::collect_files(dir.path(), &options, &LanguageRegistry::default()).unwrap();
    assert_eq!(
        files,
        vec![
            PathBuf::from("src/lib.rs"),
            PathBuf::from("src/util.rs"),
            PathBuf::from("tools/report.py"),
        ]
    );
}

#[test]
fn test_invalid_exclude_pattern_is_an_error() {
    assert!(walker::exclude_set(&["src/[".to_string()]).is_err());
}

#[test]
fn test_index_repository_resolves_across_files() {
    let dir = sample_repo();
    let options = IndexOptions {
        exclude: vec!["**/skip_*.rs".to_string()],
        ..IndexOptions::default()
    };
    let result = index_repository(dir.path(), &options).unwrap();
    let store = &result.store;

    assert_eq!(result.stats.files_found, 3);
    assert_eq!(result.stats.files_parsed, 3);
    assert_eq!(result.stats.duplicates, 0);
    assert!(store.contains("src/lib.rs::run"));
    assert!(store.contains("tools/report.py::report"));
    assert!(!store.contains("src/skip_me.rs"));

    let run_deps = store.dependencies_of("src/lib.rs::run");
    assert!(run_deps.contains(&("src/util.rs::helper".to_string(), RelationKind::Calls)));
    let file_deps = store.dependencies_of("src/lib.rs");
    assert!(file_deps.contains(&("src/lib.rs::run".to_string(), RelationKind::Contains)));
    assert!(file_deps.contains(&("src/util.rs::helper".to_string(), RelationKind::Imports)));
    assert!(result.stats.resolved_references >= 2);
}

#[test]
fn test_language_filter() {
    let dir = sample_repo();
    let options = IndexOptions {
        languages: vec![Language::Python],
        ..IndexOptions::default()
    };
    let result = index_repository(dir.path(), &options).unwrap();
    assert_eq!(result.stats.files_found, 1);
    assert!(result.store.contains("tools/report.py"));
    assert!(!result.store.contains("src/lib.rs"));
}
