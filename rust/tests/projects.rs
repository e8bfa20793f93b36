use source_framework::container::ComponentContainer;
use source_framework::{ErrorKind, IndexerConfig, Project, SourceIndexer};
use std::fs;
use std::path::Path;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

const MARKER: &str = "index:\n  types: [file, item]\n  identifiers: {file: .file.index, item: .item.index}\n";

/// A minimal indexable project named `name` in `root`.
fn project(root: &Path, name: &str, dependencies: &str) {
    write(
        root,
        "root.config",
        &format!("name: {name}\ndependencies: {dependencies}\n{MARKER}"),
    );
    write(root, "root.file.index", "");
    write(root, "text.file.index", "identifier: .txt\n");
    write(
        root,
        "root.item.index",
        "parseTags: {word: '[a-z]+', end_default: '---'}\n",
    );
    write(root, "note.item.index", "identifier: {start: '--- {word:name}'}\n");
    write(root, "notes.txt", "--- first\ntext\n---\n");
}

#[test]
fn dependencies_follow_cycles_once() {
    let dir = tempfile::tempdir().unwrap();
    let app = dir.path().join("app");
    let lib = dir.path().join("lib");
    project(&app, "app", "[{name: lib, path: ../lib}]");
    project(&lib, "lib", "[{name: app, path: ../app/root.config}]");

    let indexer = SourceIndexer::open(IndexerConfig::default(), &app).unwrap();
    let root = indexer.root_project().unwrap();
    assert_eq!(root.name, "app");
    assert_eq!(root.dependencies[0].name, "lib");

    let marker = indexer.config().root_marker_name();
    let all = root.with_dependencies(&marker).unwrap();
    let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["app", "lib"]);

    // each dependency can be indexed on its own
    let lib_project = &all[1];
    let lib_indexer = SourceIndexer::from_project(lib_project, IndexerConfig::default()).unwrap();
    let lib_view = lib_indexer.view().unwrap();
    assert_eq!(lib_view.items().names(), vec!["first"]);
    assert_eq!(lib_view.projects().names(), vec!["lib", "app"]);
    assert_eq!(lib_indexer.root_project().unwrap().name, "lib");

    // the app index holds the same closure, root first
    assert_eq!(indexer.view().unwrap().projects().names(), vec!["app", "lib"]);
}

#[test]
fn unresolvable_dependency_fails_indexing() {
    let dir = tempfile::tempdir().unwrap();
    let app = dir.path().join("app");
    project(&app, "app", "[{name: gone, path: ../gone}]");

    let err = SourceIndexer::open(IndexerConfig::default(), &app).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Discovery);
    assert!(err.to_string().contains("gone"));
}

#[test]
fn missing_dependency_is_a_discovery_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = dir.path().join("app");
    project(&app, "app", "[{name: gone, path: ../gone}]");

    let project = Project::load(&app.join("root.config"), "root.config").unwrap();
    let err = project.with_dependencies("root.config").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Discovery);
    assert!(err.to_string().contains("gone"));
}

#[test]
fn nearest_root_marker_wins() {
    let dir = tempfile::tempdir().unwrap();
    let outer = dir.path().join("outer");
    let inner = outer.join("nested/inner");
    project(&outer, "outer", "[]");
    project(&inner, "inner", "[]");
    fs::create_dir_all(inner.join("src")).unwrap();

    let indexer = SourceIndexer::open(IndexerConfig::default(), inner.join("src")).unwrap();
    assert_eq!(indexer.root_project().unwrap().name, "inner");

    // from the outer tree the nested definitions are a second set of roots
    let err = SourceIndexer::open(IndexerConfig::default(), &outer).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Discovery);
    assert!(err.to_string().contains("multiple root definitions"));
}
