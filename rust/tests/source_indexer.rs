use source_framework::container::ComponentContainer;
use source_framework::{ComponentKind, ErrorKind, IndexerConfig, SourceIndexer};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const DEMO: &[(&str, &str)] = &[
    ("root.config", include_str!("fixtures/demo/root.config")),
    (
        "indices/root.file.index",
        include_str!("fixtures/demo/indices/root.file.index"),
    ),
    (
        "indices/script.file.index",
        include_str!("fixtures/demo/indices/script.file.index"),
    ),
    (
        "indices/notes.file.index",
        include_str!("fixtures/demo/indices/notes.file.index"),
    ),
    (
        "indices/root.item.index",
        include_str!("fixtures/demo/indices/root.item.index"),
    ),
    (
        "indices/section.item.index",
        include_str!("fixtures/demo/indices/section.item.index"),
    ),
    (
        "indices/function.item.index",
        include_str!("fixtures/demo/indices/function.item.index"),
    ),
    (
        "indices/root.ignore.index",
        include_str!("fixtures/demo/indices/root.ignore.index"),
    ),
    (
        "indices/generated.ignore.index",
        include_str!("fixtures/demo/indices/generated.ignore.index"),
    ),
    ("src/tool.script.py", include_str!("fixtures/demo/src/tool.script.py")),
    ("docs/guide.md", include_str!("fixtures/demo/docs/guide.md")),
];

const BROKEN: &str = include_str!("fixtures/demo/broken.script.py");

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// The demo project under `<tmp>/demo` plus the project it depends on under
/// `<tmp>/shared`.
fn demo_tree() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("demo");
    for (rel, content) in DEMO {
        write(&root, rel, content);
    }
    write(
        dir.path(),
        "shared/root.config",
        include_str!("fixtures/demo/shared.config"),
    );
    (dir, root)
}

fn sorted(names: Vec<&str>) -> Vec<&str> {
    let mut names = names;
    names.sort_unstable();
    names
}

#[test]
fn indexes_files_items_and_root_project() {
    let (_dir, root) = demo_tree();
    let indexer = SourceIndexer::open(IndexerConfig::default(), &root).expect("index demo");
    let view = indexer.view().unwrap();

    assert_eq!(view.len(), 8);
    assert_eq!(view.files().names(), vec!["guide", "tool"]);
    assert_eq!(
        sorted(view.items().names()),
        vec!["intro", "run", "setup", "stop"]
    );
    // the dependency closure is indexed too, the cycle back to demo once
    assert_eq!(view.projects().names(), vec!["demo", "shared"]);
    assert_eq!(indexer.root_project().unwrap().name, "demo");
    let shared = view.at_path(&root.join("../shared")).unwrap();
    assert_eq!(shared.projects().names(), vec!["shared"]);

    let setup = view.items().by_name("setup").unwrap();
    let setup = setup.as_item().unwrap();
    assert_eq!((setup.line_start, setup.line_end), (2, 4));
    assert_eq!(setup.source(), "#BEGIN setup\nx = 1\n");
    assert_eq!(setup.body(), "x = 1\n");
    assert_eq!(setup.file.name, "tool");

    // ends at the first blank line through end_default
    let run = view.items().by_name("run").unwrap();
    assert_eq!(run.lines(), Some((6, 8)));
    let stop = view.items().by_name("stop").unwrap();
    assert_eq!(stop.lines(), Some((9, 11)));
}

#[test]
fn second_index_is_refused_and_refresh_rebuilds() {
    let (_dir, root) = demo_tree();
    let mut indexer = SourceIndexer::open(IndexerConfig::default(), &root).unwrap();
    assert_eq!(indexer.build_count(), 1);

    let err = indexer.index().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lifecycle);
    assert_eq!(indexer.build_count(), 1);

    let before = indexer.view().unwrap();
    write(&root, "src/extra.script.py", "def extra():\n    pass\n\n");
    indexer.refresh().unwrap();

    assert_eq!(indexer.build_count(), 2);
    assert_eq!(before.items().len(), 4);
    assert_eq!(indexer.view().unwrap().items().len(), 5);
}

#[test]
fn querying_before_indexing_is_a_lifecycle_error() {
    let (_dir, root) = demo_tree();
    let mut indexer = SourceIndexer::new(IndexerConfig::default(), &root);
    assert_eq!(indexer.view().unwrap_err().kind(), ErrorKind::Lifecycle);

    let definitions = indexer.resolve().unwrap();
    assert_eq!(indexer.state().name(), "resolved");
    assert_eq!(definitions.of_kind("item").len(), 2);
    assert!(indexer.view().is_err());

    indexer.index().unwrap();
    assert_eq!(indexer.state().name(), "indexed");
}

#[test]
fn ignore_definitions_prune_the_walk() {
    let (_dir, root) = demo_tree();
    write(&root, "out.generated/broken.script.py", BROKEN);
    let indexer = SourceIndexer::open(IndexerConfig::default(), &root).unwrap();
    assert_eq!(indexer.view().unwrap().files().len(), 2);

    // the same file outside the pruned directory aborts indexing
    write(&root, "out/broken.script.py", BROKEN);
    let err = SourceIndexer::open(IndexerConfig::default(), &root).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Extraction);
    assert!(err.to_string().contains("broken.script.py"));
}

#[test]
fn path_queries() {
    let (_dir, root) = demo_tree();
    let indexer = SourceIndexer::open(IndexerConfig::default(), &root).unwrap();
    let view = indexer.view().unwrap();

    let src = view.at_path(&root.join("src")).unwrap();
    assert_eq!(src.len(), 4);
    assert_eq!(src.files().names(), vec!["tool"]);

    let err = view.at_path(&root.join("missing")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Scope);
    assert!(view.by_path(&root.join("missing")).is_empty());

    let guide = view.files().named("guide");
    let located = view.at(guide.components());
    assert_eq!(located.names(), vec!["guide", "intro"]);
}

#[test]
fn matching_by_index_name_and_type() {
    let (_dir, root) = demo_tree();
    let indexer = SourceIndexer::open(IndexerConfig::default(), &root).unwrap();
    let view = indexer.view().unwrap();

    assert_eq!(sorted(view.matching("section").names()), vec!["intro", "setup"]);
    assert_eq!(view.matching("function").len(), 2);
    assert_eq!(view.matching("item").len(), 4);
    assert_eq!(view.matching("script").names(), vec!["tool"]);

    let items = view.items();
    assert_eq!(items.kinds(), vec![ComponentKind::Item; 4]);
    assert_eq!(items.owning_files().names(), vec!["guide", "tool"]);
    // narrowing is a copy
    assert_eq!(view.len(), 8);
}

#[test]
fn view_extracts_items_of_its_files() {
    let (_dir, root) = demo_tree();
    let indexer = SourceIndexer::open(IndexerConfig::default(), &root).unwrap();
    let mut tool = indexer.view().unwrap().files().named("tool");
    tool.extract_items().unwrap();

    assert_eq!(sorted(tool.names()), vec!["run", "setup", "stop"]);
    assert_eq!(tool.items().len(), 3);
}

#[test]
fn base_config_dependencies_join_the_project_set() {
    let (dir, root) = demo_tree();
    write(dir.path(), "tools/root.config", "name: tools\n");
    let base = dir.path().join("defaults.yaml");
    fs::write(
        &base,
        "dependencies:\n  - {name: tools, path: tools}\n  - {name: shared, path: shared}\n",
    )
    .unwrap();

    let config = IndexerConfig {
        base_config: Some(base),
        ..IndexerConfig::default()
    };
    let indexer = SourceIndexer::open(config, &root).unwrap();
    let view = indexer.view().unwrap();
    // shared is reached from demo and from the base config but listed once
    assert_eq!(view.projects().names(), vec!["demo", "shared", "tools"]);
    assert_eq!(view.projects().unique().len(), 3);
}

#[test]
fn base_config_supplies_the_index_section() {
    let (dir, root) = demo_tree();
    let base = dir.path().join("defaults.yaml");
    fs::write(
        &base,
        "index:\n  types: [file, item, ignore]\n  identifiers:\n    file: .file.index\n    item: .item.index\n    ignore: .ignore.index\n",
    )
    .unwrap();
    fs::write(root.join("root.config"), "name: demo\n").unwrap();

    let config = IndexerConfig {
        base_config: Some(base),
        ..IndexerConfig::default()
    };
    let indexer = SourceIndexer::open(config, &root).unwrap();
    assert_eq!(indexer.view().unwrap().items().len(), 4);
    assert_eq!(indexer.view().unwrap().projects().names(), vec!["demo"]);

    let err = SourceIndexer::open(IndexerConfig::default(), &root).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
