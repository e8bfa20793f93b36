//! Ordered component lists and the query operations shared by every view.

use crate::error::{IndexError, Result};
use crate::model::{Component, ComponentKind};
use crate::walk;
use std::collections::HashSet;
use std::path::Path;

/// An ordered list of components. Cloning copies the list, never the
/// components themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    components: Vec<Component>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
        Self {
            components: components.into_iter().collect(),
        }
    }

    pub fn as_slice(&self) -> &[Component] {
        &self.components
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn push(&mut self, component: impl Into<Component>) {
        self.components.push(component.into());
    }

    pub fn extend(&mut self, components: impl IntoIterator<Item = Component>) {
        self.components.extend(components);
    }

    /// One line per component, for error messages.
    pub fn describe(&self) -> String {
        self.components
            .iter()
            .map(|c| format!("  {c}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<Component> for Scope {
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
        Self::from_components(iter)
    }
}

impl IntoIterator for Scope {
    type Item = Component;
    type IntoIter = std::vec::IntoIter<Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.into_iter()
    }
}

impl<'a> IntoIterator for &'a Scope {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

/// Query operations over anything wrapping a [`Scope`].
///
/// Narrowing methods without a suffix return a narrowed copy and leave the
/// receiver as it was; the `_in_place` variants narrow the receiver itself.
pub trait ComponentContainer: Clone {
    fn scope(&self) -> &Scope;

    fn scope_mut(&mut self) -> &mut Scope;

    fn components(&self) -> &[Component] {
        self.scope().as_slice()
    }

    fn len(&self) -> usize {
        self.scope().len()
    }

    fn is_empty(&self) -> bool {
        self.scope().is_empty()
    }

    fn filter_in_place<F>(&mut self, pred: F)
    where
        F: FnMut(&Component) -> bool,
    {
        self.scope_mut().components.retain(pred);
    }

    fn filter<F>(&self, pred: F) -> Self
    where
        F: FnMut(&Component) -> bool,
    {
        let mut narrowed = self.clone();
        narrowed.filter_in_place(pred);
        narrowed
    }

    fn map_in_place<F>(&mut self, f: F)
    where
        F: FnMut(&Component) -> Component,
    {
        let scope = self.scope_mut();
        scope.components = scope.components.iter().map(f).collect();
    }

    fn map<F>(&self, f: F) -> Self
    where
        F: FnMut(&Component) -> Component,
    {
        let mut mapped = self.clone();
        mapped.map_in_place(f);
        mapped
    }

    /// Every component, or an error when there are none.
    fn get(&self) -> Result<&[Component]> {
        if self.is_empty() {
            return Err(IndexError::EmptyScope("no components in scope".to_string()));
        }
        Ok(self.components())
    }

    /// The only component in scope.
    fn one(&self) -> Result<&Component> {
        match self.components() {
            [] => Err(IndexError::EmptyScope(
                "expected one component, found none".to_string(),
            )),
            [only] => Ok(only),
            many => Err(IndexError::AmbiguousScope {
                count: many.len(),
                contents: self.scope().describe(),
            }),
        }
    }

    fn named(&self, name: &str) -> Self {
        self.filter(|c| c.name() == name)
    }

    /// The unique component called `name`.
    fn by_name(&self, name: &str) -> Result<Component> {
        let named = self.named(name);
        match named.one() {
            Ok(c) => Ok(c.clone()),
            Err(IndexError::EmptyScope(_)) => {
                Err(IndexError::EmptyScope(format!("nothing named '{name}'")))
            }
            Err(e) => Err(e),
        }
    }

    fn of_kind(&self, kind: ComponentKind) -> Self {
        self.filter(|c| c.kind() == kind)
    }

    fn files(&self) -> Self {
        self.of_kind(ComponentKind::File)
    }

    fn items(&self) -> Self {
        self.of_kind(ComponentKind::Item)
    }

    fn projects(&self) -> Self {
        self.of_kind(ComponentKind::Project)
    }

    /// Components at `path` or beneath it when `path` is a directory.
    fn by_path(&self, path: &Path) -> Self {
        let target = walk::canonical(path);
        self.filter(|c| c.path().starts_with(&target))
    }

    /// Components whose name, index name or index type is `query`.
    fn matching(&self, query: &str) -> Self {
        self.filter(|c| c.matches(query))
    }

    /// Components located where one of `others` is, first occurrence kept.
    fn at(&self, others: &[Component]) -> Self {
        let paths: HashSet<&Path> = others.iter().map(Component::path).collect();
        let mut located = self.filter(|c| paths.contains(c.path()));
        located.unique_in_place();
        located
    }

    fn unique_in_place(&mut self) {
        let mut seen = HashSet::new();
        let scope = self.scope_mut();
        let components = std::mem::take(&mut scope.components);
        scope.components = components
            .into_iter()
            .filter(|c| seen.insert(c.clone()))
            .collect();
    }

    /// Duplicates by kind, name and path removed, first occurrence kept.
    fn unique(&self) -> Self {
        let mut deduped = self.clone();
        deduped.unique_in_place();
        deduped
    }

    fn project<T, F>(&self, f: F) -> Vec<T>
    where
        F: FnMut(&Component) -> T,
    {
        self.components().iter().map(f).collect()
    }

    fn names(&self) -> Vec<&str> {
        self.components().iter().map(Component::name).collect()
    }

    fn paths(&self) -> Vec<&Path> {
        self.components().iter().map(Component::path).collect()
    }

    fn kinds(&self) -> Vec<ComponentKind> {
        self.project(Component::kind)
    }

    /// Text of every file and item; projects have none.
    fn sources(&self) -> Vec<&str> {
        self.components()
            .iter()
            .filter_map(Component::source)
            .collect()
    }

    fn properties(&self, key: &str) -> Vec<Option<&str>> {
        self.components().iter().map(|c| c.property(key)).collect()
    }

    /// Files of every file and item in scope, each once.
    fn owning_files(&self) -> Scope {
        let files: Scope = self
            .components()
            .iter()
            .filter_map(|c| c.file().cloned().map(Component::File))
            .collect();
        files.unique()
    }
}

impl ComponentContainer for Scope {
    fn scope(&self) -> &Scope {
        self
    }

    fn scope_mut(&mut self) -> &mut Scope {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexDefinition;
    use crate::error::ErrorKind;
    use crate::model::{IndexedFile, IndexedItem, Project};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn definition(name: &str, kind: &str, yaml: &str) -> Arc<IndexDefinition> {
        let config = serde_yaml::from_str(yaml).unwrap();
        Arc::new(IndexDefinition::effective(name, kind, config, Path::new("test.index")).unwrap())
    }

    fn file(name: &str) -> Arc<IndexedFile> {
        let def = definition("text", "file", "identifier: .txt\n");
        Arc::new(IndexedFile::new(
            name,
            format!("/src/{name}.txt"),
            def,
            "a\nb\nc\nd\n",
        ))
    }

    fn item(file: &Arc<IndexedFile>, name: &str, start: usize) -> Component {
        let def = definition("block", "item", "identifier: {start: '#BEGIN', end: '#END'}\n");
        let mut properties = BTreeMap::new();
        properties.insert("lang".to_string(), "en".to_string());
        IndexedItem::new(name, file.clone(), def, start, start + 2, properties).into()
    }

    fn sample() -> Scope {
        let a = file("a");
        let b = file("b");
        Scope::from_components(vec![
            Component::File(a.clone()),
            Component::File(b.clone()),
            item(&a, "one", 1),
            item(&a, "two", 2),
            Project {
                name: "demo".to_string(),
                path: "/src/root.config".into(),
                dependencies: Vec::new(),
            }
            .into(),
        ])
    }

    #[test]
    fn filter_copies_and_leaves_original_untouched() {
        let all = sample();
        let items = all.items();
        assert_eq!(items.len(), 2);
        assert_eq!(all.len(), 5);

        let mut narrowed = all.clone();
        narrowed.filter_in_place(|c| c.kind() == ComponentKind::File);
        assert_eq!(narrowed.names(), vec!["a", "b"]);
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn one_distinguishes_empty_from_ambiguous() {
        let all = sample();
        assert_eq!(all.projects().one().unwrap().name(), "demo");

        let empty = all.filter(|_| false);
        assert!(matches!(empty.one(), Err(IndexError::EmptyScope(_))));
        assert_eq!(empty.get().unwrap_err().kind(), ErrorKind::Scope);

        match all.items().one() {
            Err(IndexError::AmbiguousScope { count, contents }) => {
                assert_eq!(count, 2);
                assert!(contents.contains("item one"));
                assert!(contents.contains("item two"));
            }
            other => panic!("expected ambiguous scope, got {other:?}"),
        }
    }

    #[test]
    fn by_name_and_matching() {
        let all = sample();
        assert_eq!(all.by_name("two").unwrap().kind(), ComponentKind::Item);
        assert!(all.by_name("missing").is_err());

        assert_eq!(all.matching("block").len(), 2);
        assert_eq!(all.matching("file").len(), 2);
        assert_eq!(all.matching("a").len(), 1);
    }

    #[test]
    fn projections_and_owning_files() {
        let all = sample();
        let items = all.items();
        assert_eq!(items.properties("lang"), vec![Some("en"), Some("en")]);
        assert_eq!(items.sources(), vec!["a\nb\n", "b\nc\n"]);
        assert_eq!(all.projects().sources().len(), 0);

        let owners = items.owning_files();
        assert_eq!(owners.names(), vec!["a"]);
        assert_eq!(
            all.kinds(),
            vec![
                ComponentKind::File,
                ComponentKind::File,
                ComponentKind::Item,
                ComponentKind::Item,
                ComponentKind::Project,
            ]
        );
    }

    #[test]
    fn unique_and_at_deduplicate() {
        let all = sample();
        let mut doubled = all.clone();
        doubled.extend(all.clone());
        assert_eq!(doubled.len(), 10);
        assert_eq!(doubled.unique().len(), 5);

        let anchor = all.files().filter(|c| c.name() == "a");
        let located = doubled.at(anchor.components());
        assert_eq!(located.names(), vec!["a", "one", "two"]);
    }

    #[test]
    fn map_replaces_components() {
        let all = sample();
        let files = all.items().map(|c| Component::File(c.file().unwrap().clone()));
        assert_eq!(files.kinds(), vec![ComponentKind::File; 2]);
        assert_eq!(files.unique().len(), 1);
    }
}
