use crate::config::IndexDefinition;
use crate::error::{IndexError, Result};
use crate::walk;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Name given to items whose start template captures no `name`.
pub const UNNAMED_ITEM: &str = "_";

/// A source file classified by a file-type definition. Its content is read
/// once and never changes; writing produces a new `IndexedFile`.
#[derive(Debug, Clone)]
pub struct IndexedFile {
    pub name: String,
    pub path: PathBuf,
    pub definition: Arc<IndexDefinition>,
    content: Arc<str>,
}

impl IndexedFile {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        definition: Arc<IndexDefinition>,
        content: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            definition,
            content: content.into(),
        }
    }

    /// Read the file at `path`; its name is the file name without the
    /// definition's suffix.
    pub fn load(path: &Path, definition: Arc<IndexDefinition>) -> Result<Self> {
        let path = walk::canonical(path);
        let content = std::fs::read_to_string(&path).map_err(|e| IndexError::io(&path, e))?;
        let name = match definition.suffix() {
            Some(suffix) => walk::strip_suffix(&path, suffix),
            None => file_name(&path),
        };
        Ok(Self::new(name, path, definition, content))
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn lines(&self) -> std::str::Lines<'_> {
        self.content.lines()
    }

    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }

    /// Text of the 1-based line range `[start, end)`, line endings kept.
    pub fn slice_lines(&self, start: usize, end: usize) -> String {
        let skip = start.saturating_sub(1);
        let take = end.saturating_sub(start);
        self.content
            .split_inclusive('\n')
            .skip(skip)
            .take(take)
            .collect()
    }

    pub fn filename(&self) -> String {
        file_name(&self.path)
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A delimited region of a file found by an item-type definition.
#[derive(Debug, Clone)]
pub struct IndexedItem {
    pub name: String,
    pub file: Arc<IndexedFile>,
    pub definition: Arc<IndexDefinition>,
    /// 1-based line of the start match, inclusive.
    pub line_start: usize,
    /// 1-based line of the terminating match, exclusive.
    pub line_end: usize,
    pub properties: BTreeMap<String, String>,
    source: OnceLock<String>,
}

impl IndexedItem {
    pub fn new(
        name: impl Into<String>,
        file: Arc<IndexedFile>,
        definition: Arc<IndexDefinition>,
        line_start: usize,
        line_end: usize,
        properties: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            file,
            definition,
            line_start,
            line_end,
            properties,
            source: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    /// Lines `[line_start, line_end)` of the owning file, computed on first use.
    pub fn source(&self) -> &str {
        self.source
            .get_or_init(|| self.file.slice_lines(self.line_start, self.line_end))
    }

    /// Lines strictly between the start line and the terminating line.
    pub fn body(&self) -> String {
        self.file.slice_lines(self.line_start + 1, self.line_end)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// A declared dependency of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub path: PathBuf,
}

/// A unit of source organised around a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    /// Canonical path of the project's config file.
    pub path: PathBuf,
    pub dependencies: Vec<Dependency>,
}

impl Project {
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    File,
    Item,
    Project,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Item => write!(f, "item"),
            Self::Project => write!(f, "project"),
        }
    }
}

/// Anything an index holds. Components compare equal when kind, name and path
/// agree.
#[derive(Debug, Clone)]
pub enum Component {
    File(Arc<IndexedFile>),
    Item(Arc<IndexedItem>),
    Project(Arc<Project>),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::File(_) => ComponentKind::File,
            Self::Item(_) => ComponentKind::Item,
            Self::Project(_) => ComponentKind::Project,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::File(f) => &f.name,
            Self::Item(i) => &i.name,
            Self::Project(p) => &p.name,
        }
    }

    /// The file an item lives in, a file's own path, or a project's config.
    pub fn path(&self) -> &Path {
        match self {
            Self::File(f) => &f.path,
            Self::Item(i) => i.path(),
            Self::Project(p) => &p.path,
        }
    }

    pub fn definition(&self) -> Option<&Arc<IndexDefinition>> {
        match self {
            Self::File(f) => Some(&f.definition),
            Self::Item(i) => Some(&i.definition),
            Self::Project(_) => None,
        }
    }

    /// The indexed file behind a file or item.
    pub fn file(&self) -> Option<&Arc<IndexedFile>> {
        match self {
            Self::File(f) => Some(f),
            Self::Item(i) => Some(&i.file),
            Self::Project(_) => None,
        }
    }

    pub fn as_item(&self) -> Option<&Arc<IndexedItem>> {
        match self {
            Self::Item(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_project(&self) -> Option<&Arc<Project>> {
        match self {
            Self::Project(p) => Some(p),
            _ => None,
        }
    }

    /// Full text of a file, or an item's line range.
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::File(f) => Some(f.content()),
            Self::Item(i) => Some(i.source()),
            Self::Project(_) => None,
        }
    }

    pub fn lines(&self) -> Option<(usize, usize)> {
        self.as_item().map(|i| (i.line_start, i.line_end))
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.as_item().and_then(|i| i.property(key))
    }

    /// True when `query` is the component's name, its definition's name or
    /// type, or the component kind.
    pub fn matches(&self, query: &str) -> bool {
        self.name() == query
            || self.kind().to_string() == query
            || self.definition().is_some_and(|d| d.matches(query))
    }

    /// Located at the same path as `other`.
    pub fn is_at(&self, other: &Component) -> bool {
        self.path() == other.path()
    }

    pub fn key(&self) -> (ComponentKind, &str, &Path) {
        (self.kind(), self.name(), self.path())
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Component {}

impl Hash for Component {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(file) => write!(
                f,
                "file {} [{}] at {}",
                file.name,
                file.definition.name,
                file.path.display()
            ),
            Self::Item(item) => write!(
                f,
                "item {} [{}] lines {}..{} in {}",
                item.name,
                item.definition.name,
                item.line_start,
                item.line_end,
                item.path().display()
            ),
            Self::Project(p) => write!(f, "project {} at {}", p.name, p.path.display()),
        }
    }
}

impl From<IndexedFile> for Component {
    fn from(file: IndexedFile) -> Self {
        Self::File(Arc::new(file))
    }
}

impl From<IndexedItem> for Component {
    fn from(item: IndexedItem) -> Self {
        Self::Item(Arc::new(item))
    }
}

impl From<Project> for Component {
    fn from(project: Project) -> Self {
        Self::Project(Arc::new(project))
    }
}
