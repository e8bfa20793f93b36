//! The indexing lifecycle and the views it hands out.

pub mod project;

use crate::config::{IndexDefinition, IndexDefinitions, IndexerConfig, Resolver};
use crate::config::{FILE_KIND, IGNORE_KIND, ITEM_KIND};
use crate::container::{ComponentContainer, Scope};
use crate::error::{IndexError, Result};
use crate::extract::{compile_all, extract_items};
use crate::model::{Component, IndexedFile, Project};
use crate::walk::{self, WalkOptions};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Where a [`SourceIndexer`] is in its lifecycle.
#[derive(Debug, Clone)]
pub enum IndexState {
    Uninitialized,
    Resolved(Arc<IndexDefinitions>),
    Indexed {
        definitions: Arc<IndexDefinitions>,
        all: Scope,
    },
}

impl IndexState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Resolved(_) => "resolved",
            Self::Indexed { .. } => "indexed",
        }
    }

    pub fn definitions(&self) -> Option<&Arc<IndexDefinitions>> {
        match self {
            Self::Uninitialized => None,
            Self::Resolved(d) => Some(d),
            Self::Indexed { definitions, .. } => Some(definitions),
        }
    }
}

/// Resolves the index definitions of one source tree and indexes it.
///
/// Indexing happens once; a second [`index`](Self::index) is refused and
/// [`refresh`](Self::refresh) rebuilds everything instead.
#[derive(Debug)]
pub struct SourceIndexer {
    config: IndexerConfig,
    start: PathBuf,
    state: IndexState,
    builds: usize,
}

impl SourceIndexer {
    pub fn new(config: IndexerConfig, start: impl Into<PathBuf>) -> Self {
        Self {
            config,
            start: start.into(),
            state: IndexState::Uninitialized,
            builds: 0,
        }
    }

    /// Resolve and index the tree containing `start`.
    pub fn open(config: IndexerConfig, start: impl Into<PathBuf>) -> Result<Self> {
        let mut indexer = Self::new(config, start);
        indexer.index()?;
        Ok(indexer)
    }

    /// Open an indexer rooted at the directory of `project`'s config.
    pub fn from_project(project: &Project, config: IndexerConfig) -> Result<Self> {
        Self::open(config, project.directory())
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn state(&self) -> &IndexState {
        &self.state
    }

    pub fn definitions(&self) -> Option<&Arc<IndexDefinitions>> {
        self.state.definitions()
    }

    /// Number of full indexing passes run by this indexer.
    pub fn build_count(&self) -> usize {
        self.builds
    }

    /// Resolve the index definitions if that has not happened yet.
    pub fn resolve(&mut self) -> Result<Arc<IndexDefinitions>> {
        if let Some(definitions) = self.state.definitions() {
            return Ok(definitions.clone());
        }
        let definitions = Arc::new(Resolver::new(&self.config).resolve(&self.start)?);
        self.state = IndexState::Resolved(definitions.clone());
        Ok(definitions)
    }

    pub fn index(&mut self) -> Result<()> {
        if let IndexState::Indexed { definitions, .. } = &self.state {
            return Err(IndexError::AlreadyIndexed(definitions.root_dir.clone()));
        }
        let definitions = self.resolve()?;
        let all = self.build(&definitions)?;
        self.state = IndexState::Indexed { definitions, all };
        Ok(())
    }

    /// Resolve and index again from scratch. The previous index stays in
    /// place when the rebuild fails.
    pub fn refresh(&mut self) -> Result<()> {
        let definitions = Arc::new(Resolver::new(&self.config).resolve(&self.start)?);
        let all = self.build(&definitions)?;
        self.state = IndexState::Indexed { definitions, all };
        Ok(())
    }

    /// A view over everything indexed.
    pub fn view(&self) -> Result<IndexView> {
        match &self.state {
            IndexState::Indexed { definitions, all } => Ok(IndexView {
                definitions: definitions.clone(),
                scope: all.clone(),
            }),
            other => Err(IndexError::NotIndexed(other.name())),
        }
    }

    /// The project described by the root marker.
    pub fn root_project(&self) -> Result<Project> {
        let view = self.view()?;
        let marker = walk::canonical(&view.definitions.root_marker);
        let project = view
            .projects()
            .filter(|c| c.path() == marker.as_path())
            .one()?
            .as_project()
            .cloned();
        project
            .map(|p| (*p).clone())
            .ok_or_else(|| IndexError::EmptyScope("no root project".to_string()))
    }

    fn build(&mut self, definitions: &IndexDefinitions) -> Result<Scope> {
        self.builds += 1;
        info!(
            "indexing {} (pass {})",
            definitions.root_dir.display(),
            self.builds
        );

        let files = classify_files(definitions, self.config.follow_links)?;
        let matchers = compile_all(&definitions.of_kind(ITEM_KIND))?;

        let mut all = Scope::new();
        let mut items = Vec::new();
        for file in &files {
            items.extend(extract_items(file, &matchers)?);
        }
        info!("indexed {} files and {} items", files.len(), items.len());

        all.extend(files.into_iter().map(Component::File));
        all.extend(items.into_iter().map(Component::from));
        all.extend(self.projects(definitions)?.into_iter().map(Component::from));
        Ok(all)
    }

    /// The root project, everything it depends on and the base config's
    /// dependencies, each path once.
    fn projects(&self, definitions: &IndexDefinitions) -> Result<Vec<Project>> {
        let marker_name = self.config.root_marker_name();
        let root = Project::load(&definitions.root_marker, &marker_name)?;
        let mut projects = root.with_dependencies(&marker_name)?;
        if let Some(base) = self.config.base_config.as_deref().filter(|b| b.is_file()) {
            projects.extend(project::base_dependencies(base, &marker_name)?);
        }

        let mut seen = HashSet::new();
        projects.retain(|p| seen.insert(p.path.clone()));
        debug!("indexed {} projects", projects.len());
        Ok(projects)
    }
}

/// Every file matched by a file-type definition, in path order. A file
/// matching several suffixes belongs to the definition with the longest one.
fn classify_files(
    definitions: &IndexDefinitions,
    follow_links: bool,
) -> Result<Vec<Arc<IndexedFile>>> {
    let file_definitions = definitions.of_kind(FILE_KIND);
    let suffixes = definitions.suffixes(FILE_KIND);
    let prune = definitions.suffixes(IGNORE_KIND);
    if !prune.is_empty() {
        debug!("pruning paths ending with {:?}", prune);
    }

    let buckets = walk::find_by_suffix(
        &definitions.root_dir,
        &suffixes,
        &WalkOptions {
            prune: &prune,
            follow_links,
        },
    );

    let mut classified: BTreeMap<PathBuf, &Arc<IndexDefinition>> = BTreeMap::new();
    for definition in &file_definitions {
        let Some(suffix) = definition.suffix() else {
            continue;
        };
        for path in buckets.get(suffix).into_iter().flatten() {
            let longer = classified
                .get(path)
                .and_then(|d| d.suffix())
                .map_or(true, |current| suffix.len() > current.len());
            if longer {
                classified.insert(path.clone(), definition);
            }
        }
    }

    classified
        .into_iter()
        .map(|(path, definition)| IndexedFile::load(&path, definition.clone()).map(Arc::new))
        .collect()
}

/// A scoped copy of indexed components. Narrowing a view never touches the
/// indexer or the filesystem.
#[derive(Debug, Clone)]
pub struct IndexView {
    definitions: Arc<IndexDefinitions>,
    scope: Scope,
}

impl IndexView {
    pub fn from_components(
        definitions: Arc<IndexDefinitions>,
        components: impl IntoIterator<Item = Component>,
    ) -> Self {
        Self {
            definitions,
            scope: Scope::from_components(components),
        }
    }

    pub fn definitions(&self) -> &Arc<IndexDefinitions> {
        &self.definitions
    }

    pub fn root_dir(&self) -> &Path {
        &self.definitions.root_dir
    }

    /// Components at or beneath `path`; an error when there are none.
    pub fn at_path(&self, path: &Path) -> Result<Self> {
        let found = self.by_path(path);
        if found.is_empty() {
            return Err(IndexError::EmptyScope(format!(
                "nothing indexed at {}",
                path.display()
            )));
        }
        Ok(found)
    }

    /// Replace the view's contents with the items found by running every
    /// item definition over the view's files again.
    pub fn extract_items(&mut self) -> Result<()> {
        let matchers = compile_all(&self.definitions.of_kind(ITEM_KIND))?;
        let mut items = Scope::new();
        for component in self.files().components() {
            if let Some(file) = component.file() {
                items.extend(extract_items(file, &matchers)?.into_iter().map(Component::from));
            }
        }
        self.scope = items;
        Ok(())
    }
}

impl ComponentContainer for IndexView {
    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }
}
