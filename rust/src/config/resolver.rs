//! Discovery of the root marker and every index definition beneath it.

use super::definition::{IndexDefinition, ROOT_NAME};
use super::{load_yaml, load_yaml_mapping, merge, IndexerConfig};
use crate::error::{IndexError, Result};
use crate::walk::{self, WalkOptions};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The `index` section of a root marker.
#[derive(Debug, Deserialize)]
struct IndexSection {
    types: Option<Vec<String>>,
    identifiers: Option<BTreeMap<String, String>>,
}

/// All effective index definitions of a source tree.
#[derive(Debug, Clone)]
pub struct IndexDefinitions {
    pub root_dir: PathBuf,
    pub root_marker: PathBuf,
    /// The root marker merged over the user-level base config.
    pub root_config: Mapping,
    pub types: Vec<String>,
    /// Declared type -> file name suffix of its config files.
    pub identifiers: BTreeMap<String, String>,
    roots: BTreeMap<String, Arc<IndexDefinition>>,
    definitions: Vec<Arc<IndexDefinition>>,
}

impl IndexDefinitions {
    /// Effective child definitions, grouped by declared type order.
    pub fn all(&self) -> &[Arc<IndexDefinition>] {
        &self.definitions
    }

    pub fn of_kind(&self, kind: &str) -> Vec<Arc<IndexDefinition>> {
        self.definitions
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect()
    }

    pub fn root_of(&self, kind: &str) -> Option<&Arc<IndexDefinition>> {
        self.roots.get(kind)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<IndexDefinition>> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Suffix identifiers of every definition of `kind`.
    pub fn suffixes(&self, kind: &str) -> Vec<String> {
        self.definitions
            .iter()
            .filter(|d| d.kind == kind)
            .filter_map(|d| d.suffix().map(str::to_string))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// A definition as read from disk, before inheritance.
struct RawDefinition {
    name: String,
    kind: String,
    config: Mapping,
    path: PathBuf,
}

pub struct Resolver<'a> {
    config: &'a IndexerConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a IndexerConfig) -> Self {
        Self { config }
    }

    /// Search `start` and each of its ancestors for the root marker; the
    /// nearest one wins.
    pub fn find_root_marker(&self, start: &Path) -> Result<PathBuf> {
        let marker_name = self.config.root_marker_name();
        let start = walk::canonical(start);
        let start_dir = if start.is_file() {
            start.parent().map(Path::to_path_buf).unwrap_or_else(|| start.clone())
        } else {
            start.clone()
        };
        debug!("searching for {} upwards from {}", marker_name, start_dir.display());

        for dir in start_dir.ancestors() {
            let candidate = dir.join(&marker_name);
            if candidate.is_file() {
                info!("root config found at {}", candidate.display());
                return Ok(candidate);
            }
        }

        Err(IndexError::Discovery(format!(
            "no root config: could not find {marker_name} searching upwards from {}\n\
             If this is a new project, create {marker_name} at the project root with\n\
             index:\n  types: [file, item]\n  identifiers: {{file: .file.index, item: .item.index}}\n\
             and a root definition (root.file.index, root.item.index) for every type.",
            start_dir.display()
        )))
    }

    /// Resolve every effective index definition of the tree containing `start`.
    pub fn resolve(&self, start: &Path) -> Result<IndexDefinitions> {
        let root_marker = self.find_root_marker(start)?;
        let root_dir = root_marker
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let root_config = self.load_root_config(&root_marker)?;
        let (types, identifiers) = read_index_section(&root_config, &root_marker)?;
        info!("root config OK: types {:?}", types);

        let kind_by_suffix: BTreeMap<String, String> = identifiers
            .iter()
            .map(|(kind, suffix)| (suffix.clone(), kind.clone()))
            .collect();

        let suffixes: Vec<String> = kind_by_suffix.keys().cloned().collect();
        let found = walk::find_by_suffix(
            &root_dir,
            &suffixes,
            &WalkOptions {
                prune: &[],
                follow_links: self.config.follow_links,
            },
        );

        let mut raw = Vec::new();
        for (suffix, paths) in &found {
            let kind = &kind_by_suffix[suffix];
            for path in paths {
                let path = walk::canonical(path);
                let name = if path == root_marker {
                    ROOT_NAME.to_string()
                } else {
                    walk::strip_suffix(&path, suffix)
                };
                let config = load_yaml_mapping(&path)?;
                debug!("found {} index '{}' at {}", kind, name, path.display());
                raw.push(RawDefinition {
                    name,
                    kind: kind.clone(),
                    config,
                    path,
                });
            }
        }

        let (roots, definitions) = inherit(&types, &identifiers, raw)?;
        info!(
            "resolved {} index definitions under {}",
            definitions.len(),
            root_dir.display()
        );

        Ok(IndexDefinitions {
            root_dir,
            root_marker,
            root_config,
            types,
            identifiers,
            roots,
            definitions,
        })
    }

    fn load_root_config(&self, root_marker: &Path) -> Result<Mapping> {
        let marker = load_yaml(root_marker)?;
        let merged = match &self.config.base_config {
            Some(base) if base.is_file() => {
                debug!("merging root config over base config {}", base.display());
                merge(&load_yaml(base)?, &marker)
            }
            Some(base) => {
                warn!("base config {} does not exist, ignoring it", base.display());
                marker
            }
            None => marker,
        };
        match merged {
            Value::Mapping(m) => Ok(m),
            other => Err(IndexError::config(
                root_marker,
                format!("root config must be a mapping, found {other:?}"),
            )),
        }
    }
}

fn read_index_section(
    root_config: &Mapping,
    root_marker: &Path,
) -> Result<(Vec<String>, BTreeMap<String, String>)> {
    let Some(section) = root_config.get("index") else {
        return Err(IndexError::config(
            root_marker,
            "missing index section in root config",
        ));
    };
    let section: IndexSection = serde_yaml::from_value(section.clone()).map_err(|e| {
        IndexError::config(
            root_marker,
            format!("index section must hold types: [..] and identifiers: {{type: suffix}}: {e}"),
        )
    })?;
    let (Some(declared), Some(identifiers)) = (section.types, section.identifiers) else {
        return Err(IndexError::config(
            root_marker,
            "index section needs both types and identifiers",
        ));
    };

    let mut types: Vec<String> = Vec::with_capacity(declared.len());
    for t in declared {
        if !types.contains(&t) {
            types.push(t);
        }
    }

    if types.len() != identifiers.len() {
        let detail = format!(
            "types {:?} vs identifiers {:?}",
            types,
            identifiers.iter().collect::<Vec<_>>()
        );
        let message = if identifiers.len() > types.len() {
            format!("no index types declared for some identifiers: {detail}")
        } else {
            format!("no identifiers declared for some index types: {detail}")
        };
        return Err(IndexError::config(root_marker, message));
    }
    if let Some(unmapped) = types.iter().find(|t| !identifiers.contains_key(*t)) {
        return Err(IndexError::config(
            root_marker,
            format!(
                "index type '{unmapped}' has no identifier; identifiers are declared for {:?}",
                identifiers.keys().collect::<Vec<_>>()
            ),
        ));
    }
    if let Some((kind, _)) = identifiers.iter().find(|(_, s)| s.is_empty()) {
        return Err(IndexError::config(
            root_marker,
            format!("index type '{kind}' has an empty identifier"),
        ));
    }

    let mut kind_by_suffix: BTreeMap<&str, &str> = BTreeMap::new();
    for (kind, suffix) in &identifiers {
        if let Some(previous) = kind_by_suffix.insert(suffix.as_str(), kind.as_str()) {
            return Err(IndexError::config(
                root_marker,
                format!(
                    "index types '{previous}' and '{kind}' share the identifier '{suffix}'; \
                     every type needs its own"
                ),
            ));
        }
    }
    Ok((types, identifiers))
}

/// Partition raw definitions into one root per type and its children, and
/// merge every child onto its root.
fn inherit(
    types: &[String],
    identifiers: &BTreeMap<String, String>,
    raw: Vec<RawDefinition>,
) -> Result<(BTreeMap<String, Arc<IndexDefinition>>, Vec<Arc<IndexDefinition>>)> {
    let mut roots = BTreeMap::new();
    let mut definitions = Vec::new();
    let mut missing_roots = Vec::new();

    for kind in types {
        let (root_defs, children): (Vec<&RawDefinition>, Vec<&RawDefinition>) = raw
            .iter()
            .filter(|d| &d.kind == kind)
            .partition(|d| d.name == ROOT_NAME);

        let root = match root_defs.as_slice() {
            [] => {
                missing_roots.push(format!("{ROOT_NAME}{}", identifiers[kind]));
                continue;
            }
            [root] => *root,
            many => {
                return Err(IndexError::Discovery(format!(
                    "multiple root definitions for index type '{kind}':\n{}",
                    many.iter()
                        .map(|d| d.path.display().to_string())
                        .collect::<Vec<_>>()
                        .join("\n")
                )))
            }
        };

        if children.is_empty() {
            return Err(IndexError::Discovery(format!(
                "no index config files found for type '{kind}': create at least one <name>{} \
                 next to your sources (root definition at {})",
                identifiers[kind],
                root.path.display()
            )));
        }

        let root_def = Arc::new(IndexDefinition::root(kind, root.config.clone(), &root.path)?);
        for child in children {
            if !child.config.contains_key("identifier") {
                return Err(IndexError::config(
                    &child.path,
                    format!("{kind} index '{}' has no identifier", child.name),
                ));
            }
            let merged = super::merge::merge_mappings(&root_def.config, &child.config);
            let def = IndexDefinition::effective(&child.name, kind, merged, &child.path)?;
            debug!("effective index: {}", def);
            definitions.push(Arc::new(def));
        }
        roots.insert(kind.clone(), root_def);
    }

    if !missing_roots.is_empty() {
        return Err(IndexError::Discovery(format!(
            "missing root definitions: every index type needs a base config named root to \
             inherit from; create:\n{}",
            missing_roots.join("\n")
        )));
    }

    Ok((roots, definitions))
}
