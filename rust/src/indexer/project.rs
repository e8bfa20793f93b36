//! Project configs and the transitive closure of their dependencies.

use crate::config::load_yaml;
use crate::error::{IndexError, Result};
use crate::model::{Dependency, Project};
use crate::walk;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct ProjectConfig {
    name: Option<String>,
    #[serde(default)]
    dependencies: Vec<Dependency>,
}

impl Project {
    /// Load the project described by the config at `path`. The root marker
    /// (`marker_name`) may omit `name`; its directory name is used instead.
    pub fn load(path: &Path, marker_name: &str) -> Result<Self> {
        let path = walk::canonical(path);
        let config: ProjectConfig =
            serde_yaml::from_value(load_yaml(&path)?).map_err(|source| IndexError::Yaml {
                path: path.clone(),
                source,
            })?;

        let is_marker = path.file_name().is_some_and(|n| n == marker_name);
        let name = match config.name {
            Some(name) => name,
            None if is_marker => path
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            None => return Err(IndexError::config(&path, "project config has no 'name'")),
        };

        Ok(Self {
            name,
            path,
            dependencies: config.dependencies,
        })
    }

    /// Config path of `dependency`, relative to this project's directory. A
    /// directory stands for the root marker inside it.
    pub fn dependency_path(&self, dependency: &Dependency, marker_name: &str) -> Result<PathBuf> {
        let mut candidate = self.directory().join(&dependency.path);
        if candidate.is_dir() {
            candidate = candidate.join(marker_name);
        }
        if !candidate.is_file() {
            return Err(IndexError::Discovery(format!(
                "dependency '{}' of project '{}' ({}): no config at {}",
                dependency.name,
                self.name,
                self.path.display(),
                candidate.display()
            )));
        }
        Ok(walk::canonical(&candidate))
    }

    /// This project followed by every project it depends on, directly or
    /// not, each once.
    pub fn with_dependencies(&self, marker_name: &str) -> Result<Vec<Project>> {
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut resolved = Vec::new();
        let mut pending = vec![self.clone()];

        while let Some(project) = pending.pop() {
            if !visited.insert(project.path.clone()) {
                debug!("project {} already visited", project.path.display());
                continue;
            }
            // reversed so the first declared dependency is handled first
            for dependency in project.dependencies.iter().rev() {
                let path = project.dependency_path(dependency, marker_name)?;
                if visited.contains(&path) {
                    debug!(
                        "dependency cycle: {} -> {}",
                        project.name,
                        path.display()
                    );
                    continue;
                }
                pending.push(Project::load(&path, marker_name)?);
            }
            resolved.push(project);
        }
        Ok(resolved)
    }
}

/// Projects declared as dependencies of the base config at `path`, with
/// their own dependencies. The base config itself is not a project.
pub fn base_dependencies(path: &Path, marker_name: &str) -> Result<Vec<Project>> {
    let path = walk::canonical(path);
    let config: ProjectConfig =
        serde_yaml::from_value(load_yaml(&path)?).map_err(|source| IndexError::Yaml {
            path: path.clone(),
            source,
        })?;
    if config.dependencies.is_empty() {
        return Ok(Vec::new());
    }
    let base = Project {
        name: config.name.unwrap_or_else(|| "base".to_string()),
        path,
        dependencies: config.dependencies,
    };
    let mut projects = base.with_dependencies(marker_name)?;
    projects.remove(0);
    Ok(projects)
}
