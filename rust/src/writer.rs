//! Writing indexed file content back to disk.

use crate::error::{IndexError, Result};
use crate::model::IndexedFile;
use chrono::{Local, NaiveTime};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where [`write_file`] puts its output.
#[derive(Debug, Clone)]
pub enum Destination {
    Path(PathBuf),
    /// `dir` defaults to the file's own directory, `name` to a timestamped
    /// variant of the file's name.
    Folder {
        dir: Option<PathBuf>,
        name: Option<String>,
    },
}

impl Default for Destination {
    fn default() -> Self {
        Self::Folder {
            dir: None,
            name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    pub overwrite: bool,
    /// Copy an existing destination to `<path>.bak` before replacing it.
    pub backup: bool,
}

/// `<name>.<H>_<M>_<S>.<ext>`, where `ext` is the file's index suffix
/// without its leading dot.
pub fn default_file_name(file: &IndexedFile, time: NaiveTime) -> String {
    let extension = file
        .definition
        .suffix()
        .map(|s| s.trim_start_matches('.').to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| file.extension().map(str::to_string))
        .unwrap_or_default();
    format!("{}.{}.{}", file.name, time.format("%H_%M_%S"), extension)
}

fn resolve_destination(file: &IndexedFile, destination: &Destination) -> PathBuf {
    match destination {
        Destination::Path(path) => path.clone(),
        Destination::Folder { dir, name } => {
            let dir = dir.as_deref().unwrap_or_else(|| file.directory());
            let name = name
                .clone()
                .unwrap_or_else(|| default_file_name(file, Local::now().time()));
            dir.join(name)
        }
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Write the content of `file` to `destination` and return the file as it now
/// exists there. `file` itself is left as it was.
pub fn write_file(
    file: &IndexedFile,
    destination: &Destination,
    options: WriteOptions,
) -> Result<IndexedFile> {
    let path = resolve_destination(file, destination);

    if path.exists() {
        if !options.overwrite {
            return Err(IndexError::Conflict(path));
        }
        if options.backup {
            let backup = backup_path(&path);
            fs::copy(&path, &backup).map_err(|e| IndexError::io(&backup, e))?;
            info!("backed up {} to {}", path.display(), backup.display());
        } else {
            warn!("overwriting {}", path.display());
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IndexError::io(parent, e))?;
    }
    fs::write(&path, file.content()).map_err(|e| IndexError::io(&path, e))?;
    info!("wrote {} to {}", file.name, path.display());

    IndexedFile::load(&path, file.definition.clone())
}
