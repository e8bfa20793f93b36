use crate::error::{IndexError, Result};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const ROOT_NAME: &str = "root";
pub const FILE_KIND: &str = "file";
pub const ITEM_KIND: &str = "item";
pub const IGNORE_KIND: &str = "ignore";

/// Tag used as the end template when an item definition configures none.
pub const END_DEFAULT_TAG: &str = "end_default";

/// How files or items of a definition are recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// Root definitions only supply defaults and never identify anything.
    Inherited,
    /// File name suffix, for every non-item kind.
    Suffix(String),
    /// Start/end template pair for item definitions.
    Template { start: String, end: Option<String> },
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inherited => write!(f, "(inherited)"),
            Self::Suffix(s) => write!(f, "{s}"),
            Self::Template { start, end: Some(end) } => write!(f, "{start} ... {end}"),
            Self::Template { start, end: None } => write!(f, "{start} ... (default end)"),
        }
    }
}

/// One index definition loaded from a config file, either a root definition or
/// the effective (merged) definition of a child.
#[derive(Debug, Clone)]
pub struct IndexDefinition {
    pub name: String,
    pub kind: String,
    pub identifier: Identifier,
    pub parse_tags: BTreeMap<String, String>,
    pub config: Mapping,
    pub source: PathBuf,
}

impl PartialEq for IndexDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

impl Eq for IndexDefinition {}

impl IndexDefinition {
    /// Build a root definition. Its identifier is never read.
    pub fn root(kind: &str, config: Mapping, source: &Path) -> Result<Self> {
        Ok(Self {
            name: ROOT_NAME.to_string(),
            kind: kind.to_string(),
            identifier: Identifier::Inherited,
            parse_tags: parse_tags(&config, source)?,
            config,
            source: source.to_path_buf(),
        })
    }

    /// Build an effective child definition from its merged config.
    pub fn effective(name: &str, kind: &str, config: Mapping, source: &Path) -> Result<Self> {
        let identifier = parse_identifier(name, kind, &config, source)?;
        Ok(Self {
            name: name.to_string(),
            kind: kind.to_string(),
            identifier,
            parse_tags: parse_tags(&config, source)?,
            config,
            source: source.to_path_buf(),
        })
    }

    pub fn is_root(&self) -> bool {
        self.name == ROOT_NAME
    }

    pub fn suffix(&self) -> Option<&str> {
        match &self.identifier {
            Identifier::Suffix(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a top-level config value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// Tag dictionary used to compile this definition's templates: every
    /// scalar config value, overridden by the declared parse tags.
    pub fn tag_dictionary(&self) -> BTreeMap<String, String> {
        let mut tags: BTreeMap<String, String> = self
            .config
            .iter()
            .filter_map(|(k, v)| Some((k.as_str()?.to_string(), scalar_to_string(v)?)))
            .collect();
        tags.extend(self.parse_tags.clone());
        tags
    }

    pub fn matches(&self, query: &str) -> bool {
        self.name == query || self.kind == query
    }
}

impl fmt::Display for IndexDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.name, self.kind, self.identifier)
    }
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lookup<'a>(config: &'a Mapping, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| config.get(*k))
}

fn parse_tags(config: &Mapping, source: &Path) -> Result<BTreeMap<String, String>> {
    let Some(value) = lookup(config, &["parseTags", "parse_tags"]) else {
        return Ok(BTreeMap::new());
    };
    let Some(map) = value.as_mapping() else {
        return Err(IndexError::config(
            source,
            "parseTags must be a mapping of tag name to regex fragment",
        ));
    };
    let mut tags = BTreeMap::new();
    for (k, v) in map {
        let (Some(tag), Some(fragment)) = (k.as_str(), scalar_to_string(v)) else {
            return Err(IndexError::config(
                source,
                format!("parseTags entry {k:?} must map a tag name to a regex string"),
            ));
        };
        let tag = if tag == "endDefault" { END_DEFAULT_TAG } else { tag };
        tags.insert(tag.to_string(), fragment);
    }
    Ok(tags)
}

fn parse_identifier(name: &str, kind: &str, config: &Mapping, source: &Path) -> Result<Identifier> {
    let Some(value) = config.get("identifier") else {
        return Err(IndexError::config(
            source,
            format!("{kind} index '{name}' has no identifier"),
        ));
    };
    if kind != ITEM_KIND {
        return match value {
            Value::String(s) if !s.is_empty() => Ok(Identifier::Suffix(s.clone())),
            _ => Err(IndexError::config(
                source,
                format!(
                    "{kind} index '{name}' needs a string identifier naming the file suffix \
                     (e.g. .script.py), found {value:?}"
                ),
            )),
        };
    }
    let Some(map) = value.as_mapping() else {
        return Err(IndexError::config(
            source,
            format!("item index '{name}' needs identifier: {{start: <template>, end: <template>}}"),
        ));
    };
    let start = match map.get("start") {
        Some(Value::String(s)) => s.clone(),
        other => {
            return Err(IndexError::config(
                source,
                format!("item index '{name}' needs a string identifier.start, found {other:?}"),
            ))
        }
    };
    let end = match map.get("end") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            return Err(IndexError::config(
                source,
                format!("item index '{name}' identifier.end must be a string, found {other:?}"),
            ))
        }
    };
    Ok(Identifier::Template { start, end })
}
