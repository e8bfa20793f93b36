use crate::model::{Component, ComponentKind, Dependency};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Serializable summary of one component.
#[derive(Serialize, Debug, Clone)]
pub struct ComponentRecord {
    pub id: String,
    pub kind: ComponentKind,
    pub name: String,
    /// Path relative to the indexed root.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_end: Option<usize>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

pub fn sha256_id(kind: ComponentKind, rel_path: &str, qual_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.to_string().as_bytes());
    hasher.update([0x1f_u8]);
    hasher.update(rel_path.as_bytes());
    hasher.update([0x1f_u8]);
    hasher.update(qual_name.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn rel_path(root: &Path, path: &Path) -> String {
    pathdiff::diff_paths(path, root)
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

impl ComponentRecord {
    pub fn new(root: &Path, component: &Component) -> Self {
        let path = rel_path(root, component.path());
        let definition = component.definition();
        // items of one file may share a name, so the start line disambiguates
        let qual_name = match component {
            Component::Item(item) => {
                format!("{}::{}:{}", item.definition.name, item.name, item.line_start)
            }
            other => other.name().to_string(),
        };

        Self {
            id: sha256_id(component.kind(), &path, &qual_name),
            kind: component.kind(),
            name: component.name().to_string(),
            path,
            definition: definition.map(|d| d.name.clone()),
            index_type: definition.map(|d| d.kind.clone()),
            line_start: component.lines().map(|(start, _)| start),
            line_end: component.lines().map(|(_, end)| end),
            properties: component
                .as_item()
                .map(|i| i.properties.clone())
                .unwrap_or_default(),
            dependencies: component
                .as_project()
                .map(|p| p.dependencies.clone())
                .unwrap_or_default(),
        }
    }
}

/// Write `records` as one JSON array.
pub fn write_json(records: &[ComponentRecord], out: &mut dyn Write) -> io::Result<()> {
    let mut buf = BufWriter::new(out);
    buf.write_all(b"[")?;
    let mut first = true;
    for r in records {
        if !first {
            buf.write_all(b",")?;
        }
        serde_json::to_writer(&mut buf, r)?;
        first = false;
    }
    buf.write_all(b"]\n")?;
    buf.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexDefinition;
    use crate::model::{IndexedFile, IndexedItem};
    use std::sync::Arc;

    fn item() -> Component {
        let file_def = IndexDefinition::effective(
            "notes",
            "file",
            serde_yaml::from_str("identifier: .md\n").unwrap(),
            Path::new("notes.file.index"),
        )
        .unwrap();
        let item_def = IndexDefinition::effective(
            "section",
            "item",
            serde_yaml::from_str("identifier: {start: '#BEGIN', end: '#END'}\n").unwrap(),
            Path::new("section.item.index"),
        )
        .unwrap();
        let file = Arc::new(IndexedFile::new(
            "todo",
            "/work/docs/todo.md",
            Arc::new(file_def),
            "#BEGIN\nx\n#END\n",
        ));
        let mut properties = BTreeMap::new();
        properties.insert("level".to_string(), "2".to_string());
        IndexedItem::new("intro", file, Arc::new(item_def), 1, 3, properties).into()
    }

    #[test]
    fn record_uses_relative_path_and_stable_id() {
        let root = Path::new("/work");
        let a = ComponentRecord::new(root, &item());
        let b = ComponentRecord::new(root, &item());

        assert_eq!(a.path, "docs/todo.md");
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 64);
        assert_eq!(a.definition.as_deref(), Some("section"));
        assert_eq!((a.line_start, a.line_end), (Some(1), Some(3)));
    }

    #[test]
    fn writes_json_array() {
        let record = ComponentRecord::new(Path::new("/work"), &item());
        let mut out = Vec::new();
        write_json(&[record.clone(), record], &mut out).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let array = parsed.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["kind"], "item");
        assert_eq!(array[0]["properties"]["level"], "2");
        assert!(array[0].get("dependencies").is_none());
    }
}
