use super::template::{anchored, EndTemplate, TemplateCompiler};
use crate::config::{Identifier, IndexDefinition, END_DEFAULT_TAG, ITEM_KIND};
use crate::error::{IndexError, Result};
use crate::model::{IndexedFile, IndexedItem, UNNAMED_ITEM};
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Compiled patterns of one item definition.
#[derive(Debug, Clone)]
pub struct ItemMatcher {
    pub definition: Arc<IndexDefinition>,
    start: Regex,
    end: EndTemplate,
    /// Prebuilt end pattern when the end template needs no late binding.
    static_end: Option<Regex>,
}

fn invalid(pattern: &str, definition: &IndexDefinition, source: regex::Error) -> IndexError {
    IndexError::InvalidPattern {
        pattern: pattern.to_string(),
        path: definition.source.clone(),
        source,
    }
}

impl ItemMatcher {
    pub fn compile(definition: &Arc<IndexDefinition>) -> Result<Self> {
        if definition.kind != ITEM_KIND {
            return Err(IndexError::config(
                &definition.source,
                format!(
                    "cannot extract items with {} index '{}'",
                    definition.kind, definition.name
                ),
            ));
        }
        let Identifier::Template { start, end } = &definition.identifier else {
            return Err(IndexError::config(
                &definition.source,
                format!("item index '{}' has no start/end identifier", definition.name),
            ));
        };

        let tags = definition.tag_dictionary();
        let end = match end {
            Some(end) => end.clone(),
            None => match tags.get(END_DEFAULT_TAG) {
                Some(default) => {
                    tracing::debug!(
                        "no end identifier for '{}', using {} '{}'",
                        definition.name,
                        END_DEFAULT_TAG,
                        default
                    );
                    default.clone()
                }
                None => {
                    return Err(IndexError::config(
                        &definition.source,
                        format!(
                            "item index '{}' has no identifier.end and no {} parse tag \
                             (usually declared in root.item.index)",
                            definition.name, END_DEFAULT_TAG
                        ),
                    ))
                }
            },
        };

        let compiler = TemplateCompiler::new(&tags, &definition.source);
        let (start, end) = compiler.compile_pair(start, &end)?;
        let static_end = if end.is_static() {
            let pattern = anchored(&end.bind(&BTreeMap::new()).unwrap_or_default());
            Some(Regex::new(&pattern).map_err(|e| invalid(&pattern, definition, e))?)
        } else {
            None
        };

        Ok(Self {
            definition: definition.clone(),
            start,
            end,
            static_end,
        })
    }

    /// Every item of this definition in `file`, in source order.
    pub fn extract(&self, file: &Arc<IndexedFile>) -> Result<Vec<IndexedItem>> {
        let text = file.content();
        let lines: Vec<&str> = text.lines().collect();
        let mut items = Vec::new();
        // newlines in text[..offset]; matches never overlap so offset only grows
        let mut offset = 0;
        let mut newlines = 0;

        for caps in self.start.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            newlines += text[offset..whole.start()].matches('\n').count();
            let line_start = newlines + 1;
            let matched = whole.as_str();
            newlines += matched.matches('\n').count();
            offset = whole.end();
            // lines before this index belong to the start match
            let search_from = if matched.ends_with('\n') {
                newlines
            } else {
                newlines + 1
            };

            let mut properties: BTreeMap<String, String> = self
                .start
                .capture_names()
                .flatten()
                .filter_map(|n| caps.name(n).map(|m| (n.to_string(), m.as_str().to_string())))
                .collect();

            let end: Cow<'_, Regex> = match &self.static_end {
                Some(re) => Cow::Borrowed(re),
                None => {
                    let bound = self.end.bind(&properties).map_err(|tag| IndexError::UnboundTag {
                        tag,
                        template: self.end.template.clone(),
                        path: file.path.clone(),
                        line: line_start,
                        captures: properties.clone(),
                    })?;
                    let pattern = anchored(&bound);
                    Cow::Owned(
                        Regex::new(&pattern).map_err(|e| invalid(&pattern, &self.definition, e))?,
                    )
                }
            };

            // the terminating line is searched after the start match, one line at a time
            let line_end = lines
                .iter()
                .enumerate()
                .skip(search_from)
                .find(|(_, line)| end.is_match(line))
                .map(|(idx, _)| idx + 1);

            let Some(line_end) = line_end else {
                return Err(IndexError::Unterminated {
                    path: file.path.clone(),
                    line: line_start,
                    start: self.start.as_str().to_string(),
                    end: end.as_str().to_string(),
                    properties,
                });
            };

            let name = properties
                .remove("name")
                .unwrap_or_else(|| UNNAMED_ITEM.to_string());
            items.push(IndexedItem::new(
                name,
                file.clone(),
                self.definition.clone(),
                line_start,
                line_end,
                properties,
            ));
        }
        Ok(items)
    }
}

/// Compile every item definition, in order.
pub fn compile_all(definitions: &[Arc<IndexDefinition>]) -> Result<Vec<ItemMatcher>> {
    definitions.iter().map(ItemMatcher::compile).collect()
}

/// Items of every matcher in `file`. The first failure aborts the file.
pub fn extract_items(file: &Arc<IndexedFile>, matchers: &[ItemMatcher]) -> Result<Vec<IndexedItem>> {
    let mut items = Vec::new();
    for matcher in matchers {
        items.extend(matcher.extract(file)?);
    }
    tracing::debug!("found {} items in {}", items.len(), file.path.display());
    Ok(items)
}
