//! Compilation of tag templates into regular expressions.
//!
//! A template is regex text with placeholders:
//!
//! * `{tag}`: the dictionary fragment for `tag`, captured as group `tag`
//! * `{tag:alias}`: the dictionary fragment for `tag`, captured as `alias`
//! * `{tag:REGEX}`: an inline fragment captured as `tag`; anything after the
//!   colon that is not a plain identifier counts as inline regex
//!
//! A `{` that does not open a placeholder (e.g. the quantifier `{2,3}`) is
//! plain regex text. End templates may reference tags the dictionary lacks;
//! those stay unresolved until a start match supplies a captured value.

use crate::error::{IndexError, Result};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Placeholder {
        tag: String,
        alias: Option<String>,
        inline: Option<String>,
    },
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_char)
}

/// Try to read a placeholder starting at `open` (the index of a `{`).
/// Returns the token and the index just past its closing brace.
fn read_placeholder(template: &str, open: usize) -> Option<(Token, usize)> {
    let rest = &template[open + 1..];
    let tag_len = rest
        .char_indices()
        .find(|&(i, c)| if i == 0 { !is_ident_start(c) } else { !is_ident_char(c) })
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    if tag_len == 0 {
        return None;
    }
    let tag = rest[..tag_len].to_string();
    let after = &rest[tag_len..];

    if after.starts_with('}') {
        let end = open + 1 + tag_len + 1;
        return Some((
            Token::Placeholder {
                tag,
                alias: None,
                inline: None,
            },
            end,
        ));
    }
    if !after.starts_with(':') {
        return None;
    }

    // balance braces in the part after the colon, honouring backslash escapes
    let part_start = open + 1 + tag_len + 1;
    let mut depth = 1usize;
    let mut escaped = false;
    for (i, c) in template[part_start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let part = &template[part_start..part_start + i];
                    let (alias, inline) = if is_identifier(part) {
                        (Some(part.to_string()), None)
                    } else {
                        (None, Some(part.to_string()))
                    };
                    return Some((Token::Placeholder { tag, alias, inline }, part_start + i + 1));
                }
            }
            _ => {}
        }
    }
    None
}

fn tokenize(template: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < template.len() {
        let c = template[i..].chars().next().unwrap_or_default();
        if c == '\\' {
            // keep escapes verbatim so `\{` never opens a placeholder
            literal.push(c);
            if let Some(next) = template[i + 1..].chars().next() {
                literal.push(next);
                i += 1 + next.len_utf8();
            } else {
                i += 1;
            }
            continue;
        }
        if c == '{' {
            if let Some((token, end)) = read_placeholder(template, i) {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(token);
                i = end;
                continue;
            }
        }
        literal.push(c);
        i += c.len_utf8();
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

/// Names of the placeholder tags in `template`, in order of appearance.
pub fn placeholder_tags(template: &str) -> Vec<String> {
    tokenize(template)
        .into_iter()
        .filter_map(|t| match t {
            Token::Placeholder { tag, .. } => Some(tag),
            Token::Literal(_) => None,
        })
        .collect()
}

/// Piece of a compiled end template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Pattern(String),
    /// Bound from the start match's capture of the same name.
    Late(String),
}

/// End template whose unresolved tags are bound per start match.
#[derive(Debug, Clone)]
pub struct EndTemplate {
    pub template: String,
    segments: Vec<Segment>,
}

impl EndTemplate {
    pub fn late_tags(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Late(tag) => Some(tag.as_str()),
            Segment::Pattern(_) => None,
        })
    }

    pub fn is_static(&self) -> bool {
        self.late_tags().next().is_none()
    }

    /// Substitute every late tag with the escaped captured value. On failure
    /// returns the first tag without a value.
    pub fn bind(&self, captures: &BTreeMap<String, String>) -> std::result::Result<String, String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Pattern(p) => out.push_str(p),
                Segment::Late(tag) => match captures.get(tag) {
                    Some(value) => out.push_str(&regex::escape(value)),
                    None => return Err(tag.clone()),
                },
            }
        }
        Ok(out)
    }
}

/// Compiles templates against one definition's tag dictionary.
pub struct TemplateCompiler<'a> {
    tags: &'a BTreeMap<String, String>,
    source: PathBuf,
}

impl<'a> TemplateCompiler<'a> {
    pub fn new(tags: &'a BTreeMap<String, String>, source: &Path) -> Self {
        Self {
            tags,
            source: source.to_path_buf(),
        }
    }

    fn unresolved(&self, tag: &str, template: &str) -> IndexError {
        IndexError::UnresolvedTag {
            tag: tag.to_string(),
            template: template.to_string(),
            path: self.source.clone(),
        }
    }

    /// Expand `template` into regex text. Unknown tags are handed to
    /// `on_missing`, which either fails or records a late segment.
    fn expand(
        &self,
        template: &str,
        mut on_missing: impl FnMut(&str) -> Result<()>,
        mut emit: impl FnMut(Segment),
    ) -> Result<()> {
        let mut groups = HashSet::new();
        let mut group = |name: &str, fragment: &str| {
            if groups.insert(name.to_string()) {
                format!("(?P<{name}>{fragment})")
            } else {
                format!("(?:{fragment})")
            }
        };
        for token in tokenize(template) {
            match token {
                Token::Literal(text) => emit(Segment::Pattern(text)),
                Token::Placeholder {
                    tag,
                    inline: Some(fragment),
                    ..
                } => emit(Segment::Pattern(group(&tag, &fragment))),
                Token::Placeholder { tag, alias, .. } => match self.tags.get(&tag) {
                    Some(fragment) => {
                        let name = alias.as_deref().unwrap_or(&tag);
                        emit(Segment::Pattern(group(name, fragment)));
                    }
                    None => {
                        on_missing(&tag)?;
                        emit(Segment::Late(tag));
                    }
                },
            }
        }
        Ok(())
    }

    fn build(&self, pattern: &str) -> Result<Regex> {
        Regex::new(pattern).map_err(|source| IndexError::InvalidPattern {
            pattern: pattern.to_string(),
            path: self.source.clone(),
            source,
        })
    }

    /// Compile a start template; every tag must resolve. Multi-line mode is
    /// on, so `^` and `$` match at line boundaries.
    pub fn compile_start(&self, template: &str) -> Result<Regex> {
        let mut pattern = String::from("(?m)");
        self.expand(
            template,
            |tag| Err(self.unresolved(tag, template)),
            |segment| {
                if let Segment::Pattern(p) = segment {
                    pattern.push_str(&p);
                }
            },
        )?;
        self.build(&pattern)
    }

    /// Compile an end template, leaving unknown tags for late binding.
    pub fn compile_end(&self, template: &str) -> Result<EndTemplate> {
        let mut segments: Vec<Segment> = Vec::new();
        self.expand(template, |_| Ok(()), |segment| {
            if let (Some(Segment::Pattern(prev)), Segment::Pattern(p)) =
                (segments.last_mut(), &segment)
            {
                prev.push_str(p);
                return;
            }
            segments.push(segment);
        })?;
        let end = EndTemplate {
            template: template.to_string(),
            segments,
        };
        if end.is_static() {
            // fail early on a broken static end pattern
            self.build(&anchored(&end.bind(&BTreeMap::new()).unwrap_or_default()))?;
        }
        Ok(end)
    }

    /// Compile a start/end pair and check that every late tag of the end
    /// template names a capture group of the start pattern.
    pub fn compile_pair(&self, start: &str, end: &str) -> Result<(Regex, EndTemplate)> {
        let start_regex = self.compile_start(start)?;
        let end_template = self.compile_end(end)?;
        let groups: HashSet<&str> = start_regex.capture_names().flatten().collect();
        if let Some(tag) = end_template.late_tags().find(|t| !groups.contains(t)) {
            return Err(self.unresolved(tag, end));
        }
        Ok((start_regex, end_template))
    }
}

/// Anchor a pattern at the start of the text it is matched against.
pub fn anchored(pattern: &str) -> String {
    format!("^(?:{pattern})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn tokenizes_placeholders_and_literal_braces() {
        assert_eq!(
            placeholder_tags(r"x{2,3} {name} {kind:k} {id:[a-z]{2}} \{literal}"),
            vec!["name", "kind", "id"]
        );
    }

    #[test]
    fn start_uses_tag_or_alias_as_group_name() {
        let dict = tags(&[("name", "[a-z]+"), ("ws", r"\s+")]);
        let compiler = TemplateCompiler::new(&dict, Path::new("t.item.index"));
        let re = compiler.compile_start("#BEGIN{ws}{name:block}{ws}").unwrap();
        let caps = re.captures("#BEGIN  foo ").unwrap();
        assert_eq!(&caps["block"], "foo");
        assert_eq!(&caps["ws"], "  ");
    }

    #[test]
    fn inline_fragment_needs_no_dictionary_entry() {
        let dict = BTreeMap::new();
        let compiler = TemplateCompiler::new(&dict, Path::new("t.item.index"));
        let re = compiler.compile_start("#BEGIN {name:[a-z]+}").unwrap();
        assert_eq!(&re.captures("#BEGIN foo").unwrap()["name"], "foo");
    }

    #[test]
    fn unknown_start_tag_is_a_configuration_error() {
        let dict = BTreeMap::new();
        let compiler = TemplateCompiler::new(&dict, Path::new("t.item.index"));
        let err = compiler.compile_start("#BEGIN {name}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("'name'"));
    }

    #[test]
    fn end_keeps_unknown_tags_for_late_binding() {
        let dict = tags(&[("ws", r"\s*")]);
        let compiler = TemplateCompiler::new(&dict, Path::new("t.item.index"));
        let end = compiler.compile_end("{ws}#END {block}").unwrap();
        assert_eq!(end.late_tags().collect::<Vec<_>>(), vec!["block"]);

        let bound = end.bind(&tags(&[("block", "a.b")])).unwrap();
        assert_eq!(bound, r"(?P<ws>\s*)#END a\.b");
        assert_eq!(end.bind(&BTreeMap::new()), Err("block".to_string()));
    }

    #[test]
    fn end_tag_missing_from_start_groups_cannot_be_bound() {
        let dict = BTreeMap::new();
        let compiler = TemplateCompiler::new(&dict, Path::new("t.item.index"));
        let err = compiler
            .compile_pair("#BEGIN {name:[a-z]+}", "#END {other}")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("'other'"));
    }

    #[test]
    fn repeated_group_names_become_non_capturing() {
        let dict = tags(&[("ws", r"\s+")]);
        let compiler = TemplateCompiler::new(&dict, Path::new("t.item.index"));
        assert!(compiler.compile_start("a{ws}b{ws}c").is_ok());
    }
}
