//! Deep merge of YAML configuration values.
//!
//! A child configuration inherits everything from its parent and overrides
//! what it redefines. Mappings merge key by key, recursively; every other value
//! (scalars, sequences, null) in the child replaces the parent's wholesale.

use serde_yaml::{Mapping, Value};

/// Merge `child` onto `parent`, returning the merged value.
///
/// Parent keys keep their order; keys only the child defines follow in the
/// child's order.
pub fn merge(parent: &Value, child: &Value) -> Value {
    match (parent, child) {
        (Value::Mapping(p), Value::Mapping(c)) => Value::Mapping(merge_mappings(p, c)),
        (Value::Tagged(p), Value::Tagged(c)) if p.tag == c.tag => {
            let mut tagged = (**c).clone();
            tagged.value = merge(&p.value, &c.value);
            Value::Tagged(Box::new(tagged))
        }
        _ => child.clone(),
    }
}

pub fn merge_mappings(parent: &Mapping, child: &Mapping) -> Mapping {
    let mut merged = Mapping::with_capacity(parent.len() + child.len());
    for (key, value) in parent {
        let value = match child.get(key) {
            Some(overlay) => merge(value, overlay),
            None => value.clone(),
        };
        merged.insert(key.clone(), value);
    }
    for (key, value) in child {
        if !parent.contains_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}
