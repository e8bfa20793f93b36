//! Template compilation and item extraction.

pub mod scanner;
pub mod template;

pub use scanner::{compile_all, extract_items, ItemMatcher};
pub use template::{EndTemplate, Segment, TemplateCompiler};
