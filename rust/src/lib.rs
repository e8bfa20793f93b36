pub mod config;
pub mod container;
pub mod error;
pub mod extract;
pub mod indexer;
pub mod logging;
pub mod model;
pub mod record;
pub mod walk;
pub mod writer;

// Re-export main types and functions
pub use config::{merge, IndexDefinition, IndexDefinitions, IndexerConfig, Resolver};
pub use container::{ComponentContainer, Scope};
pub use error::{ErrorKind, IndexError, Result};
pub use extract::{extract_items, ItemMatcher, TemplateCompiler};
pub use indexer::{IndexState, IndexView, SourceIndexer};
pub use model::{Component, ComponentKind, Dependency, IndexedFile, IndexedItem, Project};
pub use record::{write_json, ComponentRecord};
pub use writer::{write_file, Destination, WriteOptions};
