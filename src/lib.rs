// Selector Index - incremental class/id selector indexing
//
// Extracts class and id selectors from stylesheets, markup and templates,
// keeps them current as documents change, and serves them as completion
// candidates together with the files that reference them.
// Architecture: extractors -> discovery -> dispatch -> store -> completion.

pub mod completion;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extractors;
pub mod index;
pub mod language;
pub mod session;
pub mod utils;
pub mod watcher;

pub use completion::{AttributeContext, CompletionCandidate, CompletionProjector, Dialect};
pub use config::IndexConfig;
pub use discovery::{DocumentSource, InMemorySource, WorkspaceSource};
pub use error::IndexError;
pub use extractors::{
    DocumentId, Extractor, ExtractorRegistry, FnExtractor, SelectorDefinition, SelectorKind,
};
pub use index::{IndexStore, ParseDispatcher, RebuildSummary, SelectorLookup};
pub use session::{PatchOutcome, RebuildStatus, RebuildTrigger, SelectorIndex};
pub use watcher::SaveWatcher;
