//! The workspace symbol index: `SymbolIndex`'s batched refresh and
//! bounded-wait `LIKE` query surface over `nova-storage`'s relational
//! symbol tables, gated by [`IndexingService`]'s enabled/disabled flag.

mod indexing_service;
mod scanner;
mod symbol_index;

pub use indexing_service::IndexingService;
pub use scanner::{JarScanner, NoopScanner, WorkspaceScanner};
pub use symbol_index::{
    SymbolIndex, DEFAULT_BATCH_SIZE, INDEX_QUERY_TIMEOUT_MS, PROGRESS_UPDATE_INTERVAL_MS,
};
