//! Nova's LSP frontend: translates `lsp-server`'s JSON-RPC request/notification
//! stream into calls against [`SourcePath`](nova_vfs::SourcePath),
//! [`IndexingService`](nova_index::IndexingService) and friends.

mod cache;
mod definition;
mod diagnostics;
mod server;

pub use cache::{CacheKey, LspCacheManager, CACHE_CAPACITY};
pub use definition::GoToDefinition;
pub use diagnostics::{DiagnosticsClient, DiagnosticsManager, LintAction};
pub use server::Server;
