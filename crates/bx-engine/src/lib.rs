//! Public engine API for branchdex: the orchestrator that ties the git
//! probe, chunker/hasher, client cache, remote client, scanner, and
//! watcher together behind `Start`/`Search`/`State`/`Clear`.

mod config;
mod engine;
mod pipeline;
mod scanner;
mod watcher;

pub use bx_index::{IndexerState, Status};
pub use bx_remote::SearchResult;

pub use config::{EngineConfig, DEFAULT_SUPPORTED_EXTENSIONS};
pub use engine::{Engine, Handle};
pub use scanner::{ScanResult, Scanner};
pub use watcher::{Watcher, WatcherError};
