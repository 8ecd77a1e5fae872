pub mod config;
pub mod context;
pub mod diff;
pub mod engine;
pub mod events;
pub mod filter;
pub mod identifiers;
pub mod manifest;
pub mod paths;
pub mod reconcile;
pub mod scan;

pub use config::{CleanerConfig, ConfigError, RawConfig};
pub use context::RunContext;
pub use diff::{DiffResult, compute_diff};
pub use engine::{Cleaner, CleanerError, RunOutcome, RunSummary};
pub use events::{ChannelSink, EventSink, Level, RunEvent, RunState, TracingSink};
pub use filter::FilterRules;
pub use manifest::{ExpectedFileSet, FetchOutcome, ManifestFetcher};
pub use reconcile::DeletionReport;
pub use scan::{LocalFileSet, LocalTree};
