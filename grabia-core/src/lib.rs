mod client;
mod manifest;

pub use client::{ArchiveClient, ArchiveError, CONNECTION_TIMEOUT, USER_AGENT};
pub use manifest::{ItemMetadata, ManifestFile};
