//! The resource provider contract.
//!
//! A provider exposes a hierarchy of named entries. The checksum engine
//! never talks to a provider directly from worker threads; each worker
//! opens its own [`ProviderSession`] with [`ResourceProvider::connect`] and
//! keeps it for the lifetime of the computation.

use std::io::Read;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::node::Location;

/// How the engine should drive discovery for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DiscoveryMode {
    /// Low-latency listing, walked synchronously on the calling thread.
    #[default]
    Sequential,
    /// High-latency listing, each directory listed as a pool task.
    Parallel,
}

/// Kind of a listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Directory,
    File,
}

/// A single child returned by [`ProviderSession::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: CompactString,
    pub kind: EntryKind,
}

impl Entry {
    pub fn directory(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    pub fn file(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }
}

/// A pointer to content located elsewhere, to be spliced into the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
    /// Location relative to the listed directory, `/`-separated. May span
    /// several segments; missing intermediate directories are created.
    pub path: String,
    /// Provider-specific target (URL, submodule path, ...).
    pub target: String,
    /// Pinned revision, `None` for the head of the target.
    pub revision: Option<String>,
}

/// Kind and effective revision of a resolved external reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExternal {
    pub kind: EntryKind,
    pub revision: Option<String>,
}

/// Result of listing one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Immediate children in provider order.
    pub entries: Vec<Entry>,
    /// External references declared on the directory.
    pub externals: Vec<ExternalReference>,
}

impl Listing {
    /// Create a listing without external references.
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            externals: Vec::new(),
        }
    }
}

/// Source of a resource hierarchy.
pub trait ResourceProvider: Sync {
    /// Per-thread connection handle.
    type Session: ProviderSession;

    /// Name given to the root resource of the computed tree.
    fn root_name(&self) -> &str;

    /// Discovery strategy for this provider.
    fn discovery_mode(&self) -> DiscoveryMode {
        DiscoveryMode::Sequential
    }

    /// Open a new private session.
    fn connect(&self) -> Result<Self::Session, ProviderError>;
}

/// Connection handle owned by a single thread.
pub trait ProviderSession: Send {
    /// List the immediate children of a directory.
    fn list(&mut self, location: &Location) -> Result<Listing, ProviderError>;

    /// Open the content of a file. The stream yields the bytes to digest,
    /// after any normalization the provider applies.
    fn open(&mut self, location: &Location) -> Result<Box<dyn Read + '_>, ProviderError>;

    /// Resolve an external reference to its kind and revision.
    fn resolve_external(
        &mut self,
        reference: &ExternalReference,
    ) -> Result<ResolvedExternal, ProviderError> {
        let _ = reference;
        Err(ProviderError::Unsupported {
            operation: "resolve_external",
        })
    }
}
