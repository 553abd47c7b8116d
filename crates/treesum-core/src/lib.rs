//! Core types and traits for treesum.
//!
//! This crate provides the resource tree data model, the canonical resource
//! ordering, glob ignore matchers, checksum algorithms, the provider
//! contract and the error taxonomy shared by the other treesum crates.

mod algorithm;
mod config;
mod error;
mod matcher;
mod node;
mod order;
mod provider;
mod tree;

pub use algorithm::{Checksum, ChecksumAlgorithm, DIGEST_BUFFER_SIZE, Digester};
pub use config::{
    ChecksumConfig, ChecksumConfigBuilder, DEFAULT_WAIT_CEILING_SECS, DEFAULT_WORKERS,
};
pub use error::{ChecksumError, ErrorCategory, ProviderError};
pub use matcher::{IgnoreList, PathMatcher};
pub use node::{Location, Origin, Resource, ResourceId, ResourceKind, join_path};
pub use order::{compare_names, compare_optional, compare_resources, split_extension};
pub use provider::{
    DiscoveryMode, Entry, EntryKind, ExternalReference, Listing, ProviderSession,
    ResolvedExternal, ResourceProvider,
};
pub use tree::{ResourceRef, ResourceTree, TreeStats, Walk};
