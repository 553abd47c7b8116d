//! Checksum engine for treesum.
//!
//! This crate discovers a resource hierarchy through a
//! [`ResourceProvider`](treesum_core::ResourceProvider) and hashes every
//! file on a bounded worker pool.
//!
//! # Overview
//!
//! - **Two phases**: discovery builds the tree, hashing digests each file
//! - **Bounded concurrency** on a dedicated rayon pool
//! - **Fail-fast**: the first error aborts the computation
//! - **Providers** for local directories and, with the `git` feature,
//!   commits of a git repository
//!
//! # Example
//!
//! ```rust,no_run
//! use treesum_scan::{ChecksumEngine, FsProvider, TracingListener};
//! use treesum_core::{ChecksumAlgorithm, IgnoreList};
//!
//! let provider = FsProvider::new("/path/to/tree").unwrap();
//! let ignore = IgnoreList::parse_list("**/.git;target").unwrap();
//! let engine = ChecksumEngine::new();
//! let mut tree = engine
//!     .compute(&provider, ChecksumAlgorithm::Sha256, &ignore, &TracingListener)
//!     .unwrap();
//! tree.sort();
//!
//! println!("Total files: {}", tree.stats().total_files);
//! ```
//!
//! # Progress Monitoring
//!
//! Besides the [`ChecksumListener`] callbacks, snapshots are broadcast:
//!
//! ```rust,no_run
//! use treesum_scan::ChecksumEngine;
//!
//! let engine = ChecksumEngine::new();
//! let mut progress_rx = engine.subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(progress) = progress_rx.blocking_recv() {
//!         println!("Hashed {} of {} files", progress.files_hashed, progress.files_found);
//!     }
//! });
//! ```

mod engine;
mod listener;
mod pending;
mod progress;
mod provider;
mod session;
mod signal;

pub use engine::{ChecksumEngine, EngineConfig, EngineConfigBuilder};
pub use listener::{ChecksumListener, NoopListener, TracingListener};
pub use pending::PendingListings;
pub use progress::{ChecksumProgress, Phase};
pub use provider::{FsProvider, FsSession};
#[cfg(feature = "git")]
pub use provider::{GitProvider, GitSession};
pub use signal::AbortSignal;

// Re-export core types for convenience
pub use treesum_core::{
    ChecksumAlgorithm, ChecksumConfig, ChecksumError, IgnoreList, ResourceTree, TreeStats,
};
