//! Tree comparison and reports for treesum.
//!
//! This crate compares hashed resource trees and writes reports:
//!
//! - **Tree diff** - sorted merge-join of two trees into a pruned difference tree
//! - **Reports** - tab-separated checksum lists and difference lists
//!
//! # Tree Diff
//!
//! Both trees must be sorted before comparison:
//!
//! ```rust,ignore
//! use treesum_analyze::{TreeDiffEngine, write_differences};
//!
//! left.sort();
//! right.sort();
//! let diff = TreeDiffEngine::new().diff(&left, &right);
//!
//! let summary = diff.summary();
//! println!("{} changed, {} added, {} removed", summary.changed, summary.right_only, summary.left_only);
//! write_differences(&diff, &mut std::io::stdout().lock())?;
//! ```

mod diff;
mod report;

pub use diff::{
    DiffSummary, Difference, DirectoryDifference, FileDifference, FileDifferenceKind,
    TreeDiffEngine,
};
pub use report::{save_checksums, save_differences, write_checksums, write_differences};

// Re-export core types
pub use treesum_core::{ResourceRef, ResourceTree};
