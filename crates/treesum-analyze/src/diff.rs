//! Sorted merge-join comparison of two resource trees.
//!
//! Both trees must be sorted with [`ResourceTree::sort`] first. The merge
//! walks the two ordered child lists of each directory with two cursors,
//! so every directory pair is visited once.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use treesum_core::{ResourceRef, ResourceTree, compare_optional};

/// How a file differs between the two trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileDifferenceKind {
    /// Present in the left tree only.
    LeftOnly,
    /// Present in the right tree only.
    RightOnly,
    /// Present in both trees with different digests.
    Changed,
}

/// A file present on at least one side.
#[derive(Debug, Clone, Copy)]
pub struct FileDifference<'a> {
    pub kind: FileDifferenceKind,
    pub left: Option<ResourceRef<'a>>,
    pub right: Option<ResourceRef<'a>>,
}

impl<'a> FileDifference<'a> {
    /// Canonical path, taken from the left side when present.
    pub fn path(&self) -> &'a str {
        self.left
            .or(self.right)
            .map(|r| r.path())
            .unwrap_or_default()
    }
}

/// A directory holding at least one difference below it.
///
/// The root difference returned by [`TreeDiffEngine::diff`] may be empty.
#[derive(Debug, Clone, Default)]
pub struct DirectoryDifference<'a> {
    pub left: Option<ResourceRef<'a>>,
    pub right: Option<ResourceRef<'a>>,
    pub children: Vec<Difference<'a>>,
}

impl<'a> DirectoryDifference<'a> {
    /// Canonical path, taken from the left side when present.
    pub fn path(&self) -> &'a str {
        self.left
            .or(self.right)
            .map(|r| r.path())
            .unwrap_or_default()
    }

    /// Check if no difference was found.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// All file differences, depth-first in tree order.
    pub fn files(&self) -> Vec<&FileDifference<'a>> {
        let mut files = Vec::new();
        collect_files(self, &mut files);
        files
    }

    /// Count differences by kind.
    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for file in self.files() {
            match file.kind {
                FileDifferenceKind::LeftOnly => summary.left_only += 1,
                FileDifferenceKind::RightOnly => summary.right_only += 1,
                FileDifferenceKind::Changed => summary.changed += 1,
            }
        }
        summary
    }
}

fn collect_files<'d, 'a>(dir: &'d DirectoryDifference<'a>, files: &mut Vec<&'d FileDifference<'a>>) {
    for child in &dir.children {
        match child {
            Difference::Directory(dir) => collect_files(dir, files),
            Difference::File(file) => files.push(file),
        }
    }
}

/// A node of the difference tree.
#[derive(Debug, Clone)]
pub enum Difference<'a> {
    Directory(DirectoryDifference<'a>),
    File(FileDifference<'a>),
}

impl<'a> Difference<'a> {
    /// Canonical path of the differing resource.
    pub fn path(&self) -> &'a str {
        match self {
            Self::Directory(dir) => dir.path(),
            Self::File(file) => file.path(),
        }
    }
}

/// Number of differing files by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub left_only: u64,
    pub right_only: u64,
    pub changed: u64,
}

impl DiffSummary {
    /// Total number of differing files.
    pub fn total(&self) -> u64 {
        self.left_only + self.right_only + self.changed
    }

    /// Check if the trees are identical.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Compares sorted resource trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeDiffEngine;

impl TreeDiffEngine {
    /// Create a new diff engine.
    pub fn new() -> Self {
        Self
    }

    /// Compare two sorted trees from their roots.
    pub fn diff<'a>(&self, left: &'a ResourceTree, right: &'a ResourceTree) -> DirectoryDifference<'a> {
        debug_assert!(left.is_sorted(), "left tree must be sorted");
        debug_assert!(right.is_sorted(), "right tree must be sorted");

        let difference = self.diff_directories(Some(left.root()), Some(right.root()));
        let summary = difference.summary();
        debug!(
            left_only = summary.left_only,
            right_only = summary.right_only,
            changed = summary.changed,
            "trees compared"
        );
        difference
    }

    /// Compare two sorted directories; an absent side counts as empty.
    pub fn diff_directories<'a>(
        &self,
        left: Option<ResourceRef<'a>>,
        right: Option<ResourceRef<'a>>,
    ) -> DirectoryDifference<'a> {
        let left_children: Vec<_> = left.map(|d| d.children().collect()).unwrap_or_default();
        let right_children: Vec<_> = right.map(|d| d.children().collect()).unwrap_or_default();
        let mut children = Vec::new();
        let (mut i, mut j) = (0, 0);

        loop {
            let l = left_children.get(i).copied();
            let r = right_children.get(j).copied();
            if l.is_none() && r.is_none() {
                break;
            }
            match compare_optional(l, r) {
                Ordering::Less => {
                    children.extend(self.one_sided(l, None));
                    i += 1;
                }
                Ordering::Greater => {
                    children.extend(self.one_sided(None, r));
                    j += 1;
                }
                Ordering::Equal => {
                    children.extend(self.matched(l, r));
                    i += 1;
                    j += 1;
                }
            }
        }

        DirectoryDifference {
            left,
            right,
            children,
        }
    }

    /// Difference for a resource present on one side only.
    fn one_sided<'a>(
        &self,
        left: Option<ResourceRef<'a>>,
        right: Option<ResourceRef<'a>>,
    ) -> Option<Difference<'a>> {
        let resource = left.or(right)?;
        if resource.is_dir() {
            let dir = self.diff_directories(left, right);
            return (!dir.is_empty()).then_some(Difference::Directory(dir));
        }
        let kind = if left.is_some() {
            FileDifferenceKind::LeftOnly
        } else {
            FileDifferenceKind::RightOnly
        };
        Some(Difference::File(FileDifference { kind, left, right }))
    }

    /// Difference for two resources of the same kind and name.
    fn matched<'a>(
        &self,
        left: Option<ResourceRef<'a>>,
        right: Option<ResourceRef<'a>>,
    ) -> Option<Difference<'a>> {
        let (l, r) = (left?, right?);
        if l.is_dir() {
            let dir = self.diff_directories(left, right);
            return (!dir.is_empty()).then_some(Difference::Directory(dir));
        }
        match (l.checksum(), r.checksum()) {
            (Some(a), Some(b)) if a == b => None,
            // A missing digest never proves equality.
            _ => Some(Difference::File(FileDifference {
                kind: FileDifferenceKind::Changed,
                left,
                right,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treesum_core::Checksum;

    fn tree(files: &[(&str, u8)]) -> ResourceTree {
        let mut tree = ResourceTree::new("root");
        for (path, digest) in files {
            let mut parent = tree.root_id();
            let mut segments: Vec<&str> = path.split('/').collect();
            let name = segments.pop().unwrap();
            for segment in segments {
                parent = tree.ensure_directory(parent, segment).unwrap();
            }
            let id = tree.add_file(parent, name);
            tree.set_checksum(id, Checksum::new(vec![*digest]));
        }
        tree.sort();
        tree
    }

    fn describe(diff: &DirectoryDifference<'_>) -> Vec<(FileDifferenceKind, String)> {
        diff.files()
            .into_iter()
            .map(|f| (f.kind, f.path().to_string()))
            .collect()
    }

    #[test]
    fn test_identical_trees() {
        let left = tree(&[("a.txt", 1), ("src/b.rs", 2)]);
        let right = tree(&[("a.txt", 1), ("src/b.rs", 2)]);
        let diff = TreeDiffEngine::new().diff(&left, &right);
        assert!(diff.is_empty());
        assert!(diff.summary().is_empty());
    }

    #[test]
    fn test_nested_differences() {
        let left = tree(&[("src/a.rs", 1), ("src/old/x.rs", 2), ("keep.txt", 3)]);
        let right = tree(&[("src/a.rs", 9), ("src/new/y.rs", 4), ("keep.txt", 3)]);
        let diff = TreeDiffEngine::new().diff(&left, &right);

        assert_eq!(
            describe(&diff),
            vec![
                (FileDifferenceKind::RightOnly, "src/new/y.rs".to_string()),
                (FileDifferenceKind::LeftOnly, "src/old/x.rs".to_string()),
                (FileDifferenceKind::Changed, "src/a.rs".to_string()),
            ]
        );
        assert_eq!(diff.children.len(), 1);
        assert_eq!(diff.children[0].path(), "src");
    }

    #[test]
    fn test_empty_directories_are_pruned() {
        let mut left = tree(&[("a.txt", 1)]);
        let root = left.root_id();
        let empty = left.add_directory(root, "empty");
        left.add_directory(empty, "deeper");
        left.sort();
        let right = tree(&[("a.txt", 1)]);

        assert!(TreeDiffEngine::new().diff(&left, &right).is_empty());
    }

    #[test]
    fn test_kind_collision_is_two_one_sided_differences() {
        let left = tree(&[("name/inner.txt", 1)]);
        let right = tree(&[("name", 1)]);
        let diff = TreeDiffEngine::new().diff(&left, &right);

        assert_eq!(
            describe(&diff),
            vec![
                (FileDifferenceKind::LeftOnly, "name/inner.txt".to_string()),
                (FileDifferenceKind::RightOnly, "name".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_digest_counts_as_changed() {
        let left = tree(&[("a.txt", 1)]);
        let mut right = ResourceTree::new("root");
        let root = right.root_id();
        right.add_file(root, "a.txt");

        let diff = TreeDiffEngine::new().diff(&left, &right);
        assert_eq!(diff.summary().changed, 1);
    }
}
