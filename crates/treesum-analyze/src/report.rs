//! Tab-separated list and diff reports.
//!
//! List lines are `<hex>\t<path>`. Diff lines always carry four fields,
//! `<left hex>\t<left path>\t<right hex>\t<right path>`, with the fields of
//! a missing side left empty.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use treesum_core::{ChecksumError, ResourceRef, ResourceTree};

use crate::diff::DirectoryDifference;

/// Write one line per hashed file, in tree traversal order.
///
/// Files without a digest are skipped. Returns the number of lines written.
pub fn write_checksums<W: Write + ?Sized>(tree: &ResourceTree, out: &mut W) -> io::Result<u64> {
    let mut lines = 0;
    for resource in tree.walk().filter(|r| r.is_file()) {
        if let Some(checksum) = resource.checksum() {
            writeln!(out, "{}\t{}", checksum.to_hex(), resource.path())?;
            lines += 1;
        }
    }
    out.flush()?;
    Ok(lines)
}

/// Write one line per differing file. Returns the number of lines written.
pub fn write_differences<W: Write + ?Sized>(diff: &DirectoryDifference<'_>, out: &mut W) -> io::Result<u64> {
    let mut lines = 0;
    for file in diff.files() {
        let (left_hex, left_path) = side(file.left);
        let (right_hex, right_path) = side(file.right);
        writeln!(out, "{left_hex}\t{left_path}\t{right_hex}\t{right_path}")?;
        lines += 1;
    }
    out.flush()?;
    Ok(lines)
}

fn side(resource: Option<ResourceRef<'_>>) -> (String, &str) {
    match resource {
        Some(r) => (r.checksum().map(|c| c.to_hex()).unwrap_or_default(), r.path()),
        None => (String::new(), ""),
    }
}

/// Write the checksum list of a tree to a file.
pub fn save_checksums(tree: &ResourceTree, path: &Path) -> Result<u64, ChecksumError> {
    let file = File::create(path).map_err(|e| ChecksumError::output(path, e))?;
    write_checksums(tree, &mut BufWriter::new(file)).map_err(|e| ChecksumError::output(path, e))
}

/// Write the difference report to a file.
pub fn save_differences(diff: &DirectoryDifference<'_>, path: &Path) -> Result<u64, ChecksumError> {
    let file = File::create(path).map_err(|e| ChecksumError::output(path, e))?;
    write_differences(diff, &mut BufWriter::new(file)).map_err(|e| ChecksumError::output(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::TreeDiffEngine;
    use treesum_core::Checksum;

    fn flat_tree(files: &[(&str, Option<u8>)]) -> ResourceTree {
        let mut tree = ResourceTree::new("root");
        let root = tree.root_id();
        for (name, digest) in files {
            let id = tree.add_file(root, *name);
            if let Some(digest) = digest {
                tree.set_checksum(id, Checksum::new(vec![*digest]));
            }
        }
        tree.sort();
        tree
    }

    #[test]
    fn test_list_format_skips_unhashed_files() {
        let tree = flat_tree(&[("b.txt", Some(0xbb)), ("a.txt", Some(0x0a)), ("c.txt", None)]);
        let mut out = Vec::new();
        assert_eq!(write_checksums(&tree, &mut out).unwrap(), 2);
        assert_eq!(String::from_utf8(out).unwrap(), "0a\ta.txt\nbb\tb.txt\n");
    }

    #[test]
    fn test_diff_format() {
        let left = flat_tree(&[("gone.txt", Some(1)), ("same.txt", Some(2)), ("x.txt", Some(3))]);
        let right = flat_tree(&[("new.txt", Some(4)), ("same.txt", Some(2)), ("x.txt", Some(5))]);
        let diff = TreeDiffEngine::new().diff(&left, &right);

        let mut out = Vec::new();
        assert_eq!(write_differences(&diff, &mut out).unwrap(), 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "01\tgone.txt\t\t\n\t\t04\tnew.txt\n03\tx.txt\t05\tx.txt\n"
        );
    }

    #[test]
    fn test_save_to_missing_directory_is_output_error() {
        let temp = tempfile::tempdir().unwrap();
        let tree = flat_tree(&[("a.txt", Some(1))]);
        let err = save_checksums(&tree, &temp.path().join("missing/out.txt")).unwrap_err();
        assert!(matches!(err, ChecksumError::Output { .. }));
    }
}
