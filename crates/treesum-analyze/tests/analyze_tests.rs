use std::fs;
use std::path::Path;

use tempfile::TempDir;
use treesum_analyze::{
    FileDifferenceKind, ResourceTree, TreeDiffEngine, save_checksums, write_differences,
};
use treesum_core::{Checksum, ChecksumAlgorithm, IgnoreList};
use treesum_scan::{ChecksumEngine, FsProvider, NoopListener};

fn hashed_tree(files: &[(&str, &str)]) -> ResourceTree {
    let mut tree = ResourceTree::new("root");
    for (path, content) in files {
        let mut parent = tree.root_id();
        let mut segments: Vec<&str> = path.split('/').collect();
        let name = segments.pop().unwrap();
        for segment in segments {
            parent = tree.ensure_directory(parent, segment).unwrap();
        }
        let id = tree.add_file(parent, name);
        let mut digester = ChecksumAlgorithm::Crc32.digester();
        digester.update(content.as_bytes());
        tree.set_checksum(id, digester.finalize());
    }
    tree.sort();
    tree
}

fn kinds(left: &ResourceTree, right: &ResourceTree) -> Vec<(FileDifferenceKind, String)> {
    TreeDiffEngine::new()
        .diff(left, right)
        .files()
        .into_iter()
        .map(|f| (f.kind, f.path().to_string()))
        .collect()
}

fn scan(root: &Path) -> ResourceTree {
    let provider = FsProvider::new(root).unwrap();
    let mut tree = ChecksumEngine::new()
        .compute(&provider, ChecksumAlgorithm::Sha256, &IgnoreList::new(), &NoopListener)
        .unwrap();
    tree.sort();
    tree
}

#[test]
fn test_extension_aware_scenario() {
    let left = hashed_tree(&[("a.png", "p"), ("a.txt", "t"), ("aa.txt", "old"), ("b.txt", "b")]);
    let right = hashed_tree(&[("aa.txt", "new"), ("a.txt", "t"), ("b.txt", "b"), ("c.txt", "c")]);

    assert_eq!(
        kinds(&left, &right),
        vec![
            (FileDifferenceKind::LeftOnly, "a.png".to_string()),
            (FileDifferenceKind::Changed, "aa.txt".to_string()),
            (FileDifferenceKind::RightOnly, "c.txt".to_string()),
        ]
    );
}

#[test]
fn test_diff_with_itself_is_empty() {
    let tree = hashed_tree(&[("src/main.rs", "m"), ("src/lib/mod.rs", "l"), ("README", "r")]);
    let diff = TreeDiffEngine::new().diff(&tree, &tree);
    assert!(diff.is_empty());

    let mut out = Vec::new();
    assert_eq!(write_differences(&diff, &mut out).unwrap(), 0);
    assert!(out.is_empty());
}

#[test]
fn test_diff_is_symmetric() {
    let a = hashed_tree(&[("x/1.txt", "1"), ("x/2.txt", "2"), ("y.txt", "y"), ("z/3", "3")]);
    let b = hashed_tree(&[("x/1.txt", "one"), ("y.txt", "y"), ("w/4", "4")]);

    let forward = kinds(&a, &b);
    let backward = kinds(&b, &a);

    let only = |diff: &[(FileDifferenceKind, String)], kind| {
        let mut paths: Vec<String> = diff
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, p)| p.clone())
            .collect();
        paths.sort();
        paths
    };
    assert_eq!(
        only(&forward, FileDifferenceKind::LeftOnly),
        only(&backward, FileDifferenceKind::RightOnly)
    );
    assert_eq!(
        only(&forward, FileDifferenceKind::RightOnly),
        only(&backward, FileDifferenceKind::LeftOnly)
    );
    assert_eq!(
        only(&forward, FileDifferenceKind::Changed),
        only(&backward, FileDifferenceKind::Changed)
    );
    assert_eq!(only(&forward, FileDifferenceKind::Changed), vec!["x/1.txt"]);
}

#[test]
fn test_changed_line_swaps_sides() {
    let mut a = ResourceTree::new("a");
    let root = a.root_id();
    let id = a.add_file(root, "f");
    a.set_checksum(id, Checksum::new(vec![0x01]));

    let mut b = ResourceTree::new("b");
    let root = b.root_id();
    let id = b.add_file(root, "f");
    b.set_checksum(id, Checksum::new(vec![0x02]));

    let mut out = Vec::new();
    write_differences(&TreeDiffEngine::new().diff(&b, &a), &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "02\tf\t01\tf\n");
}

#[test]
fn test_release_audit_end_to_end() {
    let released = TempDir::new().unwrap();
    let checkout = TempDir::new().unwrap();
    for dir in [released.path(), checkout.path()] {
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(dir.join("Cargo.toml"), "[package]").unwrap();
    }
    fs::write(checkout.path().join("src/main.rs"), "fn main() { evil() }").unwrap();
    fs::write(checkout.path().join("extra.sh"), "#!/bin/sh").unwrap();
    fs::remove_file(checkout.path().join("Cargo.toml")).unwrap();

    let left = scan(released.path());
    let right = scan(checkout.path());
    let diff = TreeDiffEngine::new().diff(&left, &right);

    let summary = diff.summary();
    assert_eq!((summary.left_only, summary.right_only, summary.changed), (1, 1, 1));

    let report = released.path().join("checksums.txt");
    assert_eq!(save_checksums(&left, &report).unwrap(), 2);
    let content = fs::read_to_string(&report).unwrap();
    assert!(content.ends_with("\tCargo.toml\n"));
    let main = left.walk().find(|r| r.path() == "src/main.rs").unwrap();
    let expected = format!("{}\tsrc/main.rs\n", main.checksum().unwrap());
    assert!(content.starts_with(&expected));
}
