use std::cmp::Ordering;
use std::io::Write;

use tempfile::NamedTempFile;
use treesum_core::{
    Checksum, ChecksumAlgorithm, ChecksumConfig, ChecksumError, IgnoreList, Origin, PathMatcher,
    ResourceTree, compare_resources,
};

const NAMES: &[&str] = &[
    "a", "a.", "a.png", "a.txt", "aa.txt", "a-b.c", "a.z", "b", "b.txt", ".hidden", ".a.b",
    "archive.tar.gz", "archive.tar", "Makefile", "z",
];

/// Tree holding every name of `NAMES` twice under the root: once as a
/// directory (suffixed `_d`) and once as a file.
fn comparator_tree() -> ResourceTree {
    let mut tree = ResourceTree::new("root");
    let root = tree.root_id();
    for name in NAMES {
        tree.add_file(root, *name);
        tree.add_directory(root, format!("{name}_d"));
    }
    tree
}

#[test]
fn test_comparator_is_strict_weak_ordering() {
    let tree = comparator_tree();
    let items: Vec<_> = tree.root().children().collect();

    for &a in &items {
        assert_eq!(compare_resources(a, a), Ordering::Equal);
        for &b in &items {
            let ab = compare_resources(a, b);
            assert_eq!(ab, compare_resources(b, a).reverse(), "{a:?} vs {b:?}");
            if a.id() != b.id() {
                assert_ne!(ab, Ordering::Equal, "{a:?} vs {b:?}");
            }
            if a.is_dir() && b.is_file() {
                assert_eq!(ab, Ordering::Less);
            }
            for &c in &items {
                if ab == Ordering::Less && compare_resources(b, c) == Ordering::Less {
                    assert_eq!(compare_resources(a, c), Ordering::Less, "{a:?} {b:?} {c:?}");
                }
            }
        }
    }
}

#[test]
fn test_sort_orders_directories_then_files() {
    let mut tree = ResourceTree::new("root");
    let root = tree.root_id();
    tree.add_file(root, "b.txt");
    tree.add_file(root, "a.txt");
    tree.add_directory(root, "zeta");
    tree.add_file(root, "a.png");
    tree.add_directory(root, "alpha");
    tree.add_directory(root, "a-c");
    tree.add_directory(root, "a.b");

    assert!(!tree.is_sorted());
    tree.sort();
    assert!(tree.is_sorted());

    let names: Vec<_> = tree.root().children().map(|c| c.name()).collect();
    assert_eq!(names, ["a.b", "a-c", "alpha", "zeta", "a.png", "a.txt", "b.txt"]);
}

#[test]
fn test_paths_and_externals() {
    let mut tree = ResourceTree::new("root");
    let root = tree.root_id();
    let vendor = tree.add_directory(root, "vendor");
    let lib = tree.add_directory(vendor, "lib");
    tree.set_origin(lib, Origin::new("libs/lib", Some("abc123".into())));
    let file = tree.add_file(lib, "lib.rs");

    assert_eq!(tree.path(root), "");
    assert_eq!(tree.path(file), "vendor/lib/lib.rs");

    let location = tree.location(file);
    assert_eq!(location.path, "lib.rs");
    assert_eq!(location.origin.as_ref().map(|o| o.target.as_str()), Some("libs/lib"));

    assert!(tree.set_checksum(file, Checksum::new(vec![0xab])));
    assert!(!tree.set_checksum(file, Checksum::new(vec![0xcd])));
    assert_eq!(tree.resource(file).checksum().map(|c| c.to_hex()), Some("ab".to_string()));

    let stats = tree.stats();
    assert_eq!(stats.total_files, 1);
    assert_eq!(stats.hashed_files, 1);
    assert_eq!(stats.externals, 1);
}

#[test]
fn test_matcher_examples() {
    let txt = PathMatcher::from_glob("*.txt").unwrap();
    assert!(txt.matches("a.txt"));
    assert!(!txt.matches("a/b.txt"));

    let deep = PathMatcher::from_glob("**/b.txt").unwrap();
    for path in ["b.txt", "a/b.txt", "x/y/b.txt"] {
        assert!(deep.matches(path), "{path}");
    }

    let braces = PathMatcher::from_glob("{a,b}.txt").unwrap();
    assert!(braces.matches("a.txt"));
    assert!(braces.matches("b.txt"));
    assert!(!braces.matches("c.txt"));
}

#[test]
fn test_ignore_list_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "# build output").unwrap();
    writeln!(file, "target").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "**/.svn").unwrap();
    file.flush().unwrap();

    let list = IgnoreList::from_file(file.path()).unwrap();
    assert_eq!(list.len(), 2);
    assert!(list.is_ignored("target"));
    assert!(list.is_ignored("a/b/.svn"));
    assert!(!list.is_ignored("src/target"));
}

#[test]
fn test_ignore_list_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = IgnoreList::from_file(&dir.path().join("missing")).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "algorithm = \"md4\"").unwrap();
    file.flush().unwrap();

    assert!(matches!(
        ChecksumConfig::from_file(file.path()),
        Err(ChecksumError::InvalidConfig { .. })
    ));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "algorithm = \"md5\"\nfollow_symlinks = true").unwrap();
    file.flush().unwrap();

    let config = ChecksumConfig::from_file(file.path()).unwrap();
    assert_eq!(config.algorithm, ChecksumAlgorithm::Md5);
    assert!(config.follow_symlinks);
}
