//! Canonical ordering of resources.
//!
//! Directories sort before files. Resources of the same kind compare by base
//! name, then extension, then whole name, where the extension is the part
//! after the last `.` unless that dot starts the name. The whole-name
//! tie-break keeps `a` and `a.` distinct, so the order is total.

use std::cmp::Ordering;

use crate::tree::ResourceRef;

/// Compare two resources with the canonical ordering.
pub fn compare_resources(a: ResourceRef<'_>, b: ResourceRef<'_>) -> Ordering {
    match (a.is_dir(), b.is_dir()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => compare_names(a.name(), b.name()),
    }
}

/// Compare two optional resources; an absent resource sorts after every present one.
pub fn compare_optional(a: Option<ResourceRef<'_>>, b: Option<ResourceRef<'_>>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(a), Some(b)) => compare_resources(a, b),
    }
}

/// Compare two names of the same kind by base name, then extension, then whole name.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    split_extension(a)
        .cmp(&split_extension(b))
        .then_with(|| a.cmp(b))
}

/// Split a file name at its last `.` into base name and extension.
///
/// Names without a dot, or whose only dot is the first character, have an
/// empty extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(index) if index > 0 => (&name[..index], &name[index + 1..]),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.txt"), ("a", "txt"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", "gz"));
        assert_eq!(split_extension("Makefile"), ("Makefile", ""));
        assert_eq!(split_extension(".gitignore"), (".gitignore", ""));
        assert_eq!(split_extension("a."), ("a", ""));
    }

    #[test]
    fn test_base_before_extension() {
        assert_eq!(compare_names("a.png", "a.txt"), Ordering::Less);
        assert_eq!(compare_names("a.txt", "aa.txt"), Ordering::Less);
        assert_eq!(compare_names("aa.txt", "b.txt"), Ordering::Less);
        // Whole-name order would put "a-b.c" first.
        assert_eq!(compare_names("a.z", "a-b.c"), Ordering::Less);
    }

    #[test]
    fn test_dotted_directories_split_like_files() {
        let mut tree = crate::tree::ResourceTree::new("root");
        let root = tree.root_id();
        tree.add_directory(root, "a-c");
        tree.add_directory(root, "a.b");
        tree.add_file(root, "a.b");
        tree.sort();

        let names: Vec<_> = tree
            .root()
            .children()
            .map(|c| (c.is_dir(), c.name().to_string()))
            .collect();
        assert_eq!(
            names,
            vec![
                (true, "a.b".to_string()),
                (true, "a-c".to_string()),
                (false, "a.b".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_extension() {
        assert_eq!(compare_names("a", "a.txt"), Ordering::Less);
        assert_eq!(compare_names("a", "a."), Ordering::Less);
        assert_eq!(compare_names("b", "a.txt"), Ordering::Greater);
        assert_eq!(compare_names("same", "same"), Ordering::Equal);
    }
}
