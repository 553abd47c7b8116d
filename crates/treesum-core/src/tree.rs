//! Resource tree container and statistics.

use std::collections::HashMap;
use std::fmt;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::algorithm::Checksum;
use crate::node::{Location, Origin, Resource, ResourceId, ResourceKind, join_path};
use crate::order::compare_resources;

/// Summary statistics for a resource tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Total number of files.
    pub total_files: u64,
    /// Total number of directories, root excluded.
    pub total_dirs: u64,
    /// Files carrying a checksum.
    pub hashed_files: u64,
    /// Resources spliced in from external references.
    pub externals: u64,
    /// Maximum depth reached (root is depth 0).
    pub max_depth: u32,
}

/// Hierarchical resource tree stored as an arena.
///
/// Ownership flows from directories to their children through
/// [`ResourceId`]s; parent links are used only to derive paths.
#[derive(Debug, Clone)]
pub struct ResourceTree {
    nodes: Vec<Resource>,
    origins: HashMap<ResourceId, Origin>,
}

impl ResourceTree {
    /// Create a tree holding only a root directory.
    pub fn new(root_name: impl Into<CompactString>) -> Self {
        Self {
            nodes: vec![Resource::new_directory(root_name, None)],
            origins: HashMap::new(),
        }
    }

    /// Id of the root directory.
    pub fn root_id(&self) -> ResourceId {
        ResourceId::ROOT
    }

    /// Handle on the root directory.
    pub fn root(&self) -> ResourceRef<'_> {
        self.resource(ResourceId::ROOT)
    }

    /// Get a resource by id.
    ///
    /// Panics if the id does not belong to this tree.
    pub fn get(&self, id: ResourceId) -> &Resource {
        &self.nodes[id.index()]
    }

    /// Get a handle on a resource.
    pub fn resource(&self, id: ResourceId) -> ResourceRef<'_> {
        debug_assert!(id.index() < self.nodes.len());
        ResourceRef { tree: self, id }
    }

    /// Number of resources, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree holds only its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Add a directory under `parent`.
    pub fn add_directory(&mut self, parent: ResourceId, name: impl Into<CompactString>) -> ResourceId {
        self.push(parent, Resource::new_directory(name, Some(parent)))
    }

    /// Add a file under `parent`.
    pub fn add_file(&mut self, parent: ResourceId, name: impl Into<CompactString>) -> ResourceId {
        self.push(parent, Resource::new_file(name, parent))
    }

    fn push(&mut self, parent: ResourceId, resource: Resource) -> ResourceId {
        let id = ResourceId::new(self.nodes.len() as u32);
        match &mut self.nodes[parent.index()].kind {
            ResourceKind::Directory { children } => children.push(id),
            ResourceKind::File { .. } => {
                panic!("cannot add a child to file {:?}", self.nodes[parent.index()].name)
            }
        }
        self.nodes.push(resource);
        id
    }

    /// Find a direct child by name.
    pub fn child_named(&self, parent: ResourceId, name: &str) -> Option<ResourceId> {
        self.get(parent)
            .children()
            .iter()
            .copied()
            .find(|&child| self.get(child).name() == name)
    }

    /// Get the directory named `name` under `parent`, creating it if missing.
    ///
    /// Returns `None` when a file already holds that name.
    pub fn ensure_directory(&mut self, parent: ResourceId, name: &str) -> Option<ResourceId> {
        match self.child_named(parent, name) {
            Some(existing) if self.get(existing).is_dir() => Some(existing),
            Some(_) => None,
            None => Some(self.add_directory(parent, name)),
        }
    }

    /// Attach an external origin to a resource.
    pub fn set_origin(&mut self, id: ResourceId, origin: Origin) {
        self.origins.insert(id, origin);
    }

    /// External origin attached directly to a resource.
    pub fn origin(&self, id: ResourceId) -> Option<&Origin> {
        self.origins.get(&id)
    }

    /// Canonical path of a resource, relative to the root.
    pub fn path(&self, id: ResourceId) -> &str {
        let resource = self.get(id);
        resource.path.get_or_init(|| match resource.parent {
            None => String::new(),
            Some(parent) => join_path(self.path(parent), &resource.name),
        })
    }

    /// Provider location of a resource.
    ///
    /// Derived from the nearest ancestor carrying an origin, or from the root.
    pub fn location(&self, id: ResourceId) -> Location {
        let mut names = Vec::new();
        let mut current = id;
        let base = loop {
            if let Some(origin) = self.origins.get(&current) {
                break Location::external(origin.clone());
            }
            let resource = self.get(current);
            match resource.parent {
                Some(parent) => {
                    names.push(resource.name.as_str());
                    current = parent;
                }
                None => break Location::root(),
            }
        };
        names.iter().rev().fold(base, |location, name| location.join(name))
    }

    /// Store the checksum of a file.
    ///
    /// Returns `false` if the resource is not a file or already has a checksum.
    pub fn set_checksum(&self, id: ResourceId, checksum: Checksum) -> bool {
        match &self.get(id).kind {
            ResourceKind::File { checksum: cell } => cell.set(checksum).is_ok(),
            ResourceKind::Directory { .. } => false,
        }
    }

    /// Iterate over all resources depth-first, parents before children.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![ResourceId::ROOT],
        }
    }

    /// Ids of all files in traversal order.
    pub fn files(&self) -> Vec<ResourceId> {
        self.walk().filter(|r| r.is_file()).map(|r| r.id()).collect()
    }

    /// Recursively sort every directory's children with the canonical ordering.
    pub fn sort(&mut self) {
        for index in 0..self.nodes.len() {
            let mut children = match &mut self.nodes[index].kind {
                ResourceKind::Directory { children } => std::mem::take(children),
                ResourceKind::File { .. } => continue,
            };
            children.sort_by(|a, b| compare_resources(self.resource(*a), self.resource(*b)));
            if let ResourceKind::Directory { children: slot } = &mut self.nodes[index].kind {
                *slot = children;
            }
        }
    }

    /// Check whether every directory's children are in canonical order.
    pub fn is_sorted(&self) -> bool {
        self.nodes.iter().all(|node| {
            node.children().windows(2).all(|pair| {
                compare_resources(self.resource(pair[0]), self.resource(pair[1])).is_le()
            })
        })
    }

    /// Compute summary statistics.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            externals: self.origins.len() as u64,
            ..TreeStats::default()
        };
        let mut stack = vec![(ResourceId::ROOT, 0u32)];
        while let Some((id, depth)) = stack.pop() {
            let resource = self.get(id);
            stats.max_depth = stats.max_depth.max(depth);
            match &resource.kind {
                ResourceKind::Directory { children } => {
                    if id != ResourceId::ROOT {
                        stats.total_dirs += 1;
                    }
                    stack.extend(children.iter().map(|&child| (child, depth + 1)));
                }
                ResourceKind::File { checksum } => {
                    stats.total_files += 1;
                    if checksum.get().is_some() {
                        stats.hashed_files += 1;
                    }
                }
            }
        }
        stats
    }
}

/// Copyable read-only handle on a resource of a tree.
#[derive(Clone, Copy)]
pub struct ResourceRef<'a> {
    tree: &'a ResourceTree,
    id: ResourceId,
}

impl<'a> ResourceRef<'a> {
    /// Resource id.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Owning tree.
    pub fn tree(&self) -> &'a ResourceTree {
        self.tree
    }

    /// Underlying resource.
    pub fn resource(&self) -> &'a Resource {
        self.tree.get(self.id)
    }

    /// Resource name.
    pub fn name(&self) -> &'a str {
        self.resource().name()
    }

    /// Canonical path.
    pub fn path(&self) -> &'a str {
        self.tree.path(self.id)
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.resource().is_dir()
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        self.resource().is_file()
    }

    /// File checksum, if computed.
    pub fn checksum(&self) -> Option<&'a Checksum> {
        self.resource().checksum()
    }

    /// Enclosing directory.
    pub fn parent(&self) -> Option<ResourceRef<'a>> {
        self.resource().parent().map(|id| self.tree.resource(id))
    }

    /// Children in their current order.
    pub fn children(&self) -> impl ExactSizeIterator<Item = ResourceRef<'a>> + 'a {
        let tree = self.tree;
        self.resource()
            .children()
            .iter()
            .map(move |&id| tree.resource(id))
    }

    /// Provider location.
    pub fn location(&self) -> Location {
        self.tree.location(self.id)
    }
}

impl fmt::Debug for ResourceRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_dir() { "Directory" } else { "File" };
        write!(f, "{kind}({:?})", self.path())
    }
}

/// Depth-first iterator over a tree.
pub struct Walk<'a> {
    tree: &'a ResourceTree,
    stack: Vec<ResourceId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = ResourceRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.get(id).children().iter().rev().copied());
        Some(self.tree.resource(id))
    }
}
