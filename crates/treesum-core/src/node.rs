//! File and directory resource types.

use std::sync::OnceLock;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::algorithm::Checksum;

/// Identifier of a resource within a [`ResourceTree`](crate::ResourceTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

impl ResourceId {
    /// The root resource of every tree.
    pub const ROOT: ResourceId = ResourceId(0);

    /// Create a new ResourceId from a u32.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Type of resource.
#[derive(Debug, Clone)]
pub enum ResourceKind {
    /// Directory with its children in discovery (or sorted) order.
    Directory { children: Vec<ResourceId> },
    /// File with its checksum, set once hashing completes.
    File { checksum: OnceLock<Checksum> },
}

impl ResourceKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, ResourceKind::Directory { .. })
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, ResourceKind::File { .. })
    }
}

/// A single file or directory in the tree.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Resource name (single path segment).
    pub(crate) name: CompactString,

    /// Enclosing directory, `None` for the root.
    pub(crate) parent: Option<ResourceId>,

    /// Kind and associated data.
    pub(crate) kind: ResourceKind,

    /// Canonical path cache.
    pub(crate) path: OnceLock<String>,
}

impl Resource {
    pub(crate) fn new_directory(name: impl Into<CompactString>, parent: Option<ResourceId>) -> Self {
        Self {
            name: name.into(),
            parent,
            kind: ResourceKind::Directory {
                children: Vec::new(),
            },
            path: OnceLock::new(),
        }
    }

    pub(crate) fn new_file(name: impl Into<CompactString>, parent: ResourceId) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent),
            kind: ResourceKind::File {
                checksum: OnceLock::new(),
            },
            path: OnceLock::new(),
        }
    }

    /// Resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enclosing directory.
    pub fn parent(&self) -> Option<ResourceId> {
        self.parent
    }

    /// Resource kind.
    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// Check if this resource is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this resource is a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Children of a directory, empty for files.
    pub fn children(&self) -> &[ResourceId] {
        match &self.kind {
            ResourceKind::Directory { children } => children,
            ResourceKind::File { .. } => &[],
        }
    }

    /// Checksum of a file, `None` until processed or for directories.
    pub fn checksum(&self) -> Option<&Checksum> {
        match &self.kind {
            ResourceKind::File { checksum } => checksum.get(),
            ResourceKind::Directory { .. } => None,
        }
    }
}

/// Provider-side origin of a resource spliced in from an external reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin {
    /// Provider-specific target of the external reference.
    pub target: String,
    /// Pinned revision, if any.
    pub revision: Option<String>,
}

impl Origin {
    /// Create a new origin.
    pub fn new(target: impl Into<String>, revision: Option<String>) -> Self {
        Self {
            target: target.into(),
            revision,
        }
    }
}

/// Address of a resource as understood by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    /// External origin, `None` for resources of the provider root.
    pub origin: Option<Origin>,
    /// Path relative to the origin (or to the provider root).
    pub path: String,
}

impl Location {
    /// The provider root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Root of an external origin.
    pub fn external(origin: Origin) -> Self {
        Self {
            origin: Some(origin),
            path: String::new(),
        }
    }

    /// Location of a child named `name`.
    pub fn join(&self, name: &str) -> Self {
        Self {
            origin: self.origin.clone(),
            path: join_path(&self.path, name),
        }
    }
}

/// Join two `/`-separated relative paths.
pub fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{name}")
    }
}
