//! Local filesystem provider.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use treesum_core::{
    ChecksumError, DiscoveryMode, Entry, EntryKind, Listing, Location, ProviderError,
    ProviderSession, ResourceProvider,
};

/// Provider over a local directory.
#[derive(Debug, Clone)]
pub struct FsProvider {
    root: PathBuf,
    root_name: String,
    follow_symlinks: bool,
}

impl FsProvider {
    /// Create a provider rooted at an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ChecksumError> {
        let root = root.into();
        let is_dir = fs::metadata(&root).map(|m| m.is_dir()).unwrap_or(false);
        if !is_dir {
            return Err(ChecksumError::NotADirectory { path: root });
        }
        let root_name = root
            .canonicalize()
            .ok()
            .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            .unwrap_or_else(|| root.display().to_string());

        Ok(Self {
            root,
            root_name,
            follow_symlinks: false,
        })
    }

    /// Follow symbolic links instead of skipping them.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceProvider for FsProvider {
    type Session = FsSession;

    fn root_name(&self) -> &str {
        &self.root_name
    }

    fn discovery_mode(&self) -> DiscoveryMode {
        DiscoveryMode::Sequential
    }

    fn connect(&self) -> Result<FsSession, ProviderError> {
        Ok(FsSession {
            root: self.root.clone(),
            follow_symlinks: self.follow_symlinks,
        })
    }
}

/// Session of an [`FsProvider`]. Holds no open handle.
#[derive(Debug)]
pub struct FsSession {
    root: PathBuf,
    follow_symlinks: bool,
}

impl FsSession {
    fn resolve(&self, location: &Location) -> Result<PathBuf, ProviderError> {
        if location.origin.is_some() {
            return Err(ProviderError::Unsupported {
                operation: "external locations",
            });
        }
        Ok(self.root.join(&location.path))
    }

    /// Kind of a symbolic link target, `None` if it must be skipped.
    fn symlink_kind(&self, dir: &Path, link: &Path) -> Option<EntryKind> {
        if !self.follow_symlinks {
            debug!(path = %link.display(), "skipping symbolic link");
            return None;
        }
        let metadata = match fs::metadata(link) {
            Ok(metadata) => metadata,
            Err(error) => {
                warn!(path = %link.display(), %error, "skipping broken symbolic link");
                return None;
            }
        };
        if metadata.is_dir() {
            // A link to an ancestor would recurse forever.
            let target = fs::canonicalize(link).ok()?;
            let current = fs::canonicalize(dir).ok()?;
            if current.starts_with(&target) {
                warn!(path = %link.display(), "skipping symbolic link cycle");
                return None;
            }
            Some(EntryKind::Directory)
        } else if metadata.is_file() {
            Some(EntryKind::File)
        } else {
            None
        }
    }
}

impl ProviderSession for FsSession {
    fn list(&mut self, location: &Location) -> Result<Listing, ProviderError> {
        let dir = self.resolve(location)?;
        let mut entries = Vec::new();

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let kind = if file_type.is_symlink() {
                match self.symlink_kind(&dir, &entry.path()) {
                    Some(kind) => kind,
                    None => continue,
                }
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                debug!(path = %entry.path().display(), "skipping special file");
                continue;
            };

            let name = entry.file_name().into_string().map_err(|name| {
                ProviderError::other(format!(
                    "file name is not valid UTF-8: {}",
                    dir.join(name).display()
                ))
            })?;
            entries.push(Entry {
                name: name.into(),
                kind,
            });
        }

        Ok(Listing::new(entries))
    }

    fn open(&mut self, location: &Location) -> Result<Box<dyn Read + '_>, ProviderError> {
        let path = self.resolve(location)?;
        Ok(Box::new(File::open(path)?))
    }
}
