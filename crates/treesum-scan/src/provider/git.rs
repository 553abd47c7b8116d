//! Git snapshot provider.
//!
//! Exposes the tree of one commit as a resource hierarchy. Submodules are
//! external references pinned to the commit recorded in the parent tree.
//! File content is normalized the way a checkout of that commit would write
//! it: the `ident` attribute expands `$Id$`, and `eol=crlf` turns LF into
//! CRLF. Attributes come from the `.gitattributes` files of the snapshot
//! itself, never from the index or the working tree.

use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use git2::{ObjectType, Oid, Repository, Tree};
use tracing::debug;
use treesum_core::{
    ChecksumError, DiscoveryMode, Entry, EntryKind, ExternalReference, Listing, Location, Origin,
    ProviderError, ProviderSession, ResolvedExternal, ResourceProvider, join_path,
};

use super::attributes::{AttributeCache, CheckoutAttributes};

/// Provider over a commit of a local git repository.
#[derive(Debug, Clone)]
pub struct GitProvider {
    repo_path: PathBuf,
    commit: Oid,
    root_name: String,
}

impl GitProvider {
    /// Open the repository containing `path` at `revspec` (e.g. `HEAD`, a tag, a hash).
    pub fn open(path: impl Into<PathBuf>, revspec: &str) -> Result<Self, ChecksumError> {
        let path = path.into();
        let invalid = |e: git2::Error| ChecksumError::InvalidConfig {
            message: format!("{}@{revspec}: {}", path.display(), e.message()),
        };
        let repo = Repository::discover(&path).map_err(invalid)?;
        let commit = repo
            .revparse_single(revspec)
            .and_then(|object| object.peel_to_commit())
            .map_err(invalid)?
            .id();

        let repo_path = repo.path().to_path_buf();
        let root_name = repo
            .workdir()
            .unwrap_or_else(|| repo.path())
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            repo_path,
            commit,
            root_name,
        })
    }

    /// The commit being exposed.
    pub fn commit(&self) -> Oid {
        self.commit
    }
}

impl ResourceProvider for GitProvider {
    type Session = GitSession;

    fn root_name(&self) -> &str {
        &self.root_name
    }

    fn discovery_mode(&self) -> DiscoveryMode {
        DiscoveryMode::Parallel
    }

    fn connect(&self) -> Result<GitSession, ProviderError> {
        Ok(GitSession {
            root: Repository::open(&self.repo_path)?,
            commit: self.commit,
            externals: HashMap::new(),
            attributes: AttributeCache::default(),
        })
    }
}

/// Private repository handle of one worker thread.
pub struct GitSession {
    root: Repository,
    commit: Oid,
    /// Submodule repositories keyed by their path from the top repository.
    externals: HashMap<String, Repository>,
    attributes: AttributeCache,
}

/// Repository and commit holding a location.
fn snapshot<'s>(
    root: &'s Repository,
    commit: Oid,
    externals: &'s mut HashMap<String, Repository>,
    origin: Option<&Origin>,
) -> Result<(&'s Repository, Oid), ProviderError> {
    let Some(origin) = origin else {
        return Ok((root, commit));
    };
    let revision = origin.revision.as_deref().ok_or_else(|| {
        ProviderError::other(format!("external {} has no pinned revision", origin.target))
    })?;
    let oid = Oid::from_str(revision)?;
    let repo = match externals.entry(origin.target.clone()) {
        MapEntry::Occupied(entry) => entry.into_mut(),
        MapEntry::Vacant(entry) => entry.insert(open_submodule(root, &origin.target)?),
    };
    Ok((repo, oid))
}

impl ProviderSession for GitSession {
    fn list(&mut self, location: &Location) -> Result<Listing, ProviderError> {
        let target_base = location
            .origin
            .as_ref()
            .map(|origin| origin.target.clone())
            .unwrap_or_default();
        let (repo, commit) = snapshot(
            &self.root,
            self.commit,
            &mut self.externals,
            location.origin.as_ref(),
        )?;
        let tree = tree_at(repo, commit, &location.path)?;

        let mut listing = Listing::default();
        for entry in tree.iter() {
            let name = entry
                .name()
                .ok_or_else(|| ProviderError::other("tree entry name is not valid UTF-8"))?;
            match entry.kind() {
                Some(ObjectType::Tree) => listing.entries.push(Entry::directory(name)),
                Some(ObjectType::Blob) => listing.entries.push(Entry::file(name)),
                Some(ObjectType::Commit) => listing.externals.push(ExternalReference {
                    path: name.to_string(),
                    target: join_path(&target_base, &join_path(&location.path, name)),
                    revision: Some(entry.id().to_string()),
                }),
                _ => debug!(name, "skipping unknown tree entry"),
            }
        }
        Ok(listing)
    }

    fn open(&mut self, location: &Location) -> Result<Box<dyn Read + '_>, ProviderError> {
        let GitSession {
            root,
            commit,
            externals,
            attributes,
        } = self;
        let (repo, commit) = snapshot(root, *commit, externals, location.origin.as_ref())?;
        let tree = repo.find_commit(commit)?.tree()?;
        let entry = tree.get_path(Path::new(&location.path))?;
        let blob = repo.find_blob(entry.id())?;
        let content = normalize(
            attributes.resolve(repo, tree, &location.path)?,
            blob.id(),
            blob.content(),
        );
        Ok(Box::new(Cursor::new(content)))
    }

    fn resolve_external(
        &mut self,
        reference: &ExternalReference,
    ) -> Result<ResolvedExternal, ProviderError> {
        let repo = match self.externals.entry(reference.target.clone()) {
            MapEntry::Occupied(entry) => entry.into_mut(),
            MapEntry::Vacant(entry) => entry.insert(open_submodule(&self.root, &reference.target)?),
        };
        let commit = match &reference.revision {
            Some(revision) => repo.find_commit(Oid::from_str(revision)?)?,
            None => repo.head()?.peel_to_commit()?,
        };
        Ok(ResolvedExternal {
            kind: EntryKind::Directory,
            revision: Some(commit.id().to_string()),
        })
    }
}

/// Tree of `commit` at a `/`-separated path, the root tree for an empty path.
fn tree_at<'r>(repo: &'r Repository, commit: Oid, path: &str) -> Result<Tree<'r>, ProviderError> {
    let root = repo.find_commit(commit)?.tree()?;
    if path.is_empty() {
        return Ok(root);
    }
    let entry = root.get_path(Path::new(path))?;
    if entry.kind() != Some(ObjectType::Tree) {
        return Err(ProviderError::NotADirectory {
            path: path.to_string(),
        });
    }
    Ok(repo.find_tree(entry.id())?)
}

/// Open the submodule at `target`, walking nested submodules as needed.
fn open_submodule(repo: &Repository, target: &str) -> Result<Repository, ProviderError> {
    for submodule in repo.submodules()? {
        let Some(path) = submodule.path().to_str().map(str::to_string) else {
            continue;
        };
        if target == path {
            return Ok(submodule.open()?);
        }
        if let Some(rest) = target.strip_prefix(&path).and_then(|r| r.strip_prefix('/')) {
            return open_submodule(&submodule.open()?, rest);
        }
    }
    Err(ProviderError::NotFound {
        path: target.to_string(),
    })
}

/// Apply the checkout filters selected by a path's attributes.
fn normalize(attributes: CheckoutAttributes, blob: Oid, content: &[u8]) -> Vec<u8> {
    let mut content = content.to_vec();
    if attributes.expands_ident() {
        content = expand_ident(&content, blob);
    }
    if attributes.converts_to_crlf(is_binary(&content)) {
        content = lf_to_crlf(&content);
    }
    content
}

/// Replace every `$Id$` with `$Id: <blob id> $`.
fn expand_ident(content: &[u8], blob: Oid) -> Vec<u8> {
    const KEYWORD: &[u8] = b"$Id$";
    let expanded = format!("$Id: {blob} $");
    let mut out = Vec::with_capacity(content.len());
    let mut rest = content;
    while let Some(index) = rest.windows(KEYWORD.len()).position(|w| w == KEYWORD) {
        out.extend_from_slice(&rest[..index]);
        out.extend_from_slice(expanded.as_bytes());
        rest = &rest[index + KEYWORD.len()..];
    }
    out.extend_from_slice(rest);
    out
}

/// Turn lone LF into CRLF; existing CRLF pairs are kept.
fn lf_to_crlf(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + content.len() / 32);
    let mut previous = 0u8;
    for &byte in content {
        if byte == b'\n' && previous != b'\r' {
            out.push(b'\r');
        }
        out.push(byte);
        previous = byte;
    }
    out
}

/// Same heuristic as git: a NUL byte marks binary content.
fn is_binary(content: &[u8]) -> bool {
    content.iter().take(8000).any(|&b| b == 0)
}
