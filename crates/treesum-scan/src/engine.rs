//! Bounded-concurrency checksum engine.
//!
//! A computation runs in two strictly sequential phases. Discovery builds
//! the [`ResourceTree`] from the provider, pruning ignored paths. Hashing
//! then digests every discovered file on a fixed-size worker pool. The
//! first error aborts the computation: running tasks finish, no new task
//! starts, and the error is returned once the pool drains.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use derive_builder::Builder;
use humansize::{DECIMAL, format_size};
use rayon::prelude::*;
use rayon::{Scope, ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use treesum_core::{
    ChecksumAlgorithm, ChecksumConfig, ChecksumError, DEFAULT_WAIT_CEILING_SECS, DEFAULT_WORKERS,
    DiscoveryMode, Entry, EntryKind, ExternalReference, IgnoreList, Listing, Location, Origin,
    ProviderError, ProviderSession, ResolvedExternal, ResourceId, ResourceProvider, ResourceTree,
    join_path,
};

use crate::listener::ChecksumListener;
use crate::pending::PendingListings;
use crate::progress::{ChecksumProgress, Phase, ProgressTracker};
use crate::session::SessionPool;
use crate::signal::AbortSignal;

/// Publish a hashing snapshot every this many files.
const PUBLISH_INTERVAL: u64 = 64;

/// Configuration of the checksum engine.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Size of the worker pool.
    #[builder(default = "DEFAULT_WORKERS")]
    pub workers: usize,

    /// Maximum wall-clock time of a computation.
    #[builder(default = "Duration::from_secs(DEFAULT_WAIT_CEILING_SECS)")]
    pub wait_ceiling: Duration,
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.workers == Some(0) {
            return Err("Worker count must be at least 1".to_string());
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new engine config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            wait_ceiling: Duration::from_secs(DEFAULT_WAIT_CEILING_SECS),
        }
    }
}

impl From<&ChecksumConfig> for EngineConfig {
    fn from(config: &ChecksumConfig) -> Self {
        Self {
            workers: config.workers,
            wait_ceiling: config.wait_ceiling(),
        }
    }
}

/// Discovers and hashes resource trees.
pub struct ChecksumEngine {
    config: EngineConfig,
    progress_tx: broadcast::Sender<ChecksumProgress>,
}

impl ChecksumEngine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            config,
            progress_tx,
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribe to progress snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<ChecksumProgress> {
        self.progress_tx.subscribe()
    }

    /// Discover the provider's hierarchy and hash every file.
    ///
    /// Children are kept in discovery order; call [`ResourceTree::sort`]
    /// before comparing trees.
    pub fn compute<P: ResourceProvider>(
        &self,
        provider: &P,
        algorithm: ChecksumAlgorithm,
        ignore: &IgnoreList,
        listener: &dyn ChecksumListener,
    ) -> Result<ResourceTree, ChecksumError> {
        if self.config.workers == 0 {
            return Err(ChecksumError::InvalidConfig {
                message: "Worker count must be at least 1".to_string(),
            });
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|index| format!("treesum-worker-{index}"))
            .build()
            .map_err(|e| ChecksumError::ThreadPool {
                message: e.to_string(),
            })?;

        let run = Run {
            provider,
            ignore,
            listener,
            sessions: SessionPool::new(&pool),
            signal: AbortSignal::new(self.config.wait_ceiling),
            tracker: ProgressTracker::new(self.progress_tx.clone()),
            pending: PendingListings::new(),
        };

        listener.on_start();
        debug!(
            root = provider.root_name(),
            mode = ?provider.discovery_mode(),
            workers = self.config.workers,
            "starting discovery"
        );

        let tree = run.discover(&pool);
        if let Some(error) = run.signal.take_error() {
            return Err(error);
        }

        let files = tree.files();
        run.tracker.set_found(files.len() as u64);
        listener.on_debug(&format!("{} files found.", files.len()));
        debug!(files = files.len(), algorithm = %algorithm, "starting hashing");

        run.hash(&pool, &tree, &files, algorithm);
        if let Some(error) = run.signal.take_error() {
            return Err(error);
        }

        run.tracker.publish(Phase::Done, 0);
        listener.on_done();

        let elapsed = run.tracker.elapsed();
        let bytes = run.tracker.bytes_hashed();
        let rate = (bytes as f64 / elapsed.as_secs_f64().max(f64::EPSILON)) as u64;
        listener.on_debug(&format!(
            "{} files ({}) hashed in {:.2?}, {}/s, {} sessions.",
            files.len(),
            format_size(bytes, DECIMAL),
            elapsed,
            format_size(rate, DECIMAL),
            run.sessions.opened(),
        ));

        Ok(tree)
    }
}

impl Default for ChecksumEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared by the tasks of one computation.
struct Run<'a, P: ResourceProvider> {
    provider: &'a P,
    ignore: &'a IgnoreList,
    listener: &'a dyn ChecksumListener,
    sessions: SessionPool<'a, P::Session>,
    signal: AbortSignal,
    tracker: ProgressTracker,
    pending: PendingListings,
}

/// Result of a fetched directory listing with its externals resolved.
struct Fetched {
    entries: Vec<Entry>,
    externals: Vec<(ExternalReference, ResolvedExternal)>,
}

/// Resources added to the tree by one listing.
#[derive(Debug, Default)]
struct Expansion {
    directories: Vec<ResourceId>,
    files: u64,
}

impl<P: ResourceProvider> Run<'_, P> {
    /// Record an error; the first one becomes the outcome.
    fn fail(&self, error: ChecksumError) {
        warn!(%error, "aborting checksum computation");
        self.listener.on_error(&error);
        self.signal.abort(error);
    }

    /// Check whether new work must not start.
    fn should_stop(&self) -> bool {
        if self.signal.is_aborted() {
            return true;
        }
        if self.signal.is_expired() {
            // Every task sees the deadline pass; only the first one reports it.
            let limit = self.signal.limit();
            if self.signal.abort(ChecksumError::TimedOut { limit }) {
                let error = ChecksumError::TimedOut { limit };
                warn!(%error, "aborting checksum computation");
                self.listener.on_error(&error);
            }
            return true;
        }
        false
    }

    fn discover(&self, pool: &ThreadPool) -> ResourceTree {
        let mut tree = ResourceTree::new(self.provider.root_name());
        match self.provider.discovery_mode() {
            DiscoveryMode::Sequential => self.discover_sequential(&mut tree),
            DiscoveryMode::Parallel => {
                let shared = Mutex::new(tree);
                pool.scope(|scope| self.submit_listing(scope, &shared, ResourceId::ROOT));
                debug!(pending = self.pending.len(), "discovery drained");
                tree = shared.into_inner().unwrap_or_else(PoisonError::into_inner);
            }
        }
        tree
    }

    /// Depth-first walk on the calling thread.
    fn discover_sequential(&self, tree: &mut ResourceTree) {
        let mut stack = vec![ResourceId::ROOT];
        while let Some(dir) = stack.pop() {
            if self.should_stop() {
                return;
            }
            let location = tree.location(dir);
            let path = tree.path(dir).to_string();
            let Some(fetched) = self.fetch(&location, &path) else {
                return;
            };
            match apply_listing(tree, dir, fetched, self.ignore) {
                Ok(expansion) => {
                    self.tracker.record_found(expansion.files);
                    stack.extend(expansion.directories.into_iter().rev());
                }
                Err(error) => {
                    self.fail(error);
                    return;
                }
            }
        }
    }

    fn submit_listing<'s>(
        &'s self,
        scope: &Scope<'s>,
        tree: &'s Mutex<ResourceTree>,
        dir: ResourceId,
    ) {
        self.pending.submit(dir);
        scope.spawn(move |scope| {
            self.list_parallel(scope, tree, dir);
            self.pending.finish(dir);
        });
    }

    /// List one directory as a pool task and submit its subdirectories.
    fn list_parallel<'s>(
        &'s self,
        scope: &Scope<'s>,
        tree: &'s Mutex<ResourceTree>,
        dir: ResourceId,
    ) {
        if self.should_stop() {
            return;
        }
        let (location, path) = {
            let tree = lock(tree);
            (tree.location(dir), tree.path(dir).to_string())
        };
        let Some(fetched) = self.fetch(&location, &path) else {
            return;
        };

        let expansion = match apply_listing(&mut lock(tree), dir, fetched, self.ignore) {
            Ok(expansion) => expansion,
            Err(error) => {
                self.fail(error);
                return;
            }
        };
        self.tracker.record_found(expansion.files);
        self.tracker.publish(Phase::Discovery, self.pending.len());

        for child in expansion.directories {
            self.submit_listing(scope, tree, child);
        }
    }

    /// List a directory and resolve the externals it declares.
    fn fetch(&self, location: &Location, path: &str) -> Option<Fetched> {
        let listing = self
            .sessions
            .with_session(self.provider, |session| session.list(location));
        let Listing { entries, externals } = match listing {
            Ok(listing) => listing,
            Err(source) => {
                self.fail(ChecksumError::Listing {
                    path: path.to_string(),
                    source,
                });
                return None;
            }
        };

        let mut resolved = Vec::with_capacity(externals.len());
        for reference in externals {
            let full_path = join_path(path, &reference.path);
            if is_ignored_with_parents(self.ignore, path, &reference.path) {
                debug!(path = %full_path, "ignoring external");
                continue;
            }
            if self.should_stop() {
                return None;
            }
            let result = self
                .sessions
                .with_session(self.provider, |session| session.resolve_external(&reference));
            match result {
                Ok(external) => {
                    debug!(path = %full_path, target = %reference.target, "resolved external");
                    resolved.push((reference, external));
                }
                Err(source) => {
                    self.fail(ChecksumError::External {
                        path: full_path,
                        source,
                    });
                    return None;
                }
            }
        }

        Some(Fetched {
            entries,
            externals: resolved,
        })
    }

    fn hash(
        &self,
        pool: &ThreadPool,
        tree: &ResourceTree,
        files: &[ResourceId],
        algorithm: ChecksumAlgorithm,
    ) {
        self.tracker.report_percent(|percent| self.listener.on_progress(percent));
        self.tracker.publish(Phase::Hashing, 0);

        pool.install(|| {
            files
                .par_iter()
                .for_each(|&file| self.hash_file(tree, file, algorithm));
        });
    }

    fn hash_file(&self, tree: &ResourceTree, file: ResourceId, algorithm: ChecksumAlgorithm) {
        if self.should_stop() {
            return;
        }
        let location = tree.location(file);
        let result = self.sessions.with_session(self.provider, |session| {
            let mut reader = session.open(&location)?;
            let mut digester = algorithm.digester();
            let bytes = digester.consume(reader.as_mut())?;
            Ok((digester.finalize(), bytes))
        });

        match result {
            Ok(_) if self.should_stop() => {}
            Ok((checksum, bytes)) => {
                tree.set_checksum(file, checksum);
                let hashed = self.tracker.record_hashed(bytes);
                self.tracker
                    .report_percent(|percent| self.listener.on_progress(percent));
                if hashed % PUBLISH_INTERVAL == 0 {
                    self.tracker.publish(Phase::Hashing, 0);
                }
            }
            Err(source) => self.fail(ChecksumError::Content {
                path: tree.path(file).to_string(),
                source,
            }),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Check a path below `base`, and every intermediate directory, against the ignore list.
fn is_ignored_with_parents(ignore: &IgnoreList, base: &str, relative: &str) -> bool {
    let mut path = base.to_string();
    relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .any(|segment| {
            path = join_path(&path, segment);
            ignore.is_ignored(&path)
        })
}

/// Append the fetched children of `dir` to the tree.
fn apply_listing(
    tree: &mut ResourceTree,
    dir: ResourceId,
    fetched: Fetched,
    ignore: &IgnoreList,
) -> Result<Expansion, ChecksumError> {
    let mut expansion = Expansion::default();
    let base = tree.path(dir).to_string();
    // Only externals spliced from an ancestor listing, and the parent
    // directories created for them, exist before a directory is listed.
    let prefilled = !tree.get(dir).children().is_empty();

    for entry in fetched.entries {
        let path = join_path(&base, &entry.name);
        if ignore.is_ignored(&path) {
            debug!(%path, "ignoring resource");
            continue;
        }
        let existing = if prefilled {
            tree.child_named(dir, &entry.name)
        } else {
            None
        };
        if let Some(existing) = existing {
            if tree.origin(existing).is_some() {
                debug!(%path, "entry shadowed by an external");
            } else if entry.kind == EntryKind::Directory && tree.get(existing).is_dir() {
                // Parent of a deeper external: list its real content too.
                expansion.directories.push(existing);
            } else {
                return Err(ChecksumError::External {
                    path: path.clone(),
                    source: ProviderError::NotADirectory { path },
                });
            }
            continue;
        }
        match entry.kind {
            EntryKind::Directory => expansion.directories.push(tree.add_directory(dir, entry.name)),
            EntryKind::File => {
                tree.add_file(dir, entry.name);
                expansion.files += 1;
            }
        }
    }

    for (reference, resolved) in fetched.externals {
        splice_external(tree, dir, &base, reference, resolved, &mut expansion)?;
    }
    Ok(expansion)
}

/// Insert an external at its relative location, creating missing parents.
fn splice_external(
    tree: &mut ResourceTree,
    dir: ResourceId,
    base: &str,
    reference: ExternalReference,
    resolved: ResolvedExternal,
    expansion: &mut Expansion,
) -> Result<(), ChecksumError> {
    let full_path = join_path(base, &reference.path);
    let mut segments: Vec<&str> = reference
        .path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    let Some(name) = segments.pop() else {
        return Err(ChecksumError::External {
            path: full_path,
            source: ProviderError::other("empty external path"),
        });
    };

    let mut parent = dir;
    for segment in segments {
        parent = match tree.ensure_directory(parent, segment) {
            Some(id) => id,
            None => {
                return Err(ChecksumError::External {
                    path: full_path,
                    source: ProviderError::NotADirectory {
                        path: join_path(tree.path(parent), segment),
                    },
                });
            }
        };
    }
    if tree.child_named(parent, name).is_some() {
        return Err(ChecksumError::External {
            path: full_path,
            source: ProviderError::other("a resource with the same name already exists"),
        });
    }

    let id = match resolved.kind {
        EntryKind::Directory => {
            let id = tree.add_directory(parent, name);
            expansion.directories.push(id);
            id
        }
        EntryKind::File => {
            expansion.files += 1;
            tree.add_file(parent, name)
        }
    };
    tree.set_origin(
        id,
        Origin::new(reference.target, resolved.revision.or(reference.revision)),
    );
    Ok(())
}
