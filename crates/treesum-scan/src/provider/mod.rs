//! Resource providers shipped with the engine.

#[cfg(feature = "git")]
mod attributes;
mod fs;
#[cfg(feature = "git")]
mod git;

pub use fs::{FsProvider, FsSession};
#[cfg(feature = "git")]
pub use git::{GitProvider, GitSession};
