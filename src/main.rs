//! treesum - checksum and compare source trees.
//!
//! Usage:
//!   treesum list <PATH> [--rev REV]         Print one digest per file
//!   treesum diff <LEFT> <RIGHT>             Print differing files
//!   treesum --help                          Show help

mod console;
mod logging;

use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use tracing::info;

use treesum_analyze::{
    TreeDiffEngine, save_checksums, save_differences, write_checksums, write_differences,
};
use treesum_core::{ChecksumAlgorithm, ChecksumConfig, ChecksumError, IgnoreList, ResourceTree};
use treesum_scan::{ChecksumEngine, ChecksumListener, EngineConfig, FsProvider, TracingListener};

use crate::console::ConsoleListener;

#[derive(Parser)]
#[command(
    name = "treesum",
    version,
    about = "Checksum and diff source trees",
    long_about = "treesum hashes every file of a directory or of a git commit and \
                  reports per-file digests, or compares two trees file by file."
)]
struct Cli {
    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Do not draw a progress bar
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the digest of every file of a tree
    List {
        /// Directory or repository to hash
        path: PathBuf,

        /// Hash this git revision instead of the working directory
        #[arg(long)]
        rev: Option<String>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: ChecksumOptions,
    },

    /// Print the files that differ between two trees
    Diff {
        /// Left directory or repository
        left: PathBuf,

        /// Right directory or repository
        right: PathBuf,

        /// Git revision of the left side
        #[arg(long)]
        left_rev: Option<String>,

        /// Git revision of the right side
        #[arg(long)]
        right_rev: Option<String>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: ChecksumOptions,
    },
}

#[derive(Args)]
struct ChecksumOptions {
    /// Digest algorithm (crc32, md5, sha256, blake3)
    #[arg(short, long)]
    algorithm: Option<String>,

    /// Semicolon-separated glob patterns to skip (e.g. "**/.git;target")
    #[arg(long, conflicts_with = "ignore_file")]
    ignore: Option<String>,

    /// File with one glob pattern per line
    #[arg(long)]
    ignore_file: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// TOML file providing defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Settings resolved from the config file and the command line.
struct Settings {
    config: ChecksumConfig,
    ignore: IgnoreList,
    quiet: bool,
}

impl Settings {
    fn resolve(options: ChecksumOptions, quiet: bool) -> Result<Self> {
        let mut config = match &options.config {
            Some(path) => ChecksumConfig::from_file(path)
                .wrap_err_with(|| format!("Invalid config file {}", path.display()))?,
            None => ChecksumConfig::default(),
        };

        if let Some(name) = &options.algorithm {
            config.algorithm = ChecksumAlgorithm::parse(name)?;
        }
        if let Some(workers) = options.workers {
            config = ChecksumConfig::builder()
                .algorithm(config.algorithm)
                .ignore(config.ignore)
                .workers(workers)
                .wait_ceiling_secs(config.wait_ceiling_secs)
                .follow_symlinks(config.follow_symlinks)
                .build()
                .wrap_err("Invalid worker count")?;
        }

        let ignore = match (&options.ignore, &options.ignore_file) {
            (Some(list), _) => IgnoreList::parse_list(list)?,
            (None, Some(path)) => IgnoreList::from_file(path)?,
            (None, None) => config.ignore_list()?,
        };

        Ok(Self {
            config,
            ignore,
            quiet,
        })
    }

    fn engine(&self) -> ChecksumEngine {
        ChecksumEngine::with_config(EngineConfig::from(&self.config))
    }

    /// Hash one source, sorted and ready for output.
    fn compute(&self, path: &Path, rev: Option<&str>) -> Result<ResourceTree> {
        let label = match rev {
            Some(rev) => format!("{}@{rev}", path.display()),
            None => path.display().to_string(),
        };
        info!(source = %label, algorithm = %self.config.algorithm, "hashing");

        let console;
        let listener: &dyn ChecksumListener = if self.quiet {
            &TracingListener
        } else {
            console = ConsoleListener::new(label.clone());
            &console
        };

        let mut tree = match rev {
            Some(rev) => self.compute_snapshot(path, rev, listener)?,
            None => {
                let provider = FsProvider::new(path)?.follow_symlinks(self.config.follow_symlinks);
                self.engine()
                    .compute(&provider, self.config.algorithm, &self.ignore, listener)?
            }
        };
        tree.sort();

        let stats = tree.stats();
        info!(
            source = %label,
            files = stats.total_files,
            directories = stats.total_dirs,
            "hashed"
        );
        Ok(tree)
    }

    #[cfg(feature = "git")]
    fn compute_snapshot(
        &self,
        path: &Path,
        rev: &str,
        listener: &dyn ChecksumListener,
    ) -> Result<ResourceTree> {
        let provider = treesum_scan::GitProvider::open(path, rev)?;
        Ok(self
            .engine()
            .compute(&provider, self.config.algorithm, &self.ignore, listener)?)
    }

    #[cfg(not(feature = "git"))]
    fn compute_snapshot(
        &self,
        _path: &Path,
        rev: &str,
        _listener: &dyn ChecksumListener,
    ) -> Result<ResourceTree> {
        color_eyre::eyre::bail!("Cannot hash revision {rev}: built without git support")
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;

    match cli.command {
        Command::List {
            path,
            rev,
            output,
            options,
        } => {
            let settings = Settings::resolve(options, cli.quiet)?;
            run_list(&settings, &path, rev.as_deref(), output.as_deref())?;
        }
        Command::Diff {
            left,
            right,
            left_rev,
            right_rev,
            output,
            options,
        } => {
            let settings = Settings::resolve(options, cli.quiet)?;
            run_diff(
                &settings,
                (&left, left_rev.as_deref()),
                (&right, right_rev.as_deref()),
                output.as_deref(),
            )?;
        }
    }

    Ok(())
}

/// Hash a tree and print its checksum list.
fn run_list(settings: &Settings, path: &Path, rev: Option<&str>, output: Option<&Path>) -> Result<()> {
    let tree = settings
        .compute(path, rev)
        .wrap_err_with(|| format!("Checksum of {} failed", path.display()))?;

    match output {
        Some(output) => {
            let lines = save_checksums(&tree, output)?;
            eprintln!("Wrote {} checksums to {}", lines, output.display());
        }
        None => {
            write_checksums(&tree, &mut io::stdout().lock()).map_err(stdout_error)?;
        }
    }
    Ok(())
}

/// Hash two trees and print the files that differ.
fn run_diff(
    settings: &Settings,
    (left, left_rev): (&Path, Option<&str>),
    (right, right_rev): (&Path, Option<&str>),
    output: Option<&Path>,
) -> Result<()> {
    let left_tree = settings
        .compute(left, left_rev)
        .wrap_err_with(|| format!("Checksum of {} failed", left.display()))?;
    let right_tree = settings
        .compute(right, right_rev)
        .wrap_err_with(|| format!("Checksum of {} failed", right.display()))?;

    let diff = TreeDiffEngine::new().diff(&left_tree, &right_tree);
    match output {
        Some(output) => {
            save_differences(&diff, output)?;
        }
        None => {
            write_differences(&diff, &mut io::stdout().lock()).map_err(stdout_error)?;
        }
    }

    let summary = diff.summary();
    eprintln!(
        "{} difference(s): {} only in {}, {} only in {}, {} changed",
        summary.total(),
        summary.left_only,
        left.display(),
        summary.right_only,
        right.display(),
        summary.changed
    );
    Ok(())
}

fn stdout_error(source: io::Error) -> ChecksumError {
    ChecksumError::output("<stdout>", source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn options(args: &[&str]) -> (ChecksumOptions, bool) {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::List { options, .. } | Command::Diff { options, .. } => (options, cli.quiet),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_command_line_overrides_config_file() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp.path().join("treesum.toml");
        std::fs::write(&config, "algorithm = \"md5\"\nworkers = 4\nignore = [\"target\"]\n").unwrap();
        let config = config.to_str().unwrap();

        let (opts, _) = options(&["treesum", "list", ".", "--config", config]);
        let settings = Settings::resolve(opts, false).unwrap();
        assert_eq!(settings.config.algorithm, ChecksumAlgorithm::Md5);
        assert_eq!(settings.config.workers, 4);
        assert!(settings.ignore.is_ignored("target"));

        let (opts, quiet) = options(&[
            "treesum", "-q", "list", ".", "--config", config, "-a", "blake3", "-j", "2", "--ignore",
            "*.o;docs",
        ]);
        let settings = Settings::resolve(opts, quiet).unwrap();
        assert!(settings.quiet);
        assert_eq!(settings.config.algorithm, ChecksumAlgorithm::Blake3);
        assert_eq!(settings.config.workers, 2);
        assert!(settings.ignore.is_ignored("docs"));
        assert!(!settings.ignore.is_ignored("target"));
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let (opts, _) = options(&["treesum", "list", ".", "-j", "0"]);
        assert!(Settings::resolve(opts, false).is_err());

        let (opts, _) = options(&["treesum", "diff", "a", "b", "-a", "md4"]);
        assert!(Settings::resolve(opts, false).is_err());

        assert!(
            Cli::try_parse_from(["treesum", "list", ".", "--ignore", "x", "--ignore-file", "f"])
                .is_err()
        );
    }

    #[test]
    fn test_unwritable_report_is_output_error() {
        let tree = tempfile::tempdir().unwrap();
        std::fs::write(tree.path().join("a.txt"), "a").unwrap();
        let out = tempfile::tempdir().unwrap();
        let report = out.path().join("missing/list.txt");

        let (opts, _) = options(&["treesum", "-q", "list", "."]);
        let settings = Settings::resolve(opts, true).unwrap();
        let err = run_list(&settings, tree.path(), None, Some(&report)).unwrap_err();

        let err = err.downcast_ref::<ChecksumError>().unwrap();
        assert_eq!(err.category(), treesum_core::ErrorCategory::Output);
    }

    #[test]
    fn test_list_and_diff_local_trees() {
        let left = tempfile::tempdir().unwrap();
        let right = tempfile::tempdir().unwrap();
        std::fs::write(left.path().join("a.txt"), "a").unwrap();
        std::fs::write(right.path().join("a.txt"), "b").unwrap();
        let out = tempfile::tempdir().unwrap();

        let (opts, _) = options(&["treesum", "-q", "list", "."]);
        let settings = Settings::resolve(opts, true).unwrap();

        let list = out.path().join("list.txt");
        run_list(&settings, left.path(), None, Some(&list)).unwrap();
        let content = std::fs::read_to_string(&list).unwrap();
        assert!(content.ends_with("\ta.txt\n"));

        let report = out.path().join("diff.txt");
        run_diff(&settings, (left.path(), None), (right.path(), None), Some(&report)).unwrap();
        let content = std::fs::read_to_string(&report).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert_eq!(content.split('\t').count(), 4);
    }
}
