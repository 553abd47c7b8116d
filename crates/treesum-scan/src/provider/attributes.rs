//! Checkout attributes read from the `.gitattributes` files of a commit.
//!
//! Only the attributes that change the bytes a checkout writes are kept:
//! `ident`, `text` and `eol`, plus the `binary` macro and the legacy `crlf`
//! spelling. Files are applied from the root down to the file's directory
//! and lines in order, so later assignments win.

use std::collections::HashMap;

use git2::{ObjectType, Oid, Repository, Tree};
use tracing::debug;
use treesum_core::{PathMatcher, ProviderError};

const ATTRIBUTES_FILE: &str = ".gitattributes";

/// State of one attribute for a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum AttrState {
    #[default]
    Unspecified,
    Set,
    Unset,
    Value(String),
}

/// Which attribute an assignment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attr {
    Ident,
    Text,
    Eol,
}

/// How a line's pattern is matched.
#[derive(Debug)]
enum AttrPattern {
    /// No `/` in the pattern: matches the file name at any depth.
    Name(PathMatcher),
    /// Matches the path relative to the directory of the attributes file.
    Path(PathMatcher),
}

#[derive(Debug)]
struct AttrLine {
    pattern: AttrPattern,
    assignments: Vec<(Attr, AttrState)>,
}

impl AttrLine {
    fn matches(&self, relative: &str, name: &str) -> bool {
        match &self.pattern {
            AttrPattern::Name(matcher) => matcher.matches(name),
            AttrPattern::Path(matcher) => matcher.matches(relative),
        }
    }
}

/// Parse the content of a `.gitattributes` file.
fn parse(content: &str) -> Vec<AttrLine> {
    let mut lines = Vec::new();
    for line in content.lines() {
        let mut words = line.split_whitespace();
        let Some(pattern) = words.next() else {
            continue;
        };
        // Comments, macro definitions and negative patterns.
        if pattern.starts_with('#') || pattern.starts_with("[attr]") || pattern.starts_with('!') {
            continue;
        }
        let assignments: Vec<_> = words.flat_map(parse_assignment).collect();
        if assignments.is_empty() {
            continue;
        }
        // Directory patterns never match files.
        if pattern.ends_with('/') {
            continue;
        }
        let anchored = pattern.contains('/');
        let matcher = match PathMatcher::from_glob(pattern.trim_start_matches('/')) {
            Ok(matcher) => matcher,
            Err(error) => {
                debug!(%error, "skipping attributes line");
                continue;
            }
        };
        let pattern = if anchored {
            AttrPattern::Path(matcher)
        } else {
            AttrPattern::Name(matcher)
        };
        lines.push(AttrLine {
            pattern,
            assignments,
        });
    }
    lines
}

/// Expand one attribute word into the assignments it stands for.
fn parse_assignment(word: &str) -> Vec<(Attr, AttrState)> {
    let (name, state) = if let Some(name) = word.strip_prefix('-') {
        (name, AttrState::Unset)
    } else if let Some(name) = word.strip_prefix('!') {
        (name, AttrState::Unspecified)
    } else if let Some((name, value)) = word.split_once('=') {
        (name, AttrState::Value(value.to_string()))
    } else {
        (word, AttrState::Set)
    };
    match (name, state) {
        ("ident", state) => vec![(Attr::Ident, state)],
        ("text", state) => vec![(Attr::Text, state)],
        ("eol", state) => vec![(Attr::Eol, state)],
        ("binary", AttrState::Set) => vec![(Attr::Text, AttrState::Unset)],
        ("crlf", AttrState::Value(value)) if value == "input" => {
            vec![(Attr::Eol, AttrState::Value("lf".to_string()))]
        }
        ("crlf", state) => vec![(Attr::Text, state)],
        _ => Vec::new(),
    }
}

/// Resolved checkout attributes of one path.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct CheckoutAttributes {
    pub ident: AttrState,
    pub text: AttrState,
    pub eol: AttrState,
}

impl CheckoutAttributes {
    /// Apply the lines of one attributes file to a path below its directory.
    fn apply(&mut self, lines: &[AttrLine], relative: &str, name: &str) {
        for line in lines.iter().filter(|line| line.matches(relative, name)) {
            for (attr, state) in &line.assignments {
                let slot = match attr {
                    Attr::Ident => &mut self.ident,
                    Attr::Text => &mut self.text,
                    Attr::Eol => &mut self.eol,
                };
                *slot = state.clone();
            }
        }
    }

    /// Whether `$Id$` is expanded.
    pub fn expands_ident(&self) -> bool {
        self.ident == AttrState::Set
    }

    /// Whether LF is written as CRLF for this content.
    pub fn converts_to_crlf(&self, binary: bool) -> bool {
        if self.eol != AttrState::Value("crlf".to_string()) {
            return false;
        }
        match self.text {
            AttrState::Unset => false,
            AttrState::Set => true,
            _ => !binary,
        }
    }
}

/// Parsed attributes files keyed by blob id.
#[derive(Default)]
pub(crate) struct AttributeCache {
    files: HashMap<Oid, Vec<AttrLine>>,
}

impl AttributeCache {
    /// Resolve the attributes of `path` in the tree of a commit.
    pub fn resolve<'r>(
        &mut self,
        repo: &'r Repository,
        root: Tree<'r>,
        path: &str,
    ) -> Result<CheckoutAttributes, ProviderError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((name, dirs)) = segments.split_last() else {
            return Ok(CheckoutAttributes::default());
        };

        let mut attributes = CheckoutAttributes::default();
        let mut tree = root;
        for depth in 0..=dirs.len() {
            if let Some(blob) = attributes_blob(&tree) {
                let relative = segments[depth..].join("/");
                attributes.apply(self.lines(repo, blob)?, &relative, name);
            }
            if let Some(dir) = dirs.get(depth) {
                let id = tree
                    .get_name(dir)
                    .map(|entry| entry.id())
                    .ok_or_else(|| ProviderError::NotFound {
                        path: segments[..=depth].join("/"),
                    })?;
                tree = repo.find_tree(id)?;
            }
        }
        Ok(attributes)
    }

    fn lines(&mut self, repo: &Repository, blob: Oid) -> Result<&[AttrLine], ProviderError> {
        if !self.files.contains_key(&blob) {
            let content = repo.find_blob(blob)?;
            let lines = parse(&String::from_utf8_lossy(content.content()));
            self.files.insert(blob, lines);
        }
        Ok(self.files.get(&blob).map(Vec::as_slice).unwrap_or_default())
    }
}

fn attributes_blob(tree: &Tree<'_>) -> Option<Oid> {
    tree.get_name(ATTRIBUTES_FILE)
        .filter(|entry| entry.kind() == Some(ObjectType::Blob))
        .map(|entry| entry.id())
}
