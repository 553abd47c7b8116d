//! Glob path matching for ignore lists.
//!
//! A pattern is split on `/` into segments. `**` matches zero or more path
//! segments; every other segment is compiled into an anchored regular
//! expression matching exactly one path segment.

use std::path::Path;

use regex::Regex;

use crate::error::ChecksumError;

const SEPARATOR: char = '/';
const ANY_DEPTH: &str = "**";

/// One compiled pattern segment.
#[derive(Debug, Clone)]
enum Segment {
    /// Zero or more path segments.
    AnyDepth,
    /// Exactly one path segment matching the expression.
    Name(Regex),
}

/// Compiled glob pattern matched against `/`-separated paths.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    glob: String,
    segments: Vec<Segment>,
}

impl PathMatcher {
    /// Compile a glob pattern.
    pub fn from_glob(glob: &str) -> Result<Self, ChecksumError> {
        let segments = glob
            .split(SEPARATOR)
            .map(|part| {
                let part = part.trim();
                if part == ANY_DEPTH {
                    return Ok(Segment::AnyDepth);
                }
                let regex = glob_to_regex(part);
                Regex::new(&regex)
                    .map(Segment::Name)
                    .map_err(|e| ChecksumError::InvalidPattern {
                        pattern: glob.to_string(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            glob: glob.to_string(),
            segments,
        })
    }

    /// The source glob.
    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// Check if the whole path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        let names: Vec<&str> = path.split(SEPARATOR).filter(|s| !s.is_empty()).collect();
        self.matches_from(0, &names)
    }

    fn matches_from(&self, pattern_index: usize, names: &[&str]) -> bool {
        let Some(segment) = self.segments.get(pattern_index) else {
            return names.is_empty();
        };
        match segment {
            // Try the rest of the pattern against ever shorter suffixes.
            Segment::AnyDepth => {
                (0..=names.len()).any(|skip| self.matches_from(pattern_index + 1, &names[skip..]))
            }
            Segment::Name(regex) => match names.split_first() {
                Some((name, rest)) => regex.is_match(name) && self.matches_from(pattern_index + 1, rest),
                None => false,
            },
        }
    }
}

/// Translate a single glob segment into an anchored regular expression.
fn glob_to_regex(glob: &str) -> String {
    let mut regex = String::with_capacity(glob.len() * 2 + 2);
    regex.push('^');
    let mut escaping = false;
    let mut brace_depth = 0usize;

    for c in glob.chars() {
        if escaping {
            push_literal(&mut regex, c);
            escaping = false;
            continue;
        }
        match c {
            '\\' => escaping = true,
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '{' => {
                regex.push_str("(?:");
                brace_depth += 1;
            }
            '}' if brace_depth > 0 => {
                regex.push(')');
                brace_depth -= 1;
            }
            ',' if brace_depth > 0 => regex.push('|'),
            _ => push_literal(&mut regex, c),
        }
    }

    if escaping {
        push_literal(&mut regex, '\\');
    }
    // Unclosed braces stay groups so the expression still compiles.
    for _ in 0..brace_depth {
        regex.push(')');
    }
    regex.push('$');
    regex
}

fn push_literal(regex: &mut String, c: char) {
    let mut buffer = [0u8; 4];
    regex.push_str(&regex::escape(c.encode_utf8(&mut buffer)));
}

/// Ordered set of ignore matchers.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    matchers: Vec<PathMatcher>,
}

impl IgnoreList {
    /// Create an empty ignore list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every pattern, skipping blank ones.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, ChecksumError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = patterns
            .into_iter()
            .filter(|p| !p.as_ref().trim().is_empty())
            .map(|p| PathMatcher::from_glob(p.as_ref().trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { matchers })
    }

    /// Parse a semicolon separated list of patterns.
    pub fn parse_list(list: &str) -> Result<Self, ChecksumError> {
        Self::from_patterns(list.split(';'))
    }

    /// Parse newline separated patterns; lines starting with `#` are comments.
    pub fn parse_lines(content: &str) -> Result<Self, ChecksumError> {
        Self::from_patterns(content.lines().filter(|line| !line.trim_start().starts_with('#')))
    }

    /// Read newline separated patterns from a file.
    pub fn from_file(path: &Path) -> Result<Self, ChecksumError> {
        let content = std::fs::read_to_string(path).map_err(|e| ChecksumError::InvalidConfig {
            message: format!("unable to read ignore file {}: {e}", path.display()),
        })?;
        Self::parse_lines(&content)
    }

    /// Append a matcher.
    pub fn push(&mut self, matcher: PathMatcher) {
        self.matchers.push(matcher);
    }

    /// Check if any matcher matches the path.
    pub fn is_ignored(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(path))
    }

    /// Compiled matchers in order.
    pub fn matchers(&self) -> &[PathMatcher] {
        &self.matchers
    }

    /// Number of matchers.
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Check if the list has no matcher.
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(glob: &str) -> PathMatcher {
        PathMatcher::from_glob(glob).unwrap()
    }

    #[test]
    fn test_single_segment_star() {
        let m = matcher("*.txt");
        assert!(m.matches("a.txt"));
        assert!(!m.matches("a/b.txt"));
        assert!(!m.matches("a.txt.bak"));
    }

    #[test]
    fn test_any_depth() {
        let m = matcher("**/b.txt");
        assert!(m.matches("b.txt"));
        assert!(m.matches("a/b.txt"));
        assert!(m.matches("x/y/b.txt"));
        assert!(!m.matches("x/y/c.txt"));
        assert!(!m.matches("b.txt/c"));
    }

    #[test]
    fn test_any_depth_in_the_middle() {
        let m = matcher("src/**/test");
        assert!(m.matches("src/test"));
        assert!(m.matches("src/a/b/test"));
        assert!(!m.matches("lib/a/test"));
        assert!(!m.matches("src/a/test/x"));
    }

    #[test]
    fn test_trailing_any_depth() {
        let m = matcher("target/**");
        assert!(m.matches("target"));
        assert!(m.matches("target/debug/build"));
        assert!(!m.matches("src/target"));
    }

    #[test]
    fn test_braces() {
        let m = matcher("{a,b}.txt");
        assert!(m.matches("a.txt"));
        assert!(m.matches("b.txt"));
        assert!(!m.matches("c.txt"));
        assert!(!m.matches("ab.txt"));
    }

    #[test]
    fn test_comma_outside_braces_is_literal() {
        let m = matcher("a,b");
        assert!(m.matches("a,b"));
        assert!(!m.matches("a"));
    }

    #[test]
    fn test_question_mark_and_metacharacters() {
        let m = matcher("file?.(1)+");
        assert!(m.matches("file1.(1)+"));
        assert!(!m.matches("file.(1)+"));
        assert!(!m.matches("file12(1)+"));
    }

    #[test]
    fn test_escaping() {
        let m = matcher(r"\*.txt");
        assert!(m.matches("*.txt"));
        assert!(!m.matches("a.txt"));
    }

    #[test]
    fn test_ignore_list() {
        let list = IgnoreList::parse_list("**/.svn; *.log ;").unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.is_ignored("a/b/.svn"));
        assert!(list.is_ignored("build.log"));
        assert!(!list.is_ignored("src/build.log"));

        let list = IgnoreList::parse_lines("# comment\n\ntarget\n**/*.tmp\n").unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.is_ignored("target"));
        assert!(list.is_ignored("a/x.tmp"));
    }
}
