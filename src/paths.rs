//! Document path arguments.
//!
//! An argument is `-` (read newline-separated paths from stdin), a pattern
//! (contains `*`, `?` or `[`), or a literal path. Patterns use `/` separators:
//! `*`, `?` and `[...]` match within one component, `**` matches across
//! components.

use std::io::BufRead;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

use crate::error::{DvgError, DvgResult};

/// Argument meaning "read paths from stdin".
pub const STDIN_ARG: &str = "-";

/// True when `arg` is a pattern rather than a literal path.
#[must_use]
pub fn is_pattern(arg: &str) -> bool {
    arg.contains(['*', '?', '['])
}

/// Compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    matcher: GlobMatcher,
}

impl PathPattern {
    pub fn new(pattern: &str) -> DvgResult<Self> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .backslash_escape(true)
            .build()
            .map_err(|e| DvgError::Config {
                reason: format!("invalid file pattern '{pattern}': {e}"),
            })?;
        Ok(Self {
            source: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    /// Directory to start walking from: the components before the first one
    /// containing a wildcard.
    #[must_use]
    pub fn base_dir(&self) -> PathBuf {
        let literal: Vec<&str> = self
            .source
            .split('/')
            .take_while(|part| !is_pattern(part))
            .collect();
        // the last literal component may be the file name itself
        let depth = literal.len().min(self.source.split('/').count() - 1);
        let base = literal[..depth].join("/");
        if base.is_empty() && self.source.starts_with('/') {
            PathBuf::from("/")
        } else if base.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(base)
        }
    }

    /// Regular, non-hidden files below [`Self::base_dir`] matching the pattern.
    pub fn expand(&self) -> impl Iterator<Item = PathBuf> + '_ {
        let base = self.base_dir();
        let strip_dot = base == Path::new(".");
        WalkDir::new(base)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(move |e| {
                let p = e.into_path();
                if strip_dot {
                    p.strip_prefix(".").map(Path::to_path_buf).unwrap_or(p)
                } else {
                    p
                }
            })
            .filter(|p| self.matches(&p.to_string_lossy()))
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Matches index paths against the file arguments of an index query.
#[derive(Debug, Clone, Default)]
pub struct FileMatcher {
    patterns: Vec<PathPattern>,
    names: std::collections::HashSet<String>,
}

impl FileMatcher {
    pub fn new<S: AsRef<str>>(args: &[S]) -> DvgResult<Self> {
        let mut matcher = Self::default();
        for arg in args {
            let arg = arg.as_ref();
            if is_pattern(arg) {
                matcher.patterns.push(PathPattern::new(arg)?);
            } else {
                matcher.names.insert(arg.to_string());
            }
        }
        Ok(matcher)
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.names.contains(path) || self.patterns.iter().any(|p| p.matches(path))
    }
}

/// Expands file arguments into document paths, lazily and in order.
///
/// Pattern arguments yield only existing regular files; literal arguments are
/// passed through unchecked so the document source can classify them.
pub fn expand_inputs(args: Vec<String>) -> impl Iterator<Item = DvgResult<PathBuf>> + Send {
    args.into_iter().flat_map(|arg| -> Box<dyn Iterator<Item = DvgResult<PathBuf>> + Send> {
        if arg == STDIN_ARG {
            Box::new(
                std::io::stdin()
                    .lock()
                    .lines()
                    .map(|line| {
                        line.map(|l| PathBuf::from(l.trim_end()))
                            .map_err(DvgError::from)
                    })
                    .filter(|p| !matches!(p, Ok(path) if path.as_os_str().is_empty()))
                    .collect::<Vec<_>>()
                    .into_iter(),
            )
        } else if is_pattern(&arg) {
            match PathPattern::new(&arg) {
                Ok(pattern) => Box::new(pattern.expand().map(Ok).collect::<Vec<_>>().into_iter()),
                Err(e) => Box::new(std::iter::once(Err(e))),
            }
        } else {
            Box::new(std::iter::once(Ok(PathBuf::from(arg))))
        }
    })
}

/// Rejects paths that cannot be index keys: absolute paths and paths with
/// `.`/`..` or empty components.
pub fn require_normalized_relative(arg: &str) -> DvgResult<()> {
    let invalid = || DvgError::InvalidPath {
        path: arg.to_string(),
    };
    if arg.is_empty() || arg.ends_with('/') || arg.contains("//") {
        return Err(invalid());
    }
    if arg.starts_with("./") || arg == "." {
        return Err(invalid());
    }
    for component in Path::new(arg).components() {
        match component {
            Component::Normal(_) => {}
            _ => return Err(invalid()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pattern_matching() {
        let p = PathPattern::new("docs/*.txt").unwrap();
        assert!(p.matches("docs/a.txt"));
        assert!(!p.matches("docs/sub/a.txt"));
        assert!(!p.matches("docs/a.md"));

        let deep = PathPattern::new("docs/**/*.txt").unwrap();
        assert!(deep.matches("docs/a.txt"));
        assert!(deep.matches("docs/x/y/a.txt"));

        let single = PathPattern::new("a?.md").unwrap();
        assert!(single.matches("ab.md"));
        assert!(!single.matches("a/.md"));

        let class = PathPattern::new("docs/[ab]*.txt").unwrap();
        assert!(class.matches("docs/a1.txt"));
        assert!(class.matches("docs/b.txt"));
        assert!(!class.matches("docs/c1.txt"));
        assert!(!class.matches("docs/[ab]1.txt"));
    }

    #[test]
    fn test_pattern_base_dir() {
        assert_eq!(PathPattern::new("docs/*.txt").unwrap().base_dir(), PathBuf::from("docs"));
        assert_eq!(PathPattern::new("*.txt").unwrap().base_dir(), PathBuf::from("."));
        assert_eq!(
            PathPattern::new("a/b/**/c/*.md").unwrap().base_dir(),
            PathBuf::from("a/b")
        );
    }

    #[test]
    fn test_expand_skips_hidden_and_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("d/sub")).unwrap();
        std::fs::create_dir_all(root.join("d/.git")).unwrap();
        std::fs::write(root.join("d/a.txt"), "a").unwrap();
        std::fs::write(root.join("d/sub/b.txt"), "b").unwrap();
        std::fs::write(root.join("d/.git/c.txt"), "c").unwrap();
        std::fs::write(root.join("d/.hidden.txt"), "h").unwrap();

        let pattern = format!("{}/d/**/*.txt", root.display());
        let found: Vec<PathBuf> = PathPattern::new(&pattern).unwrap().expand().collect();
        assert_eq!(found, vec![root.join("d/a.txt"), root.join("d/sub/b.txt")]);
    }

    #[test]
    fn test_expand_character_class() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("docs")).unwrap();
        for name in ["a1.txt", "b2.txt", "c3.txt"] {
            std::fs::write(root.join("docs").join(name), name).unwrap();
        }

        let pattern = format!("{}/docs/[ab]*.txt", root.display());
        let pattern = PathPattern::new(&pattern).unwrap();
        assert_eq!(pattern.base_dir(), root.join("docs"));
        let found: Vec<PathBuf> = pattern.expand().collect();
        assert_eq!(found, vec![root.join("docs/a1.txt"), root.join("docs/b2.txt")]);
    }

    #[test]
    fn test_file_matcher() {
        let m = FileMatcher::new(&["docs/*.txt", "README.md"]).unwrap();
        assert!(m.matches("docs/a.txt"));
        assert!(m.matches("README.md"));
        assert!(!m.matches("src/README.md"));

        let class = FileMatcher::new(&["notes/[0-9]*.md"]).unwrap();
        assert!(class.matches("notes/2024.md"));
        assert!(!class.matches("notes/todo.md"));
    }

    #[test]
    fn test_normalized_relative_paths() {
        assert!(require_normalized_relative("docs/a.txt").is_ok());
        assert!(require_normalized_relative("a.txt").is_ok());
        assert!(require_normalized_relative("docs/*.txt").is_ok());
        for bad in ["/abs/a.txt", "./a.txt", "docs/../a.txt", "docs//a.txt", "docs/", "", "."] {
            let err = require_normalized_relative(bad).unwrap_err();
            assert_eq!(err.status_code(), "INVALID_PATH", "{bad}");
        }
    }
}
