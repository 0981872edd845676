//! Glob pattern expansion into artifacts
//!
//! Patterns are matched against `/`-separated paths: `*`, `?` and `[...]` stay within
//! one path component, `**` spans directories and `{a,b}` alternation is expanded
//! before matching. Several patterns may be given in one argument separated by `;`.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use artifact_core::constants::PATTERN_SEPARATOR;
use artifact_core::{Artifact, ArtifactError, ArtifactResult};
use glob::{MatchOptions, Pattern};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::content_type::ContentTypeResolver;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Resolves glob patterns relative to a root directory.
#[derive(Clone, Debug)]
pub struct PathResolver {
    root: PathBuf,
    follow_symlinks: bool,
    content_types: ContentTypeResolver,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, content_types: ContentTypeResolver) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            content_types,
        }
    }

    /// Resolve relative to the current working directory.
    pub fn current_dir(content_types: ContentTypeResolver) -> ArtifactResult<Self> {
        let root = std::env::current_dir().map_err(|e| ArtifactError::io(".", e))?;
        Ok(Self::new(root, content_types))
    }

    /// Traverse symlinked directories while walking. Off by default.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Expand `pattern` into one artifact per matched regular file.
    ///
    /// Display paths are unique: a file matched by several patterns is included once,
    /// and two different files with the same display path fail the resolution. With
    /// symlink following enabled a file reachable through several links is only
    /// included once.
    pub fn resolve(&self, pattern: &str) -> ArtifactResult<Vec<Artifact>> {
        let mut matches = MatchSet::default();

        for single in pattern
            .split(PATTERN_SEPARATOR)
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            for expanded in expand_braces(single) {
                self.resolve_single(&expanded, &mut matches)?;
            }
        }

        if matches.files.is_empty() {
            return Err(ArtifactError::NoFilesMatched {
                pattern: pattern.to_string(),
            });
        }

        tracing::debug!(
            pattern = %pattern,
            root = %self.root.display(),
            matched = matches.files.len(),
            "Resolved artifact pattern"
        );

        matches
            .files
            .into_iter()
            .map(|(absolute_path, path)| self.build_artifact(absolute_path, path))
            .collect()
    }

    fn resolve_single(&self, pattern: &str, matches: &mut MatchSet) -> ArtifactResult<()> {
        let pattern = normalize_pattern(pattern);
        let (base, rest) = split_literal_base(&pattern);

        let base_dir = if Path::new(&pattern).is_absolute() {
            if base.is_empty() {
                PathBuf::from("/")
            } else {
                PathBuf::from(base)
            }
        } else if base.is_empty() {
            self.root.clone()
        } else {
            self.root.join(base)
        };

        let Some(rest) = rest else {
            // No wildcard: the pattern names a single path.
            let parent_is_linked = base_dir
                .parent()
                .is_some_and(|parent| self.crosses_symlinked_dir(parent));
            if is_regular_file(&base_dir) && !parent_is_linked {
                matches.insert(self, base_dir)?;
            }
            return Ok(());
        };

        if self.crosses_symlinked_dir(&base_dir) {
            tracing::debug!(
                base = %base_dir.display(),
                "Not following symlinked directory in pattern base"
            );
            return Ok(());
        }

        if !base_dir.is_dir() {
            tracing::debug!(base = %base_dir.display(), "Pattern base directory does not exist");
            return Ok(());
        }

        let matcher = Pattern::new(rest).map_err(|e| {
            ArtifactError::Config(format!("invalid glob pattern '{}': {}", pattern, e))
        })?;

        let mut walker = WalkDir::new(&base_dir)
            .min_depth(1)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name();
        if !rest.contains("**") {
            walker = walker.max_depth(rest.split('/').count());
        }

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.loop_ancestor().is_some() => {
                    tracing::debug!(
                        path = %e.path().map(|p| p.display().to_string()).unwrap_or_default(),
                        "Skipping symlink cycle"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable path while resolving artifacts");
                    continue;
                }
            };

            let is_file = if entry.path_is_symlink() && !self.follow_symlinks {
                // Links to files count, links to directories are neither matched nor walked.
                is_regular_file(entry.path())
            } else {
                entry.file_type().is_file()
            };
            if !is_file {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&base_dir) else {
                continue;
            };
            if matcher.matches_with(&slash_path(relative), MATCH_OPTIONS) {
                matches.insert(self, entry.into_path())?;
            }
        }

        Ok(())
    }

    /// Whether reaching `path` from the root passes through a symlink while
    /// following is disabled. Paths outside the root are taken as given.
    fn crosses_symlinked_dir(&self, path: &Path) -> bool {
        if self.follow_symlinks {
            return false;
        }
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };

        let mut current = self.root.clone();
        relative.components().any(|component| {
            current.push(component);
            fs::symlink_metadata(&current)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false)
        })
    }

    /// Path shown to the user and used in object keys.
    ///
    /// `..` is resolved first, so a file outside the root is shown by its absolute
    /// path without the leading `/`, the same way absolute patterns are.
    fn display_path(&self, absolute_path: &Path) -> String {
        let path = lexical_normalize(absolute_path);
        match path.strip_prefix(lexical_normalize(&self.root)) {
            Ok(relative) => slash_path(relative),
            Err(_) => slash_path(&path),
        }
    }

    fn build_artifact(&self, absolute_path: PathBuf, path: String) -> ArtifactResult<Artifact> {
        let (file_size, sha256sum) =
            hash_file(&absolute_path).map_err(|e| ArtifactError::io(&absolute_path, e))?;
        let content_type = self.content_types.resolve(&absolute_path);

        Ok(Artifact::new(
            absolute_path,
            path,
            file_size,
            sha256sum,
            content_type,
        ))
    }
}

/// Matched files in discovery order with the keys used to deduplicate them.
#[derive(Default)]
struct MatchSet {
    files: Vec<(PathBuf, String)>,
    display_paths: HashMap<String, PathBuf>,
    canonical_paths: HashSet<PathBuf>,
}

impl MatchSet {
    /// Add a matched file. The same file matched again is skipped; a different file
    /// claiming an existing display path is an error.
    fn insert(&mut self, resolver: &PathResolver, absolute_path: PathBuf) -> ArtifactResult<()> {
        let path = resolver.display_path(&absolute_path);
        if let Some(first) = self.display_paths.get(&path) {
            if lexical_normalize(first) == lexical_normalize(&absolute_path) {
                return Ok(());
            }
            return Err(ArtifactError::DuplicatePath {
                path,
                first: first.clone(),
                second: absolute_path,
            });
        }

        if resolver.follow_symlinks {
            let canonical = fs::canonicalize(&absolute_path).unwrap_or_else(|_| absolute_path.clone());
            if !self.canonical_paths.insert(canonical) {
                tracing::debug!(path = %path, "Skipping file already reached through another link");
                return Ok(());
            }
        }

        self.display_paths.insert(path.clone(), absolute_path.clone());
        self.files.push((absolute_path, path));
        Ok(())
    }
}

fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

fn hash_file(path: &Path) -> io::Result<(u64, String)> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let size = io::copy(&mut file, &mut hasher)?;
    Ok((size, hex::encode(hasher.finalize())))
}

/// Join the normal components of `path` with `/`.
fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve `.` and `..` without touching the filesystem. `..` at the root stays at
/// the root.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn normalize_pattern(pattern: &str) -> String {
    let mut pattern = pattern.replace('\\', "/");
    while let Some(stripped) = pattern.strip_prefix("./") {
        pattern = stripped.to_string();
    }
    pattern
}

fn has_wildcard(component: &str) -> bool {
    component.contains(|c| matches!(c, '*' | '?' | '['))
}

/// Split a pattern into the directory prefix without wildcards and the remainder.
///
/// `log/**/*.txt` gives `("log", Some("**/*.txt"))`; a pattern without any wildcard
/// gives `(pattern, None)`.
fn split_literal_base(pattern: &str) -> (&str, Option<&str>) {
    let mut offset = 0;
    for component in pattern.split('/') {
        if has_wildcard(component) {
            let base = pattern[..offset].trim_end_matches('/');
            return (base, Some(&pattern[offset..]));
        }
        offset += component.len() + 1;
    }
    (pattern, None)
}

/// Expand `{a,b}` alternations into separate patterns. Unbalanced braces are kept
/// literally.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, ch) in pattern[open..].char_indices() {
        let i = open + i;
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(i),
            _ => {}
        }
    }

    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| {
            let alternative = &pattern[w[0] + 1..w[1]];
            expand_braces(&format!("{}{}{}", prefix, alternative, suffix))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_base_stops_at_first_wildcard() {
        assert_eq!(split_literal_base("log/*.log"), ("log", Some("*.log")));
        assert_eq!(split_literal_base("*.log"), ("", Some("*.log")));
        assert_eq!(
            split_literal_base("a/b/**/c?.txt"),
            ("a/b", Some("**/c?.txt"))
        );
        assert_eq!(split_literal_base("a/b.txt"), ("a/b.txt", None));
        assert_eq!(split_literal_base("/tmp/*.log"), ("/tmp", Some("*.log")));
        assert_eq!(split_literal_base("/*.log"), ("", Some("*.log")));
    }

    #[test]
    fn braces_expand_to_each_alternative() {
        assert_eq!(
            expand_braces("log/*.{log,txt}"),
            vec!["log/*.log".to_string(), "log/*.txt".to_string()]
        );
        assert_eq!(
            expand_braces("{a,b{c,d}}/x"),
            vec!["a/x".to_string(), "bc/x".to_string(), "bd/x".to_string()]
        );
        assert_eq!(expand_braces("no-braces"), vec!["no-braces".to_string()]);
        assert_eq!(expand_braces("open{only"), vec!["open{only".to_string()]);
    }

    #[test]
    fn patterns_are_normalized() {
        assert_eq!(normalize_pattern("./log/*.log"), "log/*.log");
        assert_eq!(normalize_pattern("log\\*.log"), "log/*.log");
    }

    #[test]
    fn slash_path_drops_root_and_current_dir() {
        assert_eq!(slash_path(Path::new("/var/log/a.log")), "var/log/a.log");
        assert_eq!(slash_path(Path::new("./log/a.log")), "log/a.log");
    }

    #[test]
    fn parent_components_are_resolved_lexically() {
        assert_eq!(
            lexical_normalize(Path::new("/work/repo/../dist/app.zip")),
            PathBuf::from("/work/dist/app.zip")
        );
        assert_eq!(
            lexical_normalize(Path::new("/../../etc/./hosts")),
            PathBuf::from("/etc/hosts")
        );
    }

    #[test]
    fn display_path_never_climbs_out_of_the_root() {
        let resolver = PathResolver::new("/work/repo", ContentTypeResolver::default());
        assert_eq!(
            resolver.display_path(Path::new("/work/repo/log/a.log")),
            "log/a.log"
        );
        assert_eq!(
            resolver.display_path(Path::new("/work/repo/../dist/app.zip")),
            "work/dist/app.zip"
        );
        assert_eq!(
            resolver.display_path(Path::new("/work/repo/log/../../repo/b.log")),
            "b.log"
        );
    }
}
