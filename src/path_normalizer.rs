//! Display-name normalization for included files
//!
//! Absolute include paths are long and mostly noise in a timeline. Each file
//! is registered once with the include directory it was found in, and is
//! shown relative to that directory, e.g. `/usr/include/c++/13/vector`
//! with directory `/usr/include/c++/13` is shown as `vector`.
//!
//! Two different files can shorten to the same display name (`/x/inc/foo.h`
//! and `/y/inc/foo.h` both become `foo.h`). Once that happens the display name
//! is marked conflicted and every file that claims it, earlier or later,
//! resolves to its absolute path instead.

use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Outcome of a [`PathNormalizer::register`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Path was registered before; nothing changed
    AlreadyRegistered,
    /// Path got a display name nobody else has
    Unique,
    /// Path got a display name another path already claimed
    Conflict,
    /// Path is not inside the directory it claims; shown as-is
    NotContained,
}

fn is_separator(c: char) -> bool {
    c == '/' || c == std::path::MAIN_SEPARATOR
}

/// Strip `dir` and exactly one separator from the front of `path`
fn relative_to<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    if dir.is_empty() {
        return None;
    }
    let rest = path.strip_prefix(dir)?;
    let rest = if dir.ends_with(is_separator) {
        rest
    } else {
        rest.strip_prefix(is_separator)?
    };
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// Maps absolute file paths to short, unambiguous display names
#[derive(Debug, Default)]
pub struct PathNormalizer {
    /// First registration wins
    directory_of: HashMap<String, String>,
    display_name_of: HashMap<String, String>,
    seen_display_names: HashSet<String>,
    conflicted_display_names: HashSet<String>,
}

impl PathNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` as found in `containing_dir`
    pub fn register(&mut self, path: &str, containing_dir: &str) -> Registration {
        if self.directory_of.contains_key(path) {
            return Registration::AlreadyRegistered;
        }
        self.directory_of
            .insert(path.to_string(), containing_dir.to_string());

        let Some(display_name) = relative_to(path, containing_dir) else {
            // Empty directory is the host's current-directory include
            if !containing_dir.is_empty() {
                tracing::warn!("Can't normalize paths {} and {}", path, containing_dir);
            }
            return Registration::NotContained;
        };

        self.display_name_of
            .insert(path.to_string(), display_name.to_string());

        if self.seen_display_names.contains(display_name) {
            tracing::debug!(
                "Display name {} is ambiguous, showing full paths",
                display_name
            );
            self.conflicted_display_names
                .insert(display_name.to_string());
            Registration::Conflict
        } else {
            self.seen_display_names.insert(display_name.to_string());
            Registration::Unique
        }
    }

    /// Make `alias` resolve the way `path` does
    ///
    /// Used when the host's name for a file differs from the real path it
    /// was registered under.
    pub fn register_alias(&mut self, alias: &str, path: &str) {
        if alias == path || self.display_name_of.contains_key(alias) {
            return;
        }
        if let Some(display_name) = self.display_name_of.get(path).cloned() {
            self.display_name_of.insert(alias.to_string(), display_name);
        }
    }

    /// Display name for `path`, or `path` itself if it has none or it is ambiguous
    pub fn resolve<'a>(&'a self, path: &'a str) -> &'a str {
        match self.display_name_of.get(path) {
            Some(display_name) if !self.conflicted_display_names.contains(display_name) => {
                display_name.as_str()
            }
            _ => path,
        }
    }

    /// Directory `path` was first registered with
    pub fn directory_of(&self, path: &str) -> Option<&str> {
        self.directory_of.get(path).map(String::as_str)
    }

    pub fn is_conflicted(&self, display_name: &str) -> bool {
        self.conflicted_display_names.contains(display_name)
    }

    /// Number of registered paths
    pub fn len(&self) -> usize {
        self.directory_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directory_of.is_empty()
    }
}

/// Turns the host's path context into the strings the normalizer registers
pub trait PathResolver {
    /// Resolved `(file, directory)` pair, or `None` to skip registration
    fn resolve(&self, file: &str, dir: &str) -> Option<(String, String)>;
}

/// Registers paths exactly as the host reports them
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimPaths;

impl PathResolver for VerbatimPaths {
    fn resolve(&self, file: &str, dir: &str) -> Option<(String, String)> {
        Some((file.to_string(), dir.to_string()))
    }
}

/// Resolves symlinks and relative components through the filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct RealPaths;

impl PathResolver for RealPaths {
    fn resolve(&self, file: &str, dir: &str) -> Option<(String, String)> {
        let real_dir = std::fs::canonicalize(Path::new(dir));
        let real_file = std::fs::canonicalize(Path::new(file));
        match (real_dir, real_file) {
            (Ok(d), Ok(f)) => Some((
                f.to_string_lossy().into_owned(),
                d.to_string_lossy().into_owned(),
            )),
            (dir_result, _) => {
                if !dir.is_empty() {
                    match dir_result {
                        Err(e) => tracing::warn!("Couldn't resolve real path of {}: {}", dir, e),
                        Ok(_) => tracing::warn!("Couldn't resolve real path of {}", file),
                    }
                }
                None
            }
        }
    }
}
