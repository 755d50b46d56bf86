use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, Result};

/// A configuration file located by a [`FileResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Full path of the file that matched.
    pub path: PathBuf,
    /// The file content.
    pub content: String,
}

/// Looks up configuration files by basename.
///
/// The top-level file and every file it includes go through the same
/// resolver, so layering decisions are made in one place.
pub trait FileResolver {
    fn resolve(&self, basename: &str) -> Result<ResolvedFile>;
}

/// Resolves basenames against an ordered list of directories.
///
/// The first directory that contains the basename wins. Placing a
/// per-deployment directory ahead of the installation directory lets it
/// shadow individual files while still including the shared defaults.
#[derive(Debug, Clone)]
pub struct SearchPathResolver {
    directories: Vec<PathBuf>,
}

impl SearchPathResolver {
    pub fn new<I, P>(directories: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let directories: Vec<PathBuf> = directories.into_iter().map(Into::into).collect();
        if directories.is_empty() {
            return Err(ConfigError::EmptySearchPath);
        }
        Ok(Self { directories })
    }

    /// Returns the full path of the first `directory/basename` that exists.
    ///
    /// The basename is always taken relative to a search directory: absolute
    /// paths and `..` components are rejected.
    pub fn resolve_path(&self, basename: &str) -> Result<PathBuf> {
        let relative = Path::new(basename);
        let stays_inside = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if basename.is_empty() || !stays_inside {
            return Err(ConfigError::InvalidBasename {
                basename: basename.to_owned(),
            });
        }

        for directory in &self.directories {
            let candidate = directory.join(basename);
            if is_file(&candidate) {
                debug!(basename, path = %candidate.display(), "Resolved configuration file");
                return Ok(candidate);
            }
        }

        Err(ConfigError::FileNotFound {
            basename: basename.to_owned(),
            searched: self.directories.clone(),
        })
    }
}

impl FileResolver for SearchPathResolver {
    fn resolve(&self, basename: &str) -> Result<ResolvedFile> {
        let path = self.resolve_path(basename)?;
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(ResolvedFile { path, content })
    }
}

fn is_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
