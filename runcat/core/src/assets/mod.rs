//! Icon Assets
//!
//! Read-only access to the icon frames of every (creature, theme) pair.
//!
//! # Layout
//!
//! Frames live in a hierarchical byte store under a fixed path scheme:
//!
//! ```text
//! assets/{creature}/{theme}/{theme}_{creature}_{index}.ico
//! ```
//!
//! The bytes are opaque to this crate; they are handed to the tray surface
//! untouched. [`AssetSource`] is the seam to the backing store and
//! [`IconStore`] layers frame counting and caching on top of it.
//!
//! [`EmbeddedAssetSource`] serves the frames built into the binary and is
//! the default. [`DirAssetSource`] reads a tree on disk when the operator
//! points the agent at one.

mod embedded;
mod store;

pub use embedded::EmbeddedAssetSource;
pub use store::{FrameSet, IconBytes, IconStore};

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use thiserror::Error;

use crate::creature::Creature;
use crate::theme::EffectiveTheme;

/// Root directory of the asset tree, as seen by an [`AssetSource`]
pub const ASSET_ROOT: &str = "assets";

/// File extension of every frame
pub const FRAME_EXTENSION: &str = "ico";

/// Errors that can occur while reading icon assets
#[derive(Debug, Error)]
pub enum AssetError {
    /// The requested frame, theme or creature is missing
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// The listing pattern was malformed
    #[error("Invalid asset pattern {pattern}: {message}")]
    InvalidPattern {
        /// Pattern that failed to parse
        pattern: String,
        /// Parser message
        message: String,
    },

    /// The backing store failed
    #[error("Failed to read asset {path}: {source}")]
    Io {
        /// Path being read
        path: String,
        /// Underlying error
        source: std::io::Error,
    },
}

/// Read-only hierarchical byte store holding the icon frames
pub trait AssetSource: Send + Sync {
    /// All paths matching a glob pattern
    ///
    /// # Errors
    ///
    /// Returns `AssetError::InvalidPattern` for malformed patterns.
    fn list(&self, pattern: &str) -> Result<BTreeSet<String>, AssetError>;

    /// Contents of one path
    ///
    /// # Errors
    ///
    /// Returns `AssetError::NotFound` if nothing is stored at `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError>;
}

/// Path of one frame
#[must_use]
pub fn frame_path(creature: Creature, theme: EffectiveTheme, index: usize) -> String {
    format!(
        "{ASSET_ROOT}/{creature}/{theme}/{theme}_{creature}_{index}.{FRAME_EXTENSION}",
        creature = creature.as_str(),
        theme = theme.as_str(),
    )
}

/// Glob pattern matching every frame of a (creature, theme) pair
#[must_use]
pub fn frame_pattern(creature: Creature, theme: EffectiveTheme) -> String {
    format!(
        "{ASSET_ROOT}/{creature}/{theme}/*_{creature}_*.{FRAME_EXTENSION}",
        creature = creature.as_str(),
        theme = theme.as_str(),
    )
}

fn compile_pattern(pattern: &str) -> Result<glob::Pattern, AssetError> {
    glob::Pattern::new(pattern).map_err(|e| AssetError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.msg.to_string(),
    })
}

// =============================================================================
// Filesystem source
// =============================================================================

/// Asset source backed by a directory that contains the `assets/` tree
///
/// Paths are relative to the base directory, so `assets/cat/light/...`
/// resolves to `{base}/assets/cat/light/...`.
#[derive(Debug, Clone)]
pub struct DirAssetSource {
    base: PathBuf,
}

impl DirAssetSource {
    /// Create a source rooted at `base`
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Base directory
    #[must_use]
    pub fn base(&self) -> &PathBuf {
        &self.base
    }
}

impl AssetSource for DirAssetSource {
    fn list(&self, pattern: &str) -> Result<BTreeSet<String>, AssetError> {
        // Validate before touching the filesystem
        compile_pattern(pattern)?;

        let full = self.base.join(pattern);
        let full = full.to_string_lossy();
        let entries = glob::glob(&full).map_err(|e| AssetError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.msg.to_string(),
        })?;

        let mut paths = BTreeSet::new();
        for entry in entries.flatten() {
            if let Ok(relative) = entry.strip_prefix(&self.base) {
                let relative: Vec<_> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                paths.insert(relative.join("/"));
            }
        }
        Ok(paths)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let full = self.base.join(path);
        std::fs::read(&full).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound(path.to_string())
            } else {
                AssetError::Io {
                    path: path.to_string(),
                    source: e,
                }
            }
        })
    }
}

// =============================================================================
// In-memory source
// =============================================================================

/// Asset source held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetSource {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryAssetSource {
    /// Create an empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` at `path`
    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }

    /// Builder-style insert
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    /// Add `count` frames for a (creature, theme) pair
    ///
    /// Each frame's bytes encode its own path, which keeps frames distinct.
    #[must_use]
    pub fn with_frames(mut self, creature: Creature, theme: EffectiveTheme, count: usize) -> Self {
        for index in 0..count {
            let path = frame_path(creature, theme, index);
            let bytes = path.clone().into_bytes();
            self.files.insert(path, bytes);
        }
        self
    }

    /// Number of stored files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the source holds no files
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl AssetSource for MemoryAssetSource {
    fn list(&self, pattern: &str) -> Result<BTreeSet<String>, AssetError> {
        let pattern = compile_pattern(pattern)?;
        Ok(self
            .files
            .keys()
            .filter(|path| pattern.matches(path))
            .cloned()
            .collect())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }
}
