//! Frames compiled into the binary
//!
//! The `assets/` tree next to this crate's manifest is embedded with
//! `include_bytes!`, so a stock install needs nothing on disk.

use std::collections::BTreeSet;

use super::{compile_pattern, AssetError, AssetSource};

/// Embeds every frame index of each creature, for both themes
macro_rules! embed_frames {
    (@one $creature:ident, $theme:ident, $index:literal) => {
        (
            concat!(
                "assets/", stringify!($creature), "/", stringify!($theme), "/",
                stringify!($theme), "_", stringify!($creature), "_", stringify!($index), ".ico"
            ),
            include_bytes!(concat!(
                env!("CARGO_MANIFEST_DIR"), "/assets/", stringify!($creature), "/",
                stringify!($theme), "/", stringify!($theme), "_", stringify!($creature), "_",
                stringify!($index), ".ico"
            )) as &[u8],
        )
    };
    ($($creature:ident: [$($index:literal)*]),* $(,)?) => {
        &[$(
            $(embed_frames!(@one $creature, light, $index),)*
            $(embed_frames!(@one $creature, dark, $index),)*
        )*]
    };
}

static FRAMES: &[(&str, &[u8])] = embed_frames! {
    cat: [0 1 2 3 4],
    parrot: [0 1 2 3 4 5 6 7 8 9],
    horse: [0 1 2 3 4 5 6 7 8 9 10 11 12 13],
};

/// Asset source over the frames built into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedAssetSource;

impl EmbeddedAssetSource {
    /// Number of embedded files
    #[must_use]
    pub fn len(&self) -> usize {
        FRAMES.len()
    }

    /// Whether nothing is embedded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        FRAMES.is_empty()
    }
}

impl AssetSource for EmbeddedAssetSource {
    fn list(&self, pattern: &str) -> Result<BTreeSet<String>, AssetError> {
        let pattern = compile_pattern(pattern)?;
        Ok(FRAMES
            .iter()
            .filter(|(path, _)| pattern.matches(path))
            .map(|(path, _)| (*path).to_string())
            .collect())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        FRAMES
            .iter()
            .find(|(embedded, _)| *embedded == path)
            .map(|(_, bytes)| bytes.to_vec())
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }
}
