//! Icon frame store
//!
//! Frame counts are discovered once, when the store is built, and never
//! change afterwards. Frame sets are loaded lazily on first use of a
//! (creature, theme) pair and then kept for the life of the process.
//! Assets are static: a set is read from the source at most once, even when
//! some or all of its frames are missing.
//!
//! The cache is a sharded map: lookups on different pairs do not contend.
//! Two threads that miss on the same pair at the same time may both load
//! it; the loads are identical and the first insert wins.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use super::{frame_path, frame_pattern, AssetError, AssetSource};
use crate::creature::Creature;
use crate::theme::EffectiveTheme;

/// Bytes of one icon frame, cheap to clone
pub type IconBytes = Arc<[u8]>;

type FrameKey = (Creature, EffectiveTheme);

/// Ordered frames of one (creature, theme) animation loop
///
/// One slot per frame index; a slot is empty when that frame could not be
/// read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSet {
    frames: Vec<Option<IconBytes>>,
}

impl FrameSet {
    /// Number of frame slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the set has no slots
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames actually loaded
    #[must_use]
    pub fn loaded(&self) -> usize {
        self.frames.iter().filter(|f| f.is_some()).count()
    }

    /// Frame at `index`, if it was loaded
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&IconBytes> {
        self.frames.get(index).and_then(Option::as_ref)
    }
}

/// Frame cache in front of an [`AssetSource`]
pub struct IconStore {
    source: Arc<dyn AssetSource>,
    counts: HashMap<FrameKey, usize>,
    cache: DashMap<FrameKey, Arc<FrameSet>>,
}

impl IconStore {
    /// Build a store, probing frame counts for every (creature, theme) pair
    ///
    /// A probe that fails or finds nothing falls back to the creature's
    /// built-in count.
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        let mut counts = HashMap::new();
        for creature in Creature::ALL {
            for theme in EffectiveTheme::ALL {
                let count = probe_count(source.as_ref(), creature, theme);
                counts.insert((creature, theme), count);
            }
        }

        Self {
            source,
            counts,
            cache: DashMap::new(),
        }
    }

    /// Number of frames in the (creature, theme) loop
    #[must_use]
    pub fn frame_count(&self, creature: Creature, theme: EffectiveTheme) -> usize {
        self.counts.get(&(creature, theme)).copied().unwrap_or(0)
    }

    /// Frame `index` of the (creature, theme) loop
    ///
    /// # Errors
    ///
    /// Returns `AssetError::NotFound` if `index` is out of range or that
    /// frame could not be loaded.
    pub fn frame(
        &self,
        creature: Creature,
        theme: EffectiveTheme,
        index: usize,
    ) -> Result<IconBytes, AssetError> {
        let set = self.frames(creature, theme);
        set.get(index).cloned().ok_or_else(|| {
            AssetError::NotFound(format!(
                "frame {index} of {creature}/{theme} ({} of {} loaded)",
                set.loaded(),
                set.len()
            ))
        })
    }

    /// Whole frame set, loading it on first access
    ///
    /// Frames that cannot be read leave an empty slot; the set is cached
    /// either way and the source is not consulted again.
    pub fn frames(&self, creature: Creature, theme: EffectiveTheme) -> Arc<FrameSet> {
        let key = (creature, theme);
        if let Some(set) = self.cache.get(&key) {
            return Arc::clone(set.value());
        }

        // Load outside any shard lock; a racing loader produces the same set
        let loaded = Arc::new(self.load(creature, theme));
        let set = self.cache.entry(key).or_insert(loaded);
        Arc::clone(set.value())
    }

    /// Number of cached frame sets
    #[must_use]
    pub fn cached_sets(&self) -> usize {
        self.cache.len()
    }

    fn load(&self, creature: Creature, theme: EffectiveTheme) -> FrameSet {
        let count = self.frame_count(creature, theme);
        let mut frames = Vec::with_capacity(count);
        let mut missing = Vec::new();
        for index in 0..count {
            match self.source.read(&frame_path(creature, theme, index)) {
                Ok(bytes) => frames.push(Some(IconBytes::from(bytes))),
                Err(e) => {
                    debug!(creature = %creature, theme = %theme, index, error = %e, "Frame unreadable");
                    missing.push(index);
                    frames.push(None);
                }
            }
        }

        if missing.is_empty() {
            debug!(creature = %creature, theme = %theme, frames = count, "Loaded frame set");
        } else {
            warn!(
                creature = %creature,
                theme = %theme,
                missing = ?missing,
                loaded = count - missing.len(),
                "Frame set incomplete"
            );
        }
        FrameSet { frames }
    }
}

impl std::fmt::Debug for IconStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconStore")
            .field("counts", &self.counts)
            .field("cached_sets", &self.cache.len())
            .finish_non_exhaustive()
    }
}

fn probe_count(source: &dyn AssetSource, creature: Creature, theme: EffectiveTheme) -> usize {
    let fallback = creature.default_frame_count();
    match source.list(&frame_pattern(creature, theme)) {
        Ok(paths) if !paths.is_empty() => paths.len(),
        Ok(_) => {
            debug!(creature = %creature, theme = %theme, fallback, "No frames found, using default count");
            fallback
        }
        Err(e) => {
            warn!(creature = %creature, theme = %theme, error = %e, "Frame probe failed, using default count");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssetSource;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts reads so tests can prove memoization
    struct CountingSource {
        inner: MemoryAssetSource,
        reads: AtomicUsize,
    }

    impl AssetSource for CountingSource {
        fn list(&self, pattern: &str) -> Result<BTreeSet<String>, AssetError> {
            self.inner.list(pattern)
        }

        fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(path)
        }
    }

    fn full_source() -> MemoryAssetSource {
        let mut source = MemoryAssetSource::new();
        for creature in Creature::ALL {
            for theme in EffectiveTheme::ALL {
                source = source.with_frames(creature, theme, creature.default_frame_count());
            }
        }
        source
    }

    #[test]
    fn test_counts_are_probed() {
        let source = MemoryAssetSource::new()
            .with_frames(Creature::Cat, EffectiveTheme::Light, 3)
            .with_frames(Creature::Cat, EffectiveTheme::Dark, 8);
        let store = IconStore::new(Arc::new(source));

        assert_eq!(store.frame_count(Creature::Cat, EffectiveTheme::Light), 3);
        assert_eq!(store.frame_count(Creature::Cat, EffectiveTheme::Dark), 8);
        // Nothing on disk for horses: built-in default
        assert_eq!(store.frame_count(Creature::Horse, EffectiveTheme::Light), 14);
    }

    #[test]
    fn test_frame_lookup() {
        let store = IconStore::new(Arc::new(full_source()));
        let frame = store.frame(Creature::Parrot, EffectiveTheme::Dark, 4).unwrap();
        assert_eq!(&*frame, b"assets/parrot/dark/dark_parrot_4.ico");
    }

    #[test]
    fn test_out_of_range_is_not_found() {
        let store = IconStore::new(Arc::new(full_source()));
        let result = store.frame(Creature::Cat, EffectiveTheme::Light, 5);
        assert!(matches!(result, Err(AssetError::NotFound(_))));
    }

    fn counting(inner: MemoryAssetSource) -> Arc<CountingSource> {
        Arc::new(CountingSource {
            inner,
            reads: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_missing_assets_are_read_once() {
        let source = counting(MemoryAssetSource::new());
        let store = IconStore::new(source.clone());

        for tick in 0..100 {
            let result = store.frame(Creature::Horse, EffectiveTheme::Light, tick % 14);
            assert!(matches!(result, Err(AssetError::NotFound(_))));
        }

        // One pass over the default count, then never again
        assert_eq!(source.reads.load(Ordering::SeqCst), 14);
        assert_eq!(store.cached_sets(), 1);
    }

    #[test]
    fn test_gap_in_frames_keeps_the_rest() {
        // Files 0, 1, 2 and 4: the probe counts four
        let mut inner = MemoryAssetSource::new();
        for index in [0, 1, 2, 4] {
            inner.insert(frame_path(Creature::Cat, EffectiveTheme::Dark, index), vec![index as u8]);
        }
        let source = counting(inner);
        let store = IconStore::new(source.clone());
        assert_eq!(store.frame_count(Creature::Cat, EffectiveTheme::Dark), 4);

        for _ in 0..10 {
            for index in 0..3 {
                let frame = store.frame(Creature::Cat, EffectiveTheme::Dark, index).unwrap();
                assert_eq!(&*frame, &[index as u8]);
            }
            assert!(matches!(
                store.frame(Creature::Cat, EffectiveTheme::Dark, 3),
                Err(AssetError::NotFound(_))
            ));
        }

        let set = store.frames(Creature::Cat, EffectiveTheme::Dark);
        assert_eq!((set.len(), set.loaded()), (4, 3));
        assert_eq!(source.reads.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_frame_sets_are_memoized() {
        let source = counting(full_source());
        let store = IconStore::new(source.clone());

        for index in 0..5 {
            store.frame(Creature::Cat, EffectiveTheme::Light, index).unwrap();
        }
        store.frame(Creature::Cat, EffectiveTheme::Light, 0).unwrap();

        // One read per frame, only on first access
        assert_eq!(source.reads.load(Ordering::SeqCst), 5);
        assert_eq!(store.cached_sets(), 1);
    }

    #[test]
    fn test_concurrent_lookups_agree() {
        let store = Arc::new(IconStore::new(Arc::new(full_source())));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let creature = Creature::ALL[i % 3];
                    let theme = EffectiveTheme::ALL[i % 2];
                    let count = store.frame_count(creature, theme);
                    (0..count)
                        .map(|index| store.frame(creature, theme, index).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            let frames = handle.join().unwrap();
            assert!(!frames.is_empty());
        }
        assert!(store.cached_sets() <= 6);
    }
}
