//! Multi-hot target encoding and the eager target cache.
//!
//! A target row for triple `(s, p, o)` is a binary vector over the entity
//! vocabulary with a 1 at every object the mapping lists for `(s, p)`.
//!
//! ```text
//! mapping  {(0,0): [1,2], (1,0): [2]}
//! (0,0,1) -> [0, 1, 1]
//! (1,0,2) -> [0, 0, 1]
//! ```

use crate::mapping::OutputMapping;
use ndarray::{Array2, ArrayView2, ArrayViewMut1};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Set the columns of `objects` in `row`.
///
/// Object indices outside the row are ignored.
pub fn encode_row(mut row: ArrayViewMut1<'_, u8>, objects: &[usize]) {
    for &o in objects {
        if let Some(cell) = row.get_mut(o) {
            *cell = 1;
        }
    }
}

/// Encode targets for every row of a mapped `[n, 3]` triple array.
///
/// Returns an `[n, num_entities]` matrix. Rows whose key is absent from the
/// mapping stay all-zero.
pub fn encode_rows(
    triples: ArrayView2<'_, usize>,
    mapping: &OutputMapping,
    num_entities: usize,
) -> Array2<u8> {
    let mut targets = Array2::zeros((triples.nrows(), num_entities));
    for (triple, row) in triples.outer_iter().zip(targets.outer_iter_mut()) {
        encode_row(row, mapping.get(triple[0], triple[1]));
    }
    targets
}

/// Which mapping a cached matrix was built from.
///
/// `generation` counts replacements of that mapping, so a matrix built from
/// an older filter or output mapping never matches the current tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodingTag {
    pub filtered: bool,
    pub generation: u64,
}

#[derive(Debug, Clone)]
struct CachedTargets {
    tag: EncodingTag,
    matrix: Array2<u8>,
}

/// Per-dataset dense target matrices for eager mode.
#[derive(Debug, Clone, Default)]
pub struct OneHotCache {
    entries: HashMap<String, CachedTargets>,
}

impl OneHotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached matrix for `dataset_type`, if it was built under `tag`.
    pub fn get(&self, dataset_type: &str, tag: EncodingTag) -> Option<&Array2<u8>> {
        self.entries
            .get(dataset_type)
            .filter(|e| e.tag == tag)
            .map(|e| &e.matrix)
    }

    /// Cached matrix for `dataset_type` under any tag.
    pub fn get_any(&self, dataset_type: &str) -> Option<(EncodingTag, &Array2<u8>)> {
        self.entries.get(dataset_type).map(|e| (e.tag, &e.matrix))
    }

    pub fn insert(&mut self, dataset_type: &str, tag: EncodingTag, matrix: Array2<u8>) {
        self.entries
            .insert(dataset_type.to_string(), CachedTargets { tag, matrix });
    }

    /// Return the matrix cached under `tag`, rebuilding it with `encode` on a
    /// miss or tag mismatch.
    pub fn get_or_encode(
        &mut self,
        dataset_type: &str,
        tag: EncodingTag,
        encode: impl FnOnce() -> Array2<u8>,
    ) -> &Array2<u8> {
        match self.entries.entry(dataset_type.to_string()) {
            Entry::Occupied(entry) if entry.get().tag == tag => &entry.into_mut().matrix,
            Entry::Occupied(entry) => {
                let cached = entry.into_mut();
                *cached = CachedTargets {
                    tag,
                    matrix: encode(),
                };
                &cached.matrix
            }
            Entry::Vacant(entry) => {
                &entry
                    .insert(CachedTargets {
                        tag,
                        matrix: encode(),
                    })
                    .matrix
            }
        }
    }

    pub fn evict(&mut self, dataset_type: &str) {
        self.entries.remove(dataset_type);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn scenario() -> (Array2<usize>, OutputMapping) {
        let triples = array![[0usize, 0, 1], [0, 0, 2], [1, 0, 2]];
        let mapping = OutputMapping::from_triples(triples.view());
        (triples, mapping)
    }

    #[test]
    fn test_encode_rows() {
        let (triples, mapping) = scenario();
        let targets = encode_rows(triples.view(), &mapping, 3);

        assert_eq!(targets, array![[0u8, 1, 1], [0, 1, 1], [0, 0, 1]]);
    }

    #[test]
    fn test_unknown_key_row_is_zero() {
        let (_, mapping) = scenario();
        let targets = encode_rows(array![[2usize, 0, 0]].view(), &mapping, 3);
        assert_eq!(targets, array![[0u8, 0, 0]]);
    }

    #[test]
    fn test_duplicate_objects_encode_once() {
        let mapping: OutputMapping = [(0, 0, 1), (0, 0, 1)].into_iter().collect();
        let targets = encode_rows(array![[0usize, 0, 1]].view(), &mapping, 2);
        assert_eq!(targets, array![[0u8, 1]]);
    }

    #[test]
    fn test_cache_tag_mismatch_rebuilds() {
        let mut cache = OneHotCache::new();
        let raw = EncodingTag { filtered: false, generation: 1 };
        let filtered = EncodingTag { filtered: true, generation: 1 };

        cache.get_or_encode("train", raw, || Array2::zeros((1, 2)));
        assert!(cache.get("train", raw).is_some());
        assert!(cache.get("train", filtered).is_none());

        let mut calls = 0;
        cache.get_or_encode("train", raw, || {
            calls += 1;
            Array2::zeros((1, 2))
        });
        assert_eq!(calls, 0);

        let m = cache.get_or_encode("train", filtered, || Array2::ones((1, 2)));
        assert_eq!(m, &array![[1u8, 1]]);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("train", raw).is_none());

        cache.clear();
        assert!(cache.is_empty());
    }
}
