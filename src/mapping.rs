//! `(subject, predicate) → [object]` multimaps.

use ndarray::ArrayView2;
use std::collections::HashMap;

/// Ordered multimap from `(subject_idx, predicate_idx)` to object indices.
///
/// Objects under a key keep insertion order and are not deduplicated.
/// Looking up an absent key yields an empty slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputMapping {
    objects: HashMap<(usize, usize), Vec<usize>>,
}

impl OutputMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group the objects of a mapped `[n, 3]` triple array by `(subject, predicate)`.
    pub fn from_triples(triples: ArrayView2<'_, usize>) -> Self {
        triples
            .outer_iter()
            .map(|t| (t[0], t[1], t[2]))
            .collect()
    }

    pub fn insert(&mut self, subject: usize, predicate: usize, object: usize) {
        self.objects
            .entry((subject, predicate))
            .or_default()
            .push(object);
    }

    /// Known objects for `(subject, predicate)`.
    pub fn get(&self, subject: usize, predicate: usize) -> &[usize] {
        self.objects
            .get(&(subject, predicate))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains_key(&self, subject: usize, predicate: usize) -> bool {
        self.objects.contains_key(&(subject, predicate))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.objects.keys().copied()
    }
}

impl FromIterator<(usize, usize, usize)> for OutputMapping {
    fn from_iter<I: IntoIterator<Item = (usize, usize, usize)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (s, p, o) in iter {
            mapping.insert(s, p, o);
        }
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_groups_by_subject_predicate() {
        let triples = array![[0usize, 0, 1], [0, 0, 2], [1, 0, 2]];
        let mapping = OutputMapping::from_triples(triples.view());

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get(0, 0), &[1, 2]);
        assert_eq!(mapping.get(1, 0), &[2]);
    }

    #[test]
    fn test_missing_key_is_empty() {
        let mapping: OutputMapping = [(0, 1, 2)].into_iter().collect();
        assert!(mapping.get(2, 1).is_empty());
        assert!(!mapping.contains_key(2, 1));
        assert!(mapping.contains_key(0, 1));
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        let mapping: OutputMapping = [(0, 0, 3), (0, 0, 1), (0, 0, 3)].into_iter().collect();
        assert_eq!(mapping.get(0, 0), &[3, 1, 3]);
    }
}
