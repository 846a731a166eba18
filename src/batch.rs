//! 1-to-N training batches.
//!
//! A dataset of `n` triples is cut into contiguous batches. Each batch pairs
//! the triple rows with their multi-hot targets over the entity vocabulary.
//!
//! # Batch sizing
//!
//! | `batches_count` | batch size      | batches           |
//! |-----------------|-----------------|-------------------|
//! | `None`          | 1               | `n`               |
//! | `Some(k)`       | `ceil(n / k)`   | at most `k`       |
//!
//! The last batch may be shorter. Batches are never padded, and a trailing
//! batch with no rows is not emitted.

use crate::error::{Error, Result};
use crate::mapping::OutputMapping;
use crate::onehot::encode_rows;
use ndarray::{s, ArrayView2, CowArray, Ix2};
use std::iter::FusedIterator;

/// One batch of triples and their targets.
#[derive(Debug, Clone)]
pub struct OneToNBatch<'a> {
    /// `[b, 3]` triple rows.
    pub triples: ArrayView2<'a, usize>,
    /// `[b, num_entities]` binary targets. Borrowed from the adapter's cache
    /// in eager mode, owned in low-memory mode.
    pub targets: CowArray<'a, u8, Ix2>,
}

impl OneToNBatch<'_> {
    pub fn len(&self) -> usize {
        self.triples.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.nrows() == 0
    }
}

#[derive(Debug, Clone)]
pub(crate) enum TargetSource<'a> {
    /// Precomputed `[n, num_entities]` matrix, sliced like the triples.
    Cached(ArrayView2<'a, u8>),
    /// Encode each batch on demand.
    OnTheFly {
        mapping: &'a OutputMapping,
        num_entities: usize,
    },
}

/// Resolve `(batch_size, batches_count)` for a dataset of `size` rows.
pub(crate) fn batch_plan(size: usize, batches_count: Option<usize>) -> Result<(usize, usize)> {
    match batches_count {
        None => Ok((1, size)),
        Some(0) => Err(Error::InvalidBatchCount),
        Some(k) => Ok((size.div_ceil(k), k)),
    }
}

/// Iterator over the batches of one dataset.
///
/// Not restartable: once exhausted it keeps returning `None`. Request a new
/// one from the adapter to iterate again.
#[derive(Debug, Clone)]
pub struct OneToNBatches<'a> {
    triples: ArrayView2<'a, usize>,
    targets: TargetSource<'a>,
    batch_size: usize,
    batches_count: usize,
    next: usize,
}

impl<'a> OneToNBatches<'a> {
    pub(crate) fn new(
        triples: ArrayView2<'a, usize>,
        targets: TargetSource<'a>,
        batch_size: usize,
        batches_count: usize,
    ) -> Self {
        Self {
            triples,
            targets,
            batch_size,
            batches_count,
            next: 0,
        }
    }

    fn remaining(&self) -> usize {
        if self.batch_size == 0 {
            return 0;
        }
        let non_empty = self.triples.nrows().div_ceil(self.batch_size);
        non_empty.min(self.batches_count).saturating_sub(self.next)
    }
}

impl<'a> Iterator for OneToNBatches<'a> {
    type Item = OneToNBatch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining() == 0 {
            self.next = self.batches_count;
            return None;
        }

        let start = self.next * self.batch_size;
        let end = (start + self.batch_size).min(self.triples.nrows());
        self.next += 1;

        let triples = self.triples.slice_move(s![start..end, ..]);
        let targets = match &self.targets {
            TargetSource::Cached(matrix) => {
                CowArray::from(matrix.slice_move(s![start..end, ..]))
            }
            TargetSource::OnTheFly {
                mapping,
                num_entities,
            } => CowArray::from(encode_rows(triples, mapping, *num_entities)),
        };

        Some(OneToNBatch { triples, targets })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl ExactSizeIterator for OneToNBatches<'_> {}

impl FusedIterator for OneToNBatches<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn dataset(n: usize) -> Array2<usize> {
        Array2::from_shape_fn((n, 3), |(i, j)| if j == 0 { i } else { 0 })
    }

    #[test]
    fn test_batch_plan() {
        assert_eq!(batch_plan(10, None).unwrap(), (1, 10));
        assert_eq!(batch_plan(10, Some(3)).unwrap(), (4, 3));
        assert_eq!(batch_plan(9, Some(3)).unwrap(), (3, 3));
        assert!(matches!(batch_plan(9, Some(0)), Err(Error::InvalidBatchCount)));
    }

    #[test]
    fn test_last_batch_shorter() {
        let triples = dataset(10);
        let mapping = OutputMapping::from_triples(triples.view());
        let (size, count) = batch_plan(10, Some(3)).unwrap();
        let batches = OneToNBatches::new(
            triples.view(),
            TargetSource::OnTheFly {
                mapping: &mapping,
                num_entities: 10,
            },
            size,
            count,
        );

        assert_eq!(batches.len(), 3);
        let sizes: Vec<usize> = batches.map(|b| b.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_no_empty_trailing_batches() {
        let triples = dataset(3);
        let targets = Array2::<u8>::zeros((3, 4));
        let (size, count) = batch_plan(3, Some(5)).unwrap();
        let mut batches =
            OneToNBatches::new(triples.view(), TargetSource::Cached(targets.view()), size, count);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches.by_ref().count(), 3);
        assert!(batches.next().is_none());
        assert!(batches.next().is_none());
    }

    #[test]
    fn test_cached_targets_are_borrowed() {
        let triples = dataset(4);
        let targets = array![[1u8, 0], [0, 1], [1, 1], [0, 0]];
        let batches =
            OneToNBatches::new(triples.view(), TargetSource::Cached(targets.view()), 2, 2);

        let collected: Vec<_> = batches.collect();
        assert!(collected[0].targets.is_view());
        assert_eq!(collected[1].targets, array![[1u8, 1], [0, 0]]);
        assert_eq!(collected[1].triples, triples.slice(s![2..4, ..]));
    }

    #[test]
    fn test_empty_dataset() {
        let triples = dataset(0);
        let targets = Array2::<u8>::zeros((0, 4));
        let batches = OneToNBatches::new(triples.view(), TargetSource::Cached(targets.view()), 1, 0);
        assert_eq!(batches.count(), 0);
    }
}
