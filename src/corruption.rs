//! Subject-corruption batches for filtered evaluation.
//!
//! Ranking the true subject of `(?, r, o)` needs a score for every entity in
//! the subject slot. Instead of one forward pass per test triple, every
//! entity is substituted once per relation, and the scores are shared by all
//! test triples with that relation.
//!
//! For each relation `r` (in index order) the generator yields chunks of
//!
//! ```text
//! test_triples   rows of the dataset with predicate r (possibly empty)
//! corruptions    [(e, r, 0) for e in chunk]      object column is a placeholder
//! filter         [chunk_len, num_entities]       1 where (e, r, j) is known
//! ```
//!
//! Relations without test triples are still emitted so that the number of
//! batches is fixed by the vocabulary alone.

use crate::mapping::OutputMapping;
use crate::onehot::encode_rows;
use ndarray::{Array2, ArrayView2, Axis};
use std::iter::FusedIterator;
use std::rc::Rc;
use tracing::trace;

/// One chunk of subject corruptions for a relation.
#[derive(Debug, Clone)]
pub struct SubjectCorruptionBatch {
    /// Relation index all corruptions share.
    pub relation: usize,
    /// Dataset rows with this relation. Shared across the relation's chunks.
    pub test_triples: Rc<Array2<usize>>,
    /// `[chunk_len, 3]` synthetic `(entity, relation, 0)` triples.
    pub corruptions: Array2<usize>,
    /// `[chunk_len, num_entities]` binary filter rows.
    pub filter: Array2<u8>,
}

/// Rows of `triples` whose predicate is `relation`, in dataset order.
pub fn triples_with_predicate(triples: ArrayView2<'_, usize>, relation: usize) -> Array2<usize> {
    let rows: Vec<usize> = triples
        .outer_iter()
        .enumerate()
        .filter(|(_, t)| t[1] == relation)
        .map(|(i, _)| i)
        .collect();
    triples.select(Axis(0), &rows)
}

/// Lazy generator over `(relation, entity chunk)` pairs.
///
/// Not restartable: once exhausted it keeps returning `None`.
#[derive(Debug, Clone)]
pub struct SubjectCorruptions<'a> {
    triples: ArrayView2<'a, usize>,
    mapping: &'a OutputMapping,
    num_entities: usize,
    num_relations: usize,
    batch_size: usize,
    relation: usize,
    next_entity: usize,
    test_triples: Option<Rc<Array2<usize>>>,
}

impl<'a> SubjectCorruptions<'a> {
    /// `batch_size` must be non-zero.
    pub(crate) fn new(
        triples: ArrayView2<'a, usize>,
        mapping: &'a OutputMapping,
        num_entities: usize,
        num_relations: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            triples,
            mapping,
            num_entities,
            num_relations,
            batch_size,
            relation: 0,
            next_entity: 0,
            test_triples: None,
        }
    }

    fn chunks_per_relation(&self) -> usize {
        self.num_entities.div_ceil(self.batch_size)
    }
}

impl Iterator for SubjectCorruptions<'_> {
    type Item = SubjectCorruptionBatch;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_entities == 0 {
            self.relation = self.num_relations;
        }
        if self.relation >= self.num_relations {
            return None;
        }

        let relation = self.relation;
        let test_triples = match &self.test_triples {
            Some(t) => Rc::clone(t),
            None => {
                let t = Rc::new(triples_with_predicate(self.triples, relation));
                trace!(relation, test_triples = t.nrows(), "subject corruptions");
                self.test_triples = Some(Rc::clone(&t));
                t
            }
        };

        let start = self.next_entity;
        let end = (start + self.batch_size).min(self.num_entities);
        let corruptions = Array2::from_shape_fn((end - start, 3), |(i, j)| match j {
            0 => start + i,
            1 => relation,
            _ => 0,
        });
        let filter = encode_rows(corruptions.view(), self.mapping, self.num_entities);

        self.next_entity = end;
        if self.next_entity >= self.num_entities {
            self.relation += 1;
            self.next_entity = 0;
            self.test_triples = None;
        }

        Some(SubjectCorruptionBatch {
            relation,
            test_triples,
            corruptions,
            filter,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.num_entities == 0 || self.relation >= self.num_relations {
            return (0, Some(0));
        }
        let per_relation = self.chunks_per_relation();
        let done = self.next_entity.div_ceil(self.batch_size);
        let n = (self.num_relations - self.relation) * per_relation - done;
        (n, Some(n))
    }
}

impl ExactSizeIterator for SubjectCorruptions<'_> {}

impl FusedIterator for SubjectCorruptions<'_> {}
