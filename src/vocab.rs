//! Entity and relation vocabularies.
//!
//! A [`Vocabulary`] assigns dense indices `0..len` to labels in insertion
//! order, so iterating the vocabulary and iterating `0..len` agree.

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView2};
use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

/// Insertion-ordered label → index table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vocabulary from labels. Repeated labels keep their first index.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self::new();
        for label in labels {
            vocab.insert(label);
        }
        vocab
    }

    /// Insert a label, returning its index (existing or newly assigned).
    pub fn insert(&mut self, label: impl Into<String>) -> usize {
        let label = label.into();
        if let Some(&idx) = self.index.get(&label) {
            return idx;
        }
        let idx = self.labels.len();
        self.index.insert(label.clone(), idx);
        self.labels.push(label);
        idx
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn label(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// All indices, in insertion order.
    pub fn indices(&self) -> Range<usize> {
        0..self.labels.len()
    }

    /// `(label, index)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.labels.iter().enumerate().map(|(i, l)| (l.as_str(), i))
    }
}

/// Build `(entities, relations)` vocabularies from labelled triple arrays.
///
/// Entities are the union of subjects and objects. Both vocabularies are
/// sorted so that index assignment does not depend on dataset order.
pub fn create_mappings<'a>(
    datasets: impl IntoIterator<Item = ArrayView2<'a, String>>,
) -> (Vocabulary, Vocabulary) {
    let mut entities = BTreeSet::new();
    let mut relations = BTreeSet::new();

    for triples in datasets {
        for row in triples.outer_iter() {
            entities.insert(row[0].clone());
            relations.insert(row[1].clone());
            entities.insert(row[2].clone());
        }
    }

    (
        Vocabulary::from_labels(entities),
        Vocabulary::from_labels(relations),
    )
}

/// Map a labelled `[n, 3]` triple array into index space.
pub fn to_idx(
    triples: ArrayView2<'_, String>,
    ent_to_idx: &Vocabulary,
    rel_to_idx: &Vocabulary,
) -> Result<Array2<usize>> {
    let mut mapped = Array2::zeros(triples.raw_dim());

    for (i, row) in triples.outer_iter().enumerate() {
        let entity = |label: &String| {
            ent_to_idx
                .get(label)
                .ok_or_else(|| Error::EntityNotFound(label.clone()))
        };
        mapped[[i, 0]] = entity(&row[0])?;
        mapped[[i, 1]] = rel_to_idx
            .get(&row[1])
            .ok_or_else(|| Error::RelationNotFound(row[1].clone()))?;
        mapped[[i, 2]] = entity(&row[2])?;
    }

    Ok(mapped)
}
