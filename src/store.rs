//! Named triple datasets and their index mapping.
//!
//! [`TripleStore`] holds datasets such as `"train"`, `"test"` and `"filter"`
//! as `[n, 3]` arrays. A dataset is either still labelled (strings) or already
//! mapped into index space. [`TripleStore::map_data`] moves every labelled
//! dataset into index space, creating the vocabularies on first use.

use crate::error::{Error, Result};
use crate::vocab::{create_mappings, to_idx, Vocabulary};
use ndarray::{Array2, ArrayView2};
use std::collections::HashMap;
use tracing::debug;

/// A `[n, 3]` array of `(subject, predicate, object)` triples.
#[derive(Debug, Clone, PartialEq)]
pub enum TripleArray {
    /// Raw labels, not yet mapped.
    Labels(Array2<String>),
    /// Entity and relation indices.
    Indices(Array2<usize>),
}

impl TripleArray {
    pub fn nrows(&self) -> usize {
        match self {
            Self::Labels(a) => a.nrows(),
            Self::Indices(a) => a.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            Self::Labels(a) => a.ncols(),
            Self::Indices(a) => a.ncols(),
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Indices(_))
    }

    /// Build a labelled array from string triples.
    pub fn from_labels<S: AsRef<str>>(rows: &[[S; 3]]) -> Self {
        Self::Labels(Array2::from_shape_fn((rows.len(), 3), |(i, j)| {
            rows[i][j].as_ref().to_string()
        }))
    }

    /// Build an index array from `(s, p, o)` tuples.
    pub fn from_indices(rows: &[(usize, usize, usize)]) -> Self {
        Self::Indices(Array2::from_shape_fn((rows.len(), 3), |(i, j)| {
            let (s, p, o) = rows[i];
            [s, p, o][j]
        }))
    }
}

impl From<Array2<String>> for TripleArray {
    fn from(a: Array2<String>) -> Self {
        Self::Labels(a)
    }
}

impl From<Array2<usize>> for TripleArray {
    fn from(a: Array2<usize>) -> Self {
        Self::Indices(a)
    }
}

/// What to register with [`TripleStore::set_data`].
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// One dataset; its name comes from the `dataset_type` argument.
    Single(TripleArray),
    /// Several named datasets, registered together.
    Bundle(Vec<(String, TripleArray)>),
}

impl From<TripleArray> for DataSource {
    fn from(data: TripleArray) -> Self {
        Self::Single(data)
    }
}

impl From<Array2<String>> for DataSource {
    fn from(a: Array2<String>) -> Self {
        Self::Single(TripleArray::Labels(a))
    }
}

impl From<Array2<usize>> for DataSource {
    fn from(a: Array2<usize>) -> Self {
        Self::Single(TripleArray::Indices(a))
    }
}

/// Named datasets plus the entity and relation vocabularies.
#[derive(Debug, Clone, Default)]
pub struct TripleStore {
    datasets: HashMap<String, TripleArray>,
    ent_to_idx: Vocabulary,
    rel_to_idx: Vocabulary,
}

impl TripleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from established vocabularies.
    ///
    /// Labelled data set afterwards is mapped immediately, and index data is
    /// interpreted against these tables.
    pub fn with_vocabulary(ent_to_idx: Vocabulary, rel_to_idx: Vocabulary) -> Self {
        Self {
            datasets: HashMap::new(),
            ent_to_idx,
            rel_to_idx,
        }
    }

    pub fn ent_to_idx(&self) -> &Vocabulary {
        &self.ent_to_idx
    }

    pub fn rel_to_idx(&self) -> &Vocabulary {
        &self.rel_to_idx
    }

    fn has_vocabulary(&self) -> bool {
        !self.ent_to_idx.is_empty() && !self.rel_to_idx.is_empty()
    }

    /// Check shape, mapped flag and, for index data, index ranges.
    ///
    /// Index data is only accepted against established vocabularies, and
    /// every cell must fall inside them.
    fn validate_data(&self, data: &TripleArray, mapped_status: bool) -> Result<()> {
        if data.ncols() != 3 {
            return Err(Error::MalformedInput(format!(
                "expected 3 columns, got {}",
                data.ncols()
            )));
        }
        if data.is_mapped() != mapped_status {
            return Err(Error::MalformedInput(format!(
                "mapped_status is {} but the data holds {}",
                mapped_status,
                if data.is_mapped() { "indices" } else { "labels" }
            )));
        }

        if let TripleArray::Indices(indices) = data {
            if !self.has_vocabulary() {
                return Err(Error::MalformedInput(
                    "index data requires established entity and relation vocabularies".to_string(),
                ));
            }
            let num_entities = self.ent_to_idx.len();
            let num_relations = self.rel_to_idx.len();
            for (i, row) in indices.outer_iter().enumerate() {
                if row[0] >= num_entities || row[2] >= num_entities || row[1] >= num_relations {
                    return Err(Error::MalformedInput(format!(
                        "row {i} ({}, {}, {}) is outside the vocabularies ({num_entities} entities, {num_relations} relations)",
                        row[0], row[1], row[2]
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn contains(&self, dataset_type: &str) -> bool {
        self.datasets.contains_key(dataset_type)
    }

    pub fn dataset(&self, dataset_type: &str) -> Option<&TripleArray> {
        self.datasets.get(dataset_type)
    }

    /// Names of all registered datasets, sorted.
    pub fn dataset_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.datasets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether the dataset is in index space. `None` if it is not registered.
    pub fn mapped_status(&self, dataset_type: &str) -> Option<bool> {
        self.datasets.get(dataset_type).map(TripleArray::is_mapped)
    }

    pub fn get_size(&self, dataset_type: &str) -> Result<usize> {
        self.datasets
            .get(dataset_type)
            .map(TripleArray::nrows)
            .ok_or_else(|| Error::UnknownDataset(dataset_type.to_string()))
    }

    /// Index view of a mapped dataset.
    pub fn mapped_triples(&self, dataset_type: &str) -> Result<ArrayView2<'_, usize>> {
        match self.datasets.get(dataset_type) {
            Some(TripleArray::Indices(a)) => Ok(a.view()),
            Some(TripleArray::Labels(_)) => Err(Error::MalformedInput(format!(
                "dataset `{dataset_type}` has not been mapped to indices"
            ))),
            None => Err(Error::UnknownDataset(dataset_type.to_string())),
        }
    }

    /// Register one dataset (`dataset_type` given) or a bundle.
    ///
    /// An existing dataset with the same name is overwritten. Everything is
    /// validated before anything is stored. If both vocabularies already
    /// exist, labelled data is mapped on the way in.
    ///
    /// Returns the names that were written.
    pub fn set_data(
        &mut self,
        data: impl Into<DataSource>,
        dataset_type: Option<&str>,
        mapped_status: bool,
    ) -> Result<Vec<String>> {
        let entries = match (data.into(), dataset_type) {
            (DataSource::Bundle(entries), _) => entries,
            (DataSource::Single(data), Some(name)) => vec![(name.to_string(), data)],
            (DataSource::Single(_), None) => return Err(Error::InvalidCallShape),
        };

        for (_, data) in &entries {
            self.validate_data(data, mapped_status)?;
        }

        let entries = if self.has_vocabulary() {
            entries
                .into_iter()
                .map(|(name, data)| {
                    debug!(dataset = %name, "mapping set data");
                    Ok((name, self.map_array(data)?))
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            entries
        };

        let mut names = Vec::with_capacity(entries.len());
        for (name, data) in entries {
            names.push(name.clone());
            self.datasets.insert(name, data);
        }
        Ok(names)
    }

    fn map_array(&self, data: TripleArray) -> Result<TripleArray> {
        match data {
            TripleArray::Labels(labels) => Ok(TripleArray::Indices(to_idx(
                labels.view(),
                &self.ent_to_idx,
                &self.rel_to_idx,
            )?)),
            mapped => Ok(mapped),
        }
    }

    /// Map the store if `dataset_type` is still labelled.
    pub fn ensure_mapped(&mut self, dataset_type: &str) -> Result<()> {
        match self.mapped_status(dataset_type) {
            None => Err(Error::UnknownDataset(dataset_type.to_string())),
            Some(true) => Ok(()),
            Some(false) => self.map_data(),
        }
    }

    /// Map every labelled dataset into index space.
    ///
    /// Creates the vocabularies from all labelled datasets if either one is
    /// empty. Safe to call repeatedly; mapped datasets are left alone.
    pub fn map_data(&mut self) -> Result<()> {
        let mut unmapped: Vec<&String> = self
            .datasets
            .iter()
            .filter(|(_, d)| !d.is_mapped())
            .map(|(name, _)| name)
            .collect();
        if unmapped.is_empty() {
            return Ok(());
        }
        unmapped.sort_unstable();

        if !self.has_vocabulary() {
            let (ents, rels) = create_mappings(self.datasets.values().filter_map(|d| match d {
                TripleArray::Labels(a) => Some(a.view()),
                TripleArray::Indices(_) => None,
            }));
            debug!(
                entities = ents.len(),
                relations = rels.len(),
                "created vocabularies"
            );
            self.ent_to_idx = ents;
            self.rel_to_idx = rels;
        }

        let mut mapped = Vec::with_capacity(unmapped.len());
        for name in unmapped {
            if let Some(TripleArray::Labels(labels)) = self.datasets.get(name) {
                let indices = to_idx(labels.view(), &self.ent_to_idx, &self.rel_to_idx)?;
                mapped.push((name.clone(), TripleArray::Indices(indices)));
            }
        }

        for (name, data) in mapped {
            debug!(dataset = %name, rows = data.nrows(), "mapped dataset");
            self.datasets.insert(name, data);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_set_data_requires_name() {
        let mut store = TripleStore::new();
        let data = TripleArray::from_labels(&[["a", "r", "b"]]);

        let err = store.set_data(data, None, false).unwrap_err();
        assert!(matches!(err, Error::InvalidCallShape));
        assert!(store.dataset_names().is_empty());
    }

    #[test]
    fn test_set_data_rejects_wrong_width() {
        let mut store = TripleStore::new();
        let data: Array2<usize> = Array2::zeros((4, 2));

        let err = store.set_data(data, Some("train"), true).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
        assert!(!store.contains("train"));
    }

    #[test]
    fn test_set_data_rejects_mapped_flag_mismatch() {
        let mut store = TripleStore::new();

        let labels = TripleArray::from_labels(&[["a", "r", "b"]]);
        assert!(store.set_data(labels, Some("train"), true).is_err());

        let indices = TripleArray::from_indices(&[(0, 0, 1)]);
        assert!(store.set_data(indices, Some("train"), false).is_err());
        assert!(!store.contains("train"));
    }

    #[test]
    fn test_bundle_validates_every_entry_first() {
        let mut store = TripleStore::new();
        let bundle = DataSource::Bundle(vec![
            ("train".to_string(), TripleArray::from_labels(&[["a", "r", "b"]])),
            ("test".to_string(), TripleArray::Labels(Array2::default((1, 4)))),
        ]);

        assert!(store.set_data(bundle, None, false).is_err());
        assert!(!store.contains("train"));
        assert!(!store.contains("test"));
    }

    #[test]
    fn test_map_data_builds_vocabulary() {
        let mut store = TripleStore::new();
        let bundle = DataSource::Bundle(vec![
            ("train".to_string(), TripleArray::from_labels(&[["a", "r", "b"], ["b", "r", "c"]])),
            ("test".to_string(), TripleArray::from_labels(&[["c", "s", "a"]])),
        ]);
        store.set_data(bundle, None, false).unwrap();
        assert_eq!(store.mapped_status("train"), Some(false));

        store.map_data().unwrap();

        assert_eq!(store.ent_to_idx().len(), 3);
        assert_eq!(store.rel_to_idx().len(), 2);
        assert_eq!(store.mapped_status("train"), Some(true));
        assert_eq!(store.mapped_triples("test").unwrap(), array![[2usize, 1, 0]]);

        // idempotent
        store.map_data().unwrap();
        assert_eq!(store.mapped_triples("train").unwrap(), array![[0usize, 0, 1], [1, 0, 2]]);
    }

    #[test]
    fn test_set_data_maps_when_vocabulary_exists() {
        let mut store = TripleStore::with_vocabulary(
            Vocabulary::from_labels(["a", "b"]),
            Vocabulary::from_labels(["r"]),
        );
        store
            .set_data(TripleArray::from_labels(&[["b", "r", "a"]]), Some("test"), false)
            .unwrap();

        assert_eq!(store.mapped_status("test"), Some(true));
        assert_eq!(store.mapped_triples("test").unwrap(), array![[1usize, 0, 0]]);

        let err = store
            .set_data(TripleArray::from_labels(&[["z", "r", "a"]]), Some("test"), false)
            .unwrap_err();
        assert!(matches!(err, Error::EntityNotFound(_)));
        // previous dataset survives a failed overwrite
        assert_eq!(store.get_size("test").unwrap(), 1);
    }

    fn seeded(entities: usize) -> TripleStore {
        TripleStore::with_vocabulary(
            Vocabulary::from_labels((0..entities).map(|i| format!("e{i}"))),
            Vocabulary::from_labels(["r"]),
        )
    }

    #[test]
    fn test_index_data_requires_vocabulary() {
        let mut store = TripleStore::new();
        let err = store
            .set_data(TripleArray::from_indices(&[(0, 0, 1)]), Some("train"), true)
            .unwrap_err();

        assert!(matches!(err, Error::MalformedInput(_)));
        assert!(!store.contains("train"));
    }

    #[test]
    fn test_index_data_outside_vocabulary_rejected() {
        let mut store = seeded(2);

        let err = store
            .set_data(TripleArray::from_indices(&[(0, 0, 5)]), Some("train"), true)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));

        // subject and relation are checked too
        assert!(store
            .set_data(TripleArray::from_indices(&[(0, 0, 1), (7, 0, 1)]), Some("train"), true)
            .is_err());
        assert!(store
            .set_data(TripleArray::from_indices(&[(0, 3, 1)]), Some("train"), true)
            .is_err());
        assert!(!store.contains("train"));

        store
            .set_data(TripleArray::from_indices(&[(1, 0, 0)]), Some("train"), true)
            .unwrap();
        assert_eq!(store.get_size("train").unwrap(), 1);
    }

    #[test]
    fn test_overwrite_replaces_dataset() {
        let mut store = seeded(2);
        store
            .set_data(TripleArray::from_indices(&[(0, 0, 1)]), Some("train"), true)
            .unwrap();
        store
            .set_data(TripleArray::from_indices(&[(1, 0, 0), (0, 0, 0)]), Some("train"), true)
            .unwrap();

        assert_eq!(store.get_size("train").unwrap(), 2);
        assert!(matches!(store.get_size("valid"), Err(Error::UnknownDataset(_))));
    }
}
