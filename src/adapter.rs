//! The 1-to-N dataset adapter.
//!
//! [`OneToNAdapter`] layers 1-to-N target encoding on top of a
//! [`TripleStore`]:
//!
//! 1. Register datasets with [`set_data`](OneToNAdapter::set_data).
//! 2. Build an [`OutputMapping`] from the training set and install it with
//!    [`set_output_mapping`](OneToNAdapter::set_output_mapping).
//! 3. Optionally register known-true facts with
//!    [`set_filter`](OneToNAdapter::set_filter).
//! 4. Pull batches with [`get_next_batch`](OneToNAdapter::get_next_batch) or,
//!    for evaluation,
//!    [`get_next_batch_subject_corruptions`](OneToNAdapter::get_next_batch_subject_corruptions).
//!
//! # Example
//!
//! ```rust
//! use lattix_oneton::{AdapterConfig, OneToNAdapter, TripleArray};
//!
//! let mut adapter = OneToNAdapter::new(AdapterConfig::default());
//! let train = TripleArray::from_labels(&[
//!     ["alice", "knows", "bob"],
//!     ["alice", "knows", "carol"],
//!     ["bob", "knows", "carol"],
//! ]);
//! adapter.set_data(train, Some("train"), false)?;
//!
//! let mapping = adapter.generate_output_mapping("train")?;
//! adapter.set_output_mapping(mapping);
//!
//! for batch in adapter.get_next_batch(Some(2), "train", false)? {
//!     assert_eq!(batch.targets.ncols(), 3);
//! }
//! # Ok::<(), lattix_oneton::Error>(())
//! ```

use crate::batch::{batch_plan, OneToNBatches, TargetSource};
use crate::config::AdapterConfig;
use crate::corruption::SubjectCorruptions;
use crate::error::{Error, Result};
use crate::mapping::OutputMapping;
use crate::onehot::{encode_rows, EncodingTag, OneHotCache};
use crate::store::{DataSource, TripleArray, TripleStore};
use crate::vocab::Vocabulary;
use ndarray::Array2;
use tracing::debug;

/// Name under which [`OneToNAdapter::set_filter`] registers its dataset.
pub const FILTER_DATASET: &str = "filter";

fn select_mapping<'m>(
    output_mapping: &'m Option<OutputMapping>,
    filter_mapping: &'m Option<OutputMapping>,
    use_filter: bool,
) -> Result<&'m OutputMapping> {
    if use_filter {
        filter_mapping.as_ref().ok_or(Error::MissingFilter)
    } else {
        output_mapping.as_ref().ok_or(Error::MissingOutputMapping)
    }
}

/// Dataset adapter producing 1-to-N batches.
#[derive(Debug, Clone, Default)]
pub struct OneToNAdapter {
    store: TripleStore,
    config: AdapterConfig,
    output_mapping: Option<OutputMapping>,
    filter_mapping: Option<OutputMapping>,
    output_generation: u64,
    filter_generation: u64,
    onehot: OneHotCache,
    negatives: Vec<(usize, usize)>,
}

impl OneToNAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self::with_store(TripleStore::new(), config)
    }

    /// Wrap an existing store, e.g. one seeded with vocabularies.
    pub fn with_store(store: TripleStore, config: AdapterConfig) -> Self {
        Self {
            store,
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn is_low_memory(&self) -> bool {
        self.config.low_memory
    }

    pub fn store(&self) -> &TripleStore {
        &self.store
    }

    pub fn ent_to_idx(&self) -> &Vocabulary {
        self.store.ent_to_idx()
    }

    pub fn rel_to_idx(&self) -> &Vocabulary {
        self.store.rel_to_idx()
    }

    pub fn get_size(&self, dataset_type: &str) -> Result<usize> {
        self.store.get_size(dataset_type)
    }

    /// Register a dataset (or a bundle of them).
    ///
    /// Cached targets of overwritten datasets are dropped. Overwriting the
    /// filter dataset rebuilds the filter mapping.
    pub fn set_data(
        &mut self,
        data: impl Into<DataSource>,
        dataset_type: Option<&str>,
        mapped_status: bool,
    ) -> Result<()> {
        let names = self.store.set_data(data, dataset_type, mapped_status)?;
        for name in &names {
            self.onehot.evict(name);
        }
        if names.iter().any(|n| n == FILTER_DATASET) {
            self.rebuild_filter_mapping()?;
        }
        Ok(())
    }

    /// Map all labelled datasets into index space.
    pub fn map_data(&mut self) -> Result<()> {
        self.store.map_data()
    }

    /// Group the objects of `dataset_type` by `(subject, predicate)`.
    ///
    /// Maps the data first if needed. The result is returned, not stored.
    pub fn generate_output_mapping(&mut self, dataset_type: &str) -> Result<OutputMapping> {
        self.store.ensure_mapped(dataset_type)?;
        Ok(OutputMapping::from_triples(
            self.store.mapped_triples(dataset_type)?,
        ))
    }

    /// Register known-true triples and build the filter mapping from them.
    pub fn set_filter(
        &mut self,
        filter_triples: impl Into<TripleArray>,
        mapped_status: bool,
    ) -> Result<()> {
        self.set_data(filter_triples.into(), Some(FILTER_DATASET), mapped_status)
    }

    fn rebuild_filter_mapping(&mut self) -> Result<()> {
        let mapping = self.generate_output_mapping(FILTER_DATASET)?;
        debug!(keys = mapping.len(), "filter mapping set");
        self.filter_mapping = Some(mapping);
        self.filter_generation += 1;
        Ok(())
    }

    pub fn filter_mapping(&self) -> Option<&OutputMapping> {
        self.filter_mapping.as_ref()
    }

    /// Install the mapping used for unfiltered targets.
    ///
    /// Clears every cached target matrix so stale rows are never served.
    pub fn set_output_mapping(&mut self, output_mapping: OutputMapping) {
        debug!(
            keys = output_mapping.len(),
            cleared = self.onehot.len(),
            "output mapping set"
        );
        self.output_mapping = Some(output_mapping);
        self.output_generation += 1;
        self.onehot.clear();
    }

    pub fn output_mapping(&self) -> Option<&OutputMapping> {
        self.output_mapping.as_ref()
    }

    fn encoding_tag(&self, use_filter: bool) -> EncodingTag {
        EncodingTag {
            filtered: use_filter,
            generation: if use_filter {
                self.filter_generation
            } else {
                self.output_generation
            },
        }
    }

    /// Precompute the `[size, num_entities]` target matrix for `dataset_type`.
    ///
    /// Uses the filter mapping when `use_filter` is set, else the output
    /// mapping. A no-op in low-memory mode, where targets are built per batch.
    pub fn generate_onehot_outputs(&mut self, dataset_type: &str, use_filter: bool) -> Result<()> {
        if !self.store.contains(dataset_type) {
            return Err(Error::UnknownDataset(dataset_type.to_string()));
        }
        let tag = self.encoding_tag(use_filter);
        let mapping = select_mapping(&self.output_mapping, &self.filter_mapping, use_filter)?;
        if self.config.low_memory {
            return Ok(());
        }

        self.store.ensure_mapped(dataset_type)?;
        let matrix = encode_rows(
            self.store.mapped_triples(dataset_type)?,
            mapping,
            self.store.ent_to_idx().len(),
        );
        debug!(
            dataset = dataset_type,
            filtered = use_filter,
            shape = ?matrix.shape(),
            "generated one-hot outputs"
        );
        self.onehot.insert(dataset_type, tag, matrix);
        Ok(())
    }

    /// The cached target matrix for `dataset_type`, whatever mode built it.
    pub fn onehot_outputs(&self, dataset_type: &str) -> Option<&Array2<u8>> {
        self.onehot.get_any(dataset_type).map(|(_, m)| m)
    }

    pub fn onehot_cache(&self) -> &OneHotCache {
        &self.onehot
    }

    /// Batches of `(triples, targets)` over `dataset_type`.
    ///
    /// `batches_count = None` yields one triple per batch. In eager mode the
    /// target cache is (re)built first if it is missing or was built from a
    /// different mapping than the one requested.
    pub fn get_next_batch(
        &mut self,
        batches_count: Option<usize>,
        dataset_type: &str,
        use_filter: bool,
    ) -> Result<OneToNBatches<'_>> {
        self.store.ensure_mapped(dataset_type)?;
        let (batch_size, batches_count) =
            batch_plan(self.store.get_size(dataset_type)?, batches_count)?;
        let tag = self.encoding_tag(use_filter);

        let mapping = select_mapping(&self.output_mapping, &self.filter_mapping, use_filter)?;
        let triples = self.store.mapped_triples(dataset_type)?;
        let num_entities = self.store.ent_to_idx().len();

        let targets = if self.config.low_memory {
            TargetSource::OnTheFly {
                mapping,
                num_entities,
            }
        } else {
            let matrix = self.onehot.get_or_encode(dataset_type, tag, || {
                debug!(
                    dataset = dataset_type,
                    filtered = use_filter,
                    "regenerating one-hot outputs"
                );
                encode_rows(triples, mapping, num_entities)
            });
            TargetSource::Cached(matrix.view())
        };

        Ok(OneToNBatches::new(triples, targets, batch_size, batches_count))
    }

    /// Subject corruptions for every relation, for filtered evaluation.
    ///
    /// `batch_size = None` puts the whole entity vocabulary in one chunk.
    pub fn get_next_batch_subject_corruptions(
        &mut self,
        batch_size: Option<usize>,
        dataset_type: &str,
        use_filter: bool,
    ) -> Result<SubjectCorruptions<'_>> {
        self.store.ensure_mapped(dataset_type)?;
        let num_entities = self.store.ent_to_idx().len();
        let batch_size = match batch_size {
            None => num_entities.max(1),
            Some(0) => return Err(Error::InvalidBatchCount),
            Some(n) => n,
        };

        let mapping = select_mapping(&self.output_mapping, &self.filter_mapping, use_filter)?;
        Ok(SubjectCorruptions::new(
            self.store.mapped_triples(dataset_type)?,
            mapping,
            num_entities,
            self.store.rel_to_idx().len(),
            batch_size,
        ))
    }

    /// Collect every `(entity, relation)` pair that is not a key of `companion`.
    ///
    /// Pairs are ordered by entity, then relation. The list is recomputed from
    /// scratch on each call and kept for [`negatives`](Self::negatives).
    ///
    /// The companion is borrowed while `self` is borrowed mutably, so this
    /// adapter's own mapping has to be cloned first:
    /// `let own = adapter.output_mapping().cloned();`
    /// `adapter.generate_negative_output_mappings(own.as_ref())`.
    pub fn generate_negative_output_mappings(
        &mut self,
        companion: Option<&OutputMapping>,
    ) -> Result<&[(usize, usize)]> {
        let companion = companion.ok_or(Error::MissingOutputMapping)?;

        let relations = self.store.rel_to_idx().indices();
        self.negatives = self
            .store
            .ent_to_idx()
            .indices()
            .flat_map(|e| relations.clone().map(move |r| (e, r)))
            .filter(|&(e, r)| !companion.contains_key(e, r))
            .collect();

        debug!(negatives = self.negatives.len(), "generated negative mappings");
        Ok(&self.negatives)
    }

    /// [`generate_negative_output_mappings`](Self::generate_negative_output_mappings)
    /// against another adapter's output mapping.
    pub fn negatives_against(&mut self, companion: &OneToNAdapter) -> Result<&[(usize, usize)]> {
        self.generate_negative_output_mappings(companion.output_mapping())
    }

    pub fn negatives(&self) -> &[(usize, usize)] {
        &self.negatives
    }
}
