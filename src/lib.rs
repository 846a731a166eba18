//! `lattix-oneton` turns knowledge-graph triples into 1-to-N training batches.
//!
//! In 1-to-N scoring (ConvE and friends) a model scores `(subject, predicate)`
//! against every entity at once. The training target for a triple is therefore
//! not a single object but a multi-hot row over the entity vocabulary marking
//! every object known for that `(subject, predicate)` key:
//!
//! ```text
//! train: (0,0,1) (0,0,2) (1,0,2)
//!
//! mapping {(0,0): [1,2], (1,0): [2]}
//!
//! (0,0,1) -> [0, 1, 1]
//! (0,0,2) -> [0, 1, 1]
//! (1,0,2) -> [0, 0, 1]
//! ```
//!
//! ## Pieces
//!
//! - [`TripleStore`] - named `[n, 3]` datasets and the entity/relation [`Vocabulary`]
//! - [`OutputMapping`] - `(subject, predicate) → [object]` multimap
//! - [`OneToNAdapter`] - output and filter mappings, target cache, batch generators
//! - [`OneToNBatches`] - training batches of `(triples, targets)`
//! - [`SubjectCorruptions`] - per-relation subject corruptions for filtered evaluation
//!
//! ## Memory modes
//!
//! | `low_memory` | targets | memory |
//! |--------------|---------|--------|
//! | `false` | dense matrix cached per dataset, batches borrow slices | O(n × entities) |
//! | `true` | encoded per batch on demand | O(batch × entities) |
//!
//! Both modes yield identical batches.

mod adapter;
mod batch;
mod config;
mod corruption;
mod error;
mod mapping;
mod onehot;
mod store;
mod vocab;

pub use adapter::{OneToNAdapter, FILTER_DATASET};
pub use batch::{OneToNBatch, OneToNBatches};
pub use config::AdapterConfig;
pub use corruption::{triples_with_predicate, SubjectCorruptionBatch, SubjectCorruptions};
pub use error::{Error, Result};
pub use mapping::OutputMapping;
pub use onehot::{encode_row, encode_rows, EncodingTag, OneHotCache};
pub use store::{DataSource, TripleArray, TripleStore};
pub use vocab::{create_mappings, to_idx, Vocabulary};
