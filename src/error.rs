use thiserror::Error;

/// Errors that can occur in lattix-oneton.
///
/// Every variant is a caller-fixable configuration or usage error. They are
/// raised before any adapter state is touched and are never retried.
#[derive(Error, Debug)]
pub enum Error {
    /// Requested dataset name was never registered.
    #[error("Dataset `{0}` not found: use `set_data` to register it first")]
    UnknownDataset(String),
    /// Filtered operation requested without a registered filter.
    #[error("Filter not found: cannot use `use_filter = true` before `set_filter`")]
    MissingFilter,
    /// Unfiltered operation requested without a general output mapping.
    #[error("Output mapping was not set before generating one-hot targets")]
    MissingOutputMapping,
    /// Dataset is not a `[n, 3]` triple array, or its mapped flag disagrees with its payload.
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    /// Neither a dataset bundle nor a (data, name) pair was supplied.
    #[error("Incorrect usage: expected a dataset bundle or a dataset with its name")]
    InvalidCallShape,
    /// A batch count or batch size of zero.
    #[error("Invalid batch count: must be at least 1")]
    InvalidBatchCount,
    /// Entity label not found in the entity vocabulary.
    #[error("Entity not found: {0}")]
    EntityNotFound(String),
    /// Relation label not found in the relation vocabulary.
    #[error("Relation not found: {0}")]
    RelationNotFound(String),
    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for lattix-oneton.
pub type Result<T> = std::result::Result<T, Error>;
