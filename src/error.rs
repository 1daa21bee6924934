use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitError {
    // Explicit mode without a partition spec
    #[error("Explicit split requested but no partition spec was given")]
    MissingPartitionSpec,

    #[error("Invalid partition spec: {0}")]
    InvalidPartitionSpec(String),

    #[error("Invalid split ratios: train={train}, val={val} (each must be in [0, 1] and sum to at most 1)")]
    InvalidRatios { train: f64, val: f64 },

    #[error("Annotation '{key}' has no \"filename\" field")]
    MissingFilename { key: String },

    #[error("Annotation '{key}' has a non-string \"filename\" field")]
    InvalidFilename { key: String },
}
