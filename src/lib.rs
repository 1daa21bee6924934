// Train/val/test partitioning of keyed image annotation documents

pub mod error;
pub mod split;

pub use error::SplitError;
pub use split::{
    partition_sizes, split, split_explicit, split_random, split_random_with, Annotations,
    Partition, PartitionSpec, SplitRatios, Splits,
};
