// Train / validation / test partitioning of an annotation document.
//
// Two policies:
//   - random:   shuffle the index space with a CSPRNG and slice it by ratio
//   - explicit: route each record by its "filename" against caller lists
//
// Records are never inspected beyond "filename" and are copied unchanged.

use std::collections::HashSet;

use log::{debug, info, trace};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::{CryptoRng, Rng};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::SplitError;

/// Annotation document: `{key: {filename: ..., ...}}`, kept in document order.
pub type Annotations = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Train,
    Val,
    Test,
}

/// Filenames designating train and validation membership; everything else is test.
///
/// Deserialises from `{"train": [...], "val": [...]}`. Any other keys (a `"test"`
/// list, for instance) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PartitionSpec {
    pub train: HashSet<String>,
    pub val: HashSet<String>,
}

impl PartitionSpec {
    pub fn new(
        train: impl IntoIterator<Item = impl Into<String>>,
        val: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            train: train.into_iter().map(Into::into).collect(),
            val: val.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, SplitError> {
        Self::deserialize(value).map_err(|e| SplitError::InvalidPartitionSpec(e.to_string()))
    }

    /// Train wins over val when a filename is listed in both.
    pub fn classify(&self, filename: &str) -> Partition {
        if self.train.contains(filename) {
            Partition::Train
        } else if self.val.contains(filename) {
            Partition::Val
        } else {
            Partition::Test
        }
    }
}

/// Train and validation fractions for random mode; test takes the remainder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    train: f64,
    val: f64,
}

impl SplitRatios {
    pub fn new(train: f64, val: f64) -> Result<Self, SplitError> {
        let in_range = |r: f64| r.is_finite() && (0.0..=1.0).contains(&r);
        if !in_range(train) || !in_range(val) || train + val > 1.0 + 1e-9 {
            return Err(SplitError::InvalidRatios { train, val });
        }
        Ok(Self { train, val })
    }

    pub fn train(&self) -> f64 {
        self.train
    }

    pub fn val(&self) -> f64 {
        self.val
    }

    pub fn test(&self) -> f64 {
        (1.0 - self.train - self.val).max(0.0)
    }
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self { train: 0.6, val: 0.2 }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Splits {
    pub train: Annotations,
    pub val: Annotations,
    pub test: Annotations,
}

impl Splits {
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.train.len(), self.val.len(), self.test.len())
    }

    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, partition: Partition) -> &Annotations {
        match partition {
            Partition::Train => &self.train,
            Partition::Val => &self.val,
            Partition::Test => &self.test,
        }
    }

    fn get_mut(&mut self, partition: Partition) -> &mut Annotations {
        match partition {
            Partition::Train => &mut self.train,
            Partition::Val => &mut self.val,
            Partition::Test => &mut self.test,
        }
    }

    pub fn into_tuple(self) -> (Annotations, Annotations, Annotations) {
        (self.train, self.val, self.test)
    }

    /// Reassemble a single document (train, then val, then test).
    pub fn merge(self) -> Annotations {
        let mut all = self.train;
        all.extend(self.val);
        all.extend(self.test);
        all
    }
}

/// Split `annotations` with the default 60/20/20 ratios when `random_shuffle`
/// is set, otherwise by filename membership in `partition_spec`.
pub fn split(
    annotations: &Annotations,
    partition_spec: Option<&PartitionSpec>,
    random_shuffle: bool,
) -> Result<Splits, SplitError> {
    if random_shuffle {
        return Ok(split_random(annotations, SplitRatios::default()));
    }
    let spec = partition_spec.ok_or(SplitError::MissingPartitionSpec)?;
    split_explicit(annotations, spec)
}

/// Sizes of the train, val and test slices for `n` records.
///
/// Val is clamped so that `train + val <= n`; test is never negative.
pub fn partition_sizes(n: usize, ratios: SplitRatios) -> (usize, usize, usize) {
    let num_train = ((n as f64 * ratios.train).round() as usize).min(n);
    let num_val = ((n as f64 * ratios.val).round() as usize).min(n - num_train);
    (num_train, num_val, n - num_train - num_val)
}

pub fn split_random(annotations: &Annotations, ratios: SplitRatios) -> Splits {
    split_random_with(annotations, ratios, &mut OsRng)
}

/// Random mode with a caller supplied generator. Only cryptographically
/// strong generators are accepted.
pub fn split_random_with<R>(annotations: &Annotations, ratios: SplitRatios, rng: &mut R) -> Splits
where
    R: Rng + CryptoRng + ?Sized,
{
    let entries: Vec<(&String, &Value)> = annotations.iter().collect();
    let mut index: Vec<usize> = (0..entries.len()).collect();
    index.shuffle(rng);

    let (num_train, num_val, num_test) = partition_sizes(entries.len(), ratios);
    debug!(
        "Random split of {} annotations: train={} val={} test={}",
        entries.len(),
        num_train,
        num_val,
        num_test
    );

    let mut splits = Splits::default();
    for (pos, &i) in index.iter().enumerate() {
        let partition = if pos < num_train {
            Partition::Train
        } else if pos < num_train + num_val {
            Partition::Val
        } else {
            Partition::Test
        };
        let (key, record) = entries[i];
        splits.get_mut(partition).insert(key.clone(), record.clone());
    }

    let (train, val, test) = splits.counts();
    info!("Split sizes: train={} val={} test={}", train, val, test);
    splits
}

pub fn split_explicit(
    annotations: &Annotations,
    spec: &PartitionSpec,
) -> Result<Splits, SplitError> {
    let mut splits = Splits::default();
    for (key, record) in annotations {
        let filename = record_filename(key, record)?;
        let partition = spec.classify(filename);
        trace!("{} ({}) -> {:?}", key, filename, partition);
        splits.get_mut(partition).insert(key.clone(), record.clone());
    }

    let (train, val, test) = splits.counts();
    info!("Split sizes: train={} val={} test={}", train, val, test);
    Ok(splits)
}

fn record_filename<'a>(key: &str, record: &'a Value) -> Result<&'a str, SplitError> {
    match record.get("filename") {
        Some(Value::String(name)) => Ok(name.as_str()),
        Some(_) => Err(SplitError::InvalidFilename { key: key.to_owned() }),
        None => Err(SplitError::MissingFilename { key: key.to_owned() }),
    }
}
