//! Datapoint and group identity types.
//!
//! A datapoint is identified by its index in the input sequences; a group by
//! its index in the feature grouping's buckets or levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Datapoint index wrapper with display formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatapointId(pub usize);

impl DatapointId {
    /// Position of the datapoint in the input sequences.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for DatapointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for DatapointId {
    fn from(index: usize) -> Self {
        DatapointId(index)
    }
}

/// Group index within a [`crate::FeatureGrouping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub usize);

impl GroupId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

impl From<usize> for GroupId {
    fn from(index: usize) -> Self {
        GroupId(index)
    }
}
