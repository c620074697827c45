//! Predicted probabilities paired with true labels.
//!
//! A [`Predictions`] collection is only constructed through validation:
//! both input sequences must have the same length, the collection must not
//! be empty, every probability must be finite and inside `[0, 1]`, and every
//! label must be 0 or 1.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::id::DatapointId;

/// True class of a datapoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    /// Class 0.
    Negative,
    /// Class 1.
    Positive,
}

impl Label {
    /// Both classes in index order.
    pub const ALL: [Label; 2] = [Label::Negative, Label::Positive];

    /// Numeric class value (0 or 1).
    pub fn as_u8(self) -> u8 {
        match self {
            Label::Negative => 0,
            Label::Positive => 1,
        }
    }

    /// Numeric class value as a float, for use in loss formulas.
    pub fn as_f64(self) -> f64 {
        f64::from(self.as_u8())
    }

    /// Parse a raw label value, rejecting anything but 0 and 1.
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(Label::Negative),
            1 => Some(Label::Positive),
            _ => None,
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        label.as_u8()
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Label::from_value(i64::from(value)).ok_or_else(|| format!("invalid label: {}", value))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "0" | "negative" | "neg" => Ok(Label::Negative),
            "1" | "positive" | "pos" => Ok(Label::Positive),
            _ => Err(format!("unknown label: {}", s)),
        }
    }
}

/// A single predicted probability with its true label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    probability: f64,
    label: Label,
}

impl Prediction {
    /// Create a prediction. Range checks happen in [`Predictions`].
    pub fn new(probability: f64, label: Label) -> Self {
        Self { probability, label }
    }

    /// Predicted probability of the positive class.
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// True class.
    pub fn label(&self) -> Label {
        self.label
    }
}

/// Validated, index-aligned collection of predictions (`n >= 1`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predictions {
    items: Vec<Prediction>,
}

impl Predictions {
    /// Build from two index-aligned sequences.
    ///
    /// Fails fast on unequal lengths rather than truncating.
    pub fn from_slices<L>(probabilities: &[f64], labels: &[L]) -> Result<Self>
    where
        L: Copy + Into<i64>,
    {
        if probabilities.len() != labels.len() {
            return Err(Error::MisalignedInput {
                predictions: probabilities.len(),
                labels: labels.len(),
            });
        }

        let mut items = Vec::with_capacity(probabilities.len());
        for (datapoint, (&probability, &raw)) in probabilities.iter().zip(labels).enumerate() {
            let value: i64 = raw.into();
            let label =
                Label::from_value(value).ok_or(Error::InvalidLabel { datapoint, value })?;
            items.push(Prediction::new(probability, label));
        }

        Self::from_predictions(items)
    }

    /// Build from already-paired predictions.
    pub fn from_predictions(items: Vec<Prediction>) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::EmptyDataset);
        }
        for (datapoint, item) in items.iter().enumerate() {
            let p = item.probability;
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(Error::InvalidProbability {
                    datapoint,
                    value: p,
                });
            }
        }
        Ok(Self { items })
    }

    /// Total number of datapoints `n`.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for a validated collection.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: DatapointId) -> Option<&Prediction> {
        self.items.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prediction> {
        self.items.iter()
    }

    /// Iterate with datapoint ids.
    pub fn enumerate(&self) -> impl Iterator<Item = (DatapointId, &Prediction)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, p)| (DatapointId(i), p))
    }

    pub fn as_slice(&self) -> &[Prediction] {
        &self.items
    }

    /// Number of datapoints with the given true label.
    pub fn class_count(&self, label: Label) -> usize {
        self.items.iter().filter(|p| p.label == label).count()
    }

    /// Ids of the datapoints with the given true label, in input order.
    pub fn class_members(&self, label: Label) -> Vec<DatapointId> {
        self.enumerate()
            .filter(|(_, p)| p.label == label)
            .map(|(id, _)| id)
            .collect()
    }
}
